use xxhash_rust::xxh64::xxh64;

const TITLE_HASH_SEED: u64 = 0;

/// Hash used for home-slot placement. Fixed seed, so home slots are reproducible across runs.
#[inline]
pub(crate) fn title_hash(title: &str) -> u64 {
    xxh64(title.as_bytes(), TITLE_HASH_SEED)
}

/// Candidate slots for one title.
///
/// Starts at `hash mod capacity`, then jumps by offsets following
/// `offset_1 = 2`, `offset_k = (offset_{k-1} - 1) * k + 1`. Offsets are kept reduced modulo
/// the capacity, which yields the same slots without overflowing.
#[derive(Debug, Clone)]
pub(crate) struct ProbeSequence {
    capacity: u64,
    slot: u64,
    offset: u64,
    step: u64,
    remaining: u32,
}

impl ProbeSequence {
    pub(crate) fn new(title: &str, capacity: usize, limit: u32) -> Self {
        let capacity = capacity.max(1) as u64;
        Self {
            capacity,
            slot: title_hash(title) % capacity,
            offset: 0,
            step: 0,
            remaining: limit,
        }
    }
}

impl Iterator for ProbeSequence {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        if self.step > 0 {
            self.offset = if self.step == 1 {
                2 % self.capacity
            } else {
                let base = (self.offset + self.capacity - 1) % self.capacity;
                (base * self.step + 1) % self.capacity
            };
            self.slot = (self.slot + self.offset) % self.capacity;
        }
        self.step += 1;
        Some(self.slot as usize)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining as usize;
        (remaining, Some(remaining))
    }
}
