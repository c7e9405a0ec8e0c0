use std::io::{self, BufRead};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use crate::index::IndexBuilder;
use crate::types::{LinkError, Result, SlotId};

/// Line that opens a page block.
pub const PAGE_MARKER: &str = "<page>";

/// Upper bound on link-list pre-sizing taken from a declared out-degree.
const PRESIZE_LIMIT: usize = 1 << 16;

/// Counts gathered while populating from one shard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ShardReport {
    /// Page blocks processed.
    pub pages: u64,
    /// Link lines attached to pages.
    pub links: u64,
}

/// Reads page blocks from `reader` into `builder`.
///
/// A block is `<page>`, the title, the out-degree, then the link titles. Every line after the
/// out-degree up to the next marker counts as a link; the out-degree only pre-sizes the link
/// list. Blank link lines, and blocks with a blank title, are skipped. `source` names the
/// input in parse errors.
pub fn populate_reader<R: BufRead>(
    builder: &IndexBuilder,
    reader: R,
    source: &Path,
) -> Result<ShardReport> {
    populate_lines(builder, numbered(reader.lines()), source, None)
}

pub(super) type NumberedLines<I> = std::iter::Zip<std::ops::RangeFrom<usize>, I>;

pub(super) fn numbered<I>(lines: I) -> NumberedLines<I>
where
    I: Iterator<Item = io::Result<String>>,
{
    (1usize..).zip(lines)
}

pub(super) fn populate_lines<I>(
    builder: &IndexBuilder,
    mut lines: I,
    source: &Path,
    cancel: Option<&AtomicBool>,
) -> Result<ShardReport>
where
    I: Iterator<Item = (usize, io::Result<String>)>,
{
    let mut report = ShardReport::default();
    let mut owner: Option<SlotId> = None;
    let mut in_page = false;
    let mut pending: Vec<SlotId> = Vec::new();

    while let Some((line_no, raw)) = lines.next() {
        let raw = raw?;
        let line = trim_line(&raw);

        if line == PAGE_MARKER {
            flush(builder, &mut owner, &mut pending, &mut report)?;
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                return Ok(report);
            }
            let (_, title) = expect_line(&mut lines, source, line_no, "missing title after <page>")?;
            let (degree_no, degree) =
                expect_line(&mut lines, source, line_no + 1, "missing out-degree after title")?;
            let degree: usize = degree.trim().parse().map_err(|_| LinkError::Parse {
                path: source.to_path_buf(),
                line: degree_no,
                reason: format!("invalid out-degree {degree:?}"),
            })?;
            in_page = true;
            if !title.is_empty() {
                let hint = degree.min(PRESIZE_LIMIT);
                owner = Some(builder.resolve(&title, Some(hint))?);
                pending.reserve(hint);
                report.pages += 1;
            }
            continue;
        }

        if line.is_empty() {
            continue;
        }
        if !in_page {
            return Err(LinkError::Parse {
                path: source.to_path_buf(),
                line: line_no,
                reason: "link line before the first <page> marker".into(),
            });
        }
        if owner.is_some() {
            pending.push(builder.resolve(line, None)?);
        }
    }

    flush(builder, &mut owner, &mut pending, &mut report)?;
    Ok(report)
}

fn trim_line(raw: &str) -> &str {
    raw.strip_suffix('\r').unwrap_or(raw)
}

fn expect_line<I>(
    lines: &mut I,
    source: &Path,
    after: usize,
    reason: &str,
) -> Result<(usize, String)>
where
    I: Iterator<Item = (usize, io::Result<String>)>,
{
    match lines.next() {
        Some((line_no, raw)) => {
            let raw = raw?;
            Ok((line_no, trim_line(&raw).to_string()))
        }
        None => Err(LinkError::Parse {
            path: source.to_path_buf(),
            line: after,
            reason: reason.into(),
        }),
    }
}

fn flush(
    builder: &IndexBuilder,
    owner: &mut Option<SlotId>,
    pending: &mut Vec<SlotId>,
    report: &mut ShardReport,
) -> Result<()> {
    if let Some(page) = owner.take() {
        builder.extend_links(page, pending)?;
        report.links += pending.len() as u64;
    }
    pending.clear();
    Ok(())
}
