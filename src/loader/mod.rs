#![forbid(unsafe_code)]

//! Builds an [`Index`] from line-oriented shard files.
//!
//! A manifest names the declared article count and the shard files. Each shard is read by its
//! own worker thread; all workers share one [`IndexBuilder`] and are joined before the index is
//! frozen, so a failed build never yields an index.

mod shard;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::IndexOptions;
use crate::index::{Index, IndexBuilder};
use crate::types::{LinkError, Result};

pub use shard::{populate_reader, ShardReport, PAGE_MARKER};

/// Parsed manifest file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// Declared article count, used to size the index.
    pub expected: u64,
    /// Shard files, already resolved against the manifest's directory.
    pub shards: Vec<PathBuf>,
}

impl Manifest {
    /// Reads the manifest at `path`.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Self::parse(BufReader::new(File::open(path)?), base, path)
    }

    /// Parses a manifest from `reader`; relative shard paths are joined onto `base`.
    pub fn parse<R: BufRead>(reader: R, base: &Path, source: &Path) -> Result<Self> {
        let mut lines = shard::numbered(reader.lines());
        let expected = read_count(&mut lines, source)?;
        let mut shards = Vec::new();
        for (_, line) in lines {
            let line = line?;
            let entry = line.trim();
            if entry.is_empty() {
                continue;
            }
            let entry = Path::new(entry);
            shards.push(if entry.is_absolute() {
                entry.to_path_buf()
            } else {
                base.join(entry)
            });
        }
        Ok(Self { expected, shards })
    }
}

/// Totals for one complete build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Shard files read.
    pub shards: usize,
    /// Page blocks processed across all shards.
    pub pages: u64,
    /// Link lines attached across all shards.
    pub links: u64,
    /// Wall-clock time from the first shard opened to the index frozen.
    pub elapsed: Duration,
}

/// Builds the index described by the manifest at `path`.
pub fn load_manifest(path: impl AsRef<Path>, options: &IndexOptions) -> Result<Index> {
    load_manifest_with_report(path, options).map(|(index, _)| index)
}

/// Like [`load_manifest`], also returning the build totals.
pub fn load_manifest_with_report(
    path: impl AsRef<Path>,
    options: &IndexOptions,
) -> Result<(Index, LoadReport)> {
    let manifest = Manifest::read(path)?;
    load_shards(manifest.expected, &manifest.shards, options)
}

/// Builds an index sized for `expected` articles from `shards`, one worker per shard.
///
/// The first worker error stops the remaining workers at their next page boundary and is
/// returned; the partially populated builder is dropped.
pub fn load_shards(
    expected: u64,
    shards: &[PathBuf],
    options: &IndexOptions,
) -> Result<(Index, LoadReport)> {
    let started = Instant::now();
    let builder = IndexBuilder::new(expected, options)?;
    info!(
        workers = shards.len(),
        capacity = builder.capacity(),
        expected,
        "loader.start"
    );

    let cancel = AtomicBool::new(false);
    let results = thread::scope(|scope| -> Result<Vec<Result<ShardReport>>> {
        let mut handles = Vec::with_capacity(shards.len());
        for (worker, path) in shards.iter().enumerate() {
            let builder = &builder;
            let cancel = &cancel;
            let handle = thread::Builder::new()
                .name(format!("loader-{worker}"))
                .spawn_scoped(scope, move || {
                    let result = load_shard_file(builder, path, cancel);
                    if let Err(err) = &result {
                        warn!(shard = %path.display(), error = %err, "loader.shard_failed");
                        cancel.store(true, Ordering::Relaxed);
                    }
                    result
                })?;
            handles.push(handle);
        }
        Ok(handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
            .collect())
    })?;

    let mut report = LoadReport {
        shards: shards.len(),
        ..LoadReport::default()
    };
    for result in results {
        let shard = result?;
        report.pages += shard.pages;
        report.links += shard.links;
    }

    let index = builder.freeze();
    report.elapsed = started.elapsed();
    let stats = index.stats();
    info!(
        elapsed_ms = report.elapsed.as_millis() as u64,
        entries = stats.entries,
        total_links = stats.total_links,
        max_probe = stats.max_probe,
        "loader.ready"
    );
    Ok((index, report))
}

/// Builds an index from a single stream: the count line followed by page blocks.
pub fn load_reader<R: BufRead>(reader: R, source: &Path, options: &IndexOptions) -> Result<Index> {
    let mut lines = shard::numbered(reader.lines());
    let expected = read_count(&mut lines, source)?;
    let builder = IndexBuilder::new(expected, options)?;
    let report = shard::populate_lines(&builder, lines, source, None)?;
    debug!(pages = report.pages, links = report.links, "loader.stream_done");
    Ok(builder.freeze())
}

fn load_shard_file(builder: &IndexBuilder, path: &Path, cancel: &AtomicBool) -> Result<ShardReport> {
    let reader = BufReader::new(File::open(path)?);
    let report = shard::populate_lines(builder, shard::numbered(reader.lines()), path, Some(cancel))?;
    info!(
        shard = %path.display(),
        pages = report.pages,
        links = report.links,
        "loader.shard_done"
    );
    Ok(report)
}

fn read_count<I>(lines: &mut I, source: &Path) -> Result<u64>
where
    I: Iterator<Item = (usize, std::io::Result<String>)>,
{
    let parse_error = |line: usize, reason: String| LinkError::Parse {
        path: source.to_path_buf(),
        line,
        reason,
    };
    let (line_no, line) = lines
        .next()
        .ok_or_else(|| parse_error(1, "missing article count".into()))?;
    let line = line?;
    line.trim()
        .parse()
        .map_err(|_| parse_error(line_no, format!("invalid article count {:?}", line.trim())))
}
