#![allow(missing_docs)]

use std::collections::HashSet;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use wikilinks::loader::{self, Manifest};
use wikilinks::{IndexOptions, LinkError, PathFinder, Result, SearchOutcome};

/// Writes `shards` page lists plus a manifest; returns the manifest path.
fn write_dump(dir: &Path, shards: &[Vec<(String, Vec<String>)>]) -> Result<PathBuf> {
    let mut manifest = String::new();
    let total: usize = shards.iter().map(Vec::len).sum();
    writeln!(manifest, "{total}").unwrap();
    for (i, pages) in shards.iter().enumerate() {
        let name = format!("shard-{i:02}.txt");
        let mut body = String::new();
        for (title, links) in pages {
            writeln!(body, "<page>\n{title}\n{}", links.len()).unwrap();
            for link in links {
                writeln!(body, "{link}").unwrap();
            }
        }
        fs::write(dir.join(&name), body)?;
        writeln!(manifest, "{name}").unwrap();
    }
    let path = dir.join("manifest.txt");
    fs::write(&path, manifest)?;
    Ok(path)
}

fn ring_dump(shards: usize, per_shard: usize) -> Vec<Vec<(String, Vec<String>)>> {
    let total = shards * per_shard;
    (0..shards)
        .map(|s| {
            (0..per_shard)
                .map(|i| {
                    let n = s * per_shard + i;
                    let links = vec![
                        format!("Article {}", (n + 1) % total),
                        format!("Topic {}", n % 13),
                    ];
                    (format!("Article {n}"), links)
                })
                .collect()
        })
        .collect()
}

#[test]
fn every_title_is_indexed_once() -> Result<()> {
    let dir = TempDir::new()?;
    let dump = ring_dump(6, 150);
    let manifest = write_dump(dir.path(), &dump)?;

    let (index, report) = loader::load_manifest_with_report(&manifest, &IndexOptions::default())?;
    assert_eq!(report.shards, 6);
    assert_eq!(report.pages, 900);
    assert_eq!(report.links, 1800);
    assert_eq!(index.len(), 900 + 13);

    let titles: HashSet<&str> = index.iter().map(|(_, record)| record.title()).collect();
    assert_eq!(titles.len(), index.len());
    for pages in &dump {
        for (title, links) in pages {
            let slot = index.find(title).expect("page indexed");
            let linked: Vec<&str> = index
                .links(slot)
                .iter()
                .map(|&target| index.title(target).unwrap())
                .collect();
            assert_eq!(linked, links.iter().map(String::as_str).collect::<Vec<_>>());
        }
    }
    assert_eq!(index.stats().stubs, 13);
    assert_eq!(index.stats().capacity, 20 * 900 + 1000);
    Ok(())
}

#[test]
fn loaded_ring_answers_queries() -> Result<()> {
    let dir = TempDir::new()?;
    let manifest = write_dump(dir.path(), &ring_dump(3, 10))?;
    let index = loader::load_manifest(&manifest, &IndexOptions::default())?;
    let finder = PathFinder::new(&index, 10);
    let src = index.find("Article 0").unwrap();

    let near = finder.search(src, index.find("Article 7").unwrap());
    assert_eq!(near.path().map(|p| p.len()), Some(7));
    let far = finder.search(src, index.find("Article 20").unwrap());
    assert_eq!(far, SearchOutcome::DepthExceeded(10));
    let topic = finder.search(src, index.find("Topic 5").unwrap());
    assert_eq!(topic.path().map(|p| p.len()), Some(6));
    Ok(())
}

#[test]
fn undersized_table_aborts_build() -> Result<()> {
    let dir = TempDir::new()?;
    let manifest = write_dump(dir.path(), &ring_dump(2, 20))?;
    let tiny = IndexOptions {
        over_provision: 0,
        headroom: 8,
        stripe_count: 2,
        probe_limit: 4,
    };
    let err = loader::load_manifest(&manifest, &tiny).unwrap_err();
    assert!(matches!(err, LinkError::TableFull { .. }), "{err}");
    Ok(())
}

#[test]
fn crlf_input_and_blank_lines_are_tolerated() -> Result<()> {
    let dir = TempDir::new()?;
    fs::write(
        dir.path().join("dos.txt"),
        "<page>\r\nRust\r\n2\r\nFerris\r\n\r\nCargo\r\n",
    )?;
    fs::write(dir.path().join("manifest.txt"), "1\r\ndos.txt\r\n")?;
    let manifest = Manifest::read(dir.path().join("manifest.txt"))?;
    assert_eq!(manifest.shards, vec![dir.path().join("dos.txt")]);

    let (index, _) = loader::load_shards(manifest.expected, &manifest.shards, &IndexOptions::default())?;
    let rust = index.find("Rust").unwrap();
    assert_eq!(index.links(rust).len(), 2);
    assert!(index.find("Ferris").is_some());
    assert!(index.find("Ferris\r").is_none());
    Ok(())
}
