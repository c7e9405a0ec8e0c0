#![allow(missing_docs)]

use std::fmt::Write as _;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;
use wikilinks::cache::{CachedOutcome, MemoryCache, PathCache, SortBy, SqliteCache};
use wikilinks::loader;
use wikilinks::{Index, IndexOptions, LookupError, Navigator, Result, SearchOptions, SearchOutcome};

const DUMP: &str = "\
<page>
Rust
2
Mozilla
Ferris
<page>
Mozilla
1
Firefox
<page>
Firefox
1
Gecko
<page>
Island
0
";

fn load(dir: &Path) -> Result<Arc<Index>> {
    fs::write(dir.join("pages.txt"), DUMP)?;
    fs::write(dir.join("manifest.txt"), "4\npages.txt\n")?;
    Ok(Arc::new(loader::load_manifest(
        dir.join("manifest.txt"),
        &IndexOptions::default(),
    )?))
}

#[test]
fn sqlite_cache_survives_navigator_restarts() -> Result<()> {
    let dir = TempDir::new()?;
    let db = dir.path().join("cache.db");

    let first = {
        let cache: Arc<dyn PathCache> = Arc::new(SqliteCache::open(&db)?);
        let nav = Navigator::new(load(dir.path())?, SearchOptions::default())?.with_cache(cache);
        let report = nav.query("Rust", "Gecko").unwrap();
        assert!(!report.cached);
        report
    };

    let cache: Arc<dyn PathCache> = Arc::new(SqliteCache::open(&db)?);
    let nav = Navigator::new(load(dir.path())?, SearchOptions::default())?.with_cache(cache);
    let again = nav.query("Rust", "Gecko").unwrap();
    assert!(again.cached);
    assert_eq!(again.outcome, first.outcome);

    let titles: Vec<_> = nav
        .render(again.outcome.path().unwrap())
        .into_iter()
        .map(|hop| hop.title.unwrap())
        .collect();
    assert_eq!(titles, vec!["Mozilla", "Firefox", "Gecko"]);
    assert_eq!(nav.popular(1)?[0].count, 2);
    Ok(())
}

#[test]
fn history_orders_by_popularity_and_recency() -> Result<()> {
    let dir = TempDir::new()?;
    let cache = Arc::new(MemoryCache::new());
    let nav = Navigator::new(load(dir.path())?, SearchOptions::default())?.with_cache(cache);

    for _ in 0..3 {
        nav.query("Rust", "Firefox").unwrap();
    }
    nav.query("Rust", "Island").unwrap();
    nav.query("Mozilla", "Gecko").unwrap();

    let popular: Vec<_> = nav.popular(3)?.into_iter().map(|e| (e.src, e.dst)).collect();
    assert_eq!(popular[0], ("Rust".to_string(), "Firefox".to_string()));
    let recent = nav.recent(1)?;
    assert_eq!((recent[0].src.as_str(), recent[0].dst.as_str()), ("Mozilla", "Gecko"));
    assert_eq!(nav.recent(10)?.len(), 3);
    Ok(())
}

#[test]
fn unresolvable_titles_never_reach_the_cache() -> Result<()> {
    let dir = TempDir::new()?;
    let cache = Arc::new(MemoryCache::new());
    let nav = Navigator::new(load(dir.path())?, SearchOptions::default())?.with_cache(cache.clone());

    assert_eq!(nav.query("Rust", "Nowhere"), Err(LookupError::MissingDestination));
    assert_eq!(nav.query("", "Rust"), Err(LookupError::EmptySource));
    assert!(cache.is_empty());
    assert!(cache.retrieve(5, SortBy::Recent)?.is_empty());
    Ok(())
}

#[test]
fn every_outcome_kind_round_trips_through_sqlite() -> Result<()> {
    let dir = TempDir::new()?;
    let cache: Arc<dyn PathCache> = Arc::new(SqliteCache::open(dir.path().join("c.db"))?);
    let options = SearchOptions {
        max_depth: 2,
        ..SearchOptions::default()
    };
    let nav = Navigator::new(load(dir.path())?, options)?.with_cache(cache.clone());

    let exceeded = nav.query("Rust", "Gecko").unwrap().outcome;
    let impossible = nav.query("Island", "Rust").unwrap().outcome;
    let trivial = nav.query("Rust", "Rust").unwrap().outcome;
    assert_eq!(exceeded, SearchOutcome::DepthExceeded(2));
    assert_eq!(impossible, SearchOutcome::Impossible);
    assert_eq!(trivial.path().map(|p| p.len()), Some(0));

    for (src, dst, expected) in [
        ("Rust", "Gecko", CachedOutcome::DepthExceeded(2)),
        ("Island", "Rust", CachedOutcome::Impossible),
        ("Rust", "Rust", CachedOutcome::Found(Vec::new())),
    ] {
        let hit = cache.contains(src, dst)?.expect("cached");
        assert_eq!(hit.outcome, expected);
        assert_eq!(hit.depth, 2);
    }
    Ok(())
}

fn with_depth(max_depth: usize) -> SearchOptions {
    SearchOptions {
        max_depth,
        ..SearchOptions::default()
    }
}

#[test]
fn truncated_result_does_not_answer_a_deeper_query() -> Result<()> {
    let dir = TempDir::new()?;
    let db = dir.path().join("cache.db");
    let index = load(dir.path())?;
    let open = |max_depth| -> Result<Navigator> {
        let cache: Arc<dyn PathCache> = Arc::new(SqliteCache::open(&db)?);
        Ok(Navigator::new(index.clone(), with_depth(max_depth))?.with_cache(cache))
    };

    let shallow = open(2)?.query("Rust", "Gecko").unwrap();
    assert_eq!(shallow.outcome, SearchOutcome::DepthExceeded(2));

    let deep = open(10)?.query("Rust", "Gecko").unwrap();
    assert!(!deep.cached);
    assert_eq!(deep.outcome.path().map(|p| p.len()), Some(3));

    let again = open(10)?.query("Rust", "Gecko").unwrap();
    assert!(again.cached);
    assert_eq!(again.outcome, deep.outcome);

    let shallow_again = open(2)?.query("Rust", "Gecko").unwrap();
    assert!(shallow_again.cached);
    assert_eq!(shallow_again.outcome, SearchOutcome::DepthExceeded(2));
    Ok(())
}

#[test]
fn shared_memory_cache_respects_each_depth_limit() -> Result<()> {
    let dir = TempDir::new()?;
    let index = load(dir.path())?;
    let cache = Arc::new(MemoryCache::new());
    let shallow = Navigator::new(index.clone(), with_depth(1))?.with_cache(cache.clone());
    let deep = Navigator::new(index, with_depth(10))?.with_cache(cache.clone());

    assert_eq!(
        shallow.query("Rust", "Firefox").unwrap().outcome,
        SearchOutcome::DepthExceeded(1)
    );
    let found = deep.query("Rust", "Firefox").unwrap();
    assert!(!found.cached);
    assert!(found.outcome.is_found());
    assert_eq!(cache.contains("Rust", "Firefox")?.unwrap().count, 2);
    Ok(())
}

/// Chain `Rust -> Mozilla -> Firefox -> Gecko`, with blocks in the given order.
fn chain_dump(blocks: &[(&str, &str)]) -> String {
    let mut dump = String::from("4\n");
    for (title, link) in blocks {
        writeln!(dump, "<page>\n{title}\n1\n{link}").unwrap();
    }
    dump
}

fn tight() -> IndexOptions {
    IndexOptions {
        over_provision: 2,
        headroom: 0,
        ..IndexOptions::default()
    }
}

fn titles(nav: &Navigator, outcome: &SearchOutcome) -> Vec<String> {
    nav.render(outcome.path().expect("found"))
        .into_iter()
        .map(|hop| hop.title.expect("titled").to_string())
        .collect()
}

#[test]
fn cached_paths_survive_a_rebuild_that_moves_slots() -> Result<()> {
    let blocks = [("Rust", "Mozilla"), ("Mozilla", "Firefox"), ("Firefox", "Gecko")];
    let reversed: Vec<_> = blocks.iter().rev().copied().collect();
    let forward = Arc::new(loader::load_reader(
        Cursor::new(chain_dump(&blocks)),
        Path::new("forward"),
        &tight(),
    )?);
    let backward = Arc::new(loader::load_reader(
        Cursor::new(chain_dump(&reversed)),
        Path::new("backward"),
        &tight(),
    )?);
    // Eight slots; claiming order decides who keeps a contested home slot.
    assert_eq!(forward.capacity(), 8);
    assert_ne!(forward.find("Firefox"), backward.find("Firefox"));
    assert_ne!(forward.find("Rust"), backward.find("Rust"));

    let dir = TempDir::new()?;
    let db = dir.path().join("cache.db");
    let cache: Arc<dyn PathCache> = Arc::new(SqliteCache::open(&db)?);
    let before = Navigator::new(forward, SearchOptions::default())?.with_cache(cache);
    let first = before.query("Rust", "Gecko").unwrap();
    assert!(!first.cached);

    let cache: Arc<dyn PathCache> = Arc::new(SqliteCache::open(&db)?);
    let after = Navigator::new(backward.clone(), SearchOptions::default())?.with_cache(cache);
    let hit = after.query("Rust", "Gecko").unwrap();
    assert!(hit.cached);
    assert_eq!(titles(&after, &hit.outcome), vec!["Mozilla", "Firefox", "Gecko"]);
    let expected: Vec<_> = ["Mozilla", "Firefox", "Gecko"]
        .iter()
        .map(|t| backward.find(t).unwrap())
        .collect();
    assert_eq!(hit.outcome.path().unwrap().as_slice(), expected.as_slice());
    Ok(())
}

#[test]
fn cached_path_missing_from_new_input_is_searched_again() -> Result<()> {
    let dir = TempDir::new()?;
    let db = dir.path().join("cache.db");
    let blocks = [("Rust", "Mozilla"), ("Mozilla", "Firefox"), ("Firefox", "Gecko")];
    let old = Arc::new(loader::load_reader(
        Cursor::new(chain_dump(&blocks)),
        Path::new("old"),
        &IndexOptions::default(),
    )?);
    let cache: Arc<dyn PathCache> = Arc::new(SqliteCache::open(&db)?);
    Navigator::new(old, SearchOptions::default())?
        .with_cache(cache)
        .query("Rust", "Gecko")
        .unwrap();

    let new = Arc::new(loader::load_reader(
        Cursor::new(chain_dump(&[("Rust", "Ferris"), ("Ferris", "Gecko")])),
        Path::new("new"),
        &IndexOptions::default(),
    )?);
    let cache: Arc<dyn PathCache> = Arc::new(SqliteCache::open(&db)?);
    let nav = Navigator::new(new, SearchOptions::default())?.with_cache(cache.clone());
    let report = nav.query("Rust", "Gecko").unwrap();
    assert!(!report.cached);
    assert_eq!(titles(&nav, &report.outcome), vec!["Ferris", "Gecko"]);
    let entry = cache.contains("Rust", "Gecko")?.unwrap();
    assert_eq!(entry.outcome, CachedOutcome::Found(vec!["Ferris".into(), "Gecko".into()]));
    assert_eq!(entry.count, 2);
    Ok(())
}

#[test]
fn multi_shard_rebuilds_render_cached_paths_by_title() -> Result<()> {
    let dir = TempDir::new()?;
    let (shards, per_shard) = (4, 40);
    let total = shards * per_shard;
    let mut manifest = format!("{total}\n");
    for s in 0..shards {
        let mut body = String::new();
        for i in 0..per_shard {
            let n = s * per_shard + i;
            writeln!(
                body,
                "<page>\nArticle {n}\n2\nArticle {}\nTopic {}",
                (n + 1) % total,
                n % 20
            )
            .unwrap();
        }
        let name = format!("shard-{s}.txt");
        fs::write(dir.path().join(&name), body)?;
        writeln!(manifest, "{name}").unwrap();
    }
    let manifest_path = dir.path().join("manifest.txt");
    fs::write(&manifest_path, manifest)?;
    let options = IndexOptions {
        over_provision: 3,
        headroom: 0,
        ..IndexOptions::default()
    };
    let db = dir.path().join("cache.db");
    let expected: Vec<String> = (1..=5).map(|n| format!("Article {n}")).collect();

    for rebuild in 0..6 {
        let index = Arc::new(loader::load_manifest(&manifest_path, &options)?);
        let cache: Arc<dyn PathCache> = Arc::new(SqliteCache::open(&db)?);
        let nav = Navigator::new(index, SearchOptions::default())?.with_cache(cache);
        let report = nav.query("Article 0", "Article 5").unwrap();
        assert_eq!(report.cached, rebuild > 0);
        assert_eq!(titles(&nav, &report.outcome), expected);
    }
    Ok(())
}
