#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use tempfile::TempDir;

struct Dump {
    dir: TempDir,
    manifest: PathBuf,
    config: PathBuf,
}

impl Dump {
    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

fn setup_dump() -> Dump {
    let dir = TempDir::new().expect("tempdir");
    write(
        dir.path(),
        "shard-0.txt",
        "<page>\nRust\n2\nMozilla\nFerris\n<page>\nMozilla\n1\nFirefox\n",
    );
    write(
        dir.path(),
        "shard-1.txt",
        "<page>\nFirefox\n1\nGecko\n<page>\nIsland\n0\n",
    );
    let manifest = write(dir.path(), "manifest.txt", "4\nshard-0.txt\nshard-1.txt\n");
    let config = write(dir.path(), "config.toml", "preset = \"testing\"\n");
    Dump {
        dir,
        manifest,
        config,
    }
}

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

fn wikilinks(dump: &Dump) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("wikilinks");
    cmd.env_remove("RUST_LOG")
        .env_remove("WIKILINKS_CONFIG")
        .arg("--config")
        .arg(&dump.config);
    cmd
}

#[test]
fn stats_emits_json() {
    let dump = setup_dump();
    let output = wikilinks(&dump)
        .args(["--format", "json", "stats"])
        .arg(&dump.manifest)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: Value = serde_json::from_slice(&output).expect("valid json");
    assert_eq!(json["index"]["entries"], 6);
    assert_eq!(json["index"]["stubs"], 2);
    assert_eq!(json["index"]["capacity"], 20 * 4 + 16);
    assert_eq!(json["load"]["shards"], 2);
    assert_eq!(json["load"]["links"], 4);
}

#[test]
fn path_prints_click_trail() {
    let dump = setup_dump();
    let output = wikilinks(&dump)
        .arg("path")
        .arg(&dump.manifest)
        .args(["Rust", "Gecko"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).unwrap();
    assert!(text.contains("Rust → Mozilla → Firefox → Gecko"), "{text}");
    assert!(text.contains("3 clicks"), "{text}");
}

#[test]
fn path_json_reports_depth_exceeded() {
    let dump = setup_dump();
    let output = wikilinks(&dump)
        .args(["--format", "json", "path"])
        .arg(&dump.manifest)
        .args(["Rust", "Gecko", "--max-depth", "2"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: Value = serde_json::from_slice(&output).expect("valid json");
    assert_eq!(json["status"], 2);
    assert!(json.get("clicks").is_none());
}

#[test]
fn unknown_title_exits_with_lookup_status() {
    let dump = setup_dump();
    let output = wikilinks(&dump)
        .arg("path")
        .arg(&dump.manifest)
        .args(["Rust", "Atlantis"])
        .assert()
        .code(2)
        .get_output()
        .stdout
        .clone();
    assert!(String::from_utf8(output)
        .unwrap()
        .contains("Couldn't find destination"));
}

#[test]
fn batch_answers_in_input_order() {
    let dump = setup_dump();
    let queries = write(
        dump.dir.path(),
        "queries.tsv",
        "Rust\tGecko\nIsland\tRust\nbroken line\nRust\tNope\nMozilla\tFirefox\n",
    );
    let output = wikilinks(&dump)
        .arg("batch")
        .arg(&dump.manifest)
        .arg("--input")
        .arg(&queries)
        .args(["--threads", "3", "--permits", "1"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "Rust\tGecko\t3\tRust > Mozilla > Firefox > Gecko",
            "Island\tRust\t-\tno such path exists",
            "broken line\t\t-\texpected SOURCE<TAB>DESTINATION",
            "Rust\tNope\t-\tCouldn't find destination",
            "Mozilla\tFirefox\t1\tMozilla > Firefox",
        ]
    );
}

#[test]
fn history_lists_cached_queries() {
    let dump = setup_dump();
    let cache = dump.path("cache.db");
    for _ in 0..2 {
        wikilinks(&dump)
            .arg("path")
            .arg(&dump.manifest)
            .args(["Mozilla", "Gecko", "--cache"])
            .arg(&cache)
            .assert()
            .success();
    }
    wikilinks(&dump)
        .arg("path")
        .arg(&dump.manifest)
        .args(["Rust", "Firefox", "--cache"])
        .arg(&cache)
        .assert()
        .success();

    let output = wikilinks(&dump)
        .args(["--format", "json", "history", "--sort", "popular", "--cache"])
        .arg(&cache)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: Value = serde_json::from_slice(&output).expect("valid json");
    let entries = json.as_array().expect("array");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["src"], "Mozilla");
    assert_eq!(entries[0]["count"], 2);
    assert_eq!(entries[0]["outcome"]["status"], "found");

    let output = wikilinks(&dump)
        .args(["history", "--sort", "recent", "--limit", "1", "--cache"])
        .arg(&cache)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).unwrap();
    assert!(text.contains("Rust → Firefox"), "{text}");
    assert!(!text.contains("Mozilla → Gecko"), "{text}");
}

#[test]
fn bad_config_is_reported() {
    let dump = setup_dump();
    let config = write(dump.dir.path(), "broken.toml", "[search]\npermits = 0\n");
    cargo_bin_cmd!("wikilinks")
        .env_remove("WIKILINKS_CONFIG")
        .arg("--config")
        .arg(&config)
        .arg("stats")
        .arg(&dump.manifest)
        .assert()
        .failure()
        .code(1);
}

#[test]
fn deeper_run_is_not_answered_by_a_truncated_cache_entry() {
    let dump = setup_dump();
    let cache = dump.path("cache.db");
    let run = |depth: &str| -> Value {
        let output = wikilinks(&dump)
            .args(["--format", "json", "path"])
            .arg(&dump.manifest)
            .args(["Rust", "Gecko", "--max-depth", depth, "--cache"])
            .arg(&cache)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&output).expect("valid json")
    };

    let shallow = run("2");
    assert_eq!(shallow["status"], 2);
    let deep = run("10");
    assert_eq!(deep["status"], 0);
    assert_eq!(deep["clicks"], 3);
    assert_eq!(deep["cached"], false);
    assert_eq!(run("10")["cached"], true);
}
