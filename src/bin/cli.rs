//! Binary entry point for the wikilinks command-line tool.
#![forbid(unsafe_code)]

#[path = "cli/config.rs"]
mod config;
#[path = "cli/ui.rs"]
mod ui;

use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::debug;
use wikilinks::{
    cache::{CachedOutcome, CachedPath, PathCache, SortBy, SqliteCache},
    index::IndexStats,
    loader::{self, LoadReport},
    logging::init_logging,
    search::Hop,
    Index, IndexOptions, Navigator, QueryReport, SearchOptions,
};

use config::CliConfig;
use ui::{format_duration, ColorChoice, Ui};

#[derive(Parser, Debug)]
#[command(
    name = "wikilinks",
    version,
    about = "Shortest click paths through a wiki link graph",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "WIKILINKS_CONFIG",
        value_name = "FILE",
        help = "TOML config file (defaults to the per-user config directory)"
    )]
    config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        env = "RUST_LOG",
        default_value = "warn",
        value_name = "LEVEL",
        help = "Log filter, e.g. info or wikilinks=debug"
    )]
    log_level: String,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for results"
    )]
    format: OutputFormat,

    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,

    #[arg(long, global = true, help = "Suppress progress output")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the index and print its statistics.
    Stats {
        #[arg(value_name = "MANIFEST")]
        manifest: PathBuf,
    },
    /// Find the shortest click path between two titles.
    Path(PathCmd),
    /// Answer tab-separated title pairs concurrently.
    Batch(BatchCmd),
    /// List cached queries.
    History(HistoryCmd),
}

#[derive(Args, Debug)]
struct PathCmd {
    #[arg(value_name = "MANIFEST")]
    manifest: PathBuf,

    #[arg(value_name = "SRC")]
    src: String,

    #[arg(value_name = "DST")]
    dst: String,

    #[arg(long, help = "Maximum number of clicks explored")]
    max_depth: Option<usize>,

    #[arg(long, value_name = "FILE", help = "SQLite result cache")]
    cache: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct BatchCmd {
    #[arg(value_name = "MANIFEST")]
    manifest: PathBuf,

    #[arg(long, value_name = "FILE", help = "Query file (stdin when omitted)")]
    input: Option<PathBuf>,

    #[arg(long, default_value_t = 4, help = "Concurrent caller threads")]
    threads: usize,

    #[arg(long, help = "Searches allowed to run at once")]
    permits: Option<usize>,

    #[arg(long, help = "Maximum number of clicks explored")]
    max_depth: Option<usize>,

    #[arg(long, value_name = "FILE", help = "SQLite result cache")]
    cache: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct HistoryCmd {
    #[arg(long, value_name = "FILE", help = "SQLite result cache")]
    cache: Option<PathBuf>,

    #[arg(long, default_value_t = 10)]
    limit: usize,

    #[arg(long, value_enum, default_value_t = SortArg::Popular)]
    sort: SortArg,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum SortArg {
    Popular,
    Recent,
}

impl From<SortArg> for SortBy {
    fn from(sort: SortArg) -> Self {
        match sort {
            SortArg::Popular => SortBy::Popular,
            SortArg::Recent => SortBy::Recent,
        }
    }
}

/// Exit status for a query whose titles are not in the index.
const EXIT_LOOKUP: i32 = 2;

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;
    let settings = CliConfig::load(cli.config.clone())?;
    if let Some(path) = settings.path() {
        debug!(path = %path.display(), "cli.config_loaded");
    }
    let ui = Ui::new(cli.color, cli.quiet || cli.format == OutputFormat::Json);

    match cli.command {
        Command::Stats { manifest } => {
            let (index, report) = build_index(&ui, &manifest, &settings.config().index)?;
            let response = StatsResponse {
                index: index.stats(),
                load: &report,
            };
            emit(cli.format, &response, || print_stats_text(&ui, &response))?;
        }
        Command::Path(cmd) => {
            let mut options = settings.config().search.clone();
            if let Some(depth) = cmd.max_depth {
                options.max_depth = depth;
            }
            let cache = open_cache(cmd.cache.as_deref().or(settings.cache_path()))?;
            let (index, _) = build_index(&ui, &cmd.manifest, &settings.config().index)?;
            let navigator = navigator(index, options, cache)?;
            if !answer_one(&ui, cli.format, &navigator, &cmd.src, &cmd.dst)? {
                std::process::exit(EXIT_LOOKUP);
            }
        }
        Command::Batch(cmd) => {
            let mut options = settings.config().search.clone();
            if let Some(permits) = cmd.permits {
                options.permits = permits;
            }
            if let Some(depth) = cmd.max_depth {
                options.max_depth = depth;
            }
            let queries = read_queries(cmd.input.as_deref())?;
            let cache = open_cache(cmd.cache.as_deref().or(settings.cache_path()))?;
            let (index, _) = build_index(&ui, &cmd.manifest, &settings.config().index)?;
            let navigator = navigator(index, options, cache)?;
            for answer in answer_batch(&navigator, &queries, cmd.threads.max(1)) {
                match cli.format {
                    OutputFormat::Json => println!("{}", serde_json::to_string(&answer)?),
                    OutputFormat::Text => println!("{}", answer.to_text()),
                }
            }
        }
        Command::History(cmd) => {
            let path = cmd
                .cache
                .as_deref()
                .or(settings.cache_path())
                .ok_or("no cache file; pass --cache or set [cache] path in the config file")?;
            let cache = SqliteCache::open(path)?;
            let entries = cache.retrieve(cmd.limit, cmd.sort.into())?;
            emit(cli.format, &entries, || print_history_text(&ui, &entries))?;
        }
    }

    Ok(())
}

fn build_index(
    ui: &Ui,
    manifest: &Path,
    options: &IndexOptions,
) -> Result<(Arc<Index>, LoadReport), Box<dyn Error>> {
    let task = ui.task(format!("Building index from {}", manifest.display()));
    let (index, report) = loader::load_manifest_with_report(manifest, options)?;
    let elapsed = task.finish();
    debug!(elapsed = %format_duration(elapsed), "cli.index_built");
    Ok((Arc::new(index), report))
}

fn open_cache(path: Option<&Path>) -> Result<Option<Arc<dyn PathCache>>, Box<dyn Error>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let cache: Arc<dyn PathCache> = Arc::new(SqliteCache::open(path)?);
    Ok(Some(cache))
}

fn navigator(
    index: Arc<Index>,
    options: SearchOptions,
    cache: Option<Arc<dyn PathCache>>,
) -> Result<Navigator, Box<dyn Error>> {
    let navigator = Navigator::new(index, options)?;
    Ok(match cache {
        Some(cache) => navigator.with_cache(cache),
        None => navigator,
    })
}

/// Prints one answer; returns false when a title could not be resolved.
fn answer_one(
    ui: &Ui,
    format: OutputFormat,
    navigator: &Navigator,
    src: &str,
    dst: &str,
) -> Result<bool, Box<dyn Error>> {
    let report = match navigator.query(src, dst) {
        Ok(report) => report,
        Err(err) => {
            match format {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&LookupResponse {
                        src,
                        dst,
                        error: err.to_string(),
                    })?
                ),
                OutputFormat::Text => ui.notice(err),
            }
            return Ok(false);
        }
    };
    let response = PathResponse::new(navigator, src, dst, &report);
    emit(format, &response, || match report.outcome.path() {
        Some(path) => {
            let steps = std::iter::once(src).chain(response.hops.iter().map(hop_title));
            ui.trail(steps, path.len(), report.cached);
        }
        None => ui.notice(format!("{src} → {dst}: {}", report.outcome)),
    })?;
    Ok(true)
}

fn hop_title<'a>(hop: &Hop<'a>) -> &'a str {
    hop.title.unwrap_or("?")
}

struct Query {
    line: usize,
    src: String,
    dst: String,
    well_formed: bool,
}

fn read_queries(input: Option<&Path>) -> Result<Vec<Query>, Box<dyn Error>> {
    let reader: Box<dyn BufRead> = match input {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(BufReader::new(io::stdin())),
    };
    let mut queries = Vec::new();
    for (number, line) in (1usize..).zip(reader.lines()) {
        let line = line?;
        let line = line.strip_suffix('\r').unwrap_or(&line);
        if line.trim().is_empty() {
            continue;
        }
        let query = match line.split_once('\t') {
            Some((src, dst)) => Query {
                line: number,
                src: src.to_string(),
                dst: dst.to_string(),
                well_formed: true,
            },
            None => Query {
                line: number,
                src: line.to_string(),
                dst: String::new(),
                well_formed: false,
            },
        };
        queries.push(query);
    }
    Ok(queries)
}

#[derive(Debug, Serialize)]
struct BatchAnswer {
    line: usize,
    src: String,
    dst: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    titles: Vec<String>,
    cached: bool,
}

impl BatchAnswer {
    fn to_text(&self) -> String {
        let detail = match (&self.error, self.titles.is_empty()) {
            (Some(error), _) => error.clone(),
            (None, false) => self.titles.join(" > "),
            (None, true) => match self.status {
                Some(code) if code < 0 => "no such path exists".into(),
                Some(code) => format!("no path found after {code} iterations"),
                None => String::new(),
            },
        };
        let clicks = match self.status {
            Some(0) => (self.titles.len().saturating_sub(1)).to_string(),
            _ => "-".into(),
        };
        format!("{}\t{}\t{clicks}\t{detail}", self.src, self.dst)
    }
}

fn answer_batch(navigator: &Navigator, queries: &[Query], threads: usize) -> Vec<BatchAnswer> {
    let cursor = AtomicUsize::new(0);
    let mut answered: Vec<(usize, BatchAnswer)> = thread::scope(|scope| {
        let workers: Vec<_> = (0..threads.min(queries.len().max(1)))
            .map(|_| {
                scope.spawn(|| {
                    let mut local = Vec::new();
                    loop {
                        let at = cursor.fetch_add(1, Ordering::Relaxed);
                        let Some(query) = queries.get(at) else {
                            break;
                        };
                        local.push((at, answer_query(navigator, query)));
                    }
                    local
                })
            })
            .collect();
        workers
            .into_iter()
            .flat_map(|worker| {
                worker
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
            })
            .collect()
    });
    answered.sort_by_key(|(at, _)| *at);
    answered.into_iter().map(|(_, answer)| answer).collect()
}

fn answer_query(navigator: &Navigator, query: &Query) -> BatchAnswer {
    let mut answer = BatchAnswer {
        line: query.line,
        src: query.src.clone(),
        dst: query.dst.clone(),
        status: None,
        error: None,
        titles: Vec::new(),
        cached: false,
    };
    if !query.well_formed {
        answer.error = Some("expected SOURCE<TAB>DESTINATION".into());
        return answer;
    }
    match navigator.query(&query.src, &query.dst) {
        Ok(report) => {
            answer.status = Some(report.outcome.status_code());
            answer.cached = report.cached;
            if let Some(path) = report.outcome.path() {
                answer.titles.push(query.src.clone());
                answer.titles.extend(
                    navigator
                        .render(path)
                        .iter()
                        .map(|hop| hop_title(hop).to_string()),
                );
            }
        }
        Err(err) => answer.error = Some(err.to_string()),
    }
    answer
}

#[derive(Serialize)]
struct StatsResponse<'a> {
    index: &'a IndexStats,
    load: &'a LoadReport,
}

#[derive(Serialize)]
struct PathResponse<'a> {
    src: &'a str,
    dst: &'a str,
    status: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    clicks: Option<usize>,
    cached: bool,
    hops: Vec<Hop<'a>>,
}

impl<'a> PathResponse<'a> {
    fn new(navigator: &'a Navigator, src: &'a str, dst: &'a str, report: &QueryReport) -> Self {
        let path = report.outcome.path();
        Self {
            src,
            dst,
            status: report.outcome.status_code(),
            clicks: path.map(|path| path.len()),
            cached: report.cached,
            hops: path.map(|path| navigator.render(path)).unwrap_or_default(),
        }
    }
}

#[derive(Serialize)]
struct LookupResponse<'a> {
    src: &'a str,
    dst: &'a str,
    error: String,
}

fn emit<T, F>(format: OutputFormat, value: &T, printer: F) -> Result<(), Box<dyn Error>>
where
    T: Serialize,
    F: FnOnce(),
{
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
        }
        OutputFormat::Text => printer(),
    }
    Ok(())
}

fn print_stats_text(ui: &Ui, response: &StatsResponse<'_>) {
    let stats = response.index;
    ui.section(
        "Index",
        [
            ("capacity", stats.capacity.to_string()),
            ("entries", stats.entries.to_string()),
            ("stubs", stats.stubs.to_string()),
            ("links", stats.total_links.to_string()),
            ("load factor", format!("{:.4}", stats.load_factor())),
            ("max probe", stats.max_probe.to_string()),
            ("total probes", stats.total_probes.to_string()),
            ("restarts", stats.restarts.to_string()),
        ],
    );
    ui.section(
        "Load",
        [
            ("shards", response.load.shards.to_string()),
            ("pages", response.load.pages.to_string()),
            ("links", response.load.links.to_string()),
            ("elapsed", format_duration(response.load.elapsed)),
        ],
    );
}

fn print_history_text(ui: &Ui, entries: &[CachedPath]) {
    if entries.is_empty() {
        if !ui.is_quiet() {
            ui.notice("cache is empty");
        }
        return;
    }
    let labels: Vec<String> = entries
        .iter()
        .map(|entry| format!("{} → {}", entry.src, entry.dst))
        .collect();
    ui.section(
        "Cached queries",
        labels
            .iter()
            .zip(entries)
            .map(|(label, entry)| (label.as_str(), describe(entry))),
    );
}

fn describe(entry: &CachedPath) -> String {
    let times = if entry.count == 1 { "time" } else { "times" };
    let result = match &entry.outcome {
        CachedOutcome::Found(titles) => format!("{} clicks", titles.len()),
        CachedOutcome::Impossible => "no such path exists".to_string(),
        CachedOutcome::DepthExceeded(depth) => format!("no path found after {depth} iterations"),
    };
    format!("{result}, asked {} {times}", entry.count)
}
