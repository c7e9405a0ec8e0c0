use indicatif::{ProgressBar, ProgressStyle};
use nu_ansi_term::{Color, Style};
use std::fmt::Display;
use std::io::IsTerminal;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ColorChoice {
    Auto,
    Always,
    Never,
}

/// Terminal output helpers for text mode.
pub struct Ui {
    palette: Palette,
    paint: bool,
    quiet: bool,
    spinner_style: ProgressStyle,
}

impl Ui {
    pub fn new(color: ColorChoice, quiet: bool) -> Self {
        let paint = match color {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => std::io::stdout().is_terminal(),
        };

        #[cfg(windows)]
        if paint {
            let _ = nu_ansi_term::enable_ansi_support();
        }

        let spinner_style = ProgressStyle::with_template("{spinner} {msg} {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ");

        Self {
            palette: if paint { Palette::color() } else { Palette::plain() },
            paint,
            quiet,
            spinner_style,
        }
    }

    /// Aligned `key: value` rows under a heading.
    pub fn section<'a, I, V>(&self, title: &str, rows: I)
    where
        I: IntoIterator<Item = (&'a str, V)>,
        V: Display,
    {
        let rows: Vec<(&str, String)> = rows
            .into_iter()
            .map(|(key, value)| (key, value.to_string()))
            .collect();
        if rows.is_empty() {
            return;
        }
        println!("{}", self.palette.heading.paint(title));
        let width = rows.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
        for (key, value) in rows {
            println!(
                "  {} {}",
                self.palette.key.paint(format!("{key:>width$}:")),
                value
            );
        }
    }

    /// Prints a click path as `A → B → C`.
    pub fn trail<'a, I>(&self, steps: I, clicks: usize, cached: bool)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let arrow = self.palette.arrow.paint(" → ").to_string();
        let trail = steps
            .into_iter()
            .map(|title| self.palette.title.paint(title).to_string())
            .collect::<Vec<_>>()
            .join(arrow.as_str());
        let noun = if clicks == 1 { "click" } else { "clicks" };
        let origin = if cached { " (cached)" } else { "" };
        println!("{trail}");
        println!(
            "{} {clicks} {noun}{origin}",
            self.palette.success.paint(SUCCESS_ICON)
        );
    }

    pub fn notice(&self, message: impl Display) {
        println!("{} {message}", self.palette.warn.paint(NOTICE_ICON));
    }

    /// Starts a spinner on stderr that clears itself when the returned guard finishes.
    pub fn task(&self, label: impl Into<String>) -> TaskGuard {
        let label = label.into();
        let pb = (!self.quiet && self.paint).then(|| {
            let pb = ProgressBar::new_spinner();
            pb.set_style(self.spinner_style.clone());
            pb.set_message(label.clone());
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        });
        TaskGuard {
            label,
            start: Instant::now(),
            pb,
        }
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }
}

pub struct TaskGuard {
    label: String,
    start: Instant,
    pb: Option<ProgressBar>,
}

impl TaskGuard {
    pub fn finish(mut self) -> Duration {
        if let Some(pb) = self.pb.take() {
            pb.finish_and_clear();
        }
        self.start.elapsed()
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        if let Some(pb) = self.pb.take() {
            pb.abandon_with_message(format!(
                "{} failed after {}",
                self.label,
                format_duration(self.start.elapsed())
            ));
        }
    }
}

pub fn format_duration(duration: Duration) -> String {
    if duration.as_secs_f64() >= 1.0 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{:.0}ms", duration.as_secs_f64() * 1_000.0)
    }
}

struct Palette {
    heading: Style,
    key: Style,
    title: Style,
    arrow: Style,
    success: Style,
    warn: Style,
}

impl Palette {
    fn color() -> Self {
        Self {
            heading: Style::new().fg(Color::Purple).bold(),
            key: Style::new().fg(Color::LightBlue).bold(),
            title: Style::new().fg(Color::White).bold(),
            arrow: Style::new().fg(Color::DarkGray),
            success: Style::new().fg(Color::LightGreen).bold(),
            warn: Style::new().fg(Color::Yellow).bold(),
        }
    }

    fn plain() -> Self {
        Self {
            heading: Style::new(),
            key: Style::new(),
            title: Style::new(),
            arrow: Style::new(),
            success: Style::new(),
            warn: Style::new(),
        }
    }
}

const SUCCESS_ICON: &str = "✔";
const NOTICE_ICON: &str = "⚠";
