use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use wikilinks::{Config, LinkError};

/// Settings read from the optional TOML file, with command-line overrides applied later.
#[derive(Debug, Default)]
pub struct CliConfig {
    path: Option<PathBuf>,
    config: Config,
    cache: Option<PathBuf>,
}

impl CliConfig {
    /// Loads `explicit`, or the per-user default file when it exists.
    ///
    /// An explicitly named file must exist; a missing default file means built-in defaults.
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        let (path, raw) = match explicit {
            Some(path) => {
                let raw = read_file(&path)?;
                (Some(path), raw)
            }
            None => match default_config_path().filter(|path| path.exists()) {
                Some(path) => {
                    let raw = read_file(&path)?;
                    (Some(path), raw)
                }
                None => (None, RawConfig::default()),
            },
        };
        let config = raw.resolve()?;
        Ok(Self {
            path,
            config,
            cache: raw.cache.path,
        })
    }

    /// File the settings came from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Effective library configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Default result-cache database.
    pub fn cache_path(&self) -> Option<&Path> {
        self.cache.as_deref()
    }
}

fn read_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn preset(name: &str) -> Option<Config> {
    match name {
        "default" | "balanced" => Some(Config::default()),
        "compact" => Some(Config::compact()),
        "server" => Some(Config::server()),
        "testing" => Some(Config::testing()),
        _ => None,
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    preset: Option<String>,
    #[serde(default)]
    index: RawIndex,
    #[serde(default)]
    search: RawSearch,
    #[serde(default)]
    cache: CacheSection,
}

impl RawConfig {
    fn resolve(&self) -> Result<Config, ConfigError> {
        let mut config = match self.preset.as_deref() {
            Some(name) => preset(name).ok_or_else(|| ConfigError::UnknownPreset {
                name: name.to_string(),
            })?,
            None => Config::default(),
        };
        let index = &mut config.index;
        if let Some(value) = self.index.over_provision {
            index.over_provision = value;
        }
        if let Some(value) = self.index.headroom {
            index.headroom = value;
        }
        if let Some(value) = self.index.stripe_count {
            index.stripe_count = value;
        }
        if let Some(value) = self.index.probe_limit {
            index.probe_limit = value;
        }
        let search = &mut config.search;
        if let Some(value) = self.search.max_depth {
            search.max_depth = value;
        }
        if let Some(value) = self.search.permits {
            search.permits = value;
        }
        if let Some(value) = self.search.coalesce {
            search.coalesce = value;
        }
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawIndex {
    over_provision: Option<u64>,
    headroom: Option<u64>,
    stripe_count: Option<usize>,
    probe_limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSearch {
    max_depth: Option<usize>,
    permits: Option<usize>,
    coalesce: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CacheSection {
    path: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("unknown preset '{name}' (expected default, compact, server or testing)")]
    UnknownPreset { name: String },
    #[error("invalid config: {0}")]
    Invalid(LinkError),
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("wikilinks").join("config.toml"))
}
