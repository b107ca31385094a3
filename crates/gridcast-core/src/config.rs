// Configuration loading and parsing (league.toml, strategy.toml).

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::lineup::RosterSlotSpec;
use crate::position::Position;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub league: LeagueConfig,
    pub strategy: StrategyConfig,
    pub db_path: String,
    pub data_paths: DataPaths,
    /// Directory the config was loaded from; relative paths resolve here.
    pub base_dir: PathBuf,
}

impl Config {
    /// Resolve a configured path against the base directory. Absolute paths
    /// and ":memory:" pass through unchanged.
    pub fn resolve(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() || path == ":memory:" {
            p.to_path_buf()
        } else {
            self.base_dir.join(p)
        }
    }
}

// ---------------------------------------------------------------------------
// league.toml structs
// ---------------------------------------------------------------------------

/// Wrapper for the top-level `[league]` table in league.toml.
#[derive(Debug, Clone, Deserialize)]
struct LeagueFile {
    league: LeagueConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueConfig {
    pub name: String,
    pub platform: String,
    pub num_teams: usize,
    /// Full roster layout as the platform reports it, bench and IR included
    /// (e.g. `["QB", "WR", "WR", "RB", "RB", "TE", "W/R/T", "K", "DEF", "BN"]`).
    pub roster_positions: Vec<String>,
}

impl LeagueConfig {
    /// Parsed roster layout. Labels are checked during validation, so
    /// unknown ones only appear here for an unvalidated config and are
    /// dropped.
    pub fn roster_slots(&self) -> Vec<Position> {
        self.roster_positions
            .iter()
            .filter_map(|label| Position::from_str_pos(label))
            .collect()
    }

    /// Slots the lineup optimizer fills.
    pub fn starting_slots(&self) -> RosterSlotSpec {
        RosterSlotSpec::starting(&self.roster_slots())
    }
}

// ---------------------------------------------------------------------------
// strategy.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire strategy.toml file.
#[derive(Debug, Clone, Deserialize)]
struct StrategyFile {
    projections: ProjectionsSection,
    waivers: WaiverConfig,
    database: DatabaseSection,
    data_paths: DataPaths,
}

#[derive(Debug, Clone, Deserialize)]
struct ProjectionsSection {
    #[serde(default = "default_source")]
    source: String,
}

fn default_source() -> String {
    "internal".to_string()
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

/// The public strategy config assembled from the strategy.toml sections.
#[derive(Debug, Clone)]
pub struct StrategyConfig {
    /// Tag stored with every projection this tool writes.
    pub projection_source: String,
    pub waivers: WaiverConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WaiverConfig {
    /// Claim horizon in weeks; drives acquisition probability.
    pub horizon: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataPaths {
    pub players: String,
    pub baselines: String,
    pub modifiers: String,
    pub rosters: String,
    /// Optional externally sourced weekly projections (DEF, K, IDP, ...).
    #[serde(default)]
    pub projections: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

const CONFIG_DIR: &str = "config";
const DEFAULTS_DIR: &str = "defaults";

/// Read `config/league.toml` and `config/strategy.toml` under `base_dir` and
/// validate the result. Missing files are an error here; `load_config`
/// seeds them from `defaults/` first.
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join(CONFIG_DIR);
    let league: LeagueFile = read_toml(&config_dir.join("league.toml"))?;
    let strategy: StrategyFile = read_toml(&config_dir.join("strategy.toml"))?;

    let config = Config {
        league: league.league,
        strategy: StrategyConfig {
            projection_source: strategy.projections.source,
            waivers: strategy.waivers,
        },
        db_path: strategy.database.path,
        data_paths: strategy.data_paths,
        base_dir: base_dir.to_path_buf(),
    };
    validate(&config)?;
    Ok(config)
}

/// Seed `config/` with every file from `defaults/` that is not there yet.
///
/// Existing files are never overwritten and `*.example` templates are left
/// alone. Returns the paths written. Without a `defaults/` directory this is
/// a no-op as long as `config/` exists.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join(DEFAULTS_DIR);
    let config_dir = base_dir.join(CONFIG_DIR);

    if !defaults_dir.is_dir() {
        return if config_dir.is_dir() {
            Ok(Vec::new())
        } else {
            Err(copy_error(format!(
                "no {DEFAULTS_DIR}/ or {CONFIG_DIR}/ under {}; check --base-dir",
                base_dir.display()
            )))
        };
    }

    fs::create_dir_all(&config_dir)
        .map_err(|e| copy_error(format!("cannot create {}: {e}", config_dir.display())))?;

    let mut sources: Vec<PathBuf> = fs::read_dir(&defaults_dir)
        .map_err(|e| copy_error(format!("cannot list {}: {e}", defaults_dir.display())))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext != "example"))
        .collect();
    sources.sort();

    let mut written = Vec::new();
    for source in sources {
        let Some(name) = source.file_name() else {
            continue;
        };
        let target = config_dir.join(name);
        if copy_default(&source, &target)? {
            info!("created {} from defaults", target.display());
            written.push(target);
        }
    }
    Ok(written)
}

/// Load config relative to `base_dir`, copying defaults for any missing
/// files first.
pub fn load_config(base_dir: &Path) -> Result<Config, ConfigError> {
    ensure_config_files(base_dir)?;
    load_config_from(base_dir)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::ParseError {
        path: path.to_path_buf(),
        source,
    })
}

/// Copy `source` to `target` unless `target` already exists. The existence
/// check and the create are one step (`create_new`), so a concurrent writer
/// never gets clobbered.
fn copy_default(source: &Path, target: &Path) -> Result<bool, ConfigError> {
    let mut dest = match fs::OpenOptions::new().write(true).create_new(true).open(target) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(copy_error(format!("cannot create {}: {e}", target.display()))),
    };
    let body = fs::read(source)
        .map_err(|e| copy_error(format!("cannot read {}: {e}", source.display())))?;
    dest.write_all(&body)
        .map_err(|e| copy_error(format!("cannot write {}: {e}", target.display())))?;
    Ok(true)
}

fn copy_error(message: String) -> ConfigError {
    ConfigError::DefaultsCopyError { message }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.league.num_teams == 0 {
        return Err(ConfigError::ValidationError {
            field: "league.num_teams".into(),
            message: "must be greater than 0".into(),
        });
    }

    for label in &config.league.roster_positions {
        if Position::from_str_pos(label).is_none() {
            return Err(ConfigError::ValidationError {
                field: "league.roster_positions".into(),
                message: format!("unknown roster position '{label}'"),
            });
        }
    }

    if config.league.starting_slots().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "league.roster_positions".into(),
            message: "must contain at least one starting slot".into(),
        });
    }

    if config.strategy.waivers.horizon == 0 {
        return Err(ConfigError::ValidationError {
            field: "waivers.horizon".into(),
            message: "must be at least 1".into(),
        });
    }

    if config.strategy.projection_source.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "projections.source".into(),
            message: "must not be empty".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
