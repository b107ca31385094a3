// League data loading from CSV files.
//
// Players, historical baselines (long format, one metric per row), weekly
// situational modifiers, team rosters and optional externally sourced weekly
// projections. Malformed or non-finite rows are logged and skipped.

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::position::{positions_from_labels, PlayerId, Position};
use crate::projection::{
    project_week, weather_adjustment, PlayerBaseline, ProjectionInput, SituationalModifiers,
    WeeklyProjectionRecord,
};
use crate::scoring::ScoringRules;
use crate::waivers::{PoolPlayer, WeeklyProjection};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// One player on one team's roster for one week.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub team_id: String,
    pub week: u32,
    pub player_id: PlayerId,
}

/// Everything the engines need, loaded from disk.
#[derive(Debug, Clone, Default)]
pub struct LeagueData {
    pub players: Vec<PoolPlayer>,
    pub baselines: BTreeMap<PlayerId, PlayerBaseline>,
    pub modifiers: HashMap<(PlayerId, u32), SituationalModifiers>,
    pub rosters: Vec<RosterEntry>,
    pub external_projections: Vec<WeeklyProjection>,
}

impl LeagueData {
    /// Rostered player ids for a team and week, in file order.
    pub fn roster_for(&self, team_id: &str, week: u32) -> Vec<PlayerId> {
        self.rosters
            .iter()
            .filter(|r| r.week == week && r.team_id == team_id)
            .map(|r| r.player_id)
            .collect()
    }

    /// Modifiers for a player-week. Without an explicit row, `proe` comes
    /// from the player's baseline and weather is neutral.
    pub fn modifiers_for(&self, player_id: PlayerId, week: u32) -> SituationalModifiers {
        if let Some(m) = self.modifiers.get(&(player_id, week)) {
            return *m;
        }
        match self.baselines.get(&player_id) {
            Some(b) => SituationalModifiers::from_baseline(b, 1.0),
            None => SituationalModifiers::neutral(),
        }
    }

    pub fn player(&self, player_id: PlayerId) -> Option<&PoolPlayer> {
        self.players.iter().find(|p| p.id == player_id)
    }

    /// One projection input per player with a baseline, ordered by id.
    pub fn projection_inputs(&self, week: u32) -> Vec<ProjectionInput> {
        self.baselines
            .iter()
            .map(|(&player_id, baseline)| ProjectionInput {
                player_id,
                baseline: baseline.clone(),
                modifiers: self.modifiers_for(player_id, week),
            })
            .collect()
    }

    /// External projections for one week.
    pub fn external_projections_for(&self, week: u32) -> Vec<WeeklyProjection> {
        self.external_projections
            .iter()
            .filter(|p| p.week == week)
            .copied()
            .collect()
    }

    /// Every projection for a week under one source tag: offensive players
    /// projected from baselines, then external rows for anyone not covered
    /// (defenses, kickers, individual defenders).
    pub fn weekly_records(
        &self,
        week: u32,
        source: &str,
        rules: &ScoringRules,
    ) -> Vec<WeeklyProjectionRecord> {
        let mut records = project_week(&self.projection_inputs(week), week, source, rules);
        let covered: HashSet<PlayerId> = records.iter().map(|r| r.player_id).collect();
        for p in self.external_projections_for(week) {
            if covered.contains(&p.player_id) {
                debug!("player {} projected from baseline, ignoring external row", p.player_id);
                continue;
            }
            records.push(WeeklyProjectionRecord::from_points(
                p.player_id,
                week,
                source,
                p.projected_points,
            ));
        }
        records
    }
}

/// Resolved file locations for one load.
#[derive(Debug, Clone)]
pub struct DataFiles {
    pub players: PathBuf,
    pub baselines: PathBuf,
    pub modifiers: PathBuf,
    pub rosters: PathBuf,
    pub projections: Option<PathBuf>,
}

impl DataFiles {
    pub fn from_config(config: &Config) -> Self {
        let paths = &config.data_paths;
        DataFiles {
            players: config.resolve(&paths.players),
            baselines: config.resolve(&paths.baselines),
            modifiers: config.resolve(&paths.modifiers),
            rosters: config.resolve(&paths.rosters),
            projections: paths.projections.as_deref().map(|p| config.resolve(p)),
        }
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("validation error: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Raw CSV serde structs (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawPlayer {
    player_id: u64,
    name: String,
    position: String,
    /// `/`-separated, e.g. "RB/WR". Empty means primary position only.
    #[serde(default)]
    eligible: String,
}

#[derive(Debug, Deserialize)]
struct RawBaselineRow {
    player_id: u64,
    metric: String,
    value: f64,
}

#[derive(Debug, Deserialize)]
struct RawModifierRow {
    player_id: u64,
    week: u32,
    proe: f64,
    /// Explicit weather factor; wins over the forecast columns.
    #[serde(default)]
    waf: Option<f64>,
    #[serde(default)]
    wind_mph: Option<f64>,
    #[serde(default)]
    precip_pct: Option<f64>,
}

impl RawModifierRow {
    fn is_finite(&self) -> bool {
        self.proe.is_finite()
            && [self.waf, self.wind_mph, self.precip_pct]
                .iter()
                .flatten()
                .all(|v| v.is_finite())
    }

    /// `waf` column, else a factor derived from the forecast, else clear
    /// weather.
    fn weather_factor(&self) -> f64 {
        match (self.waf, self.wind_mph, self.precip_pct) {
            (Some(waf), _, _) => waf,
            (None, None, None) => 1.0,
            (None, wind, precip) => weather_adjustment(wind.unwrap_or(0.0), precip.unwrap_or(0.0)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawRosterRow {
    team_id: String,
    week: u32,
    player_id: u64,
}

#[derive(Debug, Deserialize)]
struct RawProjectionRow {
    player_id: u64,
    week: u32,
    #[serde(alias = "points")]
    projected_points: f64,
}

// ---------------------------------------------------------------------------
// Reader-based loaders (private, enable testing without temp files)
// ---------------------------------------------------------------------------

fn load_players_from_reader<R: Read>(rdr: R) -> Result<Vec<PoolPlayer>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(rdr);
    let mut players: Vec<PoolPlayer> = Vec::new();
    for result in reader.deserialize::<RawPlayer>() {
        match result {
            Ok(raw) => {
                let name = raw.name.trim();
                let Some(position) = Position::from_str_pos(&raw.position) else {
                    warn!("skipping player '{}': unknown position '{}'", name, raw.position);
                    continue;
                };
                if !position.is_player_position() {
                    warn!("skipping player '{}': '{}' is a slot label", name, raw.position);
                    continue;
                }
                let id = PlayerId(raw.player_id);
                if players.iter().any(|p| p.id == id) {
                    warn!("duplicate player id {} ('{}'), keeping the first", id, name);
                    continue;
                }
                let mut eligible = positions_from_labels(&raw.eligible);
                eligible.retain(Position::is_player_position);
                players.push(PoolPlayer::with_eligible(id, name, position, eligible));
            }
            Err(e) => {
                warn!("skipping malformed player row: {}", e);
            }
        }
    }
    Ok(players)
}

fn load_baselines_from_reader<R: Read>(
    rdr: R,
) -> Result<BTreeMap<PlayerId, PlayerBaseline>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut map: BTreeMap<PlayerId, PlayerBaseline> = BTreeMap::new();
    for result in reader.deserialize::<RawBaselineRow>() {
        match result {
            Ok(raw) => {
                let metric = raw.metric.trim();
                if !raw.value.is_finite() {
                    warn!(
                        "skipping baseline '{}' for player {}: non-finite value",
                        metric, raw.player_id
                    );
                    continue;
                }
                map.entry(PlayerId(raw.player_id))
                    .or_default()
                    .insert(metric, raw.value);
            }
            Err(e) => {
                warn!("skipping malformed baseline row: {}", e);
            }
        }
    }
    Ok(map)
}

fn load_modifiers_from_reader<R: Read>(
    rdr: R,
) -> Result<HashMap<(PlayerId, u32), SituationalModifiers>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(rdr);
    let mut map = HashMap::new();
    for result in reader.deserialize::<RawModifierRow>() {
        match result {
            Ok(raw) => {
                if !raw.is_finite() {
                    warn!(
                        "skipping modifiers for player {} week {}: non-finite value",
                        raw.player_id, raw.week
                    );
                    continue;
                }
                let key = (PlayerId(raw.player_id), raw.week);
                if map.contains_key(&key) {
                    warn!(
                        "duplicate modifiers for player {} week {}, using latest value",
                        raw.player_id, raw.week
                    );
                }
                map.insert(key, SituationalModifiers::new(raw.proe, raw.weather_factor()));
            }
            Err(e) => {
                warn!("skipping malformed modifier row: {}", e);
            }
        }
    }
    Ok(map)
}

fn load_rosters_from_reader<R: Read>(rdr: R) -> Result<Vec<RosterEntry>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut entries: Vec<RosterEntry> = Vec::new();
    for result in reader.deserialize::<RawRosterRow>() {
        match result {
            Ok(raw) => {
                let entry = RosterEntry {
                    team_id: raw.team_id.trim().to_string(),
                    week: raw.week,
                    player_id: PlayerId(raw.player_id),
                };
                if entries.contains(&entry) {
                    warn!(
                        "duplicate roster row: team '{}' week {} player {}",
                        entry.team_id, entry.week, entry.player_id
                    );
                    continue;
                }
                entries.push(entry);
            }
            Err(e) => {
                warn!("skipping malformed roster row: {}", e);
            }
        }
    }
    Ok(entries)
}

fn load_projections_from_reader<R: Read>(rdr: R) -> Result<Vec<WeeklyProjection>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut out = Vec::new();
    for result in reader.deserialize::<RawProjectionRow>() {
        match result {
            Ok(raw) => {
                if !raw.projected_points.is_finite() {
                    warn!(
                        "skipping projection for player {} week {}: non-finite value",
                        raw.player_id, raw.week
                    );
                    continue;
                }
                out.push(WeeklyProjection::new(
                    PlayerId(raw.player_id),
                    raw.week,
                    raw.projected_points,
                ));
            }
            Err(e) => {
                warn!("skipping malformed projection row: {}", e);
            }
        }
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Public path-based loaders
// ---------------------------------------------------------------------------

fn open(path: &Path) -> Result<std::fs::File, DataError> {
    std::fs::File::open(path).map_err(|e| DataError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

fn csv_err(path: &Path) -> impl FnOnce(csv::Error) -> DataError + '_ {
    move |e| DataError::Csv {
        path: path.display().to_string(),
        source: e,
    }
}

/// Load the player pool from `player_id,name,position[,eligible]`.
pub fn load_players(path: &Path) -> Result<Vec<PoolPlayer>, DataError> {
    load_players_from_reader(open(path)?).map_err(csv_err(path))
}

/// Load long-format baselines (`player_id,metric,value`).
pub fn load_baselines(path: &Path) -> Result<BTreeMap<PlayerId, PlayerBaseline>, DataError> {
    load_baselines_from_reader(open(path)?).map_err(csv_err(path))
}

/// Load per player-week modifiers
/// (`player_id,week,proe[,waf][,wind_mph][,precip_pct]`).
pub fn load_modifiers(
    path: &Path,
) -> Result<HashMap<(PlayerId, u32), SituationalModifiers>, DataError> {
    load_modifiers_from_reader(open(path)?).map_err(csv_err(path))
}

/// Load roster assignments (`team_id,week,player_id`).
pub fn load_rosters(path: &Path) -> Result<Vec<RosterEntry>, DataError> {
    load_rosters_from_reader(open(path)?).map_err(csv_err(path))
}

/// Load external weekly projections (`player_id,week,projected_points`).
pub fn load_weekly_projections(path: &Path) -> Result<Vec<WeeklyProjection>, DataError> {
    load_projections_from_reader(open(path)?).map_err(csv_err(path))
}

/// Load all league data using paths from the config.
pub fn load_all(config: &Config) -> Result<LeagueData, DataError> {
    load_all_from_files(&DataFiles::from_config(config))
}

/// Load all league data from explicit paths. Exposed for testing and flexibility.
pub fn load_all_from_files(files: &DataFiles) -> Result<LeagueData, DataError> {
    let players = load_players(&files.players)?;
    let baselines = load_baselines(&files.baselines)?;
    let modifiers = load_modifiers(&files.modifiers)?;
    let rosters = load_rosters(&files.rosters)?;

    if players.is_empty() {
        return Err(DataError::Validation(
            "player CSV produced zero valid rows".into(),
        ));
    }

    let external_projections = match &files.projections {
        Some(path) if path.exists() => load_weekly_projections(path)?,
        Some(path) => {
            info!("no external projections at {}", path.display());
            Vec::new()
        }
        None => Vec::new(),
    };

    info!(
        "loaded {} players, {} baselines, {} roster entries, {} external projections",
        players.len(),
        baselines.len(),
        rosters.len(),
        external_projections.len()
    );

    Ok(LeagueData {
        players,
        baselines,
        modifiers,
        rosters,
        external_projections,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
