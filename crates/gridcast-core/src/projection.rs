// Offensive projection from baseline rates and situational modifiers.
//
// Baseline volume (attempts, rushes, targets) is scaled by pass-rate-over-
// expected (pass game only) and the weather adjustment factor, turned into an
// expected stat line with per-play efficiency rates, then scored.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::position::PlayerId;
use crate::scoring::{offense_points, OffenseStatLine, ScoringRules};

// ---------------------------------------------------------------------------
// Baseline metric keys and defaults
// ---------------------------------------------------------------------------

pub const PASS_ATTEMPTS: &str = "pass_attempts";
pub const COMP_RATE: &str = "comp_rate";
pub const YARDS_PER_ATTEMPT: &str = "yards_per_attempt";
pub const TD_RATE: &str = "td_rate";
pub const INT_RATE: &str = "int_rate";
pub const RUSH_ATTEMPTS: &str = "rush_attempts";
pub const YARDS_PER_RUSH: &str = "yards_per_rush";
pub const RUSH_TD_RATE: &str = "rush_td_rate";
pub const TARGETS: &str = "targets";
pub const CATCH_RATE: &str = "catch_rate";
pub const YARDS_PER_REC: &str = "yards_per_rec";
pub const REC_TD_RATE: &str = "rec_td_rate";
pub const PROE: &str = "proe";

const DEFAULT_COMP_RATE: f64 = 0.65;
const DEFAULT_YARDS_PER_ATTEMPT: f64 = 7.0;
const DEFAULT_TD_RATE: f64 = 0.05;
const DEFAULT_INT_RATE: f64 = 0.02;
const DEFAULT_YARDS_PER_RUSH: f64 = 4.0;
const DEFAULT_RUSH_TD_RATE: f64 = 0.02;
const DEFAULT_CATCH_RATE: f64 = 0.6;
const DEFAULT_YARDS_PER_REC: f64 = 10.0;
const DEFAULT_REC_TD_RATE: f64 = 0.05;

/// Wind at or below this speed leaves the game untouched.
const CALM_WIND_MPH: f64 = 10.0;
const WIND_PENALTY_PER_MPH: f64 = 0.01;
/// Precipitation chance at which the wet-ball penalty applies.
const WET_PRECIP_PCT: f64 = 50.0;
const WET_PENALTY: f64 = 0.1;
const MIN_WEATHER_FACTOR: f64 = 0.5;

/// Variance contributed by every opportunity (pass attempt, rush, target)
/// regardless of efficiency rates.
const OPPORTUNITY_VARIANCE: f64 = 0.05;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Historical per-player rates keyed by metric name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerBaseline {
    metrics: HashMap<String, f64>,
}

impl PlayerBaseline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for fixtures.
    pub fn with(mut self, metric: &str, value: f64) -> Self {
        self.insert(metric, value);
        self
    }

    pub fn insert(&mut self, metric: &str, value: f64) {
        self.metrics.insert(metric.to_string(), value);
    }

    pub fn get(&self, metric: &str) -> Option<f64> {
        self.metrics.get(metric).copied()
    }

    /// Metric value, or `default` when the key is absent.
    pub fn get_or(&self, metric: &str, default: f64) -> f64 {
        self.get(metric).unwrap_or(default)
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Whether any volume metric (attempts, rushes, targets) is positive.
    pub fn has_volume(&self) -> bool {
        [PASS_ATTEMPTS, RUSH_ATTEMPTS, TARGETS]
            .iter()
            .any(|m| self.get(m).is_some_and(|v| v > 0.0))
    }
}

impl FromIterator<(String, f64)> for PlayerBaseline {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        PlayerBaseline {
            metrics: iter.into_iter().collect(),
        }
    }
}

/// Baseline resolved against the documented defaults. Volume metrics default
/// to zero; efficiency rates default to league-typical values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffenseRates {
    pub pass_attempts: f64,
    pub comp_rate: f64,
    pub yards_per_attempt: f64,
    pub td_rate: f64,
    pub int_rate: f64,
    pub rush_attempts: f64,
    pub yards_per_rush: f64,
    pub rush_td_rate: f64,
    pub targets: f64,
    pub catch_rate: f64,
    pub yards_per_rec: f64,
    pub rec_td_rate: f64,
}

impl OffenseRates {
    pub fn from_baseline(b: &PlayerBaseline) -> Self {
        OffenseRates {
            pass_attempts: b.get_or(PASS_ATTEMPTS, 0.0),
            comp_rate: b.get_or(COMP_RATE, DEFAULT_COMP_RATE),
            yards_per_attempt: b.get_or(YARDS_PER_ATTEMPT, DEFAULT_YARDS_PER_ATTEMPT),
            td_rate: b.get_or(TD_RATE, DEFAULT_TD_RATE),
            int_rate: b.get_or(INT_RATE, DEFAULT_INT_RATE),
            rush_attempts: b.get_or(RUSH_ATTEMPTS, 0.0),
            yards_per_rush: b.get_or(YARDS_PER_RUSH, DEFAULT_YARDS_PER_RUSH),
            rush_td_rate: b.get_or(RUSH_TD_RATE, DEFAULT_RUSH_TD_RATE),
            targets: b.get_or(TARGETS, 0.0),
            catch_rate: b.get_or(CATCH_RATE, DEFAULT_CATCH_RATE),
            yards_per_rec: b.get_or(YARDS_PER_REC, DEFAULT_YARDS_PER_REC),
            rec_td_rate: b.get_or(REC_TD_RATE, DEFAULT_REC_TD_RATE),
        }
    }
}

/// Per player-week game environment.
///
/// `proe` scales pass-game volume by `1 + proe`; `waf` dampens yardage-
/// producing volume and is expected in `[0.5, 1.0]`. Neither is validated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SituationalModifiers {
    pub proe: f64,
    pub waf: f64,
}

impl SituationalModifiers {
    pub fn new(proe: f64, waf: f64) -> Self {
        SituationalModifiers { proe, waf }
    }

    /// No pass-rate adjustment, clear weather.
    pub fn neutral() -> Self {
        SituationalModifiers {
            proe: 0.0,
            waf: 1.0,
        }
    }

    /// Read `proe` from the player's baseline (default 0.0) and pair it with
    /// the game's weather factor.
    pub fn from_baseline(baseline: &PlayerBaseline, waf: f64) -> Self {
        SituationalModifiers {
            proe: baseline.get_or(PROE, 0.0),
            waf,
        }
    }
}

/// Weather adjustment factor from a game forecast.
///
/// Each mph of wind above 10 costs 0.01 and a precipitation chance of 50%
/// or more costs another 0.1. The result is clamped to `[0.5, 1.0]`.
pub fn weather_adjustment(wind_mph: f64, precip_pct: f64) -> f64 {
    let wind = WIND_PENALTY_PER_MPH * (wind_mph - CALM_WIND_MPH).max(0.0);
    let wet = if precip_pct >= WET_PRECIP_PCT {
        WET_PENALTY
    } else {
        0.0
    };
    (1.0 - wind - wet).clamp(MIN_WEATHER_FACTOR, 1.0)
}

impl Default for SituationalModifiers {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Output of a single projection: expected stat line by category, projected
/// points, and a variance estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionRecord {
    pub categories: BTreeMap<String, f64>,
    pub projected_points: f64,
    pub variance: f64,
}

/// A projection tagged with the (player, week, source) it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyProjectionRecord {
    pub player_id: PlayerId,
    pub week: u32,
    pub source: String,
    #[serde(flatten)]
    pub projection: ProjectionRecord,
}

impl WeeklyProjectionRecord {
    /// Record for a point value produced elsewhere: no categories and zero
    /// variance.
    pub fn from_points(player_id: PlayerId, week: u32, source: &str, points: f64) -> Self {
        WeeklyProjectionRecord {
            player_id,
            week,
            source: source.to_string(),
            projection: ProjectionRecord {
                categories: BTreeMap::new(),
                projected_points: points,
                variance: 0.0,
            },
        }
    }
}

/// One player's inputs for a weekly projection run.
#[derive(Debug, Clone)]
pub struct ProjectionInput {
    pub player_id: PlayerId,
    pub baseline: PlayerBaseline,
    pub modifiers: SituationalModifiers,
}

// ---------------------------------------------------------------------------
// Estimator
// ---------------------------------------------------------------------------

/// Expected offensive stat line for one player-week.
pub fn expected_offense_line(
    rates: &OffenseRates,
    modifiers: &SituationalModifiers,
) -> OffenseStatLine {
    let SituationalModifiers { proe, waf } = *modifiers;

    let pass_att = rates.pass_attempts * (1.0 + proe) * waf;
    let completions = pass_att * rates.comp_rate;
    let pass_yds = pass_att * rates.yards_per_attempt * waf;
    let pass_td = pass_att * rates.td_rate;
    let interceptions = pass_att * rates.int_rate;

    // proe only moves pass-game volume
    let rush_att = rates.rush_attempts * waf;
    let rush_yds = rush_att * rates.yards_per_rush;
    let rush_td = rush_att * rates.rush_td_rate;

    let targets = rates.targets * (1.0 + proe) * waf;
    let receptions = targets * rates.catch_rate;
    let rec_yds = receptions * rates.yards_per_rec * waf;
    let rec_td = receptions * rates.rec_td_rate;

    OffenseStatLine {
        completions,
        incompletions: (pass_att - completions).max(0.0),
        pass_yds,
        pass_td,
        interceptions,
        rush_yds,
        rush_td,
        receptions,
        rec_yds,
        rec_td,
        ..Default::default()
    }
}

/// Variance of projected points.
///
/// Event counts are treated as Poisson (variance equals the mean), so each
/// scoring event contributes `weight^2 * count`. Yardage contributes
/// `plays * (yards_per_play / yards_per_point)^2`. Every opportunity adds a
/// fixed floor so the estimate is positive whenever there is any volume.
pub fn offense_variance(
    rates: &OffenseRates,
    modifiers: &SituationalModifiers,
    line: &OffenseStatLine,
    rules: &ScoringRules,
) -> f64 {
    let r = &rules.offense;
    let SituationalModifiers { proe, waf } = *modifiers;

    let pass_att = rates.pass_attempts * (1.0 + proe) * waf;
    let rush_att = rates.rush_attempts * waf;
    let targets = rates.targets * (1.0 + proe) * waf;

    let events = r.completion.powi(2) * line.completions
        + r.incompletion.powi(2) * line.incompletions
        + r.pass_td.powi(2) * line.pass_td
        + r.interception.powi(2) * line.interceptions
        + r.rush_td.powi(2) * line.rush_td
        + r.reception.powi(2) * line.receptions
        + r.rec_td.powi(2) * line.rec_td;

    let yardage = pass_att * (rates.yards_per_attempt * waf / r.pass_yards_per_point).powi(2)
        + rush_att * (rates.yards_per_rush / r.rush_yards_per_point).powi(2)
        + line.receptions * (rates.yards_per_rec * waf / r.rec_yards_per_point).powi(2);

    let floor = OPPORTUNITY_VARIANCE * (pass_att + rush_att + targets);

    events + yardage + floor
}

/// Project one player's offensive week.
///
/// Missing baseline keys fall back to documented defaults. Projected points
/// are floored at zero; the category map keeps the raw expected line.
pub fn project_offense(
    baseline: &PlayerBaseline,
    modifiers: &SituationalModifiers,
    rules: &ScoringRules,
) -> ProjectionRecord {
    let rates = OffenseRates::from_baseline(baseline);
    let line = expected_offense_line(&rates, modifiers);
    let points = offense_points(&line, rules);
    let variance = offense_variance(&rates, modifiers, &line, rules);

    ProjectionRecord {
        categories: line.categories(),
        projected_points: points.max(0.0),
        variance,
    }
}

/// Project every player with offensive volume for one week and source.
///
/// Players whose baseline has no positive volume metric are skipped.
pub fn project_week(
    inputs: &[ProjectionInput],
    week: u32,
    source: &str,
    rules: &ScoringRules,
) -> Vec<WeeklyProjectionRecord> {
    let mut records = Vec::with_capacity(inputs.len());
    for input in inputs {
        if !input.baseline.has_volume() {
            debug!("skipping player {}: baseline has no volume metrics", input.player_id);
            continue;
        }
        records.push(WeeklyProjectionRecord {
            player_id: input.player_id,
            week,
            source: source.to_string(),
            projection: project_offense(&input.baseline, &input.modifiers, rules),
        });
    }
    debug!("projected {} of {} players for week {}", records.len(), inputs.len(), week);
    records
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
