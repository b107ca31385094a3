// Fantasy scoring: box-score stat lines to fantasy points.
//
// One stat-line record per unit type (offense, kicker, team defense,
// individual defensive player). Rule constants live in an immutable
// `ScoringRules` value built once and passed by reference into the pure
// point functions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Stat lines
// ---------------------------------------------------------------------------

/// Offensive box-score line (QB/RB/WR/TE). All counters default to zero.
///
/// The `e40` fields count 40+ yard plays (completions, rushes, receptions)
/// and the touchdowns scored on them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OffenseStatLine {
    #[serde(alias = "Comp")]
    pub completions: f64,
    #[serde(alias = "Incomp")]
    pub incompletions: f64,
    #[serde(alias = "PassYds")]
    pub pass_yds: f64,
    #[serde(alias = "PassTD")]
    pub pass_td: f64,
    #[serde(alias = "INT")]
    pub interceptions: f64,
    #[serde(alias = "PickSix")]
    pub pick_sixes: f64,
    #[serde(alias = "Pass1D")]
    pub pass_first_downs: f64,
    #[serde(alias = "RushYds")]
    pub rush_yds: f64,
    #[serde(alias = "RushTD")]
    pub rush_td: f64,
    #[serde(alias = "Rush1D")]
    pub rush_first_downs: f64,
    #[serde(alias = "Rec")]
    pub receptions: f64,
    #[serde(alias = "RecYds")]
    pub rec_yds: f64,
    #[serde(alias = "RecTD")]
    pub rec_td: f64,
    #[serde(alias = "Rec1D")]
    pub rec_first_downs: f64,
    #[serde(alias = "RetYds")]
    pub return_yds: f64,
    #[serde(alias = "RetTD")]
    pub return_td: f64,
    #[serde(alias = "TwoPt")]
    pub two_point_conversions: f64,
    #[serde(alias = "FumblesLost")]
    pub fumbles_lost: f64,
    #[serde(alias = "OffFumRetTD")]
    pub fumble_return_td: f64,
    #[serde(alias = "e40c")]
    pub pass_40_completions: f64,
    #[serde(alias = "e40ptd")]
    pub pass_40_td: f64,
    #[serde(alias = "e40r")]
    pub rush_40_attempts: f64,
    #[serde(alias = "e40rtd")]
    pub rush_40_td: f64,
    #[serde(alias = "e40rec")]
    pub rec_40_receptions: f64,
    #[serde(alias = "e40rectd")]
    pub rec_40_td: f64,
}

impl OffenseStatLine {
    /// Flatten into a category map keyed by field name, in a stable order.
    pub fn categories(&self) -> BTreeMap<String, f64> {
        let fields: [(&str, f64); 25] = [
            ("completions", self.completions),
            ("incompletions", self.incompletions),
            ("pass_yds", self.pass_yds),
            ("pass_td", self.pass_td),
            ("interceptions", self.interceptions),
            ("pick_sixes", self.pick_sixes),
            ("pass_first_downs", self.pass_first_downs),
            ("rush_yds", self.rush_yds),
            ("rush_td", self.rush_td),
            ("rush_first_downs", self.rush_first_downs),
            ("receptions", self.receptions),
            ("rec_yds", self.rec_yds),
            ("rec_td", self.rec_td),
            ("rec_first_downs", self.rec_first_downs),
            ("return_yds", self.return_yds),
            ("return_td", self.return_td),
            ("two_point_conversions", self.two_point_conversions),
            ("fumbles_lost", self.fumbles_lost),
            ("fumble_return_td", self.fumble_return_td),
            ("pass_40_completions", self.pass_40_completions),
            ("pass_40_td", self.pass_40_td),
            ("rush_40_attempts", self.rush_40_attempts),
            ("rush_40_td", self.rush_40_td),
            ("rec_40_receptions", self.rec_40_receptions),
            ("rec_40_td", self.rec_40_td),
        ];
        fields
            .iter()
            .map(|&(name, value)| (name.to_string(), value))
            .collect()
    }
}

/// Kicker line: made and missed field goals by distance bucket, plus PATs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KickerStatLine {
    #[serde(alias = "FG0_39")]
    pub fg_0_39: f64,
    #[serde(alias = "FG40_49")]
    pub fg_40_49: f64,
    #[serde(alias = "FG50_59")]
    pub fg_50_59: f64,
    #[serde(alias = "FG60")]
    pub fg_60_plus: f64,
    #[serde(alias = "FGMiss0_39")]
    pub fg_miss_0_39: f64,
    #[serde(alias = "FGMiss40_49")]
    pub fg_miss_40_49: f64,
    #[serde(alias = "FGMiss50_59")]
    pub fg_miss_50_59: f64,
    #[serde(alias = "FGMiss60")]
    pub fg_miss_60_plus: f64,
    #[serde(alias = "PAT")]
    pub pat: f64,
    #[serde(alias = "PATMiss")]
    pub pat_miss: f64,
}

/// Team defense / special teams line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DefenseStatLine {
    #[serde(alias = "Sack")]
    pub sacks: f64,
    #[serde(alias = "INT")]
    pub interceptions: f64,
    #[serde(alias = "FumRec")]
    pub fumble_recoveries: f64,
    #[serde(alias = "Safety")]
    pub safeties: f64,
    #[serde(alias = "TD")]
    pub touchdowns: f64,
    #[serde(alias = "BlkKick")]
    pub blocked_kicks: f64,
    #[serde(alias = "PtsAllow")]
    pub points_allowed: f64,
    #[serde(alias = "RetYds")]
    pub return_yds: f64,
    #[serde(alias = "RetTD")]
    pub return_td: f64,
}

/// Individual defensive player line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IdpStatLine {
    #[serde(alias = "TackleSolo")]
    pub tackles_solo: f64,
    #[serde(alias = "TackleAst")]
    pub tackles_assisted: f64,
    #[serde(alias = "Sack")]
    pub sacks: f64,
    #[serde(alias = "INT")]
    pub interceptions: f64,
    #[serde(alias = "FumForce")]
    pub forced_fumbles: f64,
    #[serde(alias = "FumRec")]
    pub fumble_recoveries: f64,
    #[serde(alias = "Safety")]
    pub safeties: f64,
    #[serde(alias = "TD")]
    pub touchdowns: f64,
    #[serde(alias = "PassDef")]
    pub passes_defensed: f64,
    #[serde(alias = "RetYds")]
    pub return_yds: f64,
    #[serde(alias = "RetTD")]
    pub return_td: f64,
}

/// A stat line tagged with its unit type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "unit", rename_all = "snake_case")]
pub enum StatLine {
    Offense(OffenseStatLine),
    Kicker(KickerStatLine),
    Defense(DefenseStatLine),
    Idp(IdpStatLine),
}

impl StatLine {
    /// Score this line with the matching unit's point function.
    pub fn points(&self, rules: &ScoringRules) -> f64 {
        match self {
            StatLine::Offense(line) => offense_points(line, rules),
            StatLine::Kicker(line) => kicker_points(line, rules),
            StatLine::Defense(line) => defense_points(line, rules),
            StatLine::Idp(line) => idp_points(line, rules),
        }
    }
}

// ---------------------------------------------------------------------------
// Rule constants
// ---------------------------------------------------------------------------

/// Cumulative yardage bonus: `points` for each threshold reached.
#[derive(Debug, Clone, PartialEq)]
pub struct YardageBonus {
    pub thresholds: Vec<f64>,
    pub points: f64,
}

impl YardageBonus {
    /// Bonus earned for a yardage total (count of thresholds reached x points).
    pub fn award(&self, yards: f64) -> f64 {
        bonus_count(yards, &self.thresholds) as f64 * self.points
    }
}

/// Per-unit offensive weights. Yardage is expressed as yards per point.
#[derive(Debug, Clone, PartialEq)]
pub struct OffenseRules {
    pub completion: f64,
    pub incompletion: f64,
    pub pass_yards_per_point: f64,
    pub pass_td: f64,
    pub interception: f64,
    pub pick_six: f64,
    pub pass_first_down: f64,
    pub pass_40_completion: f64,
    pub pass_40_td: f64,
    pub rush_yards_per_point: f64,
    pub rush_td: f64,
    pub rush_first_down: f64,
    pub rush_40: f64,
    pub rush_40_td: f64,
    pub reception: f64,
    pub rec_yards_per_point: f64,
    pub rec_td: f64,
    pub rec_first_down: f64,
    pub rec_40: f64,
    pub rec_40_td: f64,
    pub return_yards_per_point: f64,
    pub return_td: f64,
    pub two_point_conversion: f64,
    pub fumble_lost: f64,
    pub fumble_return_td: f64,
    pub pass_bonus: YardageBonus,
    pub rush_bonus: YardageBonus,
    pub rec_bonus: YardageBonus,
}

/// Kicker weights. Made field goals escalate with distance; every miss costs
/// the same penalty.
#[derive(Debug, Clone, PartialEq)]
pub struct KickerRules {
    pub fg_0_39: f64,
    pub fg_40_49: f64,
    pub fg_50_59: f64,
    pub fg_60_plus: f64,
    pub pat: f64,
    pub miss: f64,
}

/// One points-allowed tier: applies when `points_allowed <= max_allowed`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointsAllowedTier {
    pub max_allowed: f64,
    pub points: f64,
}

fn tier(max_allowed: f64, points: f64) -> PointsAllowedTier {
    PointsAllowedTier {
        max_allowed,
        points,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefenseRules {
    pub sack: f64,
    pub interception: f64,
    pub fumble_recovery: f64,
    pub safety: f64,
    pub touchdown: f64,
    pub blocked_kick: f64,
    pub return_yards_per_point: f64,
    pub return_td: f64,
    /// Ascending by `max_allowed`; the first tier that covers the total wins.
    pub points_allowed_tiers: Vec<PointsAllowedTier>,
    /// Applies above the last tier.
    pub points_allowed_floor: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdpRules {
    pub tackle_solo: f64,
    pub tackle_assisted: f64,
    pub sack: f64,
    pub interception: f64,
    pub forced_fumble: f64,
    pub fumble_recovery: f64,
    pub safety: f64,
    pub touchdown: f64,
    pub pass_defensed: f64,
    pub return_yards_per_point: f64,
    pub return_td: f64,
}

/// The league's complete scoring rule set.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringRules {
    pub offense: OffenseRules,
    pub kicker: KickerRules,
    pub defense: DefenseRules,
    pub idp: IdpRules,
}

impl ScoringRules {
    /// The compiled-in league rule set.
    pub fn standard() -> Self {
        ScoringRules {
            offense: OffenseRules {
                completion: 0.25,
                incompletion: -0.25,
                pass_yards_per_point: 25.0,
                pass_td: 6.0,
                interception: -2.0,
                pick_six: -2.0,
                pass_first_down: 0.5,
                pass_40_completion: 2.0,
                pass_40_td: 2.0,
                rush_yards_per_point: 10.0,
                rush_td: 6.0,
                rush_first_down: 0.5,
                rush_40: 2.0,
                rush_40_td: 2.0,
                reception: 1.0,
                rec_yards_per_point: 10.0,
                rec_td: 6.0,
                rec_first_down: 0.5,
                rec_40: 2.0,
                rec_40_td: 2.0,
                return_yards_per_point: 30.0,
                return_td: 6.0,
                two_point_conversion: 2.0,
                fumble_lost: -2.0,
                fumble_return_td: 6.0,
                pass_bonus: YardageBonus {
                    thresholds: vec![300.0, 400.0, 500.0],
                    points: 2.0,
                },
                rush_bonus: YardageBonus {
                    thresholds: vec![100.0, 150.0, 200.0],
                    points: 2.0,
                },
                rec_bonus: YardageBonus {
                    thresholds: vec![100.0, 150.0, 200.0],
                    points: 2.0,
                },
            },
            kicker: KickerRules {
                fg_0_39: 3.0,
                fg_40_49: 4.0,
                fg_50_59: 5.0,
                fg_60_plus: 6.0,
                pat: 1.0,
                miss: -1.0,
            },
            defense: DefenseRules {
                sack: 1.0,
                interception: 2.0,
                fumble_recovery: 2.0,
                safety: 2.0,
                touchdown: 6.0,
                blocked_kick: 2.0,
                return_yards_per_point: 30.0,
                return_td: 6.0,
                points_allowed_tiers: vec![
                    tier(0.0, 10.0),
                    tier(6.0, 7.0),
                    tier(13.0, 4.0),
                    tier(20.0, 1.0),
                    tier(27.0, 0.0),
                    tier(34.0, -1.0),
                ],
                points_allowed_floor: -4.0,
            },
            idp: IdpRules {
                tackle_solo: 1.5,
                tackle_assisted: 0.75,
                sack: 4.0,
                interception: 3.0,
                forced_fumble: 2.0,
                fumble_recovery: 2.0,
                safety: 2.0,
                touchdown: 6.0,
                pass_defensed: 1.5,
                return_yards_per_point: 30.0,
                return_td: 6.0,
            },
        }
    }
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self::standard()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Number of thresholds reached (`value >= threshold`).
pub fn bonus_count(value: f64, thresholds: &[f64]) -> usize {
    thresholds.iter().filter(|&&t| value >= t).count()
}

/// Points-allowed contribution for a team defense.
///
/// Tiers are contiguous: a total lands in the first tier whose upper bound
/// covers it, so 6 -> 1-6 tier and 7 -> 7-13 tier. Anything past the last
/// tier (35+) gets the floor.
pub fn points_allowed_score(points_allowed: f64, rules: &DefenseRules) -> f64 {
    rules
        .points_allowed_tiers
        .iter()
        .find(|tier| points_allowed <= tier.max_allowed)
        .map(|tier| tier.points)
        .unwrap_or(rules.points_allowed_floor)
}

// ---------------------------------------------------------------------------
// Point functions
// ---------------------------------------------------------------------------

/// Fantasy points for an offensive stat line.
pub fn offense_points(s: &OffenseStatLine, rules: &ScoringRules) -> f64 {
    let r = &rules.offense;

    let passing = r.completion * s.completions
        + r.incompletion * s.incompletions
        + s.pass_yds / r.pass_yards_per_point
        + r.pass_bonus.award(s.pass_yds)
        + r.pass_td * s.pass_td
        + r.interception * s.interceptions
        + r.pass_40_completion * s.pass_40_completions
        + r.pass_40_td * s.pass_40_td
        + r.pass_first_down * s.pass_first_downs
        + r.pick_six * s.pick_sixes;

    let rushing = s.rush_yds / r.rush_yards_per_point
        + r.rush_bonus.award(s.rush_yds)
        + r.rush_td * s.rush_td
        + r.rush_40 * s.rush_40_attempts
        + r.rush_40_td * s.rush_40_td
        + r.rush_first_down * s.rush_first_downs;

    let receiving = r.reception * s.receptions
        + s.rec_yds / r.rec_yards_per_point
        + r.rec_bonus.award(s.rec_yds)
        + r.rec_td * s.rec_td
        + r.rec_40 * s.rec_40_receptions
        + r.rec_40_td * s.rec_40_td
        + r.rec_first_down * s.rec_first_downs;

    let misc = s.return_yds / r.return_yards_per_point
        + r.return_td * s.return_td
        + r.two_point_conversion * s.two_point_conversions
        + r.fumble_lost * s.fumbles_lost
        + r.fumble_return_td * s.fumble_return_td;

    passing + rushing + receiving + misc
}

/// Fantasy points for a kicker stat line.
pub fn kicker_points(s: &KickerStatLine, rules: &ScoringRules) -> f64 {
    let r = &rules.kicker;
    let misses =
        s.fg_miss_0_39 + s.fg_miss_40_49 + s.fg_miss_50_59 + s.fg_miss_60_plus + s.pat_miss;

    r.fg_0_39 * s.fg_0_39
        + r.fg_40_49 * s.fg_40_49
        + r.fg_50_59 * s.fg_50_59
        + r.fg_60_plus * s.fg_60_plus
        + r.pat * s.pat
        + r.miss * misses
}

/// Fantasy points for a team defense / special teams stat line.
pub fn defense_points(s: &DefenseStatLine, rules: &ScoringRules) -> f64 {
    let r = &rules.defense;
    r.sack * s.sacks
        + r.interception * s.interceptions
        + r.fumble_recovery * s.fumble_recoveries
        + r.safety * s.safeties
        + r.touchdown * s.touchdowns
        + r.blocked_kick * s.blocked_kicks
        + s.return_yds / r.return_yards_per_point
        + r.return_td * s.return_td
        + points_allowed_score(s.points_allowed, r)
}

/// Fantasy points for an individual defensive player stat line.
pub fn idp_points(s: &IdpStatLine, rules: &ScoringRules) -> f64 {
    let r = &rules.idp;
    r.tackle_solo * s.tackles_solo
        + r.tackle_assisted * s.tackles_assisted
        + r.sack * s.sacks
        + r.interception * s.interceptions
        + r.forced_fumble * s.forced_fumbles
        + r.fumble_recovery * s.fumble_recoveries
        + r.safety * s.safeties
        + r.touchdown * s.touchdowns
        + r.pass_defensed * s.passes_defensed
        + s.return_yds / r.return_yards_per_point
        + r.return_td * s.return_td
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
