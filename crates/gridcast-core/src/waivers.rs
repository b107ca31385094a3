// Waiver shortlist and streamer rankings.
//
// The shortlist ranks every unrostered player by projected points over the
// team's worst projected rostered player (delta-xFP). Streamer rankings order
// team defenses or individual defenders league-wide by projection.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

use crate::data::RosterEntry;
use crate::position::{PlayerId, Position};

/// Probability drop per extra week of claim horizon.
const ACQUISITION_DECAY_PER_WEEK: f64 = 0.1;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A player in the league-wide pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolPlayer {
    pub id: PlayerId,
    pub name: String,
    /// Primary position.
    pub position: Position,
    /// Every position the player may start at (includes the primary one).
    pub eligible: Vec<Position>,
}

impl PoolPlayer {
    pub fn new(id: PlayerId, name: &str, position: Position) -> Self {
        PoolPlayer {
            id,
            name: name.to_string(),
            position,
            eligible: vec![position],
        }
    }

    pub fn with_eligible(
        id: PlayerId,
        name: &str,
        position: Position,
        eligible: Vec<Position>,
    ) -> Self {
        let mut eligible = eligible;
        if !eligible.contains(&position) {
            eligible.insert(0, position);
        }
        PoolPlayer {
            id,
            name: name.to_string(),
            position,
            eligible,
        }
    }

    pub fn plays(&self, pos: Position) -> bool {
        self.position == pos || self.eligible.contains(&pos)
    }
}

/// A player's projected points for one week.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeeklyProjection {
    pub player_id: PlayerId,
    pub week: u32,
    pub projected_points: f64,
}

impl WeeklyProjection {
    pub fn new(player_id: PlayerId, week: u32, projected_points: f64) -> Self {
        WeeklyProjection {
            player_id,
            week,
            projected_points,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaiverRankingRow {
    pub player_id: PlayerId,
    pub name: String,
    pub projected_points: f64,
    /// Projected points minus the team's worst rostered projection.
    pub delta_xfp: f64,
    pub acquisition_prob: f64,
    /// 1-based position in the shortlist.
    pub order: usize,
}

/// Unit kinds that are streamed week to week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamerKind {
    Defense,
    Idp,
}

impl StreamerKind {
    pub fn position(&self) -> Position {
        match self {
            StreamerKind::Defense => Position::Defense,
            StreamerKind::Idp => Position::Idp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamerRow {
    pub player_id: PlayerId,
    pub name: String,
    pub projected_points: f64,
    pub rank: usize,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Chance a claim lands, decaying linearly with the horizon in weeks:
/// `max(0, 1 - 0.1 * (horizon - 1))`, capped at 1.
pub fn acquisition_probability(horizon: u32) -> f64 {
    let decay = ACQUISITION_DECAY_PER_WEEK * (f64::from(horizon) - 1.0);
    (1.0 - decay).clamp(0.0, 1.0)
}

fn week_points(projections: &[WeeklyProjection], week: u32) -> HashMap<PlayerId, f64> {
    projections
        .iter()
        .filter(|p| p.week == week)
        .map(|p| (p.player_id, p.projected_points))
        .collect()
}

/// Descending by value, then ascending by id.
fn by_value_then_id(a: (f64, PlayerId), b: (f64, PlayerId)) -> Ordering {
    b.0.total_cmp(&a.0).then(a.1.cmp(&b.1))
}

// ---------------------------------------------------------------------------
// Rankings
// ---------------------------------------------------------------------------

/// Rank every unrostered, projected player against the team's worst
/// rostered projection for `week`.
///
/// All candidates are kept, including those with zero or negative delta.
/// Returns an empty list when the roster is empty or none of its players has
/// a projection for the week.
pub fn waiver_shortlist(
    roster: &[PlayerId],
    players: &[PoolPlayer],
    projections: &[WeeklyProjection],
    week: u32,
    horizon: u32,
) -> Vec<WaiverRankingRow> {
    if roster.is_empty() {
        debug!("waiver shortlist: empty roster for week {}", week);
        return Vec::new();
    }

    let points = week_points(projections, week);
    let worst = roster
        .iter()
        .filter_map(|id| points.get(id).copied())
        .min_by(f64::total_cmp);
    let Some(worst) = worst else {
        debug!("waiver shortlist: no rostered player has a week {} projection", week);
        return Vec::new();
    };

    let rostered: HashSet<PlayerId> = roster.iter().copied().collect();
    let acquisition_prob = acquisition_probability(horizon);

    let mut rows: Vec<WaiverRankingRow> = players
        .iter()
        .filter(|p| !rostered.contains(&p.id))
        .filter_map(|p| {
            let projected_points = *points.get(&p.id)?;
            Some(WaiverRankingRow {
                player_id: p.id,
                name: p.name.clone(),
                projected_points,
                delta_xfp: projected_points - worst,
                acquisition_prob,
                order: 0,
            })
        })
        .collect();

    rows.sort_by(|a, b| by_value_then_id((a.delta_xfp, a.player_id), (b.delta_xfp, b.player_id)));
    for (i, row) in rows.iter_mut().enumerate() {
        row.order = i + 1;
    }

    debug!(
        "waiver shortlist: {} candidates vs worst rostered {:.2} (week {})",
        rows.len(),
        worst,
        week
    );
    rows
}

/// Waiver shortlist for every team with a roster in `week`, keyed by team id.
///
/// Each team is ranked exactly as `waiver_shortlist` would rank it; a team
/// whose rostered players lack projections maps to an empty list.
pub fn league_shortlists(
    rosters: &[RosterEntry],
    players: &[PoolPlayer],
    projections: &[WeeklyProjection],
    week: u32,
    horizon: u32,
) -> BTreeMap<String, Vec<WaiverRankingRow>> {
    let mut by_team: BTreeMap<&str, Vec<PlayerId>> = BTreeMap::new();
    for entry in rosters.iter().filter(|r| r.week == week) {
        by_team
            .entry(entry.team_id.as_str())
            .or_default()
            .push(entry.player_id);
    }

    by_team
        .into_iter()
        .map(|(team, roster)| {
            let rows = waiver_shortlist(&roster, players, projections, week, horizon);
            (team.to_string(), rows)
        })
        .collect()
}

/// League-wide ranking of one streamable unit kind by `week` projection.
/// Players without a projection for the week are left out.
pub fn streamer_rankings(
    players: &[PoolPlayer],
    projections: &[WeeklyProjection],
    week: u32,
    kind: StreamerKind,
) -> Vec<StreamerRow> {
    let points = week_points(projections, week);
    let pos = kind.position();

    let mut rows: Vec<StreamerRow> = players
        .iter()
        .filter(|p| p.plays(pos))
        .filter_map(|p| {
            Some(StreamerRow {
                player_id: p.id,
                name: p.name.clone(),
                projected_points: *points.get(&p.id)?,
                rank: 0,
            })
        })
        .collect();

    rows.sort_by(|a, b| {
        by_value_then_id(
            (a.projected_points, a.player_id),
            (b.projected_points, b.player_id),
        )
    });
    for (i, row) in rows.iter_mut().enumerate() {
        row.rank = i + 1;
    }

    if rows.is_empty() {
        debug!("no {} streamers projected for week {}", pos, week);
    }
    rows
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
