// Starting lineup optimizer.
//
// Fills an ordered list of roster slots with distinct eligible players so the
// summed projection is maximal. Depth-first over slots in order, candidates in
// input order, keeping the first maximum found (strict `>`). Branches are cut
// when a remaining slot has nobody left to fill it or when the optimistic
// bound cannot beat the incumbent.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::position::{PlayerId, Position};
use crate::waivers::{PoolPlayer, WeeklyProjection};

/// Slack used when comparing an optimistic bound against the incumbent, so
/// floating-point summation order never prunes a branch that would tie.
const BOUND_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// One player available to the optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineupCandidate {
    pub player_id: PlayerId,
    pub positions: Vec<Position>,
    pub projected_points: f64,
}

impl LineupCandidate {
    pub fn new(player_id: PlayerId, positions: Vec<Position>, projected_points: f64) -> Self {
        LineupCandidate {
            player_id,
            positions,
            projected_points,
        }
    }
}

/// Ordered slots to fill. Order only determines how the result is reported
/// and which of several equal-scoring lineups wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterSlotSpec {
    slots: Vec<Position>,
}

impl RosterSlotSpec {
    pub fn new(slots: Vec<Position>) -> Self {
        RosterSlotSpec { slots }
    }

    /// Parse slot labels such as `["QB", "RB", "FLEX", "DST"]`.
    pub fn parse<S: AsRef<str>>(labels: &[S]) -> Result<Self, LineupError> {
        let mut slots = Vec::with_capacity(labels.len());
        for label in labels {
            let label = label.as_ref();
            let pos = Position::from_str_pos(label)
                .ok_or_else(|| LineupError::UnknownSlot(label.to_string()))?;
            slots.push(pos);
        }
        Ok(RosterSlotSpec { slots })
    }

    /// Starting slots from a league's full roster layout (bench and IR
    /// dropped).
    pub fn starting(roster_positions: &[Position]) -> Self {
        RosterSlotSpec {
            slots: roster_positions
                .iter()
                .copied()
                .filter(|p| !p.is_meta_slot())
                .collect(),
        }
    }

    pub fn slots(&self) -> &[Position] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Which players a slot accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityRules {
    pub flex_positions: Vec<Position>,
}

impl EligibilityRules {
    /// FLEX takes RB, WR or TE.
    pub fn standard() -> Self {
        EligibilityRules {
            flex_positions: vec![
                Position::RunningBack,
                Position::WideReceiver,
                Position::TightEnd,
            ],
        }
    }

    /// Whether a player with `positions` may fill `slot`.
    pub fn accepts(&self, slot: Position, positions: &[Position]) -> bool {
        match slot {
            Position::Flex => positions.iter().any(|p| self.flex_positions.contains(p)),
            Position::Bench | Position::InjuredReserve => false,
            exact => positions.contains(&exact),
        }
    }
}

impl Default for EligibilityRules {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineupAssignment {
    pub slot: Position,
    pub player_id: PlayerId,
    pub projected_points: f64,
}

/// Optimizer result: one assignment per slot, in slot order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lineup {
    pub assignments: Vec<LineupAssignment>,
    pub total_points: f64,
}

impl Lineup {
    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.assignments.iter().map(|a| a.player_id).collect()
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LineupError {
    #[error("no feasible lineup: cannot fill {slots} slots from {candidates} candidates")]
    Infeasible { slots: usize, candidates: usize },

    #[error("unknown roster slot label '{0}'")]
    UnknownSlot(String),
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// Explicit backtracking state: pool arena, per-slot eligible indices, used
/// flags, the partial assignment and the incumbent.
struct SearchState<'a> {
    candidates: &'a [LineupCandidate],
    /// Candidate indices eligible for each slot, in input order.
    eligible: Vec<Vec<usize>>,
    /// First candidate index carrying the same player id. `used` is keyed by
    /// this, so a player listed twice still starts at most once.
    owner: Vec<usize>,
    used: Vec<bool>,
    current: Vec<usize>,
    score: f64,
    best: Option<(Vec<usize>, f64)>,
    prune: bool,
    nodes: u64,
    cuts: u64,
}

impl<'a> SearchState<'a> {
    fn new(
        candidates: &'a [LineupCandidate],
        slots: &RosterSlotSpec,
        rules: &EligibilityRules,
        prune: bool,
    ) -> Self {
        let eligible = slots
            .slots()
            .iter()
            .map(|&slot| {
                candidates
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| rules.accepts(slot, &c.positions))
                    .map(|(i, _)| i)
                    .collect()
            })
            .collect();
        let mut first_index: HashMap<PlayerId, usize> = HashMap::new();
        let owner = candidates
            .iter()
            .enumerate()
            .map(|(i, c)| *first_index.entry(c.player_id).or_insert(i))
            .collect();
        SearchState {
            candidates,
            eligible,
            owner,
            used: vec![false; candidates.len()],
            current: Vec::with_capacity(slots.len()),
            score: 0.0,
            best: None,
            prune,
            nodes: 0,
            cuts: 0,
        }
    }

    /// Optimistic total for completing from `slot`: current score plus the
    /// best unused eligible candidate for every remaining slot, ignoring
    /// reuse. `None` when some remaining slot has no unused candidate.
    fn upper_bound(&self, slot: usize) -> Option<f64> {
        let mut bound = self.score;
        for eligible in &self.eligible[slot..] {
            let best = eligible
                .iter()
                .filter(|&&i| !self.used[self.owner[i]])
                .map(|&i| self.candidates[i].projected_points)
                .fold(None, |acc: Option<f64>, p| Some(acc.map_or(p, |a| a.max(p))))?;
            bound += best;
        }
        Some(bound)
    }

    fn should_cut(&self, slot: usize) -> bool {
        match self.upper_bound(slot) {
            None => true,
            Some(bound) => match &self.best {
                Some((_, best)) => bound < best - BOUND_EPSILON,
                None => false,
            },
        }
    }

    fn search(&mut self, slot: usize) {
        self.nodes += 1;

        if slot == self.eligible.len() {
            let improves = match &self.best {
                Some((_, best)) => self.score > *best,
                None => true,
            };
            if improves {
                self.best = Some((self.current.clone(), self.score));
            }
            return;
        }

        if self.prune && self.should_cut(slot) {
            self.cuts += 1;
            return;
        }

        for k in 0..self.eligible[slot].len() {
            let idx = self.eligible[slot][k];
            let key = self.owner[idx];
            if self.used[key] {
                continue;
            }
            let points = self.candidates[idx].projected_points;

            self.used[key] = true;
            self.current.push(idx);
            let saved = self.score;
            self.score += points;

            self.search(slot + 1);

            self.score = saved;
            self.current.pop();
            self.used[key] = false;
        }
    }
}

fn run_search(
    candidates: &[LineupCandidate],
    slots: &RosterSlotSpec,
    rules: &EligibilityRules,
    prune: bool,
) -> Result<Lineup, LineupError> {
    let mut state = SearchState::new(candidates, slots, rules, prune);
    state.search(0);

    debug!(
        "lineup search: {} slots, {} candidates, {} nodes, {} cuts",
        slots.len(),
        candidates.len(),
        state.nodes,
        state.cuts
    );

    let (picked, total) = state.best.ok_or(LineupError::Infeasible {
        slots: slots.len(),
        candidates: candidates.len(),
    })?;

    let assignments = slots
        .slots()
        .iter()
        .zip(picked)
        .map(|(&slot, idx)| LineupAssignment {
            slot,
            player_id: candidates[idx].player_id,
            projected_points: candidates[idx].projected_points,
        })
        .collect();

    Ok(Lineup {
        assignments,
        total_points: total,
    })
}

/// Find the highest-scoring assignment of distinct eligible players to
/// `slots`. Candidates sharing a player id count as one player.
///
/// Among equal-scoring lineups the first one reached exploring slots in order
/// and candidates in input order wins. An empty slot list yields an empty
/// lineup worth 0.0. Returns `LineupError::Infeasible` when no complete
/// assignment exists.
pub fn optimize_lineup(
    candidates: &[LineupCandidate],
    slots: &RosterSlotSpec,
    rules: &EligibilityRules,
) -> Result<Lineup, LineupError> {
    run_search(candidates, slots, rules, true)
}

// ---------------------------------------------------------------------------
// Roster join
// ---------------------------------------------------------------------------

/// Build optimizer candidates for a team's rostered players in `week`.
///
/// Eligibility comes from the player pool; points from that week's
/// projections. Rostered players missing from the pool are skipped, players
/// without a projection count as 0.0 and repeated ids are dropped.
pub fn candidates_for_roster(
    roster: &[PlayerId],
    players: &[PoolPlayer],
    projections: &[WeeklyProjection],
    week: u32,
) -> Vec<LineupCandidate> {
    let pool: HashMap<PlayerId, &PoolPlayer> = players.iter().map(|p| (p.id, p)).collect();
    let points: HashMap<PlayerId, f64> = projections
        .iter()
        .filter(|p| p.week == week)
        .map(|p| (p.player_id, p.projected_points))
        .collect();

    let mut seen: HashSet<PlayerId> = HashSet::new();
    let mut out = Vec::with_capacity(roster.len());
    for id in roster {
        if !seen.insert(*id) {
            warn!("player {} listed twice on roster, keeping one", id);
            continue;
        }
        let Some(player) = pool.get(id) else {
            warn!("rostered player {} not found in player pool", id);
            continue;
        };
        let projected_points = match points.get(id) {
            Some(&p) => p,
            None => {
                debug!("no week {} projection for {} ({}), using 0.0", week, player.name, id);
                0.0
            }
        };
        out.push(LineupCandidate {
            player_id: *id,
            positions: player.eligible.clone(),
            projected_points,
        });
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
