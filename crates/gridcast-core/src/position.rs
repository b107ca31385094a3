// Football positions, roster slot labels, and player identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable numeric identity for a player across the pool, rosters, and
/// projections. Ordering is numeric and drives every ranking tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PlayerId {
    fn from(id: u64) -> Self {
        PlayerId(id)
    }
}

/// Football positions used for eligibility and roster slot assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Position {
    Quarterback,
    RunningBack,
    WideReceiver,
    TightEnd,
    Kicker,
    Defense,
    Idp,
    Flex,
    Bench,
    InjuredReserve,
}

impl Position {
    /// Parse a position or slot label into a Position enum.
    ///
    /// Handles platform-style abbreviations:
    /// - "DEF", "DST", "D/ST" -> Defense, "PK" -> Kicker
    /// - "FLEX", "W/R/T" -> Flex
    /// - "IDP", "DL", "LB", "DB", "DE", "DT", "CB", "S" -> Idp
    /// - "BN"/"BE" -> Bench, "IR"/"IL" -> InjuredReserve
    pub fn from_str_pos(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "QB" => Some(Position::Quarterback),
            "RB" => Some(Position::RunningBack),
            "WR" => Some(Position::WideReceiver),
            "TE" => Some(Position::TightEnd),
            "K" | "PK" => Some(Position::Kicker),
            "DEF" | "DST" | "D/ST" => Some(Position::Defense),
            "IDP" | "DL" | "LB" | "DB" | "DE" | "DT" | "CB" | "S" => Some(Position::Idp),
            "FLEX" | "W/R/T" => Some(Position::Flex),
            "BN" | "BE" => Some(Position::Bench),
            "IR" | "IL" => Some(Position::InjuredReserve),
            _ => None,
        }
    }

    /// Return the display string for this position.
    pub fn display_str(&self) -> &'static str {
        match self {
            Position::Quarterback => "QB",
            Position::RunningBack => "RB",
            Position::WideReceiver => "WR",
            Position::TightEnd => "TE",
            Position::Kicker => "K",
            Position::Defense => "DEF",
            Position::Idp => "IDP",
            Position::Flex => "FLEX",
            Position::Bench => "BN",
            Position::InjuredReserve => "IR",
        }
    }

    /// Whether this is a meta-slot (not a concrete playing position).
    ///
    /// FLEX is a real starting slot, so it is not a meta-slot here; bench and
    /// IR never start.
    pub fn is_meta_slot(&self) -> bool {
        matches!(self, Position::Bench | Position::InjuredReserve)
    }

    /// Whether a player can hold this label as a playing position.
    pub fn is_player_position(&self) -> bool {
        !matches!(
            self,
            Position::Flex | Position::Bench | Position::InjuredReserve
        )
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

/// Labels that themselves contain `/`, longest first.
const SLASHED_LABELS: [&str; 2] = ["W/R/T", "D/ST"];

/// Parse a `/`-separated eligibility string (e.g. "RB/WR") into positions.
/// Slashed aliases such as "D/ST" and "W/R/T" are kept whole. Unknown labels
/// are dropped.
pub fn positions_from_labels(labels: &str) -> Vec<Position> {
    let tokens: Vec<&str> = labels.split('/').map(str::trim).collect();
    let mut out: Vec<Position> = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let slashed = SLASHED_LABELS.iter().find_map(|alias| {
            let width = alias.split('/').count();
            let joined = tokens.get(i..i + width)?.join("/");
            joined.eq_ignore_ascii_case(alias).then_some(width)
        });
        let width = slashed.unwrap_or(1);
        let label = tokens[i..i + width].join("/");
        if let Some(pos) = Position::from_str_pos(&label) {
            if !out.contains(&pos) {
                out.push(pos);
            }
        }
        i += width;
    }
    out
}
