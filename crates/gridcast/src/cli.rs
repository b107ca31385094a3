// Command-line interface definitions.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use gridcast_core::waivers::StreamerKind;

/// gridcast - weekly fantasy football projections, lineups and waiver ranks.
#[derive(Parser, Debug)]
#[command(name = "gridcast")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory holding config/, defaults/ and the data files
    #[arg(long, global = true, default_value = ".")]
    pub base_dir: PathBuf,

    /// Log at debug level (RUST_LOG still wins when set)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Project every player with a baseline and store the results
    Project(ProjectArgs),

    /// Optimal starting lineup for a team
    Lineup(LineupArgs),

    /// Waiver shortlist for one team or the whole league
    Waivers(WaiverArgs),

    /// League-wide defense or IDP streamer ranking
    Streamers(StreamerArgs),

    /// Score a literal stat line
    Score(ScoreArgs),
}

/// Arguments for the `project` subcommand.
#[derive(Parser, Debug)]
pub struct ProjectArgs {
    #[arg(long)]
    pub week: u32,

    /// Source tag to store under (defaults to projections.source)
    #[arg(long)]
    pub source: Option<String>,
}

/// Arguments for the `lineup` subcommand.
#[derive(Parser, Debug)]
pub struct LineupArgs {
    #[arg(long)]
    pub team: String,

    #[arg(long)]
    pub week: u32,

    #[arg(long)]
    pub source: Option<String>,
}

/// Arguments for the `waivers` subcommand.
#[derive(Parser, Debug)]
pub struct WaiverArgs {
    #[arg(long, required_unless_present = "all_teams", conflicts_with = "all_teams")]
    pub team: Option<String>,

    /// Shortlist every team rostered in the week
    #[arg(long)]
    pub all_teams: bool,

    #[arg(long)]
    pub week: u32,

    /// Claim horizon in weeks (defaults to waivers.horizon)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub horizon: Option<u32>,

    #[arg(long)]
    pub source: Option<String>,
}

/// Arguments for the `streamers` subcommand.
#[derive(Parser, Debug)]
pub struct StreamerArgs {
    #[arg(long)]
    pub week: u32,

    #[arg(long, value_enum)]
    pub kind: KindArg,

    #[arg(long)]
    pub source: Option<String>,
}

/// Arguments for the `score` subcommand.
#[derive(Parser, Debug)]
pub struct ScoreArgs {
    #[arg(long, value_enum)]
    pub unit: UnitArg,

    /// Stat line as a JSON object, e.g. '{"pass_yds": 310, "pass_td": 2}'
    #[arg(long)]
    pub json: String,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum KindArg {
    Def,
    Idp,
}

impl From<KindArg> for StreamerKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Def => StreamerKind::Defense,
            KindArg::Idp => StreamerKind::Idp,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnitArg {
    Offense,
    Kicker,
    Defense,
    Idp,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_lineup_with_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "gridcast", "lineup", "--team", "t1", "--week", "3", "--base-dir", "/tmp/league", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.base_dir, PathBuf::from("/tmp/league"));
        match cli.command {
            Commands::Lineup(args) => {
                assert_eq!(args.team, "t1");
                assert_eq!(args.week, 3);
                assert!(args.source.is_none());
            }
            other => panic!("expected lineup, got {other:?}"),
        }
    }

    #[test]
    fn streamer_kind_maps_to_core_kind() {
        let cli = Cli::try_parse_from(["gridcast", "streamers", "--week", "2", "--kind", "idp"])
            .unwrap();
        match cli.command {
            Commands::Streamers(args) => {
                assert_eq!(StreamerKind::from(args.kind), StreamerKind::Idp)
            }
            other => panic!("expected streamers, got {other:?}"),
        }
    }

    #[test]
    fn zero_horizon_is_rejected() {
        let err = Cli::try_parse_from([
            "gridcast", "waivers", "--team", "t1", "--week", "1", "--horizon", "0",
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn waivers_take_one_team_or_all_teams() {
        let cli = Cli::try_parse_from(["gridcast", "waivers", "--week", "1", "--all-teams"])
            .unwrap();
        match cli.command {
            Commands::Waivers(args) => {
                assert!(args.all_teams);
                assert!(args.team.is_none());
            }
            other => panic!("expected waivers, got {other:?}"),
        }

        assert!(Cli::try_parse_from(["gridcast", "waivers", "--week", "1"]).is_err());
        assert!(Cli::try_parse_from([
            "gridcast", "waivers", "--week", "1", "--team", "t1", "--all-teams",
        ])
        .is_err());
    }

    #[test]
    fn week_is_required() {
        assert!(Cli::try_parse_from(["gridcast", "project"]).is_err());
    }
}
