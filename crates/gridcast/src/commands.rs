// Subcommand handlers. Each returns the JSON document printed on stdout.

use anyhow::{Context, Result};
use serde_json::{json, Value};
use tracing::info;

use gridcast_core::config::Config;
use gridcast_core::data::{self, LeagueData};
use gridcast_core::db::ProjectionStore;
use gridcast_core::lineup::{candidates_for_roster, optimize_lineup, EligibilityRules};
use gridcast_core::scoring::{ScoringRules, StatLine};
use gridcast_core::waivers::{
    league_shortlists, streamer_rankings, waiver_shortlist, StreamerKind, WeeklyProjection,
};

use crate::cli::{LineupArgs, ProjectArgs, ScoreArgs, StreamerArgs, UnitArg, WaiverArgs};

fn open_store(config: &Config) -> Result<ProjectionStore> {
    let path = config.resolve(&config.db_path);
    let path = path.to_str().context("database path is not valid UTF-8")?;
    ProjectionStore::open(path).context("failed to open projection store")
}

fn load_data(config: &Config) -> Result<LeagueData> {
    data::load_all(config).context("failed to load league data")
}

fn source_or_default<'a>(config: &'a Config, source: &'a Option<String>) -> &'a str {
    source
        .as_deref()
        .unwrap_or(&config.strategy.projection_source)
}

fn stored_points(config: &Config, week: u32, source: &str) -> Result<Vec<WeeklyProjection>> {
    let points = open_store(config)?
        .weekly_points(week, source)
        .with_context(|| format!("failed to read week {week} projections"))?;
    if points.is_empty() {
        info!("no stored '{}' projections for week {}; run `gridcast project` first", source, week);
    }
    Ok(points)
}

/// Project the week and persist every record.
pub fn project(config: &Config, args: &ProjectArgs, rules: &ScoringRules) -> Result<Value> {
    let source = source_or_default(config, &args.source);
    let data = load_data(config)?;
    let records = data.weekly_records(args.week, source, rules);

    let store = open_store(config)?;
    let saved = store
        .save_week(&records)
        .with_context(|| format!("failed to save week {} projections", args.week))?;
    let updated_at = store.last_updated(args.week, source)?;
    info!("saved {} '{}' projections for week {}", saved, source, args.week);

    let mut top: Vec<_> = records
        .iter()
        .map(|r| {
            let name = data.player(r.player_id).map(|p| p.name.as_str()).unwrap_or("");
            (r.player_id, name, r.projection.projected_points)
        })
        .collect();
    top.sort_by(|a, b| b.2.total_cmp(&a.2).then(a.0.cmp(&b.0)));
    top.truncate(10);

    Ok(json!({
        "week": args.week,
        "source": source,
        "saved": saved,
        "updated_at": updated_at,
        "top": top
            .iter()
            .map(|(id, name, pts)| {
                json!({ "player_id": id, "name": name, "projected_points": pts })
            })
            .collect::<Vec<_>>(),
    }))
}

/// Optimal lineup for a team's rostered players.
pub fn lineup(config: &Config, args: &LineupArgs) -> Result<Value> {
    let source = source_or_default(config, &args.source);
    let data = load_data(config)?;
    let points = stored_points(config, args.week, source)?;

    let roster = data.roster_for(&args.team, args.week);
    let candidates = candidates_for_roster(&roster, &data.players, &points, args.week);
    let slots = config.league.starting_slots();

    let lineup = optimize_lineup(&candidates, &slots, &EligibilityRules::standard())
        .with_context(|| {
            format!(
                "team '{}' cannot field a legal lineup in week {} ({} rostered players)",
                args.team,
                args.week,
                roster.len()
            )
        })?;

    let starters: Vec<Value> = lineup
        .assignments
        .iter()
        .map(|a| {
            json!({
                "slot": a.slot.display_str(),
                "player_id": a.player_id,
                "name": data.player(a.player_id).map(|p| p.name.as_str()),
                "projected_points": a.projected_points,
            })
        })
        .collect();

    Ok(json!({
        "team": args.team,
        "week": args.week,
        "total_points": lineup.total_points,
        "starters": starters,
    }))
}

/// Waiver shortlist for one team, or for every team with `--all-teams`.
pub fn waivers(config: &Config, args: &WaiverArgs) -> Result<Value> {
    let source = source_or_default(config, &args.source);
    let horizon = args.horizon.unwrap_or(config.strategy.waivers.horizon);
    let data = load_data(config)?;
    let points = stored_points(config, args.week, source)?;

    if args.all_teams {
        let teams = league_shortlists(&data.rosters, &data.players, &points, args.week, horizon);
        info!("shortlisted waivers for {} teams in week {}", teams.len(), args.week);
        return Ok(json!({
            "week": args.week,
            "horizon": horizon,
            "teams": teams,
        }));
    }

    let team = args.team.as_deref().context("either --team or --all-teams is required")?;
    let roster = data.roster_for(team, args.week);
    let rows = waiver_shortlist(&roster, &data.players, &points, args.week, horizon);

    Ok(json!({
        "team": team,
        "week": args.week,
        "horizon": horizon,
        "candidates": rows,
    }))
}

/// Streamer ranking for one unit kind.
pub fn streamers(config: &Config, args: &StreamerArgs) -> Result<Value> {
    let source = source_or_default(config, &args.source);
    let kind = StreamerKind::from(args.kind);
    let data = load_data(config)?;
    let points = stored_points(config, args.week, source)?;

    let rows = streamer_rankings(&data.players, &points, args.week, kind);

    Ok(json!({
        "week": args.week,
        "kind": kind.position().display_str(),
        "rankings": rows,
    }))
}

/// Score a literal stat line. Needs no config or data files. Keys that are
/// not a stat field (or one of its box-score aliases) are rejected.
pub fn score(args: &ScoreArgs, rules: &ScoringRules) -> Result<Value> {
    let unit = match args.unit {
        UnitArg::Offense => "offense",
        UnitArg::Kicker => "kicker",
        UnitArg::Defense => "defense",
        UnitArg::Idp => "idp",
    };

    let mut fields: serde_json::Map<String, Value> =
        serde_json::from_str(&args.json).context("--json must be a JSON object")?;
    fields.insert("unit".to_string(), Value::String(unit.to_string()));

    let line: StatLine = serde_json::from_value(Value::Object(fields))
        .with_context(|| format!("invalid {unit} stat line"))?;

    Ok(json!({
        "unit": unit,
        "points": line.points(rules),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::{Path, PathBuf};

    use gridcast_core::config;

    const WEEK: u32 = 3;

    fn core_dir() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../gridcast-core")
    }

    /// Base dir with defaults/ and the core fixture CSVs under data/, the
    /// layout the default strategy.toml points at.
    fn league_dir() -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        let defaults = tmp.path().join("defaults");
        let data = tmp.path().join("data");
        fs::create_dir_all(&defaults).unwrap();
        fs::create_dir_all(&data).unwrap();
        for name in ["league.toml", "strategy.toml"] {
            fs::copy(core_dir().join("defaults").join(name), defaults.join(name)).unwrap();
        }
        for name in [
            "players.csv",
            "baselines.csv",
            "modifiers.csv",
            "rosters.csv",
            "projections.csv",
        ] {
            fs::copy(core_dir().join("tests/fixtures").join(name), data.join(name)).unwrap();
        }
        tmp
    }

    /// Load config from `dir` and store the week's projections.
    fn projected(dir: &tempfile::TempDir) -> Config {
        let config = config::load_config(dir.path()).unwrap();
        let args = ProjectArgs {
            week: WEEK,
            source: None,
        };
        project(&config, &args, &ScoringRules::standard()).unwrap();
        config
    }

    fn lineup_args(team: &str) -> LineupArgs {
        LineupArgs {
            team: team.to_string(),
            week: WEEK,
            source: None,
        }
    }

    fn ids(rows: &Value) -> Vec<u64> {
        rows.as_array()
            .unwrap()
            .iter()
            .map(|r| r["player_id"].as_u64().unwrap())
            .collect()
    }

    #[test]
    fn project_saves_and_summarizes_the_week() {
        let dir = league_dir();
        let config = config::load_config(dir.path()).unwrap();
        let args = ProjectArgs {
            week: WEEK,
            source: None,
        };
        let out = project(&config, &args, &ScoringRules::standard()).unwrap();

        assert_eq!(out["week"], 3);
        assert_eq!(out["source"], "internal");
        assert_eq!(out["saved"], 18);
        assert!(out["updated_at"].is_string());
        let top = out["top"].as_array().unwrap();
        assert_eq!(top.len(), 10);
        let points: Vec<f64> = top
            .iter()
            .map(|r| r["projected_points"].as_f64().unwrap())
            .collect();
        assert!(points.windows(2).all(|w| w[0] >= w[1]));
        assert!(dir.path().join("gridcast.db").exists());
    }

    #[test]
    fn lineup_for_full_team() {
        let dir = league_dir();
        let config = projected(&dir);
        let out = lineup(&config, &lineup_args("t1")).unwrap();

        assert_eq!(out["team"], "t1");
        let starters = out["starters"].as_array().unwrap();
        let slots: Vec<&str> = starters.iter().map(|s| s["slot"].as_str().unwrap()).collect();
        assert_eq!(
            slots,
            vec!["QB", "WR", "WR", "RB", "RB", "TE", "FLEX", "K", "DEF"]
        );
        assert_eq!(starters[0]["player_id"], 1);
        assert_eq!(starters[0]["name"], "Jalen Hurts");
        assert_eq!(starters[7]["player_id"], 11);
        assert_eq!(starters[8]["player_id"], 10);

        let sum: f64 = starters
            .iter()
            .map(|s| s["projected_points"].as_f64().unwrap())
            .sum();
        let total = out["total_points"].as_f64().unwrap();
        assert!((sum - total).abs() < 1e-9);
        assert!(total > 0.0);
    }

    #[test]
    fn lineup_for_thin_team_explains_failure() {
        let dir = league_dir();
        let config = projected(&dir);
        let err = lineup(&config, &lineup_args("t2")).unwrap_err();
        let message = format!("{err:#}");
        assert!(
            message.contains("team 't2' cannot field a legal lineup in week 3"),
            "{message}"
        );
        assert!(message.contains("no feasible lineup"), "{message}");
    }

    #[test]
    fn waivers_for_one_team_and_the_league() {
        let dir = league_dir();
        let config = projected(&dir);

        let one = WaiverArgs {
            team: Some("t1".to_string()),
            all_teams: false,
            week: WEEK,
            horizon: None,
            source: None,
        };
        let out = waivers(&config, &one).unwrap();
        assert_eq!(out["team"], "t1");
        assert_eq!(out["horizon"], 1);
        let rows = out["candidates"].as_array().unwrap();
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[0]["order"], 1);
        assert!(rows.iter().all(|r| r["acquisition_prob"] == 1.0));

        let all = WaiverArgs {
            team: None,
            all_teams: true,
            horizon: Some(3),
            ..one
        };
        let out = waivers(&config, &all).unwrap();
        let teams = out["teams"].as_object().unwrap();
        let names: Vec<&str> = teams.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["t1", "t2"]);
        assert_eq!(ids(&teams["t1"]), ids(&rows_of(&config, "t1", 3)));
        // t2 rosters only player 12; everyone else projected is a candidate
        assert_eq!(teams["t2"].as_array().unwrap().len(), 17);
        assert!((teams["t2"][0]["acquisition_prob"].as_f64().unwrap() - 0.8).abs() < 1e-12);
    }

    fn rows_of(config: &Config, team: &str, horizon: u32) -> Value {
        let args = WaiverArgs {
            team: Some(team.to_string()),
            all_teams: false,
            week: WEEK,
            horizon: Some(horizon),
            source: None,
        };
        waivers(config, &args).unwrap()["candidates"].clone()
    }

    #[test]
    fn streamers_rank_defenses() {
        let dir = league_dir();
        let config = projected(&dir);
        let args = StreamerArgs {
            week: WEEK,
            kind: crate::cli::KindArg::Def,
            source: None,
        };
        let out = streamers(&config, &args).unwrap();
        assert_eq!(out["kind"], "DEF");
        assert_eq!(ids(&out["rankings"]), vec![20, 10, 21]);
        assert_eq!(out["rankings"][2]["rank"], 3);
    }

    #[test]
    fn unknown_source_reads_nothing() {
        let dir = league_dir();
        let config = projected(&dir);
        let args = StreamerArgs {
            week: WEEK,
            kind: crate::cli::KindArg::Idp,
            source: Some("vendor".to_string()),
        };
        let out = streamers(&config, &args).unwrap();
        assert!(out["rankings"].as_array().unwrap().is_empty());
    }

    fn score_json(unit: UnitArg, json: &str) -> Result<Value> {
        let args = ScoreArgs {
            unit,
            json: json.to_string(),
        };
        score(&args, &ScoringRules::standard())
    }

    #[test]
    fn score_offense_line() {
        let out = score_json(UnitArg::Offense, r#"{"pass_yds": 300, "pass_td": 1}"#).unwrap();
        assert_eq!(out["unit"], "offense");
        // 12 yardage + 2 bonus + 6 td
        assert_eq!(out["points"], 20.0);
    }

    #[test]
    fn score_defense_shutout() {
        let out = score_json(UnitArg::Defense, r#"{"points_allowed": 0, "sacks": 2}"#).unwrap();
        assert_eq!(out["points"], 12.0);
    }

    #[test]
    fn score_accepts_platform_aliases() {
        let out = score_json(UnitArg::Kicker, r#"{"FG50_59": 1, "PAT": 2}"#).unwrap();
        assert_eq!(out["points"], 7.0);
    }

    #[test]
    fn score_rejects_unknown_stat_keys() {
        let err = score_json(UnitArg::Offense, r#"{"passing_yds": 300}"#).unwrap_err();
        assert!(format!("{err:#}").contains("passing_yds"));
        // the unit tag itself is not a stat key
        assert!(score_json(UnitArg::Kicker, r#"{"pat": 1}"#).is_ok());
    }

    #[test]
    fn score_rejects_non_object() {
        assert!(score_json(UnitArg::Idp, "[1, 2]").is_err());
        assert!(score_json(UnitArg::Idp, "not json").is_err());
    }
}
