// Integration tests for gridcast-core.
//
// These tests run the weekly pipeline end-to-end through the public API:
// CSV fixtures are loaded, projected, persisted to SQLite, and then fed to
// the lineup optimizer, waiver shortlist and streamer rankings.

use std::path::PathBuf;

use gridcast_core::data::{load_all_from_files, load_rosters, DataFiles, LeagueData};
use gridcast_core::db::ProjectionStore;
use gridcast_core::lineup::{
    candidates_for_roster, optimize_lineup, EligibilityRules, LineupError, RosterSlotSpec,
};
use gridcast_core::position::{PlayerId, Position};
use gridcast_core::projection::{project_offense, PlayerBaseline, SituationalModifiers};
use gridcast_core::scoring::{
    defense_points, offense_points, DefenseStatLine, OffenseStatLine, ScoringRules, StatLine,
};
use gridcast_core::waivers::{
    league_shortlists, streamer_rankings, waiver_shortlist, StreamerKind, WeeklyProjection,
};

// ===========================================================================
// Test helpers
// ===========================================================================

/// Fixture directory path (relative to the crate root, which is the cwd for
/// `cargo test`).
const FIXTURES: &str = "tests/fixtures";

const WEEK: u32 = 3;
const SOURCE: &str = "internal";

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(FIXTURES).join(name)
}

fn fixture_files() -> DataFiles {
    DataFiles {
        players: fixture("players.csv"),
        baselines: fixture("baselines.csv"),
        modifiers: fixture("modifiers.csv"),
        rosters: fixture("rosters.csv"),
        projections: Some(fixture("projections.csv")),
    }
}

fn load_fixture_data() -> LeagueData {
    load_all_from_files(&fixture_files()).expect("fixture data should load")
}

/// Yahoo-style roster layout with a W/R/T flex, bench and IR.
fn league_slots() -> RosterSlotSpec {
    let labels = [
        "QB", "WR", "WR", "RB", "RB", "TE", "W/R/T", "K", "DEF", "BN", "BN", "IR",
    ];
    let positions: Vec<Position> = labels
        .iter()
        .map(|l| Position::from_str_pos(l).expect("fixture label parses"))
        .collect();
    RosterSlotSpec::starting(&positions)
}

/// Load fixtures, project week 3 and persist it to an in-memory store.
fn projected_store(data: &LeagueData) -> ProjectionStore {
    let store = ProjectionStore::open(":memory:").unwrap();
    let records = data.weekly_records(WEEK, SOURCE, &ScoringRules::standard());
    store.save_week(&records).unwrap();
    store
}

fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

// ===========================================================================
// CSV loading
// ===========================================================================

#[test]
fn csv_fixtures_load_completely() {
    let data = load_fixture_data();
    // the XX-position row is skipped
    assert_eq!(data.players.len(), 18);
    assert_eq!(data.baselines.len(), 12);
    assert_eq!(data.roster_for("t1", WEEK).len(), 11);
    assert_eq!(data.external_projections_for(WEEK).len(), 6);

    let deebo = data.player(PlayerId(7)).unwrap();
    assert_eq!(
        deebo.eligible,
        vec![Position::RunningBack, Position::WideReceiver]
    );
    assert_eq!(data.player(PlayerId(20)).unwrap().position, Position::Defense);
    assert_eq!(data.player(PlayerId(30)).unwrap().position, Position::Idp);

    assert_eq!(
        data.modifiers_for(PlayerId(1), WEEK),
        SituationalModifiers::new(0.05, 0.9)
    );
}

// ===========================================================================
// Projection + persistence
// ===========================================================================

#[test]
fn weekly_projection_round_trips_through_store() {
    let data = load_fixture_data();
    let store = projected_store(&data);

    let week = store.load_week(WEEK, SOURCE).unwrap();
    // 12 baseline players + 6 external rows
    assert_eq!(week.len(), 18);
    assert!(week.iter().all(|r| r.projection.projected_points >= 0.0));

    let qb = store.get(PlayerId(1), WEEK, SOURCE).unwrap().unwrap();
    assert!(qb.projection.projected_points > 10.0);
    assert!(qb.projection.variance > 0.0);
    assert!(qb.projection.categories["pass_yds"] > 150.0);

    let dst = store.get(PlayerId(20), WEEK, SOURCE).unwrap().unwrap();
    assert_eq!(dst.projection.projected_points, 8.0);
    assert!(dst.projection.categories.is_empty());
}

#[test]
fn stored_projection_matches_direct_estimate() {
    let data = load_fixture_data();
    let store = projected_store(&data);
    let rules = ScoringRules::standard();

    let baseline: &PlayerBaseline = &data.baselines[&PlayerId(4)];
    let direct = project_offense(baseline, &data.modifiers_for(PlayerId(4), WEEK), &rules);
    let stored = store.get(PlayerId(4), WEEK, SOURCE).unwrap().unwrap();
    assert_eq!(stored.projection.projected_points, direct.projected_points);
    assert_eq!(stored.projection.variance, direct.variance);
    assert_eq!(stored.projection.categories.len(), direct.categories.len());
    for (key, value) in &direct.categories {
        assert!(approx_eq(stored.projection.categories[key], *value, 1e-9), "{key}");
    }
}

#[test]
fn wind_lowers_passing_projection() {
    let data = load_fixture_data();
    let rules = ScoringRules::standard();
    let baseline = &data.baselines[&PlayerId(1)];
    let calm = project_offense(baseline, &SituationalModifiers::new(0.05, 1.0), &rules);
    let windy = project_offense(baseline, &data.modifiers_for(PlayerId(1), WEEK), &rules);
    assert!(windy.categories["pass_yds"] < calm.categories["pass_yds"]);
    assert!(windy.projected_points < calm.projected_points);
}

// ===========================================================================
// Lineup
// ===========================================================================

#[test]
fn team_lineup_from_stored_projections() {
    let data = load_fixture_data();
    let store = projected_store(&data);
    let points = store.weekly_points(WEEK, SOURCE).unwrap();

    let roster = data.roster_for("t1", WEEK);
    let candidates = candidates_for_roster(&roster, &data.players, &points, WEEK);
    assert_eq!(candidates.len(), 11);

    let slots = league_slots();
    assert_eq!(slots.len(), 9);
    let lineup = optimize_lineup(&candidates, &slots, &EligibilityRules::standard()).unwrap();

    assert_eq!(lineup.assignments.len(), 9);
    assert_eq!(lineup.assignments[0].slot, Position::Quarterback);
    assert_eq!(lineup.assignments[0].player_id, PlayerId(1));
    assert_eq!(lineup.assignments[7].player_id, PlayerId(11));
    assert_eq!(lineup.assignments[8].player_id, PlayerId(10));

    let sum: f64 = lineup.assignments.iter().map(|a| a.projected_points).sum();
    assert!(approx_eq(sum, lineup.total_points, 1e-9));

    // eight skill players for six skill slots
    let starters = lineup.player_ids();
    let benched: Vec<u64> = (2..=9)
        .filter(|id| !starters.contains(&PlayerId(*id)))
        .collect();
    assert_eq!(benched.len(), 2);
    // the only tight end always starts
    assert!(starters.contains(&PlayerId(6)));
}

#[test]
fn lineup_for_thin_roster_is_infeasible() {
    let data = load_fixture_data();
    let store = projected_store(&data);
    let points = store.weekly_points(WEEK, SOURCE).unwrap();

    // team t2 only rosters a quarterback
    let roster = data.roster_for("t2", WEEK);
    let candidates = candidates_for_roster(&roster, &data.players, &points, WEEK);
    let err = optimize_lineup(&candidates, &league_slots(), &EligibilityRules::standard())
        .unwrap_err();
    assert!(matches!(err, LineupError::Infeasible { .. }));
}

#[test]
fn repeated_roster_row_cannot_start_twice() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rosters.csv");
    std::fs::write(&path, "team_id,week,player_id\nt1,1,1\nt1,1,2\nt1,1,2\n").unwrap();
    let rosters = load_rosters(&path).unwrap();
    assert_eq!(rosters.len(), 2);

    let data = load_fixture_data();
    let roster: Vec<PlayerId> = rosters.iter().map(|r| r.player_id).collect();
    let points = vec![
        WeeklyProjection::new(PlayerId(1), 1, 20.0),
        WeeklyProjection::new(PlayerId(2), 1, 12.0),
    ];
    let candidates = candidates_for_roster(&roster, &data.players, &points, 1);
    let slots = RosterSlotSpec::parse(&["QB", "RB", "FLEX"]).unwrap();
    let err = optimize_lineup(&candidates, &slots, &EligibilityRules::standard()).unwrap_err();
    assert!(matches!(err, LineupError::Infeasible { .. }));
}

// ===========================================================================
// Waivers and streamers
// ===========================================================================

#[test]
fn waiver_shortlist_covers_every_free_agent() {
    let data = load_fixture_data();
    let store = projected_store(&data);
    let points = store.weekly_points(WEEK, SOURCE).unwrap();
    let roster = data.roster_for("t1", WEEK);

    let rows = waiver_shortlist(&roster, &data.players, &points, WEEK, 2);
    // 12, 13, 14, 20, 21, 30, 31
    assert_eq!(rows.len(), 7);
    assert!(rows.iter().all(|r| !roster.contains(&r.player_id)));
    assert!(rows.iter().all(|r| approx_eq(r.acquisition_prob, 0.9, 1e-12)));
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row.order, i + 1);
    }
    for pair in rows.windows(2) {
        assert!(pair[0].delta_xfp >= pair[1].delta_xfp);
    }

    // worst rostered projection is the defense at 5.0
    let jets = rows.iter().find(|r| r.player_id == PlayerId(21)).unwrap();
    assert!(approx_eq(jets.delta_xfp, 0.0, 1e-12));
}

#[test]
fn league_shortlists_cover_every_rostered_team() {
    let data = load_fixture_data();
    let store = projected_store(&data);
    let points = store.weekly_points(WEEK, SOURCE).unwrap();

    let all = league_shortlists(&data.rosters, &data.players, &points, WEEK, 1);
    assert_eq!(all.len(), 2);
    let t1 = waiver_shortlist(&data.roster_for("t1", WEEK), &data.players, &points, WEEK, 1);
    assert_eq!(all["t1"], t1);
    assert!(all["t2"].iter().all(|r| r.player_id != PlayerId(12)));
    assert!(league_shortlists(&data.rosters, &data.players, &points, 9, 1).is_empty());
}

#[test]
fn waiver_shortlist_for_unknown_team_is_empty() {
    let data = load_fixture_data();
    let store = projected_store(&data);
    let points = store.weekly_points(WEEK, SOURCE).unwrap();
    let roster = data.roster_for("nobody", WEEK);
    assert!(waiver_shortlist(&roster, &data.players, &points, WEEK, 1).is_empty());
}

#[test]
fn defense_streamers_rank_by_projection_then_id() {
    let data = load_fixture_data();
    let store = projected_store(&data);
    let points = store.weekly_points(WEEK, SOURCE).unwrap();

    let rows = streamer_rankings(&data.players, &points, WEEK, StreamerKind::Defense);
    let ids: Vec<PlayerId> = rows.iter().map(|r| r.player_id).collect();
    assert_eq!(ids, vec![PlayerId(20), PlayerId(10), PlayerId(21)]);
    assert_eq!(rows[0].name, "Browns");
    assert_eq!(rows[0].rank, 1);
    assert_eq!(rows[2].rank, 3);

    let idp = streamer_rankings(&data.players, &points, WEEK, StreamerKind::Idp);
    let ids: Vec<PlayerId> = idp.iter().map(|r| r.player_id).collect();
    assert_eq!(ids, vec![PlayerId(30), PlayerId(31)]);
}

// ===========================================================================
// Scoring through the tagged stat line
// ===========================================================================

#[test]
fn tagged_stat_line_dispatches_by_unit() {
    let rules = ScoringRules::standard();

    let offense = OffenseStatLine {
        pass_yds: 310.0,
        pass_td: 2.0,
        ..Default::default()
    };
    let from_json: StatLine =
        serde_json::from_str(r#"{"unit":"offense","pass_yds":310,"pass_td":2}"#).unwrap();
    assert_eq!(from_json.points(&rules), offense_points(&offense, &rules));

    let defense = DefenseStatLine {
        sacks: 3.0,
        points_allowed: 10.0,
        ..Default::default()
    };
    assert_eq!(
        StatLine::Defense(defense).points(&rules),
        defense_points(&defense, &rules)
    );
}
