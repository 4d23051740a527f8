//! Reconciler properties: idempotence, upsert correctness,
//! uniqueness, and unresolved-reference handling against an
//! in-memory store.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use pucksync::client::records::{PlayerRecord, SeasonStatLine, TeamRecord, TeamStatRecord};
use pucksync::store::Store;
use pucksync::sync::reconciler::{
    reconcile_player, reconcile_player_season, reconcile_team, reconcile_team_season,
};
use pucksync::sync::RecordAction;

async fn fresh_store() -> Store {
    let store = Store::connect_in_memory().await.expect("in-memory store");
    store.init_schema().await.expect("schema");
    store
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}

fn team_record(nhl_id: i64, abbrev: &str, name: &str) -> TeamRecord {
    TeamRecord {
        nhl_id,
        name: name.to_string(),
        abbreviation: abbrev.to_string(),
        city: Some("Toronto".to_string()),
        conference: Some("Eastern".to_string()),
        division: Some("Atlantic".to_string()),
        active: true,
    }
}

fn player_record(nhl_id: i64, first: &str, last: &str, team: Option<&str>) -> PlayerRecord {
    PlayerRecord {
        nhl_id,
        first_name: first.to_string(),
        last_name: last.to_string(),
        jersey_number: Some(34),
        position: Some("C".to_string()),
        shoots_catches: Some("L".to_string()),
        height_inches: Some(75),
        weight_pounds: Some(215),
        birth_date: NaiveDate::from_ymd_opt(1997, 9, 17),
        birth_city: Some("San Ramon".to_string()),
        birth_country: Some("USA".to_string()),
        nationality: None,
        team_abbrev: team.map(str::to_string),
        active: true,
    }
}

fn team_stat_record(abbrev: &str, season: &str, wins: i32) -> TeamStatRecord {
    TeamStatRecord {
        team_abbrev: abbrev.to_string(),
        season: season.to_string(),
        games_played: 50,
        wins,
        losses: 15,
        overtime_losses: 5,
        points: wins * 2 + 5,
        point_pctg: Some(0.65),
        goals_for: 180,
        goals_against: 140,
        goal_differential: 40,
    }
}

#[tokio::test]
async fn reconciling_same_team_twice_is_idempotent() {
    let store = fresh_store().await;
    let rec = team_record(10, "TOR", "Toronto Maple Leafs");

    let first = reconcile_team(&store, &rec, t0()).await.unwrap();
    assert_eq!(first.action, RecordAction::Inserted);

    let later = t0() + Duration::hours(1);
    let second = reconcile_team(&store, &rec, later).await.unwrap();
    assert_eq!(second.action, RecordAction::Unchanged);

    let row = store.find_team_by_nhl_id(10).await.unwrap().unwrap();
    assert_eq!(row.created_at, t0());
    // A no-op pass must not churn the timestamp.
    assert_eq!(row.updated_at, t0());
}

#[tokio::test]
async fn changed_field_updates_row_and_timestamp() {
    let store = fresh_store().await;
    let rec = team_record(10, "TOR", "Toronto Maple Leafs");
    reconcile_team(&store, &rec, t0()).await.unwrap();

    let mut renamed = rec.clone();
    renamed.name = "Toronto Arenas".to_string();
    let later = t0() + Duration::hours(2);

    let outcome = reconcile_team(&store, &renamed, later).await.unwrap();
    assert_eq!(outcome.action, RecordAction::Updated);

    let row = store.find_team_by_nhl_id(10).await.unwrap().unwrap();
    assert_eq!(row.name, "Toronto Arenas");
    assert_eq!(row.abbreviation, "TOR");
    assert_eq!(row.created_at, t0());
    assert_eq!(row.updated_at, later);
}

#[tokio::test]
async fn same_remote_id_converges_to_one_row() {
    let store = fresh_store().await;

    reconcile_team(&store, &team_record(10, "TOR", "Toronto Maple Leafs"), t0())
        .await
        .unwrap();
    reconcile_team(&store, &team_record(10, "TOR", "Toronto St. Pats"), t0())
        .await
        .unwrap();

    let counts = store.counts().await.unwrap();
    assert_eq!(counts.teams, 1);

    let row = store.find_team_by_nhl_id(10).await.unwrap().unwrap();
    assert_eq!(row.name, "Toronto St. Pats");
}

#[tokio::test]
async fn player_with_unknown_team_is_stored_with_warning() {
    let store = fresh_store().await;

    let rec = player_record(8479318, "Auston", "Matthews", Some("TOR"));
    let outcome = reconcile_player(&store, &rec, t0()).await.unwrap();

    assert_eq!(outcome.action, RecordAction::Inserted);
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].contains("TOR"));

    let row = store.find_player_by_nhl_id(8479318).await.unwrap().unwrap();
    assert_eq!(row.team_id, None);
}

#[tokio::test]
async fn player_team_resolves_once_team_is_known() {
    let store = fresh_store().await;
    reconcile_team(&store, &team_record(10, "TOR", "Toronto Maple Leafs"), t0())
        .await
        .unwrap();

    let rec = player_record(8479318, "Auston", "Matthews", Some("TOR"));
    let outcome = reconcile_player(&store, &rec, t0()).await.unwrap();
    assert!(outcome.warnings.is_empty());

    let team = store.find_team_by_abbrev("TOR").await.unwrap().unwrap();
    let row = store.find_player_by_nhl_id(8479318).await.unwrap().unwrap();
    assert_eq!(row.team_id, Some(team.id));
}

#[tokio::test]
async fn unresolved_team_on_update_keeps_existing_reference() {
    let store = fresh_store().await;
    reconcile_team(&store, &team_record(10, "TOR", "Toronto Maple Leafs"), t0())
        .await
        .unwrap();

    let rec = player_record(8479318, "Auston", "Matthews", Some("TOR"));
    reconcile_player(&store, &rec, t0()).await.unwrap();
    let team = store.find_team_by_abbrev("TOR").await.unwrap().unwrap();

    // Same player later sighted under a team we have not synced yet.
    let mut traded = rec.clone();
    traded.team_abbrev = Some("ARI".to_string());
    let outcome = reconcile_player(&store, &traded, t0() + Duration::days(1))
        .await
        .unwrap();

    assert_eq!(outcome.warnings.len(), 1);
    let row = store.find_player_by_nhl_id(8479318).await.unwrap().unwrap();
    assert_eq!(row.team_id, Some(team.id));
}

#[tokio::test]
async fn player_idempotence_holds_with_resolved_team() {
    let store = fresh_store().await;
    reconcile_team(&store, &team_record(10, "TOR", "Toronto Maple Leafs"), t0())
        .await
        .unwrap();

    let rec = player_record(8479318, "Auston", "Matthews", Some("TOR"));
    reconcile_player(&store, &rec, t0()).await.unwrap();

    let second = reconcile_player(&store, &rec, t0() + Duration::hours(3))
        .await
        .unwrap();
    assert_eq!(second.action, RecordAction::Unchanged);

    let row = store.find_player_by_nhl_id(8479318).await.unwrap().unwrap();
    assert_eq!(row.updated_at, t0());
}

#[tokio::test]
async fn refetching_a_season_overwrites_counters_not_rows() {
    let store = fresh_store().await;
    reconcile_team(&store, &team_record(10, "TOR", "Toronto Maple Leafs"), t0())
        .await
        .unwrap();
    let team = store.find_team_by_abbrev("TOR").await.unwrap().unwrap();

    let first = team_stat_record("TOR", "20232024", 30);
    reconcile_team_season(&store, team.id, &first, t0())
        .await
        .unwrap();

    let updated = team_stat_record("TOR", "20232024", 31);
    let outcome = reconcile_team_season(&store, team.id, &updated, t0() + Duration::days(1))
        .await
        .unwrap();
    assert_eq!(outcome.action, RecordAction::Updated);

    let counts = store.counts().await.unwrap();
    assert_eq!(counts.team_seasons, 1);

    let row = store
        .find_team_season(team.id, "20232024")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.wins, 31);
    // Rates are stored verbatim from the remote source.
    assert_eq!(row.point_pctg, Some(0.65));
}

#[tokio::test]
async fn goalie_only_season_line_is_accepted() {
    let store = fresh_store().await;
    let player = player_record(8479361, "Joseph", "Woll", None);
    let outcome = reconcile_player(&store, &player, t0()).await.unwrap();

    let line = SeasonStatLine {
        season: "20232024".to_string(),
        games_played: Some(25),
        wins: Some(12),
        losses: Some(11),
        overtime_losses: Some(1),
        shutouts: Some(1),
        goals_against_avg: Some(2.94),
        save_pctg: Some(0.907),
        ..Default::default()
    };

    let line_outcome = reconcile_player_season(&store, outcome.row_id, &line, t0())
        .await
        .unwrap();
    assert_eq!(line_outcome.action, RecordAction::Inserted);

    let row = store
        .find_player_season(outcome.row_id, "20232024")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.wins, Some(12));
    assert_eq!(row.save_pctg, Some(0.907));
    assert_eq!(row.goals, None);
    assert_eq!(row.shooting_pctg, None);
}

#[tokio::test]
async fn season_line_idempotence_and_team_resolution() {
    let store = fresh_store().await;
    reconcile_team(&store, &team_record(10, "TOR", "Toronto Maple Leafs"), t0())
        .await
        .unwrap();
    let team = store.find_team_by_abbrev("TOR").await.unwrap().unwrap();

    let player = player_record(8479318, "Auston", "Matthews", Some("TOR"));
    let player_outcome = reconcile_player(&store, &player, t0()).await.unwrap();

    let line = SeasonStatLine {
        season: "20232024".to_string(),
        team_name: Some("Toronto Maple Leafs".to_string()),
        games_played: Some(81),
        goals: Some(69),
        assists: Some(38),
        points: Some(107),
        shots: Some(361),
        shooting_pctg: Some(0.191),
        ..Default::default()
    };

    let first = reconcile_player_season(&store, player_outcome.row_id, &line, t0())
        .await
        .unwrap();
    assert_eq!(first.action, RecordAction::Inserted);
    assert!(first.warnings.is_empty());

    let second = reconcile_player_season(
        &store,
        player_outcome.row_id,
        &line,
        t0() + Duration::hours(6),
    )
    .await
    .unwrap();
    assert_eq!(second.action, RecordAction::Unchanged);

    let row = store
        .find_player_season(player_outcome.row_id, "20232024")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.team_id, Some(team.id));
    assert_eq!(row.updated_at, t0());
}
