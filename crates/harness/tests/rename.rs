use standings_core::{
    ChampionRecord, Collection, Manager, MatchRecord, PantheonRecord, PenaltyRecord,
};
use standings_engine::{Engine, EngineError, RenameTarget};
use standings_harness::{Fault, FaultyStore, StoreOp, TestLeague, all_rows, sample_document};
use standings_storage::SqliteStorage;

async fn seeded() -> Result<Engine<FaultyStore<SqliteStorage>>, Box<dyn std::error::Error>> {
    let engine = Engine::new(Some(FaultyStore::new(SqliteStorage::open_in_memory()?)));
    engine.import_document(&sample_document()).await?;
    Ok(engine)
}

// ============================================================================
// Full propagation
// ============================================================================

#[tokio::test]
async fn rename_reaches_every_reference() -> Result<(), Box<dyn std::error::Error>> {
    let league = TestLeague::new()?;
    league.engine.import_document(&sample_document()).await?;

    let outcome = league
        .engine
        .rename_manager("m3", "Carol_Team_B", "Caroline")
        .await?;

    assert_eq!(outcome.rows_for(RenameTarget::MatchHome), 1);
    assert_eq!(outcome.rows_for(RenameTarget::MatchAway), 1);
    assert_eq!(outcome.rows_for(RenameTarget::MatchExempt), 1);
    assert_eq!(outcome.rows_for(RenameTarget::Penalty), 1);
    assert_eq!(outcome.total(), 4);

    let doc = league.engine.load_document().await;
    assert_eq!(doc.managers["m3"].name, "Caroline");
    assert_eq!(doc.penalty("france", 1, "Caroline"), Some(-3));
    assert_eq!(doc.penalty("france", 1, "Carol_Team_B"), None);
    assert_eq!(doc.matches[0].exempt.as_deref(), Some("Caroline"));
    let mentions_old = doc.matches.iter().flat_map(|b| &b.games).any(|g| {
        g.home_team == "Carol_Team_B" || g.away_team == "Carol_Team_B"
    });
    assert!(!mentions_old);
    Ok(())
}

#[tokio::test]
async fn rename_updates_champion_and_runner_up_columns() -> Result<(), Box<dyn std::error::Error>> {
    let league = TestLeague::new()?;
    league.engine.import_document(&sample_document()).await?;

    league.engine.rename_manager("m2", "Bob", "Robert").await?;

    let champions: Vec<ChampionRecord> = all_rows(league.store()).await?;
    assert_eq!(champions[0].champion_name, "Alice");
    assert_eq!(champions[0].runner_up_name.as_deref(), Some("Robert"));

    let pantheon: Vec<PantheonRecord> = all_rows(league.store()).await?;
    assert!(pantheon.iter().any(|p| p.manager_name == "Robert"));
    assert!(pantheon.iter().all(|p| p.manager_name != "Bob"));
    Ok(())
}

#[tokio::test]
async fn same_name_only_touches_the_manager_row() -> Result<(), Box<dyn std::error::Error>> {
    let engine = seeded().await?;
    let store = engine.store().ok_or("store missing")?;

    let outcome = engine.rename_manager("m1", "Alice", "Alice").await?;

    assert_eq!(outcome.total(), 0);
    assert_eq!(store.call_count(StoreOp::Update, Collection::Managers), 1);
    assert_eq!(store.call_count(StoreOp::Update, Collection::Matches), 0);
    Ok(())
}

// ============================================================================
// Rejected renames
// ============================================================================

#[tokio::test]
async fn unknown_manager_changes_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let engine = seeded().await?;
    let store = engine.store().ok_or("store missing")?;

    let result = engine.rename_manager("nobody", "Alice", "Alicia").await;
    assert!(matches!(result, Err(EngineError::ManagerNotFound(id)) if id == "nobody"));

    let matches: Vec<MatchRecord> = all_rows(store.inner()).await?;
    assert!(matches.iter().any(|m| m.home_team == "Alice"));
    Ok(())
}

#[tokio::test]
async fn blank_new_name_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let engine = seeded().await?;
    let result = engine.rename_manager("m1", "Alice", " ").await;
    assert!(matches!(result, Err(EngineError::InvalidInput(_))));

    let store = engine.store().ok_or("store missing")?;
    let managers: Vec<Manager> = all_rows(store.inner()).await?;
    assert!(managers.iter().any(|m| m.name == "Alice"));
    Ok(())
}

// ============================================================================
// Partial failure and retry
// ============================================================================

#[tokio::test]
async fn champion_failure_reports_partial_rename() -> Result<(), Box<dyn std::error::Error>> {
    let engine = seeded().await?;
    let store = engine.store().ok_or("store missing")?;
    store.fail(Fault::on(StoreOp::Update, Collection::Champions).touching("champion_name"));

    let result = engine.rename_manager("m1", "Alice", "Alicia").await;
    match result {
        Err(EngineError::PartialRename {
            manager_id,
            total,
            failures,
        }) => {
            assert_eq!(manager_id, "m1");
            assert_eq!(total, 7);
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].target, RenameTarget::Champion);
        }
        other => return Err(format!("expected partial rename, got {other:?}").into()),
    }

    let matches: Vec<MatchRecord> = all_rows(store.inner()).await?;
    assert!(matches.iter().any(|m| m.home_team == "Alicia"));
    assert!(matches.iter().all(|m| m.home_team != "Alice" && m.away_team != "Alice"));

    let pantheon: Vec<PantheonRecord> = all_rows(store.inner()).await?;
    assert!(pantheon.iter().any(|p| p.manager_name == "Alicia"));

    let champions: Vec<ChampionRecord> = all_rows(store.inner()).await?;
    assert_eq!(champions[0].champion_name, "Alice");
    Ok(())
}

#[tokio::test]
async fn retry_finishes_an_interrupted_rename() -> Result<(), Box<dyn std::error::Error>> {
    let engine = seeded().await?;
    let store = engine.store().ok_or("store missing")?;
    store.fail(Fault::on(StoreOp::Update, Collection::Champions).touching("champion_name"));
    store.fail(Fault::on(StoreOp::Update, Collection::Penalties));

    let first = engine.rename_manager("m3", "Carol_Team_B", "Caroline").await;
    assert!(matches!(
        &first,
        Err(EngineError::PartialRename { failures, .. }) if failures.len() == 2
    ));

    store.heal();
    let outcome = engine.rename_manager("m3", "Carol_Team_B", "Caroline").await?;
    // Already-renamed match rows no longer match the old name.
    assert_eq!(outcome.rows_for(RenameTarget::MatchHome), 0);
    assert_eq!(outcome.rows_for(RenameTarget::Penalty), 1);

    let penalties: Vec<PenaltyRecord> = all_rows(store.inner()).await?;
    assert_eq!(penalties[0].team_name, "Caroline");
    Ok(())
}
