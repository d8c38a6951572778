use serde_json::json;
use standings_core::{
    ChampionRecord, Collection, Game, LeagueDocument, Manager, MatchdayCoords, PantheonRecord,
    PenaltyRecord, SeasonRecord,
};
use standings_engine::{DocumentAssembler, Engine, EngineError};
use standings_harness::{Fault, FaultyStore, StoreOp, TestLeague};
use standings_storage::SqliteStorage;

// ============================================================================
// Grouping matches into matchday blocks
// ============================================================================

#[tokio::test]
async fn matches_group_into_blocks_in_first_seen_order() -> Result<(), Box<dyn std::error::Error>> {
    let league = TestLeague::new()?;
    league
        .record_matchday("france", 1, 1, &[("Alice", "Bob", 2, 1), ("Carol", "Dave", 0, 3)])
        .await?;
    league.record_matchday("france", 1, 2, &[("Bob", "Carol", 1, 1)]).await?;

    let doc = league.engine.load_document().await;

    assert_eq!(doc.matches.len(), 2);
    assert_eq!(doc.matches[0].coords(), MatchdayCoords::new("france", 1, 1));
    assert_eq!(doc.matches[0].games.len(), 2);
    assert_eq!(doc.matches[0].games[0].home_team, "Alice");
    assert_eq!(doc.matches[0].games[0].home_score, Some(2));
    assert_eq!(doc.matches[1].coords(), MatchdayCoords::new("france", 1, 2));
    assert_eq!(doc.matches[1].games.len(), 1);
    assert!(doc.matches.iter().all(|b| !b.games.is_empty()));
    Ok(())
}

#[tokio::test]
async fn exempt_team_is_carried_on_the_block() -> Result<(), Box<dyn std::error::Error>> {
    let league = TestLeague::new()?;
    let coords = MatchdayCoords::new("italy", 2, 5);
    league
        .engine
        .replace_matchday(
            &coords,
            Some("Eve"),
            &[Game::new("Alice", "Bob")],
        )
        .await?;

    let doc = league.engine.load_document().await;
    let block = doc.matchday(&coords).ok_or("block missing")?;
    assert_eq!(block.exempt.as_deref(), Some("Eve"));
    assert_eq!(block.games[0].home_score, None);
    Ok(())
}

#[tokio::test]
async fn matches_beyond_one_page_are_all_assembled() -> Result<(), Box<dyn std::error::Error>> {
    let league = TestLeague::with_row_cap(3)?;
    for matchday in 1..=4 {
        league
            .record_matchday(
                "france",
                1,
                matchday,
                &[("Alice", "Bob", 1, 0), ("Carol", "Dave", 0, 0)],
            )
            .await?;
    }

    let doc = league.engine.load_document().await;
    assert_eq!(doc.matches.len(), 4);
    assert_eq!(doc.matches.iter().map(|b| b.games.len()).sum::<usize>(), 8);
    Ok(())
}

// ============================================================================
// Keyed sections
// ============================================================================

#[tokio::test]
async fn sections_are_keyed_and_sorted() -> Result<(), Box<dyn std::error::Error>> {
    let league = TestLeague::new()?;
    let persister = league.engine.persister()?;

    league.add_manager("m1", "Alice").await?;
    persister
        .save_season(&SeasonRecord {
            championship: "france".into(),
            season_number: 2,
            standings: json!([{"team": "Alice", "points": 9}]),
        })
        .await?;
    for (season, champion) in [(3, "Bob"), (1, "Alice")] {
        persister
            .save_champion(&ChampionRecord {
                championship: "france".into(),
                season,
                champion_name: champion.into(),
                runner_up_name: None,
            })
            .await?;
    }
    for (name, points) in [("Bob", 10), ("Alice", 25), ("Carol", 10)] {
        persister
            .save_pantheon_entry(&PantheonRecord {
                manager_name: name.into(),
                total_points: points,
                titles: 0,
                runner_ups: 0,
            })
            .await?;
    }
    persister
        .save_penalty(&PenaltyRecord {
            championship: "france".into(),
            season: 2,
            team_name: "Real_Madrid_B".into(),
            points: -2,
        })
        .await?;

    let doc = league.engine.load_document().await;

    assert_eq!(
        doc.managers.get("m1"),
        Some(&Manager {
            id: "m1".into(),
            name: "Alice".into()
        })
    );
    let season = doc.season("france", 2).ok_or("season missing")?;
    assert_eq!(season.standings[0]["points"], json!(9));

    let seasons: Vec<i64> = doc.palmares["france"].iter().map(|e| e.season).collect();
    assert_eq!(seasons, vec![1, 3]);

    let names: Vec<&str> = doc.pantheon.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Alice", "Bob", "Carol"]);

    assert_eq!(doc.penalty("france", 2, "Real_Madrid_B"), Some(-2));
    Ok(())
}

// ============================================================================
// Degraded reads
// ============================================================================

#[tokio::test]
async fn unconfigured_engine_serves_empty_document() -> Result<(), Box<dyn std::error::Error>> {
    let engine: Engine<SqliteStorage> = Engine::new(None);
    assert!(!engine.is_configured());

    let doc = engine.load_document().await;
    assert!(doc.is_empty());
    assert_eq!(doc, LeagueDocument::default());

    assert!(matches!(
        engine
            .save_manager(&Manager {
                id: "m1".into(),
                name: "Alice".into()
            })
            .await,
        Err(EngineError::NotConfigured)
    ));
    assert!(matches!(
        engine.rename_manager("m1", "Alice", "Alicia").await,
        Err(EngineError::NotConfigured)
    ));
    Ok(())
}

#[tokio::test]
async fn failed_collection_read_leaves_only_that_section_empty() -> Result<(), Box<dyn std::error::Error>> {
    let engine = Engine::new(Some(FaultyStore::new(SqliteStorage::open_in_memory()?)));
    engine
        .save_manager(&Manager {
            id: "m1".into(),
            name: "Alice".into(),
        })
        .await?;
    engine
        .replace_matchday(
            &MatchdayCoords::new("france", 1, 1),
            None,
            &[Game::new("Alice", "Bob").with_score(2, 1)],
        )
        .await?;
    engine
        .persister()?
        .save_pantheon_entry(&PantheonRecord {
            manager_name: "Alice".into(),
            total_points: 3,
            titles: 0,
            runner_ups: 0,
        })
        .await?;

    let store = engine.store().ok_or("store missing")?;
    store.fail(Fault::on(StoreOp::SelectRange, Collection::Pantheon));
    store.fail(Fault::on(StoreOp::SelectRange, Collection::Matches));

    let doc = engine.load_document().await;
    assert!(doc.pantheon.is_empty());
    assert!(doc.matches.is_empty());
    assert_eq!(doc.managers.len(), 1);

    store.heal();
    let doc = DocumentAssembler::new(store).load().await;
    assert_eq!(doc.pantheon.len(), 1);
    assert_eq!(doc.matches.len(), 1);
    Ok(())
}
