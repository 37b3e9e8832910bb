//! Aggregate maintainer tests: the click counter must equal the event count
//! after any settled sequence of recorded steps.

use anyhow::Result;
use sea_orm::{ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, EntityTrait, QueryFilter, Set};
use storyloom::database::entities::{analytics_events, choice_analytics, choices};
use storyloom::database::setup_database;
use storyloom::errors::StoryGraphError;
use storyloom::services::{AnalyticsService, GraphService, StoryService};
use tempfile::NamedTempFile;

async fn setup_test_db() -> Result<(DatabaseConnection, NamedTempFile)> {
    let temp_file = NamedTempFile::new()?;
    let db_url = format!("sqlite://{}?mode=rwc", temp_file.path().display());

    let db = Database::connect(&db_url).await?;
    setup_database(&db).await?;

    Ok((db, temp_file))
}

async fn story_with_choice(db: &DatabaseConnection) -> Result<(i32, i32)> {
    let stories = StoryService::new(db.clone());
    let graph = GraphService::new(db.clone());

    let story = stories.create_story(1, "Story", None).await?;
    let a = graph.create_scene(story.id, "A", None, (0.0, 0.0)).await?;
    let b = graph.create_scene(story.id, "B", None, (100.0, 0.0)).await?;
    let choice = graph.create_choice(story.id, a.id, b.id, "go north").await?;

    Ok((story.id, choice.id))
}

async fn click_count(db: &DatabaseConnection, choice_id: i32) -> Result<i32> {
    Ok(choice_analytics::Entity::find()
        .filter(choice_analytics::Column::ChoiceId.eq(choice_id))
        .one(db)
        .await?
        .map(|row| row.click_count)
        .unwrap_or(0))
}

#[tokio::test]
async fn test_recorded_steps_increment_counter() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let analytics = AnalyticsService::new(db.clone());
    let (story_id, choice_id) = story_with_choice(&db).await?;

    for _ in 0..3 {
        analytics
            .record_playthrough_step("play-1", story_id, choice_id)
            .await?;
    }

    assert_eq!(click_count(&db, choice_id).await?, 3);
    let events = analytics_events::Entity::find()
        .filter(analytics_events::Column::ChoiceId.eq(choice_id))
        .all(&db)
        .await?;
    assert_eq!(events.len(), 3);

    // Endpoints were snapshotted from the choice
    for event in &events {
        assert_eq!(event.playthrough_id, "play-1");
        assert_eq!(event.story_id, story_id);
    }

    Ok(())
}

#[tokio::test]
async fn test_unknown_choice_is_rejected_before_any_write() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let analytics = AnalyticsService::new(db.clone());
    let (story_id, _choice_id) = story_with_choice(&db).await?;

    let err = analytics
        .record_playthrough_step("play-1", story_id, 9999)
        .await
        .unwrap_err();
    assert!(matches!(err, StoryGraphError::NotFound { .. }));
    assert_eq!(analytics_events::Entity::find().all(&db).await?.len(), 0);

    Ok(())
}

#[tokio::test]
async fn test_choice_from_other_story_is_rejected() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let stories = StoryService::new(db.clone());
    let analytics = AnalyticsService::new(db.clone());
    let (_story_id, choice_id) = story_with_choice(&db).await?;

    let other = stories.create_story(2, "Other", None).await?;
    let err = analytics
        .record_playthrough_step("play-1", other.id, choice_id)
        .await
        .unwrap_err();
    assert!(matches!(err, StoryGraphError::NotFound { .. }));

    Ok(())
}

#[tokio::test]
async fn test_logged_ingestion_drops_failures() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let analytics = AnalyticsService::new(db.clone());
    let (story_id, choice_id) = story_with_choice(&db).await?;

    let playthrough = AnalyticsService::new_playthrough_id();
    assert!(analytics
        .record_playthrough_step_logged(&playthrough, story_id, choice_id)
        .await
        .is_some());
    assert!(analytics
        .record_playthrough_step_logged("play-1", story_id, 9999)
        .await
        .is_none());

    assert_eq!(click_count(&db, choice_id).await?, 1);

    Ok(())
}

#[tokio::test]
async fn test_concurrent_steps_lose_no_update() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let analytics = AnalyticsService::new(db.clone());
    let (story_id, choice_id) = story_with_choice(&db).await?;

    let mut handles = Vec::new();
    for session in 0..4 {
        let svc = analytics.clone();
        handles.push(tokio::spawn(async move {
            let playthrough = format!("play-{}", session);
            for _ in 0..5 {
                svc.record_playthrough_step(&playthrough, story_id, choice_id)
                    .await?;
            }
            Ok::<_, StoryGraphError>(())
        }));
    }
    for handle in handles {
        handle.await??;
    }

    assert_eq!(click_count(&db, choice_id).await?, 20);
    let event_total = analytics_events::Entity::find()
        .filter(analytics_events::Column::ChoiceId.eq(choice_id))
        .all(&db)
        .await?
        .len();
    assert_eq!(event_total, 20);

    Ok(())
}

#[tokio::test]
async fn test_recompute_heals_drift_and_is_idempotent() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let analytics = AnalyticsService::new(db.clone());
    let (story_id, choice_id) = story_with_choice(&db).await?;

    for _ in 0..4 {
        analytics
            .record_playthrough_step("play-1", story_id, choice_id)
            .await?;
    }

    // Inject drift as a buggy writer would
    let row = choice_analytics::Entity::find()
        .filter(choice_analytics::Column::ChoiceId.eq(choice_id))
        .one(&db)
        .await?
        .unwrap();
    let mut active: choice_analytics::ActiveModel = row.into();
    active.click_count = Set(99);
    active.update(&db).await?;

    assert_eq!(analytics.recompute_choice_analytics(choice_id).await?, 4);
    assert_eq!(click_count(&db, choice_id).await?, 4);

    // Second run with no intervening events is a no-op
    assert_eq!(analytics.recompute_choice_analytics(choice_id).await?, 4);
    assert_eq!(click_count(&db, choice_id).await?, 4);

    Ok(())
}

#[tokio::test]
async fn test_recompute_creates_missing_counter_row() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let analytics = AnalyticsService::new(db.clone());
    let (story_id, choice_id) = story_with_choice(&db).await?;

    // A bulk import appends events without touching the counter
    for n in 0..2 {
        let event = analytics_events::ActiveModel {
            playthrough_id: Set(format!("import-{}", n)),
            story_id: Set(story_id),
            choice_id: Set(choice_id),
            source_scene_id: Set(0),
            target_scene_id: Set(0),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        };
        event.insert(&db).await?;
    }

    assert_eq!(analytics.recompute_choice_analytics(choice_id).await?, 2);
    assert_eq!(click_count(&db, choice_id).await?, 2);

    Ok(())
}

#[tokio::test]
async fn test_heal_orphan_analytics() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let analytics = AnalyticsService::new(db.clone());
    let (story_id, choice_id) = story_with_choice(&db).await?;

    analytics
        .record_playthrough_step("play-1", story_id, choice_id)
        .await?;

    // Simulate an upstream cascade failure: delete the choice behind the
    // graph service's back, stranding the counter row
    choices::Entity::delete_by_id(choice_id).exec(&db).await?;

    assert_eq!(analytics.heal_orphan_analytics(story_id).await?, 1);
    assert_eq!(choice_analytics::Entity::find().all(&db).await?.len(), 0);

    // Healthy stories report zero orphans
    assert_eq!(analytics.heal_orphan_analytics(story_id).await?, 0);

    Ok(())
}
