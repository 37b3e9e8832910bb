use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set, TransactionTrait,
};
use tracing::{debug, error, warn};

use crate::database::entities::{analytics_events, choice_analytics, choices};
use crate::errors::{Result, StoryGraphError};

/// Maintains the materialized per-choice click counter against the
/// append-only playthrough event log.
///
/// The event append and the counter increment commit as one transaction, so
/// the counter never drifts by more than the in-flight writes. The counter
/// row is the lock granularity; ingestion never takes story-wide locks.
#[derive(Clone)]
pub struct AnalyticsService {
    db: DatabaseConnection,
}

impl AnalyticsService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Mint an opaque playthrough id for callers that do not bring their own.
    pub fn new_playthrough_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Append one playthrough event for `choice_id` and increment its
    /// counter atomically.
    ///
    /// The event snapshots the choice's endpoints at call time; later edits
    /// to the choice do not rewrite history. Retries from the transport are
    /// recorded as additional legitimate events, deduplication is the
    /// caller's concern.
    pub async fn record_playthrough_step(
        &self,
        playthrough_id: &str,
        story_id: i32,
        choice_id: i32,
    ) -> Result<analytics_events::Model> {
        let choice = choices::Entity::find_by_id(choice_id)
            .one(&self.db)
            .await?
            .ok_or(StoryGraphError::NotFound {
                entity: "choice",
                id: choice_id,
            })?;
        if choice.story_id != story_id {
            return Err(StoryGraphError::NotFound {
                entity: "choice",
                id: choice_id,
            });
        }

        let txn = self.db.begin().await?;

        let event = analytics_events::ActiveModel {
            playthrough_id: Set(playthrough_id.to_string()),
            story_id: Set(story_id),
            choice_id: Set(choice_id),
            source_scene_id: Set(choice.source_scene_id),
            target_scene_id: Set(choice.target_scene_id),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let updated = choice_analytics::Entity::update_many()
            .col_expr(
                choice_analytics::Column::ClickCount,
                Expr::col(choice_analytics::Column::ClickCount).add(1),
            )
            .filter(choice_analytics::Column::ChoiceId.eq(choice_id))
            .exec(&txn)
            .await?;

        if updated.rows_affected == 0 {
            let inserted = choice_analytics::ActiveModel {
                choice_id: Set(choice_id),
                story_id: Set(choice.story_id),
                click_count: Set(1),
                ..Default::default()
            }
            .insert(&txn)
            .await;

            if inserted.is_err() {
                // Lost the first-row race; the row exists now, increment it.
                let retried = choice_analytics::Entity::update_many()
                    .col_expr(
                        choice_analytics::Column::ClickCount,
                        Expr::col(choice_analytics::Column::ClickCount).add(1),
                    )
                    .filter(choice_analytics::Column::ChoiceId.eq(choice_id))
                    .exec(&txn)
                    .await?;
                if retried.rows_affected == 0 {
                    return Err(StoryGraphError::ConcurrentUpdate(format!(
                        "could not create or increment counter for choice {}",
                        choice_id
                    )));
                }
            }
        }

        txn.commit().await?;

        debug!(
            "recorded playthrough {} step over choice {} in story {}",
            playthrough_id, choice_id, story_id
        );
        Ok(event)
    }

    /// Ingestion wrapper for the playthrough hot path: a failed step is
    /// logged and dropped instead of surfaced, so analytics gaps never
    /// interrupt a reader's session.
    pub async fn record_playthrough_step_logged(
        &self,
        playthrough_id: &str,
        story_id: i32,
        choice_id: i32,
    ) -> Option<analytics_events::Model> {
        match self
            .record_playthrough_step(playthrough_id, story_id, choice_id)
            .await
        {
            Ok(event) => Some(event),
            Err(e) => {
                warn!(
                    "dropping analytics step for playthrough {} (story {}, choice {}): {}",
                    playthrough_id, story_id, choice_id, e
                );
                None
            }
        }
    }

    /// Recount the events for a choice and repair its counter.
    ///
    /// Compare-and-set against the counter value observed before the
    /// recount: a concurrent increment invalidates the snapshot and the
    /// repair fails with `ConcurrentUpdate` instead of regressing the
    /// counter. Idempotent when no writes are in flight.
    pub async fn recompute_choice_analytics(&self, choice_id: i32) -> Result<i64> {
        let choice = choices::Entity::find_by_id(choice_id)
            .one(&self.db)
            .await?
            .ok_or(StoryGraphError::NotFound {
                entity: "choice",
                id: choice_id,
            })?;

        let existing = choice_analytics::Entity::find()
            .filter(choice_analytics::Column::ChoiceId.eq(choice_id))
            .one(&self.db)
            .await?;

        let count = analytics_events::Entity::find()
            .filter(analytics_events::Column::ChoiceId.eq(choice_id))
            .count(&self.db)
            .await? as i64;

        match existing {
            None => {
                if count == 0 {
                    return Ok(0);
                }
                let inserted = choice_analytics::ActiveModel {
                    choice_id: Set(choice_id),
                    story_id: Set(choice.story_id),
                    click_count: Set(count as i32),
                    ..Default::default()
                }
                .insert(&self.db)
                .await;
                match inserted {
                    Ok(_) => Ok(count),
                    Err(e) if e.to_string().to_uppercase().contains("UNIQUE") => {
                        Err(StoryGraphError::ConcurrentUpdate(format!(
                            "counter for choice {} appeared during recount",
                            choice_id
                        )))
                    }
                    Err(e) => Err(e.into()),
                }
            }
            Some(row) => {
                if i64::from(row.click_count) == count {
                    return Ok(count);
                }
                let result = choice_analytics::Entity::update_many()
                    .col_expr(choice_analytics::Column::ClickCount, Expr::value(count as i32))
                    .filter(choice_analytics::Column::Id.eq(row.id))
                    .filter(choice_analytics::Column::ClickCount.eq(row.click_count))
                    .exec(&self.db)
                    .await?;
                if result.rows_affected == 0 {
                    return Err(StoryGraphError::ConcurrentUpdate(format!(
                        "click_count for choice {} moved during recount",
                        choice_id
                    )));
                }
                debug!(
                    "repaired counter for choice {}: {} -> {}",
                    choice_id, row.click_count, count
                );
                Ok(count)
            }
        }
    }

    /// Delete counter rows whose choice no longer exists.
    ///
    /// Such a row means an upstream cascade delete failed; that is an
    /// invariant violation, not a normal error, so it is logged loudly
    /// before being healed.
    pub async fn heal_orphan_analytics(&self, story_id: i32) -> Result<usize> {
        let rows = choice_analytics::Entity::find()
            .filter(choice_analytics::Column::StoryId.eq(story_id))
            .all(&self.db)
            .await?;

        let live: std::collections::HashSet<i32> = choices::Entity::find()
            .filter(choices::Column::StoryId.eq(story_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();

        let orphans: Vec<_> = rows
            .into_iter()
            .filter(|row| !live.contains(&row.choice_id))
            .collect();

        if orphans.is_empty() {
            return Ok(0);
        }

        for row in &orphans {
            error!(
                "choice_analytics row {} references missing choice {} in story {}; deleting",
                row.id, row.choice_id, story_id
            );
        }

        let ids: Vec<i32> = orphans.iter().map(|row| row.id).collect();
        choice_analytics::Entity::delete_many()
            .filter(choice_analytics::Column::Id.is_in(ids))
            .exec(&self.db)
            .await?;

        Ok(orphans.len())
    }
}
