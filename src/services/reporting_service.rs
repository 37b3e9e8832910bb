use std::cmp::Reverse;
use std::collections::HashMap;

use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::database::entities::{analytics_events, choice_analytics, choices, scenes, stories};
use crate::errors::{Result, StoryGraphError};
use crate::services::graph_service::GraphService;

/// Per-choice click totals for one story.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryAnalyticsSummary {
    pub story_id: i32,
    pub total_events: u64,
    pub choices: Vec<ChoiceClickSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceClickSummary {
    pub choice_id: i32,
    pub text: String,
    pub click_count: i32,
}

/// Funnel and path queries over the graph and the event log.
#[derive(Clone)]
pub struct ReportingService {
    db: DatabaseConnection,
    graph: GraphService,
}

impl ReportingService {
    pub fn new(db: DatabaseConnection) -> Self {
        let graph = GraphService::new(db.clone());
        Self { db, graph }
    }

    /// The outgoing choice of a scene with the highest click count.
    ///
    /// Ties break by earliest creation, then lowest id, so the answer is
    /// deterministic. Choices without a counter row count as zero.
    pub async fn most_clicked_choice(&self, scene_id: i32) -> Result<Option<choices::Model>> {
        scenes::Entity::find_by_id(scene_id)
            .one(&self.db)
            .await?
            .ok_or(StoryGraphError::NotFound {
                entity: "scene",
                id: scene_id,
            })?;

        let outgoing = choices::Entity::find()
            .filter(choices::Column::SourceSceneId.eq(scene_id))
            .order_by_asc(choices::Column::Id)
            .all(&self.db)
            .await?;

        if outgoing.is_empty() {
            return Ok(None);
        }

        let choice_ids: Vec<i32> = outgoing.iter().map(|c| c.id).collect();
        let counters: HashMap<i32, i32> = choice_analytics::Entity::find()
            .filter(choice_analytics::Column::ChoiceId.is_in(choice_ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|row| (row.choice_id, row.click_count))
            .collect();

        Ok(outgoing.into_iter().max_by_key(|choice| {
            (
                counters.get(&choice.id).copied().unwrap_or(0),
                Reverse(choice.created_at),
                Reverse(choice.id),
            )
        }))
    }

    /// Fraction of events sourced at `scene_id` whose playthrough never
    /// advanced past the chosen target scene.
    ///
    /// Events are grouped by playthrough and ordered by creation time; a
    /// step counts as advanced when a later event of the same playthrough is
    /// sourced at the step's target scene. Returns 0.0 for a scene with no
    /// recorded events.
    pub async fn drop_off_rate(&self, scene_id: i32) -> Result<f64> {
        let scene = scenes::Entity::find_by_id(scene_id)
            .one(&self.db)
            .await?
            .ok_or(StoryGraphError::NotFound {
                entity: "scene",
                id: scene_id,
            })?;

        let events = analytics_events::Entity::find()
            .filter(analytics_events::Column::StoryId.eq(scene.story_id))
            .order_by_asc(analytics_events::Column::CreatedAt)
            .order_by_asc(analytics_events::Column::Id)
            .all(&self.db)
            .await?;

        let mut by_playthrough: HashMap<&str, Vec<&analytics_events::Model>> = HashMap::new();
        for event in &events {
            by_playthrough
                .entry(event.playthrough_id.as_str())
                .or_default()
                .push(event);
        }

        let mut total = 0usize;
        let mut dropped = 0usize;

        for steps in by_playthrough.values() {
            for (index, step) in steps.iter().enumerate() {
                if step.source_scene_id != scene_id {
                    continue;
                }
                total += 1;
                let advanced = steps[index + 1..]
                    .iter()
                    .any(|later| later.source_scene_id == step.target_scene_id);
                if !advanced {
                    dropped += 1;
                }
            }
        }

        if total == 0 {
            return Ok(0.0);
        }

        let rate = dropped as f64 / total as f64;
        debug!(
            "drop-off at scene {}: {}/{} steps never advanced",
            scene_id, dropped, total
        );
        Ok(rate)
    }

    /// Scenes of the story not reachable from the given entry scene.
    ///
    /// Entry-scene selection is the caller's policy; this crate does not
    /// guess one.
    pub async fn orphan_scenes(
        &self,
        story_id: i32,
        entry_scene_id: i32,
    ) -> Result<Vec<scenes::Model>> {
        let reachable = self.graph.reachable_scenes(story_id, entry_scene_id).await?;

        let all = scenes::Entity::find()
            .filter(scenes::Column::StoryId.eq(story_id))
            .order_by_asc(scenes::Column::Id)
            .all(&self.db)
            .await?;

        Ok(all
            .into_iter()
            .filter(|scene| !reachable.contains(&scene.id))
            .collect())
    }

    /// Click totals for every choice of a story plus the raw event count.
    pub async fn story_analytics_summary(&self, story_id: i32) -> Result<StoryAnalyticsSummary> {
        stories::Entity::find_by_id(story_id)
            .one(&self.db)
            .await?
            .ok_or(StoryGraphError::NotFound {
                entity: "story",
                id: story_id,
            })?;

        let story_choices = choices::Entity::find()
            .filter(choices::Column::StoryId.eq(story_id))
            .order_by_asc(choices::Column::Id)
            .all(&self.db)
            .await?;

        let counters: HashMap<i32, i32> = choice_analytics::Entity::find()
            .filter(choice_analytics::Column::StoryId.eq(story_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|row| (row.choice_id, row.click_count))
            .collect();

        let total_events = analytics_events::Entity::find()
            .filter(analytics_events::Column::StoryId.eq(story_id))
            .count(&self.db)
            .await?;

        let summaries = story_choices
            .into_iter()
            .map(|choice| ChoiceClickSummary {
                choice_id: choice.id,
                click_count: counters.get(&choice.id).copied().unwrap_or(0),
                text: choice.text,
            })
            .collect();

        Ok(StoryAnalyticsSummary {
            story_id,
            total_events,
            choices: summaries,
        })
    }
}
