use std::collections::{HashMap, HashSet, VecDeque};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::{debug, info};

use crate::database::entities::{choice_analytics, choices, scenes, stories};
use crate::errors::{Result, StoryGraphError};
use crate::services::story_locks::StoryLocks;

/// How `delete_scene` treats choices that still reference the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneDeleteMode {
    /// Refuse the delete while any choice references the scene
    Restrict,
    /// Delete referencing choices and their counters together with the scene
    Cascade,
}

/// Store for the narrative graph: scenes and the choices connecting them.
///
/// Every choice must connect two scenes of its own story; structural
/// mutations on the same story serialize through the story lock and run in
/// a transaction so a violation never leaves a partial write.
#[derive(Clone)]
pub struct GraphService {
    db: DatabaseConnection,
    locks: StoryLocks,
}

impl GraphService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            locks: StoryLocks::new(),
        }
    }

    /// Share a lock registry with other services operating on the same data.
    pub fn with_locks(db: DatabaseConnection, locks: StoryLocks) -> Self {
        Self { db, locks }
    }

    pub async fn create_scene(
        &self,
        story_id: i32,
        title: &str,
        content: Option<&str>,
        position: (f64, f64),
    ) -> Result<scenes::Model> {
        stories::Entity::find_by_id(story_id)
            .one(&self.db)
            .await?
            .ok_or(StoryGraphError::NotFound {
                entity: "story",
                id: story_id,
            })?;

        let now = Utc::now();
        let scene = scenes::ActiveModel {
            story_id: Set(story_id),
            title: Set(title.to_string()),
            content: Set(content.map(|c| c.to_string())),
            position_x: Set(position.0),
            position_y: Set(position.1),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        debug!("created scene {} in story {}", scene.id, story_id);
        Ok(scene)
    }

    /// Update scene title, content, or canvas position. The owning story is
    /// immutable after creation.
    pub async fn update_scene(
        &self,
        scene_id: i32,
        title: Option<&str>,
        content: Option<&str>,
        position: Option<(f64, f64)>,
    ) -> Result<scenes::Model> {
        let scene = self.get_scene(scene_id).await?;

        let mut active: scenes::ActiveModel = scene.into();
        if let Some(title) = title {
            active.title = Set(title.to_string());
        }
        if let Some(content) = content {
            active.content = Set(Some(content.to_string()));
        }
        if let Some((x, y)) = position {
            active.position_x = Set(x);
            active.position_y = Set(y);
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(&self.db).await?)
    }

    pub async fn get_scene(&self, scene_id: i32) -> Result<scenes::Model> {
        scenes::Entity::find_by_id(scene_id)
            .one(&self.db)
            .await?
            .ok_or(StoryGraphError::NotFound {
                entity: "scene",
                id: scene_id,
            })
    }

    pub async fn get_choice(&self, choice_id: i32) -> Result<choices::Model> {
        choices::Entity::find_by_id(choice_id)
            .one(&self.db)
            .await?
            .ok_or(StoryGraphError::NotFound {
                entity: "choice",
                id: choice_id,
            })
    }

    /// Create a directed edge between two scenes of `story_id`.
    ///
    /// Both endpoints must exist and belong to that story; a self-loop
    /// (source == target) is a legal "stay here" choice.
    pub async fn create_choice(
        &self,
        story_id: i32,
        source_scene_id: i32,
        target_scene_id: i32,
        text: &str,
    ) -> Result<choices::Model> {
        let lock = self.locks.for_story(story_id);
        let _guard = lock.lock().await;

        let source = scenes::Entity::find_by_id(source_scene_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| {
                StoryGraphError::InvalidEdge(format!(
                    "source scene {} does not exist",
                    source_scene_id
                ))
            })?;
        let target = scenes::Entity::find_by_id(target_scene_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| {
                StoryGraphError::InvalidEdge(format!(
                    "target scene {} does not exist",
                    target_scene_id
                ))
            })?;

        if source.story_id != story_id {
            return Err(StoryGraphError::InvalidEdge(format!(
                "source scene {} belongs to story {}, not {}",
                source_scene_id, source.story_id, story_id
            )));
        }
        if target.story_id != story_id {
            return Err(StoryGraphError::InvalidEdge(format!(
                "target scene {} belongs to story {}, not {}",
                target_scene_id, target.story_id, story_id
            )));
        }

        let now = Utc::now();
        let choice = choices::ActiveModel {
            story_id: Set(story_id),
            source_scene_id: Set(source_scene_id),
            target_scene_id: Set(target_scene_id),
            text: Set(text.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        debug!(
            "created choice {} ({} -> {}) in story {}",
            choice.id, source_scene_id, target_scene_id, story_id
        );
        Ok(choice)
    }

    /// Relabel a choice. Endpoints are immutable; delete and recreate to
    /// rewire an edge.
    pub async fn update_choice(&self, choice_id: i32, text: &str) -> Result<choices::Model> {
        let choice = self.get_choice(choice_id).await?;

        let mut active: choices::ActiveModel = choice.into();
        active.text = Set(text.to_string());
        active.updated_at = Set(Utc::now());

        Ok(active.update(&self.db).await?)
    }

    /// Delete a scene.
    ///
    /// In `Restrict` mode the delete fails while any choice still references
    /// the scene. In `Cascade` mode referencing choices and their counters
    /// are removed atomically with the scene; analytics events survive as
    /// historical fact.
    pub async fn delete_scene(&self, scene_id: i32, mode: SceneDeleteMode) -> Result<()> {
        let scene = self.get_scene(scene_id).await?;
        let lock = self.locks.for_story(scene.story_id);
        let _guard = lock.lock().await;

        // Re-check under the lock; a concurrent delete may have won.
        let scene = self.get_scene(scene_id).await?;

        let referencing = choices::Entity::find()
            .filter(
                Condition::any()
                    .add(choices::Column::SourceSceneId.eq(scene_id))
                    .add(choices::Column::TargetSceneId.eq(scene_id)),
            )
            .all(&self.db)
            .await?;

        if mode == SceneDeleteMode::Restrict && !referencing.is_empty() {
            return Err(StoryGraphError::SceneInUse {
                scene_id,
                choice_count: referencing.len() as u64,
            });
        }

        let txn = self.db.begin().await?;

        if !referencing.is_empty() {
            let choice_ids: Vec<i32> = referencing.iter().map(|c| c.id).collect();
            choice_analytics::Entity::delete_many()
                .filter(choice_analytics::Column::ChoiceId.is_in(choice_ids.clone()))
                .exec(&txn)
                .await?;
            choices::Entity::delete_many()
                .filter(choices::Column::Id.is_in(choice_ids))
                .exec(&txn)
                .await?;
        }

        scenes::Entity::delete_by_id(scene_id).exec(&txn).await?;
        txn.commit().await?;

        info!(
            "deleted scene {} from story {} ({} choice(s) cascaded)",
            scene_id,
            scene.story_id,
            referencing.len()
        );
        Ok(())
    }

    /// Delete a choice and its counter row. Analytics events referencing the
    /// choice are retained.
    pub async fn delete_choice(&self, choice_id: i32) -> Result<()> {
        let choice = self.get_choice(choice_id).await?;
        let lock = self.locks.for_story(choice.story_id);
        let _guard = lock.lock().await;

        let txn = self.db.begin().await?;
        choice_analytics::Entity::delete_many()
            .filter(choice_analytics::Column::ChoiceId.eq(choice_id))
            .exec(&txn)
            .await?;
        choices::Entity::delete_by_id(choice_id).exec(&txn).await?;
        txn.commit().await?;

        debug!("deleted choice {} from story {}", choice_id, choice.story_id);
        Ok(())
    }

    /// Outgoing choices of a scene, in insertion order.
    pub async fn list_outgoing(&self, scene_id: i32) -> Result<Vec<choices::Model>> {
        Ok(choices::Entity::find()
            .filter(choices::Column::SourceSceneId.eq(scene_id))
            .order_by_asc(choices::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Incoming choices of a scene, in insertion order.
    pub async fn list_incoming(&self, scene_id: i32) -> Result<Vec<choices::Model>> {
        Ok(choices::Entity::find()
            .filter(choices::Column::TargetSceneId.eq(scene_id))
            .order_by_asc(choices::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Scene ids reachable from `start_scene_id` over outgoing choices.
    ///
    /// Breadth-first with a visited set, so cycles and self-loops terminate.
    pub async fn reachable_scenes(
        &self,
        story_id: i32,
        start_scene_id: i32,
    ) -> Result<HashSet<i32>> {
        let start = self.get_scene(start_scene_id).await?;
        if start.story_id != story_id {
            return Err(StoryGraphError::NotFound {
                entity: "scene",
                id: start_scene_id,
            });
        }

        let edges = choices::Entity::find()
            .filter(choices::Column::StoryId.eq(story_id))
            .all(&self.db)
            .await?;

        let mut adjacency: HashMap<i32, Vec<i32>> = HashMap::new();
        for edge in &edges {
            adjacency
                .entry(edge.source_scene_id)
                .or_default()
                .push(edge.target_scene_id);
        }

        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        visited.insert(start_scene_id);
        queue.push_back(start_scene_id);

        while let Some(current) = queue.pop_front() {
            if let Some(neighbors) = adjacency.get(&current) {
                for &neighbor in neighbors {
                    if visited.insert(neighbor) {
                        queue.push_back(neighbor);
                    }
                }
            }
        }

        Ok(visited)
    }
}
