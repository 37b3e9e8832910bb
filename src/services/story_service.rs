use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::info;

use crate::database::entities::{stories, story_members};
use crate::errors::{Result, StoryGraphError};
use crate::services::story_locks::StoryLocks;

/// Lifecycle of the story root aggregate.
///
/// A story exclusively owns its scenes, choices, members, characters,
/// assets, documents, and analytics rows; deleting the story cascades to
/// all of them through the schema's foreign keys.
#[derive(Clone)]
pub struct StoryService {
    db: DatabaseConnection,
    locks: StoryLocks,
}

impl StoryService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            locks: StoryLocks::new(),
        }
    }

    /// Share a lock registry with the graph service so a story delete
    /// excludes concurrent structural edits.
    pub fn with_locks(db: DatabaseConnection, locks: StoryLocks) -> Self {
        Self { db, locks }
    }

    pub async fn create_story(
        &self,
        owner_user_id: i32,
        title: &str,
        description: Option<&str>,
    ) -> Result<stories::Model> {
        let now = Utc::now();
        let story = stories::ActiveModel {
            owner_user_id: Set(owner_user_id),
            title: Set(title.to_string()),
            description: Set(description.map(|d| d.to_string())),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        info!("created story {} for user {}", story.id, owner_user_id);
        Ok(story)
    }

    pub async fn get_story(&self, story_id: i32) -> Result<stories::Model> {
        stories::Entity::find_by_id(story_id)
            .one(&self.db)
            .await?
            .ok_or(StoryGraphError::NotFound {
                entity: "story",
                id: story_id,
            })
    }

    pub async fn update_story(
        &self,
        story_id: i32,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Result<stories::Model> {
        let story = self.get_story(story_id).await?;

        let mut active: stories::ActiveModel = story.into();
        if let Some(title) = title {
            active.title = Set(title.to_string());
        }
        if let Some(description) = description {
            active.description = Set(Some(description.to_string()));
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(&self.db).await?)
    }

    /// Delete the story and everything it owns.
    pub async fn delete_story(&self, story_id: i32) -> Result<()> {
        let lock = self.locks.for_story(story_id);
        let _guard = lock.lock().await;

        let result = stories::Entity::delete_by_id(story_id)
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoryGraphError::NotFound {
                entity: "story",
                id: story_id,
            });
        }

        info!("deleted story {} and all owned entities", story_id);
        Ok(())
    }

    /// Stories owned by the user plus stories shared with them.
    pub async fn list_stories_for_user(&self, user_id: i32) -> Result<Vec<stories::Model>> {
        let member_story_ids: Vec<i32> = story_members::Entity::find()
            .filter(story_members::Column::UserId.eq(user_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|row| row.story_id)
            .collect();

        Ok(stories::Entity::find()
            .filter(
                Condition::any()
                    .add(stories::Column::OwnerUserId.eq(user_id))
                    .add(stories::Column::Id.is_in(member_story_ids)),
            )
            .order_by_asc(stories::Column::Id)
            .all(&self.db)
            .await?)
    }
}
