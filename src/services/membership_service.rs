use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::{debug, info};

use crate::database::entities::{stories, story_members};
use crate::errors::{Result, StoryGraphError};

/// Collaboration role with permission hierarchy. Values round-trip exactly
/// as stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Owner,
    Editor,
    Viewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "OWNER",
            Role::Editor => "EDITOR",
            Role::Viewer => "VIEWER",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "OWNER" => Some(Role::Owner),
            "EDITOR" => Some(Role::Editor),
            "VIEWER" => Some(Role::Viewer),
            _ => None,
        }
    }
}

/// Actions gated by the permission table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// View the story and its content
    ReadStory,
    /// Mutate scenes, choices, characters, assets, documents
    EditContent,
    /// Grant and revoke member roles
    ManageMembers,
    /// Delete the story itself
    DeleteStory,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::ReadStory => "read story",
            Action::EditContent => "edit content",
            Action::ManageMembers => "manage members",
            Action::DeleteStory => "delete story",
        }
    }
}

/// Static role → permitted-actions table. Recomputed on every check, never
/// cached across role changes.
pub fn authorize(role: Role, action: Action) -> bool {
    match action {
        Action::ReadStory => true,
        Action::EditContent => matches!(role, Role::Owner | Role::Editor),
        Action::ManageMembers | Action::DeleteStory => matches!(role, Role::Owner),
    }
}

/// Membership and access control for stories.
///
/// The story's `owner_user_id` always implies an OWNER membership even
/// without an explicit row; member rows record collaborators. At most one
/// row exists per (story, user), and no operation may leave a story without
/// exactly one owner.
#[derive(Clone)]
pub struct MembershipService {
    db: DatabaseConnection,
}

impl MembershipService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn get_story(&self, story_id: i32) -> Result<stories::Model> {
        stories::Entity::find_by_id(story_id)
            .one(&self.db)
            .await?
            .ok_or(StoryGraphError::NotFound {
                entity: "story",
                id: story_id,
            })
    }

    /// The user's effective role on the story, or `None` for non-members.
    pub async fn effective_role(&self, story_id: i32, user_id: i32) -> Result<Option<Role>> {
        let story = self.get_story(story_id).await?;
        if story.owner_user_id == user_id {
            return Ok(Some(Role::Owner));
        }

        let member = story_members::Entity::find()
            .filter(story_members::Column::StoryId.eq(story_id))
            .filter(story_members::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?;

        match member {
            Some(row) => {
                let role = Role::parse(&row.role).ok_or_else(|| {
                    StoryGraphError::Database(DbErr::Custom(format!(
                        "invalid role '{}' on story member {}",
                        row.role, row.id
                    )))
                })?;
                Ok(Some(role))
            }
            None => Ok(None),
        }
    }

    /// Resolve the user's role and check it against the permission table.
    pub async fn require(&self, story_id: i32, user_id: i32, action: Action) -> Result<Role> {
        let role = self.effective_role(story_id, user_id).await?;
        match role {
            Some(role) if authorize(role, action) => Ok(role),
            Some(role) => Err(StoryGraphError::PermissionDenied {
                role: role.as_str().to_string(),
                action: action.as_str().to_string(),
            }),
            None => Err(StoryGraphError::PermissionDenied {
                role: "NONE".to_string(),
                action: action.as_str().to_string(),
            }),
        }
    }

    /// Create or update the member row for `(story_id, user_id)`.
    ///
    /// Granting OWNER to anyone but the story owner, or a non-OWNER role to
    /// the story owner, would break the single-owner invariant and fails
    /// with `LastOwner`.
    pub async fn grant_role(
        &self,
        story_id: i32,
        user_id: i32,
        role: Role,
    ) -> Result<story_members::Model> {
        let story = self.get_story(story_id).await?;

        if role == Role::Owner && story.owner_user_id != user_id {
            return Err(StoryGraphError::LastOwner { story_id });
        }
        if role != Role::Owner && story.owner_user_id == user_id {
            return Err(StoryGraphError::LastOwner { story_id });
        }

        let existing = story_members::Entity::find()
            .filter(story_members::Column::StoryId.eq(story_id))
            .filter(story_members::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?;

        if let Some(row) = existing {
            let mut active: story_members::ActiveModel = row.into();
            active.role = Set(role.as_str().to_string());
            let updated = active.update(&self.db).await?;
            debug!(
                "updated role of user {} on story {} to {}",
                user_id,
                story_id,
                role.as_str()
            );
            return Ok(updated);
        }

        let inserted = story_members::ActiveModel {
            story_id: Set(story_id),
            user_id: Set(user_id),
            role: Set(role.as_str().to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await;

        match inserted {
            Ok(row) => {
                info!(
                    "granted {} to user {} on story {}",
                    role.as_str(),
                    user_id,
                    story_id
                );
                Ok(row)
            }
            // A concurrent grant won the unique (story_id, user_id) race.
            Err(e) if e.to_string().to_uppercase().contains("UNIQUE") => {
                Err(StoryGraphError::DuplicateMembership { story_id, user_id })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove the member row for `(story_id, user_id)`.
    pub async fn revoke_role(&self, story_id: i32, user_id: i32) -> Result<()> {
        let story = self.get_story(story_id).await?;

        if story.owner_user_id == user_id {
            return Err(StoryGraphError::LastOwner { story_id });
        }

        let result = story_members::Entity::delete_many()
            .filter(story_members::Column::StoryId.eq(story_id))
            .filter(story_members::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoryGraphError::NotFound {
                entity: "story member",
                id: user_id,
            });
        }

        info!("revoked membership of user {} on story {}", user_id, story_id);
        Ok(())
    }

    pub async fn list_members(&self, story_id: i32) -> Result<Vec<story_members::Model>> {
        self.get_story(story_id).await?;
        Ok(story_members::Entity::find()
            .filter(story_members::Column::StoryId.eq(story_id))
            .order_by_asc(story_members::Column::Id)
            .all(&self.db)
            .await?)
    }
}
