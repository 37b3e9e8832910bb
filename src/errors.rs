//! Error types for the story graph and analytics engine.
//!
//! Every structural or analytics violation is reported synchronously as a
//! typed error; nothing in this crate panics outside of tests.

use thiserror::Error;

/// Errors produced by the story graph and analytics services.
#[derive(Error, Debug)]
pub enum StoryGraphError {
    /// A referenced story, scene, choice, or membership does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i32 },

    /// Choice endpoints are missing or belong to a different story
    #[error("invalid edge: {0}")]
    InvalidEdge(String),

    /// Scene delete blocked by referencing choices (restrict mode)
    #[error("scene {scene_id} is still referenced by {choice_count} choice(s)")]
    SceneInUse { scene_id: i32, choice_count: u64 },

    /// A second membership row for the same (story, user) pair
    #[error("user {user_id} already has a membership on story {story_id}")]
    DuplicateMembership { story_id: i32, user_id: i32 },

    /// The operation would leave the story without exactly one owner
    #[error("story {story_id} would be left without exactly one owner")]
    LastOwner { story_id: i32 },

    /// Role does not permit the requested action
    #[error("role {role} is not permitted to {action}")]
    PermissionDenied { role: String, action: String },

    /// Optimistic-concurrency conflict on counter repair
    #[error("concurrent update: {0}")]
    ConcurrentUpdate(String),

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

pub type Result<T> = std::result::Result<T, StoryGraphError>;
