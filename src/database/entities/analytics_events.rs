use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One recorded traversal of a choice during a playthrough. Append-only.
///
/// `choice_id` is deliberately not a foreign key: events outlive their
/// choice and keep the endpoint scene ids as recorded at event time.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "analytics_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub playthrough_id: String,
    pub story_id: i32,
    pub choice_id: i32,
    pub source_scene_id: i32,
    pub target_scene_id: i32,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::stories::Entity",
        from = "Column::StoryId",
        to = "super::stories::Column::Id"
    )]
    Stories,
}

impl Related<super::stories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Stories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
