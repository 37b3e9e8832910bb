use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A directed edge between two scenes of the same story.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "choices")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub story_id: i32,
    pub source_scene_id: i32,
    pub target_scene_id: i32,
    pub text: String,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::stories::Entity",
        from = "Column::StoryId",
        to = "super::stories::Column::Id"
    )]
    Stories,
    #[sea_orm(
        belongs_to = "super::scenes::Entity",
        from = "Column::SourceSceneId",
        to = "super::scenes::Column::Id"
    )]
    SourceScene,
    #[sea_orm(
        belongs_to = "super::scenes::Entity",
        from = "Column::TargetSceneId",
        to = "super::scenes::Column::Id"
    )]
    TargetScene,
}

impl Related<super::stories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Stories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
