use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "assets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub story_id: i32,
    pub asset_type: String,
    pub name: String,
    pub content: String,
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

/// Closed set of asset kinds; values round-trip exactly as stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetType {
    TextSnippet,
    ImageUrl,
}

impl AssetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::TextSnippet => "TEXT_SNIPPET",
            AssetType::ImageUrl => "IMAGE_URL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "TEXT_SNIPPET" => Some(AssetType::TextSnippet),
            "IMAGE_URL" => Some(AssetType::ImageUrl),
            _ => None,
        }
    }
}
