use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create stories table
        manager
            .create_table(
                Table::create()
                    .table(Stories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Stories::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Stories::OwnerUserId).integer().not_null())
                    .col(ColumnDef::new(Stories::Title).string().not_null())
                    .col(ColumnDef::new(Stories::Description).string())
                    .col(ColumnDef::new(Stories::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Stories::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // Create scenes table
        manager
            .create_table(
                Table::create()
                    .table(Scenes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Scenes::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Scenes::StoryId).integer().not_null())
                    .col(ColumnDef::new(Scenes::Title).string().not_null())
                    .col(ColumnDef::new(Scenes::Content).text())
                    .col(
                        ColumnDef::new(Scenes::PositionX)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Scenes::PositionY)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(Scenes::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Scenes::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_scenes_story_id")
                            .from(Scenes::Table, Scenes::StoryId)
                            .to(Stories::Table, Stories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_scenes_story_id")
                    .table(Scenes::Table)
                    .col(Scenes::StoryId)
                    .to_owned(),
            )
            .await?;

        // Create choices table
        manager
            .create_table(
                Table::create()
                    .table(Choices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Choices::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Choices::StoryId).integer().not_null())
                    .col(ColumnDef::new(Choices::SourceSceneId).integer().not_null())
                    .col(ColumnDef::new(Choices::TargetSceneId).integer().not_null())
                    .col(ColumnDef::new(Choices::Text).string().not_null())
                    .col(ColumnDef::new(Choices::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Choices::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_choices_story_id")
                            .from(Choices::Table, Choices::StoryId)
                            .to(Stories::Table, Stories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_choices_source_scene_id")
                            .from(Choices::Table, Choices::SourceSceneId)
                            .to(Scenes::Table, Scenes::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_choices_target_scene_id")
                            .from(Choices::Table, Choices::TargetSceneId)
                            .to(Scenes::Table, Scenes::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_choices_source_scene_id")
                    .table(Choices::Table)
                    .col(Choices::SourceSceneId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_choices_target_scene_id")
                    .table(Choices::Table)
                    .col(Choices::TargetSceneId)
                    .to_owned(),
            )
            .await?;

        // Create story_members table
        manager
            .create_table(
                Table::create()
                    .table(StoryMembers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StoryMembers::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(StoryMembers::StoryId).integer().not_null())
                    .col(ColumnDef::new(StoryMembers::UserId).integer().not_null())
                    .col(ColumnDef::new(StoryMembers::Role).string().not_null())
                    .col(
                        ColumnDef::new(StoryMembers::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_story_members_story_id")
                            .from(StoryMembers::Table, StoryMembers::StoryId)
                            .to(Stories::Table, Stories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_story_members_story_user")
                    .table(StoryMembers::Table)
                    .col(StoryMembers::StoryId)
                    .col(StoryMembers::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Create characters table
        manager
            .create_table(
                Table::create()
                    .table(Characters::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Characters::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Characters::StoryId).integer().not_null())
                    .col(ColumnDef::new(Characters::Name).string().not_null())
                    .col(ColumnDef::new(Characters::Description).string())
                    .col(ColumnDef::new(Characters::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Characters::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_characters_story_id")
                            .from(Characters::Table, Characters::StoryId)
                            .to(Stories::Table, Stories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create assets table
        manager
            .create_table(
                Table::create()
                    .table(Assets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Assets::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Assets::StoryId).integer().not_null())
                    .col(ColumnDef::new(Assets::AssetType).string().not_null())
                    .col(ColumnDef::new(Assets::Name).string().not_null())
                    .col(ColumnDef::new(Assets::Content).text().not_null())
                    .col(ColumnDef::new(Assets::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_assets_story_id")
                            .from(Assets::Table, Assets::StoryId)
                            .to(Stories::Table, Stories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create documents table
        manager
            .create_table(
                Table::create()
                    .table(Documents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Documents::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Documents::StoryId).integer().not_null())
                    .col(ColumnDef::new(Documents::Filename).string().not_null())
                    .col(
                        ColumnDef::new(Documents::Status)
                            .string()
                            .not_null()
                            .default("UPLOADED"),
                    )
                    .col(ColumnDef::new(Documents::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Documents::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_documents_story_id")
                            .from(Documents::Table, Documents::StoryId)
                            .to(Stories::Table, Stories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create analytics_events table. choice_id carries no foreign key:
        // events are historical fact and survive choice deletion.
        manager
            .create_table(
                Table::create()
                    .table(AnalyticsEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AnalyticsEvents::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AnalyticsEvents::PlaythroughId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AnalyticsEvents::StoryId).integer().not_null())
                    .col(
                        ColumnDef::new(AnalyticsEvents::ChoiceId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AnalyticsEvents::SourceSceneId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AnalyticsEvents::TargetSceneId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AnalyticsEvents::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_analytics_events_story_id")
                            .from(AnalyticsEvents::Table, AnalyticsEvents::StoryId)
                            .to(Stories::Table, Stories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_analytics_events_choice_id")
                    .table(AnalyticsEvents::Table)
                    .col(AnalyticsEvents::ChoiceId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_analytics_events_story_id")
                    .table(AnalyticsEvents::Table)
                    .col(AnalyticsEvents::StoryId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_analytics_events_playthrough_id")
                    .table(AnalyticsEvents::Table)
                    .col(AnalyticsEvents::PlaythroughId)
                    .to_owned(),
            )
            .await?;

        // Create choice_analytics table. choice_id is unique but carries no
        // foreign key: the cascade from choices is an explicit service
        // operation, and an orphaned row is detected and healed rather than
        // silently prevented.
        manager
            .create_table(
                Table::create()
                    .table(ChoiceAnalytics::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChoiceAnalytics::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ChoiceAnalytics::ChoiceId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChoiceAnalytics::StoryId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChoiceAnalytics::ClickCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_choice_analytics_story_id")
                            .from(ChoiceAnalytics::Table, ChoiceAnalytics::StoryId)
                            .to(Stories::Table, Stories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_choice_analytics_choice_id")
                    .table(ChoiceAnalytics::Table)
                    .col(ChoiceAnalytics::ChoiceId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_choice_analytics_story_id")
                    .table(ChoiceAnalytics::Table)
                    .col(ChoiceAnalytics::StoryId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ChoiceAnalytics::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AnalyticsEvents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Documents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Assets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Characters::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(StoryMembers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Choices::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Scenes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Stories::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(Iden)]
enum Stories {
    Table,
    Id,
    OwnerUserId,
    Title,
    Description,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Scenes {
    Table,
    Id,
    StoryId,
    Title,
    Content,
    PositionX,
    PositionY,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Choices {
    Table,
    Id,
    StoryId,
    SourceSceneId,
    TargetSceneId,
    Text,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum StoryMembers {
    Table,
    Id,
    StoryId,
    UserId,
    Role,
    CreatedAt,
}

#[derive(Iden)]
enum Characters {
    Table,
    Id,
    StoryId,
    Name,
    Description,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Assets {
    Table,
    Id,
    StoryId,
    AssetType,
    Name,
    Content,
    CreatedAt,
}

#[derive(Iden)]
enum Documents {
    Table,
    Id,
    StoryId,
    Filename,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum AnalyticsEvents {
    Table,
    Id,
    PlaythroughId,
    StoryId,
    ChoiceId,
    SourceSceneId,
    TargetSceneId,
    CreatedAt,
}

#[derive(Iden)]
enum ChoiceAnalytics {
    Table,
    Id,
    ChoiceId,
    StoryId,
    ClickCount,
}
