//! Membership and access-control tests: role upserts, last-owner
//! protection, and the static permission table.

use anyhow::Result;
use sea_orm::{Database, DatabaseConnection};
use storyloom::database::setup_database;
use storyloom::errors::StoryGraphError;
use storyloom::services::{authorize, Action, MembershipService, Role, StoryService};
use tempfile::NamedTempFile;

async fn setup_test_db() -> Result<(DatabaseConnection, NamedTempFile)> {
    let temp_file = NamedTempFile::new()?;
    let db_url = format!("sqlite://{}?mode=rwc", temp_file.path().display());

    let db = Database::connect(&db_url).await?;
    setup_database(&db).await?;

    Ok((db, temp_file))
}

#[tokio::test]
async fn test_owner_role_is_implicit() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let stories = StoryService::new(db.clone());
    let members = MembershipService::new(db.clone());

    let story = stories.create_story(1, "Story", None).await?;

    // No member row needed for the owner
    assert_eq!(members.effective_role(story.id, 1).await?, Some(Role::Owner));
    assert_eq!(members.effective_role(story.id, 2).await?, None);
    assert_eq!(members.list_members(story.id).await?.len(), 0);

    Ok(())
}

#[tokio::test]
async fn test_grant_role_upserts_single_row() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let stories = StoryService::new(db.clone());
    let members = MembershipService::new(db.clone());

    let story = stories.create_story(1, "Story", None).await?;

    members.grant_role(story.id, 2, Role::Viewer).await?;
    assert_eq!(members.effective_role(story.id, 2).await?, Some(Role::Viewer));

    // Second grant for the same pair is an update, not a second row
    members.grant_role(story.id, 2, Role::Editor).await?;
    assert_eq!(members.effective_role(story.id, 2).await?, Some(Role::Editor));
    assert_eq!(members.list_members(story.id).await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_single_owner_invariant_on_grant() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let stories = StoryService::new(db.clone());
    let members = MembershipService::new(db.clone());

    let story = stories.create_story(1, "Story", None).await?;

    // A second OWNER would violate exactly-one-owner
    let err = members.grant_role(story.id, 2, Role::Owner).await.unwrap_err();
    assert!(matches!(err, StoryGraphError::LastOwner { .. }));

    // Demoting the owner would leave no owner
    let err = members.grant_role(story.id, 1, Role::Editor).await.unwrap_err();
    assert!(matches!(err, StoryGraphError::LastOwner { .. }));

    // An explicit OWNER row for the owner themselves is redundant but valid
    members.grant_role(story.id, 1, Role::Owner).await?;
    assert_eq!(members.effective_role(story.id, 1).await?, Some(Role::Owner));

    Ok(())
}

#[tokio::test]
async fn test_revoke_sole_owner_fails() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let stories = StoryService::new(db.clone());
    let members = MembershipService::new(db.clone());

    let story = stories.create_story(1, "Story", None).await?;
    members.grant_role(story.id, 2, Role::Editor).await?;

    let err = members.revoke_role(story.id, 1).await.unwrap_err();
    assert!(matches!(err, StoryGraphError::LastOwner { .. }));

    // The owner is untouched, and collaborators can still be revoked
    assert_eq!(members.effective_role(story.id, 1).await?, Some(Role::Owner));
    members.revoke_role(story.id, 2).await?;
    assert_eq!(members.effective_role(story.id, 2).await?, None);

    Ok(())
}

#[tokio::test]
async fn test_revoke_missing_membership() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let stories = StoryService::new(db.clone());
    let members = MembershipService::new(db.clone());

    let story = stories.create_story(1, "Story", None).await?;

    let err = members.revoke_role(story.id, 42).await.unwrap_err();
    assert!(matches!(err, StoryGraphError::NotFound { .. }));

    Ok(())
}

#[test]
fn test_permission_table() {
    // Everyone reads
    assert!(authorize(Role::Viewer, Action::ReadStory));
    assert!(authorize(Role::Editor, Action::ReadStory));
    assert!(authorize(Role::Owner, Action::ReadStory));

    // Editors and owners mutate content
    assert!(!authorize(Role::Viewer, Action::EditContent));
    assert!(authorize(Role::Editor, Action::EditContent));
    assert!(authorize(Role::Owner, Action::EditContent));

    // Only owners manage members or delete the story
    for action in [Action::ManageMembers, Action::DeleteStory] {
        assert!(!authorize(Role::Viewer, action));
        assert!(!authorize(Role::Editor, action));
        assert!(authorize(Role::Owner, action));
    }
}

#[tokio::test]
async fn test_require_rejects_insufficient_roles() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let stories = StoryService::new(db.clone());
    let members = MembershipService::new(db.clone());

    let story = stories.create_story(1, "Story", None).await?;
    members.grant_role(story.id, 2, Role::Viewer).await?;

    assert_eq!(
        members.require(story.id, 2, Action::ReadStory).await?,
        Role::Viewer
    );

    let err = members
        .require(story.id, 2, Action::EditContent)
        .await
        .unwrap_err();
    assert!(matches!(err, StoryGraphError::PermissionDenied { .. }));

    // Non-members are denied everything
    let err = members
        .require(story.id, 3, Action::ReadStory)
        .await
        .unwrap_err();
    assert!(matches!(err, StoryGraphError::PermissionDenied { .. }));

    Ok(())
}
