/*!
 * Tests for the recipient registry and its SQLite store
 */

use anyhow::Result;
use paysplit::registry::store::RegistryStore;
use paysplit::registry::RegistrySnapshot;
use crate::common;

/// Test that roster loading skips blank lines and case-insensitive duplicates
#[test]
fn test_fromRosterFile_withDuplicatesAndBlanks_shouldDeduplicate() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let roster = common::create_test_roster(
        &temp_dir.path().to_path_buf(),
        "roster.txt",
        &["Maria Silva", "", "  maria silva  ", "Joao Souza"],
    )?;

    let snapshot = RegistrySnapshot::from_roster_file(&roster)?;

    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot.get(1).unwrap().name, "Maria Silva");
    assert_eq!(snapshot.get(2).unwrap().name, "Joao Souza");

    Ok(())
}

/// Test that an all-blank roster is rejected
#[test]
fn test_fromRosterFile_withOnlyBlankLines_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let roster = common::create_test_file(&temp_dir.path().to_path_buf(), "roster.txt", "\n  \n\n")?;

    assert!(RegistrySnapshot::from_roster_file(&roster).is_err());

    Ok(())
}

/// Test that a roster import reports only newly added recipients
#[tokio::test]
async fn test_importRoster_withExistingRecipient_shouldCountOnlyNewOnes() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let roster = common::create_test_roster(
        &temp_dir.path().to_path_buf(),
        "roster.txt",
        &["Maria Silva", "Joao Souza", "Carlos Pereira"],
    )?;

    let store = RegistryStore::new_in_memory()?;
    store.add_recipient("Maria Silva", None, None).await?;

    let added = store.import_roster(&roster).await?;

    assert_eq!(added, 2);
    assert_eq!(store.stats().await?.total_recipients, 3);

    Ok(())
}

/// Test that a snapshot does not observe edits made after it was taken
#[tokio::test]
async fn test_snapshot_afterLaterEdits_shouldStayUnchanged() -> Result<()> {
    let store = RegistryStore::new_in_memory()?;
    store.add_recipient("Maria Silva", None, None).await?;

    let snapshot = store.snapshot().await?;
    store.add_recipient("Joao Souza", None, None).await?;
    store.set_active("Maria Silva", false).await?;

    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.active_count(), 1);
    assert_eq!(store.snapshot().await?.len(), 2);

    Ok(())
}

/// Test that an extension override can be set and cleared again
#[tokio::test]
async fn test_setAllowedExtensions_withOverrideThenNone_shouldRoundTrip() -> Result<()> {
    let store = RegistryStore::new_in_memory()?;
    store.add_recipient("Maria Silva", None, None).await?;

    store
        .set_allowed_extensions("Maria Silva", Some(vec!["pdf".to_string()]))
        .await?;
    let record = store.get_by_name("Maria Silva").await?.unwrap();
    assert_eq!(record.allowed_extensions, Some(vec!["pdf".to_string()]));

    store.set_allowed_extensions("Maria Silva", None).await?;
    let record = store.get_by_name("Maria Silva").await?.unwrap();
    assert_eq!(record.allowed_extensions, None);

    Ok(())
}

/// Test that recipients and aliases survive closing and reopening the store
#[tokio::test]
async fn test_store_afterReopen_shouldRetainRecipients() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let db_path = temp_dir.path().join("registry.db");

    {
        let store = RegistryStore::new(&db_path)?;
        store
            .add_recipient("Maria Silva", Some("maria@example.com"), None)
            .await?;
        store.add_alias("Maria Silva", "M. Silva").await?;
    }

    let reopened = RegistryStore::new(&db_path)?;
    let record = reopened.get_by_name("Maria Silva").await?.unwrap();

    assert_eq!(record.email.as_deref(), Some("maria@example.com"));
    assert_eq!(record.aliases, vec!["M. Silva".to_string()]);
    assert_eq!(reopened.path(), db_path.as_path());

    Ok(())
}

/// Test that removing a recipient also removes its aliases
#[tokio::test]
async fn test_removeRecipient_shouldCascadeAliases() -> Result<()> {
    let store = RegistryStore::new_in_memory()?;
    store.add_recipient("Maria Silva", None, None).await?;
    store.add_alias("Maria Silva", "M. Silva").await?;

    store.remove_recipient("Maria Silva").await?;
    assert_eq!(store.stats().await?.alias_count, 0);

    // a fresh record with the same name must not inherit old aliases
    store.add_recipient("Maria Silva", None, None).await?;
    let record = store.get_by_name("Maria Silva").await?.unwrap();
    assert!(record.aliases.is_empty());

    Ok(())
}
