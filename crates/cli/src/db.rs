//! Database initialization and status

use anyhow::{Context, Result};
use grossbook_persistence::{LedgerStore, SqliteLedgerStore};
use std::path::Path;

fn database_url(db_path: &Path) -> String {
    format!("sqlite:{}?mode=rwc", db_path.display())
}

/// Initialize the database with schema
pub async fn init_database(db_path: &Path, force: bool) -> Result<()> {
    if force && db_path.exists() {
        std::fs::remove_file(db_path).context("Failed to remove existing database")?;
        println!("🗑️  Removed existing database");
    }

    let store = SqliteLedgerStore::open(&database_url(db_path))
        .await
        .context("Failed to initialize database")?;
    store.shutdown().await;
    Ok(())
}

/// Show database status
pub async fn show_status(db_path: &Path) -> Result<()> {
    if !db_path.exists() {
        println!("❌ Database not found at {:?}", db_path);
        println!("   Run 'grossbook init' to create the database");
        return Ok(());
    }

    let store = SqliteLedgerStore::open(&database_url(db_path))
        .await
        .context("Failed to open database")?;
    let stats = store.stats().await.context("Failed to count records")?;

    println!("📊 Database Status");
    println!("   Path: {:?}", db_path);
    println!();
    println!("   Users:      {}", stats.users);
    println!("   Operations: {}", stats.operations);

    store.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_then_force_reinit() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("grossbook.db");

        init_database(&db, false).await.unwrap();
        assert!(db.exists());

        init_database(&db, true).await.unwrap();
        show_status(&db).await.unwrap();
    }

    #[tokio::test]
    async fn test_status_without_database() {
        let dir = tempfile::tempdir().unwrap();
        show_status(&dir.path().join("missing.db")).await.unwrap();
    }
}
