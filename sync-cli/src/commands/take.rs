//! Serve one cached item.

use anyhow::Result;
use std::path::Path;

use super::Session;

/// Run the take command.
pub async fn run(data_dir: &Path, use_mock: bool, category: &str) -> Result<()> {
    let session = Session::open(data_dir, use_mock).await?;

    match session.engine.cache().take(category).await {
        Some(item) => {
            println!("Item {}", item.remote_id);
            if let Some(difficulty) = item.difficulty {
                println!("  Difficulty: {}", difficulty);
            }
            println!("{}", serde_json::to_string_pretty(&item.payload)?);
        }
        None => {
            println!("No cached items for '{}'.", category);
            println!();
            println!(
                "Run 'practice-sync fill --category {}' while online.",
                category
            );
        }
    }

    session.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn take_consumes_one_item() {
        let dir = tempdir().unwrap();
        crate::commands::fill::run(dir.path(), true, "geometry", 2, None)
            .await
            .unwrap();

        run(dir.path(), true, "geometry").await.unwrap();

        let session = Session::open(dir.path(), true).await.unwrap();
        assert_eq!(session.engine.cache().count(None).await, 1);
        session.close().await;
    }

    #[tokio::test]
    async fn take_from_empty_cache_is_ok() {
        let dir = tempdir().unwrap();
        assert!(run(dir.path(), true, "geometry").await.is_ok());
    }
}
