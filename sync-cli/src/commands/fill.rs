//! Pre-fetch items for a category.

use anyhow::Result;
use std::path::Path;

use practice_sync_types::Difficulty;

use super::Session;

/// Run the fill command.
pub async fn run(
    data_dir: &Path,
    use_mock: bool,
    category: &str,
    count: usize,
    difficulty: Option<&str>,
) -> Result<()> {
    let difficulty = difficulty.map(str::parse::<Difficulty>).transpose()?;
    let session = Session::open(data_dir, use_mock).await?;
    let cache = session.engine.cache();

    let limit = session.config.engine.fill_batch_limit;
    if count > limit {
        println!("Requested {} items, capped at {}", count, limit);
    }

    let stored = cache.fill(category, count, difficulty).await;
    if stored == 0 && !session.engine.monitor().is_online() {
        println!("Offline: nothing fetched.");
    } else {
        println!("Cached {} item(s) for '{}'", stored, category);
    }
    println!(
        "  Valid for '{}': {}",
        category,
        cache.count(Some(&category.into())).await
    );

    session.close().await;
    Ok(())
}
