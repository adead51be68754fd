//! Drop expired cached items.

use anyhow::Result;
use std::path::Path;

use super::Session;

/// Run the sweep command.
pub async fn run(data_dir: &Path, use_mock: bool) -> Result<()> {
    let session = Session::open(data_dir, use_mock).await?;
    let cache = session.engine.cache();

    let removed = cache.sweep().await;
    println!("Removed {} expired item(s)", removed);
    println!("  Remaining: {}", cache.count(None).await);

    session.close().await;
    Ok(())
}
