//! Record an answer in the result queue.

use anyhow::{Context, Result};
use std::path::Path;

use super::Session;

/// Run the answer command.
pub async fn run(
    data_dir: &Path,
    use_mock: bool,
    item: &str,
    answer: &str,
    elapsed_ms: u64,
    category: &str,
) -> Result<()> {
    let session = Session::open(data_dir, use_mock).await?;
    let queue = session.engine.queue();

    let id = queue
        .enqueue(item, answer, elapsed_ms, category)
        .await
        .context("Failed to record answer")?;

    println!("Answer recorded.");
    println!();
    println!("  Result ID: {}", id);
    println!("  Pending:   {}", queue.len().await);
    println!();
    println!("It will be submitted on the next 'practice-sync drain'.");

    session.close().await;
    Ok(())
}
