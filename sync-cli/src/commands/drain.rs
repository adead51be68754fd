//! Submit queued results now.

use anyhow::Result;
use std::path::Path;

use super::Session;

/// Run the drain command.
pub async fn run(data_dir: &Path, use_mock: bool) -> Result<()> {
    let session = Session::open(data_dir, use_mock).await?;
    let outcome = session.engine.drain().await;

    if let Some(note) = &outcome.note {
        println!("Nothing submitted: {}", note);
    } else {
        println!("Drain complete.");
        println!();
        println!("  Succeeded: {}", outcome.succeeded);
        println!("  Failed:    {}", outcome.failed);
        println!("  XP earned: {}", outcome.reward);
        for line in &outcome.diagnostics {
            println!("  ! {}", line);
        }
        for dropped in &outcome.discarded {
            println!(
                "  Discarded {} after {} attempts",
                dropped.item_id, dropped.attempts
            );
        }
    }
    println!();
    println!("  Still pending: {}", session.engine.queue().len().await);

    session.close().await;
    Ok(())
}
