//! Show (or initialize) local progress.

use anyhow::Result;
use std::path::Path;

use practice_sync_core::level_progress;

use super::Session;

/// Run the progress command.
pub async fn run(data_dir: &Path, use_mock: bool, init: bool) -> Result<()> {
    let session = Session::open(data_dir, use_mock).await?;
    let progress = session.engine.progress();

    let snapshot = if init {
        Some(progress.initialize(&session.config.user.user_id).await?)
    } else {
        progress.snapshot_read().await
    };

    match snapshot {
        Some(snapshot) => {
            let level = level_progress(snapshot.total_xp);
            println!("Progress for {}", snapshot.user_id);
            println!();
            println!("  Level:  {}", level.level);
            println!(
                "  XP:     {} ({} / {} this level)",
                snapshot.total_xp, level.xp_this_level, level.xp_to_next_level
            );
            println!("  Streak: {}", snapshot.streak);
            if !snapshot.mastery.is_empty() {
                println!("  Mastery:");
                for (category, score) in &snapshot.mastery {
                    println!("    {:<20} {:.2}", category, score);
                }
            }
        }
        None => {
            println!("Progress: NOT INITIALIZED");
            println!();
            println!("Run 'practice-sync progress --init' to start tracking.");
        }
    }

    session.close().await;
    Ok(())
}
