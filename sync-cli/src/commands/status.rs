//! Show connectivity, cache, queue and progress.

use anyhow::Result;
use std::path::Path;

use practice_sync_core::level_progress;
use practice_sync_types::Timestamp;

use super::Session;

/// Run the status command.
pub async fn run(data_dir: &Path, use_mock: bool) -> Result<()> {
    let session = Session::open(data_dir, use_mock).await?;
    let engine = &session.engine;
    let now = Timestamp::now();

    println!("=== practice-sync status ===");
    println!();

    let online = engine.monitor().check_online().await;
    println!("Connection:");
    println!("  Status: {}", if online { "ONLINE" } else { "OFFLINE" });
    if !use_mock {
        println!("  Server: {}", session.config.remote.base_url);
    }
    match engine.reconciler().last_sync().await {
        Some(at) => println!("  Last sync: {}", format_age(at, now)),
        None => println!("  Last sync: never"),
    }

    println!();

    let breakdown = engine.cache().breakdown().await;
    println!("Cached items: {}", breakdown.values().sum::<usize>());
    for (category, count) in &breakdown {
        println!("  {:<20} {}", category, count);
    }

    println!();

    let pending = engine.queue().list().await;
    let stats = engine.queue().stats().await;
    println!("Result queue:");
    println!("  Pending:          {}", pending.len());
    println!("  Answered offline: {}", stats.answered_offline);
    println!("  Synced:           {}", stats.synced);
    println!("  Discarded:        {}", stats.discarded);
    if let Some(oldest) = pending.first() {
        println!("  Oldest:           {}", format_age(oldest.created_at, now));
    }

    println!();

    match engine.progress().snapshot_read().await {
        Some(snapshot) => {
            let level = level_progress(snapshot.total_xp);
            println!("Progress ({}):", snapshot.user_id);
            println!(
                "  Level {} ({:.0}% to next), {} XP, streak {}",
                level.level,
                level.fraction() * 100.0,
                snapshot.total_xp,
                snapshot.streak
            );
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

/// Format how long ago `ts` was, relative to `now`.
fn format_age(ts: Timestamp, now: Timestamp) -> String {
    let diff = now.since(ts).as_secs();

    if diff < 60 {
        "just now".to_string()
    } else if diff < 3600 {
        format!("{} minutes ago", diff / 60)
    } else if diff < 86400 {
        format!("{} hours ago", diff / 3600)
    } else {
        format!("{} days ago", diff / 86400)
    }
}
