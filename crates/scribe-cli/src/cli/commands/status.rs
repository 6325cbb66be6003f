//! `scribe status` – show checkpointed jobs.

use anyhow::Result;
use scribe_core::checkpoint::CheckpointStore;

pub async fn run_status(store: &dyn CheckpointStore) -> Result<()> {
    let records = store.list().await?;
    if records.is_empty() {
        println!("No jobs recorded.");
        return Ok(());
    }
    println!(
        "{:<8} {:<12} {:<11} {:<20} {}",
        "PARTS", "STATE", "RECOGNIZED", "LAST", "FILE"
    );
    for (key, rec) in records {
        let state = if rec.completed {
            "completed"
        } else if rec.interrupted {
            "interrupted"
        } else {
            "pending"
        };
        let stats = rec.aggregate_stats();
        let recognized = if stats.total > 0 {
            format!("{:.1}%", stats.rate())
        } else {
            "-".to_string()
        };
        println!(
            "{:<8} {:<12} {:<11} {:<20} {}",
            format!("{}/{}", rec.completed_parts(), rec.total_parts),
            state,
            recognized,
            rec.last_processed_time,
            key
        );
    }
    Ok(())
}
