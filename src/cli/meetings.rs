//! CLI handlers for meeting history and transcript export.

use anyhow::{Context, Result};

use super::args::{ExportCliArgs, MeetingsCliArgs};
use super::Stores;
use crate::config::Config;
use crate::meeting::MeetingId;

pub async fn handle_meetings_command(args: MeetingsCliArgs) -> Result<()> {
    let config = Config::load()?;
    let stores = Stores::open(&config)?;
    let meetings = stores.sessions.recent().await?;

    if meetings.is_empty() {
        println!("No meetings recorded yet.");
        return Ok(());
    }

    println!("{} recent meeting(s):\n", meetings.len());

    for record in meetings {
        let last = record
            .latest()
            .map(|entry| entry.start_time.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".to_string());

        println!(
            "{}  joined {}x  total {} min  last {}",
            record.meeting_id, record.count, record.total_duration_minutes, last
        );

        if args.history {
            for entry in &record.history {
                println!(
                    "    {} -> {} ({} min)",
                    entry.start_time, entry.end_time, entry.duration_minutes
                );
            }
        }
    }

    Ok(())
}

pub async fn handle_export_command(args: ExportCliArgs) -> Result<()> {
    let meeting_id = MeetingId::parse(&args.meeting_id)?;
    let config = Config::load()?;
    let stores = Stores::open(&config)?;

    let csv = stores.transcripts.export_csv(&meeting_id).await?;

    match args.output {
        Some(path) => {
            std::fs::write(&path, &csv)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Transcript for {} written to {}", meeting_id, path.display());
        }
        None => print!("{}", csv),
    }

    Ok(())
}
