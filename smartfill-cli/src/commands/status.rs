//! Status command implementation.

use std::path::PathBuf;

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use smartfill_core::ANALYSIS_VERSION;

use crate::utils::{format_timestamp, open_library};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PhotoStatus<'a> {
    photo_id: &'a str,
    analyzed: bool,
    analyzed_at: Option<u64>,
    primary_color: Option<String>,
}

/// Execute the status command. Reads the cache only; nothing is analyzed.
pub async fn execute(dir: PathBuf, faces: bool, json: bool) -> Result<()> {
    let (library, coordinator) = open_library(&dir, Vec::new()).await?;
    let photo_ids = library.photo_id_list();

    let cached = coordinator.cache().get_many(&photo_ids).await;
    let statuses: Vec<PhotoStatus<'_>> = photo_ids
        .iter()
        .map(|id| {
            let record = cached.get(id).filter(|a| a.satisfies(faces));
            PhotoStatus {
                photo_id: id,
                analyzed: record.is_some(),
                analyzed_at: record.map(|a| a.timestamp),
                primary_color: record
                    .and_then(|a| a.color_profile.primary_color())
                    .map(str::to_owned),
            }
        })
        .collect();
    let complete = coordinator.check_analysis_status(&photo_ids, faces).await;

    if json {
        let output = serde_json::json!({
            "complete": complete,
            "version": ANALYSIS_VERSION,
            "photos": statuses,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let analyzed = statuses.iter().filter(|s| s.analyzed).count();
    println!();
    if complete {
        println!("{}", "All photos analyzed".green().bold());
    } else {
        println!("{}", "Analysis incomplete".yellow().bold());
    }
    println!("   {} {}/{}", "Analyzed:".dimmed(), analyzed, statuses.len());
    println!();
    for status in &statuses {
        match status.analyzed_at {
            Some(ts) => println!(
                "   {} {} {}",
                "✓".green(),
                status.photo_id,
                format_timestamp(ts).dimmed()
            ),
            None => println!("   {} {}", "·".yellow(), status.photo_id),
        }
    }
    Ok(())
}
