//! Analyze command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::info;

use crate::utils::{open_library, wait_for_analysis};

/// Execute the analyze command.
pub async fn execute(dir: PathBuf, faces: bool, quiet: bool) -> Result<()> {
    let (library, coordinator) = open_library(&dir, Vec::new()).await?;
    let photo_ids = library.photo_id_list();

    let dispatched = coordinator
        .analyze_library(&photo_ids, faces)
        .await
        .context("Failed to dispatch analysis")?;
    wait_for_analysis(&coordinator, quiet).await;

    let mut failed = Vec::new();
    for id in &photo_ids {
        if !coordinator.check_analysis_status(std::slice::from_ref(id), faces).await {
            failed.push(id.as_str());
        }
    }
    info!(
        photos = photo_ids.len(),
        dispatched,
        failed = failed.len(),
        "Analysis finished"
    );

    if !quiet {
        println!();
        println!("{}", "Analysis complete".green().bold());
        println!("   {} {}", "Directory:".dimmed(), dir.display());
        println!("   {} {}", "Photos:".dimmed(), photo_ids.len());
        println!(
            "   {} {}",
            "Analyzed now:".dimmed(),
            dispatched.saturating_sub(failed.len())
        );
        println!(
            "   {} {}",
            "Already cached:".dimmed(),
            photo_ids.len().saturating_sub(dispatched)
        );
        println!("   {} {}", "Faces:".dimmed(), if faces { "yes" } else { "no" });
        if !failed.is_empty() {
            println!("   {} {}", "Failed:".dimmed(), failed.len().to_string().yellow());
            for id in &failed {
                println!("      {}", id.yellow());
            }
        }
    }
    Ok(())
}
