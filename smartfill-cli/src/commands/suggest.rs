//! Suggest command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use smartfill_core::{Frame, ScoringOptions};
use tracing::info;

use crate::utils::{open_library, parse_frame_size, wait_for_analysis};

pub struct SuggestArgs {
    pub dir: PathBuf,
    pub frame: String,
    pub options: ScoringOptions,
    pub no_wait: bool,
    pub json: bool,
}

/// Execute the suggest command.
pub async fn execute(args: SuggestArgs) -> Result<()> {
    let (width, height) = parse_frame_size(&args.frame)?;
    let frame = Frame::new("frame", width, height);
    let (library, coordinator) = open_library(&args.dir, vec![frame.clone()]).await?;

    if !args.no_wait {
        coordinator
            .analyze_library(&library.photo_id_list(), args.options.target_faces)
            .await
            .context("Failed to dispatch analysis")?;
        wait_for_analysis(&coordinator, args.json).await;
    }

    let suggestions = coordinator
        .get_suggestions_for_frame(&frame, args.options)
        .await
        .context("Failed to score photos")?;
    info!(suggestions = suggestions.len(), "Scored suggestions");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&suggestions)?);
        return Ok(());
    }

    println!();
    println!(
        "{}",
        format!("Best photos for a {} frame", args.frame).bold()
    );
    if suggestions.is_empty() {
        println!();
        println!("   {}", "No analyzed photos yet.".yellow());
        return Ok(());
    }
    println!();
    for (rank, suggestion) in suggestions.iter().enumerate() {
        let b = &suggestion.breakdown;
        println!(
            "   {:>2}. {} {}",
            rank + 1,
            suggestion.photo_id,
            format!("{}/100", suggestion.total_score).green()
        );
        println!(
            "       {}",
            format!(
                "aspect {} | resolution {} | composition {} | color {} | faces {}",
                b.aspect_ratio, b.resolution, b.composition, b.color_harmony, b.face_handling
            )
            .dimmed()
        );
        for warning in &suggestion.warnings {
            println!("       {} {}", "!".yellow(), warning.yellow());
        }
    }
    Ok(())
}
