//! Fill command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use smartfill_core::ScoringOptions;
use tracing::info;

use crate::utils::{load_wall, open_library, wait_for_analysis};

pub struct FillArgs {
    pub dir: PathBuf,
    pub wall: PathBuf,
    pub count: usize,
    pub options: ScoringOptions,
    pub no_wait: bool,
    pub json: bool,
}

/// Execute the fill command.
pub async fn execute(args: FillArgs) -> Result<()> {
    let frames = load_wall(&args.wall)?;
    let locked = frames.iter().filter(|f| f.locked).count();
    let (library, coordinator) = open_library(&args.dir, frames).await?;

    if !args.no_wait {
        coordinator
            .analyze_library(&library.photo_id_list(), args.options.target_faces)
            .await
            .context("Failed to dispatch analysis")?;
        wait_for_analysis(&coordinator, args.json).await;
    }

    let solutions = coordinator
        .generate_gallery_solutions(args.count, args.options)
        .await
        .context("Failed to generate solutions")?;
    info!(requested = args.count, produced = solutions.len(), "Generated solutions");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&solutions)?);
        return Ok(());
    }

    println!();
    if solutions.is_empty() {
        println!("{}", "No photos could be placed on this wall.".yellow().bold());
        println!(
            "   {}",
            "Add photos to the directory or unlock some frames.".dimmed()
        );
        return Ok(());
    }

    println!("{}", "Gallery wall solutions".green().bold());
    if locked > 0 {
        println!("   {} {}", "Locked frames kept:".dimmed(), locked);
    }
    for solution in &solutions {
        println!();
        println!(
            "   {} {}",
            solution.id.bold(),
            format!("({} points)", solution.total_score).dimmed()
        );
        for (frame_id, photo_id) in &solution.assignments {
            println!("      {} {} {}", frame_id, "←".dimmed(), photo_id);
        }
    }
    Ok(())
}
