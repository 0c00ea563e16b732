//! Common utility functions shared across CLI commands.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{TimeZone, Utc};
use colored::Colorize;
use serde::Deserialize;
use smartfill_core::{
    open_cache, AnalysisProgress, DirectoryLibrary, Frame, ScoringOptions, SmartFillConfig,
    SmartFillCoordinator,
};
use tracing::debug;

/// Wall layout file: `{"frames": [{"id", "width", "height", "locked"}]}`.
#[derive(Debug, Deserialize)]
pub struct WallFile {
    pub frames: Vec<Frame>,
}

/// Parse a `WxH` frame size such as `4x6` or `8.5X11`.
pub fn parse_frame_size(value: &str) -> Result<(f64, f64)> {
    let parsed = value
        .split_once(['x', 'X'])
        .and_then(|(w, h)| Some((w.trim().parse::<f64>().ok()?, h.trim().parse::<f64>().ok()?)));
    match parsed {
        Some((w, h)) if w > 0.0 && h > 0.0 && w.is_finite() && h.is_finite() => Ok((w, h)),
        _ => bail!("Invalid frame size: {value} (expected WxH, e.g. 4x6)"),
    }
}

pub fn load_wall(path: &Path) -> Result<Vec<Frame>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read wall file: {}", path.display()))?;
    let wall: WallFile = serde_json::from_slice(&bytes)
        .with_context(|| format!("Failed to parse wall file: {}", path.display()))?;
    debug!(frames = wall.frames.len(), "Loaded wall");
    Ok(wall.frames)
}

pub fn scoring_options(faces: bool, black_and_white: bool, vibrant: bool) -> ScoringOptions {
    ScoringOptions {
        target_faces: faces,
        prefer_black_and_white: black_and_white,
        prefer_vibrant: vibrant,
    }
}

/// Scan `dir` and start a coordinator over it, configured from the
/// environment.
pub async fn open_library(
    dir: &Path,
    frames: Vec<Frame>,
) -> Result<(Arc<DirectoryLibrary>, SmartFillCoordinator)> {
    let config = SmartFillConfig::from_env().context("Invalid configuration")?;
    let library = Arc::new(
        DirectoryLibrary::scan(dir)
            .with_context(|| format!("Failed to read photo directory: {}", dir.display()))?
            .with_frames(frames),
    );
    let cache = open_cache(&config).await.context("Failed to open analysis cache")?;

    let coordinator = SmartFillCoordinator::for_library(library.clone())
        .with_config(config)
        .with_cache(cache)
        .build()
        .await
        .context("Failed to start analysis")?;
    Ok((library, coordinator))
}

/// Wait for background analysis, printing progress unless `quiet`.
pub async fn wait_for_analysis(coordinator: &SmartFillCoordinator, quiet: bool) {
    let mut progress = coordinator.subscribe();
    loop {
        let snapshot: AnalysisProgress = *progress.borrow_and_update();
        if snapshot.is_idle() {
            break;
        }
        if !quiet {
            eprintln!(
                "   {} {}/{} photos",
                "Analyzing:".dimmed(),
                snapshot.completed,
                snapshot.total
            );
        }
        if progress.changed().await.is_err() {
            break;
        }
    }
}

/// Format a Unix timestamp (milliseconds) as a human-readable UTC string.
pub fn format_timestamp(timestamp_ms: u64) -> String {
    let secs = (timestamp_ms / 1000) as i64;
    let nsecs = ((timestamp_ms % 1000) * 1_000_000) as u32;
    match Utc.timestamp_opt(secs, nsecs) {
        chrono::LocalResult::Single(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        _ => format!("{}ms", timestamp_ms),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_size() {
        assert_eq!(parse_frame_size("4x6").unwrap(), (4.0, 6.0));
        assert_eq!(parse_frame_size("8.5X11").unwrap(), (8.5, 11.0));
        assert_eq!(parse_frame_size(" 5 x 7 ").unwrap(), (5.0, 7.0));
        assert!(parse_frame_size("4by6").is_err());
        assert!(parse_frame_size("0x6").is_err());
        assert!(parse_frame_size("4x").is_err());
    }

    #[test]
    fn test_load_wall_defaults_locked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wall.json");
        std::fs::write(
            &path,
            r#"{"frames":[{"id":"a","width":4,"height":6},{"id":"b","width":5,"height":5,"locked":true}]}"#,
        )
        .unwrap();

        let frames = load_wall(&path).unwrap();
        assert_eq!(frames.len(), 2);
        assert!(!frames[0].locked);
        assert!(frames[1].locked);
    }

    #[test]
    fn test_format_timestamp() {
        // 2024-01-15 12:30:45.123 UTC
        let formatted = format_timestamp(1705321845123);
        assert!(formatted.contains("2024-01-15"));
        assert!(formatted.contains("UTC"));
    }
}
