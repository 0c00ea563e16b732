//! CLI integration tests for smartfill-cli.
//!
//! These tests run the actual binary against directories of generated photos
//! and check outputs, exit codes, and the persisted analysis cache.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use image::{Rgb, RgbImage};
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a Command for the smartfill binary with an isolated cache.
fn smartfill(cache: &Path) -> Command {
    let mut cmd = Command::cargo_bin("smartfill").unwrap();
    cmd.env("SMARTFILL_CACHE_DIR", cache)
        .env("NO_COLOR", "1")
        .env_remove("SMARTFILL_FACE_MODEL")
        .env_remove("RUST_LOG");
    cmd
}

fn write_photo(dir: &Path, name: &str, width: u32, height: u32, rgb: [u8; 3]) {
    let img = RgbImage::from_fn(width, height, |x, _| {
        if x % 16 < 8 {
            Rgb(rgb)
        } else {
            Rgb([rgb[0] / 2, rgb[1] / 2, rgb[2] / 2])
        }
    });
    img.save(dir.join(name)).unwrap();
}

/// Photo directory with two portrait shots and one landscape shot.
fn photo_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_photo(dir.path(), "tall-red.png", 80, 120, [220, 60, 40]);
    write_photo(dir.path(), "tall-blue.png", 80, 120, [40, 80, 220]);
    write_photo(dir.path(), "wide-green.png", 120, 80, [50, 200, 70]);
    dir
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_help_displays_usage() {
    let cache = TempDir::new().unwrap();
    smartfill(cache.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Photo-to-frame matching"))
        .stdout(predicate::str::contains("analyze"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("suggest"))
        .stdout(predicate::str::contains("fill"));
}

#[test]
fn test_help_shows_exit_codes() {
    let cache = TempDir::new().unwrap();
    smartfill(cache.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Exit codes:"))
        .stdout(predicate::str::contains("66"))
        .stdout(predicate::str::contains("78"));
}

#[test]
fn test_version_displays_version() {
    let cache = TempDir::new().unwrap();
    smartfill(cache.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("smartfill"));
}

#[test]
fn test_suggest_help_shows_options() {
    let cache = TempDir::new().unwrap();
    smartfill(cache.path())
        .args(["suggest", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--frame"))
        .stdout(predicate::str::contains("--faces"))
        .stdout(predicate::str::contains("--bw"))
        .stdout(predicate::str::contains("--vibrant"))
        .stdout(predicate::str::contains("--json"));
}

// ============================================================================
// Exit Code Tests
// ============================================================================

#[test]
fn test_missing_directory_returns_input_error() {
    let cache = TempDir::new().unwrap();
    // Exit code 66 = EX_NOINPUT
    smartfill(cache.path())
        .args(["analyze", "definitely-not-a-photo-dir"])
        .assert()
        .code(66)
        .stderr(predicate::str::contains("Failed to read photo directory"));
}

#[test]
fn test_bad_frame_size_returns_usage_error() {
    let photos = photo_dir();
    let cache = TempDir::new().unwrap();
    smartfill(cache.path())
        .args(["suggest", photos.path().to_str().unwrap(), "--frame", "four-by-six"])
        .assert()
        .code(64)
        .stderr(predicate::str::contains("Invalid frame size"));
}

#[test]
fn test_conflicting_color_preferences_rejected() {
    let photos = photo_dir();
    let cache = TempDir::new().unwrap();
    smartfill(cache.path())
        .args([
            "suggest",
            photos.path().to_str().unwrap(),
            "--frame",
            "4x6",
            "--bw",
            "--vibrant",
        ])
        .assert()
        .failure();
}

#[test]
fn test_missing_wall_file_returns_input_error() {
    let photos = photo_dir();
    let cache = TempDir::new().unwrap();
    smartfill(cache.path())
        .args(["fill", photos.path().to_str().unwrap(), "--wall", "no-such-wall.json"])
        .assert()
        .code(66)
        .stderr(predicate::str::contains("Failed to read wall file"));
}

#[test]
fn test_malformed_wall_file_returns_data_error() {
    let photos = photo_dir();
    let cache = TempDir::new().unwrap();
    let wall = cache.path().join("wall.json");
    fs::write(&wall, b"{ not json").unwrap();

    smartfill(cache.path())
        .args(["fill", photos.path().to_str().unwrap(), "--wall", wall.to_str().unwrap()])
        .assert()
        .code(65)
        .stderr(predicate::str::contains("Failed to parse wall file"));
}

#[test]
fn test_invalid_config_returns_config_error() {
    let photos = photo_dir();
    let cache = TempDir::new().unwrap();
    smartfill(cache.path())
        .env("SMARTFILL_SAMPLE_STEP", "0")
        .args(["status", photos.path().to_str().unwrap()])
        .assert()
        .code(78)
        .stderr(predicate::str::contains("sample_step"));
}

// ============================================================================
// Analysis and Cache Tests
// ============================================================================

#[test]
fn test_analyze_then_status_reads_cache() {
    let photos = photo_dir();
    let cache = TempDir::new().unwrap();

    smartfill(cache.path())
        .args(["status", photos.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Analysis incomplete"));

    smartfill(cache.path())
        .args(["analyze", photos.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Analysis complete"))
        .stdout(predicate::str::contains("Photos: 3"));

    let records = fs::read_dir(cache.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|x| x == "json"))
        .count();
    assert_eq!(records, 3);

    smartfill(cache.path())
        .args(["status", photos.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("All photos analyzed"));
}

#[test]
fn test_status_with_faces_needs_face_analysis() {
    let photos = photo_dir();
    let cache = TempDir::new().unwrap();

    smartfill(cache.path())
        .args(["analyze", "--quiet", photos.path().to_str().unwrap()])
        .assert()
        .success();

    let output = smartfill(cache.path())
        .args(["status", "--faces", "--json", photos.path().to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success());
    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["complete"], false);

    smartfill(cache.path())
        .args(["analyze", "--quiet", "--faces", photos.path().to_str().unwrap()])
        .assert()
        .success();

    let output = smartfill(cache.path())
        .args(["status", "--faces", "--json", photos.path().to_str().unwrap()])
        .output()
        .unwrap();
    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["complete"], true);
    assert_eq!(status["photos"].as_array().unwrap().len(), 3);
}

// ============================================================================
// Suggest and Fill Tests
// ============================================================================

#[test]
fn test_suggest_json_ranks_matching_orientation_first() {
    let photos = photo_dir();
    let cache = TempDir::new().unwrap();

    let output = smartfill(cache.path())
        .args(["suggest", photos.path().to_str().unwrap(), "--frame", "4x6", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let suggestions: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let suggestions = suggestions.as_array().unwrap();
    assert_eq!(suggestions.len(), 3);
    assert!(suggestions[0]["photoId"].as_str().unwrap().starts_with("tall-"));
    assert_eq!(suggestions[2]["photoId"], "wide-green.png");

    let scores: Vec<u64> = suggestions
        .iter()
        .map(|s| s["totalScore"].as_u64().unwrap())
        .collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn test_fill_json_respects_locked_frames() {
    let photos = photo_dir();
    let cache = TempDir::new().unwrap();
    let wall = cache.path().join("wall.json");
    fs::write(
        &wall,
        r#"{"frames":[
            {"id":"left","width":4,"height":6},
            {"id":"right","width":4,"height":6},
            {"id":"top","width":6,"height":4},
            {"id":"pinned","width":4,"height":6,"locked":true}
        ]}"#,
    )
    .unwrap();

    let output = smartfill(cache.path())
        .args([
            "fill",
            photos.path().to_str().unwrap(),
            "--wall",
            wall.to_str().unwrap(),
            "--count",
            "3",
            "--json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let solutions: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let solutions = solutions.as_array().unwrap();
    assert!(!solutions.is_empty());
    assert_eq!(solutions[0]["id"], "solution-0");
    assert_eq!(solutions[0]["assignments"]["top"], "wide-green.png");

    for solution in solutions {
        let assignments = solution["assignments"].as_object().unwrap();
        assert_eq!(assignments.len(), 3);
        assert!(!assignments.contains_key("pinned"));
        let mut photos: Vec<&str> = assignments.values().map(|v| v.as_str().unwrap()).collect();
        photos.sort_unstable();
        photos.dedup();
        assert_eq!(photos.len(), 3);
    }
}

#[test]
fn test_fill_empty_directory_shows_empty_state() {
    let photos = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    let wall = cache.path().join("wall.json");
    fs::write(&wall, r#"{"frames":[{"id":"only","width":5,"height":7}]}"#).unwrap();

    smartfill(cache.path())
        .args(["fill", photos.path().to_str().unwrap(), "--wall", wall.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("No photos could be placed"));
}
