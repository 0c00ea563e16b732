//! SmartFill Core - photo-to-frame matching for gallery walls
//!
//! This crate scores how well a photo fits a picture frame and assigns whole
//! photo libraries to walls of frames.
//!
//! # Features
//!
//! - Background photo analysis (colour, composition, optional faces) on a
//!   dedicated worker thread
//! - Versioned analysis cache, in memory or on disk
//! - Deterministic 0-100 match scoring with per-component breakdown
//! - Randomized greedy wall optimizer with a reproducible baseline solution
//! - Lazily-loaded face model shared per process
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use smartfill_core::{DirectoryLibrary, Frame, ScoringOptions, SmartFillConfig, SmartFillCoordinator};
//!
//! # async fn example() -> smartfill_core::Result<()> {
//! let frames = vec![Frame::new("left", 5.0, 7.0), Frame::new("right", 7.0, 5.0)];
//! let library = Arc::new(DirectoryLibrary::scan("photos")?.with_frames(frames));
//!
//! let coordinator = SmartFillCoordinator::for_library(library.clone())
//!     .with_config(SmartFillConfig::from_env()?)
//!     .build()
//!     .await?;
//!
//! // Analysis runs in the background; wait so every photo is scored.
//! coordinator.analyze_library(&library.photo_id_list(), false).await?;
//! coordinator.wait_idle().await;
//!
//! for solution in coordinator.generate_gallery_solutions(3, ScoringOptions::default()).await? {
//!     println!("{}: {} points", solution.id, solution.total_score);
//! }
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod cache;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod face;
pub mod library;
pub mod model;
pub mod optimizer;
pub mod scoring;
pub mod tracker;
pub mod worker;

// Re-export main types for convenience
pub use analysis::PhotoAnalyzer;
pub use cache::{open_cache, AnalysisCache, FileAnalysisCache, MemoryAnalysisCache};
pub use config::SmartFillConfig;
pub use coordinator::{CoordinatorBuilder, SmartFillCoordinator};
pub use error::{Result, SmartFillError, ANALYSIS_VERSION};
pub use face::{FaceModel, ModelHandle, SkinDetectorParams, SkinToneDetector};
pub use library::{DirectoryLibrary, ImageRef, ImageStore, MemoryLibrary, ProjectState, QualityTier};
pub use model::{
    ColorHarmony, ColorProfile, CompositionProfile, FaceBox, FaceDetection, Frame, ImageMetadata,
    MatchScore, OptimizationSolution, Orientation, PhotoAnalysis, ScoreBreakdown, ScoringOptions,
};
pub use optimizer::{GalleryOptimizer, ScoreMatrix};
pub use scoring::{score_match, MAX_TOTAL_SCORE};
pub use tracker::AnalysisProgress;
