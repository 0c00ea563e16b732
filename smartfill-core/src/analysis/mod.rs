//! Per-photo feature extraction.
//!
//! A photo is decoded, downscaled so its longest edge fits the analysis size,
//! and reduced to a color profile, a composition profile and, on request, a
//! face detection summary.

pub mod analyzer;
pub mod color;
pub mod composition;

pub use analyzer::{AnalysisInput, PhotoAnalyzer};
pub use color::{classify_harmony, extract_color_profile};
pub use composition::{edge_complexity, extract_composition_profile};
