//! Data model shared by the analyzer, scorer, optimizer and coordinator.
//!
//! Field names serialize in camelCase so cached records and JSON output keep
//! the names used by the gallery planner front end.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::ANALYSIS_VERSION;

/// Declared dimensions of a library photo, owned by the external image store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    pub aspect_ratio: f64,
    pub name: String,
}

impl ImageMetadata {
    /// Build metadata from pixel dimensions. A zero height yields a zero ratio.
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        let aspect_ratio = if height == 0 {
            0.0
        } else {
            width as f64 / height as f64
        };
        Self {
            width,
            height,
            aspect_ratio,
            name: name.into(),
        }
    }

    /// Pixel count in millions.
    pub fn megapixels(&self) -> f64 {
        (self.width as f64 * self.height as f64) / 1_000_000.0
    }
}

/// Coarse color mood of a photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorHarmony {
    Vibrant,
    Muted,
    Warm,
    Cool,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorProfile {
    /// Up to five `#rrggbb` colors, most frequent first.
    pub dominant_colors: Vec<String>,
    /// Average saturation, 0-100.
    pub saturation: f64,
    /// Average brightness, 0-100.
    pub brightness: f64,
    pub is_greyscale: bool,
    pub harmony: ColorHarmony,
}

impl ColorProfile {
    /// The most frequent color, if any pixels were sampled.
    pub fn primary_color(&self) -> Option<&str> {
        self.dominant_colors.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Landscape,
    Portrait,
    Square,
}

impl Orientation {
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        match width.cmp(&height) {
            std::cmp::Ordering::Greater => Self::Landscape,
            std::cmp::Ordering::Less => Self::Portrait,
            std::cmp::Ordering::Equal => Self::Square,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionProfile {
    pub orientation: Orientation,
    /// Brightness variance in the border band, scaled to 0-100.
    pub edge_complexity: f64,
}

/// Face bounding box in analysis-resolution pixel space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceDetection {
    pub has_faces: bool,
    pub face_count: usize,
    pub faces: Vec<FaceBox>,
    pub is_portrait: bool,
    pub is_group: bool,
}

impl FaceDetection {
    /// Derive the summary flags from a list of detected boxes.
    pub fn from_faces(faces: Vec<FaceBox>) -> Self {
        let face_count = faces.len();
        Self {
            has_faces: face_count > 0,
            face_count,
            faces,
            is_portrait: face_count == 1,
            is_group: face_count > 2,
        }
    }

    pub fn none() -> Self {
        Self::from_faces(Vec::new())
    }
}

/// Cached, derived features of one photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoAnalysis {
    pub id: String,
    /// Unix timestamp (milliseconds) of when the analysis ran.
    pub timestamp: u64,
    /// Records written before versioning deserialize as 0 and count as stale.
    #[serde(default)]
    pub version: u32,
    pub color_profile: ColorProfile,
    pub composition_profile: CompositionProfile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_detection: Option<FaceDetection>,
}

impl PhotoAnalysis {
    pub fn new(
        id: impl Into<String>,
        color_profile: ColorProfile,
        composition_profile: CompositionProfile,
        face_detection: Option<FaceDetection>,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp: Utc::now().timestamp_millis() as u64,
            version: ANALYSIS_VERSION,
            color_profile,
            composition_profile,
            face_detection,
        }
    }

    /// Whether this record can serve a request of the given depth.
    ///
    /// A record without face data is insufficient when faces are required,
    /// and a record from another schema version is never sufficient.
    pub fn satisfies(&self, detect_faces: bool) -> bool {
        self.version == ANALYSIS_VERSION && (!detect_faces || self.face_detection.is_some())
    }
}

/// A picture frame placed on the wall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub id: String,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub locked: bool,
}

impl Frame {
    pub fn new(id: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            id: id.into(),
            width,
            height,
            locked: false,
        }
    }

    pub fn locked(mut self) -> Self {
        self.locked = true;
        self
    }

    /// Width over height, or `None` for degenerate dimensions.
    pub fn aspect_ratio(&self) -> Option<f64> {
        if self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
        {
            Some(self.width / self.height)
        } else {
            None
        }
    }
}

/// Per-component points. Maxima: 25, 25, 20, 15, 15.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub aspect_ratio: u32,
    pub resolution: u32,
    pub composition: u32,
    pub color_harmony: u32,
    pub face_handling: u32,
}

impl ScoreBreakdown {
    pub fn sum(&self) -> u32 {
        self.aspect_ratio + self.resolution + self.composition + self.color_harmony + self.face_handling
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchScore {
    pub photo_id: String,
    pub frame_id: String,
    /// 0-100.
    pub total_score: u32,
    pub breakdown: ScoreBreakdown,
    pub warnings: Vec<String>,
}

/// Caller preferences passed through verbatim from the UI toggles.
///
/// Setting both color preferences is allowed; the scorer applies the
/// black-and-white rule first and does not arbitrate between them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoringOptions {
    pub target_faces: bool,
    pub prefer_black_and_white: bool,
    pub prefer_vibrant: bool,
}

/// One whole-wall proposal. No photo id appears twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationSolution {
    pub id: String,
    /// frame id -> photo id
    pub assignments: BTreeMap<String, String>,
    pub total_score: u32,
    pub used_photo_ids: BTreeSet<String>,
}
