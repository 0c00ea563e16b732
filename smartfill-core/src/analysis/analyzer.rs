use std::time::Instant;

use image::{imageops::FilterType, DynamicImage, GenericImageView, RgbImage};
use tracing::{debug, instrument};

use super::color::extract_color_profile;
use super::composition::extract_composition_profile;
use crate::config::SmartFillConfig;
use crate::error::{Result, SmartFillError};
use crate::face::ModelHandle;
use crate::library::ImageRef;
use crate::model::PhotoAnalysis;

/// One photo to analyze.
#[derive(Debug, Clone)]
pub struct AnalysisInput {
    pub photo_id: String,
    pub image: ImageRef,
    /// Declared dimensions; orientation is derived from these, not the bitmap.
    pub width: u32,
    pub height: u32,
    pub detect_faces: bool,
}

/// Decode, downscale and extract features for one photo at a time.
#[derive(Debug, Clone)]
pub struct PhotoAnalyzer {
    analysis_size: u32,
    edge_band: u32,
    sample_step: u32,
    face_model: ModelHandle,
}

impl PhotoAnalyzer {
    pub fn new(config: &SmartFillConfig, face_model: ModelHandle) -> Self {
        Self {
            analysis_size: config.analysis_size,
            edge_band: config.edge_band,
            sample_step: config.sample_step,
            face_model,
        }
    }

    pub fn face_model(&self) -> &ModelHandle {
        &self.face_model
    }

    /// Analyze one photo. The image reference is consumed and released as
    /// soon as it has been decoded.
    #[instrument(level = "debug", skip(self, input), fields(photo_id = %input.photo_id))]
    pub fn analyze(&self, input: AnalysisInput) -> Result<PhotoAnalysis> {
        let start = Instant::now();
        let AnalysisInput {
            photo_id,
            image,
            width,
            height,
            detect_faces,
        } = input;

        let decoded = decode(&photo_id, image)?;
        let pixels = self.downscale(decoded);

        let color_profile = extract_color_profile(&pixels, self.sample_step);
        let composition_profile =
            extract_composition_profile(width, height, &pixels, self.edge_band);
        let face_detection = detect_faces.then(|| self.face_model.detect(&pixels));

        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            faces = face_detection.as_ref().map(|f| f.face_count),
            "Photo analyzed"
        );

        Ok(PhotoAnalysis::new(
            photo_id,
            color_profile,
            composition_profile,
            face_detection,
        ))
    }

    /// Shrink so the longest edge is at most `analysis_size`. Never upscales.
    fn downscale(&self, image: DynamicImage) -> RgbImage {
        let (w, h) = image.dimensions();
        if w.max(h) <= self.analysis_size {
            return image.into_rgb8();
        }
        let resized = image.resize(self.analysis_size, self.analysis_size, FilterType::Triangle);
        drop(image);
        resized.into_rgb8()
    }
}

fn decode(photo_id: &str, image: ImageRef) -> Result<DynamicImage> {
    let decoded = match &image {
        ImageRef::Path(path) => image::open(path),
        ImageRef::Bytes(bytes) => image::load_from_memory(bytes),
    };
    drop(image);

    decoded.map_err(|e| SmartFillError::DecodeFailure {
        photo_id: photo_id.to_string(),
        reason: e.to_string(),
    })
}
