//! Built-in on-device face detector.
//!
//! Classifies skin-tone pixels in YCbCr space, groups them into connected
//! regions and keeps regions whose size, shape and fill look like a face.
//! Parameters can be tuned through a JSON file; nothing leaves the device.

use std::path::Path;

use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::FaceModel;
use crate::error::{Result, SmartFillError};
use crate::model::FaceBox;

/// Detector tuning parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SkinDetectorParams {
    pub cb_range: (u8, u8),
    pub cr_range: (u8, u8),
    /// Minimum luma; very dark pixels have unreliable chroma.
    pub min_luma: u8,
    /// Region area bounds as a fraction of the bitmap area.
    pub min_area_fraction: f64,
    pub max_area_fraction: f64,
    /// Bounding box width/height bounds.
    pub min_box_aspect: f64,
    pub max_box_aspect: f64,
    /// Minimum share of the bounding box covered by skin pixels.
    pub min_fill: f64,
    pub max_faces: usize,
}

impl Default for SkinDetectorParams {
    fn default() -> Self {
        Self {
            cb_range: (77, 127),
            cr_range: (133, 173),
            min_luma: 40,
            min_area_fraction: 0.004,
            max_area_fraction: 0.35,
            min_box_aspect: 0.5,
            max_box_aspect: 1.5,
            min_fill: 0.45,
            max_faces: 32,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SkinToneDetector {
    params: SkinDetectorParams,
}

impl SkinToneDetector {
    pub fn new(params: SkinDetectorParams) -> Self {
        Self { params }
    }

    /// Load the detector, reading parameters from `path` when given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            debug!("Using default skin detector parameters");
            return Ok(Self::default());
        };

        let raw = std::fs::read(path).map_err(|e| {
            SmartFillError::ModelLoadFailure(format!("{}: {e}", path.display()))
        })?;
        let params: SkinDetectorParams = serde_json::from_slice(&raw).map_err(|e| {
            SmartFillError::ModelLoadFailure(format!("{}: invalid parameters: {e}", path.display()))
        })?;

        info!(path = %path.display(), "Loaded face detector parameters");
        Ok(Self { params })
    }

    pub fn params(&self) -> &SkinDetectorParams {
        &self.params
    }

    fn is_skin(&self, r: u8, g: u8, b: u8) -> bool {
        let (r, g, b) = (r as f64, g as f64, b as f64);
        let y = 0.299 * r + 0.587 * g + 0.114 * b;
        let cb = 128.0 - 0.168_736 * r - 0.331_264 * g + 0.5 * b;
        let cr = 128.0 + 0.5 * r - 0.418_688 * g - 0.081_312 * b;

        let p = &self.params;
        y >= p.min_luma as f64
            && cb >= p.cb_range.0 as f64
            && cb <= p.cb_range.1 as f64
            && cr >= p.cr_range.0 as f64
            && cr <= p.cr_range.1 as f64
    }
}

impl FaceModel for SkinToneDetector {
    fn detect(&self, pixels: &RgbImage) -> Vec<FaceBox> {
        let (width, height) = pixels.dimensions();
        let total = width as usize * height as usize;
        if total == 0 {
            return Vec::new();
        }

        let mask: Vec<bool> = pixels
            .pixels()
            .map(|p| self.is_skin(p.0[0], p.0[1], p.0[2]))
            .collect();

        let mut visited = vec![false; total];
        let mut faces: Vec<(usize, FaceBox)> = Vec::new();
        let mut stack = Vec::new();

        for start in 0..total {
            if !mask[start] || visited[start] {
                continue;
            }

            visited[start] = true;
            stack.push(start);
            let (mut min_x, mut min_y, mut max_x, mut max_y) = (u32::MAX, u32::MAX, 0u32, 0u32);
            let mut area = 0usize;

            while let Some(idx) = stack.pop() {
                let x = (idx % width as usize) as u32;
                let y = (idx / width as usize) as u32;
                area += 1;
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);

                let mut visit = |nx: u32, ny: u32| {
                    let n = ny as usize * width as usize + nx as usize;
                    if mask[n] && !visited[n] {
                        visited[n] = true;
                        stack.push(n);
                    }
                };
                if x > 0 {
                    visit(x - 1, y);
                }
                if x + 1 < width {
                    visit(x + 1, y);
                }
                if y > 0 {
                    visit(x, y - 1);
                }
                if y + 1 < height {
                    visit(x, y + 1);
                }
            }

            let face = FaceBox {
                x: min_x,
                y: min_y,
                width: max_x - min_x + 1,
                height: max_y - min_y + 1,
            };
            if self.accepts(&face, area, total) {
                faces.push((area, face));
            }
        }

        faces.sort_by(|a, b| b.0.cmp(&a.0));
        faces
            .into_iter()
            .take(self.params.max_faces)
            .map(|(_, face)| face)
            .collect()
    }
}

impl SkinToneDetector {
    fn accepts(&self, face: &FaceBox, area: usize, total: usize) -> bool {
        let p = &self.params;
        let area_fraction = area as f64 / total as f64;
        let aspect = face.width as f64 / face.height as f64;
        let fill = area as f64 / (face.width as f64 * face.height as f64);

        area_fraction >= p.min_area_fraction
            && area_fraction <= p.max_area_fraction
            && aspect >= p.min_box_aspect
            && aspect <= p.max_box_aspect
            && fill >= p.min_fill
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    const SKIN: Rgb<u8> = Rgb([224, 172, 140]);
    const BACKDROP: Rgb<u8> = Rgb([30, 60, 160]);

    fn paint(img: &mut RgbImage, x0: u32, y0: u32, w: u32, h: u32) {
        for x in x0..x0 + w {
            for y in y0..y0 + h {
                img.put_pixel(x, y, SKIN);
            }
        }
    }

    #[test]
    fn test_skin_tone_classification() {
        let detector = SkinToneDetector::default();
        assert!(detector.is_skin(224, 172, 140));
        assert!(!detector.is_skin(30, 60, 160));
        assert!(!detector.is_skin(5, 3, 2));
    }

    #[test]
    fn test_detects_single_face_region() {
        let mut img = RgbImage::from_pixel(200, 300, BACKDROP);
        paint(&mut img, 70, 60, 60, 75);

        let faces = SkinToneDetector::default().detect(&img);
        assert_eq!(faces.len(), 1);
        assert_eq!(
            faces[0],
            FaceBox {
                x: 70,
                y: 60,
                width: 60,
                height: 75
            }
        );
    }

    #[test]
    fn test_detects_group_and_orders_by_size() {
        let mut img = RgbImage::from_pixel(300, 200, BACKDROP);
        paint(&mut img, 10, 50, 30, 36);
        paint(&mut img, 110, 50, 40, 48);
        paint(&mut img, 220, 50, 34, 40);

        let faces = SkinToneDetector::default().detect(&img);
        assert_eq!(faces.len(), 3);
        assert_eq!(faces[0].x, 110);
    }

    #[test]
    fn test_rejects_strips_and_specks() {
        let mut img = RgbImage::from_pixel(200, 200, BACKDROP);
        // Too elongated.
        paint(&mut img, 0, 0, 200, 12);
        // Too small.
        paint(&mut img, 100, 100, 3, 3);

        assert!(SkinToneDetector::default().detect(&img).is_empty());
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = SkinToneDetector::load(Some(Path::new("/nonexistent/face-params.json")));
        assert!(matches!(result, Err(SmartFillError::ModelLoadFailure(_))));
    }

    #[test]
    fn test_load_partial_params_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        std::fs::write(&path, r#"{ "maxFaces": 2 }"#).unwrap();

        let detector = SkinToneDetector::load(Some(&path)).unwrap();
        assert_eq!(detector.params().max_faces, 2);
        assert_eq!(detector.params().min_luma, 40);
    }
}
