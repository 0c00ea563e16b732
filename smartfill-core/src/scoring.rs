//! Photo-to-frame match scoring.
//!
//! [`score_match`] is a pure function: no I/O, no randomness, and identical
//! inputs always give identical output. The optimizer caches its results in
//! a precomputed matrix and relies on that.
//!
//! | Component     | Max |
//! |---------------|-----|
//! | aspect ratio  | 25  |
//! | resolution    | 25  |
//! | composition   | 20  |
//! | color harmony | 15  |
//! | face handling | 15  |

use crate::model::{Frame, ImageMetadata, MatchScore, PhotoAnalysis, ScoreBreakdown, ScoringOptions};

pub const MAX_TOTAL_SCORE: u32 = 100;

/// Frames within this distance of 1:1 count as square.
const SQUARE_TOLERANCE: f64 = 0.1;

pub const WARN_LOW_RESOLUTION: &str = "Low resolution: photo may look pixelated at this size";
pub const WARN_HEAVY_CROP: &str = "Aspect ratio mismatch: photo will be heavily cropped";
pub const WARN_NO_FACE_DATA: &str = "Face analysis not available yet for this photo";
pub const WARN_NO_FACES: &str = "No faces detected in this photo";

/// Score how well one photo fits one frame. Never fails: degenerate
/// dimensions simply earn no points for the affected components.
pub fn score_match(
    photo_id: &str,
    metadata: &ImageMetadata,
    analysis: &PhotoAnalysis,
    frame: &Frame,
    options: &ScoringOptions,
) -> MatchScore {
    let photo_ratio = photo_ratio(metadata);
    let frame_ratio = frame.aspect_ratio();

    let breakdown = ScoreBreakdown {
        aspect_ratio: aspect_ratio_score(photo_ratio, frame_ratio),
        resolution: resolution_score(metadata.megapixels()),
        composition: composition_score(photo_ratio, frame_ratio),
        color_harmony: color_harmony_score(analysis, options),
        face_handling: face_handling_score(analysis, frame_ratio, options),
    };

    let mut warnings = Vec::new();
    if breakdown.resolution <= 5 {
        warnings.push(WARN_LOW_RESOLUTION.to_string());
    }
    if breakdown.aspect_ratio <= 5 {
        warnings.push(WARN_HEAVY_CROP.to_string());
    }
    if options.target_faces {
        match &analysis.face_detection {
            None => warnings.push(WARN_NO_FACE_DATA.to_string()),
            Some(faces) if !faces.has_faces => warnings.push(WARN_NO_FACES.to_string()),
            Some(_) => {}
        }
    }

    MatchScore {
        photo_id: photo_id.to_string(),
        frame_id: frame.id.clone(),
        total_score: breakdown.sum().min(MAX_TOTAL_SCORE),
        breakdown,
        warnings,
    }
}

fn photo_ratio(metadata: &ImageMetadata) -> Option<f64> {
    if metadata.width == 0 || metadata.height == 0 {
        return None;
    }
    Some(metadata.width as f64 / metadata.height as f64)
}

fn is_landscape(ratio: f64) -> bool {
    ratio >= 1.0
}

/// Ratio difference measured along the frame's orientation: portrait frames
/// compare height/width so rotating both photo and frame scores the same.
pub(crate) fn aspect_ratio_score(photo_ratio: Option<f64>, frame_ratio: Option<f64>) -> u32 {
    let (Some(photo), Some(frame)) = (photo_ratio, frame_ratio) else {
        return 0;
    };
    let delta = if is_landscape(frame) {
        (photo - frame).abs()
    } else {
        (1.0 / photo - 1.0 / frame).abs()
    };

    match delta {
        d if d < 0.05 => 25,
        d if d < 0.15 => 20,
        d if d < 0.3 => 15,
        d if d < 0.5 => 5,
        _ => 0,
    }
}

pub(crate) fn resolution_score(megapixels: f64) -> u32 {
    match megapixels {
        mp if mp > 12.0 => 25,
        mp if mp > 8.0 => 20,
        mp if mp > 4.0 => 15,
        mp if mp > 2.0 => 5,
        _ => 0,
    }
}

pub(crate) fn composition_score(photo_ratio: Option<f64>, frame_ratio: Option<f64>) -> u32 {
    let (Some(photo), Some(frame)) = (photo_ratio, frame_ratio) else {
        return 0;
    };
    if is_landscape(photo) == is_landscape(frame) {
        20
    } else if (frame - 1.0).abs() < SQUARE_TOLERANCE {
        15
    } else {
        5
    }
}

/// Black-and-white preference is checked before the vibrant one; with both
/// set the vibrant rule is never consulted.
pub(crate) fn color_harmony_score(analysis: &PhotoAnalysis, options: &ScoringOptions) -> u32 {
    let color = &analysis.color_profile;

    if options.prefer_black_and_white {
        if color.is_greyscale {
            15
        } else if color.saturation < 20.0 {
            5
        } else {
            0
        }
    } else if options.prefer_vibrant {
        if !color.is_greyscale && color.saturation > 40.0 {
            15
        } else if !color.is_greyscale && color.saturation > 20.0 {
            5
        } else {
            0
        }
    } else {
        let mut score = 0;
        if !color.is_greyscale {
            score += 10;
        }
        if color.brightness > 20.0 {
            score += 5;
        }
        score
    }
}

pub(crate) fn face_handling_score(
    analysis: &PhotoAnalysis,
    frame_ratio: Option<f64>,
    options: &ScoringOptions,
) -> u32 {
    if !options.target_faces {
        return 5;
    }
    let Some(faces) = &analysis.face_detection else {
        return 0;
    };
    if !faces.has_faces {
        return 0;
    }

    let bonus = match frame_ratio {
        Some(ratio) if !is_landscape(ratio) => faces.is_portrait,
        Some(_) => faces.is_group,
        None => false,
    };
    if bonus {
        15
    } else {
        10
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        ColorHarmony, ColorProfile, CompositionProfile, FaceBox, FaceDetection, Orientation,
    };

    fn analysis(saturation: f64, brightness: f64, faces: Option<usize>) -> PhotoAnalysis {
        PhotoAnalysis::new(
            "p",
            ColorProfile {
                dominant_colors: vec![],
                saturation,
                brightness,
                is_greyscale: saturation < 10.0,
                harmony: ColorHarmony::Neutral,
            },
            CompositionProfile {
                orientation: Orientation::Portrait,
                edge_complexity: 0.0,
            },
            faces.map(|n| {
                FaceDetection::from_faces(
                    (0..n)
                        .map(|i| FaceBox {
                            x: i as u32 * 20,
                            y: 0,
                            width: 10,
                            height: 10,
                        })
                        .collect(),
                )
            }),
        )
    }

    #[test]
    fn test_aspect_ratio_thresholds() {
        assert_eq!(aspect_ratio_score(Some(1.5), Some(1.5)), 25);
        assert_eq!(aspect_ratio_score(Some(1.6), Some(1.5)), 20);
        assert_eq!(aspect_ratio_score(Some(1.7), Some(1.5)), 15);
        assert_eq!(aspect_ratio_score(Some(1.9), Some(1.5)), 5);
        assert_eq!(aspect_ratio_score(Some(2.5), Some(1.5)), 0);
        assert_eq!(aspect_ratio_score(None, Some(1.5)), 0);
    }

    #[test]
    fn test_aspect_ratio_uses_frame_orientation() {
        // 4x6 portrait frame against a 3:4 portrait photo: 1.5 vs 1.333.
        assert_eq!(aspect_ratio_score(Some(0.75), Some(4.0 / 6.0)), 15);
        // Rotated pair scores the same.
        assert_eq!(aspect_ratio_score(Some(4.0 / 3.0), Some(1.5)), 15);
        // 5x7 portrait frame: 1.4 vs 1.333, then 1.4 vs 1.429.
        assert_eq!(aspect_ratio_score(Some(0.75), Some(5.0 / 7.0)), 20);
        assert_eq!(aspect_ratio_score(Some(0.7), Some(5.0 / 7.0)), 25);
    }

    #[test]
    fn test_resolution_thresholds() {
        assert_eq!(resolution_score(24.0), 25);
        assert_eq!(resolution_score(12.0), 20);
        assert_eq!(resolution_score(8.5), 20);
        assert_eq!(resolution_score(6.0), 15);
        assert_eq!(resolution_score(2.16), 5);
        assert_eq!(resolution_score(2.0), 0);
        assert_eq!(resolution_score(0.0), 0);
    }

    #[test]
    fn test_composition_rules() {
        assert_eq!(composition_score(Some(0.66), Some(0.8)), 20);
        assert_eq!(composition_score(Some(1.5), Some(1.2)), 20);
        assert_eq!(composition_score(Some(1.5), Some(0.95)), 15);
        assert_eq!(composition_score(Some(1.5), Some(0.5)), 5);
        assert_eq!(composition_score(Some(1.5), None), 0);
    }

    #[test]
    fn test_color_harmony_default_is_additive() {
        let options = ScoringOptions::default();
        assert_eq!(color_harmony_score(&analysis(50.0, 60.0, None), &options), 15);
        assert_eq!(color_harmony_score(&analysis(50.0, 10.0, None), &options), 10);
        assert_eq!(color_harmony_score(&analysis(5.0, 60.0, None), &options), 5);
        assert_eq!(color_harmony_score(&analysis(5.0, 10.0, None), &options), 0);
    }

    #[test]
    fn test_color_harmony_preferences() {
        let bw = ScoringOptions {
            prefer_black_and_white: true,
            ..Default::default()
        };
        assert_eq!(color_harmony_score(&analysis(5.0, 50.0, None), &bw), 15);
        assert_eq!(color_harmony_score(&analysis(15.0, 50.0, None), &bw), 5);
        assert_eq!(color_harmony_score(&analysis(45.0, 50.0, None), &bw), 0);

        let vibrant = ScoringOptions {
            prefer_vibrant: true,
            ..Default::default()
        };
        assert_eq!(color_harmony_score(&analysis(45.0, 50.0, None), &vibrant), 15);
        assert_eq!(color_harmony_score(&analysis(25.0, 50.0, None), &vibrant), 5);
        assert_eq!(color_harmony_score(&analysis(5.0, 50.0, None), &vibrant), 0);
    }

    #[test]
    fn test_face_handling() {
        let off = ScoringOptions::default();
        let on = ScoringOptions {
            target_faces: true,
            ..Default::default()
        };
        let portrait_frame = Some(0.8);
        let landscape_frame = Some(1.5);

        assert_eq!(face_handling_score(&analysis(0.0, 0.0, None), portrait_frame, &off), 5);
        assert_eq!(face_handling_score(&analysis(0.0, 0.0, None), portrait_frame, &on), 0);
        assert_eq!(face_handling_score(&analysis(0.0, 0.0, Some(0)), portrait_frame, &on), 0);
        assert_eq!(face_handling_score(&analysis(0.0, 0.0, Some(1)), portrait_frame, &on), 15);
        assert_eq!(face_handling_score(&analysis(0.0, 0.0, Some(1)), landscape_frame, &on), 10);
        assert_eq!(face_handling_score(&analysis(0.0, 0.0, Some(3)), landscape_frame, &on), 15);
        assert_eq!(face_handling_score(&analysis(0.0, 0.0, Some(2)), landscape_frame, &on), 10);
    }

    #[test]
    fn test_warnings() {
        let meta = ImageMetadata::new("small.jpg", 640, 480);
        let frame = Frame::new("f", 4.0, 6.0);
        let options = ScoringOptions {
            target_faces: true,
            ..Default::default()
        };

        let score = score_match("p", &meta, &analysis(30.0, 50.0, None), &frame, &options);
        assert!(score.warnings.contains(&WARN_LOW_RESOLUTION.to_string()));
        assert!(score.warnings.contains(&WARN_HEAVY_CROP.to_string()));
        assert!(score.warnings.contains(&WARN_NO_FACE_DATA.to_string()));
    }

    #[test]
    fn test_zero_dimensions_never_panic() {
        let meta = ImageMetadata::new("empty", 0, 0);
        let frame = Frame::new("f", 0.0, 0.0);
        let score = score_match(
            "p",
            &meta,
            &analysis(0.0, 0.0, None),
            &frame,
            &ScoringOptions::default(),
        );
        assert_eq!(score.breakdown.aspect_ratio, 0);
        assert_eq!(score.breakdown.composition, 0);
        assert_eq!(score.breakdown.resolution, 0);
        assert!(score.total_score <= MAX_TOTAL_SCORE);
    }
}
