//! Color profile extraction.
//!
//! Colors are bucketed on a 32-step grid per channel over a subsampled pixel
//! set; the five most frequent buckets become the dominant colors. Saturation
//! and brightness use the max/min channel HSV approximation.

use std::collections::HashMap;

use image::RgbImage;

use crate::model::{ColorHarmony, ColorProfile};

/// Per-channel quantization step.
const BUCKET_STEP: u8 = 32;

/// Number of dominant colors kept.
const MAX_DOMINANT_COLORS: usize = 5;

/// Below this average saturation a photo counts as greyscale.
pub const GREYSCALE_SATURATION: f64 = 10.0;

/// Build the color profile of a downsampled bitmap, sampling every
/// `step`-th pixel along both axes.
pub fn extract_color_profile(pixels: &RgbImage, step: u32) -> ColorProfile {
    let step = step.max(1) as usize;
    let (width, height) = pixels.dimensions();

    let mut histogram: HashMap<[u8; 3], usize> = HashMap::new();
    let mut saturation_sum = 0.0;
    let mut brightness_sum = 0.0;
    let mut samples = 0usize;

    for y in (0..height).step_by(step) {
        for x in (0..width).step_by(step) {
            let [r, g, b] = pixels.get_pixel(x, y).0;

            *histogram.entry(quantize([r, g, b])).or_insert(0) += 1;

            let (saturation, brightness) = saturation_brightness(r, g, b);
            saturation_sum += saturation;
            brightness_sum += brightness;
            samples += 1;
        }
    }

    let (saturation, brightness) = if samples == 0 {
        (0.0, 0.0)
    } else {
        (
            saturation_sum / samples as f64,
            brightness_sum / samples as f64,
        )
    };

    ColorProfile {
        dominant_colors: dominant_colors(histogram),
        saturation,
        brightness,
        is_greyscale: saturation < GREYSCALE_SATURATION,
        harmony: classify_harmony(saturation, brightness),
    }
}

/// Snap each channel down to its bucket's lower bound.
fn quantize(rgb: [u8; 3]) -> [u8; 3] {
    rgb.map(|c| (c / BUCKET_STEP) * BUCKET_STEP)
}

/// HSV-style saturation and value, both scaled to 0-100.
fn saturation_brightness(r: u8, g: u8, b: u8) -> (f64, f64) {
    let max = r.max(g).max(b) as f64;
    let min = r.min(g).min(b) as f64;

    let saturation = if max == 0.0 {
        0.0
    } else {
        (max - min) / max * 100.0
    };
    (saturation, max / 255.0 * 100.0)
}

fn dominant_colors(histogram: HashMap<[u8; 3], usize>) -> Vec<String> {
    let mut buckets: Vec<([u8; 3], usize)> = histogram.into_iter().collect();
    // Ties break on the bucket value so output is stable across runs.
    buckets.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    buckets
        .into_iter()
        .take(MAX_DOMINANT_COLORS)
        .map(|(rgb, _)| format!("#{}", hex::encode(rgb)))
        .collect()
}

pub fn classify_harmony(saturation: f64, brightness: f64) -> ColorHarmony {
    if saturation > 60.0 {
        ColorHarmony::Vibrant
    } else if saturation < 20.0 {
        ColorHarmony::Muted
    } else if brightness > 70.0 {
        ColorHarmony::Warm
    } else if brightness < 30.0 {
        ColorHarmony::Cool
    } else {
        ColorHarmony::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb(rgb))
    }

    #[test]
    fn test_grey_image_is_greyscale_and_muted() {
        let profile = extract_color_profile(&solid(40, 40, [128, 128, 128]), 4);
        assert!(profile.is_greyscale);
        assert_eq!(profile.saturation, 0.0);
        assert_eq!(profile.harmony, ColorHarmony::Muted);
        assert_eq!(profile.dominant_colors, vec!["#808080".to_string()]);
    }

    #[test]
    fn test_pure_red_is_vibrant() {
        let profile = extract_color_profile(&solid(20, 20, [255, 0, 0]), 2);
        assert!(!profile.is_greyscale);
        assert_eq!(profile.saturation, 100.0);
        assert_eq!(profile.brightness, 100.0);
        assert_eq!(profile.harmony, ColorHarmony::Vibrant);
        assert_eq!(profile.primary_color(), Some("#e00000"));
    }

    #[test]
    fn test_dominant_colors_frequency_order_and_limit() {
        let mut img = RgbImage::new(10, 10);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            // Six distinct buckets with decreasing frequency by column band.
            let band = match x {
                0..=3 => 0u8,
                4..=5 => 1,
                6 => 2,
                7 => 3,
                8 => 4,
                _ => if y < 5 { 5 } else { 4 },
            };
            *pixel = Rgb([band * 40, 0, 0]);
        }

        let profile = extract_color_profile(&img, 1);
        assert_eq!(profile.dominant_colors.len(), 5);
        assert_eq!(profile.dominant_colors[0], "#000000");
        assert_eq!(profile.dominant_colors[1], "#200000");
    }

    #[test]
    fn test_harmony_thresholds() {
        assert_eq!(classify_harmony(61.0, 50.0), ColorHarmony::Vibrant);
        assert_eq!(classify_harmony(19.0, 50.0), ColorHarmony::Muted);
        assert_eq!(classify_harmony(40.0, 71.0), ColorHarmony::Warm);
        assert_eq!(classify_harmony(40.0, 29.0), ColorHarmony::Cool);
        assert_eq!(classify_harmony(40.0, 50.0), ColorHarmony::Neutral);
    }

    #[test]
    fn test_empty_bitmap() {
        let profile = extract_color_profile(&RgbImage::new(0, 0), 4);
        assert!(profile.dominant_colors.is_empty());
        assert!(profile.is_greyscale);
    }
}
