use image::RgbImage;

use crate::model::{CompositionProfile, Orientation};

/// Largest possible standard deviation of an 8-bit channel.
const MAX_STD_DEV: f64 = 127.5;

/// Orientation comes from the declared dimensions, edge complexity from the
/// downsampled bitmap.
pub fn extract_composition_profile(
    declared_width: u32,
    declared_height: u32,
    pixels: &RgbImage,
    band: u32,
) -> CompositionProfile {
    CompositionProfile {
        orientation: Orientation::from_dimensions(declared_width, declared_height),
        edge_complexity: edge_complexity(pixels, band),
    }
}

/// Brightness spread inside the border band, as a standard deviation scaled
/// to 0-100. Busy borders crop poorly behind a mat.
pub fn edge_complexity(pixels: &RgbImage, band: u32) -> f64 {
    let (width, height) = pixels.dimensions();
    if width == 0 || height == 0 || band == 0 {
        return 0.0;
    }

    let mut count = 0u64;
    let mut sum = 0.0;
    let mut sum_sq = 0.0;

    for (x, y, pixel) in pixels.enumerate_pixels() {
        let in_band = x < band
            || y < band
            || x >= width.saturating_sub(band)
            || y >= height.saturating_sub(band);
        if !in_band {
            continue;
        }
        let [r, g, b] = pixel.0;
        let luma = (r as f64 + g as f64 + b as f64) / 3.0;
        sum += luma;
        sum_sq += luma * luma;
        count += 1;
    }

    if count == 0 {
        return 0.0;
    }

    let mean = sum / count as f64;
    let variance = (sum_sq / count as f64 - mean * mean).max(0.0);
    (variance.sqrt() / MAX_STD_DEV * 100.0).min(100.0)
}
