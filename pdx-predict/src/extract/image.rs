//! Brain-scan preprocessing and proxy features
//!
//! Normalizes an arbitrary decoded image to the classifier input tensor
//! (RGB, 224x224, channels in [0,1]) and derives a small named set of
//! illustrative scan proxies for the fusion classifier. Grayscale and
//! alpha-channel inputs are converted to RGB first, so the extractor never
//! fails on channel-count mismatches.

use anyhow::{anyhow, Result};
use image::{DynamicImage, GenericImageView};
use ndarray::Array4;
use std::io::Cursor;

/// Square input resolution the image classifier expects.
pub const IMAGE_SIZE: u32 = 224;

/// Named scan proxy features, in fusion-input order.
pub const IMAGE_PROXY_NAMES: [&str; 10] = [
    "mean_intensity",
    "intensity_spread",
    "dark_area_ratio",
    "bright_area_ratio",
    "left_right_asymmetry",
    "top_bottom_asymmetry",
    "edge_density",
    "centroid_shift",
    "texture_energy",
    "intensity_entropy",
];

/// Proxies with no analyzer wired in default to this neutral value.
const NEUTRAL_PROXY: f32 = 0.5;

/// Preprocessed scan: classifier tensor plus named proxy features.
#[derive(Debug)]
pub struct ImageFeatures {
    /// `[1, 224, 224, 3]`, channel values in [0, 1].
    pub tensor: Array4<f32>,
    /// One value per [`IMAGE_PROXY_NAMES`] entry, all in [0, 1].
    pub proxies: Vec<f32>,
}

/// Preprocess a decoded scan into the classifier tensor and proxies.
pub fn extract_image_features(img: &DynamicImage) -> ImageFeatures {
    let rgb = img
        .resize_exact(IMAGE_SIZE, IMAGE_SIZE, image::imageops::FilterType::Triangle)
        .to_rgb8();

    let mut tensor = Array4::<f32>::zeros((1, IMAGE_SIZE as usize, IMAGE_SIZE as usize, 3));
    let mut gray = vec![0.0f32; (IMAGE_SIZE * IMAGE_SIZE) as usize];
    for (x, y, pixel) in rgb.enumerate_pixels() {
        let (xi, yi) = (x as usize, y as usize);
        let mut luma = 0.0f32;
        for c in 0..3 {
            let v = pixel.0[c] as f32 / 255.0;
            tensor[[0, yi, xi, c]] = v;
            luma += v;
        }
        gray[yi * IMAGE_SIZE as usize + xi] = luma / 3.0;
    }

    ImageFeatures {
        tensor,
        proxies: compute_proxies(&gray, IMAGE_SIZE as usize),
    }
}

/// Derive the named proxy values from the normalized grayscale plane.
fn compute_proxies(gray: &[f32], size: usize) -> Vec<f32> {
    let n = gray.len() as f32;
    let mean = gray.iter().sum::<f32>() / n;
    let variance = gray.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n;
    let spread = variance.sqrt();

    let dark = gray.iter().filter(|&&v| v < 0.3).count() as f32 / n;
    let bright = gray.iter().filter(|&&v| v > 0.7).count() as f32 / n;

    let half = size / 2;
    let mut left = 0.0f32;
    let mut top = 0.0f32;
    let mut cx = 0.0f32;
    let mut cy = 0.0f32;
    let mut mass = 0.0f32;
    for y in 0..size {
        for x in 0..size {
            let v = gray[y * size + x];
            if x < half {
                left += v;
            }
            if y < half {
                top += v;
            }
            cx += v * x as f32;
            cy += v * y as f32;
            mass += v;
        }
    }
    let total = mean * n;
    let lr_asym = if total > 0.0 {
        ((2.0 * left - total) / total).abs().min(1.0)
    } else {
        0.0
    };
    let tb_asym = if total > 0.0 {
        ((2.0 * top - total) / total).abs().min(1.0)
    } else {
        0.0
    };
    let centroid_shift = if mass > 0.0 {
        let dx = cx / mass - (size as f32 - 1.0) / 2.0;
        let dy = cy / mass - (size as f32 - 1.0) / 2.0;
        ((dx * dx + dy * dy).sqrt() / (size as f32 / 2.0)).min(1.0)
    } else {
        0.0
    };

    // Share of pixels whose horizontal/vertical gradient exceeds a fixed step.
    let mut edges = 0usize;
    for y in 1..size {
        for x in 1..size {
            let v = gray[y * size + x];
            let gx = (v - gray[y * size + x - 1]).abs();
            let gy = (v - gray[(y - 1) * size + x]).abs();
            if gx.max(gy) > 0.1 {
                edges += 1;
            }
        }
    }
    let edge_density = edges as f32 / ((size - 1) * (size - 1)) as f32;

    // 8-bin histogram entropy, normalized to [0, 1].
    let mut hist = [0usize; 8];
    for &v in gray {
        let bin = ((v * 8.0) as usize).min(7);
        hist[bin] += 1;
    }
    let entropy: f32 = hist
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f32 / n;
            -p * p.log2()
        })
        .sum();
    let entropy = (entropy / 3.0).min(1.0); // log2(8) = 3 bits maximum

    vec![
        mean,
        spread.min(1.0),
        dark,
        bright,
        lr_asym,
        tb_asym,
        edge_density,
        centroid_shift,
        NEUTRAL_PROXY, // texture_energy: no analyzer wired in
        entropy,
    ]
}

/// Render a pseudo-activation heatmap of the scan as PNG bytes.
///
/// Intensity-weighted red/yellow colormap over the normalized grayscale
/// plane; a stand-in for model-attribution maps that keeps the report
/// figure meaningful without access to classifier internals.
pub fn render_heatmap_png(img: &DynamicImage) -> Result<Vec<u8>> {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(anyhow!("Empty image"));
    }
    let gray = img.to_luma8();

    let (min, max) = gray
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p.0[0]), hi.max(p.0[0])));
    let range = (max.saturating_sub(min)).max(1) as f32;

    let mut out = image::RgbImage::new(width, height);
    for (x, y, p) in gray.enumerate_pixels() {
        let t = (p.0[0].saturating_sub(min)) as f32 / range;
        // Dark blue through red to yellow.
        let r = (t * 2.0).min(1.0);
        let g = ((t - 0.5) * 2.0).max(0.0);
        let b = (1.0 - t * 2.0).max(0.0) * 0.6;
        out.put_pixel(
            x,
            y,
            image::Rgb([(r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8]),
        );
    }

    let mut bytes = Vec::new();
    out.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .map_err(|e| anyhow!("PNG encoding failed: {}", e))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_image() -> DynamicImage {
        let img = image::GrayImage::from_fn(64, 64, |x, _| image::Luma([(x * 4) as u8]));
        DynamicImage::ImageLuma8(img)
    }

    #[test]
    fn tensor_shape_and_range() {
        let features = extract_image_features(&gradient_image());
        assert_eq!(features.tensor.shape(), &[1, 224, 224, 3]);
        assert!(features.tensor.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn proxies_match_name_count_and_range() {
        let features = extract_image_features(&gradient_image());
        assert_eq!(features.proxies.len(), IMAGE_PROXY_NAMES.len());
        assert!(features.proxies.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn grayscale_input_is_converted_not_rejected() {
        // A gradient has strong left/right asymmetry and zero top/bottom.
        let features = extract_image_features(&gradient_image());
        let lr = features.proxies[4];
        let tb = features.proxies[5];
        assert!(lr > 0.2, "lr_asym {}", lr);
        assert!(tb < 0.05, "tb_asym {}", tb);
    }

    #[test]
    fn heatmap_renders_png() {
        let png = render_heatmap_png(&gradient_image()).unwrap();
        assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));
    }
}
