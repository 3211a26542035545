//! Cover image band statistics
//!
//! Extracts the measurements the scorer works from. Analysis runs in two
//! phases: a cheap pass computes detail levels for the top, middle, and
//! bottom bands of the image, and only when the middle band is suspiciously
//! busier than the edges does the second pass run the edge variance and
//! horizontal boundary probes. Uniform edge bands with a busy middle are the
//! signature of landscape art padded into a portrait frame.

use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::CoverMetrics;

/// Edge band height, bounded by a third of the image for short covers
pub const BAND_HEIGHT_PX: u32 = 64;

/// The middle band starts at this fraction of image height
pub const MIDDLE_BAND_START: f64 = 0.40;

/// Detail ratio above which the second analysis phase runs
pub const SUSPICION_RATIO: f64 = 1.2;

/// Cap applied to the detail ratio so near-zero edge bands cannot push a
/// non-finite value into the serialized metrics
pub const ENTROPY_RATIO_CAP: f64 = 1000.0;

/// Row positions probed for a horizontal seam, as fractions of image height.
/// These sit where filler bands typically end on stretched landscape art.
pub const EDGE_PROBE_FRACTIONS: [f64; 4] = [0.20, 0.25, 0.75, 0.80];

/// Rows compared by each probe sit this far above and below the probe line
const PROBE_OFFSET_PX: u32 = 2;

/// Refuse to decode anything claiming more pixels than this
const MAX_DECODE_PIXELS: u64 = 64_000_000;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Unreadable cover {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },
}

/// Extracts [`CoverMetrics`] from cover files
pub struct MetricsExtractor;

impl MetricsExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Decode a cover and measure its bands
    ///
    /// Any decode problem, including implausible header dimensions, comes
    /// back as [`MetricsError::Unreadable`]; the caller decides how an
    /// unreadable cover scores.
    pub fn extract(&self, path: &Path) -> Result<CoverMetrics, MetricsError> {
        let (width, height) =
            image::image_dimensions(path).map_err(|e| unreadable(path, e.to_string()))?;
        if !decodable_dimensions(width, height) {
            return Err(unreadable(path, format!("implausible dimensions {width}x{height}")));
        }

        let img = image::open(path)
            .map_err(|e| unreadable(path, e.to_string()))?
            .to_rgb8();

        let band_h = band_height(height);
        let top = band_detail(&img, 0, band_h);
        let bottom = band_detail(&img, height - band_h, band_h);
        let middle_start = ((height as f64 * MIDDLE_BAND_START) as u32).min(height - band_h);
        let middle = band_detail(&img, middle_start, band_h);

        let entropy_ratio = detail_ratio(middle, top, bottom);
        let mut metrics = CoverMetrics {
            top_entropy: top,
            middle_entropy: middle,
            bottom_entropy: bottom,
            entropy_ratio,
            ..Default::default()
        };

        if entropy_ratio > SUSPICION_RATIO {
            // Color variance is the edge band statistic in its second role,
            // so the phase 1 values carry over unchanged
            metrics.top_color_variance = top;
            metrics.bottom_color_variance = bottom;
            metrics.edge_gradient_score = edge_gradient(&img);
            tracing::debug!(
                path = %path.display(),
                entropy_ratio,
                edge_gradient = metrics.edge_gradient_score,
                "Suspicious detail ratio, ran boundary probes"
            );
        }

        Ok(metrics)
    }
}

impl Default for MetricsExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn unreadable(path: &Path, reason: String) -> MetricsError {
    MetricsError::Unreadable { path: path.to_path_buf(), reason }
}

fn decodable_dimensions(width: u32, height: u32) -> bool {
    width > 0 && height > 0 && (width as u64) * (height as u64) <= MAX_DECODE_PIXELS
}

fn band_height(image_height: u32) -> u32 {
    (image_height / 3).min(BAND_HEIGHT_PX).max(1)
}

/// Detail level of one horizontal band: the sum of per-channel standard
/// deviations. Zero for a perfectly uniform band.
fn band_detail(img: &RgbImage, y_start: u32, height: u32) -> f64 {
    let width = img.width();
    let y_end = (y_start + height).min(img.height());
    let pixel_count = (width as u64 * (y_end.saturating_sub(y_start)) as u64) as f64;
    if pixel_count == 0.0 {
        return 0.0;
    }

    let mut sum = [0.0f64; 3];
    let mut sum_sq = [0.0f64; 3];
    for y in y_start..y_end {
        for x in 0..width {
            let px = img.get_pixel(x, y).0;
            for c in 0..3 {
                let v = px[c] as f64;
                sum[c] += v;
                sum_sq[c] += v * v;
            }
        }
    }

    (0..3)
        .map(|c| {
            let mean = sum[c] / pixel_count;
            let variance = (sum_sq[c] / pixel_count - mean * mean).max(0.0);
            variance.sqrt()
        })
        .sum()
}

/// Middle band detail relative to the mean edge band detail, capped
fn detail_ratio(middle: f64, top: f64, bottom: f64) -> f64 {
    let edges = (top + bottom) / 2.0;
    if edges > f64::EPSILON {
        (middle / edges).min(ENTROPY_RATIO_CAP)
    } else if middle > f64::EPSILON {
        ENTROPY_RATIO_CAP
    } else {
        // Nothing anywhere, no contrast to speak of
        1.0
    }
}

/// Strongest horizontal discontinuity across the probe rows
///
/// Each probe compares the grayscale rows two pixels above and below its
/// line and averages the absolute difference across the width, normalized
/// to 0.0..=1.0. Probes that do not fit inside the image are skipped.
fn edge_gradient(img: &RgbImage) -> f64 {
    let (width, height) = img.dimensions();
    let mut strongest = 0.0f64;
    for fraction in EDGE_PROBE_FRACTIONS {
        let y = (height as f64 * fraction) as u32;
        if y < PROBE_OFFSET_PX || y + PROBE_OFFSET_PX >= height {
            continue;
        }
        let above = y - PROBE_OFFSET_PX;
        let below = y + PROBE_OFFSET_PX;
        let mut total = 0.0f64;
        for x in 0..width {
            total += (luma(img.get_pixel(x, above)) - luma(img.get_pixel(x, below))).abs();
        }
        let mean = total / width as f64 / 255.0;
        if mean > strongest {
            strongest = mean;
        }
    }
    strongest
}

fn luma(px: &Rgb<u8>) -> f64 {
    0.299 * px.0[0] as f64 + 0.587 * px.0[1] as f64 + 0.114 * px.0[2] as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageBuffer;
    use tempfile::TempDir;

    fn noise_pixel(x: u32, y: u32) -> Rgb<u8> {
        let mut v = x.wrapping_mul(0x9E37_79B9) ^ y.wrapping_mul(0x85EB_CA6B);
        v ^= v >> 13;
        v = v.wrapping_mul(0xC2B2_AE35);
        v ^= v >> 16;
        let b = v.to_le_bytes();
        Rgb([b[0], b[1], b[2]])
    }

    fn save(img: &RgbImage, dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn flat_image_has_no_detail_anywhere() {
        let dir = TempDir::new().unwrap();
        let img: RgbImage = ImageBuffer::from_pixel(300, 450, Rgb([80, 80, 80]));
        let path = save(&img, &dir, "flat.png");

        let metrics = MetricsExtractor::new().extract(&path).unwrap();
        assert!(metrics.top_entropy < 1.0);
        assert!(metrics.middle_entropy < 1.0);
        assert!((metrics.entropy_ratio - 1.0).abs() < 0.01);
        // Second phase must not have run
        assert_eq!(metrics.edge_gradient_score, 0.0);
        assert_eq!(metrics.top_color_variance, 0.0);
    }

    #[test]
    fn uniform_noise_keeps_ratio_near_one() {
        let dir = TempDir::new().unwrap();
        let img: RgbImage = ImageBuffer::from_fn(300, 450, noise_pixel);
        let path = save(&img, &dir, "noise.png");

        let metrics = MetricsExtractor::new().extract(&path).unwrap();
        assert!(metrics.top_entropy > 150.0, "noise band detail was {}", metrics.top_entropy);
        assert!(metrics.entropy_ratio < SUSPICION_RATIO, "ratio was {}", metrics.entropy_ratio);
        // Gate held, so the boundary probes never ran
        assert_eq!(metrics.edge_gradient_score, 0.0);
    }

    #[test]
    fn pillarboxed_image_caps_ratio_and_runs_second_phase() {
        let dir = TempDir::new().unwrap();
        let img: RgbImage = ImageBuffer::from_fn(300, 450, |x, y| {
            if y < 75 || y >= 375 {
                Rgb([12, 12, 12])
            } else {
                noise_pixel(x, y)
            }
        });
        let path = save(&img, &dir, "pillarboxed.png");

        let metrics = MetricsExtractor::new().extract(&path).unwrap();
        assert!(metrics.top_entropy < 1.0);
        assert!(metrics.middle_entropy > 150.0);
        assert_eq!(metrics.entropy_ratio, ENTROPY_RATIO_CAP);
        assert_eq!(metrics.top_color_variance, metrics.top_entropy);
        assert_eq!(metrics.bottom_color_variance, metrics.bottom_entropy);
    }

    #[test]
    fn sharp_seam_at_probe_row_scores_high() {
        let dir = TempDir::new().unwrap();
        // White filler above y=100 (the 25% probe line), noise to y=336,
        // black filler below; edge bands stay uniform so the gate opens
        let img: RgbImage = ImageBuffer::from_fn(400, 400, |x, y| {
            if y < 100 {
                Rgb([255, 255, 255])
            } else if y < 336 {
                noise_pixel(x, y)
            } else {
                Rgb([0, 0, 0])
            }
        });
        let path = save(&img, &dir, "seam.png");

        let metrics = MetricsExtractor::new().extract(&path).unwrap();
        assert_eq!(metrics.entropy_ratio, ENTROPY_RATIO_CAP);
        assert!(metrics.edge_gradient_score > 0.3, "gradient was {}", metrics.edge_gradient_score);
    }

    #[test]
    fn tiny_image_extracts_without_panicking() {
        let dir = TempDir::new().unwrap();
        let img: RgbImage = ImageBuffer::from_fn(10, 9, noise_pixel);
        let path = save(&img, &dir, "tiny.png");

        let metrics = MetricsExtractor::new().extract(&path).unwrap();
        assert!(metrics.entropy_ratio.is_finite());
        assert!(metrics.edge_gradient_score.is_finite());
    }

    #[test]
    fn garbage_bytes_are_unreadable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("13.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        let err = MetricsExtractor::new().extract(&path).unwrap_err();
        assert!(matches!(err, MetricsError::Unreadable { .. }));
    }

    #[test]
    fn missing_file_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let err = MetricsExtractor::new().extract(&dir.path().join("404.png")).unwrap_err();
        assert!(matches!(err, MetricsError::Unreadable { .. }));
    }

    #[test]
    fn dimension_guard_rejects_oversize_and_degenerate_headers() {
        assert!(decodable_dimensions(600, 900));
        assert!(decodable_dimensions(8000, 8000));
        assert!(!decodable_dimensions(8000, 8001));
        assert!(!decodable_dimensions(0, 450));
        assert!(!decodable_dimensions(600, 0));
    }

    #[test]
    fn band_height_shrinks_with_short_images() {
        assert_eq!(band_height(900), 64);
        assert_eq!(band_height(192), 64);
        assert_eq!(band_height(90), 30);
        assert_eq!(band_height(2), 1);
        assert_eq!(band_height(1), 1);
    }

    #[test]
    fn ratio_degenerate_cases() {
        assert_eq!(detail_ratio(0.0, 0.0, 0.0), 1.0);
        assert_eq!(detail_ratio(200.0, 0.0, 0.0), ENTROPY_RATIO_CAP);
        assert!((detail_ratio(100.0, 50.0, 50.0) - 2.0).abs() < f64::EPSILON);
        assert!(detail_ratio(1e9, 1e-3, 1e-3) <= ENTROPY_RATIO_CAP);
    }
}
