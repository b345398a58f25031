//! Image preprocessing for the local OCR backend
//!
//! Prepares the scan-region snapshot for line recognition: grayscale,
//! contrast boost, Otsu binarization, and a horizontal-projection pass that
//! splits the region into candidate text-line bands.

use image::GrayImage;
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use tracing::debug;

/// Minimum pixel height for a band to count as a text line
pub const MIN_LINE_HEIGHT: u32 = 8;

/// Vertical padding added around each detected band
const BAND_PADDING: u32 = 2;

/// Rows with fewer ink pixels than width / INK_ROW_DIVISOR are background
const INK_ROW_DIVISOR: u32 = 50;

/// Convert an RGB snapshot to grayscale
pub fn to_grayscale(data: &[u8], width: u32, height: u32) -> Option<GrayImage> {
    let rgb = image::RgbImage::from_raw(width, height, data.to_vec())?;
    Some(image::imageops::grayscale(&rgb))
}

/// Contrast enhancement around the midpoint.
/// Factor > 1.0 increases contrast, < 1.0 decreases.
pub fn boost_contrast(image: &mut GrayImage, factor: f32) {
    for pixel in image.pixels_mut() {
        let val = pixel.0[0] as f32;
        let adjusted = ((val - 128.0) * factor + 128.0).clamp(0.0, 255.0);
        pixel.0[0] = adjusted as u8;
    }
}

/// Binarize with an Otsu-derived threshold, normalizing to dark ink on a
/// light background (stylized card text is often light-on-dark).
pub fn binarize(image: &GrayImage) -> GrayImage {
    let level = otsu_level(image);
    let mut binary = threshold(image, level, ThresholdType::Binary);

    // If most of the frame came out black, the ink/background polarity is
    // inverted; flip it so downstream code can assume dark ink.
    let dark: u32 = binary.pixels().filter(|p| p.0[0] == 0).count() as u32;
    let total = binary.width() * binary.height();
    if total > 0 && dark * 2 > total {
        for pixel in binary.pixels_mut() {
            pixel.0[0] = 255 - pixel.0[0];
        }
    }

    binary
}

/// Find candidate text-line bands as (y_start, y_end) row ranges.
///
/// A row belongs to a band when it carries enough ink pixels; adjacent bands
/// separated by a one-row gap are merged.
pub fn segment_lines(binary: &GrayImage, min_height: u32) -> Vec<(u32, u32)> {
    let (width, height) = binary.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let min_ink = (width / INK_ROW_DIVISOR).max(2);
    let mut is_text_row = vec![false; height as usize];

    for y in 0..height {
        let mut ink = 0u32;
        for x in 0..width {
            if binary.get_pixel(x, y).0[0] == 0 {
                ink += 1;
            }
        }
        is_text_row[y as usize] = ink >= min_ink;
    }

    let mut bands = Vec::new();
    let mut start: Option<u32> = None;
    let mut gap = 0u32;

    for y in 0..height {
        if is_text_row[y as usize] {
            if start.is_none() {
                start = Some(y);
            }
            gap = 0;
        } else if let Some(s) = start {
            gap += 1;
            if gap > 1 {
                let end = y - gap;
                if end + 1 - s >= min_height {
                    bands.push((s.saturating_sub(BAND_PADDING), (end + BAND_PADDING).min(height - 1)));
                }
                start = None;
                gap = 0;
            }
        }
    }
    if let Some(s) = start {
        let end = height - 1 - gap;
        if end + 1 - s >= min_height {
            bands.push((s.saturating_sub(BAND_PADDING), end.min(height - 1)));
        }
    }

    debug!("Line segmentation found {} bands", bands.len());
    bands
}

/// Crop one band out of the grayscale image
pub fn crop_band(image: &GrayImage, band: (u32, u32)) -> GrayImage {
    let (y0, y1) = band;
    let height = y1.saturating_sub(y0) + 1;
    image::imageops::crop_imm(image, 0, y0, image.width(), height).to_image()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    /// Build a synthetic image with solid ink bands at the given row ranges
    fn test_image_with_bands(height: u32, bands: &[(u32, u32)]) -> GrayImage {
        let mut img = GrayImage::from_pixel(100, height, Luma([255]));
        for &(y0, y1) in bands {
            for y in y0..=y1 {
                for x in 10..90 {
                    img.put_pixel(x, y, Luma([0]));
                }
            }
        }
        img
    }

    #[test]
    fn test_segment_single_band() {
        let img = test_image_with_bands(60, &[(20, 35)]);
        let bands = segment_lines(&img, MIN_LINE_HEIGHT);

        assert_eq!(bands.len(), 1);
        let (y0, y1) = bands[0];
        assert!(y0 <= 20 && y1 >= 35);
    }

    #[test]
    fn test_segment_two_bands() {
        let img = test_image_with_bands(80, &[(10, 22), (50, 64)]);
        let bands = segment_lines(&img, MIN_LINE_HEIGHT);
        assert_eq!(bands.len(), 2);
        assert!(bands[0].1 < bands[1].0);
    }

    #[test]
    fn test_segment_ignores_thin_noise() {
        let img = test_image_with_bands(60, &[(30, 32)]);
        let bands = segment_lines(&img, MIN_LINE_HEIGHT);
        assert!(bands.is_empty());
    }

    #[test]
    fn test_segment_blank_image() {
        let img = GrayImage::from_pixel(40, 40, Luma([255]));
        assert!(segment_lines(&img, MIN_LINE_HEIGHT).is_empty());
    }

    #[test]
    fn test_binarize_normalizes_polarity() {
        // Light text on dark background: most pixels dark before normalizing
        let mut img = GrayImage::from_pixel(50, 50, Luma([20]));
        for y in 20..30 {
            for x in 5..45 {
                img.put_pixel(x, y, Luma([240]));
            }
        }
        let binary = binarize(&img);
        let dark: usize = binary.pixels().filter(|p| p.0[0] == 0).count();
        // After polarity normalization the text strokes are the dark minority
        assert!(dark * 2 < (binary.width() * binary.height()) as usize);
    }

    #[test]
    fn test_boost_contrast_expands_range() {
        let mut img = GrayImage::from_pixel(2, 1, Luma([100]));
        img.put_pixel(1, 0, Luma([156]));
        boost_contrast(&mut img, 2.0);
        assert_eq!(img.get_pixel(0, 0).0[0], 72);
        assert_eq!(img.get_pixel(1, 0).0[0], 184);
    }

    #[test]
    fn test_crop_band_height() {
        let img = GrayImage::from_pixel(30, 40, Luma([255]));
        let band = crop_band(&img, (10, 19));
        assert_eq!(band.dimensions(), (30, 10));
    }
}
