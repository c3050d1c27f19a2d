//! Rendition math: bounding-box resizes and the budgeted WebP encode.

use image::DynamicImage;
use newsloom::errors::ImageError;

/// Web rendition bounding box.
pub const WEB_MAX: (u32, u32) = (1024, 768);
/// Mobile rendition bounding box.
pub const MOBILE_MAX: (u32, u32) = (600, 450);
/// Byte budget for the mobile WebP.
pub const MOBILE_BUDGET: usize = 50 * 1024;

const QUALITY_MIN: u8 = 40;
const QUALITY_MAX: u8 = 85;
/// Below this edge length the downscale loop stops and emits a floor
/// rendition at minimum quality.
const FLOOR_DIM: u32 = 100;

/// Fits an image inside `max_w` x `max_h`, preserving aspect ratio.
/// Returns `None` when the image already fits — never upscale.
pub fn bound(image: &DynamicImage, max_w: u32, max_h: u32) -> Option<DynamicImage> {
    if image.width() <= max_w && image.height() <= max_h {
        return None;
    }
    Some(image.resize(max_w, max_h, image::imageops::FilterType::Lanczos3))
}

/// The produced mobile rendition.
pub struct MobileRendition {
    pub bytes: Vec<u8>,
    pub quality: u8,
    pub width: u32,
    pub height: u32,
}

fn encode_webp(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, ImageError> {
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    let encoder =
        webp::Encoder::from_image(&rgb).map_err(|e| ImageError::Encode(e.to_string()))?;
    Ok(encoder.encode(quality as f32).to_vec())
}

/// Encodes the mobile WebP under the byte budget.
///
/// Binary-searches the quality parameter in [40, 85] for the largest
/// quality that fits. If even quality 40 is too large, the linear
/// dimensions shrink in multiples of 0.1 until the budget is met; once
/// an edge would fall below 100 pixels the rendition is emitted at
/// 100x100 and quality 40 regardless of size.
pub fn encode_mobile(image: &DynamicImage) -> Result<MobileRendition, ImageError> {
    let bounded;
    let base = match bound(image, MOBILE_MAX.0, MOBILE_MAX.1) {
        Some(resized) => {
            bounded = resized;
            &bounded
        }
        None => image,
    };

    // Largest quality that fits the budget.
    let mut lo = QUALITY_MIN;
    let mut hi = QUALITY_MAX;
    let mut best: Option<(Vec<u8>, u8)> = None;
    while lo <= hi {
        let mid = lo + (hi - lo) / 2;
        let bytes = encode_webp(base, mid)?;
        if bytes.len() <= MOBILE_BUDGET {
            best = Some((bytes, mid));
            lo = mid + 1;
        } else {
            if mid == QUALITY_MIN {
                break;
            }
            hi = mid - 1;
        }
    }
    if let Some((bytes, quality)) = best {
        return Ok(MobileRendition {
            bytes,
            quality,
            width: base.width(),
            height: base.height(),
        });
    }

    // Quality alone cannot meet the budget: shrink the dimensions.
    let (full_w, full_h) = (base.width(), base.height());
    for step in (1..10).rev() {
        let factor = step as f32 / 10.0;
        let w = (full_w as f32 * factor) as u32;
        let h = (full_h as f32 * factor) as u32;
        if w < FLOOR_DIM || h < FLOOR_DIM {
            break;
        }
        let scaled = base.resize_exact(w, h, image::imageops::FilterType::Lanczos3);
        let bytes = encode_webp(&scaled, QUALITY_MIN)?;
        if bytes.len() <= MOBILE_BUDGET {
            return Ok(MobileRendition {
                bytes,
                quality: QUALITY_MIN,
                width: w,
                height: h,
            });
        }
    }

    // Floor rendition: 100x100 at minimum quality, budget or not.
    let floor = base.resize_exact(FLOOR_DIM, FLOOR_DIM, image::imageops::FilterType::Lanczos3);
    let bytes = encode_webp(&floor, QUALITY_MIN)?;
    Ok(MobileRendition {
        bytes,
        quality: QUALITY_MIN,
        width: FLOOR_DIM,
        height: FLOOR_DIM,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        }))
    }

    #[test]
    fn bound_preserves_aspect_ratio() {
        let img = gradient(2000, 1500);
        let resized = bound(&img, 1024, 768).unwrap();
        assert_eq!(resized.width(), 1024);
        assert_eq!(resized.height(), 768);
    }

    #[test]
    fn bound_never_upscales() {
        let img = gradient(320, 240);
        assert!(bound(&img, 1024, 768).is_none());
    }

    #[test]
    fn mobile_rendition_respects_box_and_budget() {
        let img = gradient(2000, 1500);
        let rendition = encode_mobile(&img).unwrap();
        assert!(rendition.width <= MOBILE_MAX.0);
        assert!(rendition.height <= MOBILE_MAX.1);
        assert!(rendition.bytes.len() <= MOBILE_BUDGET);
        assert!((QUALITY_MIN..=QUALITY_MAX).contains(&rendition.quality));
    }

    #[test]
    fn small_source_is_not_upscaled_for_mobile() {
        let img = gradient(200, 150);
        let rendition = encode_mobile(&img).unwrap();
        assert_eq!(rendition.width, 200);
        assert_eq!(rendition.height, 150);
    }
}
