use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

/// Fill in a missing dimension from the source aspect ratio.
///
/// The derived side is at least 1 and saturates at `u32::MAX`; callers
/// bound it.
pub fn scaled_dimensions(
    orig_width: u32,
    orig_height: u32,
    width: Option<u32>,
    height: Option<u32>,
) -> (u32, u32) {
    match (width, height) {
        (Some(w), Some(h)) => (w, h),
        (Some(w), None) => {
            let aspect_ratio = orig_height as f64 / orig_width.max(1) as f64;
            (w, derived_side(w as f64 * aspect_ratio))
        }
        (None, Some(h)) => {
            let aspect_ratio = orig_width as f64 / orig_height.max(1) as f64;
            (derived_side(h as f64 * aspect_ratio), h)
        }
        (None, None) => (orig_width, orig_height),
    }
}

fn derived_side(value: f64) -> u32 {
    value.round().clamp(1.0, u32::MAX as f64) as u32
}

/// Select a resampling filter based on the downscale ratio
pub(crate) fn select_filter(
    orig_width: u32,
    orig_height: u32,
    new_width: u32,
    new_height: u32,
) -> FilterType {
    let width_ratio = orig_width as f32 / new_width as f32;
    let height_ratio = orig_height as f32 / new_height as f32;
    let max_ratio = width_ratio.max(height_ratio);

    if max_ratio > 2.0 {
        FilterType::Triangle
    } else if max_ratio > 1.5 {
        FilterType::CatmullRom
    } else {
        FilterType::Lanczos3
    }
}

/// Resize to exact dimensions, ignoring aspect ratio
pub(crate) fn resize_exact(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    let (orig_width, orig_height) = img.dimensions();
    if (orig_width, orig_height) == (width, height) {
        return img.clone();
    }
    let filter = select_filter(orig_width, orig_height, width, height);
    img.resize_exact(width, height, filter)
}
