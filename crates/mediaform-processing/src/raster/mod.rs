//! Pure raster transforms.
//!
//! Each function takes a frame by reference and returns a new one; the
//! engine threads a frame through them one operation at a time.

mod filters;
mod overlay;
pub mod resize;

use crate::operation::{FilterKind, Operation};
use image::DynamicImage;
use mediaform_core::AppError;

/// Apply one operation to a decoded frame.
///
/// Format conversion happens at encode time and leaves the raster as is.
pub(crate) fn apply(op: &Operation, img: &DynamicImage) -> Result<DynamicImage, AppError> {
    Ok(match op {
        Operation::Resize(r) => resize::resize_exact(img, r.width(), r.height()),
        Operation::Crop(c) => img.crop_imm(c.x1(), c.y1(), c.width(), c.height()),
        Operation::Filter(FilterKind::Grayscale) => filters::grayscale(img),
        Operation::Filter(FilterKind::Blur) => filters::blur(img),
        Operation::Brightness(b) => filters::brightness(img, b.factor()),
        Operation::Overlay(o) => overlay::draw_text(img, o.text())?,
        Operation::FormatConvert(_) => img.clone(),
    })
}
