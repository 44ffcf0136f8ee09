use ab_glyph::{FontRef, PxScale};
use image::{DynamicImage, Rgba};
use imageproc::drawing::draw_text_mut;
use mediaform_core::AppError;

/// Top-left corner of the text box
pub(crate) const ANCHOR: (i32, i32) = (10, 10);
/// Glyph height in output pixels
pub(crate) const FONT_SCALE: f32 = 16.0;
pub(crate) const TEXT_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);

static FONT_DATA: &[u8] = include_bytes!("../../assets/DejaVuSansMono.ttf");

fn font() -> Result<FontRef<'static>, AppError> {
    FontRef::try_from_slice(FONT_DATA)
        .map_err(|e| AppError::Internal(format!("overlay font failed to load: {}", e)))
}

/// Draw `text` at the fixed anchor. Text running past the frame is clipped.
pub(crate) fn draw_text(img: &DynamicImage, text: &str) -> Result<DynamicImage, AppError> {
    let font = font()?;
    let mut canvas = img.to_rgba8();
    draw_text_mut(
        &mut canvas,
        TEXT_COLOR,
        ANCHOR.0,
        ANCHOR.1,
        PxScale::from(FONT_SCALE),
        &font,
        text,
    );

    Ok(if img.color().has_alpha() {
        DynamicImage::ImageRgba8(canvas)
    } else {
        DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).into_rgb8())
    })
}
