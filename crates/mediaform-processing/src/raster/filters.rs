use image::DynamicImage;

/// Gaussian sigma used by the blur filter
pub(crate) const BLUR_SIGMA: f32 = 2.0;

/// Luminance conversion; every output pixel has R = G = B
pub(crate) fn grayscale(img: &DynamicImage) -> DynamicImage {
    if img.color().has_alpha() {
        DynamicImage::ImageLumaA8(img.to_luma_alpha8())
    } else {
        DynamicImage::ImageLuma8(img.to_luma8())
    }
}

pub(crate) fn blur(img: &DynamicImage) -> DynamicImage {
    img.blur(BLUR_SIGMA)
}

/// Multiply each color channel by `factor`, clamping to 0..=255.
/// Alpha is untouched and grayscale sources stay gray.
pub(crate) fn brightness(img: &DynamicImage, factor: f32) -> DynamicImage {
    let scale = |v: u8| (v as f32 * factor).round().clamp(0.0, 255.0) as u8;

    match img {
        DynamicImage::ImageLuma8(gray) => {
            let mut out = gray.clone();
            for pixel in out.pixels_mut() {
                pixel.0[0] = scale(pixel.0[0]);
            }
            DynamicImage::ImageLuma8(out)
        }
        DynamicImage::ImageLumaA8(gray) => {
            let mut out = gray.clone();
            for pixel in out.pixels_mut() {
                pixel.0[0] = scale(pixel.0[0]);
            }
            DynamicImage::ImageLumaA8(out)
        }
        _ if img.color().has_alpha() => {
            let mut out = img.to_rgba8();
            for pixel in out.pixels_mut() {
                for channel in &mut pixel.0[..3] {
                    *channel = scale(*channel);
                }
            }
            DynamicImage::ImageRgba8(out)
        }
        _ => {
            let mut out = img.to_rgb8();
            for pixel in out.pixels_mut() {
                for channel in pixel.0.iter_mut() {
                    *channel = scale(*channel);
                }
            }
            DynamicImage::ImageRgb8(out)
        }
    }
}
