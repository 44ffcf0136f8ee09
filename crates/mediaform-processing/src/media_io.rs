//! Media I/O adapter: probing, decoding and encoding source bytes.

use crate::operation::OutputFormat;
use crate::video::{self, FrameReader, FrameWriter};
use bytes::Bytes;
use image::{DynamicImage, ImageReader};
use mediaform_core::{AppError, MediaKind};
use std::io::Cursor;

/// What a source holds, learned without fully decoding it
#[derive(Debug, Clone, PartialEq)]
pub struct MediaProbe {
    pub kind: MediaKind,
    pub width: u32,
    pub height: u32,
    pub frame_count: Option<u64>,
    pub frame_rate: Option<f32>,
    /// Detected container or image format
    pub format: OutputFormat,
}

/// Codec access for images (in process) and video (through ffmpeg)
#[derive(Debug, Clone)]
pub struct MediaIo {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl MediaIo {
    pub fn new(ffmpeg_path: impl Into<String>, ffprobe_path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            ffprobe_path: ffprobe_path.into(),
        }
    }

    /// Read dimensions and format.
    ///
    /// Video probing shells out to ffprobe and blocks; call it from a
    /// blocking context.
    pub fn probe(&self, kind: MediaKind, data: &[u8]) -> Result<MediaProbe, AppError> {
        match kind {
            MediaKind::Image => probe_image(data),
            MediaKind::Video => self.probe_video(data),
        }
    }

    fn probe_video(&self, data: &[u8]) -> Result<MediaProbe, AppError> {
        if !video::looks_like_mp4(data) {
            return Err(AppError::DecodeFailed(
                "source is not a readable MP4 container".to_string(),
            ));
        }
        let info = video::probe_video(&self.ffprobe_path, data)?;
        Ok(MediaProbe {
            kind: MediaKind::Video,
            width: info.width,
            height: info.height,
            frame_count: info.frame_count,
            frame_rate: info.frame_rate,
            format: OutputFormat::Mp4,
        })
    }

    pub(crate) fn decode_image(&self, data: &[u8]) -> Result<DynamicImage, AppError> {
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| AppError::DecodeFailed(format!("cannot read image header: {}", e)))?;
        reader
            .decode()
            .map_err(|e| AppError::DecodeFailed(format!("cannot decode image: {}", e)))
    }

    /// Encode a frame. JPEG has no alpha, so it gets RGB (or plain luma).
    pub(crate) fn encode_image(
        &self,
        img: &DynamicImage,
        format: OutputFormat,
    ) -> Result<Bytes, AppError> {
        let image_format = format.image_format().ok_or_else(|| {
            AppError::UnsupportedOperation(format!("{} is not an image format", format))
        })?;

        let flattened;
        let img = match (format, img) {
            (OutputFormat::Jpeg, DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_)) => img,
            (OutputFormat::Jpeg, DynamicImage::ImageLumaA8(_)) => {
                flattened = DynamicImage::ImageLuma8(img.to_luma8());
                &flattened
            }
            (OutputFormat::Jpeg, _) => {
                flattened = DynamicImage::ImageRgb8(img.to_rgb8());
                &flattened
            }
            (OutputFormat::WebP | OutputFormat::Gif, _) => {
                flattened = DynamicImage::ImageRgba8(img.to_rgba8());
                &flattened
            }
            _ => img,
        };

        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, image_format)
            .map_err(|e| AppError::Internal(format!("failed to encode {}: {}", format, e)))?;
        Ok(Bytes::from(buffer.into_inner()))
    }

    pub(crate) fn open_video(&self, data: &[u8], probe: &MediaProbe) -> Result<FrameReader, AppError> {
        FrameReader::spawn(&self.ffmpeg_path, data, probe.width, probe.height)
    }

    pub(crate) fn create_video_writer(
        &self,
        width: u32,
        height: u32,
        frame_rate: f32,
    ) -> Result<FrameWriter, AppError> {
        FrameWriter::spawn(&self.ffmpeg_path, width, height, frame_rate)
    }
}

fn probe_image(data: &[u8]) -> Result<MediaProbe, AppError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| AppError::DecodeFailed(format!("cannot read image header: {}", e)))?;

    let format = match reader.format() {
        Some(detected) => OutputFormat::from_image_format(detected).ok_or_else(|| {
            AppError::UnsupportedFormat(format!("{:?} images are not supported", detected))
        })?,
        None => {
            return Err(AppError::UnsupportedFormat(
                "unrecognised image container".to_string(),
            ))
        }
    };

    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| AppError::DecodeFailed(format!("cannot read image dimensions: {}", e)))?;

    Ok(MediaProbe {
        kind: MediaKind::Image,
        width,
        height,
        frame_count: None,
        frame_rate: None,
        format,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};

    fn io() -> MediaIo {
        MediaIo::new("ffmpeg", "ffprobe")
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([10, 120, 240]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_probe_png() {
        let probe = io().probe(MediaKind::Image, &png_bytes(40, 30)).unwrap();
        assert_eq!((probe.width, probe.height), (40, 30));
        assert_eq!(probe.format, OutputFormat::Png);
        assert_eq!(probe.kind, MediaKind::Image);
    }

    #[test]
    fn test_probe_unknown_bytes_is_unsupported_format() {
        let err = io()
            .probe(MediaKind::Image, b"definitely not an image")
            .unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_probe_truncated_png_fails_decode() {
        let bytes = png_bytes(40, 30);
        let err = io().probe(MediaKind::Image, &bytes[..12]).unwrap_err();
        assert!(matches!(err, AppError::DecodeFailed(_)));
    }

    #[test]
    fn test_corrupt_video_fails_before_ffprobe() {
        let err = io()
            .probe(MediaKind::Video, b"garbage bytes that are no mp4")
            .unwrap_err();
        assert!(matches!(err, AppError::DecodeFailed(_)));
    }

    #[test]
    fn test_encode_jpeg_drops_alpha() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 128])));
        let bytes = io().encode_image(&img, OutputFormat::Jpeg).unwrap();
        let decoded = io().decode_image(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (4, 4));
        assert!(!decoded.color().has_alpha());
    }

    #[test]
    fn test_encode_is_deterministic() {
        let img = io().decode_image(&png_bytes(16, 16)).unwrap();
        for format in [OutputFormat::Png, OutputFormat::Jpeg, OutputFormat::Gif] {
            let a = io().encode_image(&img, format).unwrap();
            let b = io().encode_image(&img, format).unwrap();
            assert_eq!(a, b, "{} output differs", format);
        }
    }

    #[test]
    fn test_encode_mp4_target_is_unsupported_for_frames() {
        let img = DynamicImage::new_rgb8(2, 2);
        let err = io().encode_image(&img, OutputFormat::Mp4).unwrap_err();
        assert!(matches!(err, AppError::UnsupportedOperation(_)));
    }
}
