//! Transform engine: runs a compiled pipeline over decoded frames.

use crate::deadline::Deadline;
use crate::media_io::{MediaIo, MediaProbe};
use crate::pipeline::Pipeline;
use crate::raster;
use crate::video::DEFAULT_FRAME_RATE;
use bytes::Bytes;
use image::DynamicImage;
use mediaform_core::{AppError, Artifact, MediaKind};
use std::time::Instant;

/// Executes pipelines. All work is synchronous and CPU bound; callers run it
/// on the blocking pool.
#[derive(Debug, Clone)]
pub struct TransformEngine {
    io: MediaIo,
}

impl TransformEngine {
    pub fn new(io: MediaIo) -> Self {
        Self { io }
    }

    pub fn media_io(&self) -> &MediaIo {
        &self.io
    }

    /// Run `pipeline` over `source`. Nothing partial is ever returned.
    pub fn execute(
        &self,
        source: &Bytes,
        probe: &MediaProbe,
        pipeline: &Pipeline,
        deadline: Deadline,
    ) -> Result<Artifact, AppError> {
        let output = pipeline.output_format();
        if output.kind() != probe.kind {
            return Err(AppError::UnsupportedOperation(format!(
                "cannot produce {} output from a {} source",
                output, probe.kind
            )));
        }

        if pipeline.is_identity() {
            return Ok(Artifact::new(source.clone(), output.mime_type()));
        }

        let start = Instant::now();
        let bytes = match probe.kind {
            MediaKind::Image => self.execute_image(source, pipeline, deadline)?,
            MediaKind::Video => self.execute_video(source, probe, pipeline, deadline)?,
        };

        tracing::debug!(
            kind = %probe.kind,
            operations = pipeline.operations().len(),
            output_format = %output,
            size_bytes = bytes.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Pipeline executed"
        );

        Ok(Artifact::new(bytes, output.mime_type()))
    }

    fn execute_image(
        &self,
        source: &[u8],
        pipeline: &Pipeline,
        deadline: Deadline,
    ) -> Result<Bytes, AppError> {
        let mut frame = self.io.decode_image(source)?;
        deadline.check()?;
        for op in pipeline.operations() {
            frame = raster::apply(op, &frame)?;
            deadline.check()?;
        }
        self.io.encode_image(&frame, pipeline.output_format())
    }

    fn execute_video(
        &self,
        source: &[u8],
        probe: &MediaProbe,
        pipeline: &Pipeline,
        deadline: Deadline,
    ) -> Result<Bytes, AppError> {
        let (out_width, out_height) = pipeline.output_dimensions(probe.width, probe.height);
        let frame_rate = probe.frame_rate.unwrap_or(DEFAULT_FRAME_RATE);

        // Both children are killed on drop if any step below bails out.
        let mut reader = self.io.open_video(source, probe)?;
        let mut writer = self.io.create_video_writer(out_width, out_height, frame_rate)?;

        while let Some(rgb) = reader.next_frame()? {
            let mut frame = DynamicImage::ImageRgb8(rgb);
            for op in pipeline.operations() {
                frame = raster::apply(op, &frame)?;
            }
            writer.write_frame(&frame.into_rgb8())?;
            deadline.check()?;
        }

        let frames = reader.frames_read();
        reader.finish()?;
        if frames == 0 {
            return Err(AppError::DecodeFailed(
                "video contains no decodable frames".to_string(),
            ));
        }

        tracing::debug!(frames, frame_rate, out_width, out_height, "Video frames re-encoded");
        writer.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{FilterKind, Operation, OutputFormat, Resize};
    use image::{GenericImageView, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use std::time::Duration;

    fn engine() -> TransformEngine {
        TransformEngine::new(MediaIo::new("ffmpeg", "ffprobe"))
    }

    fn png_source(width: u32, height: u32) -> Bytes {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 2) as u8, (y * 2) as u8, ((x + y) % 256) as u8])
        });
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        Bytes::from(buf.into_inner())
    }

    fn probe_of(source: &Bytes) -> MediaProbe {
        engine().media_io().probe(MediaKind::Image, source).unwrap()
    }

    fn resize_gray_pipeline() -> Pipeline {
        Pipeline::new(
            vec![
                Operation::Resize(Resize::new(50, 50).unwrap()),
                Operation::Filter(FilterKind::Grayscale),
            ],
            OutputFormat::Png,
        )
        .unwrap()
    }

    #[test]
    fn test_resize_and_grayscale() {
        let source = png_source(100, 100);
        let artifact = engine()
            .execute(
                &source,
                &probe_of(&source),
                &resize_gray_pipeline(),
                Deadline::after(Duration::from_secs(30)),
            )
            .unwrap();

        assert_eq!(artifact.mime_type, "image/png");
        let out = image::load_from_memory(&artifact.bytes).unwrap();
        assert_eq!(out.dimensions(), (50, 50));
        for pixel in out.to_rgb8().pixels() {
            assert_eq!(pixel.0[0], pixel.0[1]);
            assert_eq!(pixel.0[1], pixel.0[2]);
        }
    }

    #[test]
    fn test_execution_is_byte_identical() {
        let source = png_source(64, 48);
        let probe = probe_of(&source);
        let pipeline = resize_gray_pipeline();
        let run = || {
            engine()
                .execute(&source, &probe, &pipeline, Deadline::after(Duration::from_secs(30)))
                .unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_identity_returns_source() {
        let source = png_source(8, 8);
        let artifact = engine()
            .execute(
                &source,
                &probe_of(&source),
                &Pipeline::identity(OutputFormat::Png),
                Deadline::after(Duration::from_secs(30)),
            )
            .unwrap();
        assert_eq!(artifact.bytes, source);
        assert_eq!(artifact.byte_len(), source.len());
    }

    #[test]
    fn test_video_target_for_image_is_unsupported() {
        let source = png_source(8, 8);
        let pipeline = Pipeline::new(
            vec![Operation::FormatConvert(OutputFormat::Mp4)],
            OutputFormat::Png,
        )
        .unwrap();
        let err = engine()
            .execute(
                &source,
                &probe_of(&source),
                &pipeline,
                Deadline::after(Duration::from_secs(30)),
            )
            .unwrap_err();
        assert!(matches!(err, AppError::UnsupportedOperation(_)));
    }

    #[test]
    fn test_image_target_for_video_is_unsupported() {
        let probe = MediaProbe {
            kind: MediaKind::Video,
            width: 16,
            height: 16,
            frame_count: None,
            frame_rate: None,
            format: OutputFormat::Mp4,
        };
        let pipeline = Pipeline::new(
            vec![Operation::FormatConvert(OutputFormat::Png)],
            OutputFormat::Mp4,
        )
        .unwrap();
        let err = engine()
            .execute(
                &Bytes::from_static(b"unused"),
                &probe,
                &pipeline,
                Deadline::after(Duration::from_secs(30)),
            )
            .unwrap_err();
        assert!(matches!(err, AppError::UnsupportedOperation(_)));
    }

    #[test]
    fn test_expired_deadline_times_out() {
        let source = png_source(32, 32);
        let err = engine()
            .execute(
                &source,
                &probe_of(&source),
                &resize_gray_pipeline(),
                Deadline::after(Duration::ZERO),
            )
            .unwrap_err();
        assert!(matches!(err, AppError::Timeout { .. }));
    }

    #[test]
    fn test_corrupt_image_fails_decode() {
        let mut source = png_source(32, 32).to_vec();
        source.truncate(source.len() / 2);
        let source = Bytes::from(source);
        let probe = MediaProbe {
            kind: MediaKind::Image,
            width: 32,
            height: 32,
            frame_count: None,
            frame_rate: None,
            format: OutputFormat::Png,
        };
        let err = engine()
            .execute(
                &source,
                &probe,
                &resize_gray_pipeline(),
                Deadline::after(Duration::from_secs(30)),
            )
            .unwrap_err();
        assert!(matches!(err, AppError::DecodeFailed(_)));
    }
}
