use super::Pipeline;
use crate::media_io::MediaProbe;
use crate::operation::{Brightness, Crop, FilterKind, Operation, OutputFormat, Overlay, Resize};
use crate::raster::resize::scaled_dimensions;
use mediaform_core::{AppError, ContentHash, MediaKind, PipelineKey};

/// Query parameters the compiler understands; anything else is ignored
pub const RECOGNIZED_PARAMS: &[&str] = &[
    "width",
    "height",
    "crop",
    "format",
    "filter",
    "brightness",
    "overlay_text",
];

/// Largest width or height a resize may ask for
const MAX_OUTPUT_DIMENSION: u32 = 10_000;

/// Raw, unparsed values of the recognised request parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub width: Option<String>,
    pub height: Option<String>,
    pub crop: Option<String>,
    pub format: Option<String>,
    pub filter: Option<String>,
    pub brightness: Option<String>,
    pub overlay_text: Option<String>,
}

impl RequestOptions {
    /// Collect options from query pairs in arrival order.
    ///
    /// Unknown names are skipped; a recognised name given twice is an error
    /// even when both values agree.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut options = RequestOptions::default();
        for (name, value) in pairs {
            let name = name.as_ref();
            let slot = match name {
                "width" => &mut options.width,
                "height" => &mut options.height,
                "crop" => &mut options.crop,
                "format" => &mut options.format,
                "filter" => &mut options.filter,
                "brightness" => &mut options.brightness,
                "overlay_text" => &mut options.overlay_text,
                _ => continue,
            };
            if slot.is_some() {
                return Err(AppError::InvalidRequest(format!(
                    "parameter '{}' supplied more than once",
                    name
                )));
            }
            *slot = Some(value.into());
        }
        Ok(options)
    }

    pub fn is_empty(&self) -> bool {
        *self == RequestOptions::default()
    }
}

/// Compiler output: the pipeline and the cache key it addresses
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPipeline {
    pub pipeline: Pipeline,
    pub key: PipelineKey,
}

/// Turn request options into a validated pipeline for one probed source.
///
/// Operations come out in the fixed order resize, crop, filter, brightness,
/// overlay, format. Construction failures surface as `InvalidRequest`, crop
/// bounds failures as `InvalidCrop`.
pub fn compile(
    options: &RequestOptions,
    probe: &MediaProbe,
    source: &ContentHash,
) -> Result<CompiledPipeline, AppError> {
    let mut operations = Vec::new();

    let width = parse_dimension("width", options.width.as_deref())?;
    let height = parse_dimension("height", options.height.as_deref())?;
    let (mut current_w, mut current_h) = (probe.width, probe.height);
    if width.is_some() || height.is_some() {
        let (w, h) = scaled_dimensions(probe.width, probe.height, width, height);
        check_derived_dimension("width", w)?;
        check_derived_dimension("height", h)?;
        let resize = Resize::new(w, h).map_err(into_request_error)?;
        (current_w, current_h) = (w, h);
        operations.push(Operation::Resize(resize));
    }

    if let Some(raw) = options.crop.as_deref() {
        let crop = parse_crop(raw)?;
        if !crop.fits_within(current_w, current_h) {
            return Err(AppError::InvalidCrop(format!(
                "crop box ({},{},{},{}) exceeds {}x{} frame",
                crop.x1(),
                crop.y1(),
                crop.x2(),
                crop.y2(),
                current_w,
                current_h
            )));
        }
        operations.push(Operation::Crop(crop));
    }

    if let Some(raw) = options.filter.as_deref() {
        let kind = FilterKind::parse(raw).ok_or_else(|| {
            AppError::InvalidRequest(format!(
                "unknown filter '{}', expected grayscale or blur",
                raw
            ))
        })?;
        operations.push(Operation::Filter(kind));
    }

    if let Some(raw) = options.brightness.as_deref() {
        let factor: f32 = raw.trim().parse().map_err(|_| {
            AppError::InvalidRequest(format!("brightness '{}' is not a number", raw))
        })?;
        let brightness = Brightness::new(factor).map_err(into_request_error)?;
        operations.push(Operation::Brightness(brightness));
    }

    if let Some(raw) = options.overlay_text.as_deref() {
        let overlay = Overlay::new(raw).map_err(into_request_error)?;
        operations.push(Operation::Overlay(overlay));
    }

    if let Some(raw) = options.format.as_deref() {
        let target = OutputFormat::parse(raw).ok_or_else(|| {
            AppError::InvalidRequest(format!(
                "unsupported format '{}', allowed: {}",
                raw,
                OutputFormat::ALLOWED.join(", ")
            ))
        })?;
        operations.push(Operation::FormatConvert(target));
    }

    let default_output = match probe.kind {
        MediaKind::Image => probe.format,
        MediaKind::Video => OutputFormat::Mp4,
    };

    let pipeline = if operations.is_empty() {
        Pipeline::identity(default_output)
    } else {
        Pipeline::new(operations, default_output)?
    };
    let key = PipelineKey::derive(source, &pipeline.canonical_encoding());

    Ok(CompiledPipeline { pipeline, key })
}

fn into_request_error(err: AppError) -> AppError {
    match err {
        AppError::InvalidOperation(msg) => AppError::InvalidRequest(msg),
        other => other,
    }
}

fn parse_dimension(name: &str, raw: Option<&str>) -> Result<Option<u32>, AppError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let value: u32 = raw.trim().parse().map_err(|_| {
        AppError::InvalidRequest(format!("{} must be a positive integer, got '{}'", name, raw))
    })?;
    if value == 0 || value > MAX_OUTPUT_DIMENSION {
        return Err(AppError::InvalidRequest(format!(
            "{} must be between 1 and {}, got {}",
            name, MAX_OUTPUT_DIMENSION, value
        )));
    }
    Ok(Some(value))
}

fn check_derived_dimension(name: &str, value: u32) -> Result<(), AppError> {
    if value > MAX_OUTPUT_DIMENSION {
        return Err(AppError::InvalidRequest(format!(
            "resize would produce a {} of {}, maximum is {}",
            name, value, MAX_OUTPUT_DIMENSION
        )));
    }
    Ok(())
}

fn parse_crop(raw: &str) -> Result<Crop, AppError> {
    let malformed = || {
        AppError::InvalidRequest(format!(
            "crop must be four non-negative integers 'x1,y1,x2,y2', got '{}'",
            raw
        ))
    };

    let parts = raw
        .split(',')
        .map(|p| p.trim().parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| malformed())?;
    let [x1, y1, x2, y2] = parts[..] else {
        return Err(malformed());
    };

    Crop::new(x1, y1, x2, y2).map_err(into_request_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_probe(width: u32, height: u32) -> MediaProbe {
        MediaProbe {
            kind: MediaKind::Image,
            width,
            height,
            frame_count: None,
            frame_rate: None,
            format: OutputFormat::Png,
        }
    }

    fn compile_query(pairs: &[(&str, &str)], probe: &MediaProbe) -> Result<CompiledPipeline, AppError> {
        let options = RequestOptions::from_pairs(pairs.iter().copied())?;
        compile(&options, probe, &ContentHash::of(b"source"))
    }

    #[test]
    fn test_parameter_order_does_not_change_key() {
        let probe = image_probe(100, 100);
        let a = compile_query(&[("width", "10"), ("height", "20")], &probe).unwrap();
        let b = compile_query(&[("height", "20"), ("width", "10")], &probe).unwrap();
        assert_eq!(a.key, b.key);
        assert_eq!(a.pipeline, b.pipeline);
    }

    #[test]
    fn test_key_depends_on_source_hash() {
        let probe = image_probe(100, 100);
        let options = RequestOptions::from_pairs([("width", "10")]).unwrap();
        let a = compile(&options, &probe, &ContentHash::of(b"one")).unwrap();
        let b = compile(&options, &probe, &ContentHash::of(b"two")).unwrap();
        assert_ne!(a.key, b.key);
    }

    #[test]
    fn test_unknown_params_ignored_and_identity_returned() {
        let probe = image_probe(64, 48);
        let compiled = compile_query(&[("utm_source", "mail")], &probe).unwrap();
        assert!(compiled.pipeline.is_identity());
        assert_eq!(compiled.pipeline.output_format(), OutputFormat::Png);
    }

    #[test]
    fn test_duplicate_param_rejected() {
        let err = RequestOptions::from_pairs([("width", "10"), ("width", "10")]).unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[test]
    fn test_canonical_order_regardless_of_query_order() {
        let probe = image_probe(100, 100);
        let compiled = compile_query(
            &[
                ("format", "jpg"),
                ("overlay_text", "hi"),
                ("brightness", "1.2"),
                ("filter", "blur"),
                ("crop", "0,0,10,10"),
                ("width", "50"),
            ],
            &probe,
        )
        .unwrap();
        let names: Vec<_> = compiled
            .pipeline
            .operations()
            .iter()
            .map(Operation::name)
            .collect();
        assert_eq!(
            names,
            ["resize", "crop", "filter", "brightness", "overlay", "format"]
        );
        assert_eq!(compiled.pipeline.output_format(), OutputFormat::Jpeg);
    }

    #[test]
    fn test_single_dimension_keeps_aspect_ratio() {
        let probe = image_probe(200, 100);
        let compiled = compile_query(&[("width", "50")], &probe).unwrap();
        assert_eq!(compiled.pipeline.output_dimensions(200, 100), (50, 25));

        let compiled = compile_query(&[("height", "1")], &image_probe(1000, 10)).unwrap();
        assert_eq!(compiled.pipeline.output_dimensions(1000, 10), (100, 1));

        let compiled = compile_query(&[("width", "1")], &image_probe(10, 1000)).unwrap();
        assert_eq!(compiled.pipeline.output_dimensions(10, 1000), (1, 100));
    }

    #[test]
    fn test_derived_dimension_is_bounded() {
        let err = compile_query(&[("width", "10000")], &image_probe(2, 1000)).unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)), "{:?}", err);

        let err = compile_query(&[("height", "5000")], &image_probe(1000, 1)).unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)), "{:?}", err);

        let ok = compile_query(&[("width", "100")], &image_probe(2, 200)).unwrap();
        assert_eq!(ok.pipeline.output_dimensions(2, 200), (100, 10_000));
    }

    #[test]
    fn test_crop_out_of_bounds() {
        let err = compile_query(&[("crop", "5,5,100,100")], &image_probe(80, 200)).unwrap_err();
        assert!(matches!(err, AppError::InvalidCrop(_)));

        let ok = compile_query(&[("crop", "0,0,50,50")], &image_probe(200, 200)).unwrap();
        assert_eq!(ok.pipeline.output_dimensions(200, 200), (50, 50));
    }

    #[test]
    fn test_crop_checked_against_resize_target() {
        let probe = image_probe(200, 200);
        let err = compile_query(&[("width", "40"), ("height", "40"), ("crop", "0,0,50,50")], &probe)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCrop(_)));

        let ok = compile_query(&[("width", "100"), ("height", "100"), ("crop", "0,0,50,50")], &probe)
            .unwrap();
        assert_eq!(ok.pipeline.output_dimensions(200, 200), (50, 50));
    }

    #[test]
    fn test_malformed_values_are_invalid_request() {
        let probe = image_probe(100, 100);
        for pairs in [
            vec![("width", "-5")],
            vec![("width", "abc")],
            vec![("height", "0")],
            vec![("crop", "1,2,3")],
            vec![("crop", "10,0,5,5")],
            vec![("format", "bmp")],
            vec![("filter", "sepia")],
            vec![("brightness", "0")],
            vec![("brightness", "-1.5")],
            vec![("brightness", "bright")],
            vec![("overlay_text", "")],
        ] {
            let err = compile_query(&pairs, &probe).unwrap_err();
            assert!(
                matches!(err, AppError::InvalidRequest(_)),
                "{:?} gave {:?}",
                pairs,
                err
            );
        }
    }

    #[test]
    fn test_video_defaults_to_mp4() {
        let probe = MediaProbe {
            kind: MediaKind::Video,
            width: 320,
            height: 240,
            frame_count: Some(10),
            frame_rate: Some(25.0),
            format: OutputFormat::Mp4,
        };
        let compiled = compile_query(&[("filter", "grayscale")], &probe).unwrap();
        assert_eq!(compiled.pipeline.output_format(), OutputFormat::Mp4);
    }
}
