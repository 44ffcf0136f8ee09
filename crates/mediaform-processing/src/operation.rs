//! Declarative transformation steps.
//!
//! Every variant validates itself on construction; the payload structs keep
//! their fields private so an `Operation` value is always usable as-is.

use image::ImageFormat;
use mediaform_core::{AppError, MediaKind};
use std::fmt;

/// Longest overlay text accepted, in characters
pub const MAX_OVERLAY_CHARS: usize = 256;

/// Output formats a pipeline may target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
    Gif,
    Mp4,
}

impl OutputFormat {
    pub const ALLOWED: &'static [&'static str] = &["jpg", "jpeg", "png", "webp", "gif", "mp4"];

    /// Parse a requested format name (`jpg` and `jpeg` are aliases)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(OutputFormat::Jpeg),
            "png" => Some(OutputFormat::Png),
            "webp" => Some(OutputFormat::WebP),
            "gif" => Some(OutputFormat::Gif),
            "mp4" => Some(OutputFormat::Mp4),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
            OutputFormat::Gif => "gif",
            OutputFormat::Mp4 => "mp4",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::WebP => "image/webp",
            OutputFormat::Gif => "image/gif",
            OutputFormat::Mp4 => "video/mp4",
        }
    }

    pub fn kind(self) -> MediaKind {
        match self {
            OutputFormat::Mp4 => MediaKind::Video,
            _ => MediaKind::Image,
        }
    }

    pub(crate) fn image_format(self) -> Option<ImageFormat> {
        match self {
            OutputFormat::Jpeg => Some(ImageFormat::Jpeg),
            OutputFormat::Png => Some(ImageFormat::Png),
            OutputFormat::WebP => Some(ImageFormat::WebP),
            OutputFormat::Gif => Some(ImageFormat::Gif),
            OutputFormat::Mp4 => None,
        }
    }

    pub(crate) fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(OutputFormat::Jpeg),
            ImageFormat::Png => Some(OutputFormat::Png),
            ImageFormat::WebP => Some(OutputFormat::WebP),
            ImageFormat::Gif => Some(OutputFormat::Gif),
            _ => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    Grayscale,
    Blur,
}

impl FilterKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "grayscale" => Some(FilterKind::Grayscale),
            "blur" => Some(FilterKind::Blur),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FilterKind::Grayscale => "grayscale",
            FilterKind::Blur => "blur",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resize {
    width: u32,
    height: u32,
}

impl Resize {
    pub fn new(width: u32, height: u32) -> Result<Self, AppError> {
        if width == 0 || height == 0 {
            return Err(AppError::InvalidOperation(format!(
                "resize dimensions must be positive, got {}x{}",
                width, height
            )));
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

/// Crop box with exclusive right/bottom edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Crop {
    x1: u32,
    y1: u32,
    x2: u32,
    y2: u32,
}

impl Crop {
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Result<Self, AppError> {
        if x1 >= x2 || y1 >= y2 {
            return Err(AppError::InvalidOperation(format!(
                "crop box ({},{},{},{}) must satisfy x1 < x2 and y1 < y2",
                x1, y1, x2, y2
            )));
        }
        Ok(Self { x1, y1, x2, y2 })
    }

    pub fn x1(&self) -> u32 {
        self.x1
    }

    pub fn y1(&self) -> u32 {
        self.y1
    }

    pub fn x2(&self) -> u32 {
        self.x2
    }

    pub fn y2(&self) -> u32 {
        self.y2
    }

    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x2 <= width && self.y2 <= height
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Brightness {
    factor: f32,
}

impl Brightness {
    pub fn new(factor: f32) -> Result<Self, AppError> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(AppError::InvalidOperation(format!(
                "brightness must be a finite number greater than 0, got {}",
                factor
            )));
        }
        Ok(Self { factor })
    }

    pub fn factor(&self) -> f32 {
        self.factor
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Overlay {
    text: String,
}

impl Overlay {
    pub fn new(text: impl Into<String>) -> Result<Self, AppError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(AppError::InvalidOperation(
                "overlay text must not be empty".to_string(),
            ));
        }
        let chars = text.chars().count();
        if chars > MAX_OVERLAY_CHARS {
            return Err(AppError::InvalidOperation(format!(
                "overlay text is {} characters, maximum is {}",
                chars, MAX_OVERLAY_CHARS
            )));
        }
        Ok(Self { text })
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// One transformation step
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Resize(Resize),
    Crop(Crop),
    Filter(FilterKind),
    Brightness(Brightness),
    Overlay(Overlay),
    FormatConvert(OutputFormat),
}

impl Operation {
    /// Position in the canonical execution order
    pub fn rank(&self) -> u8 {
        match self {
            Operation::Resize(_) => 0,
            Operation::Crop(_) => 1,
            Operation::Filter(_) => 2,
            Operation::Brightness(_) => 3,
            Operation::Overlay(_) => 4,
            Operation::FormatConvert(_) => 5,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Resize(_) => "resize",
            Operation::Crop(_) => "crop",
            Operation::Filter(_) => "filter",
            Operation::Brightness(_) => "brightness",
            Operation::Overlay(_) => "overlay",
            Operation::FormatConvert(_) => "format",
        }
    }

    /// Stable textual form used for cache keys.
    ///
    /// Overlay text is hex encoded so no user input can forge a separator.
    /// Brightness uses the shortest round-trip float repr, so "1.5" and
    /// "1.50" encode identically.
    pub fn canonical(&self) -> String {
        match self {
            Operation::Resize(r) => format!("resize:{}x{}", r.width, r.height),
            Operation::Crop(c) => format!("crop:{},{},{},{}", c.x1, c.y1, c.x2, c.y2),
            Operation::Filter(kind) => format!("filter:{}", kind.name()),
            Operation::Brightness(b) => format!("brightness:{}", b.factor),
            Operation::Overlay(o) => {
                let hex: String = o.text.bytes().map(|b| format!("{:02x}", b)).collect();
                format!("overlay:{}", hex)
            }
            Operation::FormatConvert(target) => format!("format:{}", target.name()),
        }
    }

    /// Dimensions after this step, given the dimensions before it
    pub fn output_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        match self {
            Operation::Resize(r) => (r.width, r.height),
            Operation::Crop(c) => (c.width(), c.height()),
            _ => (width, height),
        }
    }
}
