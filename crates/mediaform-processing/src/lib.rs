//! Mediaform Processing Library
//!
//! Turns request options into validated pipelines and executes them over
//! image and video sources.
//!
//! # Flow
//!
//! 1. [`MediaIo::probe`] reads a source's kind, dimensions and format.
//! 2. [`compile`] turns raw [`RequestOptions`] into a [`Pipeline`] and its
//!    [`PipelineKey`](mediaform_core::PipelineKey).
//! 3. [`TransformEngine::execute`] runs the pipeline within a [`Deadline`].
//!
//! Images are transformed in process with the `image` crate; video frames
//! are streamed through `ffmpeg`.

pub mod catalog;
pub mod deadline;
pub mod engine;
pub mod media_io;
pub mod operation;
pub mod pipeline;
mod raster;
pub mod validator;
mod video;

pub use catalog::SourceCatalog;
pub use deadline::Deadline;
pub use engine::TransformEngine;
pub use media_io::{MediaIo, MediaProbe};
pub use operation::{
    Brightness, Crop, FilterKind, Operation, OutputFormat, Overlay, Resize, MAX_OVERLAY_CHARS,
};
pub use pipeline::{compile, CompiledPipeline, Pipeline, RequestOptions, RECOGNIZED_PARAMS};
pub use raster::resize::scaled_dimensions;
pub use validator::{MediaValidator, ValidationError};
pub use video::DEFAULT_FRAME_RATE;
