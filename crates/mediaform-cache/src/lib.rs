//! Mediaform Cache Library
//!
//! Content-addressed store of transformation artifacts with single-flight
//! computation: concurrent requests for one [`PipelineKey`] share a single
//! compute and all observe its outcome.
//!
//! [`PipelineKey`]: mediaform_core::PipelineKey

mod artifact_cache;

pub use artifact_cache::{ArtifactCache, CacheStats, CacheStatus};
