//! Mediaform Core Library
//!
//! This crate provides the domain models, error taxonomy and configuration
//! shared by every Mediaform component.

pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{Artifact, ContentHash, MediaKind, PipelineKey, SourceAsset};
