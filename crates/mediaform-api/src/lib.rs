//! Mediaform API Library
//!
//! This crate provides the HTTP handlers, the transform service and
//! application setup.

mod handlers;
mod services;

pub mod error;
pub mod setup;
pub mod state;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use services::transform::{transform, TransformOutcome};
pub use state::AppState;
