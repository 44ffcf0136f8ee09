//! Mediaform Infrastructure Library
//!
//! Shared plumbing for the HTTP service:
//! - Telemetry initialization (text or JSON `tracing` output)
//! - Middleware (request ID)

pub mod middleware;
pub mod telemetry;

pub use middleware::{request_id_middleware, RequestId, REQUEST_ID_HEADER};
pub use telemetry::{init_telemetry, shutdown_telemetry, LogFormat};
