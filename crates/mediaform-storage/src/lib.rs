//! Mediaform Storage Library
//!
//! Storage abstraction for uploaded originals, with a local filesystem
//! implementation.
//!
//! # Storage key format
//!
//! Every original lives at `media/{id}`, where `id` is the opaque
//! `{uuid}.{ext}` identifier handed out on upload. Keys must not contain
//! `..` or a leading `/`.

pub mod factory;
pub(crate) mod keys;
pub mod local;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::generate_storage_key;
pub use local::LocalStorage;
pub use traits::{Storage, StorageBackend, StorageError, StorageResult};
