//! Shared key generation for storage backends.

/// Storage key for an asset id: `media/{id}`.
pub fn generate_storage_key(id: &str) -> String {
    format!("media/{}", id)
}
