use mediaform_core::models::extension_of;
use mediaform_core::{AppError, Config, MediaKind};

/// Upload validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Invalid file extension: {extension} (allowed: {allowed:?})")]
    InvalidExtension {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("Invalid content type: {content_type} for extension '{extension}'")]
    InvalidContentType {
        content_type: String,
        extension: String,
    },

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Empty file")]
    EmptyFile,
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::FileTooLarge { .. } => AppError::PayloadTooLarge(err.to_string()),
            _ => AppError::InvalidRequest(err.to_string()),
        }
    }
}

/// Validates uploads of one media kind against its size limit and
/// extension allow-list
#[derive(Debug, Clone)]
pub struct MediaValidator {
    kind: MediaKind,
    max_file_size: usize,
    allowed_extensions: Vec<String>,
}

impl MediaValidator {
    pub fn new(kind: MediaKind, max_file_size: usize, allowed_extensions: Vec<String>) -> Self {
        Self {
            kind,
            max_file_size,
            allowed_extensions,
        }
    }

    pub fn for_kind(kind: MediaKind, config: &Config) -> Self {
        match kind {
            MediaKind::Image => Self::new(
                kind,
                config.max_file_size_bytes,
                config.image_allowed_extensions.clone(),
            ),
            MediaKind::Video => Self::new(
                kind,
                config.max_video_size_bytes,
                config.video_allowed_extensions.clone(),
            ),
        }
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn validate_file_size(&self, size: usize) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }

        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    /// Check the extension and return it lowercased
    pub fn validate_extension(&self, filename: &str) -> Result<String, ValidationError> {
        let extension = extension_of(filename)
            .ok_or_else(|| ValidationError::InvalidFilename(filename.to_string()))?;

        if !self.allowed_extensions.contains(&extension) {
            return Err(ValidationError::InvalidExtension {
                extension,
                allowed: self.allowed_extensions.clone(),
            });
        }

        Ok(extension)
    }

    /// Reject a declared content type that contradicts the extension.
    /// Generic types are accepted since many clients send nothing better.
    pub fn validate_content_type(
        &self,
        extension: &str,
        content_type: &str,
    ) -> Result<(), ValidationError> {
        let normalized = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        if normalized.is_empty() || normalized == "application/octet-stream" {
            return Ok(());
        }

        let expected: &[&str] = match extension {
            "jpg" | "jpeg" => &["image/jpeg", "image/jpg"],
            "png" => &["image/png"],
            "gif" => &["image/gif"],
            "webp" => &["image/webp"],
            "mp4" => &["video/mp4"],
            _ => {
                tracing::debug!(
                    extension = %extension,
                    content_type = %content_type,
                    "Unknown extension, skipping Content-Type/extension cross-validation"
                );
                return Ok(());
            }
        };

        if !expected.contains(&normalized.as_str()) {
            return Err(ValidationError::InvalidContentType {
                content_type: content_type.to_string(),
                extension: extension.to_string(),
            });
        }

        Ok(())
    }

    /// Validate every aspect of an upload, returning the lowercased extension
    pub fn validate_all(
        &self,
        filename: &str,
        content_type: Option<&str>,
        file_size: usize,
    ) -> Result<String, ValidationError> {
        self.validate_file_size(file_size)?;
        let extension = self.validate_extension(filename)?;
        if let Some(content_type) = content_type {
            self.validate_content_type(&extension, content_type)?;
        }
        Ok(extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_validator() -> MediaValidator {
        MediaValidator::new(
            MediaKind::Image,
            1024,
            vec!["jpg".into(), "jpeg".into(), "png".into()],
        )
    }

    #[test]
    fn test_validate_file_size() {
        let validator = image_validator();
        assert!(validator.validate_file_size(512).is_ok());
        assert!(matches!(
            validator.validate_file_size(0),
            Err(ValidationError::EmptyFile)
        ));
        assert!(matches!(
            validator.validate_file_size(2048),
            Err(ValidationError::FileTooLarge { .. })
        ));
    }

    #[test]
    fn test_validate_extension() {
        let validator = image_validator();
        assert_eq!(validator.validate_extension("photo.JPG").unwrap(), "jpg");
        assert!(matches!(
            validator.validate_extension("clip.mp4"),
            Err(ValidationError::InvalidExtension { .. })
        ));
        assert!(matches!(
            validator.validate_extension("noextension"),
            Err(ValidationError::InvalidFilename(_))
        ));
    }

    #[test]
    fn test_content_type_must_match_extension() {
        let validator = image_validator();
        assert!(validator.validate_content_type("png", "image/png").is_ok());
        assert!(validator
            .validate_content_type("png", "application/octet-stream")
            .is_ok());
        assert!(matches!(
            validator.validate_content_type("png", "text/html"),
            Err(ValidationError::InvalidContentType { .. })
        ));
    }

    #[test]
    fn test_validation_error_status_mapping() {
        let too_large: AppError = ValidationError::FileTooLarge { size: 2, max: 1 }.into();
        assert!(matches!(too_large, AppError::PayloadTooLarge(_)));
        let empty: AppError = ValidationError::EmptyFile.into();
        assert!(matches!(empty, AppError::InvalidRequest(_)));
    }

    #[test]
    fn test_video_limits_come_from_config() {
        let config = Config::default();
        let validator = MediaValidator::for_kind(MediaKind::Video, &config);
        assert_eq!(validator.kind(), MediaKind::Video);
        assert!(validator.validate_all("clip.mp4", Some("video/mp4"), 10).is_ok());
        assert!(validator.validate_all("clip.png", None, 10).is_err());
    }
}
