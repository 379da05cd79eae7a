//! Error types and handling for AssetPipe

use std::path::PathBuf;
use thiserror::Error;

use crate::processing::formats::supported_extensions;

/// Result type alias for AssetPipe operations
pub type Result<T> = std::result::Result<T, AssetPipeError>;

/// Main error type for AssetPipe operations
#[derive(Debug, Error)]
pub enum AssetPipeError {
    /// I/O related errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Image decoding or encoding errors
    #[error("Image processing error: {0}")]
    ImageError(#[from] image::ImageError),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Path that was expected to exist does not
    #[error("Path not found: {path:?}")]
    NotFound { path: PathBuf },

    /// Symbolic link loop found while walking the input tree
    #[error("Symbolic link cycle detected at {path:?} (points back to {ancestor:?})")]
    CycleDetected { path: PathBuf, ancestor: PathBuf },

    /// Directory traversal error other than a cycle
    #[error("Failed to walk {path:?}: {message}")]
    WalkError { path: PathBuf, message: String },

    /// File format not supported
    #[error("Unsupported image format: {format} (file: {file:?})")]
    UnsupportedFormat {
        format: String,
        file: Option<PathBuf>,
    },

    /// Path lies outside the configured input root
    #[error("Path {path:?} is not inside input root {root:?}")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    /// Two planned variants resolve to the same output file
    #[error("Output {path:?} is already produced by {claimed_by:?}")]
    OutputCollision { path: PathBuf, claimed_by: PathBuf },

    /// Codec failure (decode, resize or encode)
    #[error("Codec error: {message} (file: {file:?})")]
    CodecError {
        message: String,
        file: Option<PathBuf>,
    },

    /// Invalid parameters handed to the pipeline
    #[error("Invalid parameters: {message}")]
    InvalidParameters { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    SerdeError(String),
}

impl AssetPipeError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new not-found error
    pub fn not_found(path: PathBuf) -> Self {
        Self::NotFound { path }
    }

    /// Create a new unsupported format error
    pub fn unsupported_format<S: Into<String>>(format: S, file: Option<PathBuf>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
            file,
        }
    }

    /// Create a new codec error
    pub fn codec<S: Into<String>>(message: S, file: Option<PathBuf>) -> Self {
        Self::CodecError {
            message: message.into(),
            file,
        }
    }

    /// Create a new invalid parameters error
    pub fn invalid_parameters<S: Into<String>>(message: S) -> Self {
        Self::InvalidParameters {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::IoError(e) => format!("File system error: {}", e),
            Self::ImageError(e) => format!("Image processing failed: {}", e),
            Self::UnsupportedFormat { format, .. } => {
                format!(
                    "Unsupported image format: {}. Supported extensions: {}",
                    format,
                    supported_extensions().join(", ")
                )
            }
            Self::NotFound { path } => format!("{} does not exist", path.display()),
            Self::CycleDetected { path, ancestor } => format!(
                "Symbolic link {} loops back to {}; remove the link or disable symlink following",
                path.display(),
                ancestor.display()
            ),
            Self::OutputCollision { path, claimed_by } => format!(
                "{} would overwrite output already planned for {}",
                path.display(),
                claimed_by.display()
            ),
            other => other.to_string(),
        }
    }
}

// Convert serde errors to our error type
impl From<toml::de::Error> for AssetPipeError {
    fn from(err: toml::de::Error) -> Self {
        Self::SerdeError(format!("TOML parsing error: {}", err))
    }
}

impl From<serde_yaml::Error> for AssetPipeError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::SerdeError(format!("YAML parsing error: {}", err))
    }
}

impl From<walkdir::Error> for AssetPipeError {
    fn from(err: walkdir::Error) -> Self {
        let path = err.path().map(PathBuf::from).unwrap_or_default();

        if let Some(ancestor) = err.loop_ancestor() {
            return Self::CycleDetected {
                path,
                ancestor: ancestor.to_path_buf(),
            };
        }

        if let Some(io) = err.io_error() {
            if err.depth() == 0 && io.kind() == std::io::ErrorKind::NotFound {
                return Self::NotFound { path };
            }
        }

        Self::WalkError {
            path,
            message: err.to_string(),
        }
    }
}

/// Error context extension for adding file path information
pub trait ErrorContext<T> {
    /// Add file context to an error
    fn with_file_context(self, file: PathBuf) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<AssetPipeError>,
{
    fn with_file_context(self, file: PathBuf) -> Result<T> {
        self.map_err(|e| match e.into() {
            AssetPipeError::ImageError(err) => AssetPipeError::CodecError {
                message: err.to_string(),
                file: Some(file),
            },
            AssetPipeError::IoError(err) => AssetPipeError::IoError(std::io::Error::new(
                err.kind(),
                format!("{}: {}", file.display(), err),
            )),
            mut error => {
                match &mut error {
                    AssetPipeError::UnsupportedFormat { file: f, .. }
                    | AssetPipeError::CodecError { file: f, .. } => {
                        if f.is_none() {
                            *f = Some(file);
                        }
                    }
                    _ => {}
                }
                error
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_error_creation() {
        let err = AssetPipeError::config("test message");
        assert!(matches!(err, AssetPipeError::ConfigError { .. }));
    }

    #[test]
    fn test_user_messages_name_the_path() {
        let msg = AssetPipeError::not_found(PathBuf::from("assets/img")).user_message();
        assert_eq!(msg, "assets/img does not exist");

        let msg = AssetPipeError::OutputCollision {
            path: PathBuf::from("out/photo-mobile.webp"),
            claimed_by: PathBuf::from("photo.jpg"),
        }
        .user_message();
        assert!(msg.contains("out/photo-mobile.webp"));
        assert!(msg.contains("photo.jpg"));
    }

    #[test]
    fn test_user_messages() {
        let err = AssetPipeError::unsupported_format("BMP", None);
        let msg = err.user_message();
        assert!(msg.contains("Unsupported image format"));
        assert!(msg.contains(".jpg, .jpeg, .png"));
    }

    #[test]
    fn test_file_context_fills_missing_path() {
        let result: Result<()> = Err(AssetPipeError::codec("bad header", None));
        let err = result
            .with_file_context(Path::new("photo.png").to_path_buf())
            .unwrap_err();

        match err {
            AssetPipeError::CodecError { file, .. } => {
                assert_eq!(file, Some(PathBuf::from("photo.png")))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_file_context_wraps_io_errors() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        let err = result
            .with_file_context(PathBuf::from("out/a.jpg"))
            .unwrap_err();

        assert!(err.to_string().contains("out/a.jpg"));
        assert!(matches!(err, AssetPipeError::IoError(_)));
        assert!(err.user_message().starts_with("File system error"));
    }
}
