use thiserror::Error;
use std::io;
use std::path::PathBuf;

/// Error types for the fractal family crate.
///
/// The analysis core never returns these for image content problems
/// (too little foreground, too few scales, malformed feature records); those
/// are encoded in the returned records. These errors belong to the
/// surrounding surfaces: configuration, feature-record parsing and output.
#[derive(Error, Debug)]
pub enum FractalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load configuration from {path}: {source}")]
    ConfigLoad {
        source: toml::de::Error,
        path: PathBuf,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV output error: {0}")]
    CsvOutput(#[from] csv::Error),

    #[error("Malformed feature input '{feature}': {reason}")]
    MalformedFeatureInput {
        feature: String,
        reason: String,
    },
}

/// Type alias for Result with our custom error type
pub type Result<T> = std::result::Result<T, FractalError>;
