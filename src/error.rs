use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocError {
    #[error("Invalid document record: {0}")]
    InvalidRecord(#[from] serde_json::Error),

    #[error("Failed to parse config file {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Could not load asset '{src}': {reason}")]
    Asset { src: String, reason: String },

    #[error("Failed to render PDF: {0}")]
    Render(String),

    #[error("Failed to encode content slice: {0}")]
    Encode(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DocError {
    pub(crate) fn asset(src: &str, reason: impl std::fmt::Display) -> Self {
        // Data URIs can be megabytes long; keep messages readable.
        let src = if src.chars().count() > 80 {
            let head: String = src.chars().take(80).collect();
            format!("{head}...")
        } else {
            src.to_string()
        };
        DocError::Asset {
            src,
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DocError>;
