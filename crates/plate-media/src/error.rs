use plate_core::CommandError;
use thiserror::Error;

use crate::media::{EmbedError, MediaKind};
use crate::paste::TranslateError;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("invalid asset reference: {0}")]
    InvalidAssetReference(#[from] EmbedError),

    #[error("malformed markup input: {0}")]
    MalformedMarkup(#[from] TranslateError),

    #[error("{kind} nodes cannot be rotated")]
    RotationUnsupported { kind: MediaKind },

    #[error("no media node bound at {path:?}")]
    NotBound { path: Vec<usize> },

    #[error("duplicate renderer for node kind `{0}`")]
    DuplicateRenderer(String),

    #[error("plugin registration failed: {0}")]
    Registration(String),

    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("engine command failed: {0}")]
    Engine(#[from] CommandError),
}
