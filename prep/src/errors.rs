//! Error type shared by every stage of the preprocessing and inference flow.
use std::path::PathBuf;

/// Everything that can go wrong between an image path and a model output.
///
/// None of these are retried: they are reported to the caller, who decides
/// whether to skip the image or abort.
#[derive(Debug, thiserror::Error)]
pub enum PrepError {
    /// The image file is missing, unreadable, or not a decodable format.
    #[error("Failed to decode image {path:?}: {source}")]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Zero-sized image or target, or a layout that does not describe three channels.
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// The engine failed to load, optimize or run the model. Carries the
    /// engine error chain.
    #[error("Inference failed: {0:#}")]
    Inference(anyhow::Error),

    #[error("Invalid normalization profile: {0}")]
    InvalidProfile(String),

    #[error("Invalid model config: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type PrepResult<T> = Result<T, PrepError>;

impl PrepError {
    pub(crate) fn shape(msg: impl Into<String>) -> PrepError {
        PrepError::ShapeMismatch(msg.into())
    }

    pub(crate) fn inference(msg: impl std::fmt::Display) -> PrepError {
        PrepError::Inference(anyhow::anyhow!("{msg}"))
    }
}
