/// Convenience result type used across birdview.
pub type BirdviewResult<T> = Result<T, BirdviewError>;

/// Top-level error taxonomy used by pipeline APIs.
#[derive(thiserror::Error, Debug)]
pub enum BirdviewError {
    /// Invalid user-provided configuration or frame data.
    #[error("validation error: {0}")]
    Validation(String),

    /// A frame source could not be opened or enumerated.
    #[error("source error: {0}")]
    Source(String),

    /// A single frame could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Perspective transform computation or application failed.
    #[error("transform error: {0}")]
    Transform(String),

    /// Overlay compositing failed.
    #[error("composite error: {0}")]
    Composite(String),

    /// Output sink could not be created or written.
    #[error("encode error: {0}")]
    Encode(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BirdviewError {
    /// Build a [`BirdviewError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`BirdviewError::Source`] value.
    pub fn frame_source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// Build a [`BirdviewError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`BirdviewError::Transform`] value.
    pub fn transform(msg: impl Into<String>) -> Self {
        Self::Transform(msg.into())
    }

    /// Build a [`BirdviewError::Composite`] value.
    pub fn composite(msg: impl Into<String>) -> Self {
        Self::Composite(msg.into())
    }

    /// Build a [`BirdviewError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
