use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An error that prevented a miniature from being segmented or a similarity search from completing.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Error {
    /// The sample buffer does not hold exactly `width * height` RGB pixels.
    #[error("Pixel buffer holds {actual} samples, expected {expected} for a {width}x{height} RGB image")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    /// The image has a zero width or height.
    #[error("Image has no pixels")]
    EmptyImage,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown normalizer id: {0}")]
    UnknownNormalizer(u8),

    /// The pairwise similarity scorer failed. The search is abandoned and may be retried by the caller.
    #[error("Similarity scorer failed: {0}")]
    Scorer(String),

    #[error("Similarity search was cancelled")]
    Cancelled,

    #[error("No similarity ids left above {0}")]
    IdsExhausted(u32),
}
