//! Error type for haze synthesis

use shared::image_proc::ImageIoError;
use thiserror::Error;

/// Errors raised by the haze synthesis core and its filesystem collaborators
#[derive(Error, Debug)]
pub enum HazeError {
    /// A compositor, generator or sampler argument violated its contract
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// An input image could not be decoded; batches skip it and continue
    #[error("Unreadable input '{name}': {reason}")]
    UnreadableInput { name: String, reason: String },

    #[error("Unknown haze profile '{0}'")]
    UnknownProfile(String),

    /// A profile table entry is malformed
    #[error("Invalid haze profile: {0}")]
    InvalidProfile(String),

    #[error(transparent)]
    Io(#[from] ImageIoError),

    #[error("Profile table JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HazeError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }
}
