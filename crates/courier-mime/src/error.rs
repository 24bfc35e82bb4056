//! Error types for message construction and rendering.

use std::io;
use std::path::PathBuf;

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Message has no primary recipient.
    #[error("Message must have at least one recipient")]
    NoRecipients,

    /// Message has no sender.
    #[error("Message must have a sender")]
    MissingSender,

    /// Invalid content type.
    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// Attachment source could not be read.
    #[error("Cannot read attachment {}: {source}", path.display())]
    AttachmentRead {
        /// Path of the attachment source.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Returns true if this error was caused by invalid caller input.
    #[must_use]
    pub const fn is_argument(&self) -> bool {
        matches!(
            self,
            Self::InvalidAddress(_) | Self::NoRecipients | Self::MissingSender
        )
    }
}
