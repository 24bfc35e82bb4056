//! File attachments.

use crate::content_type::ContentType;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// A file attached to a message.
///
/// Only the path is stored; the content is read from disk each time the
/// message is rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    path: PathBuf,
    name: String,
    content_type: ContentType,
}

impl Attachment {
    /// Creates an attachment for `path` shown to recipients as `name`.
    ///
    /// An empty `name` falls back to the file name of `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        let path = path.into();
        let mut name = name.into();
        if name.is_empty() {
            name = file_name(&path);
        }
        let content_type = ContentType::from_path(&path);

        Self {
            path,
            name,
            content_type,
        }
    }

    /// Creates an attachment named after its file.
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::new(path, String::new())
    }

    /// Overrides the detected content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the source path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the content type derived from the file extension.
    #[must_use]
    pub const fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    /// Reads the full attachment content.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AttachmentRead`] if the file cannot be read.
    pub fn read(&self) -> Result<Vec<u8>> {
        std::fs::read(&self.path).map_err(|source| Error::AttachmentRead {
            path: self.path.clone(),
            source,
        })
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
