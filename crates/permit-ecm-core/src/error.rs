//! Error types for attachment synchronization.
//!
//! Every fallible core operation returns [`Result`]. Optional categories that
//! do not apply (a folder without a tax account) are expressed as `Ok(None)`
//! and never surface here.

use thiserror::Error;

/// Boxed error used to carry collaborator failures without losing the source.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type alias using the core [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for attachment synchronization.
#[derive(Error, Debug)]
pub enum Error {
    /// A required source row or ECM root path is absent.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller-supplied data violates a precondition.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The category template could not be fetched from the content server.
    #[error("Failed to fetch category template {category_id}: {source}")]
    Template {
        category_id: i64,
        #[source]
        source: BoxError,
    },

    /// A remote category template does not match the named schema.
    #[error("Category schema mismatch: {0}")]
    Schema(String),

    /// A content-server or metadata-source call failed at the transport layer.
    #[error("Transport error: {0}")]
    Transport(#[source] BoxError),

    /// The parent folder for an attachment could not be resolved.
    #[error("Unable to resolve parent folder for attachment {attachment_id}: {source}")]
    FolderResolution {
        attachment_id: i64,
        #[source]
        source: Box<Error>,
    },

    /// Temp-file or stream I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap any collaborator error as [`Error::Transport`].
    pub fn transport<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Error::Transport(err.into())
    }

    /// Whether this error (or the resolution failure it wraps) is a
    /// [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound(_) => true,
            Error::FolderResolution { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Transport(Box::new(e))
    }
}
