//! Error types for note storage and rendering.
//!
//! `StoreError` and `SanitizeError` belong to the injected host contracts;
//! `NoteError` is what `NoteStore` callers see. Store failures pass through
//! `NoteError::Store` unchanged.

use thiserror::Error;

/// Failure reported by an `OptionStore` implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// `add` was called for a key that already holds a value.
    #[error("option {key:?} already exists")]
    AlreadyExists { key: String },

    /// The backing storage failed (I/O, SQL, lock poisoning, ...).
    #[error("option store backend: {message}")]
    Backend { message: String },
}

impl StoreError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// Failure reported by an `HtmlSanitizer` or the linkifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SanitizeError {
    #[error("compile {name} pattern: {message}")]
    Pattern { name: &'static str, message: String },
}

/// Errors returned by `NoteStore` operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NoteError {
    #[error("plugin id is required")]
    MissingPluginId,

    /// `initialize` on a plugin that already has a stored value.
    #[error("notes already exist for plugin {plugin_id:?}")]
    CollectionAlreadyExists { plugin_id: String },

    #[error("no notes stored for plugin {plugin_id:?}")]
    CollectionNotFound { plugin_id: String },

    #[error("note {index:?} not found for plugin {plugin_id:?}")]
    NoteNotFound { plugin_id: String, index: String },

    /// Every suffix tried for a new index was already taken.
    #[error("no free note index at time {time} after {attempts} attempts")]
    IndexExhausted { time: i64, attempts: usize },

    /// The stored value could not be decoded (or encoded) as a note collection.
    #[error("notes for plugin {plugin_id:?} are corrupt: {message}")]
    Corrupt { plugin_id: String, message: String },

    #[error("sanitize note: {0}")]
    Sanitization(#[from] SanitizeError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl NoteError {
    /// Whether the error means the addressed collection or note does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::CollectionNotFound { .. } | Self::NoteNotFound { .. }
        )
    }
}
