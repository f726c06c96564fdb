//! notes-core: per-plugin admin notes over a host key/value option store.
//!
//! A `NoteStore` keeps every note of one plugin under a single option key and
//! runs note text through an allow-list sanitizer plus URL linkifier before it
//! is persisted. Host services are injected through traits:
//! - `OptionStore`: generic key/value persistence (`MemoryOptionStore` here,
//!   SQLite in `notes-db`)
//! - `HtmlSanitizer`: tag/attribute filtering and tag balancing
//! - `Clock` and `SuffixSource`: time and index disambiguation
//! - `NoteEventSink`: audit events for every mutation

pub mod allowed_html;
pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod linkify;
pub mod option_store;
pub mod sanitize;
pub mod store;
pub mod types;

pub use error::NoteError;
pub use store::NoteStore;
pub use types::{Note, NoteIndex, NoteView};

/// Stable crate label used for bootstrap smoke tests.
pub fn crate_label() -> &'static str {
    "notes-core"
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn crate_label_is_stable() {
        assert_eq!(crate_label(), "notes-core");
    }

    #[test]
    fn modules_are_accessible() {
        let _ = allowed_html::AllowedHtml::default();
        let _ = clock::FixedClock::new(0);
        let _ = config::Config::default();
        let _ = event::NoteEventKind::Initialize;
        let _ = option_store::MemoryOptionStore::new();
        let _ = sanitize::AllowListSanitizer;
    }
}
