//! Note domain types and their stored representation.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Identity of a note within its collection: `"<unix_seconds>_<suffix>"`.
///
/// Lexical order matches creation order while timestamps share a digit count.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteIndex(String);

impl NoteIndex {
    pub fn new(time: i64, suffix: u8) -> Self {
        Self(format!("{time}_{suffix}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Creation time embedded before the last `_`, if it parses.
    pub fn created_at(&self) -> Option<i64> {
        let (time, _) = self.0.rsplit_once('_')?;
        time.parse().ok()
    }
}

impl fmt::Display for NoteIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for NoteIndex {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NoteIndex {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NoteIndex {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A stored note. `text` is always the processed (sanitized, linkified) form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    #[serde(rename = "note")]
    pub text: String,
    pub icon: String,
    pub user: String,
    /// Unix seconds, UTC.
    pub time: i64,
}

impl Note {
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.time, 0).single()
    }
}

/// What readers get back: display text plus icon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteView {
    pub text: String,
    pub icon: String,
}

/// All notes of one plugin, keyed and ordered by index.
pub type NoteCollection = BTreeMap<NoteIndex, Note>;
