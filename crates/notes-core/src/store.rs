//! `NoteStore`: the notes of one plugin, kept under a single option key.
//!
//! Every mutation is an unlocked read-modify-write of the whole collection.
//! Independent writers against the same plugin can lose updates; callers that
//! need stronger guarantees serialize access themselves.

use std::collections::BTreeMap;

use crate::allowed_html::AllowedHtml;
use crate::clock::{Clock, SuffixSource, SystemClock, ThreadRngSuffix};
use crate::error::{NoteError, StoreError};
use crate::event::{NoteEvent, NoteEventKind, NoteEventOutcome, NoteEventSink, NullEventSink};
use crate::option_store::OptionStore;
use crate::sanitize::{self, AllowListSanitizer, HtmlSanitizer};
use crate::types::{Note, NoteCollection, NoteIndex, NoteView};

/// How many suffixes are tried before giving up on a same-second index.
pub const MAX_INDEX_ATTEMPTS: usize = 10;

pub struct NoteStore<'a> {
    plugin_id: String,
    allowed: AllowedHtml,
    options: &'a dyn OptionStore,
    sanitizer: &'a dyn HtmlSanitizer,
    clock: &'a dyn Clock,
    suffixes: &'a dyn SuffixSource,
    events: &'a dyn NoteEventSink,
}

impl<'a> NoteStore<'a> {
    /// Notes for `plugin_id` with the default allow-list, system clock, random
    /// suffixes and no event sink.
    pub fn new(plugin_id: &str, options: &'a dyn OptionStore) -> Result<Self, NoteError> {
        let plugin_id = plugin_id.trim();
        if plugin_id.is_empty() {
            return Err(NoteError::MissingPluginId);
        }
        Ok(Self {
            plugin_id: plugin_id.to_string(),
            allowed: AllowedHtml::default(),
            options,
            sanitizer: &AllowListSanitizer,
            clock: &SystemClock,
            suffixes: &ThreadRngSuffix,
            events: &NullEventSink,
        })
    }

    /// Pass the current allow-list through `filter` and keep the result.
    pub fn with_allowed_html_filter<F>(mut self, filter: F) -> Self
    where
        F: FnOnce(AllowedHtml) -> AllowedHtml,
    {
        self.allowed = filter(self.allowed);
        self
    }

    pub fn with_sanitizer(mut self, sanitizer: &'a dyn HtmlSanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn with_clock(mut self, clock: &'a dyn Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_suffix_source(mut self, suffixes: &'a dyn SuffixSource) -> Self {
        self.suffixes = suffixes;
        self
    }

    pub fn with_event_sink(mut self, events: &'a dyn NoteEventSink) -> Self {
        self.events = events;
        self
    }

    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    pub fn allowed_html(&self) -> &AllowedHtml {
        &self.allowed
    }

    /// Whether the plugin has notes.
    ///
    /// An explicitly stored empty string counts as "has notes". Any other
    /// value, whitespace included, must decode as a collection.
    pub fn has_notes(&self) -> Result<bool, NoteError> {
        match self.options.get(&self.plugin_id)? {
            None => Ok(false),
            Some(raw) if raw.is_empty() => Ok(true),
            Some(raw) => Ok(!self.decode(&raw)?.is_empty()),
        }
    }

    /// One note, with its text re-processed for display.
    pub fn get_note(&self, index: &str) -> Result<NoteView, NoteError> {
        let notes = self.load()?.ok_or_else(|| self.collection_not_found())?;
        let note = notes.get(index).ok_or_else(|| self.note_not_found(index))?;
        self.view(note)
    }

    /// Every note, ordered by index, with text re-processed for display.
    pub fn get_all_notes(&self) -> Result<BTreeMap<NoteIndex, NoteView>, NoteError> {
        let Some(notes) = self.load()? else {
            return Ok(BTreeMap::new());
        };
        notes
            .iter()
            .map(|(index, note)| Ok((index.clone(), self.view(note)?)))
            .collect()
    }

    /// Stored records as persisted, including author and time.
    pub fn notes(&self) -> Result<NoteCollection, NoteError> {
        Ok(self.load()?.unwrap_or_default())
    }

    /// Create the collection with its first note.
    ///
    /// Fails with `CollectionAlreadyExists` if anything is stored for the
    /// plugin, including the empty-string marker.
    pub fn initialize(&self, text: &str, icon: &str, user: &str) -> Result<NoteIndex, NoteError> {
        let result = self.initialize_inner(text, icon, user);
        self.emit(NoteEventKind::Initialize, user, &result);
        result
    }

    /// Add a note to an existing collection.
    pub fn append(&self, text: &str, icon: &str, user: &str) -> Result<NoteIndex, NoteError> {
        let result = self.append_inner(text, icon, user);
        self.emit(NoteEventKind::Append, user, &result);
        result
    }

    /// Initialize when nothing is stored yet, append otherwise.
    pub fn add_note(&self, text: &str, icon: &str, user: &str) -> Result<NoteIndex, NoteError> {
        if self.options.get(&self.plugin_id)?.is_some() {
            self.append(text, icon, user)
        } else {
            self.initialize(text, icon, user)
        }
    }

    /// Replace text, icon and author of the note at `index`.
    ///
    /// The index and the creation time embedded in it are kept.
    pub fn edit(
        &self,
        text: &str,
        icon: &str,
        index: &str,
        user: &str,
    ) -> Result<NoteIndex, NoteError> {
        let result = self.edit_inner(text, icon, index, user);
        match &result {
            Ok(index) => self.record(NoteEventKind::Edit, Some(index.as_str()), user, Ok(true)),
            Err(err) => self.record(NoteEventKind::Edit, Some(index), user, Err(err)),
        }
        result
    }

    /// Remove the note at `index`. Returns `false` when there was nothing to
    /// remove. Removing the last note deletes the option key.
    pub fn delete(&self, index: &str) -> Result<bool, NoteError> {
        let result = self.delete_inner(index);
        self.record(
            NoteEventKind::Delete,
            Some(index),
            "",
            result.as_ref().map(|removed| *removed),
        );
        result
    }

    /// Delete the whole collection. Returns whether anything was stored.
    pub fn purge(&self) -> Result<bool, NoteError> {
        let result = self.purge_inner();
        self.record(
            NoteEventKind::Purge,
            None,
            "",
            result.as_ref().map(|removed| *removed),
        );
        result
    }

    /// Sanitize, balance, unslash and linkify incoming `text` with this
    /// store's allow-list.
    pub fn process_note(&self, text: &str) -> Result<String, NoteError> {
        Ok(sanitize::process_note(self.sanitizer, &self.allowed, text)?)
    }

    /// Re-render already stored text for display. Never unslashes.
    pub fn render_note(&self, stored: &str) -> Result<String, NoteError> {
        Ok(sanitize::render_note(self.sanitizer, &self.allowed, stored)?)
    }

    fn initialize_inner(&self, text: &str, icon: &str, user: &str) -> Result<NoteIndex, NoteError> {
        if self.options.get(&self.plugin_id)?.is_some() {
            return Err(self.already_exists());
        }
        let time = self.clock.now();
        let mut notes = NoteCollection::new();
        let index = self.allocate_index(&notes, time)?;
        notes.insert(index.clone(), self.build_note(text, icon, user, time)?);

        let encoded = self.encode(&notes)?;
        tracing::debug!(plugin_id = %self.plugin_id, %index, "initializing notes");
        match self.options.add(&self.plugin_id, &encoded) {
            Ok(()) => Ok(index),
            Err(StoreError::AlreadyExists { .. }) => Err(self.already_exists()),
            Err(err) => Err(err.into()),
        }
    }

    fn append_inner(&self, text: &str, icon: &str, user: &str) -> Result<NoteIndex, NoteError> {
        let mut notes = self.load()?.ok_or_else(|| self.collection_not_found())?;
        let time = self.clock.now();
        let index = self.allocate_index(&notes, time)?;
        notes.insert(index.clone(), self.build_note(text, icon, user, time)?);

        tracing::debug!(plugin_id = %self.plugin_id, %index, count = notes.len(), "appending note");
        self.options
            .update(&self.plugin_id, &self.encode(&notes)?)?;
        Ok(index)
    }

    fn edit_inner(
        &self,
        text: &str,
        icon: &str,
        index: &str,
        user: &str,
    ) -> Result<NoteIndex, NoteError> {
        let mut notes = self.load()?.ok_or_else(|| self.collection_not_found())?;
        let index = NoteIndex::from(index);
        let existing = notes
            .get(&index)
            .ok_or_else(|| self.note_not_found(index.as_str()))?;
        let time = index.created_at().unwrap_or(existing.time);
        let note = self.build_note(text, icon, user, time)?;
        notes.insert(index.clone(), note);

        tracing::debug!(plugin_id = %self.plugin_id, %index, "editing note");
        self.options
            .update(&self.plugin_id, &self.encode(&notes)?)?;
        Ok(index)
    }

    fn delete_inner(&self, index: &str) -> Result<bool, NoteError> {
        let Some(mut notes) = self.load()? else {
            return Ok(false);
        };
        if notes.remove(index).is_none() {
            tracing::debug!(plugin_id = %self.plugin_id, index, "delete of missing note ignored");
            return Ok(false);
        }

        if notes.is_empty() {
            tracing::debug!(plugin_id = %self.plugin_id, index, "last note deleted, removing option");
            self.options.delete(&self.plugin_id)?;
        } else {
            tracing::debug!(plugin_id = %self.plugin_id, index, remaining = notes.len(), "note deleted");
            self.options
                .update(&self.plugin_id, &self.encode(&notes)?)?;
        }
        Ok(true)
    }

    fn purge_inner(&self) -> Result<bool, NoteError> {
        if self.options.get(&self.plugin_id)?.is_none() {
            return Ok(false);
        }
        self.options.delete(&self.plugin_id)?;
        Ok(true)
    }

    fn build_note(&self, text: &str, icon: &str, user: &str, time: i64) -> Result<Note, NoteError> {
        Ok(Note {
            text: self.process_note(text)?,
            icon: icon.to_string(),
            user: user.to_string(),
            time,
        })
    }

    fn view(&self, note: &Note) -> Result<NoteView, NoteError> {
        Ok(NoteView {
            text: self.render_note(&note.text)?,
            icon: note.icon.clone(),
        })
    }

    fn allocate_index(&self, notes: &NoteCollection, time: i64) -> Result<NoteIndex, NoteError> {
        for _ in 0..MAX_INDEX_ATTEMPTS {
            let index = NoteIndex::new(time, self.suffixes.next_suffix());
            if !notes.contains_key(&index) {
                return Ok(index);
            }
        }
        Err(NoteError::IndexExhausted {
            time,
            attempts: MAX_INDEX_ATTEMPTS,
        })
    }

    /// `None` when nothing is stored; an empty collection for the empty marker.
    fn load(&self) -> Result<Option<NoteCollection>, NoteError> {
        match self.options.get(&self.plugin_id)? {
            None => Ok(None),
            Some(raw) if raw.is_empty() => Ok(Some(NoteCollection::new())),
            Some(raw) => self.decode(&raw).map(Some),
        }
    }

    fn decode(&self, raw: &str) -> Result<NoteCollection, NoteError> {
        serde_json::from_str(raw).map_err(|err| NoteError::Corrupt {
            plugin_id: self.plugin_id.clone(),
            message: err.to_string(),
        })
    }

    fn encode(&self, notes: &NoteCollection) -> Result<String, NoteError> {
        serde_json::to_string(notes).map_err(|err| NoteError::Corrupt {
            plugin_id: self.plugin_id.clone(),
            message: err.to_string(),
        })
    }

    fn emit(&self, kind: NoteEventKind, user: &str, result: &Result<NoteIndex, NoteError>) {
        match result {
            Ok(index) => self.record(kind, Some(index.as_str()), user, Ok(true)),
            Err(err) => self.record(kind, None, user, Err(err)),
        }
    }

    fn record(
        &self,
        kind: NoteEventKind,
        index: Option<&str>,
        user: &str,
        result: Result<bool, &NoteError>,
    ) {
        let outcome = match result {
            Ok(true) => NoteEventOutcome::Success,
            Ok(false) => NoteEventOutcome::Unchanged,
            Err(err) => {
                tracing::warn!(plugin_id = %self.plugin_id, %kind, error = %err, "note operation failed");
                NoteEventOutcome::Error(err.to_string())
            }
        };
        let mut event = NoteEvent::new(self.plugin_id.clone(), kind, outcome);
        if let Some(index) = index {
            event = event.with_index(index);
        }
        if !user.is_empty() {
            event = event.with_user(user);
        }
        self.events.record(event);
    }

    fn already_exists(&self) -> NoteError {
        NoteError::CollectionAlreadyExists {
            plugin_id: self.plugin_id.clone(),
        }
    }

    fn collection_not_found(&self) -> NoteError {
        NoteError::CollectionNotFound {
            plugin_id: self.plugin_id.clone(),
        }
    }

    fn note_not_found(&self, index: &str) -> NoteError {
        NoteError::NoteNotFound {
            plugin_id: self.plugin_id.clone(),
            index: index.to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::clock::{FixedClock, ScriptedSuffix};
    use crate::option_store::MemoryOptionStore;

    #[test]
    fn blank_plugin_id_is_rejected() {
        let options = MemoryOptionStore::new();
        assert!(matches!(
            NoteStore::new("  ", &options),
            Err(NoteError::MissingPluginId)
        ));
    }

    #[test]
    fn allocate_index_skips_taken_suffixes() {
        let options = MemoryOptionStore::new();
        let suffixes = ScriptedSuffix::new(&[42, 42, 43]);
        let store = NoteStore::new("p", &options)
            .unwrap()
            .with_suffix_source(&suffixes);
        let mut notes = NoteCollection::new();
        notes.insert(
            NoteIndex::new(7, 42),
            Note {
                text: String::new(),
                icon: String::new(),
                user: String::new(),
                time: 7,
            },
        );
        assert_eq!(store.allocate_index(&notes, 7).unwrap().as_str(), "7_43");
    }

    #[test]
    fn allocate_index_gives_up_after_max_attempts() {
        let options = MemoryOptionStore::new();
        let suffixes = ScriptedSuffix::new(&[42]);
        let clock = FixedClock::new(7);
        let store = NoteStore::new("p", &options)
            .unwrap()
            .with_suffix_source(&suffixes)
            .with_clock(&clock);
        let mut notes = NoteCollection::new();
        notes.insert(
            NoteIndex::new(7, 42),
            Note {
                text: String::new(),
                icon: String::new(),
                user: String::new(),
                time: 7,
            },
        );
        assert_eq!(
            store.allocate_index(&notes, 7).unwrap_err(),
            NoteError::IndexExhausted {
                time: 7,
                attempts: MAX_INDEX_ATTEMPTS
            }
        );
    }
}
