//! The host key/value option store contract and an in-memory implementation.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::error::StoreError;

/// Generic persistent key/value store provided by the host.
///
/// Values are opaque strings. An empty string is a legitimate stored value and
/// must be distinguishable from an absent key.
pub trait OptionStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Insert `key`, failing with `StoreError::AlreadyExists` if it is present.
    fn add(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Insert or replace `key`.
    fn update(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`; removing an absent key is not an error.
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// A recorded write against `MemoryOptionStore`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Add(String),
    Update(String),
    Delete(String),
}

/// Mutex-guarded in-memory option store.
#[derive(Debug, Default)]
pub struct MemoryOptionStore {
    options: Mutex<BTreeMap<String, String>>,
    calls: Mutex<Vec<StoreCall>>,
    write_error: Mutex<Option<StoreError>>,
}

impl MemoryOptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate an option.
    pub fn with_option(self, key: &str, value: &str) -> Self {
        self.lock_options().insert(key.to_string(), value.to_string());
        self
    }

    /// Make the next write (`add`, `update` or `delete`) fail with `err`.
    pub fn with_write_error(self, err: StoreError) -> Self {
        match self.write_error.lock() {
            Ok(mut slot) => *slot = Some(err),
            Err(poisoned) => *poisoned.into_inner() = Some(err),
        }
        self
    }

    /// Current raw value of `key`.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.lock_options().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock_options().keys().cloned().collect()
    }

    /// Writes performed so far, in order.
    pub fn calls(&self) -> Vec<StoreCall> {
        match self.calls.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn lock_options(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        match self.options.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn begin_write(&self, call: StoreCall) -> Result<(), StoreError> {
        match self.calls.lock() {
            Ok(mut guard) => guard.push(call),
            Err(poisoned) => poisoned.into_inner().push(call),
        }
        let pending = match self.write_error.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match pending {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl OptionStore for MemoryOptionStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.lock_options().get(key).cloned())
    }

    fn add(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.begin_write(StoreCall::Add(key.to_string()))?;
        let mut options = self.lock_options();
        if options.contains_key(key) {
            return Err(StoreError::AlreadyExists {
                key: key.to_string(),
            });
        }
        options.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn update(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.begin_write(StoreCall::Update(key.to_string()))?;
        self.lock_options()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.begin_write(StoreCall::Delete(key.to_string()))?;
        self.lock_options().remove(key);
        Ok(())
    }
}
