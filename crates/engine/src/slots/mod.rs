use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

mod atomic_io;
mod file_store;
mod hashing;
mod manifest;

pub use file_store::FileSaveStore;

pub const MAX_NAME_LEN: usize = 64;

/// Opaque key-value persistence for save payloads. Implementations never
/// look inside the payload.
pub trait SaveTransport {
    /// `Ok(None)` when the slot has never been written.
    fn get(&self, user: &str, slot: &str) -> Result<Option<String>, SlotStoreError>;
    fn put(&mut self, user: &str, slot: &str, payload: &str) -> Result<(), SlotStoreError>;
}

#[derive(Debug, Error)]
pub enum SlotStoreError {
    #[error("invalid {field} name {value:?}: use 1-{} characters from [A-Za-z0-9_-]", MAX_NAME_LEN)]
    InvalidName { field: &'static str, value: String },
    #[error("save slot I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("save slot at {path} is corrupt: {message}")]
    Corrupt { path: PathBuf, message: String },
}

pub fn validate_slot_name(field: &'static str, value: &str) -> Result<(), SlotStoreError> {
    let valid = !value.is_empty()
        && value.len() <= MAX_NAME_LEN
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');
    if valid {
        Ok(())
    } else {
        Err(SlotStoreError::InvalidName {
            field,
            value: value.to_string(),
        })
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemorySaveStore {
    slots: BTreeMap<(String, String), String>,
}

impl MemorySaveStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl SaveTransport for MemorySaveStore {
    fn get(&self, user: &str, slot: &str) -> Result<Option<String>, SlotStoreError> {
        validate_slot_name("user", user)?;
        validate_slot_name("slot", slot)?;
        Ok(self
            .slots
            .get(&(user.to_string(), slot.to_string()))
            .cloned())
    }

    fn put(&mut self, user: &str, slot: &str, payload: &str) -> Result<(), SlotStoreError> {
        validate_slot_name("user", user)?;
        validate_slot_name("slot", slot)?;
        self.slots
            .insert((user.to_string(), slot.to_string()), payload.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips_and_reports_absent_slots() {
        let mut store = MemorySaveStore::new();
        assert!(store.get("local", "slot1").expect("get").is_none());
        store.put("local", "slot1", "{}").expect("put");
        store.put("local", "slot1", "{\"v\":2}").expect("overwrite");
        assert_eq!(
            store.get("local", "slot1").expect("get").as_deref(),
            Some("{\"v\":2}")
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn names_outside_the_safe_set_are_rejected() {
        let mut store = MemorySaveStore::new();
        for bad in ["", "../etc", "a b", "slot.json"] {
            let err = store.put("local", bad, "{}").expect_err("bad slot");
            assert!(matches!(err, SlotStoreError::InvalidName { field: "slot", .. }));
        }
        assert!(validate_slot_name("user", &"x".repeat(MAX_NAME_LEN)).is_ok());
        assert!(validate_slot_name("user", &"x".repeat(MAX_NAME_LEN + 1)).is_err());
    }
}
