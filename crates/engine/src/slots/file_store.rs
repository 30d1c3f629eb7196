use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::atomic_io::write_text_atomic;
use super::manifest::{read_manifest, write_manifest_atomic, ManifestReadState, SlotManifest};
use super::{validate_slot_name, SaveTransport, SlotStoreError};

/// Slots on disk as `<root>/<user>/<slot>.save.json` next to a
/// `<slot>.manifest.json` recording the payload length and SHA-256.
#[derive(Debug, Clone)]
pub struct FileSaveStore {
    root: PathBuf,
}

impl FileSaveStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn payload_path(&self, user: &str, slot: &str) -> PathBuf {
        self.root.join(user).join(format!("{slot}.save.json"))
    }

    pub fn manifest_path(&self, user: &str, slot: &str) -> PathBuf {
        self.root.join(user).join(format!("{slot}.manifest.json"))
    }
}

impl SaveTransport for FileSaveStore {
    fn get(&self, user: &str, slot: &str) -> Result<Option<String>, SlotStoreError> {
        validate_slot_name("user", user)?;
        validate_slot_name("slot", slot)?;
        let payload_path = self.payload_path(user, slot);
        let payload = match fs::read_to_string(&payload_path) {
            Ok(payload) => payload,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SlotStoreError::Io {
                    path: payload_path,
                    source,
                })
            }
        };

        let manifest_path = self.manifest_path(user, slot);
        match read_manifest(&manifest_path)? {
            ManifestReadState::Present(manifest) => {
                if let Some(message) = manifest.mismatch(&payload) {
                    return Err(SlotStoreError::Corrupt {
                        path: payload_path,
                        message,
                    });
                }
            }
            ManifestReadState::Unreadable(message) => {
                return Err(SlotStoreError::Corrupt {
                    path: manifest_path,
                    message: format!("manifest unreadable: {message}"),
                });
            }
            ManifestReadState::Missing => {
                warn!(
                    user,
                    slot,
                    path = %payload_path.display(),
                    "slot_manifest_missing"
                );
            }
        }

        debug!(user, slot, bytes = payload.len(), "slot_read");
        Ok(Some(payload))
    }

    fn put(&mut self, user: &str, slot: &str, payload: &str) -> Result<(), SlotStoreError> {
        validate_slot_name("user", user)?;
        validate_slot_name("slot", slot)?;
        let payload_path = self.payload_path(user, slot);
        write_text_atomic(&payload_path, payload).map_err(|source| SlotStoreError::Io {
            path: payload_path.clone(),
            source,
        })?;
        write_manifest_atomic(
            &self.manifest_path(user, slot),
            &SlotManifest::for_payload(payload),
        )?;
        debug!(user, slot, bytes = payload.len(), "slot_written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn put_then_get_round_trips_and_writes_manifest() {
        let temp = TempDir::new().expect("temp");
        let mut store = FileSaveStore::new(temp.path());
        store.put("local", "slot1", "{\"schema\":\"save\"}").expect("put");

        assert!(store.payload_path("local", "slot1").is_file());
        assert!(store.manifest_path("local", "slot1").is_file());
        assert_eq!(
            store.get("local", "slot1").expect("get").as_deref(),
            Some("{\"schema\":\"save\"}")
        );
    }

    #[test]
    fn absent_slot_is_none() {
        let temp = TempDir::new().expect("temp");
        let store = FileSaveStore::new(temp.path());
        assert!(store.get("local", "slot9").expect("get").is_none());
    }

    #[test]
    fn tampered_payload_is_corrupt() {
        let temp = TempDir::new().expect("temp");
        let mut store = FileSaveStore::new(temp.path());
        store.put("local", "slot1", "{\"hp\":10}").expect("put");
        fs::write(store.payload_path("local", "slot1"), "{\"hp\":99}").expect("tamper");

        let err = store.get("local", "slot1").expect_err("corrupt");
        assert!(matches!(err, SlotStoreError::Corrupt { .. }));
    }

    #[test]
    fn unreadable_manifest_is_corrupt() {
        let temp = TempDir::new().expect("temp");
        let mut store = FileSaveStore::new(temp.path());
        store.put("local", "slot1", "{}").expect("put");
        fs::write(store.manifest_path("local", "slot1"), "not json").expect("tamper");

        let err = store.get("local", "slot1").expect_err("corrupt");
        assert!(matches!(err, SlotStoreError::Corrupt { .. }));
    }

    #[test]
    fn payload_without_manifest_is_accepted() {
        let temp = TempDir::new().expect("temp");
        let store = FileSaveStore::new(temp.path());
        let path = store.payload_path("local", "slot1");
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(&path, "{}").expect("write");
        assert_eq!(store.get("local", "slot1").expect("get").as_deref(), Some("{}"));
    }

    #[test]
    fn path_traversal_names_are_rejected() {
        let temp = TempDir::new().expect("temp");
        let mut store = FileSaveStore::new(temp.path());
        let err = store.put("..", "slot1", "{}").expect_err("invalid user");
        assert!(matches!(err, SlotStoreError::InvalidName { field: "user", .. }));
    }
}
