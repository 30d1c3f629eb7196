use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::atomic_io::write_text_atomic;
use super::hashing::sha256_hex;
use super::SlotStoreError;

pub(crate) const SLOT_MANIFEST_FORMAT_VERSION: u16 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub(crate) struct SlotManifest {
    pub format_version: u16,
    pub byte_len: u64,
    pub sha256_hex: String,
}

impl SlotManifest {
    pub fn for_payload(payload: &str) -> Self {
        Self {
            format_version: SLOT_MANIFEST_FORMAT_VERSION,
            byte_len: payload.len() as u64,
            sha256_hex: sha256_hex(payload.as_bytes()),
        }
    }

    /// Describes the first mismatch against `payload`, if any.
    pub fn mismatch(&self, payload: &str) -> Option<String> {
        if self.format_version != SLOT_MANIFEST_FORMAT_VERSION {
            return Some(format!(
                "manifest format {} is not supported (expected {})",
                self.format_version, SLOT_MANIFEST_FORMAT_VERSION
            ));
        }
        if self.byte_len != payload.len() as u64 {
            return Some(format!(
                "payload is {} bytes, manifest records {}",
                payload.len(),
                self.byte_len
            ));
        }
        let actual = sha256_hex(payload.as_bytes());
        if actual != self.sha256_hex {
            return Some(format!(
                "payload sha256 {} does not match manifest {}",
                actual, self.sha256_hex
            ));
        }
        None
    }
}

#[derive(Debug, Clone)]
pub(crate) enum ManifestReadState {
    Missing,
    Unreadable(String),
    Present(SlotManifest),
}

pub(crate) fn read_manifest(path: &Path) -> Result<ManifestReadState, SlotStoreError> {
    if !path.exists() {
        return Ok(ManifestReadState::Missing);
    }

    let raw = fs::read_to_string(path).map_err(|source| SlotStoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    match serde_json::from_str::<SlotManifest>(&raw) {
        Ok(value) => Ok(ManifestReadState::Present(value)),
        Err(error) => Ok(ManifestReadState::Unreadable(error.to_string())),
    }
}

pub(crate) fn write_manifest_atomic(
    path: &Path,
    manifest: &SlotManifest,
) -> Result<(), SlotStoreError> {
    let text = serde_json::to_string(manifest).map_err(|error| SlotStoreError::Corrupt {
        path: path.to_path_buf(),
        message: format!("failed to encode manifest json: {error}"),
    })?;
    write_text_atomic(path, &text).map_err(|source| SlotStoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_detects_length_and_digest_changes() {
        let manifest = SlotManifest::for_payload("{\"schema\":\"save\"}");
        assert_eq!(manifest.mismatch("{\"schema\":\"save\"}"), None);
        assert!(manifest
            .mismatch("{\"schema\":\"save\",\"x\":1}")
            .is_some_and(|message| message.contains("bytes")));
        assert!(manifest
            .mismatch("{\"schema\":\"sava\"}")
            .is_some_and(|message| message.contains("sha256")));
    }
}
