//! Known devices and their signing keys
//!
//! The directory of devices trusted to approve logins. Keys are loaded from
//! a JSON file at startup or injected programmatically; the directory is
//! read-only at runtime and deliberately carries no global state, so tests
//! bring their own keys.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Device directory errors
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid public key for device {device_id}: {reason}")]
    InvalidKey { device_id: String, reason: String },
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// A device trusted to sign login tokens
#[derive(Debug, Clone)]
pub struct Device {
    /// Opaque device identifier presented in authenticate requests
    pub id: String,
    /// Human-readable device name (e.g., "Pixel 9", "iPhone 15 Pro")
    pub name: String,
    /// The device's Ed25519 verification key
    pub public_key: VerifyingKey,
}

/// On-disk record: the key travels base64-encoded
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DeviceRecord {
    id: String,
    name: String,
    /// Base64-encoded 32-byte Ed25519 public key
    public_key: String,
}

/// Read-only lookup of known devices, keyed by device id
#[derive(Debug, Default)]
pub struct DeviceDirectory {
    devices: HashMap<String, Device>,
}

impl DeviceDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a directory from a JSON file of device records
    pub fn load(path: impl AsRef<Path>) -> DirectoryResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let records: Vec<DeviceRecord> = serde_json::from_str(&contents)?;

        let mut directory = Self::new();
        for record in records {
            let key = decode_key(&record.public_key).map_err(|reason| {
                DirectoryError::InvalidKey {
                    device_id: record.id.clone(),
                    reason,
                }
            })?;
            directory.add(Device {
                id: record.id,
                name: record.name,
                public_key: key,
            });
        }
        info!(
            "Loaded {} device(s) from {:?}",
            directory.len(),
            path.as_ref()
        );
        Ok(directory)
    }

    /// Add a device, replacing any existing entry with the same id
    pub fn add(&mut self, device: Device) {
        self.devices.insert(device.id.clone(), device);
    }

    /// Look up a device by id
    pub fn get(&self, device_id: &str) -> Option<&Device> {
        self.devices.get(device_id)
    }

    /// Number of known devices
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether the directory holds no devices
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

fn decode_key(encoded: &str) -> Result<VerifyingKey, String> {
    let bytes = BASE64.decode(encoded).map_err(|e| e.to_string())?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| "expected 32 bytes".to_string())?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;

    fn test_key() -> VerifyingKey {
        SigningKey::from_bytes(&[7u8; 32]).verifying_key()
    }

    #[test]
    fn test_add_and_get() {
        let mut directory = DeviceDirectory::new();
        assert!(directory.is_empty());
        directory.add(Device {
            id: "D1".into(),
            name: "Test Phone".into(),
            public_key: test_key(),
        });
        assert_eq!(directory.get("D1").unwrap().name, "Test Phone");
        assert!(directory.get("D2").is_none());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.json");
        let encoded = BASE64.encode(test_key().to_bytes());
        std::fs::write(
            &path,
            format!(
                r#"[{{"id":"D1","name":"Pixel","public_key":"{}"}}]"#,
                encoded
            ),
        )
        .unwrap();

        let directory = DeviceDirectory::load(&path).unwrap();
        assert_eq!(directory.len(), 1);
        assert_eq!(directory.get("D1").unwrap().public_key, test_key());
    }

    #[test]
    fn test_load_rejects_bad_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.json");
        std::fs::write(
            &path,
            r#"[{"id":"D1","name":"Pixel","public_key":"bm90LWEta2V5"}]"#,
        )
        .unwrap();

        let result = DeviceDirectory::load(&path);
        assert!(matches!(result, Err(DirectoryError::InvalidKey { .. })));
    }
}
