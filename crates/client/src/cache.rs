//! Encrypted local mirror of the current session.
//!
//! The cached [`SessionRecord`] is sealed with AES-256-GCM under a key derived
//! from device fingerprint signals. This deters casual local tampering; it is
//! not a security boundary, since anything running on the device can
//! re-derive the key.
//!
//! Reads fail closed: a tamper-scan hit, an undecodable envelope, a failed
//! decryption, or an entry older than the maximum age clears the cache and
//! reports no session.

use std::io;
use std::sync::{Arc, OnceLock};

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use chrono::Utc;
use iching_core::types::Timestamp;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::SessionRecord;
use crate::storage::KeyValueStorage;

/// Storage key holding the sealed session envelope.
pub const SESSION_CACHE_KEY: &str = "iching.session";

/// Envelope format version.
const ENVELOPE_VERSION: u8 = 1;

/// AES-GCM nonce length in bytes.
const NONCE_LEN: usize = 12;

/// Markers of script injection in stored keys or values.
fn injection_markers() -> &'static Regex {
    static MARKERS: OnceLock<Regex> = OnceLock::new();
    MARKERS.get_or_init(|| {
        Regex::new(
            r"(?i)<\s*/?\s*script|javascript\s*:|\bon(?:error|load|click|mouseover|focus)\s*=|\beval\s*\(|document\.cookie",
        )
        .expect("injection marker regex is valid")
    })
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Envelope encoding invalid: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("Encryption failed")]
    Encryption,

    #[error("Decryption failed")]
    Decryption,

    #[error("Unsupported envelope version {0}")]
    Version(u8),

    #[error("Storage contains injection markers")]
    Tampered,

    #[error("Cached session is older than the maximum age")]
    Stale,
}

// ---------------------------------------------------------------------------
// Device fingerprint
// ---------------------------------------------------------------------------

/// Signals identifying the device the cache was written on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceFingerprint {
    pub user_agent: String,
    pub language: String,
    pub screen_width: u32,
    pub screen_height: u32,
    pub color_depth: u8,
    /// UTC offset in minutes.
    pub timezone_offset: i32,
}

impl DeviceFingerprint {
    /// SHA-256 of the joined signals, used directly as the AES-256 key.
    pub fn derive_key(&self) -> [u8; 32] {
        let material = format!(
            "{}|{}|{}x{}x{}|{}",
            self.user_agent,
            self.language,
            self.screen_width,
            self.screen_height,
            self.color_depth,
            self.timezone_offset
        );
        Sha256::digest(material.as_bytes()).into()
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
struct Envelope {
    v: u8,
    nonce: String,
    data: String,
}

#[derive(Serialize, Deserialize)]
struct CachedSession {
    record: SessionRecord,
    stored_at: Timestamp,
}

// ---------------------------------------------------------------------------
// SecureSessionCache
// ---------------------------------------------------------------------------

pub struct SecureSessionCache {
    storage: Arc<dyn KeyValueStorage>,
    key: [u8; 32],
    max_age: chrono::Duration,
}

impl SecureSessionCache {
    pub fn new(
        storage: Arc<dyn KeyValueStorage>,
        fingerprint: &DeviceFingerprint,
        max_age: chrono::Duration,
    ) -> Self {
        Self {
            storage,
            key: fingerprint.derive_key(),
            max_age,
        }
    }

    /// Seal and store a session record, stamped with the current time.
    pub fn save(&self, record: &SessionRecord) -> Result<(), CacheError> {
        self.save_at(record, Utc::now())
    }

    fn save_at(&self, record: &SessionRecord, stored_at: Timestamp) -> Result<(), CacheError> {
        let payload = serde_json::to_vec(&CachedSession {
            record: record.clone(),
            stored_at,
        })?;

        let mut nonce = [0u8; NONCE_LEN];
        rand::rng().fill(&mut nonce);

        let ciphertext = self
            .cipher()
            .encrypt(Nonce::from_slice(&nonce), payload.as_slice())
            .map_err(|_| CacheError::Encryption)?;

        let envelope = Envelope {
            v: ENVELOPE_VERSION,
            nonce: BASE64_STANDARD.encode(nonce),
            data: BASE64_STANDARD.encode(ciphertext),
        };
        self.storage
            .set(SESSION_CACHE_KEY, &serde_json::to_string(&envelope)?)?;
        Ok(())
    }

    /// The cached session, if present, intact, and fresh.
    ///
    /// Any integrity failure clears the cache before returning `None`.
    pub fn load(&self) -> Option<SessionRecord> {
        match self.load_checked() {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(error = %e, "Session cache rejected, clearing");
                self.clear();
                None
            }
        }
    }

    fn load_checked(&self) -> Result<Option<SessionRecord>, CacheError> {
        if self.scan_for_tampering() {
            return Err(CacheError::Tampered);
        }
        let Some(raw) = self.storage.get(SESSION_CACHE_KEY) else {
            return Ok(None);
        };

        let envelope: Envelope = serde_json::from_str(&raw)?;
        if envelope.v != ENVELOPE_VERSION {
            return Err(CacheError::Version(envelope.v));
        }
        let nonce = BASE64_STANDARD.decode(&envelope.nonce)?;
        if nonce.len() != NONCE_LEN {
            return Err(CacheError::Decryption);
        }
        let ciphertext = BASE64_STANDARD.decode(&envelope.data)?;

        let plaintext = self
            .cipher()
            .decrypt(Nonce::from_slice(&nonce), ciphertext.as_slice())
            .map_err(|_| CacheError::Decryption)?;
        let cached: CachedSession = serde_json::from_slice(&plaintext)?;

        if Utc::now() - cached.stored_at > self.max_age {
            return Err(CacheError::Stale);
        }
        Ok(Some(cached.record))
    }

    /// Remove the cached session. Failures are logged, never surfaced.
    pub fn clear(&self) {
        if let Err(e) = self.storage.remove(SESSION_CACHE_KEY) {
            tracing::warn!(error = %e, "Failed to clear session cache");
        }
    }

    /// `true` when any storage key or value carries a script-injection marker.
    pub fn scan_for_tampering(&self) -> bool {
        let markers = injection_markers();
        self.storage.keys().iter().any(|key| {
            if markers.is_match(key) {
                tracing::warn!(key = %key, "Injection marker in storage key");
                return true;
            }
            let hit = self
                .storage
                .get(key)
                .is_some_and(|value| markers.is_match(&value));
            if hit {
                tracing::warn!(key = %key, "Injection marker in storage value");
            }
            hit
        })
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Session, User};
    use crate::storage::MemoryStorage;

    fn fingerprint() -> DeviceFingerprint {
        DeviceFingerprint {
            user_agent: "Mozilla/5.0 (X11; Linux x86_64)".into(),
            language: "en-US".into(),
            screen_width: 1920,
            screen_height: 1080,
            color_depth: 24,
            timezone_offset: -300,
        }
    }

    fn record() -> SessionRecord {
        SessionRecord {
            user: User {
                id: "user-1".into(),
                email: "seeker@example.com".into(),
                email_confirmed_at: None,
            },
            session: Session {
                access_token: Some("access".into()),
                refresh_token: Some("refresh".into()),
                expires_in: Some(3600),
                expires_at: Some(1_900_000_000),
            },
        }
    }

    fn cache_with(storage: Arc<MemoryStorage>) -> SecureSessionCache {
        SecureSessionCache::new(storage, &fingerprint(), chrono::Duration::days(30))
    }

    #[test]
    fn save_then_load_returns_record() {
        let storage = Arc::new(MemoryStorage::new());
        let cache = cache_with(storage.clone());
        cache.save(&record()).unwrap();

        assert_eq!(cache.load(), Some(record()));
        let raw = storage.get(SESSION_CACHE_KEY).unwrap();
        assert!(!raw.contains("seeker@example.com"), "payload must be encrypted");
    }

    #[test]
    fn empty_cache_loads_none_without_error() {
        let cache = cache_with(Arc::new(MemoryStorage::new()));
        assert_eq!(cache.load(), None);
    }

    #[test]
    fn different_device_cannot_decrypt_and_cache_is_cleared() {
        let storage = Arc::new(MemoryStorage::new());
        cache_with(storage.clone()).save(&record()).unwrap();

        let other = DeviceFingerprint {
            user_agent: "Other browser".into(),
            ..fingerprint()
        };
        let foreign = SecureSessionCache::new(storage.clone(), &other, chrono::Duration::days(30));

        assert_eq!(foreign.load(), None);
        assert!(storage.get(SESSION_CACHE_KEY).is_none());
    }

    #[test]
    fn corrupted_ciphertext_fails_closed() {
        let storage = Arc::new(MemoryStorage::new());
        let cache = cache_with(storage.clone());
        cache.save(&record()).unwrap();

        let raw = storage.get(SESSION_CACHE_KEY).unwrap();
        let mut envelope: Envelope = serde_json::from_str(&raw).unwrap();
        let mut bytes = BASE64_STANDARD.decode(&envelope.data).unwrap();
        bytes[0] ^= 0xFF;
        envelope.data = BASE64_STANDARD.encode(bytes);
        storage
            .set(SESSION_CACHE_KEY, &serde_json::to_string(&envelope).unwrap())
            .unwrap();

        assert_eq!(cache.load(), None);
        assert!(storage.get(SESSION_CACHE_KEY).is_none());
    }

    #[test]
    fn garbage_envelope_fails_closed() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(SESSION_CACHE_KEY, "plain text").unwrap();
        let cache = cache_with(storage.clone());

        assert_eq!(cache.load(), None);
        assert!(storage.get(SESSION_CACHE_KEY).is_none());
    }

    #[test]
    fn stale_entry_is_treated_as_absent() {
        let storage = Arc::new(MemoryStorage::new());
        let cache = cache_with(storage.clone());
        cache
            .save_at(&record(), Utc::now() - chrono::Duration::days(31))
            .unwrap();

        assert_eq!(cache.load(), None);
        assert!(storage.get(SESSION_CACHE_KEY).is_none());
    }

    #[test]
    fn entry_within_max_age_is_kept() {
        let cache = cache_with(Arc::new(MemoryStorage::new()));
        cache
            .save_at(&record(), Utc::now() - chrono::Duration::days(29))
            .unwrap();
        assert!(cache.load().is_some());
    }

    #[test]
    fn injected_script_elsewhere_in_storage_clears_cache() {
        let storage = Arc::new(MemoryStorage::new());
        let cache = cache_with(storage.clone());
        cache.save(&record()).unwrap();
        storage
            .set("theme", "<script>fetch('//evil')</script>")
            .unwrap();

        assert!(cache.scan_for_tampering());
        assert_eq!(cache.load(), None);
        assert!(storage.get(SESSION_CACHE_KEY).is_none());
    }

    #[test]
    fn benign_storage_passes_scan() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set("theme", "dark").unwrap();
        storage.set("language", "zh-TW").unwrap();
        assert!(!cache_with(storage).scan_for_tampering());
    }

    #[test]
    fn key_derivation_depends_on_every_signal() {
        let base = fingerprint().derive_key();
        let changed = DeviceFingerprint {
            timezone_offset: 60,
            ..fingerprint()
        };
        assert_ne!(base, changed.derive_key());
        assert_eq!(base, fingerprint().derive_key());
    }
}
