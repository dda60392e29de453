//! secp256k1 key vault
//!
//! In-process signing oracle. Holds one key pair per employer, signs 32-byte
//! digests with low-s ECDSA, and records every operation in the access log.
//! Mutations for a given employer are serialized through the key map's
//! exclusive entry access, keeping `signature_count` monotonic.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use attestation_core::{
    Clock, Error, Result, SignatureInfo, EMPLOYER_ID_HEX_LEN, KEY_ACTIVE_WINDOW_DAYS,
};

use crate::audit::{AccessLog, AccessLogEntry, VaultOperation};

/// Candidate scalars rejected before key generation gives up
const MAX_KEY_GENERATION_ATTEMPTS: u32 = 256;

/// Key record exclusively owned by the vault
struct KeyRecord {
    signing_key: SigningKey,
    public_key: Vec<u8>,
    created_at: DateTime<Utc>,
    last_used_at: DateTime<Utc>,
    signature_count: u64,
}

/// Public handle returned by key generation
#[derive(Debug, Clone)]
pub struct KeyHandle {
    /// Uncompressed SEC1 public key (65 bytes)
    pub public_key: Vec<u8>,
    /// First 16 hex chars of SHA-256 over the public key bytes
    pub key_id: String,
}

/// Usage statistics for one employer key
#[derive(Debug, Clone)]
pub struct KeyStats {
    /// When the key pair was generated
    pub created_at: DateTime<Utc>,
    /// Last signing or generation instant
    pub last_used_at: DateTime<Utc>,
    /// Signatures produced so far
    pub signature_count: u64,
    /// Age of the key at query time
    pub key_age: Duration,
    /// True iff the key was used within the last 30 days
    pub is_active: bool,
}

/// secp256k1 key vault
pub struct KeyVault {
    keys: DashMap<String, KeyRecord>,
    log: AccessLog,
    clock: Arc<dyn Clock>,
}

impl KeyVault {
    /// Create an empty vault
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            keys: DashMap::new(),
            log: AccessLog::new(),
            clock,
        }
    }

    /// Generate a key pair for an employer.
    ///
    /// Candidate scalars outside the curve order are rejected and redrawn;
    /// 256 consecutive rejections abort with `KEY_GENERATION_EXHAUSTED`.
    pub fn generate_keypair(&self, employer_id: &str) -> Result<KeyHandle> {
        let mut rng = rand::rngs::OsRng;
        let mut seed = [0u8; 32];
        for _ in 0..MAX_KEY_GENERATION_ATTEMPTS {
            rng.fill_bytes(&mut seed);
            if let Ok(signing_key) = SigningKey::from_slice(&seed) {
                return self.install_key(employer_id, signing_key);
            }
        }
        Err(Error::KeyGenerationExhausted(MAX_KEY_GENERATION_ATTEMPTS))
    }

    /// Generate a key pair from a fixed seed (deterministic corpora and
    /// tests).
    pub fn generate_keypair_from_seed(&self, employer_id: &str, seed: [u8; 32]) -> Result<KeyHandle> {
        let signing_key = SigningKey::from_slice(&seed)
            .map_err(|e| Error::InvalidSignature(format!("seed outside curve order: {}", e)))?;
        self.install_key(employer_id, signing_key)
    }

    fn install_key(&self, employer_id: &str, signing_key: SigningKey) -> Result<KeyHandle> {
        let public_key = signing_key
            .verifying_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec();
        let key_id = derive_key_id(&public_key);
        let now = self.clock.now();

        match self.keys.entry(employer_id.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(Error::DuplicateEmployer(employer_id.to_string()));
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(KeyRecord {
                    signing_key,
                    public_key: public_key.clone(),
                    created_at: now,
                    last_used_at: now,
                    signature_count: 0,
                });
            }
        }
        let request_id = self
            .log
            .record(employer_id, VaultOperation::KeyGeneration, &*self.clock);
        info!(employer_id, key_id = %key_id, %request_id, "generated employer key pair");

        Ok(KeyHandle { public_key, key_id })
    }

    /// Sign a 32-byte digest for an employer.
    ///
    /// Produces a low-s signature; `last_used_at` and `signature_count`
    /// update atomically with the signing operation.
    pub fn sign(&self, employer_id: &str, digest: &[u8]) -> Result<SignatureInfo> {
        if digest.len() != 32 {
            return Err(Error::InvalidDigestLength(digest.len()));
        }

        let mut record = self
            .keys
            .get_mut(employer_id)
            .ok_or_else(|| Error::UnknownEmployer(employer_id.to_string()))?;

        let (mut signature, mut recovery_id) = record
            .signing_key
            .sign_prehash_recoverable(digest)
            .map_err(|e| Error::InvalidSignature(format!("signing failed: {}", e)))?;

        // Enforce low-s; mirroring s flips the recovery parity.
        if let Some(normalized) = signature.normalize_s() {
            signature = normalized;
            recovery_id = RecoveryId::from_byte(recovery_id.to_byte() ^ 1)
                .expect("parity flip stays in range");
        }

        record.last_used_at = self.clock.now();
        record.signature_count += 1;
        let signature_count = record.signature_count;
        drop(record);

        let request_id = self
            .log
            .record(employer_id, VaultOperation::Signature, &*self.clock);
        debug!(employer_id, %request_id, signature_count, "signed digest");

        Ok(SignatureInfo {
            signature: hex::encode(signature.to_bytes()),
            recovery_id: recovery_id.to_byte(),
            signature_count,
        })
    }

    /// Public key bytes for an employer; the read is logged.
    pub fn public_key(&self, employer_id: &str) -> Result<Vec<u8>> {
        let record = self
            .keys
            .get(employer_id)
            .ok_or_else(|| Error::UnknownEmployer(employer_id.to_string()))?;
        let public_key = record.public_key.clone();
        drop(record);

        self.log
            .record(employer_id, VaultOperation::PublicKeyAccess, &*self.clock);
        Ok(public_key)
    }

    /// Verify a 64-byte `r‖s` signature over a 32-byte digest.
    ///
    /// Pure function; returns false on any malformed input. High-s
    /// signatures are rejected to rule out malleated twins.
    pub fn verify(public_key: &[u8], signature: &[u8], digest: &[u8]) -> bool {
        if digest.len() != 32 {
            return false;
        }
        let verifying_key = match VerifyingKey::from_sec1_bytes(public_key) {
            Ok(key) => key,
            Err(_) => return false,
        };
        let signature = match Signature::from_slice(signature) {
            Ok(sig) => sig,
            Err(_) => return false,
        };
        if signature.normalize_s().is_some() {
            return false;
        }
        verifying_key.verify_prehash(digest, &signature).is_ok()
    }

    /// Usage statistics for an employer key
    pub fn stats(&self, employer_id: &str) -> Result<KeyStats> {
        let record = self
            .keys
            .get(employer_id)
            .ok_or_else(|| Error::UnknownEmployer(employer_id.to_string()))?;
        let now = self.clock.now();
        Ok(KeyStats {
            created_at: record.created_at,
            last_used_at: record.last_used_at,
            signature_count: record.signature_count,
            key_age: now - record.created_at,
            is_active: now - record.last_used_at <= Duration::days(KEY_ACTIVE_WINDOW_DAYS),
        })
    }

    /// Access log entries, newest first
    pub fn access_logs(&self, employer_id: Option<&str>, limit: usize) -> Vec<AccessLogEntry> {
        self.log.entries(employer_id, limit)
    }

    /// Verify the access log hash chain
    pub fn verify_log_integrity(&self) -> bool {
        self.log.verify_integrity()
    }

    /// Whether the vault holds a key for the employer
    pub fn has_key(&self, employer_id: &str) -> bool {
        self.keys.contains_key(employer_id)
    }
}

/// First 16 hex chars of SHA-256 over the raw public key bytes.
pub fn derive_key_id(public_key: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(public_key);
    hex::encode(hasher.finalize())[..EMPLOYER_ID_HEX_LEN].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use attestation_core::{ManualClock, SystemClock};

    fn vault() -> KeyVault {
        KeyVault::new(Arc::new(SystemClock))
    }

    #[test]
    fn test_generate_keypair() {
        let vault = vault();
        let handle = vault.generate_keypair("employer_a").unwrap();

        assert_eq!(handle.public_key.len(), 65);
        assert_eq!(handle.public_key[0], 0x04); // uncompressed SEC1 tag
        assert_eq!(handle.key_id.len(), 16);
        assert!(vault.has_key("employer_a"));
    }

    #[test]
    fn test_duplicate_employer_rejected() {
        let vault = vault();
        vault.generate_keypair("employer_a").unwrap();
        let err = vault.generate_keypair("employer_a").unwrap_err();
        assert_eq!(err.error_code(), "DUPLICATE_EMPLOYER");
    }

    #[test]
    fn test_seeded_keypair_is_deterministic() {
        let vault_a = vault();
        let vault_b = vault();
        let seed = [42u8; 32];

        let a = vault_a.generate_keypair_from_seed("employer_a", seed).unwrap();
        let b = vault_b.generate_keypair_from_seed("employer_a", seed).unwrap();
        assert_eq!(a.public_key, b.public_key);
        assert_eq!(a.key_id, b.key_id);
    }

    #[test]
    fn test_sign_and_verify() {
        let vault = vault();
        let handle = vault.generate_keypair("employer_a").unwrap();

        let digest = [7u8; 32];
        let info = vault.sign("employer_a", &digest).unwrap();
        assert_eq!(info.signature.len(), 128);
        assert!(info.recovery_id <= 1);
        assert_eq!(info.signature_count, 1);

        let signature = hex::decode(&info.signature).unwrap();
        assert!(KeyVault::verify(&handle.public_key, &signature, &digest));

        // Tampered digest fails
        let other = [8u8; 32];
        assert!(!KeyVault::verify(&handle.public_key, &signature, &other));
    }

    #[test]
    fn test_verify_rejects_malformed_input() {
        assert!(!KeyVault::verify(&[], &[], &[0u8; 32]));
        assert!(!KeyVault::verify(&[0x04; 65], &[0u8; 64], &[0u8; 32]));
        assert!(!KeyVault::verify(&[0x04; 65], &[0u8; 64], &[0u8; 31]));
    }

    #[test]
    fn test_signature_is_low_s() {
        let vault = vault();
        vault.generate_keypair_from_seed("employer_a", [9u8; 32]).unwrap();

        // RFC 6979 nonces make these signatures deterministic; each must
        // already be low-s.
        for byte in 0u8..16 {
            let info = vault.sign("employer_a", &[byte; 32]).unwrap();
            let bytes = hex::decode(&info.signature).unwrap();
            let signature = Signature::from_slice(&bytes).unwrap();
            assert!(signature.normalize_s().is_none());
        }
    }

    #[test]
    fn test_sign_rejects_bad_digest_length() {
        let vault = vault();
        vault.generate_keypair("employer_a").unwrap();
        let err = vault.sign("employer_a", &[0u8; 31]).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_DIGEST_LENGTH");
    }

    #[test]
    fn test_sign_unknown_employer() {
        let vault = vault();
        let err = vault.sign("missing", &[0u8; 32]).unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_EMPLOYER");
    }

    #[test]
    fn test_signature_count_monotonic() {
        let vault = vault();
        vault.generate_keypair("employer_a").unwrap();
        for expected in 1..=5u64 {
            let info = vault.sign("employer_a", &[1u8; 32]).unwrap();
            assert_eq!(info.signature_count, expected);
        }
    }

    #[test]
    fn test_stats_activity_window() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let vault = KeyVault::new(clock.clone());
        vault.generate_keypair("employer_a").unwrap();
        vault.sign("employer_a", &[1u8; 32]).unwrap();

        let stats = vault.stats("employer_a").unwrap();
        assert!(stats.is_active);
        assert_eq!(stats.signature_count, 1);

        clock.advance(Duration::days(KEY_ACTIVE_WINDOW_DAYS + 1));
        let stats = vault.stats("employer_a").unwrap();
        assert!(!stats.is_active);
        assert!(stats.key_age >= Duration::days(KEY_ACTIVE_WINDOW_DAYS));
    }

    #[test]
    fn test_operations_are_logged() {
        let vault = vault();
        vault.generate_keypair("employer_a").unwrap();
        vault.sign("employer_a", &[1u8; 32]).unwrap();
        vault.public_key("employer_a").unwrap();

        let logs = vault.access_logs(Some("employer_a"), 10);
        assert_eq!(logs.len(), 3);
        assert!(logs.iter().any(|e| e.operation == VaultOperation::KeyGeneration));
        assert!(logs.iter().any(|e| e.operation == VaultOperation::Signature));
        assert!(logs.iter().any(|e| e.operation == VaultOperation::PublicKeyAccess));
        assert!(vault.verify_log_integrity());
    }
}
