//! Vault access log
//!
//! Append-only record of every key operation, retained for audit. Entries
//! form a SHA-256 hash chain so tampering with retained history is
//! detectable. The log is in-memory; durable retention belongs to the
//! storage collaborator.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use attestation_core::Clock;

/// Key operation recorded in the access log
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VaultOperation {
    /// A key pair was generated
    KeyGeneration,
    /// A digest was signed
    Signature,
    /// A public key was read
    PublicKeyAccess,
}

/// One access log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessLogEntry {
    /// Employer the operation acted on
    pub employer_id: String,
    /// Operation kind
    pub operation: VaultOperation,
    /// When the operation happened
    pub timestamp: DateTime<Utc>,
    /// Correlation id for the request
    pub request_id: Uuid,
    /// Hash of the previous entry (empty for the first)
    pub previous_hash: String,
    /// SHA-256 over this entry's fields and `previous_hash`
    pub hash: String,
}

impl AccessLogEntry {
    fn compute_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.employer_id.as_bytes());
        hasher.update(serde_json::to_string(&self.operation).unwrap().as_bytes());
        hasher.update(self.timestamp.to_rfc3339().as_bytes());
        hasher.update(self.request_id.as_bytes());
        hasher.update(self.previous_hash.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Verify this entry's hash
    pub fn verify_hash(&self) -> bool {
        self.hash == self.compute_hash()
    }
}

/// Append-only in-memory access log
pub struct AccessLog {
    entries: RwLock<Vec<AccessLogEntry>>,
}

impl AccessLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Append an entry for the given operation
    pub fn record(&self, employer_id: &str, operation: VaultOperation, clock: &dyn Clock) -> Uuid {
        let request_id = Uuid::new_v4();
        let mut entries = self.entries.write();

        let previous_hash = entries.last().map(|e| e.hash.clone()).unwrap_or_default();
        let mut entry = AccessLogEntry {
            employer_id: employer_id.to_string(),
            operation,
            timestamp: clock.now(),
            request_id,
            previous_hash,
            hash: String::new(),
        };
        entry.hash = entry.compute_hash();
        entries.push(entry);

        request_id
    }

    /// Entries, optionally filtered by employer, newest first, capped at
    /// `limit`.
    pub fn entries(&self, employer_id: Option<&str>, limit: usize) -> Vec<AccessLogEntry> {
        let entries = self.entries.read();
        let mut selected: Vec<AccessLogEntry> = entries
            .iter()
            .filter(|e| employer_id.map_or(true, |id| e.employer_id == id))
            .cloned()
            .collect();
        selected.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        selected.truncate(limit);
        selected
    }

    /// Walk the hash chain; false if any entry or link was tampered with.
    pub fn verify_integrity(&self) -> bool {
        let entries = self.entries.read();
        let mut previous_hash = String::new();
        for entry in entries.iter() {
            if !entry.verify_hash() || entry.previous_hash != previous_hash {
                return false;
            }
            previous_hash = entry.hash.clone();
        }
        true
    }

    /// Total entry count
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for AccessLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attestation_core::SystemClock;

    #[test]
    fn test_record_and_filter() {
        let log = AccessLog::new();
        let clock = SystemClock;

        log.record("employer_a", VaultOperation::KeyGeneration, &clock);
        log.record("employer_a", VaultOperation::Signature, &clock);
        log.record("employer_b", VaultOperation::Signature, &clock);

        assert_eq!(log.len(), 3);
        assert_eq!(log.entries(Some("employer_a"), 10).len(), 2);
        assert_eq!(log.entries(None, 2).len(), 2);
    }

    #[test]
    fn test_hash_chain_integrity() {
        let log = AccessLog::new();
        let clock = SystemClock;

        for _ in 0..5 {
            log.record("employer_a", VaultOperation::Signature, &clock);
        }
        assert!(log.verify_integrity());
    }

    #[test]
    fn test_tampered_entry_detected() {
        let log = AccessLog::new();
        let clock = SystemClock;
        log.record("employer_a", VaultOperation::Signature, &clock);
        log.record("employer_a", VaultOperation::Signature, &clock);

        {
            let mut entries = log.entries.write();
            entries[0].employer_id = "someone_else".to_string();
        }
        assert!(!log.verify_integrity());
    }

    #[test]
    fn test_entries_sorted_descending() {
        let log = AccessLog::new();
        let start = Utc::now();
        let clock = attestation_core::ManualClock::new(start);

        log.record("employer_a", VaultOperation::KeyGeneration, &clock);
        clock.advance(chrono::Duration::seconds(10));
        log.record("employer_a", VaultOperation::Signature, &clock);

        let entries = log.entries(None, 10);
        assert_eq!(entries[0].operation, VaultOperation::Signature);
        assert_eq!(entries[1].operation, VaultOperation::KeyGeneration);
    }
}
