//! Attestation ledger
//!
//! Storage seam for admitted attestations plus the two anti-double-spend
//! sets: used period nonces and spent nullifiers. The in-memory
//! implementation is the reference; a durable backend must preserve
//! attestation-id uniqueness, idempotent insertion, and linearizable
//! nullifier-existence reads.

use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;

use attestation_core::WageAttestation;

/// Storage contract consumed by the validator
pub trait AttestationStore: Send + Sync {
    /// Insert an attestation keyed by its identifier; idempotent, returns
    /// false if the id was already present.
    fn put(&self, attestation: WageAttestation) -> bool;

    /// Fetch by attestation id
    fn get(&self, attestation_id: &str) -> Option<WageAttestation>;

    /// All admitted attestations for a wallet, optionally narrowed to one
    /// employer. The wallet comparison is case-insensitive.
    fn list(&self, employee_wallet: &str, employer_id: Option<&str>) -> Vec<WageAttestation>;

    /// Whether a period key was already admitted
    fn nonce_seen(&self, period_key: &str) -> bool;

    /// Record a period key
    fn insert_nonce(&self, period_key: &str);

    /// Whether a nullifier was already admitted
    fn nullifier_seen(&self, nullifier: &str) -> bool;

    /// Record a nullifier
    fn insert_nullifier(&self, nullifier: &str);

    /// Nullifiers in admission order
    fn nullifiers(&self) -> Vec<String>;
}

/// In-memory reference ledger
pub struct InMemoryLedger {
    attestations: DashMap<String, WageAttestation>,
    used_nonces: DashSet<String>,
    nullifier_hashes: DashSet<String>,
    admission_order: Mutex<Vec<String>>,
}

impl InMemoryLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self {
            attestations: DashMap::new(),
            used_nonces: DashSet::new(),
            nullifier_hashes: DashSet::new(),
            admission_order: Mutex::new(Vec::new()),
        }
    }

    /// Number of admitted attestations
    pub fn len(&self) -> usize {
        self.attestations.len()
    }

    /// Whether the ledger is empty
    pub fn is_empty(&self) -> bool {
        self.attestations.is_empty()
    }

    /// Remove an attestation and its nonce key.
    ///
    /// Test support for flag-monotonicity checks; admitted attestations are
    /// never removed in production flows, and the nullifier stays spent.
    pub fn remove(&self, attestation_id: &str) -> Option<WageAttestation> {
        let (_, attestation) = self.attestations.remove(attestation_id)?;
        self.used_nonces.remove(&attestation.period_key());
        Some(attestation)
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl AttestationStore for InMemoryLedger {
    fn put(&self, attestation: WageAttestation) -> bool {
        let id = attestation.attestation_id.clone();
        if self.attestations.contains_key(&id) {
            return false;
        }
        self.attestations.insert(id, attestation);
        true
    }

    fn get(&self, attestation_id: &str) -> Option<WageAttestation> {
        self.attestations.get(attestation_id).map(|a| a.clone())
    }

    fn list(&self, employee_wallet: &str, employer_id: Option<&str>) -> Vec<WageAttestation> {
        let wallet = employee_wallet.to_lowercase();
        self.attestations
            .iter()
            .filter(|entry| entry.employee_wallet.to_lowercase() == wallet)
            .filter(|entry| employer_id.map_or(true, |id| entry.employer_id == id))
            .map(|entry| entry.clone())
            .collect()
    }

    fn nonce_seen(&self, period_key: &str) -> bool {
        self.used_nonces.contains(period_key)
    }

    fn insert_nonce(&self, period_key: &str) {
        self.used_nonces.insert(period_key.to_string());
    }

    fn nullifier_seen(&self, nullifier: &str) -> bool {
        self.nullifier_hashes.contains(nullifier)
    }

    fn insert_nullifier(&self, nullifier: &str) {
        if self.nullifier_hashes.insert(nullifier.to_string()) {
            self.admission_order.lock().push(nullifier.to_string());
        }
    }

    fn nullifiers(&self) -> Vec<String> {
        self.admission_order.lock().clone()
    }
}
