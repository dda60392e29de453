//! Employer registry
//!
//! Mints stable employer identities, owns employer profiles, and enforces
//! the per-employer daily signing cap. Key generation and signing are
//! delegated to the vault; the registry is the only component that may ask
//! the vault to sign.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use attestation_core::{
    canonical, Clock, EmployerProfile, Error, KeyDirectory, RegistrationRequest, Result,
    SignedAttestation, VerificationStatus, WageAttestation, EMPLOYER_ID_HEX_LEN,
};

use crate::audit::AccessLogEntry;
use crate::vault::KeyVault;

/// Hard ceiling on the daily attestation limit
const DAILY_LIMIT_CEILING: u32 = 1000;

/// Attestations granted per declared employee per day
const DAILY_LIMIT_PER_EMPLOYEE: u32 = 10;

/// Rolling signing window per employer
struct RateWindow {
    count: u32,
    last_reset: DateTime<Utc>,
}

/// Employer registry and signing front-end
pub struct EmployerRegistry {
    profiles: DashMap<String, EmployerProfile>,
    rate_windows: DashMap<String, RateWindow>,
    vault: Arc<KeyVault>,
    clock: Arc<dyn Clock>,
}

impl EmployerRegistry {
    /// Create a registry backed by the given vault and clock
    pub fn new(vault: Arc<KeyVault>, clock: Arc<dyn Clock>) -> Self {
        Self {
            profiles: DashMap::new(),
            rate_windows: DashMap::new(),
            vault,
            clock,
        }
    }

    /// Register an employer: derive its identity, generate its key pair,
    /// and set the daily signing limit from the declared headcount.
    ///
    /// The registration instant is folded into the identity, so the same
    /// company registering twice receives distinct identifiers; duplicate
    /// prevention is the caller's concern.
    pub fn register(&self, request: RegistrationRequest) -> Result<EmployerProfile> {
        self.register_inner(request, None)
    }

    /// Register with a caller-provided key seed.
    ///
    /// Deterministic corpora and tests only; production registration draws
    /// key material from the OS entropy source.
    pub fn register_with_key_seed(
        &self,
        request: RegistrationRequest,
        key_seed: [u8; 32],
    ) -> Result<EmployerProfile> {
        self.register_inner(request, Some(key_seed))
    }

    fn register_inner(
        &self,
        request: RegistrationRequest,
        key_seed: Option<[u8; 32]>,
    ) -> Result<EmployerProfile> {
        let registered_at = self.clock.now();
        let employer_id = derive_employer_id(
            &request.company_name,
            request.domain.as_deref(),
            registered_at,
        );

        let handle = match key_seed {
            Some(seed) => self.vault.generate_keypair_from_seed(&employer_id, seed)?,
            None => self.vault.generate_keypair(&employer_id)?,
        };
        let daily_attestation_limit =
            DAILY_LIMIT_CEILING.min(request.employee_count.saturating_mul(DAILY_LIMIT_PER_EMPLOYEE));

        let profile = EmployerProfile {
            employer_id: employer_id.clone(),
            company_name: request.company_name,
            domain: request.domain,
            employee_count: request.employee_count,
            payroll_frequency: request.payroll_frequency,
            contact_email: request.contact_email,
            public_key: hex::encode(&handle.public_key),
            key_id: handle.key_id,
            registered_at,
            verification_status: VerificationStatus::Pending,
            daily_attestation_limit,
        };
        self.profiles.insert(employer_id.clone(), profile.clone());
        self.rate_windows.insert(
            employer_id.clone(),
            RateWindow {
                count: 0,
                last_reset: registered_at,
            },
        );
        info!(
            employer_id,
            company = %profile.company_name,
            daily_attestation_limit,
            "registered employer"
        );

        Ok(profile)
    }

    /// Sign an attestation on behalf of an employer.
    ///
    /// Structural validation gates signing; the daily rate window is
    /// checked before the vault is asked for a signature, so a denied
    /// request never advances `signature_count`.
    pub fn sign_attestation(
        &self,
        employer_id: &str,
        mut attestation: WageAttestation,
    ) -> Result<SignedAttestation> {
        let profile = self
            .profiles
            .get(employer_id)
            .ok_or_else(|| Error::UnknownEmployer(employer_id.to_string()))?;
        let limit = profile.daily_attestation_limit;
        drop(profile);

        if attestation.employer_id != employer_id {
            return Err(Error::InvalidAttestationFormat(vec![format!(
                "attestation employer_id {:?} does not match signer {:?}",
                attestation.employer_id, employer_id
            )]));
        }
        attestation.validate_structure()?;

        // The window entry stays locked across the signing call, so rate
        // accounting and signing are serialized per employer.
        let mut window = self
            .rate_windows
            .entry(employer_id.to_string())
            .or_insert_with(|| RateWindow {
                count: 0,
                last_reset: self.clock.now(),
            });

        let now = self.clock.now();
        if now - window.last_reset >= Duration::hours(24) {
            window.count = 0;
            window.last_reset = now;
        }
        if window.count >= limit {
            warn!(
                employer_id,
                count = window.count,
                limit,
                "daily attestation limit reached"
            );
            return Err(Error::RateLimitExceeded {
                count: window.count,
                limit,
            });
        }

        let digest = canonical::signing_digest(&attestation)?;
        let signature_info = self.vault.sign(employer_id, &digest)?;
        window.count += 1;
        drop(window);

        attestation.assign_id()?;
        attestation.signature = Some(signature_info.signature.clone());

        Ok(SignedAttestation {
            attestation,
            signature_info,
        })
    }

    /// Verify an attestation's signature against the employer's key.
    ///
    /// Returns false on any failure: unknown employer, missing signature,
    /// malformed hex, or signature mismatch.
    pub fn verify_attestation(&self, attestation: &WageAttestation, employer_id: &str) -> bool {
        let Some(signature_hex) = attestation.signature.as_deref() else {
            return false;
        };
        let Ok(signature) = hex::decode(signature_hex) else {
            return false;
        };
        let Ok(public_key) = self.vault.public_key(employer_id) else {
            return false;
        };
        let Ok(digest) = canonical::signing_digest(attestation) else {
            return false;
        };
        KeyVault::verify(&public_key, &signature, &digest)
    }

    /// Profile for an employer
    pub fn info(&self, employer_id: &str) -> Result<EmployerProfile> {
        self.profiles
            .get(employer_id)
            .map(|p| p.clone())
            .ok_or_else(|| Error::UnknownEmployer(employer_id.to_string()))
    }

    /// All registered employers
    pub fn list_employers(&self) -> Vec<EmployerProfile> {
        self.profiles.iter().map(|e| e.value().clone()).collect()
    }

    /// Vault access log entries, newest first
    pub fn audit_logs(&self, employer_id: Option<&str>, limit: usize) -> Vec<AccessLogEntry> {
        self.vault.access_logs(employer_id, limit)
    }

    /// Update the only mutable profile field
    pub fn set_verification_status(
        &self,
        employer_id: &str,
        status: VerificationStatus,
    ) -> Result<()> {
        let mut profile = self
            .profiles
            .get_mut(employer_id)
            .ok_or_else(|| Error::UnknownEmployer(employer_id.to_string()))?;
        profile.verification_status = status;
        Ok(())
    }

    /// Signatures spent in the current 24h window
    pub fn window_usage(&self, employer_id: &str) -> Option<u32> {
        self.rate_windows.get(employer_id).map(|w| w.count)
    }
}

impl KeyDirectory for EmployerRegistry {
    fn public_key(&self, employer_id: &str) -> Option<Vec<u8>> {
        self.vault.public_key(employer_id).ok()
    }
}

/// Derive a stable employer identifier.
///
/// First 16 hex chars of SHA-256 over
/// `normalize(name) ‖ "_" ‖ normalize(domain) ‖ "_" ‖ registered_at_ms`.
pub fn derive_employer_id(
    company_name: &str,
    domain: Option<&str>,
    registered_at: DateTime<Utc>,
) -> String {
    let material = format!(
        "{}_{}_{}",
        normalize_name(company_name),
        normalize_domain(domain.unwrap_or_default()),
        registered_at.timestamp_millis()
    );
    let mut hasher = Sha256::new();
    hasher.update(material.as_bytes());
    hex::encode(hasher.finalize())[..EMPLOYER_ID_HEX_LEN].to_string()
}

fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

fn normalize_domain(domain: &str) -> String {
    domain
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '.')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use attestation_core::{ManualClock, PayrollFrequency};
    use rust_decimal_macros::dec;

    fn request(employee_count: u32) -> RegistrationRequest {
        RegistrationRequest {
            company_name: "Meridian Logistics, Inc.".to_string(),
            domain: Some("Meridian-Logistics.example".to_string()),
            employee_count,
            payroll_frequency: PayrollFrequency::Weekly,
            contact_email: "payroll@meridian.example".to_string(),
        }
    }

    fn registry_with_clock() -> (EmployerRegistry, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let vault = Arc::new(KeyVault::new(clock.clone()));
        (EmployerRegistry::new(vault, clock.clone()), clock)
    }

    fn attestation_for(registry: &EmployerRegistry, employer_id: &str) -> WageAttestation {
        let now = registry.clock.now();
        WageAttestation {
            attestation_id: String::new(),
            employer_id: employer_id.to_string(),
            employee_wallet: "0x742d35cc6634c0532925a3b8d000b45f5c964c12".to_string(),
            wage_amount: 500_000,
            period_start: now - Duration::days(8),
            period_end: now - Duration::days(1),
            hours_worked: dec!(40),
            hourly_rate: 12_500,
            period_nonce: attestation_core::random_period_nonce(),
            timestamp: now,
            signature: None,
        }
    }

    #[test]
    fn test_register_shapes_identity() {
        let (registry, _) = registry_with_clock();
        let profile = registry.register(request(50)).unwrap();

        assert_eq!(profile.employer_id.len(), 16);
        assert!(profile.employer_id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(profile.public_key.len(), 130); // 65 bytes hex
        assert_eq!(profile.key_id.len(), 16);
        assert_eq!(profile.daily_attestation_limit, 500);
        assert_eq!(profile.verification_status, VerificationStatus::Pending);
    }

    #[test]
    fn test_daily_limit_is_capped() {
        let (registry, _) = registry_with_clock();
        let profile = registry.register(request(5000)).unwrap();
        assert_eq!(profile.daily_attestation_limit, 1000);
    }

    #[test]
    fn test_same_company_gets_distinct_ids() {
        let (registry, clock) = registry_with_clock();
        let first = registry.register(request(10)).unwrap();
        clock.advance(Duration::milliseconds(1));
        let second = registry.register(request(10)).unwrap();
        assert_ne!(first.employer_id, second.employer_id);
    }

    #[test]
    fn test_identity_normalization() {
        let at = Utc::now();
        let a = derive_employer_id("Acme Corp!", Some("ACME.example"), at);
        let b = derive_employer_id("acmecorp", Some("acme.example"), at);
        assert_eq!(a, b);
    }

    #[test]
    fn test_sign_and_verify_attestation() {
        let (registry, _) = registry_with_clock();
        let profile = registry.register(request(10)).unwrap();

        let attestation = attestation_for(&registry, &profile.employer_id);
        let signed = registry
            .sign_attestation(&profile.employer_id, attestation)
            .unwrap();

        assert_eq!(signed.attestation.attestation_id.len(), 24);
        assert!(signed.attestation.signature.is_some());
        assert!(registry.verify_attestation(&signed.attestation, &profile.employer_id));

        // Tampering with the wage breaks verification
        let mut tampered = signed.attestation.clone();
        tampered.wage_amount += 1;
        assert!(!registry.verify_attestation(&tampered, &profile.employer_id));
    }

    #[test]
    fn test_structural_failure_is_never_signed() {
        let (registry, _) = registry_with_clock();
        let profile = registry.register(request(10)).unwrap();

        let mut attestation = attestation_for(&registry, &profile.employer_id);
        attestation.wage_amount = -1;
        let err = registry
            .sign_attestation(&profile.employer_id, attestation)
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ATTESTATION_FORMAT");

        // No signature was produced
        assert_eq!(registry.window_usage(&profile.employer_id), Some(0));
    }

    #[test]
    fn test_rate_limit_window() {
        let (registry, clock) = registry_with_clock();
        // employee_count 1 → limit 10
        let profile = registry.register(request(1)).unwrap();
        assert_eq!(profile.daily_attestation_limit, 10);

        for _ in 0..10 {
            let attestation = attestation_for(&registry, &profile.employer_id);
            registry
                .sign_attestation(&profile.employer_id, attestation)
                .unwrap();
        }

        // The 11th attempt in the window fails without a signature
        let attestation = attestation_for(&registry, &profile.employer_id);
        let err = registry
            .sign_attestation(&profile.employer_id, attestation)
            .unwrap_err();
        assert_eq!(err.error_code(), "RATE_LIMIT_EXCEEDED");

        let logs = registry.audit_logs(Some(&profile.employer_id), 100);
        let signatures = logs
            .iter()
            .filter(|e| e.operation == crate::audit::VaultOperation::Signature)
            .count();
        assert_eq!(signatures, 10);

        // After the window resets, signing resumes
        clock.advance(Duration::hours(24));
        let attestation = attestation_for(&registry, &profile.employer_id);
        assert!(registry
            .sign_attestation(&profile.employer_id, attestation)
            .is_ok());
    }

    #[test]
    fn test_unknown_employer() {
        let (registry, _) = registry_with_clock();
        let attestation = attestation_for(&registry, "0000000000000000");
        let err = registry
            .sign_attestation("0000000000000000", attestation)
            .unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_EMPLOYER");
    }

    #[test]
    fn test_verification_status_update() {
        let (registry, _) = registry_with_clock();
        let profile = registry.register(request(10)).unwrap();
        registry
            .set_verification_status(&profile.employer_id, VerificationStatus::Verified)
            .unwrap();
        assert_eq!(
            registry.info(&profile.employer_id).unwrap().verification_status,
            VerificationStatus::Verified
        );
    }
}
