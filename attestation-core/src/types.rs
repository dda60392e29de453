//! Attestation and employer record types

use chrono::{DateTime, Utc};
use rand::RngCore;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::PERIOD_NONCE_BYTES;

// =========================================================================
// EMPLOYER TYPES
// =========================================================================

/// Payroll cadence declared at registration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayrollFrequency {
    /// Paid every week
    Weekly,
    /// Paid every two weeks
    Biweekly,
    /// Paid monthly
    Monthly,
}

/// Employer verification lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    /// Registered, not yet verified
    Pending,
    /// Verified by an operator
    Verified,
    /// Revoked; attestations must no longer be signed
    Revoked,
}

/// Employer profile owned by the registry
///
/// Immutable after registration except `verification_status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployerProfile {
    /// Stable identifier (16 lowercase hex chars, 8 bytes)
    pub employer_id: String,
    /// Legal or trading name
    pub company_name: String,
    /// Primary web domain
    pub domain: Option<String>,
    /// Declared headcount (drives the daily attestation limit)
    pub employee_count: u32,
    /// Payroll cadence
    pub payroll_frequency: PayrollFrequency,
    /// Operational contact
    pub contact_email: String,
    /// secp256k1 public key, uncompressed SEC1 (65 bytes, hex)
    pub public_key: String,
    /// First 16 hex chars of SHA-256 over the raw public key bytes
    pub key_id: String,
    /// Registration instant
    pub registered_at: DateTime<Utc>,
    /// Verification lifecycle state
    pub verification_status: VerificationStatus,
    /// Maximum signatures per rolling 24h window
    pub daily_attestation_limit: u32,
}

/// Registration request accepted by the registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationRequest {
    /// Legal or trading name
    pub company_name: String,
    /// Primary web domain
    pub domain: Option<String>,
    /// Declared headcount
    pub employee_count: u32,
    /// Payroll cadence
    pub payroll_frequency: PayrollFrequency,
    /// Operational contact
    pub contact_email: String,
}

// =========================================================================
// ATTESTATION TYPES
// =========================================================================

/// Employer-signed statement of earned wages over a period
///
/// Monetary fields are integer US cents. `hours_worked` is a decimal with at
/// most two fractional digits. `signature` stays empty until the registry
/// signs the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WageAttestation {
    /// Derived identifier: first 24 hex chars of the signing digest
    pub attestation_id: String,
    /// Issuing employer (16 lowercase hex chars)
    pub employer_id: String,
    /// Employee wallet (`0x` + 40 hex chars)
    pub employee_wallet: String,
    /// Gross wage for the period (cents)
    pub wage_amount: i64,
    /// Start of the work period (inclusive)
    pub period_start: DateTime<Utc>,
    /// End of the work period (exclusive for overlap purposes)
    pub period_end: DateTime<Utc>,
    /// Hours worked over the period
    pub hours_worked: Decimal,
    /// Hourly rate (cents per hour)
    pub hourly_rate: i64,
    /// Opaque per-period nonce, unique per employer/employee pair
    pub period_nonce: String,
    /// Creation instant
    pub timestamp: DateTime<Utc>,
    /// 64-byte `r‖s` low-s signature, hex (present once signed)
    pub signature: Option<String>,
}

/// Signature metadata returned by a signing operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureInfo {
    /// 64-byte `r‖s` low-s signature, hex
    pub signature: String,
    /// Recovery id (0 or 1)
    pub recovery_id: u8,
    /// Employer signature count after this operation
    pub signature_count: u64,
}

/// Attestation together with its signature metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedAttestation {
    /// The signed attestation (id and signature populated)
    pub attestation: WageAttestation,
    /// Signature metadata
    pub signature_info: SignatureInfo,
}

/// Generate a fresh period nonce: 16 random bytes, hex-encoded.
///
/// Drawn from the OS entropy source; never from a seedable generator.
pub fn random_period_nonce() -> String {
    let mut bytes = [0u8; PERIOD_NONCE_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Generate a random employee wallet (20 bytes, `0x` + 40 lowercase hex).
pub fn random_wallet() -> String {
    let mut bytes = [0u8; 20];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    format!("0x{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_nonce_shape() {
        let nonce = random_period_nonce();
        assert_eq!(nonce.len(), PERIOD_NONCE_BYTES * 2);
        assert!(nonce.chars().all(|c| c.is_ascii_hexdigit()));

        // Two draws should differ
        assert_ne!(nonce, random_period_nonce());
    }

    #[test]
    fn test_random_wallet_shape() {
        let wallet = random_wallet();
        assert_eq!(wallet.len(), 42);
        assert!(wallet.starts_with("0x"));
        assert!(wallet[2..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_payroll_frequency_wire_form() {
        let json = serde_json::to_string(&PayrollFrequency::Biweekly).unwrap();
        assert_eq!(json, "\"BIWEEKLY\"");

        let status = serde_json::to_string(&VerificationStatus::Pending).unwrap();
        assert_eq!(status, "\"pending\"");
    }
}
