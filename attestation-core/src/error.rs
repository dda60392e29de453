//! Error types for attestation operations
//!
//! Every variant maps to a stable wire-visible `error_code` string; the
//! human-readable message travels alongside it.

use thiserror::Error;

/// Attestation result type
pub type Result<T> = std::result::Result<T, Error>;

/// Attestation errors
#[derive(Error, Debug)]
pub enum Error {
    /// Structural validation of the attestation model failed
    #[error("Invalid attestation format: {}", .0.join("; "))]
    InvalidAttestationFormat(Vec<String>),

    /// Period nonce already used for this employer/employee pair
    #[error("Replay attempt: nonce {nonce} already used for {employer_id}/{employee_wallet}")]
    ReplayAttempt {
        /// Employer identifier
        employer_id: String,
        /// Employee wallet
        employee_wallet: String,
        /// Reused nonce
        nonce: String,
    },

    /// New period overlaps an admitted period for the same pair
    #[error("Overlapping period ({classification}): conflicts with attestation {existing_id}")]
    OverlappingPeriod {
        /// Overlap classification
        classification: String,
        /// Attestation already admitted for the overlapping period
        existing_id: String,
    },

    /// Wage exceeds the per-attestation policy cap
    #[error("Wage limit exceeded: {wage_amount} > {max_wage} cents")]
    WageLimitExceeded {
        /// Claimed wage (cents)
        wage_amount: i64,
        /// Policy cap (cents)
        max_wage: i64,
    },

    /// Daily attestation cap reached for the employer
    #[error("Rate limit exceeded: {count}/{limit} attestations in the current 24h window")]
    RateLimitExceeded {
        /// Signatures already produced in the window
        count: u32,
        /// Daily limit
        limit: u32,
    },

    /// Average hours per day exceeds policy
    #[error("Hours exceed limit: {avg_hours_per_day} h/day > {max_hours_per_day} h/day")]
    HoursExceedLimit {
        /// Computed average hours per day
        avg_hours_per_day: String,
        /// Policy maximum
        max_hours_per_day: String,
    },

    /// Period ends in the future while future attestations are disallowed
    #[error("Future period: period_end {period_end} is after now")]
    FuturePeriod {
        /// Offending period end (RFC 3339)
        period_end: String,
    },

    /// Exact wage-calculation policy failed
    #[error("Wage calculation mismatch: claimed {claimed} cents, expected {expected} cents")]
    WageCalculationMismatch {
        /// Claimed wage (cents)
        claimed: i64,
        /// hours × rate, half-up rounded (cents)
        expected: i64,
    },

    /// Attestation timestamp exceeds the policy age limit
    #[error("Attestation too old: created {age_hours}h ago, limit {max_age_hours}h")]
    AttestationTooOld {
        /// Age at validation time (hours)
        age_hours: i64,
        /// Policy limit (hours)
        max_age_hours: i64,
    },

    /// Employer id not present in the registry or vault
    #[error("Unknown employer: {0}")]
    UnknownEmployer(String),

    /// Signature verification failed
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// Canonicalization hit a non-finite number or illegal instant
    #[error("Canonicalization failed: {0}")]
    CanonicalizationFailed(String),

    /// Employer already holds a key pair in the vault
    #[error("Duplicate employer: {0} already has a key pair")]
    DuplicateEmployer(String),

    /// Signing digest is not exactly 32 bytes
    #[error("Invalid digest length: expected 32 bytes, got {0}")]
    InvalidDigestLength(usize),

    /// Key generation rejected 256 consecutive candidate scalars
    #[error("Key generation exhausted after {0} rejected candidates")]
    KeyGenerationExhausted(u32),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Stable wire-visible error code for this error kind.
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidAttestationFormat(_) => "INVALID_ATTESTATION_FORMAT",
            Error::ReplayAttempt { .. } => "REPLAY_ATTEMPT",
            Error::OverlappingPeriod { .. } => "OVERLAPPING_PERIOD",
            Error::WageLimitExceeded { .. } => "WAGE_LIMIT_EXCEEDED",
            Error::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
            Error::HoursExceedLimit { .. } => "HOURS_EXCEED_LIMIT",
            Error::FuturePeriod { .. } => "FUTURE_PERIOD",
            Error::WageCalculationMismatch { .. } => "WAGE_CALCULATION_MISMATCH",
            Error::AttestationTooOld { .. } => "ATTESTATION_TOO_OLD",
            Error::UnknownEmployer(_) => "UNKNOWN_EMPLOYER",
            Error::InvalidSignature(_) => "INVALID_SIGNATURE",
            Error::CanonicalizationFailed(_) => "CANONICALIZATION_FAILED",
            Error::DuplicateEmployer(_) => "DUPLICATE_EMPLOYER",
            Error::InvalidDigestLength(_) => "INVALID_DIGEST_LENGTH",
            Error::KeyGenerationExhausted(_) => "KEY_GENERATION_EXHAUSTED",
            Error::Json(_) => "CANONICALIZATION_FAILED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(
            Error::UnknownEmployer("abc".into()).error_code(),
            "UNKNOWN_EMPLOYER"
        );
        assert_eq!(
            Error::RateLimitExceeded { count: 10, limit: 10 }.error_code(),
            "RATE_LIMIT_EXCEEDED"
        );
        assert_eq!(
            Error::InvalidAttestationFormat(vec!["bad wallet".into()]).error_code(),
            "INVALID_ATTESTATION_FORMAT"
        );
    }

    #[test]
    fn test_error_messages_carry_detail() {
        let err = Error::WageCalculationMismatch {
            claimed: 750_000,
            expected: 500_000,
        };
        let msg = err.to_string();
        assert!(msg.contains("750000"));
        assert!(msg.contains("500000"));
    }
}
