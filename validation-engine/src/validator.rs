//! Attestation validator
//!
//! Runs the check suites in order — format, signature, anti-replay, policy,
//! temporal, pattern — and admits passing attestations into the ledger.
//! Format, signature, replay, policy, and age failures veto admission;
//! pattern findings and the remaining temporal findings only attach
//! warnings and security flags.

use std::fmt;
use std::sync::Arc;

use chrono::{Datelike, Weekday};
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use attestation_core::{
    canonical, Clock, Error, KeyDirectory, PolicyBundle, Result, WageAttestation,
};

use crate::ledger::AttestationStore;
use crate::pattern::{PatternAnalyzer, PatternConfig};

/// Security flag raised alongside a nonce replay rejection
pub const FLAG_REPLAY_ATTEMPT: &str = "REPLAY_ATTEMPT";
/// Security flag raised alongside an overlap rejection
pub const FLAG_OVERLAPPING_PERIODS: &str = "OVERLAPPING_PERIODS";

/// Classification of a period overlap against an admitted attestation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverlapKind {
    /// Both endpoints equal
    ExactDuplicate,
    /// New period lies inside the admitted period
    ContainedWithin,
    /// New period swallows the admitted period
    ContainsExisting,
    /// Periods intersect without containment
    PartialOverlap,
}

impl fmt::Display for OverlapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OverlapKind::ExactDuplicate => "EXACT_DUPLICATE",
            OverlapKind::ContainedWithin => "CONTAINED_WITHIN",
            OverlapKind::ContainsExisting => "CONTAINS_EXISTING",
            OverlapKind::PartialOverlap => "PARTIAL_OVERLAP",
        };
        f.write_str(s)
    }
}

/// One rejecting finding: wire-visible code plus a human message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Stable error code from the wire taxonomy
    pub error_code: String,
    /// Human-readable detail
    pub message: String,
}

impl ValidationIssue {
    fn from_error(error: &Error) -> Self {
        Self {
            error_code: error.error_code().to_string(),
            message: error.to_string(),
        }
    }
}

/// Validation verdict: three ordered finding lists plus the derived
/// nullifier when the attestation was admitted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    /// True iff no rejecting check vetoed
    pub is_valid: bool,
    /// Rejecting findings, in check order
    pub errors: Vec<ValidationIssue>,
    /// Non-fatal findings
    pub warnings: Vec<String>,
    /// Fraud/security flags
    pub security_flags: Vec<String>,
    /// Overlap classification when one was detected
    pub overlap: Option<OverlapKind>,
    /// Nullifier recorded on admission
    pub nullifier: Option<String>,
}

impl ValidationReport {
    fn rejected() -> Self {
        Self {
            is_valid: false,
            errors: Vec::new(),
            warnings: Vec::new(),
            security_flags: Vec::new(),
            overlap: None,
            nullifier: None,
        }
    }

    /// Whether the errors contain the given wire code
    pub fn has_error(&self, code: &str) -> bool {
        self.errors.iter().any(|e| e.error_code == code)
    }
}

/// The gatekeeper between signed attestations and the ledger
pub struct AttestationValidator {
    store: Arc<dyn AttestationStore>,
    keys: Arc<dyn KeyDirectory>,
    policies: DashMap<String, PolicyBundle>,
    pattern: PatternAnalyzer,
    clock: Arc<dyn Clock>,
    admission_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl AttestationValidator {
    /// Create a validator over the given store and key directory
    pub fn new(
        store: Arc<dyn AttestationStore>,
        keys: Arc<dyn KeyDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            keys,
            policies: DashMap::new(),
            pattern: PatternAnalyzer::new(PatternConfig::default()),
            clock,
            admission_locks: DashMap::new(),
        }
    }

    /// Replace the pattern-analysis configuration
    pub fn with_pattern_config(mut self, config: PatternConfig) -> Self {
        self.pattern = PatternAnalyzer::new(config);
        self
    }

    /// Install a policy bundle for an employer.
    ///
    /// Applies to subsequent admissions only; employers without an explicit
    /// bundle get [`PolicyBundle::default`].
    pub fn set_policy(&self, employer_id: &str, policy: PolicyBundle) {
        self.policies.insert(employer_id.to_string(), policy);
    }

    /// Effective policy for an employer
    pub fn policy_for(&self, employer_id: &str) -> PolicyBundle {
        self.policies
            .get(employer_id)
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    /// Run all check suites without touching the ledger.
    pub fn validate(&self, attestation: &WageAttestation) -> ValidationReport {
        self.run_checks(attestation)
    }

    /// Validate and, on success, admit the attestation.
    ///
    /// The checks against the ledger and the corresponding inserts execute
    /// as one critical section per `(employer_id, employee_wallet)`.
    pub fn validate_and_admit(&self, attestation: &WageAttestation) -> ValidationReport {
        let lock = self.pair_lock(attestation);
        let _guard = lock.lock();

        let mut report = self.run_checks(attestation);
        if !report.is_valid {
            warn!(
                employer_id = %attestation.employer_id,
                errors = report.errors.len(),
                "attestation rejected"
            );
            return report;
        }

        match self.admit(attestation) {
            Ok(nullifier) => {
                info!(
                    employer_id = %attestation.employer_id,
                    attestation_id = %attestation.attestation_id,
                    nullifier = %nullifier,
                    "attestation admitted"
                );
                report.nullifier = Some(nullifier);
            }
            Err(error) => {
                report.is_valid = false;
                report.errors.push(ValidationIssue::from_error(&error));
            }
        }
        report
    }

    fn pair_lock(&self, attestation: &WageAttestation) -> Arc<Mutex<()>> {
        let key = format!(
            "{}:{}",
            attestation.employer_id,
            attestation.employee_wallet.to_lowercase()
        );
        self.admission_locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    // =====================================================================
    // CHECK SUITES
    // =====================================================================

    fn run_checks(&self, attestation: &WageAttestation) -> ValidationReport {
        let mut report = ValidationReport::rejected();
        let now = self.clock.now();

        // 1. Format
        let structural = attestation.structural_errors();
        if !structural.is_empty() {
            for message in structural {
                report.errors.push(ValidationIssue {
                    error_code: "INVALID_ATTESTATION_FORMAT".to_string(),
                    message,
                });
            }
            return report;
        }

        // Signature binding is fatal; nothing downstream can be trusted
        // without it.
        if let Err(error) = self.check_signature(attestation) {
            report.errors.push(ValidationIssue::from_error(&error));
            return report;
        }

        let policy = self.policy_for(&attestation.employer_id);
        let history = self
            .store
            .list(&attestation.employee_wallet, Some(&attestation.employer_id));

        // 2. Anti-replay
        self.check_replay(attestation, &history, &mut report);

        // 3. Policy
        self.check_policy(attestation, &policy, now, &mut report);

        // 4. Temporal
        self.check_temporal(attestation, &policy, now, &mut report);

        // 5. Pattern analysis (flags only)
        let flags = self.pattern.analyze(attestation, &history, now);
        report.security_flags.extend(flags);

        report.is_valid = report.errors.is_empty();
        debug!(
            employer_id = %attestation.employer_id,
            is_valid = report.is_valid,
            warnings = report.warnings.len(),
            flags = report.security_flags.len(),
            "check suites complete"
        );
        report
    }

    fn check_signature(&self, attestation: &WageAttestation) -> Result<()> {
        let public_key = self
            .keys
            .public_key(&attestation.employer_id)
            .ok_or_else(|| Error::UnknownEmployer(attestation.employer_id.clone()))?;

        let signature_hex = attestation
            .signature
            .as_deref()
            .ok_or_else(|| Error::InvalidSignature("attestation is unsigned".to_string()))?;
        let signature = hex::decode(signature_hex)
            .map_err(|e| Error::InvalidSignature(format!("malformed signature hex: {}", e)))?;
        let digest = canonical::signing_digest(attestation)?;

        if !verify_secp256k1(&public_key, &signature, &digest) {
            return Err(Error::InvalidSignature(
                "signature does not match employer key".to_string(),
            ));
        }
        Ok(())
    }

    fn check_replay(
        &self,
        attestation: &WageAttestation,
        history: &[WageAttestation],
        report: &mut ValidationReport,
    ) {
        let period_key = attestation.period_key();
        if self.store.nonce_seen(&period_key) {
            let error = Error::ReplayAttempt {
                employer_id: attestation.employer_id.clone(),
                employee_wallet: attestation.employee_wallet.clone(),
                nonce: attestation.period_nonce.clone(),
            };
            report.errors.push(ValidationIssue::from_error(&error));
            report.security_flags.push(FLAG_REPLAY_ATTEMPT.to_string());
        }

        // Half-open intervals: [start, end) — shared endpoints do not
        // overlap.
        for existing in history {
            if attestation.period_start < existing.period_end
                && attestation.period_end > existing.period_start
            {
                let kind = classify_overlap(attestation, existing);
                let error = Error::OverlappingPeriod {
                    classification: kind.to_string(),
                    existing_id: existing.attestation_id.clone(),
                };
                report.errors.push(ValidationIssue::from_error(&error));
                report
                    .security_flags
                    .push(FLAG_OVERLAPPING_PERIODS.to_string());
                report.overlap = Some(kind);
                break;
            }
        }
    }

    fn check_policy(
        &self,
        attestation: &WageAttestation,
        policy: &PolicyBundle,
        now: chrono::DateTime<chrono::Utc>,
        report: &mut ValidationReport,
    ) {
        if attestation.wage_amount > policy.max_wage_per_attestation {
            report.errors.push(ValidationIssue::from_error(
                &Error::WageLimitExceeded {
                    wage_amount: attestation.wage_amount,
                    max_wage: policy.max_wage_per_attestation,
                },
            ));
        }

        if attestation.hourly_rate < policy.min_hourly_rate {
            report.errors.push(ValidationIssue {
                error_code: "HOURLY_RATE_BELOW_MINIMUM".to_string(),
                message: format!(
                    "hourly_rate {} is below the policy minimum {}",
                    attestation.hourly_rate, policy.min_hourly_rate
                ),
            });
        } else if attestation.hourly_rate > policy.max_hourly_rate {
            report.warnings.push(format!(
                "RATE_ABOVE_MAXIMUM: hourly_rate {} exceeds the policy maximum {}",
                attestation.hourly_rate, policy.max_hourly_rate
            ));
        }

        let days = Decimal::from(attestation.period_days());
        let avg_hours_per_day = attestation.hours_worked / days;
        if avg_hours_per_day > Decimal::from(policy.max_hours_per_day) {
            report.errors.push(ValidationIssue::from_error(
                &Error::HoursExceedLimit {
                    avg_hours_per_day: avg_hours_per_day.round_dp(2).to_string(),
                    max_hours_per_day: policy.max_hours_per_day.to_string(),
                },
            ));
        }

        if !policy.allow_future_attestations && attestation.period_end > now {
            report.errors.push(ValidationIssue::from_error(
                &Error::FuturePeriod {
                    period_end: canonical::format_instant(&attestation.period_end),
                },
            ));
        }

        if policy.require_exact_wage_calculation {
            let expected = expected_wage(attestation.hours_worked, attestation.hourly_rate);
            if Some(attestation.wage_amount) != expected {
                report.errors.push(ValidationIssue::from_error(
                    &Error::WageCalculationMismatch {
                        claimed: attestation.wage_amount,
                        expected: expected.unwrap_or_default(),
                    },
                ));
            }
        }
    }

    fn check_temporal(
        &self,
        attestation: &WageAttestation,
        policy: &PolicyBundle,
        now: chrono::DateTime<chrono::Utc>,
        report: &mut ValidationReport,
    ) {
        let age = now - attestation.timestamp;
        if age > chrono::Duration::hours(policy.max_attestation_age_hours) {
            report.errors.push(ValidationIssue::from_error(
                &Error::AttestationTooOld {
                    age_hours: age.num_hours(),
                    max_age_hours: policy.max_attestation_age_hours,
                },
            ));
        }

        let span_ms = (attestation.period_end - attestation.period_start).num_milliseconds();
        if span_ms > 0 {
            let span_hours = Decimal::new(span_ms, 0) / Decimal::from(3_600_000);
            if attestation.hours_worked > span_hours {
                report.warnings.push(format!(
                    "HOURS_EXCEED_PERIOD_SPAN: {} hours claimed over a {}h period",
                    attestation.hours_worked,
                    span_hours.round_dp(1)
                ));
            }
        }

        for (label, endpoint) in [
            ("period_start", attestation.period_start),
            ("period_end", attestation.period_end),
        ] {
            let weekday = endpoint.weekday();
            if weekday == Weekday::Sat || weekday == Weekday::Sun {
                report.warnings.push(format!(
                    "WEEKEND_PERIOD_BOUNDARY: {} falls on a {}",
                    label, weekday
                ));
            }
        }
    }

    // =====================================================================
    // ADMISSION
    // =====================================================================

    fn admit(&self, attestation: &WageAttestation) -> Result<String> {
        let nullifier = canonical::nullifier_hex(
            &attestation.employer_id,
            &attestation.employee_wallet,
            &attestation.period_nonce,
            attestation.wage_amount,
        )?;
        if self.store.nullifier_seen(&nullifier) {
            return Err(Error::ReplayAttempt {
                employer_id: attestation.employer_id.clone(),
                employee_wallet: attestation.employee_wallet.clone(),
                nonce: attestation.period_nonce.clone(),
            });
        }

        let mut admitted = attestation.clone();
        if admitted.attestation_id.is_empty() {
            admitted.assign_id()?;
        }

        self.store.insert_nonce(&attestation.period_key());
        self.store.insert_nullifier(&nullifier);
        self.store.put(admitted);
        Ok(nullifier)
    }
}

/// Expected wage under the exact-calculation policy: hours × rate in the
/// decimal space, rounded half-up to whole cents.
pub fn expected_wage(hours_worked: Decimal, hourly_rate: i64) -> Option<i64> {
    let product = hours_worked * Decimal::from(hourly_rate);
    product
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

fn classify_overlap(new: &WageAttestation, existing: &WageAttestation) -> OverlapKind {
    if new.period_start == existing.period_start && new.period_end == existing.period_end {
        OverlapKind::ExactDuplicate
    } else if new.period_start >= existing.period_start && new.period_end <= existing.period_end {
        OverlapKind::ContainedWithin
    } else if new.period_start <= existing.period_start && new.period_end >= existing.period_end {
        OverlapKind::ContainsExisting
    } else {
        OverlapKind::PartialOverlap
    }
}

fn verify_secp256k1(public_key: &[u8], signature: &[u8], digest: &[u8; 32]) -> bool {
    use k256::ecdsa::signature::hazmat::PrehashVerifier;
    use k256::ecdsa::{Signature, VerifyingKey};

    let Ok(verifying_key) = VerifyingKey::from_sec1_bytes(public_key) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(signature) else {
        return false;
    };
    if signature.normalize_s().is_some() {
        return false;
    }
    verifying_key.verify_prehash(digest, &signature).is_ok()
}
