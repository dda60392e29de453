//! Structural self-validation of attestation records
//!
//! These checks run before any signing: a record that fails them MUST NOT
//! be signed. They cover field formats and the arithmetic-free invariants;
//! policy evaluation and anti-replay live in the validation engine.

use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;

use crate::{canonical, types::WageAttestation, Error, Result, HOURS_MAX_SCALE};

fn wallet_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").unwrap())
}

fn employer_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9a-f]{16}$").unwrap())
}

impl WageAttestation {
    /// Ordered list of structural violations; empty means the record is
    /// well-formed.
    pub fn structural_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.employer_id.is_empty() {
            errors.push("employer_id is required".to_string());
        } else if !employer_id_regex().is_match(&self.employer_id) {
            errors.push(format!(
                "employer_id must be 16 lowercase hex chars, got {:?}",
                self.employer_id
            ));
        }

        if self.employee_wallet.is_empty() {
            errors.push("employee_wallet is required".to_string());
        } else if !wallet_regex().is_match(&self.employee_wallet) {
            errors.push(format!(
                "employee_wallet must be 0x followed by 40 hex chars, got {:?}",
                self.employee_wallet
            ));
        }

        if self.period_end <= self.period_start {
            errors.push(format!(
                "period_end {} must be after period_start {}",
                canonical::format_instant(&self.period_end),
                canonical::format_instant(&self.period_start)
            ));
        }

        if self.wage_amount < 0 {
            errors.push(format!(
                "wage_amount must be non-negative, got {}",
                self.wage_amount
            ));
        }

        if self.hours_worked < Decimal::ZERO {
            errors.push(format!(
                "hours_worked must be non-negative, got {}",
                self.hours_worked
            ));
        } else if self.hours_worked.round_dp(HOURS_MAX_SCALE) != self.hours_worked {
            errors.push(format!(
                "hours_worked carries more than {} fractional digits: {}",
                HOURS_MAX_SCALE, self.hours_worked
            ));
        }

        if self.hourly_rate < 0 {
            errors.push(format!(
                "hourly_rate must be non-negative, got {}",
                self.hourly_rate
            ));
        }

        if self.period_nonce.is_empty() {
            errors.push("period_nonce is required".to_string());
        }

        errors
    }

    /// Structural validation as a result; the error carries all violations.
    pub fn validate_structure(&self) -> Result<()> {
        let errors = self.structural_errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidAttestationFormat(errors))
        }
    }

    /// Recompute and store the derived attestation identifier.
    pub fn assign_id(&mut self) -> Result<()> {
        self.attestation_id = canonical::attestation_id(self)?;
        Ok(())
    }

    /// Whole days covered by the period, rounded up.
    ///
    /// A period of any positive length counts as at least one day; this is
    /// the denominator of the hours-per-day policy check.
    pub fn period_days(&self) -> i64 {
        let millis = (self.period_end - self.period_start).num_milliseconds();
        const DAY_MS: i64 = 86_400_000;
        ((millis + DAY_MS - 1) / DAY_MS).max(1)
    }

    /// Anti-replay key: `employer_id:employee_wallet:period_nonce`.
    ///
    /// The wallet is lowercased so replay detection matches the canonical
    /// form regardless of input casing.
    pub fn period_key(&self) -> String {
        format!(
            "{}:{}:{}",
            self.employer_id,
            self.employee_wallet.to_lowercase(),
            self.period_nonce
        )
    }
}
