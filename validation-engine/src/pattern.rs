//! Fraud-pattern analysis
//!
//! Statistical checks over the recent attestation history of one
//! `(employee_wallet, employer_id)` pair. Findings are security flags; they
//! never fail a validation on their own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use attestation_core::WageAttestation;

/// Flag: wage deviates more than the configured sigma band from history
pub const FLAG_UNUSUAL_WAGE_PATTERN: &str = "UNUSUAL_WAGE_PATTERN";
/// Flag: attestation frequency exceeds the per-day threshold
pub const FLAG_HIGH_FREQUENCY: &str = "HIGH_FREQUENCY";
/// Flag: hourly rates cluster on round-dollar values
pub const FLAG_ROUND_NUMBER_BIAS: &str = "ROUND_NUMBER_BIAS";

/// Pattern analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternConfig {
    /// History window (days)
    pub window_days: i64,

    /// Wage deviation threshold in population standard deviations
    pub sigma_multiplier: f64,

    /// Deviation only counts when sigma exceeds this fraction of the mean
    pub sigma_floor_ratio: f64,

    /// Maximum attestations per day over the window
    pub max_per_day: f64,

    /// Fraction of round-dollar rates that triggers the bias flag
    pub round_rate_fraction: f64,

    /// Minimum samples before the bias flag can fire
    pub round_rate_min_samples: usize,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            window_days: 30,
            sigma_multiplier: 2.0,
            sigma_floor_ratio: 0.1,
            max_per_day: 2.0,
            round_rate_fraction: 0.8,
            round_rate_min_samples: 5,
        }
    }
}

/// Analyzer over one pair's attestation history
pub struct PatternAnalyzer {
    config: PatternConfig,
}

impl PatternAnalyzer {
    /// Create an analyzer with the given configuration
    pub fn new(config: PatternConfig) -> Self {
        Self { config }
    }

    /// Flags raised by admitting `candidate` against `history`.
    ///
    /// `history` is the pair's admitted attestations; only those whose
    /// creation timestamp falls inside the window are considered.
    pub fn analyze(
        &self,
        candidate: &WageAttestation,
        history: &[WageAttestation],
        now: DateTime<Utc>,
    ) -> Vec<String> {
        let window_start = now - chrono::Duration::days(self.config.window_days);
        let windowed: Vec<&WageAttestation> = history
            .iter()
            .filter(|a| a.timestamp >= window_start)
            .collect();

        let mut flags = Vec::new();

        if let Some(flag) = self.wage_deviation(candidate, &windowed) {
            flags.push(flag);
        }
        if let Some(flag) = self.frequency(&windowed) {
            flags.push(flag);
        }
        if let Some(flag) = self.round_number_bias(candidate, &windowed) {
            flags.push(flag);
        }
        flags
    }

    /// Population statistics over history; flags a candidate wage outside
    /// the sigma band when the history itself is sufficiently dispersed.
    fn wage_deviation(
        &self,
        candidate: &WageAttestation,
        windowed: &[&WageAttestation],
    ) -> Option<String> {
        if windowed.is_empty() {
            return None;
        }
        let n = windowed.len() as f64;
        let mean = windowed.iter().map(|a| a.wage_amount as f64).sum::<f64>() / n;
        let variance = windowed
            .iter()
            .map(|a| {
                let d = a.wage_amount as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / n;
        let sigma = variance.sqrt();

        let deviation = (candidate.wage_amount as f64 - mean).abs();
        if deviation > self.config.sigma_multiplier * sigma
            && sigma > self.config.sigma_floor_ratio * mean
        {
            return Some(FLAG_UNUSUAL_WAGE_PATTERN.to_string());
        }
        None
    }

    fn frequency(&self, windowed: &[&WageAttestation]) -> Option<String> {
        let per_day = (windowed.len() + 1) as f64 / self.config.window_days as f64;
        if per_day > self.config.max_per_day {
            return Some(FLAG_HIGH_FREQUENCY.to_string());
        }
        None
    }

    fn round_number_bias(
        &self,
        candidate: &WageAttestation,
        windowed: &[&WageAttestation],
    ) -> Option<String> {
        let rates: Vec<i64> = windowed
            .iter()
            .map(|a| a.hourly_rate)
            .chain(std::iter::once(candidate.hourly_rate))
            .collect();
        if rates.len() < self.config.round_rate_min_samples {
            return None;
        }
        let round = rates.iter().filter(|r| *r % 100 == 0).count() as f64;
        if round / rates.len() as f64 > self.config.round_rate_fraction {
            return Some(FLAG_ROUND_NUMBER_BIAS.to_string());
        }
        None
    }
}

impl Default for PatternAnalyzer {
    fn default() -> Self {
        Self::new(PatternConfig::default())
    }
}
