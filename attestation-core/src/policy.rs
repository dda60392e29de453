//! Per-employer attestation policy

use serde::{Deserialize, Serialize};

/// Policy bundle governing admissible attestations for one employer
///
/// Read-mostly: the validator may cache a bundle across admissions; updates
/// apply to subsequent admissions only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyBundle {
    /// Maximum attestations per rolling 24h window
    pub max_daily_attestations: u32,

    /// Maximum wage per attestation (cents)
    pub max_wage_per_attestation: i64,

    /// Minimum hourly rate (cents/hour); below is a rejection
    pub min_hourly_rate: i64,

    /// Maximum hourly rate (cents/hour); above is a warning
    pub max_hourly_rate: i64,

    /// Maximum average hours per day over the period
    pub max_hours_per_day: u32,

    /// Whether periods ending in the future are admissible
    pub allow_future_attestations: bool,

    /// Whether `wage_amount` must equal round(hours × rate)
    pub require_exact_wage_calculation: bool,

    /// Maximum age of an attestation at validation time (hours)
    pub max_attestation_age_hours: i64,
}

impl Default for PolicyBundle {
    fn default() -> Self {
        Self {
            max_daily_attestations: 1000,
            max_wage_per_attestation: 2_000_000, // $20,000
            min_hourly_rate: 725,                // federal minimum wage
            max_hourly_rate: 50_000,             // $500/hour
            max_hours_per_day: 12,
            allow_future_attestations: false,
            require_exact_wage_calculation: true,
            max_attestation_age_hours: 168, // 7 days
        }
    }
}
