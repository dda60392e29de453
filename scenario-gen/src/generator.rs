//! Deterministic scenario generation
//!
//! Composes the model, canonicalizer, vault, and registry to emit signed
//! corpora. Every random draw comes from one seeded generator, employer
//! keys are derived from it, and the clock is pinned to the configured base
//! time, so two runs with the same config emit byte-identical batches.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::info;

use attestation_core::{
    EmployerProfile, ManualClock, RegistrationRequest, Result, WageAttestation,
};
use employer_vault::{EmployerRegistry, KeyVault};
use validation_engine::validator::expected_wage;

use crate::employers::{mock_employers, MockEmployer};

/// Generator configuration
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    /// Scenarios generated per mock employer
    pub scenarios_per_employer: usize,
    /// Fraction of scenarios receiving an adversarial mutation
    pub adversarial_fraction: f64,
    /// Seed for every random draw
    pub seed: u64,
    /// Pinned "now" for the run
    pub base_time: DateTime<Utc>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            scenarios_per_employer: 10,
            adversarial_fraction: 0.05,
            seed: 42,
            base_time: DateTime::parse_from_rfc3339("2024-06-04T12:00:00.000Z")
                .unwrap()
                .with_timezone(&Utc),
        }
    }
}

/// Adversarial mutation applied to a scenario
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdversarialVariant {
    /// Wage inflated to 1.5× the exact calculation
    WageCalculationMismatch,
    /// 25 hours claimed inside a one-day window
    ExcessiveHours,
    /// Period ends seven days in the future
    FutureWorkPeriod,
    /// Wage and hours negated
    NegativeValues,
    /// Hourly rate of 100,000 cents
    UnrealisticRate,
}

impl AdversarialVariant {
    const ALL: [AdversarialVariant; 5] = [
        AdversarialVariant::WageCalculationMismatch,
        AdversarialVariant::ExcessiveHours,
        AdversarialVariant::FutureWorkPeriod,
        AdversarialVariant::NegativeValues,
        AdversarialVariant::UnrealisticRate,
    ];

    /// Error code the validator is expected to report
    pub fn expected_error(&self) -> &'static str {
        match self {
            AdversarialVariant::WageCalculationMismatch => "WAGE_CALCULATION_MISMATCH",
            AdversarialVariant::ExcessiveHours => "HOURS_EXCEED_LIMIT",
            AdversarialVariant::FutureWorkPeriod => "FUTURE_PERIOD",
            AdversarialVariant::NegativeValues => "INVALID_ATTESTATION_FORMAT",
            // The pinned 40 h at this rate also breach the wage cap; the
            // rate ceiling itself only warns.
            AdversarialVariant::UnrealisticRate => "WAGE_LIMIT_EXCEEDED",
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            AdversarialVariant::WageCalculationMismatch => {
                "wage inflated to 1.5x the hours-times-rate product"
            }
            AdversarialVariant::ExcessiveHours => "25 hours claimed in a single-day window",
            AdversarialVariant::FutureWorkPeriod => "work period ending seven days from now",
            AdversarialVariant::NegativeValues => "negated wage and hours",
            AdversarialVariant::UnrealisticRate => "hourly rate of 100,000 cents",
        }
    }
}

/// One generated scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Stable id: employer key plus index
    pub scenario_id: String,
    /// Mock employer key
    pub employer: String,
    /// Registry-derived employer id
    pub employer_id: String,
    /// The attestation (signed unless structurally broken)
    pub attestation: WageAttestation,
    /// Whether the validator is expected to admit it
    pub expected_valid: bool,
    /// Expected error code for adversarial scenarios
    pub expected_error: Option<String>,
    /// Human description
    pub description: String,
}

/// A full generated corpus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioBatch {
    /// Seed the batch was generated from
    pub seed: u64,
    /// Registered mock employers
    pub employers: Vec<EmployerProfile>,
    /// Generated scenarios
    pub scenarios: Vec<Scenario>,
}

/// Deterministic corpus generator
pub struct ScenarioGenerator {
    config: ScenarioConfig,
}

impl ScenarioGenerator {
    /// Create a generator with the given configuration
    pub fn new(config: ScenarioConfig) -> Self {
        Self { config }
    }

    /// Generate the corpus: register the roster, then emit
    /// `scenarios_per_employer` scenarios per employer.
    pub fn generate(&self) -> Result<ScenarioBatch> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let clock = Arc::new(ManualClock::new(self.config.base_time));
        let vault = Arc::new(KeyVault::new(clock.clone()));
        let registry = EmployerRegistry::new(vault, clock);

        let mut employers = Vec::new();
        let mut roster_profiles: Vec<(MockEmployer, EmployerProfile)> = Vec::new();
        for employer in mock_employers() {
            let key_seed = rng.gen::<[u8; 32]>();
            let profile = registry.register_with_key_seed(
                RegistrationRequest {
                    company_name: employer.company_name.to_string(),
                    domain: Some(employer.domain.to_string()),
                    employee_count: employer.employee_count,
                    payroll_frequency: employer.payroll_frequency,
                    contact_email: format!("payroll@{}", employer.domain),
                },
                key_seed,
            )?;
            employers.push(profile.clone());
            roster_profiles.push((*employer, profile));
        }

        let mut scenarios = Vec::new();
        for (employer, profile) in &roster_profiles {
            for index in 0..self.config.scenarios_per_employer {
                let scenario =
                    self.build_scenario(&mut rng, &registry, employer, profile, index)?;
                scenarios.push(scenario);
            }
        }

        let adversarial = scenarios.iter().filter(|s| !s.expected_valid).count();
        info!(
            seed = self.config.seed,
            total = scenarios.len(),
            adversarial,
            "generated scenario corpus"
        );

        Ok(ScenarioBatch {
            seed: self.config.seed,
            employers,
            scenarios,
        })
    }

    fn build_scenario(
        &self,
        rng: &mut StdRng,
        registry: &EmployerRegistry,
        employer: &MockEmployer,
        profile: &EmployerProfile,
        index: usize,
    ) -> Result<Scenario> {
        let base = self.config.base_time;

        let wallet = format!("0x{}", hex::encode(rng.gen::<[u8; 20]>()));
        let days_back = rng.gen_range(1..=3);
        let period_end = base - Duration::days(days_back);
        let period_start = period_end - Duration::days(employer.period_days());
        let quarter_hours =
            rng.gen_range(employer.min_quarter_hours..=employer.max_quarter_hours);
        let hours_worked = Decimal::new(quarter_hours * 25, 2);
        let hourly_rate = rng.gen_range(employer.min_rate_cents..=employer.max_rate_cents);
        let period_nonce = hex::encode(rng.gen::<[u8; 16]>());
        let timestamp = period_end + Duration::hours(rng.gen_range(1..=24));

        let mut attestation = WageAttestation {
            attestation_id: String::new(),
            employer_id: profile.employer_id.clone(),
            employee_wallet: wallet,
            wage_amount: expected_wage(hours_worked, hourly_rate).unwrap_or_default(),
            period_start,
            period_end,
            hours_worked,
            hourly_rate,
            period_nonce,
            timestamp,
            signature: None,
        };

        let variant = if rng.gen_bool(self.config.adversarial_fraction) {
            Some(AdversarialVariant::ALL[rng.gen_range(0..AdversarialVariant::ALL.len())])
        } else {
            None
        };

        let (expected_valid, expected_error, description) = match variant {
            None => (
                true,
                None,
                format!(
                    "{} hours at {} cents/hour for {}",
                    attestation.hours_worked, attestation.hourly_rate, employer.company_name
                ),
            ),
            Some(variant) => {
                self.apply_variant(&mut attestation, variant);
                (
                    false,
                    Some(variant.expected_error().to_string()),
                    format!("adversarial: {}", variant.describe()),
                )
            }
        };

        // Structurally broken variants cannot be signed; everything else
        // goes through the registry so the signature itself is valid.
        let attestation = if attestation.structural_errors().is_empty() {
            registry
                .sign_attestation(&profile.employer_id, attestation)?
                .attestation
        } else {
            attestation
        };

        Ok(Scenario {
            scenario_id: format!("{}-{:03}", employer.key, index),
            employer: employer.key.to_string(),
            employer_id: profile.employer_id.clone(),
            attestation,
            expected_valid,
            expected_error,
            description,
        })
    }

    fn apply_variant(&self, attestation: &mut WageAttestation, variant: AdversarialVariant) {
        let base = self.config.base_time;
        match variant {
            AdversarialVariant::WageCalculationMismatch => {
                let inflated = Decimal::new(15, 1)
                    * attestation.hours_worked
                    * Decimal::from(attestation.hourly_rate);
                attestation.wage_amount = inflated
                    .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                    .to_i64()
                    .unwrap_or_default();
            }
            AdversarialVariant::ExcessiveHours => {
                attestation.period_start = attestation.period_end - Duration::days(1);
                attestation.hours_worked = Decimal::from(25);
                attestation.wage_amount =
                    expected_wage(attestation.hours_worked, attestation.hourly_rate)
                        .unwrap_or_default();
            }
            AdversarialVariant::FutureWorkPeriod => {
                attestation.period_start = base;
                attestation.period_end = base + Duration::days(7);
                attestation.timestamp = base;
            }
            AdversarialVariant::NegativeValues => {
                attestation.wage_amount = -attestation.wage_amount;
                attestation.hours_worked = -attestation.hours_worked;
            }
            AdversarialVariant::UnrealisticRate => {
                attestation.hourly_rate = 100_000;
                attestation.hours_worked = Decimal::from(40);
                attestation.wage_amount =
                    expected_wage(attestation.hours_worked, attestation.hourly_rate)
                        .unwrap_or_default();
            }
        }
    }
}
