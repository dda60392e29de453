//! # Scenario Generator
//!
//! Produces signed attestation corpora for end-to-end testing: a fixed
//! roster of mock employers, a configurable number of scenarios per
//! employer, and a configurable fraction of adversarial variants. Output is
//! deterministic given a seed — every random choice comes from a seeded
//! generator and employer keys are derived from it.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod employers;
pub mod generator;

pub use attestation_core::{Error, Result};
pub use employers::{mock_employers, MockEmployer};
pub use generator::{
    AdversarialVariant, Scenario, ScenarioBatch, ScenarioConfig, ScenarioGenerator,
};
