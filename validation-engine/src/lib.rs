//! # Validation Engine
//!
//! The gatekeeper between signed attestations and the attestation store:
//! - Five ordered check suites: format, anti-replay, policy, temporal,
//!   pattern analysis
//! - Nullifier derivation and atomic admission into the ledger
//! - In-memory reference ledger behind the [`AttestationStore`] seam
//!
//! Admission for a given `(employer, employee)` pair is a single critical
//! section; no state is mutated when a check rejects.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod ledger;
pub mod pattern;
pub mod validator;

pub use attestation_core::{Error, Result};
pub use ledger::{AttestationStore, InMemoryLedger};
pub use pattern::{PatternAnalyzer, PatternConfig};
pub use validator::{AttestationValidator, OverlapKind, ValidationIssue, ValidationReport};
