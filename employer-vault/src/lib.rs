//! # Employer Vault
//!
//! Key custody and employer identity for the wage attestation service:
//! - secp256k1 key vault: per-employer signing oracle, usage accounting,
//!   low-s signatures with recovery ids
//! - Employer registry: stable identity derivation and per-employer daily
//!   rate limits
//! - Append-only access log with a SHA-256 hash chain
//!
//! Private key material is owned exclusively by the vault and never crosses
//! the public interface.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod audit;
pub mod registry;
pub mod vault;

pub use attestation_core::{Error, Result};
pub use audit::{AccessLog, AccessLogEntry, VaultOperation};
pub use registry::EmployerRegistry;
pub use vault::{KeyHandle, KeyStats, KeyVault};
