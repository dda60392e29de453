//! # Wage Attestation Core
//!
//! Data model and deterministic serialization for employer-signed wage
//! attestations:
//! - Typed attestation and employer records with structural self-validation
//! - Canonical JSON serialization and SHA-256 digests (byte-identical
//!   across implementations)
//! - Signing-payload projection and nullifier derivation
//! - Per-employer policy bundles
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │      Model      │ ← Typed records, structural invariants
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │  Canonicalizer  │ ← Sorted keys, NFC, fixed-precision numbers
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │     Digests     │ ← Signing digest, attestation id, nullifier
//! └─────────────────┘
//! ```
//!
//! ## Safety
//!
//! - `#![forbid(unsafe_code)]`: No unsafe operations
//! - Monetary values are integer minor units; hours are fixed-precision
//!   decimals
//! - All time reads go through an injected [`Clock`]

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod canonical;
pub mod clock;
pub mod error;
pub mod model;
pub mod policy;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use policy::PolicyBundle;
pub use types::*;

/// Length of a rendered employer identifier (16 lowercase hex chars).
pub const EMPLOYER_ID_HEX_LEN: usize = 16;

/// Length of a rendered attestation identifier (24 lowercase hex chars).
pub const ATTESTATION_ID_HEX_LEN: usize = 24;

/// Number of random bytes in a generated period nonce.
pub const PERIOD_NONCE_BYTES: usize = 16;

/// Maximum fractional digits carried by `hours_worked`.
pub const HOURS_MAX_SCALE: u32 = 2;

/// Fractional digits retained by the canonical form for non-integer numbers.
pub const CANONICAL_FRACTION_DIGITS: usize = 6;

/// A signing key is considered active if used within this many days.
pub const KEY_ACTIVE_WINDOW_DAYS: i64 = 30;

/// Directory of employer public keys, implemented by the registry.
///
/// The validator resolves signing keys through this seam so it never holds a
/// concrete registry type.
pub trait KeyDirectory: Send + Sync {
    /// Uncompressed SEC1 public key bytes for the employer, if registered.
    fn public_key(&self, employer_id: &str) -> Option<Vec<u8>>;
}
