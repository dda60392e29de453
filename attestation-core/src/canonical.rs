//! Canonical JSON serialization for cryptographic hashing
//!
//! Ensures a deterministic byte representation for signing, identifier
//! derivation, and nullifier derivation. The canonical form is minified JSON
//! with recursively sorted keys, NFC-normalized strings, fixed-precision
//! numbers, and RFC 3339 millisecond instants. All signatures and derived
//! identifiers are computed over these bytes, so they MUST be identical
//! across implementations.

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;
use sha2::{Digest, Sha256};
use unicode_normalization::UnicodeNormalization;

use crate::{
    types::WageAttestation, Error, Result, ATTESTATION_ID_HEX_LEN, CANONICAL_FRACTION_DIGITS,
};

/// Serialize a value to its canonical byte sequence.
///
/// Total apart from non-finite numbers, which surface as
/// [`Error::CanonicalizationFailed`].
pub fn canonicalize(value: &Value) -> Result<Vec<u8>> {
    let mut out = String::new();
    write_value(value, &mut out)?;
    Ok(out.into_bytes())
}

/// SHA-256 over the canonical bytes of a value.
pub fn digest(value: &Value) -> Result<[u8; 32]> {
    let bytes = canonicalize(value)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hasher.finalize().into())
}

/// Canonical equality: two values are equal iff their canonical bytes match.
pub fn canonical_equal(a: &Value, b: &Value) -> Result<bool> {
    Ok(canonicalize(a)? == canonicalize(b)?)
}

/// Self-validation helper: a canonical byte string must survive a
/// parse + re-canonicalize round trip unchanged.
pub fn reparse_roundtrips(bytes: &[u8]) -> Result<bool> {
    let value: Value = serde_json::from_slice(bytes)?;
    Ok(canonicalize(&value)? == bytes)
}

/// Render an instant in canonical form: RFC 3339 UTC, millisecond
/// precision, literal `Z` suffix.
pub fn format_instant(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Project an attestation onto its signing fields.
///
/// Exactly nine fields; `signature` and `attestation_id` are never
/// included. The wallet is lowercased here so mixed-case input hashes
/// identically.
pub fn signing_payload(attestation: &WageAttestation) -> Value {
    serde_json::json!({
        "employer_id": attestation.employer_id,
        "employee_wallet": attestation.employee_wallet.to_lowercase(),
        "wage_amount": attestation.wage_amount,
        "period_start": format_instant(&attestation.period_start),
        "period_end": format_instant(&attestation.period_end),
        "hours_worked": decimal_number(&attestation.hours_worked),
        "hourly_rate": attestation.hourly_rate,
        "period_nonce": attestation.period_nonce,
        "timestamp": format_instant(&attestation.timestamp),
    })
}

/// 32-byte signing digest of an attestation.
pub fn signing_digest(attestation: &WageAttestation) -> Result<[u8; 32]> {
    digest(&signing_payload(attestation))
}

/// Derived attestation identifier: first 24 hex chars of the signing digest.
pub fn attestation_id(attestation: &WageAttestation) -> Result<String> {
    let digest = signing_digest(attestation)?;
    Ok(hex::encode(digest)[..ATTESTATION_ID_HEX_LEN].to_string())
}

/// Derive the nullifier revealed by downstream double-spend proofs.
///
/// SHA-256 over the canonical form of the four binding fields; rendered as
/// 64 lowercase hex chars. Byte-identical across implementations.
pub fn nullifier_hex(
    employer_id: &str,
    employee_wallet: &str,
    period_nonce: &str,
    wage_amount: i64,
) -> Result<String> {
    let payload = serde_json::json!({
        "employer_id": employer_id,
        "employee_wallet": employee_wallet.to_lowercase(),
        "period_nonce": period_nonce,
        "wage_amount": wage_amount,
    });
    Ok(hex::encode(digest(&payload)?))
}

/// Convert a fixed-precision decimal to a canonical JSON number.
///
/// Whole quantities become integers so `40.00` and `40` hash identically.
pub fn decimal_number(value: &Decimal) -> Value {
    if value.fract().is_zero() {
        if let Some(i) = value.to_i64() {
            return Value::from(i);
        }
    }
    // Fractional quantities pass through f64; the writer re-rounds to the
    // canonical 6-digit limit, which is far beyond the model's 2-digit scale.
    match value.to_f64().and_then(serde_json::Number::from_f64) {
        Some(n) => Value::Number(n),
        None => Value::Null,
    }
}

// =========================================================================
// CANONICAL WRITER
// =========================================================================

fn write_value(value: &Value, out: &mut String) -> Result<()> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => write_number(n, out)?,
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out)?;
            }
            out.push(']');
        }
        Value::Object(map) => {
            // Keys sorted by Unicode code point after NFC normalization.
            let mut entries: Vec<(String, &Value)> = map
                .iter()
                .map(|(k, v)| (k.nfc().collect::<String>(), v))
                .collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));

            out.push('{');
            for (i, (key, item)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_value(item, out)?;
            }
            out.push('}');
        }
    }
    Ok(())
}

fn write_string(s: &str, out: &mut String) {
    let normalized: String = s.nfc().collect();
    // serde_json emits the minimal escaping the canonical form requires.
    out.push_str(&serde_json::to_string(&normalized).expect("string serialization is infallible"));
}

fn write_number(n: &serde_json::Number, out: &mut String) -> Result<()> {
    if let Some(i) = n.as_i64() {
        out.push_str(&i.to_string());
        return Ok(());
    }
    if let Some(u) = n.as_u64() {
        out.push_str(&u.to_string());
        return Ok(());
    }
    let f = n
        .as_f64()
        .filter(|f| f.is_finite())
        .ok_or_else(|| Error::CanonicalizationFailed(format!("non-finite number: {}", n)))?;

    // Round to the canonical fraction limit; trim trailing zeros and a
    // bare point.
    let mut rendered = format!("{:.*}", CANONICAL_FRACTION_DIGITS, f);
    while rendered.ends_with('0') {
        rendered.pop();
    }
    if rendered.ends_with('.') {
        rendered.pop();
    }
    out.push_str(&rendered);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn instant(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn vector_attestation() -> WageAttestation {
        WageAttestation {
            attestation_id: String::new(),
            employer_id: "test_employer".to_string(),
            employee_wallet: "0x742D35cc6634C0532925A3B8D000b45F5c964c12".to_string(),
            wage_amount: 500_000,
            period_start: instant("2024-01-01T00:00:00.000Z"),
            period_end: instant("2024-01-07T23:59:59.999Z"),
            hours_worked: dec!(40),
            hourly_rate: 12_500,
            period_nonce: "test_nonce_123".to_string(),
            timestamp: instant("2024-01-08T10:00:00.000Z"),
            signature: None,
        }
    }

    #[test]
    fn test_signing_payload_canonical_bytes() {
        let attestation = vector_attestation();
        let bytes = canonicalize(&signing_payload(&attestation)).unwrap();

        let expected = concat!(
            "{\"employee_wallet\":\"0x742d35cc6634c0532925a3b8d000b45f5c964c12\",",
            "\"employer_id\":\"test_employer\",",
            "\"hourly_rate\":12500,",
            "\"hours_worked\":40,",
            "\"period_end\":\"2024-01-07T23:59:59.999Z\",",
            "\"period_nonce\":\"test_nonce_123\",",
            "\"period_start\":\"2024-01-01T00:00:00.000Z\",",
            "\"timestamp\":\"2024-01-08T10:00:00.000Z\",",
            "\"wage_amount\":500000}"
        );
        assert_eq!(String::from_utf8(bytes).unwrap(), expected);
    }

    #[test]
    fn test_signing_digest_vector() {
        // Independently computed SHA-256 over the canonical bytes above.
        let attestation = vector_attestation();
        let digest = signing_digest(&attestation).unwrap();
        assert_eq!(
            hex::encode(digest),
            "8429b8ed23a7735a3a532d460e6e86059fe197b9de5bc111396118ca945116bd"
        );

        assert_eq!(
            attestation_id(&attestation).unwrap(),
            "8429b8ed23a7735a3a532d46"
        );
    }

    #[test]
    fn test_nullifier_vector() {
        let nullifier = nullifier_hex(
            "test_employer",
            "0x742D35cc6634C0532925A3B8D000b45F5c964c12",
            "test_nonce_123",
            500_000,
        )
        .unwrap();
        assert_eq!(
            nullifier,
            "71741ec925c9e80714adbfd22753724bbce56fd6cf3b7c60efdbf84f41b62610"
        );
    }

    #[test]
    fn test_key_order_independence() {
        let a = json!({"b": 1, "a": {"d": 2, "c": 3}});
        let b = json!({"a": {"c": 3, "d": 2}, "b": 1});
        assert!(canonical_equal(&a, &b).unwrap());

        let bytes = canonicalize(&a).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "{\"a\":{\"c\":3,\"d\":2},\"b\":1}"
        );
    }

    #[test]
    fn test_nfc_normalization() {
        // "é" composed (U+00E9) vs decomposed (U+0065 U+0301)
        let composed = json!({"name": "caf\u{00e9}"});
        let decomposed = json!({"name": "cafe\u{0301}"});
        assert!(canonical_equal(&composed, &decomposed).unwrap());
    }

    #[test]
    fn test_fraction_trimming() {
        let value = json!({"h": 37.5, "i": 40.0, "j": 1.2345678});
        let bytes = canonicalize(&value).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "{\"h\":37.5,\"i\":40,\"j\":1.234568}"
        );
    }

    #[test]
    fn test_decimal_number_whole_vs_fractional() {
        assert_eq!(decimal_number(&dec!(40)), json!(40));
        assert_eq!(decimal_number(&dec!(40.00)), json!(40));

        let v = decimal_number(&dec!(37.5));
        assert_eq!(v.as_f64().unwrap(), 37.5);
    }

    #[test]
    fn test_instant_formatting() {
        let instant = Utc.with_ymd_and_hms(2024, 1, 8, 10, 0, 0).unwrap();
        assert_eq!(format_instant(&instant), "2024-01-08T10:00:00.000Z");
    }

    #[test]
    fn test_reparse_roundtrip() {
        let attestation = vector_attestation();
        let bytes = canonicalize(&signing_payload(&attestation)).unwrap();
        assert!(reparse_roundtrips(&bytes).unwrap());

        // Non-canonical input (unsorted keys) does not round-trip.
        assert!(!reparse_roundtrips(b"{\"b\":1,\"a\":2}").unwrap());
    }

    #[test]
    fn test_arrays_preserve_order() {
        let value = json!({"xs": [3, 1, 2]});
        let bytes = canonicalize(&value).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "{\"xs\":[3,1,2]}");
    }
}
