//! Canonical byte encoding for receipts.
//!
//! Signatures are computed over this encoding, so it must be
//! deterministic: equal claim trees always produce identical bytes no
//! matter how the issuer ordered its map entries. Map keys are sorted
//! bytewise, every value carries a one-byte type tag, and variable-length
//! bodies are length-prefixed — so the string `"1"` and the integer `1`
//! can never collide.

use crate::value::{ClaimMap, ClaimValue};

/// Domain separator prefixed to every receipt encoding.
const DOMAIN: &[u8] = b"truthmine/receipt/v1\0";

const TAG_BOOL: u8 = 0x01;
const TAG_INT: u8 = 0x02;
const TAG_FLOAT: u8 = 0x03;
const TAG_STRING: u8 = 0x04;
const TAG_TIMESTAMP: u8 = 0x05;
const TAG_LIST: u8 = 0x06;
const TAG_MAP: u8 = 0x07;

/// A claim tree that cannot be canonically encoded.
#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    /// Floats must be finite; NaN and infinities have no canonical form.
    #[error("claim `{key}` is not a finite number")]
    NonFiniteFloat {
        /// Key of the offending claim.
        key: String,
    },

    /// The same key appears twice in one map.
    #[error("duplicate claim key `{key}`")]
    DuplicateKey {
        /// The duplicated key.
        key: String,
    },

    /// A string or collection exceeds the u32 length prefix.
    #[error("claim `{key}` is too large to encode")]
    Oversized {
        /// Key of the offending claim.
        key: String,
    },
}

/// Canonically encode a receipt's signed content (subject + claims).
///
/// # Errors
///
/// Returns [`EncodingError`] for non-finite floats, duplicate map keys,
/// or values whose length exceeds the wire format's `u32` prefix.
pub fn encode_receipt(subject: &str, claims: &ClaimMap) -> Result<Vec<u8>, EncodingError> {
    let mut out = Vec::with_capacity(DOMAIN.len() + 64);
    out.extend_from_slice(DOMAIN);
    write_str(&mut out, "subject", subject)?;
    write_map(&mut out, claims)?;
    Ok(out)
}

/// Canonically encode a claim map alone.
///
/// # Errors
///
/// Same failure modes as [`encode_receipt`].
pub fn encode_claims(claims: &ClaimMap) -> Result<Vec<u8>, EncodingError> {
    let mut out = Vec::with_capacity(64);
    write_map(&mut out, claims)?;
    Ok(out)
}

fn write_len(out: &mut Vec<u8>, key: &str, len: usize) -> Result<(), EncodingError> {
    let len = u32::try_from(len).map_err(|_| EncodingError::Oversized {
        key: key.to_owned(),
    })?;
    out.extend_from_slice(&len.to_be_bytes());
    Ok(())
}

fn write_str(out: &mut Vec<u8>, key: &str, s: &str) -> Result<(), EncodingError> {
    out.push(TAG_STRING);
    write_len(out, key, s.len())?;
    out.extend_from_slice(s.as_bytes());
    Ok(())
}

fn write_value(out: &mut Vec<u8>, key: &str, value: &ClaimValue) -> Result<(), EncodingError> {
    match value {
        ClaimValue::Bool(b) => {
            out.push(TAG_BOOL);
            out.push(u8::from(*b));
        }
        ClaimValue::Int(n) => {
            out.push(TAG_INT);
            out.extend_from_slice(&n.to_be_bytes());
        }
        ClaimValue::Float(f) => {
            if !f.is_finite() {
                return Err(EncodingError::NonFiniteFloat {
                    key: key.to_owned(),
                });
            }
            // -0.0 normalizes to 0.0 so equal values encode equally.
            let f = if *f == 0.0 { 0.0 } else { *f };
            out.push(TAG_FLOAT);
            out.extend_from_slice(&f.to_bits().to_be_bytes());
        }
        ClaimValue::String(s) => write_str(out, key, s)?,
        ClaimValue::Timestamp(t) => {
            out.push(TAG_TIMESTAMP);
            out.extend_from_slice(&t.timestamp_micros().to_be_bytes());
        }
        ClaimValue::List(items) => {
            out.push(TAG_LIST);
            write_len(out, key, items.len())?;
            for item in items {
                write_value(out, key, item)?;
            }
        }
        ClaimValue::Map(map) => write_map(out, map)?,
    }
    Ok(())
}

fn write_map(out: &mut Vec<u8>, map: &ClaimMap) -> Result<(), EncodingError> {
    let mut entries: Vec<(&str, &ClaimValue)> = map.iter().collect();
    entries.sort_by(|(a, _), (b, _)| a.as_bytes().cmp(b.as_bytes()));

    for pair in entries.windows(2) {
        if pair[0].0 == pair[1].0 {
            return Err(EncodingError::DuplicateKey {
                key: pair[0].0.to_owned(),
            });
        }
    }

    out.push(TAG_MAP);
    write_len(out, "", entries.len())?;
    for (key, value) in entries {
        write_str(out, key, key)?;
        write_value(out, key, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_of(pairs: &[(&str, ClaimValue)]) -> ClaimMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect()
    }

    #[test]
    fn encoding_is_idempotent() {
        let claims = map_of(&[("role", "admin".into()), ("level", 3.into())]);
        let a = encode_receipt("alice", &claims).unwrap();
        let b = encode_receipt("alice", &claims).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn encoding_invariant_to_insertion_order() {
        let forward = map_of(&[("a", 1.into()), ("b", 2.into()), ("c", 3.into())]);
        let backward = map_of(&[("c", 3.into()), ("b", 2.into()), ("a", 1.into())]);
        assert_eq!(
            encode_receipt("s", &forward).unwrap(),
            encode_receipt("s", &backward).unwrap()
        );
    }

    #[test]
    fn nested_maps_also_order_invariant() {
        let inner_fwd = map_of(&[("x", 1.into()), ("y", 2.into())]);
        let inner_rev = map_of(&[("y", 2.into()), ("x", 1.into())]);
        let a = map_of(&[("env", ClaimValue::Map(inner_fwd))]);
        let b = map_of(&[("env", ClaimValue::Map(inner_rev))]);
        assert_eq!(
            encode_receipt("s", &a).unwrap(),
            encode_receipt("s", &b).unwrap()
        );
    }

    #[test]
    fn string_one_and_int_one_differ() {
        let as_string = map_of(&[("v", "1".into())]);
        let as_int = map_of(&[("v", 1.into())]);
        assert_ne!(
            encode_receipt("s", &as_string).unwrap(),
            encode_receipt("s", &as_int).unwrap()
        );
    }

    #[test]
    fn int_and_float_differ() {
        let as_int = map_of(&[("v", 1.into())]);
        let as_float = map_of(&[("v", ClaimValue::Float(1.0))]);
        assert_ne!(
            encode_receipt("s", &as_int).unwrap(),
            encode_receipt("s", &as_float).unwrap()
        );
    }

    #[test]
    fn subject_is_part_of_the_encoding() {
        let claims = map_of(&[("role", "admin".into())]);
        assert_ne!(
            encode_receipt("alice", &claims).unwrap(),
            encode_receipt("bob", &claims).unwrap()
        );
    }

    #[test]
    fn nan_is_rejected() {
        let claims = map_of(&[("v", ClaimValue::Float(f64::NAN))]);
        let err = encode_receipt("s", &claims).unwrap_err();
        assert!(matches!(err, EncodingError::NonFiniteFloat { .. }));
    }

    #[test]
    fn negative_zero_encodes_like_zero() {
        let neg = map_of(&[("v", ClaimValue::Float(-0.0))]);
        let pos = map_of(&[("v", ClaimValue::Float(0.0))]);
        assert_eq!(
            encode_receipt("s", &neg).unwrap(),
            encode_receipt("s", &pos).unwrap()
        );
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let mut claims = ClaimMap::new();
        claims.insert("role", "admin");
        claims.insert("role", "viewer");
        let err = encode_receipt("s", &claims).unwrap_err();
        assert!(matches!(err, EncodingError::DuplicateKey { key } if key == "role"));
    }

    #[test]
    fn nested_duplicate_key_is_rejected() {
        let mut inner = ClaimMap::new();
        inner.insert("os", "linux");
        inner.insert("os", "macos");
        let mut claims = ClaimMap::new();
        claims.insert("env", ClaimValue::Map(inner));
        assert!(encode_receipt("s", &claims).is_err());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_scalar() -> impl Strategy<Value = ClaimValue> {
            prop_oneof![
                any::<bool>().prop_map(ClaimValue::Bool),
                any::<i64>().prop_map(ClaimValue::Int),
                "[a-z0-9 ]{0,24}".prop_map(ClaimValue::String),
                (-1.0e9..1.0e9f64).prop_map(ClaimValue::Float),
            ]
        }

        fn arb_claims() -> impl Strategy<Value = Vec<(String, ClaimValue)>> {
            proptest::collection::btree_map("[a-z_]{1,12}", arb_scalar(), 0..12)
                .prop_map(|m| m.into_iter().collect())
        }

        proptest! {
            /// Encoding the same claims twice yields identical bytes.
            #[test]
            fn encode_idempotent(pairs in arb_claims()) {
                let claims: ClaimMap = pairs.into_iter().collect();
                let a = encode_receipt("subject", &claims).unwrap();
                let b = encode_receipt("subject", &claims).unwrap();
                prop_assert_eq!(a, b);
            }

            /// Insertion order never affects the encoding.
            #[test]
            fn encode_order_invariant(pairs in arb_claims()) {
                let forward: ClaimMap = pairs.clone().into_iter().collect();
                let reversed: ClaimMap = pairs.into_iter().rev().collect();
                prop_assert_eq!(
                    encode_receipt("subject", &forward).unwrap(),
                    encode_receipt("subject", &reversed).unwrap()
                );
            }
        }
    }
}
