//! The signed receipt document.
//!
//! A receipt asserts facts (claims) about a subject, signed by an issuer.
//! The verifier treats the signature as opaque bytes; only the signature
//! checker interprets them.

use serde::{Deserialize, Serialize};

use crate::canonical::{self, EncodingError};
use crate::error::ReceiptError;
use crate::value::ClaimMap;

/// A signed record asserting claims about a subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    /// Identifier of the entity the claims are about.
    pub subject: String,
    /// The claims, in issuer document order.
    pub claims: ClaimMap,
    /// Identifier of the trusted key that signed this receipt.
    pub signer_key_id: String,
    /// Signature over the canonical encoding of subject + claims.
    #[serde(with = "b64")]
    pub signature: Vec<u8>,
}

impl Receipt {
    /// Parse a receipt from its JSON document form.
    ///
    /// # Errors
    ///
    /// Returns [`ReceiptError::Serialize`] on malformed JSON. Structural
    /// problems (duplicate keys, empty fields) parse fine and are caught
    /// by [`Receipt::structural_defects`].
    pub fn from_json(json: &str) -> Result<Self, ReceiptError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to the JSON document form.
    ///
    /// # Errors
    ///
    /// Returns [`ReceiptError::Serialize`] if serialization fails.
    pub fn to_json(&self) -> Result<String, ReceiptError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The canonical bytes this receipt's signature covers.
    ///
    /// # Errors
    ///
    /// Returns [`EncodingError`] for claim trees with no canonical form.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, EncodingError> {
        canonical::encode_receipt(&self.subject, &self.claims)
    }

    /// Structural problems with this receipt, in discovery order.
    ///
    /// An empty result means the receipt is well-formed enough to hand to
    /// signature verification; it says nothing about trust.
    #[must_use]
    pub fn structural_defects(&self) -> Vec<String> {
        let mut defects = Vec::new();
        if self.subject.is_empty() {
            defects.push("subject is empty".to_owned());
        }
        if self.signer_key_id.is_empty() {
            defects.push("signer_key_id is empty".to_owned());
        }
        if self.signature.is_empty() {
            defects.push("signature is empty".to_owned());
        }
        if let Some(key) = self.claims.duplicate_key() {
            defects.push(format!("duplicate claim key `{key}`"));
        }
        defects
    }
}

mod b64 {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(&s)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_receipt() -> Receipt {
        let mut claims = ClaimMap::new();
        claims.insert("role", "admin");
        claims.insert("level", 3);
        Receipt {
            subject: "alice".to_owned(),
            claims,
            signer_key_id: "k1".to_owned(),
            signature: vec![0xde, 0xad, 0xbe, 0xef],
        }
    }

    #[test]
    fn json_round_trip() {
        let receipt = sample_receipt();
        let json = receipt.to_json().unwrap();
        let parsed = Receipt::from_json(&json).unwrap();
        assert_eq!(parsed.subject, "alice");
        assert_eq!(parsed.signer_key_id, "k1");
        assert_eq!(parsed.signature, receipt.signature);
        assert_eq!(parsed.claims.get("role").and_then(|v| v.as_str()), Some("admin"));
    }

    #[test]
    fn signature_is_base64_on_the_wire() {
        let json = sample_receipt().to_json().unwrap();
        assert!(json.contains("3q2+7w=="), "got: {json}");
    }

    #[test]
    fn well_formed_receipt_has_no_defects() {
        assert!(sample_receipt().structural_defects().is_empty());
    }

    #[test]
    fn empty_fields_are_defects() {
        let mut receipt = sample_receipt();
        receipt.subject = String::new();
        receipt.signature = Vec::new();
        let defects = receipt.structural_defects();
        assert_eq!(defects.len(), 2);
        assert!(defects[0].contains("subject"));
        assert!(defects[1].contains("signature"));
    }

    #[test]
    fn duplicate_claims_are_a_defect() {
        let mut receipt = sample_receipt();
        receipt.claims.insert("role", "viewer");
        let defects = receipt.structural_defects();
        assert_eq!(defects.len(), 1);
        assert!(defects[0].contains("duplicate claim key"));
    }

    #[test]
    fn canonical_bytes_stable_across_parse() {
        let receipt = sample_receipt();
        let reparsed = Receipt::from_json(&receipt.to_json().unwrap()).unwrap();
        assert_eq!(
            receipt.canonical_bytes().unwrap(),
            reparsed.canonical_bytes().unwrap()
        );
    }
}
