//! The terminal result of a verification run.

use serde::{Deserialize, Serialize};

/// How a verification run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    /// Signature verified and an allow rule matched.
    Valid,
    /// The signature could not be verified (untrusted, expired, or wrong).
    InvalidSignature,
    /// The signature verified but no allow rule matched, or a deny rule did.
    PolicyDenied,
    /// The receipt failed structural validation.
    MalformedReceipt,
}

impl Outcome {
    /// Stable string name, matching the wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Valid => "VALID",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::PolicyDenied => "POLICY_DENIED",
            Self::MalformedReceipt => "MALFORMED_RECEIPT",
        }
    }
}

/// The structured result of verifying one receipt.
///
/// Produced once per verification call and never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    /// Terminal outcome.
    pub outcome: Outcome,
    /// The policy rule that decided the outcome, when one did.
    pub matched_rule_id: Option<String>,
    /// Ordered, human-readable explanation of the decision.
    pub reasons: Vec<String>,
    /// Whether a cryptographic signature check actually ran.
    ///
    /// `false` when verification stopped earlier — malformed structure,
    /// unknown key, or expired key.
    pub signature_checked: bool,
}

impl Verdict {
    /// `true` only for [`Outcome::Valid`].
    #[must_use]
    pub fn passed(&self) -> bool {
        self.outcome == Outcome::Valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_valid_passes() {
        for (outcome, expect) in [
            (Outcome::Valid, true),
            (Outcome::InvalidSignature, false),
            (Outcome::PolicyDenied, false),
            (Outcome::MalformedReceipt, false),
        ] {
            let verdict = Verdict {
                outcome,
                matched_rule_id: None,
                reasons: vec![],
                signature_checked: false,
            };
            assert_eq!(verdict.passed(), expect);
        }
    }

    #[test]
    fn outcome_serializes_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&Outcome::InvalidSignature).unwrap(),
            "\"INVALID_SIGNATURE\""
        );
        assert_eq!(serde_json::to_string(&Outcome::Valid).unwrap(), "\"VALID\"");
    }
}
