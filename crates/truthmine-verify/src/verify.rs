//! Top-level verification orchestrator.
//!
//! The `Verifier` composes structural validation, canonical encoding,
//! signature verification, and policy evaluation into a single
//! [`Verdict`]. The phases are strictly ordered: policy never runs on a
//! receipt whose signature has not verified.

use chrono::{DateTime, Utc};
use truthmine_receipt::{Keyring, Receipt};

use crate::error::VerifyError;
use crate::policy::Policy;
use crate::signature;
use crate::verdict::{Outcome, Verdict};

/// Verifies receipts against an immutable keyring and policy snapshot.
///
/// A `Verifier` holds owned snapshots, so verification calls are pure
/// and a batch of receipts can be verified from multiple threads with
/// no locking. Reloading keys or policy means building a new `Verifier`,
/// never mutating this one.
pub struct Verifier {
    keyring: Keyring,
    policy: Policy,
}

impl Verifier {
    /// Create a verifier from trusted-key and policy snapshots.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::EmptyKeyring`] — verifying against no
    /// trusted keys is caller misuse, not an untrusted-input condition.
    pub fn new(keyring: Keyring, policy: Policy) -> Result<Self, VerifyError> {
        if keyring.is_empty() {
            return Err(VerifyError::EmptyKeyring);
        }
        Ok(Self { keyring, policy })
    }

    /// Verify a receipt, using the current wall clock for key validity.
    ///
    /// # Errors
    ///
    /// See [`Verifier::verify_receipt_at`].
    pub fn verify_receipt(&self, receipt: &Receipt) -> Result<Verdict, VerifyError> {
        self.verify_receipt_at(receipt, Utc::now())
    }

    /// Verify a receipt at an explicit instant (deterministic replay).
    ///
    /// Every expected failure of untrusted input resolves to a
    /// [`Verdict`]; the only propagated errors are encoder defects in
    /// the claim tree.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Encoding`] if the claims have no canonical
    /// form (non-finite floats).
    pub fn verify_receipt_at(
        &self,
        receipt: &Receipt,
        now: DateTime<Utc>,
    ) -> Result<Verdict, VerifyError> {
        let defects = receipt.structural_defects();
        if !defects.is_empty() {
            tracing::debug!(subject = %receipt.subject, "receipt failed structural validation");
            return Ok(Verdict {
                outcome: Outcome::MalformedReceipt,
                matched_rule_id: None,
                reasons: defects,
                signature_checked: false,
            });
        }

        let canonical = receipt.canonical_bytes()?;

        match signature::verify_signature(
            &canonical,
            &receipt.signature,
            &receipt.signer_key_id,
            &self.keyring,
            now,
        ) {
            Err(trust) => Ok(Verdict {
                outcome: Outcome::InvalidSignature,
                matched_rule_id: None,
                reasons: vec![trust.to_string()],
                signature_checked: false,
            }),
            Ok(false) => Ok(Verdict {
                outcome: Outcome::InvalidSignature,
                matched_rule_id: None,
                reasons: vec![format!(
                    "signature does not verify under key `{}`",
                    receipt.signer_key_id
                )],
                signature_checked: true,
            }),
            Ok(true) => {
                tracing::debug!(subject = %receipt.subject, "signature verified, evaluating policy");
                let decision = self.policy.evaluate(&receipt.subject, &receipt.claims);
                Ok(Verdict {
                    outcome: if decision.allowed {
                        Outcome::Valid
                    } else {
                        Outcome::PolicyDenied
                    },
                    matched_rule_id: decision.matched_rule_id,
                    reasons: decision.reasons,
                    signature_checked: true,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{Effect, Predicate, Rule};
    use chrono::TimeZone;
    use truthmine_receipt::signer::LocalSigner;
    use truthmine_receipt::{ClaimMap, SignatureAlgorithm};

    fn admin_policy() -> Policy {
        Policy {
            rules: vec![Rule {
                id: "r1".to_owned(),
                effect: Effect::Allow,
                predicate: Predicate::Equals {
                    path: "role".to_owned(),
                    value: "admin".into(),
                },
                reason: "{subject} holds the admin role".to_owned(),
            }],
        }
    }

    fn signer_in(dir: &std::path::Path) -> LocalSigner {
        LocalSigner::load_or_generate(
            &dir.join("key.pem"),
            SignatureAlgorithm::Ed25519,
            "k1",
        )
        .expect("keygen")
    }

    fn admin_claims() -> ClaimMap {
        let mut claims = ClaimMap::new();
        claims.insert("role", "admin");
        claims
    }

    #[test]
    fn end_to_end_valid() {
        let tmp = tempfile::tempdir().unwrap();
        let signer = signer_in(tmp.path());
        let receipt = signer.sign_receipt("alice", admin_claims()).unwrap();
        let keyring = Keyring::from_keys(vec![signer.trusted_key()]).unwrap();

        let verifier = Verifier::new(keyring, admin_policy()).unwrap();
        let verdict = verifier.verify_receipt(&receipt).unwrap();

        assert_eq!(verdict.outcome, Outcome::Valid);
        assert_eq!(verdict.matched_rule_id.as_deref(), Some("r1"));
        assert!(verdict.signature_checked);
        assert!(verdict.reasons[0].contains("alice holds the admin role"));
    }

    #[test]
    fn tampered_signature_stops_before_policy() {
        let tmp = tempfile::tempdir().unwrap();
        let signer = signer_in(tmp.path());
        let mut receipt = signer.sign_receipt("alice", admin_claims()).unwrap();
        receipt.signature[0] ^= 0xFF;
        let keyring = Keyring::from_keys(vec![signer.trusted_key()]).unwrap();

        let verifier = Verifier::new(keyring, admin_policy()).unwrap();
        let verdict = verifier.verify_receipt(&receipt).unwrap();

        assert_eq!(verdict.outcome, Outcome::InvalidSignature);
        assert!(verdict.signature_checked);
        // Policy never ran: no rule id even though the claims would allow.
        assert_eq!(verdict.matched_rule_id, None);
    }

    #[test]
    fn tampered_claims_invalidate_signature() {
        let tmp = tempfile::tempdir().unwrap();
        let signer = signer_in(tmp.path());
        let mut receipt = signer.sign_receipt("alice", admin_claims()).unwrap();
        receipt.claims.insert("injected", "value");
        let keyring = Keyring::from_keys(vec![signer.trusted_key()]).unwrap();

        let verifier = Verifier::new(keyring, admin_policy()).unwrap();
        let verdict = verifier.verify_receipt(&receipt).unwrap();
        assert_eq!(verdict.outcome, Outcome::InvalidSignature);
        assert!(verdict.signature_checked);
    }

    #[test]
    fn unknown_key_never_checks_signature() {
        let tmp = tempfile::tempdir().unwrap();
        let signer = signer_in(tmp.path());
        let other = LocalSigner::load_or_generate(
            &tmp.path().join("other.pem"),
            SignatureAlgorithm::Ed25519,
            "someone-else",
        )
        .unwrap();
        let receipt = signer.sign_receipt("alice", admin_claims()).unwrap();
        let keyring = Keyring::from_keys(vec![other.trusted_key()]).unwrap();

        let verifier = Verifier::new(keyring, admin_policy()).unwrap();
        let verdict = verifier.verify_receipt(&receipt).unwrap();

        assert_eq!(verdict.outcome, Outcome::InvalidSignature);
        assert!(!verdict.signature_checked);
        assert!(verdict.reasons[0].contains("unknown signer key"));
    }

    #[test]
    fn expired_key_never_checks_signature() {
        let tmp = tempfile::tempdir().unwrap();
        let signer = signer_in(tmp.path());
        let receipt = signer.sign_receipt("alice", admin_claims()).unwrap();
        let mut key = signer.trusted_key();
        key.valid_until = Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
        let keyring = Keyring::from_keys(vec![key]).unwrap();

        let verifier = Verifier::new(keyring, admin_policy()).unwrap();
        let verdict = verifier.verify_receipt(&receipt).unwrap();

        assert_eq!(verdict.outcome, Outcome::InvalidSignature);
        assert!(!verdict.signature_checked);
        assert!(verdict.reasons[0].contains("validity window"));
    }

    #[test]
    fn expired_key_passes_at_an_earlier_instant() {
        let tmp = tempfile::tempdir().unwrap();
        let signer = signer_in(tmp.path());
        let receipt = signer.sign_receipt("alice", admin_claims()).unwrap();
        let mut key = signer.trusted_key();
        key.valid_until = Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
        let keyring = Keyring::from_keys(vec![key]).unwrap();

        let verifier = Verifier::new(keyring, admin_policy()).unwrap();
        let then = Utc.with_ymd_and_hms(2019, 6, 1, 0, 0, 0).unwrap();
        let verdict = verifier.verify_receipt_at(&receipt, then).unwrap();
        assert_eq!(verdict.outcome, Outcome::Valid);
    }

    #[test]
    fn policy_denied_when_no_rule_matches() {
        let tmp = tempfile::tempdir().unwrap();
        let signer = signer_in(tmp.path());
        let mut claims = ClaimMap::new();
        claims.insert("role", "viewer");
        let receipt = signer.sign_receipt("alice", claims).unwrap();
        let keyring = Keyring::from_keys(vec![signer.trusted_key()]).unwrap();

        let verifier = Verifier::new(keyring, admin_policy()).unwrap();
        let verdict = verifier.verify_receipt(&receipt).unwrap();

        assert_eq!(verdict.outcome, Outcome::PolicyDenied);
        assert!(verdict.signature_checked);
        assert_eq!(verdict.reasons, ["no matching allow rule"]);
    }

    #[test]
    fn malformed_receipt_reports_every_defect() {
        let tmp = tempfile::tempdir().unwrap();
        let signer = signer_in(tmp.path());
        let mut receipt = signer.sign_receipt("alice", admin_claims()).unwrap();
        receipt.subject = String::new();
        receipt.claims.insert("role", "second-role");
        let keyring = Keyring::from_keys(vec![signer.trusted_key()]).unwrap();

        let verifier = Verifier::new(keyring, admin_policy()).unwrap();
        let verdict = verifier.verify_receipt(&receipt).unwrap();

        assert_eq!(verdict.outcome, Outcome::MalformedReceipt);
        assert!(!verdict.signature_checked);
        assert_eq!(verdict.reasons.len(), 2);
    }

    #[test]
    fn empty_keyring_is_rejected_at_construction() {
        let result = Verifier::new(Keyring::default(), admin_policy());
        assert!(matches!(result, Err(VerifyError::EmptyKeyring)));
    }
}
