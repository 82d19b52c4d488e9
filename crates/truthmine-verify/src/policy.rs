//! Declarative policy over receipt claims.
//!
//! A policy is an ordered rule list. Each rule pairs a predicate tree
//! with an ALLOW or DENY effect. Combining is deny-overrides: the first
//! matching DENY ends the scan immediately; otherwise the first matching
//! ALLOW wins; otherwise the default is deny.
//!
//! Predicates are a tagged enum evaluated by structural recursion — no
//! per-node dispatch, so an audit can follow evaluation by reading one
//! `match`. Evaluation is pure: absent or type-mismatched claim paths
//! make a comparison false, never an error, and nothing here touches
//! I/O or clocks.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::path::Path;

use serde::{Deserialize, Serialize};
use truthmine_receipt::{ClaimMap, ClaimValue};

use crate::error::VerifyError;

/// What a matching rule does to the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    /// A match permits the receipt (unless a deny also matches).
    Allow,
    /// A match rejects the receipt, overriding any allow.
    Deny,
}

/// A boolean expression over claim paths.
///
/// Paths are dot-separated (`env.model`). The reserved path `subject`
/// resolves to the receipt's subject identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// The value at `path` equals `value`. No cross-type coercion:
    /// integer `1` and float `1.0` are distinct.
    Equals {
        /// Claim path to compare.
        path: String,
        /// Expected value.
        value: ClaimValue,
    },
    /// The value at `path` is one of `values`.
    InSet {
        /// Claim path to compare.
        path: String,
        /// Accepted values.
        values: Vec<ClaimValue>,
    },
    /// The value at `path` lies in `[min, max]` (inclusive, same-typed
    /// scalars only).
    Range {
        /// Claim path to compare.
        path: String,
        /// Lower bound, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<ClaimValue>,
        /// Upper bound, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<ClaimValue>,
    },
    /// A value exists at `path`.
    Exists {
        /// Claim path to test.
        path: String,
    },
    /// Every sub-predicate holds.
    All(Vec<Predicate>),
    /// At least one sub-predicate holds.
    Any(Vec<Predicate>),
    /// The sub-predicate does not hold.
    Not(Box<Predicate>),
}

/// One rule in a policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// Unique rule identifier, reported in verdicts.
    pub id: String,
    /// Allow or deny on match.
    pub effect: Effect,
    /// The matching condition.
    pub predicate: Predicate,
    /// Reason template; `{subject}` expands to the receipt subject.
    #[serde(default)]
    pub reason: String,
}

/// An ordered rule list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Policy {
    /// Rules, evaluated in declared order.
    pub rules: Vec<Rule>,
}

/// Outcome of evaluating a policy against one receipt's claims.
#[derive(Debug, Clone)]
pub struct PolicyDecision {
    /// `true` if an allow rule won.
    pub allowed: bool,
    /// The rule that decided, when one matched.
    pub matched_rule_id: Option<String>,
    /// Ordered explanation.
    pub reasons: Vec<String>,
}

impl Policy {
    /// Parse a policy from its JSON document form.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Json`] on malformed JSON.
    pub fn from_json(json: &str) -> Result<Self, VerifyError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a policy from a JSON file.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Policy::from_json`], plus I/O.
    pub fn from_file(path: &Path) -> Result<Self, VerifyError> {
        let data = std::fs::read_to_string(path)?;
        let policy = Self::from_json(&data)?;
        tracing::info!(
            path = %path.display(),
            rules = policy.rules.len(),
            "loaded policy"
        );
        Ok(policy)
    }

    /// Evaluate the rules against a receipt's subject and claims.
    ///
    /// Deny-overrides: scanning stops at the first matching DENY even if
    /// an ALLOW matched earlier.
    #[must_use]
    pub fn evaluate(&self, subject: &str, claims: &ClaimMap) -> PolicyDecision {
        let mut first_allow: Option<&Rule> = None;

        for rule in &self.rules {
            if !eval_predicate(&rule.predicate, subject, claims) {
                continue;
            }
            match rule.effect {
                Effect::Deny => {
                    return PolicyDecision {
                        allowed: false,
                        matched_rule_id: Some(rule.id.clone()),
                        reasons: vec![rule.render_reason(subject, "denied")],
                    };
                }
                Effect::Allow => {
                    // Remember the first allow, but keep scanning: a
                    // later deny still overrides it.
                    first_allow.get_or_insert(rule);
                }
            }
        }

        first_allow.map_or_else(
            || PolicyDecision {
                allowed: false,
                matched_rule_id: None,
                reasons: vec!["no matching allow rule".to_owned()],
            },
            |rule| PolicyDecision {
                allowed: true,
                matched_rule_id: Some(rule.id.clone()),
                reasons: vec![rule.render_reason(subject, "allowed")],
            },
        )
    }
}

impl Rule {
    fn render_reason(&self, subject: &str, verb: &str) -> String {
        if self.reason.is_empty() {
            format!("rule `{}` {verb} the receipt", self.id)
        } else {
            format!(
                "rule `{}` {verb}: {}",
                self.id,
                self.reason.replace("{subject}", subject)
            )
        }
    }
}

/// Resolve a predicate path against the subject and claim tree.
fn resolve<'a>(subject: &'a str, claims: &'a ClaimMap, path: &str) -> Option<Cow<'a, ClaimValue>> {
    if path == "subject" {
        return Some(Cow::Owned(ClaimValue::String(subject.to_owned())));
    }
    claims.lookup_path(path).map(Cow::Borrowed)
}

fn eval_predicate(predicate: &Predicate, subject: &str, claims: &ClaimMap) -> bool {
    match predicate {
        Predicate::Equals { path, value } => {
            resolve(subject, claims, path).is_some_and(|v| v.as_ref() == value)
        }
        Predicate::InSet { path, values } => resolve(subject, claims, path)
            .is_some_and(|v| values.iter().any(|candidate| v.as_ref() == candidate)),
        Predicate::Range { path, min, max } => {
            resolve(subject, claims, path).is_some_and(|v| in_range(v.as_ref(), min, max))
        }
        Predicate::Exists { path } => resolve(subject, claims, path).is_some(),
        Predicate::All(subs) => subs.iter().all(|p| eval_predicate(p, subject, claims)),
        Predicate::Any(subs) => subs.iter().any(|p| eval_predicate(p, subject, claims)),
        Predicate::Not(sub) => !eval_predicate(sub, subject, claims),
    }
}

fn in_range(value: &ClaimValue, min: &Option<ClaimValue>, max: &Option<ClaimValue>) -> bool {
    if let Some(min) = min {
        match claim_cmp(value, min) {
            Some(Ordering::Less) | None => return false,
            _ => {}
        }
    }
    if let Some(max) = max {
        match claim_cmp(value, max) {
            Some(Ordering::Greater) | None => return false,
            _ => {}
        }
    }
    true
}

/// Ordering between two claim values of the same scalar type.
///
/// Cross-type comparisons (and non-scalar operands) have no ordering and
/// make the enclosing comparison false.
fn claim_cmp(a: &ClaimValue, b: &ClaimValue) -> Option<Ordering> {
    match (a, b) {
        (ClaimValue::Int(x), ClaimValue::Int(y)) => Some(x.cmp(y)),
        (ClaimValue::Float(x), ClaimValue::Float(y)) => x.partial_cmp(y),
        (ClaimValue::String(x), ClaimValue::String(y)) => Some(x.cmp(y)),
        (ClaimValue::Timestamp(x), ClaimValue::Timestamp(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
