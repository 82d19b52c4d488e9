//! Verdict rendering for terminal and machine consumption.

use std::fmt::Write;

use color_eyre::eyre::Result;
use truthmine_verify::Verdict;

/// Render a verdict as a markdown report.
#[must_use]
pub fn render_markdown(verdict: &Verdict) -> String {
    let mut out = String::new();
    if verdict.passed() {
        let _ = writeln!(out, "## ✅ Receipt verification passed");
    } else {
        let _ = writeln!(out, "## ❌ Receipt verification failed");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Outcome: `{}`", verdict.outcome.as_str());
    if let Some(rule) = &verdict.matched_rule_id {
        let _ = writeln!(out, "Matched rule: `{rule}`");
    }
    let _ = writeln!(
        out,
        "Signature checked: {}",
        if verdict.signature_checked { "yes" } else { "no" }
    );

    if !verdict.reasons.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "### Reasons");
        for reason in &verdict.reasons {
            let _ = writeln!(out, "- {reason}");
        }
    }
    out
}

/// Render a verdict as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_json(verdict: &Verdict) -> Result<String> {
    let value = serde_json::json!({
        "passed": verdict.passed(),
        "outcome": verdict.outcome,
        "matched_rule_id": verdict.matched_rule_id,
        "reasons": verdict.reasons,
        "signature_checked": verdict.signature_checked,
    });
    Ok(serde_json::to_string_pretty(&value)?)
}
