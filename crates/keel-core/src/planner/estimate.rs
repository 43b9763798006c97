//! Up-front time, cost and risk estimate for a plan.

use crate::models::{Estimate, Step};

/// Tokens that mark a step as destructive.
const HIGH_RISK_TOKENS: &[&str] = &["rm", "del", "delete", "format", "mkfs", "dd", "shred"];

/// Tokens that mark a step as modifying data.
const MEDIUM_RISK_TOKENS: &[&str] = &["write", "edit", "move", "copy", "mv", "cp"];

const HIGH_RISK_SCORE: u32 = 3;
const MEDIUM_RISK_SCORE: u32 = 1;

/// Keyword score of a step's text: 3 for a destructive token, 1 for a
/// modifying token, 0 otherwise.
///
/// Text is split on anything that is not alphanumeric, so `mkfs.ext4` and
/// `rm -rf` both count while `formatter` or `confirm` do not.
pub fn keyword_score(text: &str) -> u32 {
    let lowered = text.to_lowercase();
    let tokens: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .collect();

    if tokens.iter().any(|token| HIGH_RISK_TOKENS.contains(token)) {
        HIGH_RISK_SCORE
    } else if tokens.iter().any(|token| MEDIUM_RISK_TOKENS.contains(token)) {
        MEDIUM_RISK_SCORE
    } else {
        0
    }
}

/// Sum of step time budgets (saturating) and costs, and the mean keyword
/// score scaled into `[0, 1]`.
pub fn estimate(steps: &[Step]) -> Estimate {
    if steps.is_empty() {
        return Estimate::default();
    }

    let score: u32 = steps.iter().map(|step| keyword_score(step.risk_text())).sum();
    let risk = f64::from(score) / (steps.len() as f64 * f64::from(HIGH_RISK_SCORE));

    Estimate {
        time_secs: steps
            .iter()
            .map(|step| step.timeout_secs)
            .fold(0, u64::saturating_add),
        risk: risk.clamp(0.0, 1.0),
        cost: steps.iter().map(|step| step.cost).sum(),
    }
}
