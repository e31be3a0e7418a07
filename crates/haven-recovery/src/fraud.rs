//! Fraud heuristic applied before a recovery request is admitted.
//!
//! A pure scoring function: rules are additive and independent of order,
//! and every triggered rule contributes both a score component and a named
//! indicator. Admissibility therefore reduces to "no rule fired" — callers
//! must not rely on the weighted ceiling alone.

use haven_core::{Identity, WEEK_MS};
use serde::{Deserialize, Serialize};

/// Risk score above which a request is never admissible.
pub const RISK_CEILING: u8 = 70;

/// Indicator: more than two requests for the wallet in the trailing 7 days.
pub const INDICATOR_RECENT_ATTEMPTS: &str = "multiple recent attempts";
/// Indicator: the proposed new owner is the current owner.
pub const INDICATOR_SAME_OWNER: &str = "new owner matches current owner";
/// Indicator: fewer active verified guardians than the threshold requires.
pub const INDICATOR_INSUFFICIENT_GUARDIANS: &str = "insufficient active guardians";

/// Output of the fraud heuristic, captured on the request it scored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Aggregate risk score, 0..=100
    pub risk_score: u8,
    /// Names of the rules that fired
    pub indicators: Vec<String>,
}

impl RiskAssessment {
    /// Whether the scored request may be admitted.
    pub fn admissible(&self) -> bool {
        self.risk_score < RISK_CEILING && self.indicators.is_empty()
    }
}

/// Score a proposed recovery request for suspicious patterns.
///
/// `prior_initiations_ms` are the initiation timestamps of every earlier
/// request for the same wallet, regardless of outcome.
pub fn assess(
    wallet: &Identity,
    proposed_new_owner: &Identity,
    prior_initiations_ms: &[u64],
    active_verified_guardians: usize,
    threshold: usize,
    now_ms: u64,
) -> RiskAssessment {
    let mut risk_score: u8 = 0;
    let mut indicators = Vec::new();

    let window_start = now_ms.saturating_sub(WEEK_MS);
    let recent = prior_initiations_ms
        .iter()
        .filter(|&&ts| ts >= window_start)
        .count();
    if recent > 2 {
        risk_score = risk_score.saturating_add(30);
        indicators.push(INDICATOR_RECENT_ATTEMPTS.to_string());
    }

    if proposed_new_owner == wallet {
        risk_score = risk_score.saturating_add(50);
        indicators.push(INDICATOR_SAME_OWNER.to_string());
    }

    if active_verified_guardians < threshold {
        risk_score = risk_score.saturating_add(20);
        indicators.push(INDICATOR_INSUFFICIENT_GUARDIANS.to_string());
    }

    RiskAssessment {
        risk_score: risk_score.min(100),
        indicators,
    }
}
