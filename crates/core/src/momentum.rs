//! Sliding-window momentum signal over recent answer scores.
//!
//! The trend is the second difference of the last three scores: a candidate
//! moving 2 → 5 → 8 has strong positive momentum even though none of the
//! individual answers was perfect. The engine uses the signal to decide when
//! a topic has stopped being productive.

use serde::Serialize;

/// Normalized trend at or above this value reads as a strong signal.
const STRONG_THRESHOLD: f64 = 0.30;
/// Normalized trend at or above this value reads as a mild signal.
const MILD_THRESHOLD: f64 = 0.15;

/// Default divisor used to map the raw trend into roughly [-1, 1].
pub const DEFAULT_NORMALIZATION_DIVISOR: f64 = 5.0;
/// Default scaling applied to the normalized trend.
pub const DEFAULT_WEIGHT: f64 = 1.25;

/// Discrete reading of the score trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MomentumSignal {
    StrongPositive,
    MildPositive,
    Neutral,
    MildNegative,
    StrongNegative,
}

/// Result of one momentum computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Momentum {
    /// Second difference over the last three scores: `s_n - s_{n-2}`.
    pub raw: f64,
    /// `raw / divisor`, clamped to [-1, 1].
    pub norm: f64,
    /// `norm * weight`.
    pub weighted: f64,
    pub signal: MomentumSignal,
}

impl Momentum {
    /// The zero result returned when fewer than three scores are available.
    pub fn neutral() -> Self {
        Self {
            raw: 0.0,
            norm: 0.0,
            weighted: 0.0,
            signal: MomentumSignal::Neutral,
        }
    }
}

/// Computes the momentum signal from `scores`, oldest to newest.
///
/// Requires at least three scores; with fewer this returns
/// [`Momentum::neutral`] regardless of their values. Pure and deterministic.
pub fn compute(scores: &[f64], normalization_divisor: f64, weight: f64) -> Momentum {
    let [s_n2, s_n1, s_n] = match scores {
        [.., a, b, c] => [*a, *b, *c],
        _ => return Momentum::neutral(),
    };

    let raw = (s_n - s_n1) + (s_n1 - s_n2);
    let norm = (raw / normalization_divisor).clamp(-1.0, 1.0);
    let weighted = norm * weight;

    // Strong thresholds must win over mild ones on each side.
    let signal = if norm >= STRONG_THRESHOLD {
        MomentumSignal::StrongPositive
    } else if norm >= MILD_THRESHOLD {
        MomentumSignal::MildPositive
    } else if norm <= -STRONG_THRESHOLD {
        MomentumSignal::StrongNegative
    } else if norm <= -MILD_THRESHOLD {
        MomentumSignal::MildNegative
    } else {
        MomentumSignal::Neutral
    };

    Momentum {
        raw,
        norm,
        weighted,
        signal,
    }
}
