//! Risk Classifier
//!
//! Dual-track: a local heuristic gives immediate feedback while the
//! collaborator is thinking; once an authoritative result is shown its score
//! wins. The two are never blended.

use crate::analysis::AnalysisResult;
use crate::flask::AMBIENT_TEMPERATURE;
use crate::reagent::Reagent;
use serde::Serialize;
use std::fmt;

/// Score above which a mixture is HIGH risk
pub const HIGH_THRESHOLD: f64 = 70.0;

/// Score above which a mixture is MEDIUM risk
pub const MEDIUM_THRESHOLD: f64 = 30.0;

/// Ordered risk tier (NONE < LOW < MEDIUM < HIGH)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskTier {
    None,
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub fn from_score(score: f64) -> Self {
        if score > HIGH_THRESHOLD {
            RiskTier::High
        } else if score > MEDIUM_THRESHOLD {
            RiskTier::Medium
        } else {
            RiskTier::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::None => "NONE",
            RiskTier::Low => "LOW",
            RiskTier::Medium => "MEDIUM",
            RiskTier::High => "HIGH",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the displayed score came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskSource {
    /// Empty flask, nothing to score
    Empty,
    /// Local effective-risk heuristic
    Heuristic,
    /// Collaborator's riskScore
    Authoritative,
}

impl RiskSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskSource::Empty => "empty",
            RiskSource::Heuristic => "estimate",
            RiskSource::Authoritative => "analysis",
        }
    }
}

/// Derived display bucket. Recomputed on every read, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskStyleBucket {
    pub tier: RiskTier,
    pub score: f64,
    pub source: RiskSource,
    pub label: &'static str,
    pub text_token: &'static str,
    pub bar_token: &'static str,
    /// Show the severe-risk banner
    pub alert: bool,
}

impl RiskStyleBucket {
    fn new(tier: RiskTier, score: f64, source: RiskSource) -> Self {
        let (label, text_token, bar_token) = match tier {
            RiskTier::None => ("No reagents", "text-slate-400", "bg-slate-200"),
            RiskTier::Low => ("Low risk", "text-green-500", "bg-green-500"),
            RiskTier::Medium => ("Moderate risk", "text-orange-500", "bg-orange-500"),
            RiskTier::High => ("Severe risk", "text-red-500", "bg-red-500"),
        };
        Self {
            tier,
            score,
            source,
            label,
            text_token,
            bar_token,
            alert: tier == RiskTier::High,
        }
    }
}

/// `max(danger_level) + (temperature - 25) / 5`, or None for an empty flask
pub fn effective_risk(reagents: &[Reagent], temperature: u32) -> Option<f64> {
    let max_danger = reagents.iter().map(|r| r.danger_level).max()?;
    let heat = temperature.saturating_sub(AMBIENT_TEMPERATURE) as f64 / 5.0;
    Some(max_danger as f64 + heat)
}

/// Classify the current flask.
///
/// Callers pass `None` for `result` while an analysis is pending so the
/// heuristic tracks the live state.
pub fn classify(
    reagents: &[Reagent],
    temperature: u32,
    result: Option<&AnalysisResult>,
) -> RiskStyleBucket {
    let Some(heuristic) = effective_risk(reagents, temperature) else {
        return RiskStyleBucket::new(RiskTier::None, 0.0, RiskSource::Empty);
    };

    match result {
        Some(r) => RiskStyleBucket::new(
            RiskTier::from_score(r.risk_score),
            r.risk_score,
            RiskSource::Authoritative,
        ),
        None => RiskStyleBucket::new(
            RiskTier::from_score(heuristic),
            heuristic,
            RiskSource::Heuristic,
        ),
    }
}
