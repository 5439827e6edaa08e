//! Analysis requests, results, and the strict response interpreter.
//!
//! The collaborator answers with loosely-shaped JSON. `interpret` is the only
//! place that looks at it: either every required field is present and typed
//! correctly and a complete `AnalysisResult` comes out, or the whole response
//! is rejected with `InvalidResponse`.

use crate::error::AnalysisError;
use crate::flask::FlaskSnapshot;
use crate::reagent::Reagent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Monotonically increasing id correlating a call with the state it was made for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Snapshot of the flask at the moment a debounced call fires
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRequest {
    pub id: RequestId,
    pub reagents: Vec<Reagent>,
    pub temperature: u32,
    pub issued_at: DateTime<Utc>,
}

impl AnalysisRequest {
    pub fn new(id: RequestId, reagents: Vec<Reagent>, temperature: u32) -> Self {
        Self {
            id,
            reagents,
            temperature,
            issued_at: Utc::now(),
        }
    }

    pub fn from_snapshot(id: RequestId, snapshot: &FlaskSnapshot) -> Self {
        Self::new(id, snapshot.reagents.clone(), snapshot.temperature)
    }

    /// Reagent names and formulas joined as prompt context
    pub fn reagent_list(&self) -> String {
        self.reagents
            .iter()
            .map(Reagent::label)
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn reagent_ids(&self) -> Vec<&str> {
        self.reagents.iter().map(|r| r.id.as_str()).collect()
    }
}

/// Interpreted collaborator answer. Always fully populated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub reaction: String,
    /// Nominally 0-100; not clamped, the collaborator owns the scale
    pub risk_score: f64,
    pub warnings: Vec<String>,
    pub explanation: String,
    pub new_color: Option<String>,
    pub received_at: DateTime<Utc>,
}

/// Wire shape. Required fields have no serde default, so a missing one is a
/// parse error rather than a silently zeroed value.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnalysis {
    reaction: String,
    risk_score: f64,
    warnings: Vec<String>,
    explanation: String,
    #[serde(default)]
    new_color: Option<String>,
}

/// Validate a raw collaborator response into an `AnalysisResult`
pub fn interpret(raw: serde_json::Value) -> Result<AnalysisResult, AnalysisError> {
    if !raw.is_object() {
        return Err(AnalysisError::InvalidResponse(format!(
            "expected a JSON object, got {}",
            json_kind(&raw)
        )));
    }

    let parsed: RawAnalysis = serde_json::from_value(raw)
        .map_err(|e| AnalysisError::InvalidResponse(e.to_string()))?;

    let new_color = parsed
        .new_color
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    Ok(AnalysisResult {
        reaction: parsed.reaction,
        risk_score: parsed.risk_score,
        warnings: parsed.warnings,
        explanation: parsed.explanation,
        new_color,
        received_at: Utc::now(),
    })
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
