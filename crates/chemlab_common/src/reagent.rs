//! Reagent records - the immutable units a flask is built from.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical state of a reagent at bench conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhysicalState {
    Solid,
    Liquid,
    Gas,
}

impl PhysicalState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhysicalState::Solid => "solid",
            PhysicalState::Liquid => "liquid",
            PhysicalState::Gas => "gas",
        }
    }
}

/// Chemical class used to group reagents on the shelf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReagentCategory {
    Acid,
    Base,
    Salt,
    Metal,
    Oxidizer,
    Water,
    Organic,
    Indicator,
}

impl ReagentCategory {
    pub const ALL: [ReagentCategory; 8] = [
        ReagentCategory::Acid,
        ReagentCategory::Base,
        ReagentCategory::Metal,
        ReagentCategory::Salt,
        ReagentCategory::Oxidizer,
        ReagentCategory::Organic,
        ReagentCategory::Indicator,
        ReagentCategory::Water,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReagentCategory::Acid => "acid",
            ReagentCategory::Base => "base",
            ReagentCategory::Salt => "salt",
            ReagentCategory::Metal => "metal",
            ReagentCategory::Oxidizer => "oxidizer",
            ReagentCategory::Water => "water",
            ReagentCategory::Organic => "organic",
            ReagentCategory::Indicator => "indicator",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s.trim().to_lowercase())
    }
}

impl fmt::Display for ReagentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single catalog reagent
///
/// Danger level is on a 0-100 scale and is what the local risk heuristic
/// keys off before the collaborator has answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reagent {
    pub id: String,
    pub name: String,
    pub formula: String,
    /// Display color token (e.g. `bg-orange-200`)
    pub color: String,
    pub state: PhysicalState,
    pub danger_level: u8,
    pub category: ReagentCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Reagent {
    pub fn new(
        id: &str,
        name: &str,
        formula: &str,
        color: &str,
        state: PhysicalState,
        danger_level: u8,
        category: ReagentCategory,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            formula: formula.to_string(),
            color: color.to_string(),
            state,
            danger_level,
            category,
            description: None,
        }
    }

    /// "Name (Formula)" - the form the collaborator prompt uses
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.formula)
    }
}
