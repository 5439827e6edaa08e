//! Reagent Catalog - the read-only shelf of reagents a session can draw from.
//!
//! The built-in bench set is used unless `[catalog] path` points at a TOML
//! file of `[[reagent]]` tables.

use crate::error::CatalogError;
use crate::reagent::{PhysicalState, Reagent, ReagentCategory};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    reagent: Vec<Reagent>,
}

/// Immutable reagent list, loaded once at startup
#[derive(Debug, Clone)]
pub struct ReagentCatalog {
    reagents: Vec<Reagent>,
}

impl ReagentCatalog {
    /// Build a catalog, rejecting duplicate ids and out-of-range danger levels
    pub fn new(reagents: Vec<Reagent>) -> Result<Self, CatalogError> {
        if reagents.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen = HashSet::new();
        for r in &reagents {
            if !seen.insert(r.id.as_str()) {
                return Err(CatalogError::DuplicateId(r.id.clone()));
            }
            if r.danger_level > 100 {
                return Err(CatalogError::InvalidDangerLevel {
                    id: r.id.clone(),
                    level: r.danger_level,
                });
            }
        }

        Ok(Self { reagents })
    }

    /// Load a catalog from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Self::from_toml_str(&content)?;
        info!("Loaded {} reagents from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(content)?;
        Self::new(file.reagent)
    }

    /// Look up a reagent by id
    pub fn get(&self, id: &str) -> Option<&Reagent> {
        self.reagents.iter().find(|r| r.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reagent> {
        self.reagents.iter()
    }

    pub fn by_category(&self, category: ReagentCategory) -> Vec<&Reagent> {
        self.reagents
            .iter()
            .filter(|r| r.category == category)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.reagents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reagents.is_empty()
    }

    /// The standard bench set
    pub fn standard() -> Self {
        use PhysicalState::{Liquid, Solid};
        use ReagentCategory::*;

        let r = Reagent::new;
        Self {
            reagents: vec![
                // Acids
                r("a1", "Dilute hydrochloric acid", "HCl", "bg-yellow-50", Liquid, 30, Acid),
                r("a2", "Concentrated sulfuric acid", "H2SO4", "bg-orange-200", Liquid, 95, Acid),
                r("a3", "Concentrated nitric acid", "HNO3", "bg-yellow-100", Liquid, 90, Acid),
                r("a4", "Acetic acid", "CH3COOH", "bg-slate-50", Liquid, 20, Acid),
                r("a5", "Phosphoric acid", "H3PO4", "bg-blue-50", Liquid, 40, Acid),
                // Bases
                r("b1", "Sodium hydroxide", "NaOH", "bg-white", Solid, 80, Base),
                r("b2", "Potassium hydroxide", "KOH", "bg-white", Solid, 85, Base),
                r("b3", "Aqueous ammonia", "NH3·H2O", "bg-slate-100", Liquid, 40, Base),
                r("b4", "Calcium hydroxide", "Ca(OH)2", "bg-slate-200", Solid, 20, Base),
                r("b5", "Barium hydroxide", "Ba(OH)2", "bg-slate-50", Solid, 60, Base),
                // Metals
                r("m1", "Sodium metal", "Na", "bg-zinc-400", Solid, 98, Metal),
                r("m2", "Potassium metal", "K", "bg-zinc-500", Solid, 100, Metal),
                r("m3", "Magnesium ribbon", "Mg", "bg-slate-300", Solid, 30, Metal),
                r("m4", "Aluminium powder", "Al", "bg-gray-200", Solid, 20, Metal),
                r("m5", "Zinc granules", "Zn", "bg-gray-400", Solid, 15, Metal),
                r("m6", "Iron powder", "Fe", "bg-zinc-700", Solid, 10, Metal),
                r("m7", "Copper foil", "Cu", "bg-orange-600", Solid, 5, Metal),
                // Salts
                r("s1", "Sodium chloride", "NaCl", "bg-white", Solid, 0, Salt),
                r("s2", "Copper sulfate", "CuSO4", "bg-blue-500", Solid, 40, Salt),
                r("s3", "Barium chloride", "BaCl2", "bg-white", Solid, 75, Salt),
                r("s4", "Silver nitrate", "AgNO3", "bg-slate-100", Solid, 65, Salt),
                r("s5", "Sodium carbonate", "Na2CO3", "bg-white", Solid, 10, Salt),
                r("s6", "Sodium bicarbonate", "NaHCO3", "bg-white", Solid, 5, Salt),
                r("s7", "Ferric chloride", "FeCl3", "bg-orange-800", Solid, 50, Salt),
                r("s8", "Potassium iodide", "KI", "bg-white", Solid, 20, Salt),
                // Oxidizers
                r("o1", "Potassium permanganate", "KMnO4", "bg-purple-900", Solid, 70, Oxidizer),
                r("o2", "Hydrogen peroxide", "H2O2", "bg-cyan-50", Liquid, 55, Oxidizer),
                r("o3", "Potassium chlorate", "KClO3", "bg-white", Solid, 80, Oxidizer),
                r("o4", "Manganese dioxide", "MnO2", "bg-black", Solid, 10, Oxidizer),
                // Organics
                r("org1", "Ethanol", "C2H5OH", "bg-blue-50/50", Liquid, 45, Organic),
                r("org2", "Benzene", "C6H6", "bg-yellow-50/30", Liquid, 90, Organic),
                r("org3", "Glucose", "C6H12O6", "bg-white", Solid, 0, Organic),
                // Indicators
                r("ind1", "Phenolphthalein", "C20H14O4", "bg-pink-100", Liquid, 10, Indicator),
                r("ind2", "Litmus solution", "Litmus", "bg-purple-500", Liquid, 5, Indicator),
                r("ind3", "Methyl orange", "C14H14N3NaO3S", "bg-orange-500", Liquid, 15, Indicator),
                // Water
                r("w1", "Distilled water", "H2O", "bg-blue-100", Liquid, 0, Water),
            ],
        }
    }
}

impl Default for ReagentCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
