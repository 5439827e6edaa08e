//! Chemlab common types and pure logic shared by the session controller and CLI.

pub mod analysis;
pub mod catalog;
pub mod config;
pub mod error;
pub mod flask;
pub mod llm_client;
pub mod prompts;
pub mod reagent;
pub mod risk;

pub use analysis::{interpret, AnalysisRequest, AnalysisResult, RequestId};
pub use catalog::ReagentCatalog;
pub use config::{CatalogConfig, Config, SessionConfig};
pub use error::{AnalysisError, CatalogError, ConfigError, LabError};
pub use flask::{
    Flask, FlaskSnapshot, HeatOutcome, AMBIENT_TEMPERATURE, FLASK_CAPACITY, MAX_TEMPERATURE,
};
pub use llm_client::{AnalysisClient, FakeAnalysisClient, FakeReply, HttpAnalysisClient, LlmConfig};
pub use reagent::{PhysicalState, Reagent, ReagentCategory};
pub use risk::{classify, effective_risk, RiskSource, RiskStyleBucket, RiskTier};
