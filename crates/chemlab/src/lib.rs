//! Chemlab session library - exposes the reaction-session controller for the
//! CLI and for testing.

pub mod heating;
pub mod scheduler;
pub mod session;

pub use session::{LabSession, SessionView, DEFAULT_MIX_COLOR};
