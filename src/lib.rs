//! Transformation Crew
//!
//! A multi-agent analysis pipeline that turns an organization profile (and an
//! optional uploaded document) into an AI-transformation assessment:
//! - Extracts findings and metrics from the document
//! - Maps cognitive work and its automation potential
//! - Models use-case costs, savings and payback
//! - Synthesizes an executive narrative
//! - Normalizes everything into one bounded, fingerprinted result
//!
//! PIPELINE:
//! DOCUMENT → (STRATEGY ∥ FINANCIAL) → SYNTHESIS → NORMALIZE

pub mod agents;
pub mod api;
pub mod config;
pub mod crew;
pub mod error;
pub mod fusion;
pub mod generation;
pub mod models;
pub mod prompts;
pub mod recovery;
pub mod store;

pub use error::Result;

// Re-export common types
pub use crew::Crew;
pub use fusion::{normalize, FusedResult};
pub use models::*;
