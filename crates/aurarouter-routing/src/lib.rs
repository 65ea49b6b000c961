//! Routing fabric: role chains, admission gates, and the task pipeline.
//!
//! `ComputeFabric` resolves a role to its candidate chain and walks it
//! through the privacy and budget gates; the pipeline functions build
//! triage, planning and the review/correction loop on top of it.

pub mod decode;
pub mod fabric;
pub mod pipeline;
pub mod prompts;
pub mod triage;
pub mod types;
pub mod verbs;

pub use fabric::ComputeFabric;
pub use pipeline::{
    analyze_intent, generate_correction_plan, generate_plan, review_output, Pipeline,
};
pub use triage::TriageRouter;
pub use types::*;
pub use verbs::SemanticVerbRegistry;
