// Resume generation and the three-stage revision pipeline.
// All model calls go through llm_client; no direct HTTP calls here.

pub mod contract;
pub mod handlers;
pub mod prompts;
pub mod stages;
