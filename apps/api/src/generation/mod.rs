// Content generation pipeline: guideline tables → prompt builder → model call → parser.
// All model calls go through llm_client::TextModel; no direct provider calls here.

pub mod generator;
pub mod guidelines;
pub mod parser;
pub mod prompts;
