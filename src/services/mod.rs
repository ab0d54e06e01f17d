pub mod llm;
pub mod stages;
pub mod workflow;
