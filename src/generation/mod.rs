//! Answer generation: prompts, citation linking, and decision extraction

pub mod citation;
pub mod decision;
pub mod prompt;

pub use citation::extract_and_link_citations;
pub use decision::extract_decision_summary;
pub use prompt::PromptBuilder;
