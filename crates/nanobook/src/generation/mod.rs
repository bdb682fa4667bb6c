//! Answer generation: prompts, history normalisation and the answering call

mod answer;
mod history;
mod prompt;

pub use answer::AnswerGenerator;
pub use history::normalize_history;
pub use prompt::{PromptBuilder, SYSTEM_PROMPT};
