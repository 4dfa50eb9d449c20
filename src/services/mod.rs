pub mod llm_service;
pub mod passage_writer;
pub mod prompt;
pub mod text_splitter;
pub mod token_cost;

pub use llm_service::{LlmService, StructuredLlm, StructuredReply};
pub use passage_writer::PassageWriter;
pub use prompt::JudgementPrompt;
pub use text_splitter::TextSplitter;
pub use token_cost::{count_tokens, TokenCostTracker};
