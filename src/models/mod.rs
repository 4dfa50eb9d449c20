pub mod analysis;
pub mod document;
pub mod loaders;
pub mod usage;

pub use analysis::{AnalysisResult, FragmentOutcome, LlmJudgement};
pub use document::{Document, Fragment};
pub use loaders::{discover_text_files, load_document};
pub use usage::{TokenUsage, UsageReport};
