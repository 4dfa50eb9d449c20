use std::fmt;

use serde::Serialize;

/// 单次 LLM 调用的 token 用量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// 一次运行的用量快照
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageReport {
    pub model: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub estimated_cost_usd: f64,
    /// 分析失败、被丢弃的片段数
    pub failed_fragments: u64,
}

impl fmt::Display for UsageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "model: {}", self.model)?;
        writeln!(f, "prompt_tokens: {}", self.prompt_tokens)?;
        writeln!(f, "completion_tokens: {}", self.completion_tokens)?;
        writeln!(f, "total_tokens: {}", self.total_tokens)?;
        writeln!(f, "estimated_cost_usd: ${:.4}", self.estimated_cost_usd)?;
        write!(f, "failed_fragments: {}", self.failed_fragments)
    }
}
