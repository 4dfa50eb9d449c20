//! 片段分析结果

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{FragmentError, LlmError};

/// LLM 返回的结构化判断
///
/// 不包含原文：让模型复述片段是浪费，原文由分析器事后补上。
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LlmJudgement {
    pub explanation: String,
    pub judgement: bool,
    #[serde(default)]
    pub details: Option<String>,
}

impl LlmJudgement {
    /// 从 LLM 的响应文本解析结构化判断
    ///
    /// 兼容被 Markdown 代码块包裹的 JSON。
    pub fn from_response(content: &str) -> Result<Self, LlmError> {
        let malformed = |reason: String| LlmError::MalformedResponse {
            response: content.to_string(),
            reason,
        };

        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(malformed("响应为空".to_string()));
        }

        let fence = Regex::new(r"(?s)^```[a-zA-Z]*\s*(.*?)\s*```$")
            .map_err(|e| malformed(e.to_string()))?;
        let json = fence
            .captures(trimmed)
            .and_then(|cap| cap.get(1))
            .map_or(trimmed, |m| m.as_str());

        let mut parsed: LlmJudgement =
            serde_json::from_str(json).map_err(|e| malformed(e.to_string()))?;

        // 空字符串的 details 视为没有
        if parsed.details.as_deref().is_some_and(|d| d.trim().is_empty()) {
            parsed.details = None;
        }
        Ok(parsed)
    }
}

/// 单个片段的完整分析结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    /// 片段在文档中的序号
    pub fragment_index: usize,
    pub explanation: String,
    pub judgement: bool,
    pub details: Option<String>,
    /// 原始片段文本
    pub original_text: String,
}

impl AnalysisResult {
    pub fn new(fragment_index: usize, judgement: LlmJudgement, original_text: String) -> Self {
        Self {
            fragment_index,
            explanation: judgement.explanation,
            judgement: judgement.judgement,
            details: judgement.details,
            original_text,
        }
    }
}

/// 单个片段的处理结果
pub type FragmentOutcome = Result<AnalysisResult, FragmentError>;
