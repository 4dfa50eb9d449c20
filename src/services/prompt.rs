//! 判断提示词
//!
//! 研究主题只出现在提示词文本和字段描述里；响应结构固定为
//! `explanation` / `judgement` / `details` 三个字段。

use serde_json::{json, Value as JsonValue};

/// 一个研究主题对应的提示词与响应结构
///
/// 每个文档只构建一次，所有片段共用。
#[derive(Debug, Clone)]
pub struct JudgementPrompt {
    phenomenon: String,
    system_prompt: String,
    schema_name: String,
    response_schema: JsonValue,
}

impl JudgementPrompt {
    pub fn new(phenomenon: &str) -> Self {
        let phenomenon = phenomenon.trim().to_string();
        Self {
            system_prompt: build_system_prompt(&phenomenon),
            schema_name: build_schema_name(&phenomenon),
            response_schema: build_response_schema(&phenomenon),
            phenomenon,
        }
    }

    pub fn phenomenon(&self) -> &str {
        &self.phenomenon
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    pub fn response_schema(&self) -> &JsonValue {
        &self.response_schema
    }
}

fn build_system_prompt(phenomenon: &str) -> String {
    format!(
        "I am a Cultural Historian and Literary Scholar interested in {phenomenon}. \
         Your task is to read sentences in Early Modern Dutch and indicate whether, \
         given my research interest, the sentence is relevant to my research. \
         You should provide a clear explanation, a boolean judgement, and details about \
         {phenomenon} if present."
    )
}

/// "scheepvaart in de Gouden Eeuw" -> "ScheepvaartInDeGoudenEeuwInText"
///
/// 只保留 ASCII 字母数字，满足 `^[a-zA-Z0-9_-]+$` 的 schema 命名限制。
fn build_schema_name(phenomenon: &str) -> String {
    let mut name: String = phenomenon
        .split_whitespace()
        .map(|word| {
            let cleaned: String = word.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
            let mut chars = cleaned.chars();
            match chars.next() {
                Some(first) => {
                    first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
                }
                None => String::new(),
            }
        })
        .collect();
    name.truncate(54);
    name.push_str("InText");
    name
}

fn build_response_schema(phenomenon: &str) -> JsonValue {
    json!({
        "type": "object",
        "properties": {
            "explanation": {
                "type": "string",
                "description": format!("Explain whether the sentence contains information about {phenomenon}")
            },
            "judgement": {
                "type": "boolean",
                "description": format!("Whether the sentence contains information about {phenomenon}")
            },
            "details": {
                "type": ["string", "null"],
                "description": format!("Details about {phenomenon} if present, otherwise null")
            }
        },
        "required": ["explanation", "judgement", "details"],
        "additionalProperties": false
    })
}
