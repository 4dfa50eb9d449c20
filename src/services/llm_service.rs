//! LLM 服务 - 业务能力层
//!
//! 只负责"对一个片段发起一次结构化判断"的能力，不关心流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 通过 `response_format = json_schema` 约束输出结构
//! - 兼容 OpenAI API 的服务（自定义 `api_base` 即可）

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, ResponseFormat,
        ResponseFormatJsonSchema,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppResult, LlmError};
use crate::models::TokenUsage;
use crate::services::prompt::JudgementPrompt;

/// 一次结构化调用的原始返回
#[derive(Debug, Clone)]
pub struct StructuredReply {
    /// 模型返回的 JSON 文本
    pub content: String,
    /// API 报告的用量，服务不提供时为 `None`
    pub usage: Option<TokenUsage>,
}

/// 结构化输出的 LLM 后端
///
/// 流程层只依赖这个 trait，测试中可以替换成脚本化的实现。
#[async_trait]
pub trait StructuredLlm: Send + Sync {
    /// 模型名称
    fn model_name(&self) -> &str;

    /// 用系统提示词 + 片段文本发起一次调用
    async fn invoke(
        &self,
        prompt: &JudgementPrompt,
        fragment: &str,
    ) -> Result<StructuredReply, LlmError>;
}

/// 基于 OpenAI 兼容接口的 LLM 服务
pub struct LlmService {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl LlmService {
    /// 创建新的 LLM 服务，缺少 API 密钥时返回配置错误
    pub fn new(config: &Config) -> AppResult<Self> {
        let api_key = config.require_api_key()?;

        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(&config.llm_api_base_url);

        Ok(Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
        })
    }

    fn build_failed(e: impl std::fmt::Display) -> LlmError {
        LlmError::RequestBuildFailed(e.to_string())
    }
}

#[async_trait]
impl StructuredLlm for LlmService {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn invoke(
        &self,
        prompt: &JudgementPrompt,
        fragment: &str,
    ) -> Result<StructuredReply, LlmError> {
        debug!(
            "调用 LLM API，模型: {}，片段长度: {} 字符",
            self.model_name,
            fragment.chars().count()
        );

        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(prompt.system_prompt())
            .build()
            .map_err(Self::build_failed)?;
        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(fragment)
            .build()
            .map_err(Self::build_failed)?;

        let response_format = ResponseFormat::JsonSchema {
            json_schema: ResponseFormatJsonSchema {
                name: prompt.schema_name().to_string(),
                description: Some(format!(
                    "Judgement of whether a sentence is about {}",
                    prompt.phenomenon()
                )),
                schema: Some(prompt.response_schema().clone()),
                strict: Some(true),
            },
        };

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![
                ChatCompletionRequestMessage::System(system_msg),
                ChatCompletionRequestMessage::User(user_msg),
            ])
            .temperature(0.0)
            .response_format(response_format)
            .build()
            .map_err(Self::build_failed)?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            LlmError::ApiCallFailed {
                model: self.model_name.clone(),
                message: e.to_string(),
            }
        })?;

        let usage = response.usage.as_ref().map(|u| TokenUsage {
            prompt_tokens: u64::from(u.prompt_tokens),
            completion_tokens: u64::from(u.completion_tokens),
        });

        let choice = response.choices.first().ok_or_else(|| LlmError::EmptyResponse {
            model: self.model_name.clone(),
        })?;
        let content = choice
            .message
            .content
            .clone()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| LlmError::EmptyContent {
                model: self.model_name.clone(),
            })?;

        debug!("LLM API 调用成功");

        Ok(StructuredReply {
            content: content.trim().to_string(),
            usage,
        })
    }
}
