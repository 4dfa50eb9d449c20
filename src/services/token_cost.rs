//! Token 用量与费用统计 - 业务能力层
//!
//! 一次运行共享一个 [`TokenCostTracker`]，所有并发中的 LLM 调用完成后都往里累加。
//! 计数使用原子整数，累加满足交换律，不会丢失更新。

use std::sync::atomic::{AtomicU64, Ordering};

use crate::models::UsageReport;

/// 每 1K token 的美元价格
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    pub prompt: f64,
    pub completion: f64,
}

impl ModelPricing {
    const FREE: ModelPricing = ModelPricing {
        prompt: 0.0,
        completion: 0.0,
    };
}

/// 已知模型的价格表（按模型名精确匹配）
static MODEL_PRICING: phf::Map<&'static str, ModelPricing> = phf::phf_map! {
    "gpt-4-turbo" => ModelPricing { prompt: 0.01, completion: 0.03 },
    "gpt-4-turbo-mini" => ModelPricing { prompt: 0.01, completion: 0.03 },
    "gpt-4-turbo-mini-2024-07-18" => ModelPricing { prompt: 0.01, completion: 0.03 },
    "gpt-4o-mini" => ModelPricing { prompt: 0.00015, completion: 0.0006 },
    "gpt-4o-mini-2024-07-18" => ModelPricing { prompt: 0.00015, completion: 0.0006 },
    "gpt-3.5-turbo" => ModelPricing { prompt: 0.0005, completion: 0.0015 },
};

/// 查询模型价格，未知模型返回 `None`
pub fn lookup_pricing(model: &str) -> Option<ModelPricing> {
    MODEL_PRICING.get(model).copied()
}

/// 粗略的 token 计数：按空白分隔的词数
pub fn count_tokens(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}

/// Token 用量与费用累加器
#[derive(Debug)]
pub struct TokenCostTracker {
    model: String,
    pricing: ModelPricing,
    prompt_tokens: AtomicU64,
    completion_tokens: AtomicU64,
    failed_fragments: AtomicU64,
    known_pricing: bool,
}

impl TokenCostTracker {
    pub fn new(model: impl Into<String>) -> Self {
        let model = model.into();
        let pricing = lookup_pricing(&model);
        Self {
            pricing: pricing.unwrap_or(ModelPricing::FREE),
            known_pricing: pricing.is_some(),
            model,
            prompt_tokens: AtomicU64::new(0),
            completion_tokens: AtomicU64::new(0),
            failed_fragments: AtomicU64::new(0),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// 是否为价格表中的已知模型
    ///
    /// 未知模型不报错，费用按 0 估算，由调用方负责提示。
    pub fn has_known_pricing(&self) -> bool {
        self.known_pricing
    }

    /// 累加一次调用的用量
    pub fn update_usage(&self, prompt_tokens: u64, completion_tokens: u64) {
        self.prompt_tokens.fetch_add(prompt_tokens, Ordering::Relaxed);
        self.completion_tokens
            .fetch_add(completion_tokens, Ordering::Relaxed);
    }

    /// 记录一个分析失败的片段
    pub fn record_failure(&self) {
        self.failed_fragments.fetch_add(1, Ordering::Relaxed);
    }

    /// 当前用量快照
    pub fn get_usage_report(&self) -> UsageReport {
        let prompt_tokens = self.prompt_tokens.load(Ordering::Relaxed);
        let completion_tokens = self.completion_tokens.load(Ordering::Relaxed);
        let estimated_cost_usd = (prompt_tokens as f64 / 1000.0) * self.pricing.prompt
            + (completion_tokens as f64 / 1000.0) * self.pricing.completion;

        UsageReport {
            model: self.model.clone(),
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
            estimated_cost_usd,
            failed_fragments: self.failed_fragments.load(Ordering::Relaxed),
        }
    }
}
