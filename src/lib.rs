//! # dbnl_bear
//!
//! 用 LLM 批量阅读历史文本：把文档切成片段，逐段判断是否与研究主题相关，
//! 并把相关段落按原文顺序写出。
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 数据层（Models）
//! - `models/` - 文档、片段、分析结果、用量报告
//! - `loaders` - 扫描输入目录、读取 UTF-8 文本
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个片段或单个文件
//! - `LlmService` - 结构化 LLM 判断能力（实现 `StructuredLlm`）
//! - `TextSplitter` - 文本切分能力
//! - `TokenCostTracker` - token 用量与费用统计
//! - `PassageWriter` - 写 `_relevant.txt` 能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个片段"的完整处理流程
//! - `FragmentCtx` - 上下文封装（文档索引 + 片段索引）
//! - `FragmentAnalyzer` - 流程编排（LLM → 用量 → 解析 → 补原文）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量文档处理器，管理资源和并发
//! - `orchestrator/document_processor` - 单个文档处理器，并发调度片段
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult, FragmentError, LlmError};
pub use models::{AnalysisResult, Fragment, UsageReport};
pub use orchestrator::{App, BatchSummary, DocumentAnalysis, DocumentAnalyzer};
pub use services::{JudgementPrompt, LlmService, StructuredLlm, StructuredReply, TextSplitter, TokenCostTracker};
pub use workflow::{FragmentAnalyzer, FragmentCtx};
