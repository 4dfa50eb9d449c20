//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量文档处理器
//! - 扫描输入目录（Vec<PathBuf>）
//! - 控制同时分析的文档数量（Semaphore）
//! - 持有共享的 LLM 后端和用量统计
//! - 写出相关段落、输出全局统计信息
//!
//! ### `document_processor` - 单个文档处理器
//! - 读取并切分单个文档（Vec<Fragment>）
//! - 并发调度所有片段的 `FragmentAnalyzer`
//! - 按原文顺序汇总结果
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<Document>)
//!     ↓  Semaphore(max_document_tasks)
//! document_processor (处理 Vec<Fragment>)
//!     ↓  join_all / buffered(max_fragment_tasks)
//! workflow::FragmentAnalyzer (处理单个 Fragment)
//!     ↓
//! services (能力层：llm / splitter / token_cost / writer)
//! ```
//!
//! 同时进行的 LLM 调用数最多为
//! `max_document_tasks × 当前活跃文档中最大的片段数`，
//! 设置 `max_fragment_tasks` 后为 `max_document_tasks × max_fragment_tasks`。

pub mod batch_processor;
pub mod document_processor;

// 重新导出主要类型
pub use batch_processor::{App, BatchSummary, DocumentOutcome};
pub use document_processor::{DocumentAnalysis, DocumentAnalyzer};
