//! 批量文档处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量文档的处理和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：校验配置、创建 LLM 服务和共享的用量统计
//! 2. **文档发现**：扫描输入目录中的 `.txt` 文件，没有文件时立即失败
//! 3. **并发控制**：使用 Semaphore 限制同时分析的文档数量
//! 4. **结果落盘**：有相关段落的文档写入 `<文件名>_relevant.txt`
//! 5. **全局统计**：汇总所有文档的处理结果和 token 用量
//!
//! ## 设计特点
//!
//! - **全部提交，窗口执行**：所有文档一次性 spawn，拿到许可的才开始分析
//! - **文档隔离**：单个文档读取失败只记为失败，不影响其他文档
//! - **向下委托**：委托 document_processor 处理单个文档

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::fs;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::document::file_name_of;
use crate::models::{discover_text_files, UsageReport};
use crate::orchestrator::document_processor::DocumentAnalyzer;
use crate::services::{LlmService, PassageWriter, StructuredLlm, TokenCostTracker};
use crate::utils::logging;

/// 单个文档的最终状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentOutcome {
    /// 找到相关段落并已写入文件
    WrittenWithMatches { path: PathBuf, passages: usize },
    /// 没有相关段落，只记录日志
    NoMatchesLogged,
}

/// 整个批次的统计
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub total_documents: usize,
    pub with_matches: usize,
    pub without_matches: usize,
    pub failed_documents: usize,
    pub passages_written: usize,
    /// 同时处于分析阶段的文档数峰值
    pub peak_concurrent_documents: usize,
    pub usage: UsageReport,
}

/// 应用主结构
pub struct App {
    config: Arc<Config>,
    llm: Arc<dyn StructuredLlm>,
    tracker: Arc<TokenCostTracker>,
}

impl App {
    /// 初始化应用，使用 OpenAI 兼容的 LLM 服务
    pub fn initialize(config: Config) -> AppResult<Self> {
        config.validate()?;
        let llm = Arc::new(LlmService::new(&config)?);
        Self::with_llm(config, llm)
    }

    /// 使用指定的 LLM 后端初始化应用
    pub fn with_llm(config: Config, llm: Arc<dyn StructuredLlm>) -> AppResult<Self> {
        config.validate()?;
        let tracker = Arc::new(TokenCostTracker::new(llm.model_name()));
        Ok(Self {
            config: Arc::new(config),
            llm,
            tracker,
        })
    }

    /// 本次运行的用量快照
    pub fn usage_report(&self) -> UsageReport {
        self.tracker.get_usage_report()
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> AppResult<BatchSummary> {
        // 先确认有文件可处理，再产生任何副作用
        info!("\n📁 正在扫描待处理的文档...");
        let paths = discover_text_files(&self.config.input_dir).await?;

        fs::create_dir_all(&self.config.output_dir)
            .await
            .map_err(|e| AppError::create_dir_failed(&self.config.output_dir, e))?;

        let log_file = self.config.log_file_path();
        logging::init_log_file(&log_file).map_err(|e| AppError::Other(e.to_string()))?;

        logging::log_startup(
            &self.config.phenomenon,
            self.tracker.model(),
            self.config.max_document_tasks,
        );
        if !self.tracker.has_known_pricing() {
            warn!("⚠️ 模型 {} 没有价格信息，费用估算为 0", self.tracker.model());
        }
        logging::log_documents_loaded(paths.len(), self.config.max_document_tasks);

        let summary = self.process_all_documents(paths).await;

        logging::print_final_stats(&summary, &log_file);
        if let Err(e) =
            logging::append_to_log_file(&log_file, &logging::format_usage_report(&summary.usage))
        {
            warn!("⚠️ 无法写入用量报告到日志文件: {}", e);
        }

        Ok(summary)
    }

    /// 处理所有文档
    async fn process_all_documents(&self, paths: Vec<PathBuf>) -> BatchSummary {
        let total = paths.len();
        let semaphore = Arc::new(Semaphore::new(self.config.max_document_tasks));
        let analyzer = Arc::new(DocumentAnalyzer::new(
            self.llm.clone(),
            self.tracker.clone(),
            &self.config,
        ));
        let writer = Arc::new(
            PassageWriter::new(&self.config.output_dir).with_header(self.config.write_header),
        );
        let gauge = Arc::new(ActiveGauge::default());
        let completed = Arc::new(AtomicUsize::new(0));

        // 为所有文档创建任务，由信号量决定谁先运行
        let mut handles = Vec::with_capacity(total);
        for (idx, path) in paths.into_iter().enumerate() {
            let document_index = idx + 1;
            let semaphore = semaphore.clone();
            let analyzer = analyzer.clone();
            let writer = writer.clone();
            let gauge = gauge.clone();
            let completed = completed.clone();
            let config = self.config.clone();

            let handle = tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| AppError::Other(e.to_string()))?;
                let _active = gauge.enter();

                let result = process_document(
                    &analyzer,
                    &writer,
                    &config.phenomenon,
                    &path,
                    document_index,
                    total,
                )
                .await;

                logging::log_progress(completed.fetch_add(1, Ordering::Relaxed) + 1, total);
                result
            });
            handles.push((document_index, handle));
        }

        // 等待所有任务完成
        let mut summary = BatchSummary {
            total_documents: total,
            with_matches: 0,
            without_matches: 0,
            failed_documents: 0,
            passages_written: 0,
            peak_concurrent_documents: 0,
            usage: self.tracker.get_usage_report(),
        };

        for (document_index, handle) in handles {
            match handle.await {
                Ok(Ok(DocumentOutcome::WrittenWithMatches { passages, .. })) => {
                    summary.with_matches += 1;
                    summary.passages_written += passages;
                }
                Ok(Ok(DocumentOutcome::NoMatchesLogged)) => {
                    summary.without_matches += 1;
                }
                Ok(Err(e)) => {
                    error!("[文档 {}] ❌ 处理过程中发生错误: {}", document_index, e);
                    summary.failed_documents += 1;
                }
                Err(e) => {
                    error!("[文档 {}] 任务执行失败: {}", document_index, e);
                    summary.failed_documents += 1;
                }
            }
        }

        summary.peak_concurrent_documents = gauge.peak();
        summary.usage = self.tracker.get_usage_report();
        summary
    }
}

/// 处理单个文档：分析 → 汇总 → 写入或记录
async fn process_document(
    analyzer: &DocumentAnalyzer,
    writer: &PassageWriter,
    phenomenon: &str,
    path: &Path,
    document_index: usize,
    total: usize,
) -> AppResult<DocumentOutcome> {
    let name = file_name_of(path);
    logging::log_document_start(document_index, total, &name);

    let analysis = analyzer
        .analyze_document(path, phenomenon, document_index)
        .await?;

    if analysis.failed_fragments > 0 {
        warn!(
            "[文档 {}] ⚠️ {} 个片段分析失败，已跳过",
            document_index, analysis.failed_fragments
        );
    }

    let passages = analysis.relevant_passages();
    match writer.write(&analysis.document_name, &passages).await? {
        Some(path) => {
            info!(
                "[文档 {}] ✅ 找到 {} 个相关段落，已写入 {}",
                document_index,
                passages.len(),
                path.display()
            );
            Ok(DocumentOutcome::WrittenWithMatches {
                path,
                passages: passages.len(),
            })
        }
        None => {
            info!(
                "[文档 {}] ➖ 未找到相关段落: {}",
                document_index, analysis.document_name
            );
            Ok(DocumentOutcome::NoMatchesLogged)
        }
    }
}

/// 统计同时处于分析阶段的文档数
#[derive(Debug, Default)]
struct ActiveGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl ActiveGauge {
    fn enter(self: &Arc<Self>) -> ActiveGuard {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        ActiveGuard(self.clone())
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct ActiveGuard(Arc<ActiveGauge>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}
