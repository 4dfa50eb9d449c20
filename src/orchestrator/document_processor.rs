//! 单个文档处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块负责处理单个文档的所有片段，是文档级别的编排器。
//!
//! ## 核心功能
//!
//! 1. **读取**：一次性读入整篇文档
//! 2. **切分**：按配置切成有序片段
//! 3. **提示词**：每个文档只构建一次 `JudgementPrompt`
//! 4. **并发分析**：所有片段同时发起（可选上限），结果按原始顺序收集
//! 5. **汇总**：丢弃失败片段，返回成功结果和当前用量快照
//!
//! 片段层面不设并发上限时，一个文档的所有片段会同时请求 LLM，
//! 整体的背压只来自批量处理器的文档级信号量。

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use futures::stream::{self, StreamExt};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::AppResult;
use crate::models::{load_document, AnalysisResult, Fragment, FragmentOutcome, UsageReport};
use crate::services::{JudgementPrompt, StructuredLlm, TextSplitter, TokenCostTracker};
use crate::workflow::{FragmentAnalyzer, FragmentCtx};

/// 单个文档的分析结果
#[derive(Debug, Clone)]
pub struct DocumentAnalysis {
    /// 文档文件名
    pub document_name: String,
    /// 切分出的片段总数
    pub fragment_count: usize,
    /// 成功分析的片段，按原文顺序
    pub results: Vec<AnalysisResult>,
    /// 分析失败的片段数
    pub failed_fragments: usize,
    /// 分析结束时的全局用量快照
    pub usage: UsageReport,
}

impl DocumentAnalysis {
    /// 判断为相关的片段原文，按原文顺序
    pub fn relevant_passages(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| r.judgement)
            .map(|r| r.original_text.as_str())
            .collect()
    }
}

/// 文档分析器
pub struct DocumentAnalyzer {
    fragment_analyzer: FragmentAnalyzer,
    tracker: Arc<TokenCostTracker>,
    splitter: TextSplitter,
    max_fragment_tasks: Option<usize>,
}

impl DocumentAnalyzer {
    pub fn new(
        llm: Arc<dyn StructuredLlm>,
        tracker: Arc<TokenCostTracker>,
        config: &Config,
    ) -> Self {
        Self {
            fragment_analyzer: FragmentAnalyzer::new(
                llm,
                tracker.clone(),
                Duration::from_secs(config.fragment_timeout_secs),
            ),
            tracker,
            splitter: TextSplitter::new(config.chunk_size, config.chunk_overlap),
            max_fragment_tasks: config.max_fragment_tasks,
        }
    }

    /// 分析单个文档
    ///
    /// 只有读取失败会返回错误；片段失败在内部消化，没有任何成功结果也是正常结束。
    pub async fn analyze_document(
        &self,
        path: &Path,
        phenomenon: &str,
        document_index: usize,
    ) -> AppResult<DocumentAnalysis> {
        let document = load_document(path).await?;
        let document_name = document.file_name();

        let fragments = self.splitter.split(&document.text);
        let fragment_count = fragments.len();
        info!(
            "[文档 {}] ✂️ {} 切分为 {} 个片段",
            document_index, document_name, fragment_count
        );

        let prompt = JudgementPrompt::new(phenomenon);
        let prompt = &prompt;
        let completed = AtomicUsize::new(0);
        let completed = &completed;

        let pending: Vec<&Fragment> = fragments.iter().filter(|f| !f.is_blank()).collect();

        // 收集成 Vec 后再 await，否则外层 future 不满足 tokio::spawn 的 Send 约束
        let tasks: Vec<_> = pending
            .into_iter()
            .map(|fragment| async move {
                let ctx = FragmentCtx::new(document_index, fragment.index, fragment_count);
                let outcome = self.fragment_analyzer.run(prompt, fragment, &ctx).await;
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                debug!("[文档 {}] 片段进度: {}/{}", document_index, done, fragment_count);
                outcome
            })
            .collect();

        // join_all 和 buffered 都按提交顺序产出结果，与完成顺序无关
        let outcomes: Vec<FragmentOutcome> = match self.max_fragment_tasks {
            None => join_all(tasks).await,
            Some(limit) => stream::iter(tasks).buffered(limit).collect().await,
        };

        let mut results = Vec::with_capacity(outcomes.len());
        let mut failed_fragments = 0;
        for outcome in outcomes {
            match outcome {
                Ok(result) => results.push(result),
                Err(_) => failed_fragments += 1,
            }
        }

        Ok(DocumentAnalysis {
            document_name,
            fragment_count,
            results,
            failed_fragments,
            usage: self.tracker.get_usage_report(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::services::StructuredReply;
    use async_trait::async_trait;

    /// 片段越靠前睡得越久，完成顺序与原文顺序相反
    struct ReverseLatencyLlm;

    #[async_trait]
    impl StructuredLlm for ReverseLatencyLlm {
        fn model_name(&self) -> &str {
            "test-model"
        }

        async fn invoke(
            &self,
            _prompt: &JudgementPrompt,
            fragment: &str,
        ) -> Result<StructuredReply, LlmError> {
            let n: u64 = fragment
                .trim()
                .trim_start_matches("zin ")
                .trim_end_matches('.')
                .parse()
                .unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(5 * (20 - n.min(20)))).await;

            if n % 7 == 3 {
                return Err(LlmError::EmptyContent {
                    model: "test-model".to_string(),
                });
            }
            let judgement = n % 2 == 0;
            Ok(StructuredReply {
                content: format!(r#"{{"explanation": "zin {n}", "judgement": {judgement}}}"#),
                usage: None,
            })
        }
    }

    fn config(max_fragment_tasks: Option<usize>) -> Config {
        Config {
            phenomenon: "ordening".to_string(),
            chunk_size: 8,
            chunk_overlap: 0,
            max_fragment_tasks,
            ..Config::default()
        }
    }

    async fn analyze(max_fragment_tasks: Option<usize>) -> DocumentAnalysis {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zinnen.txt");
        let text: String = (0..16).map(|i| format!("zin {i}.\n")).collect();
        std::fs::write(&path, text).unwrap();

        let tracker = Arc::new(TokenCostTracker::new("test-model"));
        let analyzer = DocumentAnalyzer::new(
            Arc::new(ReverseLatencyLlm),
            tracker,
            &config(max_fragment_tasks),
        );
        analyzer.analyze_document(&path, "ordening", 1).await.unwrap()
    }

    fn assert_ordered(analysis: &DocumentAnalysis) {
        let indices: Vec<usize> = analysis.results.iter().map(|r| r.fragment_index).collect();
        assert!(indices.windows(2).all(|w| w[0] < w[1]), "{indices:?}");
        for result in &analysis.results {
            assert_eq!(result.explanation.trim(), result.original_text.trim().trim_end_matches('.'));
        }
    }

    #[tokio::test]
    async fn test_results_keep_document_order_despite_completion_order() {
        let analysis = analyze(None).await;

        assert_eq!(analysis.fragment_count, 16);
        // 3 和 10 失败
        assert_eq!(analysis.failed_fragments, 2);
        assert_eq!(analysis.results.len(), 14);
        assert_eq!(analysis.usage.failed_fragments, 2);
        assert!(analysis.usage.total_tokens > 0);
        assert_ordered(&analysis);

        let relevant = analysis.relevant_passages();
        let expected: Vec<String> = (0..16)
            .step_by(2)
            .filter(|i| *i != 10)
            .map(|i| format!("zin {i}.\n"))
            .collect();
        assert_eq!(relevant, expected);
    }

    #[tokio::test]
    async fn test_secondary_bound_keeps_order() {
        let analysis = analyze(Some(3)).await;
        assert_eq!(analysis.results.len(), 14);
        assert_ordered(&analysis);
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn test_analyze_document_future_is_send() {
        let tracker = Arc::new(TokenCostTracker::new("test-model"));
        let analyzer = DocumentAnalyzer::new(Arc::new(ReverseLatencyLlm), tracker, &config(None));
        let future = analyzer.analyze_document(Path::new("zinnen.txt"), "ordening", 1);
        assert_send(&future);
    }

    #[tokio::test]
    async fn test_analysis_runs_inside_spawned_task() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zinnen.txt");
        std::fs::write(&path, "zin 2.
zin 4.
").unwrap();

        let tracker = Arc::new(TokenCostTracker::new("test-model"));
        let analyzer = Arc::new(DocumentAnalyzer::new(
            Arc::new(ReverseLatencyLlm),
            tracker,
            &config(Some(1)),
        ));
        let analysis = tokio::spawn(async move {
            analyzer.analyze_document(&path, "ordening", 1).await
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(analysis.relevant_passages(), vec!["zin 2.\n", "zin 4.\n"]);
    }

    #[tokio::test]
    async fn test_unreadable_document_is_an_error() {
        let tracker = Arc::new(TokenCostTracker::new("test-model"));
        let analyzer = DocumentAnalyzer::new(Arc::new(ReverseLatencyLlm), tracker, &config(None));
        let dir = tempfile::tempdir().unwrap();

        let result = analyzer
            .analyze_document(&dir.path().join("weg.txt"), "ordening", 1)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_empty_document_has_no_results() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leeg.txt");
        std::fs::write(&path, "").unwrap();

        let tracker = Arc::new(TokenCostTracker::new("test-model"));
        let analyzer = DocumentAnalyzer::new(Arc::new(ReverseLatencyLlm), tracker, &config(None));
        let analysis = analyzer.analyze_document(&path, "ordening", 1).await.unwrap();

        assert_eq!(analysis.fragment_count, 0);
        assert!(analysis.results.is_empty());
        assert!(analysis.relevant_passages().is_empty());
    }
}
