//! 片段分析流程 - 流程层
//!
//! 核心职责：定义"一个片段"的完整处理流程
//!
//! 流程顺序：
//! 1. LLM 结构化调用（带超时）
//! 2. 记录 token 用量
//! 3. 解析结构化输出，补上原文
//!
//! 任何一步失败都只影响当前片段：记录日志、计入失败数，以 `Err` 返回给上层丢弃。

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::error::{FragmentError, LlmError};
use crate::models::{AnalysisResult, Fragment, FragmentOutcome, LlmJudgement, TokenUsage};
use crate::services::{count_tokens, JudgementPrompt, StructuredLlm, StructuredReply, TokenCostTracker};
use crate::utils::logging::truncate_text;
use crate::workflow::fragment_ctx::FragmentCtx;

/// 片段分析器
///
/// - 每个片段只发一次请求，不重试
/// - 不持有文档，只处理单个片段
/// - 用量写入共享的 [`TokenCostTracker`]
#[derive(Clone)]
pub struct FragmentAnalyzer {
    llm: Arc<dyn StructuredLlm>,
    tracker: Arc<TokenCostTracker>,
    timeout: Duration,
}

impl FragmentAnalyzer {
    pub fn new(
        llm: Arc<dyn StructuredLlm>,
        tracker: Arc<TokenCostTracker>,
        timeout: Duration,
    ) -> Self {
        Self {
            llm,
            tracker,
            timeout,
        }
    }

    /// 分析单个片段
    pub async fn run(
        &self,
        prompt: &JudgementPrompt,
        fragment: &Fragment,
        ctx: &FragmentCtx,
    ) -> FragmentOutcome {
        match self.analyze(prompt, fragment).await {
            Ok(result) => {
                debug!(
                    "{} 判断: {} | {}",
                    ctx,
                    result.judgement,
                    truncate_text(&result.explanation, 80)
                );
                Ok(result)
            }
            Err(source) => {
                error!("{} ❌ 片段分析失败: {}", ctx, source);
                warn!("{} 问题片段: {}", ctx, fragment.text.trim());
                self.tracker.record_failure();
                Err(FragmentError {
                    index: fragment.index,
                    source,
                })
            }
        }
    }

    async fn analyze(
        &self,
        prompt: &JudgementPrompt,
        fragment: &Fragment,
    ) -> Result<AnalysisResult, LlmError> {
        let reply = tokio::time::timeout(self.timeout, self.llm.invoke(prompt, &fragment.text))
            .await
            .map_err(|_| LlmError::Timeout {
                secs: self.timeout.as_secs_f64(),
            })??;

        // 即使输出无法解析，token 也已经消耗了
        self.record_usage(prompt, fragment, &reply);

        let judgement = LlmJudgement::from_response(&reply.content)?;
        Ok(AnalysisResult::new(
            fragment.index,
            judgement,
            fragment.text.clone(),
        ))
    }

    /// 优先使用 API 报告的用量，否则按空白分词估算
    fn record_usage(&self, prompt: &JudgementPrompt, fragment: &Fragment, reply: &StructuredReply) {
        let usage = reply.usage.unwrap_or_else(|| TokenUsage {
            prompt_tokens: count_tokens(prompt.system_prompt()) + count_tokens(&fragment.text),
            completion_tokens: count_tokens(&reply.content),
        });
        self.tracker
            .update_usage(usage.prompt_tokens, usage.completion_tokens);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    enum Script {
        Reply(&'static str, Option<TokenUsage>),
        Fail,
        Hang,
    }

    struct ScriptedLlm(Script);

    #[async_trait]
    impl StructuredLlm for ScriptedLlm {
        fn model_name(&self) -> &str {
            "gpt-3.5-turbo"
        }

        async fn invoke(
            &self,
            _prompt: &JudgementPrompt,
            _fragment: &str,
        ) -> Result<StructuredReply, LlmError> {
            match &self.0 {
                Script::Reply(content, usage) => Ok(StructuredReply {
                    content: content.to_string(),
                    usage: *usage,
                }),
                Script::Fail => Err(LlmError::ApiCallFailed {
                    model: "gpt-3.5-turbo".to_string(),
                    message: "connection reset".to_string(),
                }),
                Script::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    unreachable!("调用应当超时")
                }
            }
        }
    }

    fn analyzer(script: Script, timeout: Duration) -> (FragmentAnalyzer, Arc<TokenCostTracker>) {
        let tracker = Arc::new(TokenCostTracker::new("gpt-3.5-turbo"));
        let analyzer = FragmentAnalyzer::new(Arc::new(ScriptedLlm(script)), tracker.clone(), timeout);
        (analyzer, tracker)
    }

    fn fragment(index: usize, text: &str) -> Fragment {
        Fragment {
            index,
            start: 0,
            end: text.chars().count(),
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_success_attaches_original_text_and_api_usage() {
        let (analyzer, tracker) = analyzer(
            Script::Reply(
                r#"{"explanation": "Over walvissen.", "judgement": true, "details": null}"#,
                Some(TokenUsage {
                    prompt_tokens: 90,
                    completion_tokens: 12,
                }),
            ),
            Duration::from_secs(5),
        );
        let prompt = JudgementPrompt::new("walvisvaart");
        let frag = fragment(4, "De walvis werd bij Spitsbergen gevangen.");

        let result = analyzer
            .run(&prompt, &frag, &FragmentCtx::new(1, 4, 9))
            .await
            .unwrap();

        assert_eq!(result.fragment_index, 4);
        assert_eq!(result.original_text, frag.text);
        assert!(result.judgement);

        let report = tracker.get_usage_report();
        assert_eq!((report.prompt_tokens, report.completion_tokens), (90, 12));
        assert_eq!(report.failed_fragments, 0);
    }

    #[tokio::test]
    async fn test_usage_is_estimated_when_api_reports_none() {
        let content = r#"{"explanation": "Niet relevant.", "judgement": false}"#;
        let (analyzer, tracker) = analyzer(Script::Reply(content, None), Duration::from_secs(5));
        let prompt = JudgementPrompt::new("walvisvaart");
        let frag = fragment(0, "Het regende drie dagen.");

        analyzer
            .run(&prompt, &frag, &FragmentCtx::new(1, 0, 1))
            .await
            .unwrap();

        let report = tracker.get_usage_report();
        assert_eq!(
            report.prompt_tokens,
            count_tokens(prompt.system_prompt()) + 4
        );
        assert_eq!(report.completion_tokens, count_tokens(content));
    }

    #[tokio::test]
    async fn test_malformed_reply_is_a_fragment_failure_but_usage_counts() {
        let (analyzer, tracker) = analyzer(
            Script::Reply("Ja.", None),
            Duration::from_secs(5),
        );
        let prompt = JudgementPrompt::new("pest");

        let err = analyzer
            .run(&prompt, &fragment(2, "De pest woedde."), &FragmentCtx::new(1, 2, 3))
            .await
            .unwrap_err();

        assert_eq!(err.index, 2);
        assert!(matches!(err.source, LlmError::MalformedResponse { .. }));
        let report = tracker.get_usage_report();
        assert_eq!(report.failed_fragments, 1);
        assert!(report.total_tokens > 0);
    }

    #[tokio::test]
    async fn test_api_error_is_contained() {
        let (analyzer, tracker) = analyzer(Script::Fail, Duration::from_secs(5));
        let prompt = JudgementPrompt::new("pest");

        let err = analyzer
            .run(&prompt, &fragment(0, "x"), &FragmentCtx::new(1, 0, 1))
            .await
            .unwrap_err();

        assert!(matches!(err.source, LlmError::ApiCallFailed { .. }));
        let report = tracker.get_usage_report();
        assert_eq!(report.failed_fragments, 1);
        assert_eq!(report.total_tokens, 0);
    }

    #[tokio::test]
    async fn test_hung_call_times_out() {
        let (analyzer, tracker) = analyzer(Script::Hang, Duration::from_millis(50));
        let prompt = JudgementPrompt::new("pest");

        let err = analyzer
            .run(&prompt, &fragment(0, "x"), &FragmentCtx::new(1, 0, 1))
            .await
            .unwrap_err();

        assert!(matches!(err.source, LlmError::Timeout { .. }));
        assert!(err.to_string().contains("0.05 秒"), "{err}");
        assert_eq!(tracker.get_usage_report().failed_fragments, 1);
    }

    /// 把日志写进内存，供断言使用
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failed_fragment_is_logged_in_full() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let (analyzer, _tracker) = analyzer(Script::Fail, Duration::from_secs(5));
        let prompt = JudgementPrompt::new("pest");
        let text = "De pest woedde in Leiden. ".repeat(16);
        assert!(text.chars().count() > 400);

        analyzer
            .run(&prompt, &fragment(0, &text), &FragmentCtx::new(1, 0, 1))
            .await
            .unwrap_err();

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains(text.trim()), "{output}");
    }
}
