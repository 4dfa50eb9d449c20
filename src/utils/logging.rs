/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::models::UsageReport;
use crate::orchestrator::BatchSummary;

/// 初始化 tracing 日志
///
/// `RUST_LOG` 优先；否则默认 `info`，`verbose` 时为 `debug`。重复调用不会报错。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &Path) -> Result<()> {
    let log_header = format!(
        "{}\n文档分析日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)
        .with_context(|| format!("无法写入日志文件: {}", log_file_path.display()))?;
    Ok(())
}

/// 向日志文件追加一段文本
pub fn append_to_log_file(log_file_path: &Path, text: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)
        .with_context(|| format!("无法打开日志文件: {}", log_file_path.display()))?;
    writeln!(file, "{}", text)?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(phenomenon: &str, model: &str, max_document_tasks: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 并发文档分析模式");
    info!("🔎 研究主题: {}", phenomenon);
    info!("🤖 模型: {}", model);
    info!("📊 最大并发文档数: {}", max_document_tasks);
    info!("{}", "=".repeat(60));
}

/// 记录文档加载信息
pub fn log_documents_loaded(total: usize, max_concurrent: usize) {
    info!("✓ 找到 {} 个待处理的文档", total);
    info!("📋 同时最多处理 {} 个文档，其余排队等待\n", max_concurrent);
}

/// 记录单个文档开始
pub fn log_document_start(document_index: usize, total: usize, name: &str) {
    info!("\n[文档 {}] {}", document_index, "─".repeat(30));
    info!("[文档 {}] 开始处理 ({}/{}): {}", document_index, document_index, total, name);
}

/// 记录批次进度
pub fn log_progress(completed: usize, total: usize) {
    info!("📈 进度: {}/{} 个文档已完成", completed, total);
}

/// 用量报告的多行文本
pub fn format_usage_report(report: &UsageReport) -> String {
    format!("{}\n{}\n{}", "─".repeat(60), report, "─".repeat(60))
}

/// 打印最终统计信息
pub fn print_final_stats(summary: &BatchSummary, log_file_path: &Path) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!(
        "✅ 有相关段落: {}/{}",
        summary.with_matches, summary.total_documents
    );
    info!("➖ 无相关段落: {}", summary.without_matches);
    info!("❌ 失败: {}", summary.failed_documents);
    info!("📝 写入段落: {}", summary.passages_written);
    info!("{}", "=".repeat(60));
    for line in summary.usage.to_string().lines() {
        info!("{}", line);
    }
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path.display());
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（字符）
pub fn truncate_text(text: &str, max_len: usize) -> String {
    let text = text.trim();
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text_counts_chars() {
        assert_eq!(truncate_text("  kort  ", 10), "kort");
        assert_eq!(truncate_text("zeeëngte", 4), "zeeë...");
    }

    #[test]
    fn test_log_file_header_then_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");

        init_log_file(&path).unwrap();
        append_to_log_file(&path, "total_tokens: 12").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with(&"=".repeat(60)));
        assert!(content.contains("文档分析日志"));
        assert!(content.ends_with("total_tokens: 12\n"));
    }
}
