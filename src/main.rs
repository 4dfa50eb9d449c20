use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use dbnl_bear::utils::logging;
use dbnl_bear::{App, Config};

/// 用 LLM 在历史文本中查找与研究主题相关的段落
#[derive(Parser, Debug)]
#[command(name = "dbnl-bear", version, about)]
struct Cli {
    /// 研究主题，例如 "walvisvaart"
    phenomenon: Option<String>,

    /// 输入目录，读取其中的 .txt 文件
    #[arg(long, required_unless_present = "config")]
    input_dir: Option<PathBuf>,

    /// 输出目录，写入 <文件名>_relevant.txt
    #[arg(long, required_unless_present = "config")]
    output_dir: Option<PathBuf>,

    /// 同时处理的文档数量
    #[arg(long, env = "MAX_DOCUMENT_TASKS")]
    max_document_tasks: Option<usize>,

    /// 单个文档内同时分析的片段数量（默认不限制）
    #[arg(long, env = "MAX_FRAGMENT_TASKS")]
    max_fragment_tasks: Option<usize>,

    /// 模型名称
    #[arg(long, env = "LLM_MODEL_NAME")]
    model: Option<String>,

    /// 片段最大长度（字符）
    #[arg(long)]
    chunk_size: Option<usize>,

    /// 相邻片段重叠长度（字符）
    #[arg(long)]
    chunk_overlap: Option<usize>,

    /// 单次 LLM 调用超时（秒）
    #[arg(long)]
    timeout: Option<u64>,

    /// 在输出文件开头写入说明行
    #[arg(long)]
    with_header: bool,

    /// TOML 配置文件
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// 显示详细日志
    #[arg(long, short = 'v')]
    verbose: bool,
}

impl Cli {
    /// 命令行参数覆盖配置文件和环境变量
    fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_toml_file(path)?,
            None => Config::from_env(),
        };

        if let Some(v) = self.phenomenon {
            config.phenomenon = v;
        }
        if let Some(v) = self.input_dir {
            config.input_dir = v;
        }
        if let Some(v) = self.output_dir {
            config.output_dir = v;
        }
        if let Some(v) = self.max_document_tasks {
            config.max_document_tasks = v;
        }
        if self.max_fragment_tasks.is_some() {
            config.max_fragment_tasks = self.max_fragment_tasks;
        }
        if let Some(v) = self.model {
            config.llm_model_name = v;
        }
        if let Some(v) = self.chunk_size {
            config.chunk_size = v;
        }
        if let Some(v) = self.chunk_overlap {
            config.chunk_overlap = v;
        }
        if let Some(v) = self.timeout {
            config.fragment_timeout_secs = v;
        }
        config.write_header |= self.with_header;
        config.verbose_logging |= self.verbose;

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Cli::parse().into_config()?;

    // 初始化日志
    logging::init(config.verbose_logging);

    // 初始化并运行应用
    let app = App::initialize(config)?;
    let summary = app.run().await?;

    println!("{}", logging::format_usage_report(&summary.usage));

    Ok(())
}
