use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{AppError, AppResult, ConfigError, FileError};

/// API 密钥对应的环境变量
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// 默认模型
pub const DEFAULT_MODEL: &str = "gpt-4o-mini-2024-07-18";

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 研究主题（phenomenon of interest）
    pub phenomenon: String,
    /// 输入目录（.txt 文件），必须显式指定
    pub input_dir: PathBuf,
    /// 输出目录，必须显式指定
    pub output_dir: PathBuf,
    /// 同时处理的文档数量
    pub max_document_tasks: usize,
    /// 单个文档内同时分析的片段数量，`None` 表示不限制
    pub max_fragment_tasks: Option<usize>,
    /// 片段最大长度（字符）
    pub chunk_size: usize,
    /// 相邻片段重叠长度（字符）
    pub chunk_overlap: usize,
    /// 单次 LLM 调用超时（秒）
    pub fragment_timeout_secs: u64,
    /// 是否在输出文件开头写入说明行
    pub write_header: bool,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 运行日志文件，默认位于输出目录
    pub output_log_file: Option<PathBuf>,
    // --- LLM 配置 ---
    pub llm_api_key: Option<String>,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            phenomenon: String::new(),
            input_dir: PathBuf::new(),
            output_dir: PathBuf::new(),
            max_document_tasks: 1,
            max_fragment_tasks: None,
            chunk_size: 400,
            chunk_overlap: 20,
            fragment_timeout_secs: 120,
            write_header: false,
            verbose_logging: false,
            output_log_file: None,
            llm_api_key: None,
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: DEFAULT_MODEL.to_string(),
        }
    }
}

/// TOML 配置文件的结构，所有字段可选
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    phenomenon: Option<String>,
    input_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    max_document_tasks: Option<usize>,
    max_fragment_tasks: Option<usize>,
    chunk_size: Option<usize>,
    chunk_overlap: Option<usize>,
    fragment_timeout_secs: Option<u64>,
    write_header: Option<bool>,
    verbose_logging: Option<bool>,
    output_log_file: Option<PathBuf>,
    llm_api_base_url: Option<String>,
    llm_model_name: Option<String>,
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Config {
    /// 在默认值基础上应用环境变量
    pub fn from_env() -> Self {
        Self::default().merge_env()
    }

    /// 读取 TOML 配置文件，再应用环境变量
    ///
    /// 文件中的值覆盖默认值，环境变量覆盖文件中的值。
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(path, e))?;
        let file: FileConfig = toml::from_str(&content).map_err(|source| {
            AppError::File(FileError::TomlParseFailed {
                path: path.display().to_string(),
                source,
            })
        })?;

        let mut config = Self::default();
        if let Some(v) = file.phenomenon {
            config.phenomenon = v;
        }
        if let Some(v) = file.input_dir {
            config.input_dir = v;
        }
        if let Some(v) = file.output_dir {
            config.output_dir = v;
        }
        if let Some(v) = file.max_document_tasks {
            config.max_document_tasks = v;
        }
        if file.max_fragment_tasks.is_some() {
            config.max_fragment_tasks = file.max_fragment_tasks;
        }
        if let Some(v) = file.chunk_size {
            config.chunk_size = v;
        }
        if let Some(v) = file.chunk_overlap {
            config.chunk_overlap = v;
        }
        if let Some(v) = file.fragment_timeout_secs {
            config.fragment_timeout_secs = v;
        }
        if let Some(v) = file.write_header {
            config.write_header = v;
        }
        if let Some(v) = file.verbose_logging {
            config.verbose_logging = v;
        }
        if file.output_log_file.is_some() {
            config.output_log_file = file.output_log_file;
        }
        if let Some(v) = file.llm_api_base_url {
            config.llm_api_base_url = v;
        }
        if let Some(v) = file.llm_model_name {
            config.llm_model_name = v;
        }

        Ok(config.merge_env())
    }

    fn merge_env(self) -> Self {
        Self {
            max_document_tasks: env_parse("MAX_DOCUMENT_TASKS").unwrap_or(self.max_document_tasks),
            max_fragment_tasks: env_parse("MAX_FRAGMENT_TASKS").or(self.max_fragment_tasks),
            chunk_size: env_parse("CHUNK_SIZE").unwrap_or(self.chunk_size),
            chunk_overlap: env_parse("CHUNK_OVERLAP").unwrap_or(self.chunk_overlap),
            fragment_timeout_secs: env_parse("FRAGMENT_TIMEOUT_SECS")
                .unwrap_or(self.fragment_timeout_secs),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(self.verbose_logging),
            llm_api_key: std::env::var(API_KEY_ENV)
                .ok()
                .filter(|k| !k.trim().is_empty())
                .or(self.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(self.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(self.llm_model_name),
            ..self
        }
    }

    /// 校验与 LLM 后端无关的配置项
    pub fn validate(&self) -> AppResult<()> {
        if self.phenomenon.trim().is_empty() {
            return Err(AppError::invalid_config("phenomenon", "研究主题不能为空"));
        }
        if self.input_dir.as_os_str().is_empty() {
            return Err(AppError::invalid_config("input_dir", "未指定输入目录"));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(AppError::invalid_config("output_dir", "未指定输出目录"));
        }
        if self.max_document_tasks == 0 {
            return Err(AppError::invalid_config(
                "max_document_tasks",
                "必须是正整数",
            ));
        }
        if self.max_fragment_tasks == Some(0) {
            return Err(AppError::invalid_config(
                "max_fragment_tasks",
                "必须是正整数",
            ));
        }
        if self.fragment_timeout_secs == 0 {
            return Err(AppError::invalid_config(
                "fragment_timeout_secs",
                "必须是正整数",
            ));
        }
        if self.chunk_size == 0 {
            return Err(AppError::invalid_config("chunk_size", "必须是正整数"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(AppError::invalid_config(
                "chunk_overlap",
                format!(
                    "重叠长度 {} 必须小于片段长度 {}",
                    self.chunk_overlap, self.chunk_size
                ),
            ));
        }
        Ok(())
    }

    /// 取出 API 密钥，缺失时返回配置错误
    pub fn require_api_key(&self) -> AppResult<&str> {
        self.llm_api_key.as_deref().ok_or_else(|| {
            AppError::Config(ConfigError::MissingApiKey {
                var_name: API_KEY_ENV.to_string(),
            })
        })
    }

    /// 运行日志文件路径
    pub fn log_file_path(&self) -> PathBuf {
        self.output_log_file
            .clone()
            .unwrap_or_else(|| self.output_dir.join("run.log"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn valid() -> Config {
        Config {
            phenomenon: "scheepvaart".to_string(),
            input_dir: PathBuf::from("teksten"),
            output_dir: PathBuf::from("uit"),
            ..Config::default()
        }
    }

    #[test]
    fn test_defaults_match_cli_surface() {
        let config = Config::default();
        assert_eq!(config.max_document_tasks, 1);
        assert_eq!(config.chunk_size, 400);
        assert_eq!(config.chunk_overlap, 20);
        assert_eq!(config.llm_model_name, DEFAULT_MODEL);
        assert!(config.max_fragment_tasks.is_none());
    }

    #[test]
    fn test_validate_rejects_zero_document_tasks() {
        let config = Config {
            max_document_tasks: 0,
            ..valid()
        };
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = Config {
            fragment_timeout_secs: 0,
            ..valid()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("fragment_timeout_secs"));
    }

    #[test]
    fn test_validate_requires_input_and_output_dirs() {
        assert!(Config::default().input_dir.as_os_str().is_empty());

        let no_input = Config {
            input_dir: PathBuf::new(),
            ..valid()
        };
        assert!(no_input.validate().unwrap_err().to_string().contains("input_dir"));

        let no_output = Config {
            output_dir: PathBuf::new(),
            ..valid()
        };
        assert!(no_output.validate().unwrap_err().to_string().contains("output_dir"));
    }

    #[test]
    fn test_validate_rejects_overlap_not_smaller_than_chunk() {
        let config = Config {
            chunk_size: 20,
            chunk_overlap: 20,
            ..valid()
        };
        assert!(config.validate().is_err());
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let config = Config {
            llm_api_key: None,
            ..valid()
        };
        let err = config.require_api_key().unwrap_err();
        assert!(err.to_string().contains(API_KEY_ENV));
    }

    #[test]
    fn test_from_toml_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "phenomenon = \"walvisvaart\"\nchunk_size = 300\nmax_fragment_tasks = 4\nwrite_header = true"
        )
        .unwrap();

        let config = Config::from_toml_file(file.path()).unwrap();
        assert_eq!(config.phenomenon, "walvisvaart");
        assert_eq!(config.chunk_size, 300);
        assert_eq!(config.max_fragment_tasks, Some(4));
        assert!(config.write_header);
    }

    #[test]
    fn test_from_toml_file_reports_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "chunk_size = \"veel\"").unwrap();
        let err = Config::from_toml_file(file.path()).unwrap_err();
        assert!(matches!(err, AppError::File(FileError::TomlParseFailed { .. })));
    }

    #[test]
    fn test_log_file_defaults_into_output_dir() {
        let config = Config {
            output_dir: PathBuf::from("out"),
            ..valid()
        };
        let path = config.log_file_path();
        assert_eq!(path, PathBuf::from("out").join("run.log"));
        // 输出目录再作为输入目录时不会被当成文档
        assert_ne!(path.extension().and_then(|e| e.to_str()), Some("txt"));
    }
}
