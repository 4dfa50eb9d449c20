//! 文档与片段

use std::path::{Path, PathBuf};

/// 待分析的文档
///
/// 读取一次后不再修改。
#[derive(Debug, Clone)]
pub struct Document {
    /// 文件路径
    pub path: PathBuf,
    /// 原始文本
    pub text: String,
}

impl Document {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    /// 文件名（用于日志和输出文件命名）
    pub fn file_name(&self) -> String {
        file_name_of(&self.path)
    }
}

/// 文档中的一个连续片段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// 在文档中的序号（从 0 开始）
    pub index: usize,
    /// 起始位置（字符偏移，含）
    pub start: usize,
    /// 结束位置（字符偏移，不含）
    pub end: usize,
    /// 片段文本
    pub text: String,
}

impl Fragment {
    /// 片段是否只有空白
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
