//! 片段处理上下文
//!
//! 封装"我正在处理哪个文档的第几个片段"这一信息

use std::fmt::Display;

/// 片段处理上下文（仅用于日志）
#[derive(Debug, Clone)]
pub struct FragmentCtx {
    /// 文档索引（从1开始）
    pub document_index: usize,

    /// 片段在文档中的索引（从0开始）
    pub fragment_index: usize,

    /// 文档的片段总数
    pub fragment_count: usize,
}

impl FragmentCtx {
    pub fn new(document_index: usize, fragment_index: usize, fragment_count: usize) -> Self {
        Self {
            document_index,
            fragment_index,
            fragment_count,
        }
    }
}

impl Display for FragmentCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[文档 {}] [片段 {}/{}]",
            self.document_index,
            self.fragment_index + 1,
            self.fragment_count
        )
    }
}
