//! 文本切分服务 - 业务能力层
//!
//! 把整篇文档切成长度受限、首尾重叠的片段。
//!
//! 切分按字符（而非字节）计算：窗口最长 `chunk_size` 个字符，优先在段落、换行、
//! 句末标点、空格处断开；找不到分隔符时硬切。下一个片段从上一个片段末尾往回
//! `chunk_overlap` 个字符开始，因此相邻片段恰好重叠 `chunk_overlap` 个字符，
//! 去掉重叠部分后按顺序拼接即可还原原文。

use crate::models::Fragment;

/// 分隔符，按优先级从高到低
const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", ". ", "! ", "? ", "; ", ", ", " "];

/// 文本切分器
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<Vec<char>>,
}

impl TextSplitter {
    /// 创建切分器
    ///
    /// 调用方需保证 `chunk_overlap < chunk_size`（`Config::validate` 已检查）；
    /// 否则重叠长度会被截到 `chunk_size - 1`。
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
            separators: DEFAULT_SEPARATORS
                .iter()
                .map(|s| s.chars().collect())
                .collect(),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// 切分文本，返回按原文顺序编号的片段
    pub fn split(&self, text: &str) -> Vec<Fragment> {
        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();
        let mut fragments = Vec::new();
        if total == 0 {
            return fragments;
        }

        let mut start = 0;
        loop {
            let hard_end = (start + self.chunk_size).min(total);
            let end = if hard_end == total {
                total
            } else {
                // 断点必须越过重叠区，保证下一个片段向前推进
                let min_end = start + self.chunk_overlap + 1;
                self.find_break(&chars, start, min_end, hard_end)
                    .unwrap_or(hard_end)
            };

            fragments.push(Fragment {
                index: fragments.len(),
                start,
                end,
                text: chars[start..end].iter().collect(),
            });

            if end == total {
                break;
            }
            start = end - self.chunk_overlap;
        }

        fragments
    }

    /// 在 `[min_end, hard_end]` 内寻找最靠后的分隔符断点（断在分隔符之后）
    fn find_break(
        &self,
        chars: &[char],
        start: usize,
        min_end: usize,
        hard_end: usize,
    ) -> Option<usize> {
        for sep in &self.separators {
            let mut end = hard_end;
            while end >= min_end && end >= start + sep.len() {
                if chars[end - sep.len()..end] == sep[..] {
                    return Some(end);
                }
                end -= 1;
            }
        }
        None
    }
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::new(400, 20)
    }
}
