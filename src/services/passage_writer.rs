//! 相关段落写入服务 - 业务能力层
//!
//! 只负责"把一个文档的相关段落写成文件"的能力，不关心流程

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{AppError, AppResult};

/// 输出文件后缀
pub const OUTPUT_SUFFIX: &str = "_relevant.txt";

/// 相关段落写入服务
///
/// 每个源文档对应一个 `<原文件名>_relevant.txt`，每行一个片段。
pub struct PassageWriter {
    output_dir: PathBuf,
    write_header: bool,
}

impl PassageWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            write_header: false,
        }
    }

    /// 在文件开头写一行说明
    pub fn with_header(mut self, write_header: bool) -> Self {
        self.write_header = write_header;
        self
    }

    /// 某个源文档对应的输出路径
    pub fn output_path(&self, document_name: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}{}", document_name, OUTPUT_SUFFIX))
    }

    /// 写入相关段落
    ///
    /// 片段内部的换行替换为空格，保证一行一个片段。段落为空时不创建文件，返回 `None`。
    pub async fn write(
        &self,
        document_name: &str,
        passages: &[&str],
    ) -> AppResult<Option<PathBuf>> {
        if passages.is_empty() {
            return Ok(None);
        }

        let path = self.output_path(document_name);
        debug!(
            "写入相关段落: {} | 段落数: {}",
            path.display(),
            passages.len()
        );

        let mut body = String::new();
        if self.write_header {
            body.push_str(&format!(
                "In this text: {} the following has been found:\n",
                document_name
            ));
        }
        for passage in passages {
            body.push_str(&single_line(passage));
            body.push('\n');
        }

        write_file(&path, body.as_bytes()).await?;
        Ok(Some(path))
    }
}

/// 换行替换为空格，其余字符原样保留
fn single_line(passage: &str) -> String {
    passage
        .trim_matches(|c: char| c == '\n' || c == '\r')
        .replace("\r\n", " ")
        .replace(|c: char| c == '\n' || c == '\r', " ")
}

async fn write_file(path: &Path, bytes: &[u8]) -> AppResult<()> {
    let mut file = fs::File::create(path)
        .await
        .map_err(|e| AppError::file_write_failed(path, e))?;
    file.write_all(bytes)
        .await
        .map_err(|e| AppError::file_write_failed(path, e))?;
    file.flush()
        .await
        .map_err(|e| AppError::file_write_failed(path, e))?;
    Ok(())
}
