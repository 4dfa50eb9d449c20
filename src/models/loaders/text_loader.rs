use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::{AppError, AppResult, FileError};
use crate::models::document::{file_name_of, Document};

/// 扫描目录下所有 .txt 文件（不递归），按文件名排序
///
/// 目录不存在或没有 .txt 文件时直接返回错误。
pub async fn discover_text_files(folder: &Path) -> AppResult<Vec<PathBuf>> {
    if !fs::try_exists(folder).await.unwrap_or(false) {
        return Err(AppError::File(FileError::DirectoryNotFound {
            path: folder.display().to_string(),
        }));
    }

    let mut entries = fs::read_dir(folder)
        .await
        .map_err(|e| AppError::file_read_failed(folder, e))?;

    let mut paths = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| AppError::file_read_failed(folder, e))?
    {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("txt") && path.is_file() {
            tracing::debug!("发现文档: {}", file_name_of(&path));
            paths.push(path);
        }
    }

    if paths.is_empty() {
        return Err(AppError::no_input_files(folder));
    }

    paths.sort();
    Ok(paths)
}

/// 读取单个 UTF-8 文档
pub async fn load_document(path: &Path) -> AppResult<Document> {
    let text = fs::read_to_string(path)
        .await
        .map_err(|e| AppError::file_read_failed(path, e))?;
    Ok(Document::new(path, text))
}
