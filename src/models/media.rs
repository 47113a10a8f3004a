use std::path::Path;

use phf::phf_map;

use crate::error::{AppError, AppResult};

/// 扩展名到媒体类型的映射，模拟浏览器给出的文件类型
static EXTENSION_MIME: phf::Map<&'static str, &'static str> = phf_map! {
    "json" => "application/json",
    "pdf" => "application/pdf",
    "png" => "image/png",
    "jpg" => "image/jpeg",
    "jpeg" => "image/jpeg",
    "gif" => "image/gif",
    "webp" => "image/webp",
    "bmp" => "image/bmp",
    "heic" => "image/heic",
    "txt" => "text/plain",
    "csv" => "text/csv",
};

const UNKNOWN_MIME: &str = "application/octet-stream";

/// 按声明的媒体类型选择处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// 习题批量 JSON，直接解析
    Json,
    /// PDF，交给 AI 提取
    Pdf,
    /// 任意 `image/*`，交给 AI 提取
    Image,
    Unsupported,
}

impl MediaKind {
    pub fn from_mime(mime_type: &str) -> Self {
        match mime_type {
            "application/json" => MediaKind::Json,
            "application/pdf" => MediaKind::Pdf,
            m if m.starts_with("image/") => MediaKind::Image,
            _ => MediaKind::Unsupported,
        }
    }
}

/// 根据扩展名推断媒体类型
pub fn mime_from_path(path: &Path) -> &'static str {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .and_then(|ext| EXTENSION_MIME.get(ext.as_str()).copied())
        .unwrap_or(UNKNOWN_MIME)
}

/// 用户选择的一个文件
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// 从磁盘读取文件
    pub async fn from_path(path: &Path) -> AppResult<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self::new(name, mime_from_path(path), bytes))
    }

    pub fn kind(&self) -> MediaKind {
        MediaKind::from_mime(&self.mime_type)
    }
}
