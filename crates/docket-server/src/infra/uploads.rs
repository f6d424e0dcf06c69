//! File storage for banner images and board attachments.
//!
//! Files land under `<dir>/<category>/<yyyy>/<mm>/<uuid>.<ext>`. The stored
//! path is always relative to the upload root and uses `/` separators, so it
//! doubles as the tail of the public `/uploads/...` URL.

use std::io::Cursor;
use std::path::{Component, Path, PathBuf};

use axum::extract::multipart::Field;
use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::config::UploadConfig;

pub const PUBLIC_PREFIX: &str = "/uploads";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("file is empty")]
    Empty,
    #[error("file exceeds {limit} bytes")]
    TooLarge { limit: usize },
    #[error("extension not allowed: {0}")]
    ExtensionNotAllowed(String),
    #[error("invalid path")]
    InvalidPath,
    #[error("invalid image: {0}")]
    InvalidImage(String),
    #[error("multipart read failed: {0}")]
    Multipart(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Image,
    Attachment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub original_name: String,
    pub stored_path: String,
    pub mime_type: String,
    pub size_bytes: i64,
}

impl StoredFile {
    pub fn public_url(&self) -> String {
        public_url(&self.stored_path)
    }
}

pub fn public_url(stored_path: &str) -> String {
    format!("{PUBLIC_PREFIX}/{stored_path}")
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    config: UploadConfig,
}

impl UploadStore {
    pub fn new(config: UploadConfig) -> Self {
        Self { config }
    }

    pub fn root(&self) -> &Path {
        Path::new(&self.config.dir)
    }

    pub fn max_file_bytes(&self) -> usize {
        self.config.max_file_bytes
    }

    pub fn max_files_per_content(&self) -> i64 {
        self.config.max_files_per_content
    }

    fn allowed(&self, kind: UploadKind) -> &[String] {
        match kind {
            UploadKind::Image => &self.config.image_extensions,
            UploadKind::Attachment => &self.config.file_extensions,
        }
    }

    /// Validates and writes one file. Images are decoded before they are
    /// accepted; JPEG and PNG are re-encoded as WebP when enabled.
    pub async fn save(
        &self,
        category: &str,
        kind: UploadKind,
        original_name: &str,
        data: Vec<u8>,
    ) -> Result<StoredFile, UploadError> {
        if !is_safe_segment(category) {
            return Err(UploadError::InvalidPath);
        }
        if data.is_empty() {
            return Err(UploadError::Empty);
        }
        if data.len() > self.config.max_file_bytes {
            return Err(UploadError::TooLarge {
                limit: self.config.max_file_bytes,
            });
        }
        let original_name = sanitize_file_name(original_name);
        let extension = extension_of(&original_name)
            .ok_or_else(|| UploadError::ExtensionNotAllowed(String::new()))?;
        if !self.allowed(kind).iter().any(|allowed| *allowed == extension) {
            return Err(UploadError::ExtensionNotAllowed(extension));
        }

        let (data, extension) = if is_image_extension(&extension) {
            let convert = self.config.convert_to_webp && matches!(extension.as_str(), "jpg" | "jpeg" | "png");
            let quality = self.config.webp_quality;
            tokio::task::spawn_blocking(move || prepare_image(data, extension, convert, quality))
                .await
                .map_err(|err| UploadError::InvalidImage(err.to_string()))??
        } else {
            (data, extension)
        };

        let now = Utc::now();
        let relative = format!(
            "{category}/{}/{}.{extension}",
            now.format("%Y/%m"),
            Uuid::now_v7()
        );
        let target = self.root().join(&relative);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, &data).await?;
        tracing::info!(
            event = "upload_stored",
            path = %relative,
            size = data.len(),
            "File stored"
        );
        Ok(StoredFile {
            original_name,
            stored_path: relative,
            mime_type: mime_for(&extension).to_string(),
            size_bytes: i64::try_from(data.len()).unwrap_or(i64::MAX),
        })
    }

    /// Missing files are not an error.
    pub async fn remove(&self, stored_path: &str) -> Result<(), UploadError> {
        let path = self.resolve(stored_path)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(UploadError::Io(err)),
        }
    }

    pub fn resolve(&self, stored_path: &str) -> Result<PathBuf, UploadError> {
        let relative = Path::new(stored_path);
        let clean = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if stored_path.is_empty() || !clean {
            return Err(UploadError::InvalidPath);
        }
        Ok(self.root().join(relative))
    }
}

/// Reads a multipart field, stopping as soon as it grows past `limit`.
pub async fn read_field(
    mut field: Field<'_>,
    limit: usize,
) -> Result<(String, Vec<u8>), UploadError> {
    let name = field.file_name().unwrap_or("upload").to_string();
    let mut data = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|err| UploadError::Multipart(err.to_string()))?
    {
        if data.len() + chunk.len() > limit {
            return Err(UploadError::TooLarge { limit });
        }
        data.extend_from_slice(&chunk);
    }
    Ok((name, data))
}

fn prepare_image(
    data: Vec<u8>,
    extension: String,
    convert: bool,
    quality: f32,
) -> Result<(Vec<u8>, String), UploadError> {
    let image = image::ImageReader::new(Cursor::new(&data))
        .with_guessed_format()
        .map_err(|err| UploadError::InvalidImage(err.to_string()))?
        .decode()
        .map_err(|err| UploadError::InvalidImage(err.to_string()))?;
    if !convert {
        return Ok((data, extension));
    }
    let rgba = image.to_rgba8();
    let encoded = webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height()).encode(quality);
    Ok((encoded.to_vec(), "webp".to_string()))
}

fn is_safe_segment(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' || ch == '_')
}

fn is_image_extension(extension: &str) -> bool {
    matches!(extension, "jpg" | "jpeg" | "png" | "gif" | "webp")
}

fn extension_of(name: &str) -> Option<String> {
    let (stem, extension) = name.rsplit_once('.')?;
    if stem.is_empty() || extension.is_empty() {
        return None;
    }
    Some(extension.to_ascii_lowercase())
}

/// Keeps the last path segment and drops control and reserved characters.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter(|ch| !ch.is_control() && !matches!(ch, '<' | '>' | ':' | '"' | '|' | '?' | '*'))
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.chars().take(200).collect()
    }
}

pub fn mime_for(extension: &str) -> &'static str {
    match extension {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "hwp" => "application/x-hwp",
        "hwpx" => "application/hwp+zip",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "txt" => "text/plain",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}
