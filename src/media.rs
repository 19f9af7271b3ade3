// src/media.rs
//! Copies chosen images into host media storage.

use crate::api::PixabayHttpClient;
use crate::constants::MEDIA_FILE_PREFIX;
use crate::error::AppError;
use crate::pipeline::MediaStore;
use crate::query::SearchQuery;
use crate::types::ValidatedUrl;
use std::path::PathBuf;

/// Downloaded image bytes with the content type the server reported.
#[derive(Debug, Clone)]
pub struct DownloadedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// The ability to fetch an image by URL.
#[async_trait::async_trait]
pub trait ImageDownloader: Send + Sync {
    async fn download(&self, url: &ValidatedUrl) -> Result<DownloadedImage, AppError>;
}

#[async_trait::async_trait]
impl ImageDownloader for PixabayHttpClient {
    async fn download(&self, url: &ValidatedUrl) -> Result<DownloadedImage, AppError> {
        let (bytes, content_type) = self.fetch_bytes(url).await?;
        Ok(DownloadedImage {
            bytes,
            content_type,
        })
    }
}

/// File extension for a downloaded image.
///
/// Decided from the content type; falls back to the URL's extension, then
/// to `jpg`.
pub fn extension_for(content_type: &str, url: &ValidatedUrl) -> &'static str {
    let content_type = content_type.to_ascii_lowercase();
    if content_type.contains("png") {
        return "png";
    }
    if content_type.contains("gif") {
        return "gif";
    }
    if content_type.contains("jpeg") || content_type.contains("jpg") {
        return "jpg";
    }
    let path = url.as_url().path().to_ascii_lowercase();
    match path.rsplit_once('.').map(|(_, ext)| ext) {
        Some("png") => "png",
        Some("gif") => "gif",
        Some("svg") => "svg",
        Some("webp") => "webp",
        _ => "jpg",
    }
}

/// Builds `cardpix_<query>_<8 hex>.<ext>`, replacing anything that is not
/// alphanumeric in the query with `_`.
pub fn media_file_name(query: &SearchQuery, extension: &str) -> String {
    let safe: String = query
        .as_str()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    let unique = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}_{}.{}", MEDIA_FILE_PREFIX, safe, &unique[..8], extension)
}

/// Downloads the image at `url` and stores it, returning the stored name.
pub async fn copy_to_media(
    downloader: &dyn ImageDownloader,
    store: &dyn MediaStore,
    url: &ValidatedUrl,
    query: &SearchQuery,
) -> Result<String, AppError> {
    let image = downloader.download(url).await?;
    if image.bytes.is_empty() {
        return Err(AppError::Media(format!("empty download from {}", url)));
    }
    let name = media_file_name(query, extension_for(&image.content_type, url));
    let stored = store.store(&name, image.bytes).await?;
    log::info!("Saved image as {}", stored);
    Ok(stored)
}

/// Media store writing files into a directory.
#[derive(Debug, Clone)]
pub struct DirectoryMediaStore {
    dir: PathBuf,
}

impl DirectoryMediaStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }
}

#[async_trait::async_trait]
impl MediaStore for DirectoryMediaStore {
    async fn store(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, AppError> {
        if file_name.contains(['/', '\\']) || file_name.starts_with('.') {
            return Err(AppError::Media(format!("refusing file name '{}'", file_name)));
        }
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(file_name);
        log::debug!("Writing {} bytes to {}", bytes.len(), path.display());
        tokio::fs::write(&path, bytes).await?;
        Ok(file_name.to_string())
    }
}
