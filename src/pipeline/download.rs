// src/pipeline/download.rs

//! Site download: crawl every entity collection into JSON batches.
//!
//! One failed entity type never aborts the run; its error is logged and the
//! remaining types are still downloaded. Only a dead target or an unusable
//! API is fatal, since nothing useful could come out of continuing.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{CrawlWindow, EntityKind, WpObject};
use crate::services::{CrawlResult, RequestSession, WpApi};
use crate::storage::LocalStorage;

const SUMMARY_FILE: &str = "download-summary.json";

/// What to download and where to put it.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Site to harvest; scheme and trailing slash are normalized.
    pub target: String,
    /// Directory receiving one JSON batch per entity type.
    pub out_dir: PathBuf,
    /// Directory receiving media binaries; media files are skipped when unset.
    pub media_dest: Option<PathBuf>,
    /// Prefix for the batch file names.
    pub prefix: Option<String>,
    /// Entity types excluded from the run.
    pub skip: Vec<EntityKind>,
}

/// Result of downloading one entity type.
#[derive(Debug, Clone, Serialize)]
pub struct KindSummary {
    pub kind: String,
    pub entries: usize,
    pub truncated: bool,
}

/// Record of a whole download run, also written next to the batches.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadSummary {
    pub target: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// One entry per successfully downloaded entity type.
    pub kinds: Vec<KindSummary>,
    pub media_files: usize,
}

/// Downloads a site's API content into a local directory.
pub struct WpDownloader {
    api: WpApi,
    session: Arc<RequestSession>,
    storage: LocalStorage,
    media_storage: Option<LocalStorage>,
    prefix: Option<String>,
    skip: Vec<EntityKind>,
}

impl WpDownloader {
    pub fn new(options: DownloadOptions, session: Arc<RequestSession>) -> Self {
        let api = WpApi::new(&options.target, Arc::clone(&session));
        Self {
            api,
            session,
            storage: LocalStorage::new(options.out_dir),
            media_storage: options.media_dest.map(LocalStorage::new),
            prefix: options.prefix,
            skip: options.skip,
        }
    }

    /// Download every entity type that isn't skipped, then write a summary.
    pub async fn download(&self) -> Result<DownloadSummary> {
        let started_at = Utc::now();

        match self.session.get(self.api.base_url()).await {
            Ok(_) => log::info!("Connected successfully"),
            Err(err) => {
                log::error!("Failed to connect to the server");
                return Err(err);
            }
        }
        self.api.ensure_usable().await?;

        let mut kinds = Vec::new();
        let mut media_files = 0;
        for kind in EntityKind::ALL {
            if self.skip.contains(&kind) {
                log::debug!("Skipping {}", kind.display_name());
                continue;
            }
            match self.download_kind(kind).await {
                Ok(result) => {
                    if kind == EntityKind::Media {
                        if let Some(media_storage) = &self.media_storage {
                            media_files =
                                self.download_media_files(media_storage, &result.entries).await;
                        }
                    }
                    kinds.push(KindSummary {
                        kind: kind.slug().to_string(),
                        entries: result.entries.len(),
                        truncated: result.truncated,
                    });
                }
                Err(err) => log::error!("Failed to download {}: {err}", kind.display_name()),
            }
        }

        let summary = DownloadSummary {
            target: self.api.base_url().to_string(),
            started_at,
            finished_at: Utc::now(),
            kinds,
            media_files,
        };
        self.storage.write_json(SUMMARY_FILE, &summary).await?;
        Ok(summary)
    }

    /// Crawl one collection and export it as a JSON batch.
    async fn download_kind(&self, kind: EntityKind) -> Result<CrawlResult> {
        log::info!("Downloading {}", kind.display_name());
        let result = self.api.fetch(kind, CrawlWindow::everything()).await?;

        let key = kind.file_name(self.prefix.as_deref());
        self.storage.write_json(&key, &result.entries).await?;
        log::info!("Completed downloading {}", kind.display_name());
        Ok(result)
    }

    /// Fetch the binary behind each media record.
    ///
    /// Files land under the media directory at their URL path, so the layout
    /// mirrors the site's upload tree. Individual failures are logged and the
    /// file is dropped from the count.
    async fn download_media_files(
        &self,
        storage: &LocalStorage,
        entries: &[WpObject],
    ) -> usize {
        log::info!("Downloading {} media files", entries.len());
        let mut downloaded = 0;
        for entry in entries {
            let Some(source_url) = entry.url(EntityKind::Media) else {
                continue;
            };
            match self.fetch_media_file(storage, source_url).await {
                Ok(bytes) => {
                    log::debug!("Downloaded {source_url} ({bytes} bytes)");
                    downloaded += 1;
                }
                Err(err) => log::error!("Failed to download media file {source_url}: {err}"),
            }
        }
        log::info!("Downloaded {downloaded} of {} media files", entries.len());
        downloaded
    }

    async fn fetch_media_file(&self, storage: &LocalStorage, source_url: &str) -> Result<u64> {
        let response = self.session.get(source_url).await?;
        let key = media_key(source_url)?;
        storage.write_stream(&key, response.bytes_stream()).await
    }
}

/// Relative storage key for a media file, derived from its URL path.
fn media_key(source_url: &str) -> Result<String> {
    let url = Url::parse(source_url)?;
    let key = url.path().trim_start_matches('/').to_string();
    if key.is_empty() {
        return Err(AppError::validation(format!(
            "Media URL has no file path: {source_url}"
        )));
    }
    Ok(key)
}
