// src/pipeline/mod.rs

//! The two harvesting stages.
//!
//! - `download`: crawl a live site's REST API into JSON batches
//! - `extract`: cross-link previously downloaded batches offline
//!
//! `resolve` carries the registry lookups the extract stage leans on.

pub mod download;
pub mod extract;
pub mod resolve;

pub use download::{DownloadOptions, DownloadSummary, KindSummary, WpDownloader};
pub use extract::{PostRecord, WpExtractor, ensure_symmetric_translations};
pub use resolve::{Resolvable, resolve_image, resolve_images, resolve_link, resolve_links};
