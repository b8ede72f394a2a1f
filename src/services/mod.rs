//! Service layer for the harvester.
//!
//! - HTTP transport with retry and rate limiting (`RequestSession`)
//! - WordPress REST API client (`WpApi`)

mod api;
mod session;

pub use api::{CrawlResult, PageFetchOutcome, PageMeta, WpApi};
pub use session::RequestSession;
