// src/lib.rs

//! Harvester for WordPress sites built on the `wp/v2` REST API.
//!
//! The crate downloads a site's structured content (posts, pages, media,
//! taxonomies, users, comments) into local JSON batches, then cross-links
//! the batches offline: hyperlinks, embedded images and translation links
//! inside rendered content are resolved back to the records they point at.

pub mod config;
pub mod error;
pub mod models;
pub mod parse;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
