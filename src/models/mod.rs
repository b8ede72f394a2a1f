// src/models/mod.rs

//! Domain models for the harvester.
//!
//! Data structures shared across the download and extract sides, organized
//! by their primary purpose.

mod links;
mod object;
mod window;

// Re-export all public types
pub use links::{
    Link, LinkRegistry, Linkable, MediaUse, ResolvableLink, ResolvableMediaUse, TranslationLink,
};
pub use object::{EntityKind, WpObject};
pub use window::CrawlWindow;
