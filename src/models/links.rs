// src/models/links.rs

//! Link data types and the registry of known site URLs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::utils::normalize_lang_tag;

/// An item which can be linked to.
///
/// `data_type` identifies the owning collection and `idx` the record within
/// it. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Linkable {
    pub link: String,
    pub data_type: String,
    pub idx: i64,
}

impl Linkable {
    pub fn new(link: impl Into<String>, data_type: impl Into<String>, idx: i64) -> Self {
        Self {
            link: link.into(),
            data_type: data_type.into(),
            idx,
        }
    }
}

/// A raw hyperlink scraped from content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub text: Option<String>,
    pub href: Option<String>,
}

/// A hyperlink that can be matched against known site URLs.
///
/// `destination` starts empty and is set at most once by the resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvableLink {
    pub text: Option<String>,
    pub href: Option<String>,
    pub destination: Option<Linkable>,
}

impl ResolvableLink {
    pub fn new(text: Option<String>, href: Option<String>) -> Self {
        Self {
            text,
            href,
            destination: None,
        }
    }
}

/// A link to an alternative version of a post in a different language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationLink {
    pub text: Option<String>,
    pub href: Option<String>,
    pub destination: Option<Linkable>,
    /// Raw language code as found in the page.
    pub lang: String,
}

impl TranslationLink {
    pub fn new(href: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            text: None,
            href: Some(href.into()),
            destination: None,
            lang: lang.into(),
        }
    }

    /// Case-normalized language tag, e.g. `EN-gb` becomes `en-GB`.
    pub fn language(&self) -> String {
        normalize_lang_tag(&self.lang)
    }
}

/// An instance of media being used in content.
///
/// Used for images known to be off-site, which can never resolve to a local
/// record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaUse {
    pub src: String,
    pub alt: Option<String>,
    pub caption: Option<String>,
}

/// A media use that can be resolved against known media records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvableMediaUse {
    pub src: String,
    pub alt: Option<String>,
    pub caption: Option<String>,
    pub destination: Option<Linkable>,
}

impl ResolvableMediaUse {
    pub fn new(src: impl Into<String>, alt: Option<String>, caption: Option<String>) -> Self {
        Self {
            src: src.into(),
            alt,
            caption,
            destination: None,
        }
    }
}

/// A collection of all known links on the site.
///
/// Populated in batches, one per entity type, then queried read-only during
/// resolution. Lookups are exact string matches on the canonical URL; all
/// normalization is the resolver's job.
#[derive(Debug, Default)]
pub struct LinkRegistry {
    links: Vec<Linkable>,
    url_index: HashMap<String, usize>,
}

impl LinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All registered linkables, in insertion order.
    pub fn links(&self) -> &[Linkable] {
        &self.links
    }

    /// Add a single linkable item and refresh the lookup cache.
    pub fn add_linkable(&mut self, url: impl Into<String>, data_type: impl Into<String>, idx: i64) {
        self.push(url.into(), data_type.into(), idx);
        self.refresh_cache();
    }

    /// Add one batch of linkables sharing a data type.
    ///
    /// The lookup cache is rebuilt once after the whole batch. `urls` and
    /// `idxes` must have the same length.
    pub fn add_linkables(&mut self, data_type: &str, urls: Vec<String>, idxes: Vec<i64>) -> Result<()> {
        if urls.len() != idxes.len() {
            return Err(AppError::validation(format!(
                "Links and idxes must be same length ({} != {})",
                urls.len(),
                idxes.len()
            )));
        }

        for (url, idx) in urls.into_iter().zip(idxes) {
            self.push(url, data_type.to_string(), idx);
        }
        self.refresh_cache();
        Ok(())
    }

    /// Find a linkable item by URL. Returns `None` if no URL matches.
    pub fn query_link(&self, href: &str) -> Option<&Linkable> {
        self.url_index.get(href).map(|&i| &self.links[i])
    }

    fn push(&mut self, link: String, data_type: String, idx: i64) {
        self.links.push(Linkable {
            link,
            data_type,
            idx,
        });
    }

    fn refresh_cache(&mut self) {
        self.url_index.clear();
        for (i, linkable) in self.links.iter().enumerate() {
            self.url_index.insert(linkable.link.clone(), i);
        }
    }
}
