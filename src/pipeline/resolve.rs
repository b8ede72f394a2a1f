// src/pipeline/resolve.rs

//! Link resolution against the registry.
//!
//! Resolution mutates links in place and is idempotent: once a destination
//! is set it is never overwritten, so repeated passes are safe. Lookups are
//! exact; the two miss heuristics (preview-parameter stripping and category
//! removal) only rewrite the URL used for lookup, never the link itself.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::models::{LinkRegistry, Linkable, ResolvableLink, ResolvableMediaUse, TranslationLink};

/// Dimension suffix WordPress appends to scaled image copies
/// (`photo-300x200.jpg` for `photo.jpg`).
static DIMENSION_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-\d{3,4}x\d{3,4}\.").expect("Failed to build dimension pattern"));

/// Anything with an href that can be pointed at a known entity.
pub trait Resolvable {
    fn href(&self) -> Option<&str>;
    fn destination(&self) -> Option<&Linkable>;
    fn set_destination(&mut self, destination: Linkable);
}

impl Resolvable for ResolvableLink {
    fn href(&self) -> Option<&str> {
        self.href.as_deref()
    }

    fn destination(&self) -> Option<&Linkable> {
        self.destination.as_ref()
    }

    fn set_destination(&mut self, destination: Linkable) {
        self.destination = Some(destination);
    }
}

impl Resolvable for TranslationLink {
    fn href(&self) -> Option<&str> {
        self.href.as_deref()
    }

    fn destination(&self) -> Option<&Linkable> {
        self.destination.as_ref()
    }

    fn set_destination(&mut self, destination: Linkable) {
        self.destination = Some(destination);
    }
}

/// Point `link` at the registry entry its href names, if one exists.
///
/// Misses are a valid terminal state: the link keeps `destination = None`
/// and the miss is logged at debug level.
pub fn resolve_link<T: Resolvable>(registry: &LinkRegistry, link: &mut T) {
    if link.destination().is_some() {
        return;
    }
    let Some(href) = link.href().map(str::to_string) else {
        return;
    };

    // Preview URLs differ from the canonical URL only in their preview
    // parameters, so the whole query goes.
    let lookup = strip_preview_query(&href).unwrap_or_else(|| href.clone());

    if let Some(linkable) = registry.query_link(&lookup) {
        link.set_destination(linkable.clone());
        return;
    }

    if let Some(shortened) = remove_category(&lookup) {
        if let Some(linkable) = registry.query_link(&shortened) {
            link.set_destination(linkable.clone());
            return;
        }
        log::debug!("Could not resolve with category removal heuristic: \"{shortened}\"");
    }

    log::debug!("Could not resolve link \"{href}\"");
}

/// Resolve every link of a batch.
pub fn resolve_links<T: Resolvable>(registry: &LinkRegistry, links: &mut [T]) {
    for link in links {
        resolve_link(registry, link);
    }
}

/// Drop the query string when it carries a `preview_id` parameter.
fn strip_preview_query(href: &str) -> Option<String> {
    let mut url = Url::parse(href).ok()?;
    if !url.query().is_some_and(|query| query.contains("preview_id")) {
        return None;
    }
    url.set_query(None);
    Some(url.to_string())
}

/// Rewrite a permalink as if its category segment were absent.
///
/// Permalinks shaped `/{category}/{slug}/`, optionally behind a
/// two-character language segment, are common; registry URLs omit the
/// category. Returns the shortened URL or `None` when the path has a
/// different shape.
fn remove_category(url: &str) -> Option<String> {
    let mut parsed = Url::parse(url).ok()?;
    let trimmed = parsed.path().trim_matches('/').to_string();
    if trimmed.is_empty() {
        return None;
    }

    let mut parts: Vec<&str> = trimmed.split('/').collect();
    let mut lang = None;
    if parts.len() == 3 && parts[0].chars().count() == 2 {
        lang = Some(parts.remove(0));
    }
    if parts.len() != 2 {
        return None;
    }
    parts.remove(0);
    if let Some(lang) = lang {
        parts.insert(0, lang);
    }

    parsed.set_path(&format!("/{}/", parts.join("/")));
    Some(parsed.to_string())
}

/// Point an image use at the media record it was scaled from.
///
/// Only uploads (URLs carrying `wp-content`) are eligible; other images
/// never get a lookup.
pub fn resolve_image(registry: &LinkRegistry, image: &mut ResolvableMediaUse) {
    if image.destination.is_some() {
        return;
    }
    if !image.src.contains("wp-content") {
        return;
    }

    let lookup = DIMENSION_SUFFIX.replace_all(&image.src, ".");
    match registry.query_link(&lookup) {
        Some(linkable) => image.destination = Some(linkable.clone()),
        None => log::debug!("Could not resolve image \"{}\"", image.src),
    }
}

/// Resolve every image of a batch.
pub fn resolve_images(registry: &LinkRegistry, images: &mut [ResolvableMediaUse]) {
    for image in images {
        resolve_image(registry, image);
    }
}
