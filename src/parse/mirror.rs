// src/parse/mirror.rs

//! Mirrored-page lookup.
//!
//! A site mirror is a directory of saved HTML files whose layout on disk is
//! the mirroring tool's business. The map ignores file names entirely and
//! indexes every page by the URL it reports for itself.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use scraper::{Html, Selector};

use crate::error::Result;

static CANONICAL: LazyLock<Selector> = LazyLock::new(|| selector("link[rel=\"canonical\"]"));
static OG_URL: LazyLock<Selector> = LazyLock::new(|| selector("meta[property=\"og:url\"]"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("Failed to parse selector")
}

/// URL → file index over a directory of mirrored pages.
#[derive(Debug, Default)]
pub struct MirrorMap {
    pages: HashMap<String, PathBuf>,
}

impl MirrorMap {
    /// Scan `root` recursively for `*.html` files and index each one by its
    /// self-reported URL. Pages reporting no URL are skipped.
    pub fn build(root: &Path) -> Result<Self> {
        let mut files = Vec::new();
        collect_html_files(root, &mut files)?;

        let mut pages = HashMap::new();
        for path in files {
            let html = std::fs::read_to_string(&path)?;
            let doc = Html::parse_document(&html);
            match self_url(&doc) {
                Some(url) => {
                    pages.insert(url, path);
                }
                None => log::debug!("No self URL in mirrored page {}, skipping", path.display()),
            }
        }

        Ok(Self { pages })
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Parse the mirrored page stored for `url`, if one is known.
    pub fn load_page(&self, url: &str) -> Result<Option<Html>> {
        let Some(path) = self.pages.get(url) else {
            return Ok(None);
        };
        let html = std::fs::read_to_string(path)?;
        Ok(Some(Html::parse_document(&html)))
    }
}

/// URL a page reports for itself: `rel=canonical` first, `og:url` second.
fn self_url(doc: &Html) -> Option<String> {
    if let Some(link) = doc.select(&CANONICAL).next() {
        if let Some(href) = link.value().attr("href") {
            return Some(href.to_string());
        }
    }
    doc.select(&OG_URL)
        .next()
        .and_then(|meta| meta.value().attr("content"))
        .map(str::to_string)
}

fn collect_html_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_html_files(&path, files)?;
        } else if path.extension().is_some_and(|ext| ext == "html") {
            files.push(path);
        }
    }
    Ok(())
}
