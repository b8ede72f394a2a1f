// src/pipeline/extract.rs

//! Extraction: turn downloaded batches into cross-linked records.
//!
//! The pass loads every batch, registers the URLs all entity types answer
//! to, parses each post's rendered content, and resolves what it found
//! against the registry. Posts are exported with the derived fields inlined
//! next to the original ones; the remaining types are exported as loaded.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::models::{
    EntityKind, Link, LinkRegistry, MediaUse, ResolvableLink, ResolvableMediaUse,
    TranslationLink, WpObject,
};
use crate::parse::{
    LangPicker, MirrorMap, ParsedContent, default_pickers, extract_translations, parse_content,
};
use crate::pipeline::resolve::{resolve_images, resolve_links};
use crate::storage::LocalStorage;
use crate::utils::{extract_locale, normalize_lang_tag};

/// A post enriched with everything extraction derived from it.
#[derive(Debug, Clone)]
pub struct PostRecord {
    pub id: i64,
    pub link: String,
    /// The API record as downloaded.
    pub data: WpObject,
    /// Language tag from the permalink, or failing that from the page's
    /// language picker.
    pub language: Option<String>,
    pub links: Vec<ResolvableLink>,
    pub external_links: Vec<Link>,
    pub images: Vec<ResolvableMediaUse>,
    pub external_images: Vec<MediaUse>,
    pub embeds: Vec<String>,
    pub text: String,
    pub translations: Vec<TranslationLink>,
}

impl PostRecord {
    /// The original record with the derived fields inlined next to it.
    pub fn to_export(&self) -> Result<Value> {
        let mut map = self.data.0.clone();
        map.insert("language".to_string(), serde_json::to_value(&self.language)?);
        map.insert("links".to_string(), serde_json::to_value(&self.links)?);
        map.insert(
            "external_links".to_string(),
            serde_json::to_value(&self.external_links)?,
        );
        map.insert("images".to_string(), serde_json::to_value(&self.images)?);
        map.insert(
            "external_images".to_string(),
            serde_json::to_value(&self.external_images)?,
        );
        map.insert("embeds".to_string(), serde_json::to_value(&self.embeds)?);
        map.insert("text".to_string(), serde_json::to_value(&self.text)?);
        map.insert(
            "translations".to_string(),
            serde_json::to_value(&self.translations)?,
        );
        Ok(Value::Object(map))
    }
}

/// Make the translation graph undirected.
///
/// Language pickers routinely list translations on one side only. When post
/// A links to B but B carries no link back to A, B gets an unresolved link
/// to A's permalink in A's language; a later resolution pass binds it.
pub fn ensure_symmetric_translations(posts: &mut [PostRecord]) {
    let index: HashMap<i64, usize> = posts
        .iter()
        .enumerate()
        .map(|(position, post)| (post.id, position))
        .collect();

    let mut missing = Vec::new();
    for post in posts.iter() {
        for translation in &post.translations {
            let Some(destination) = &translation.destination else {
                if let Some(href) = &translation.href {
                    log::debug!("Skipping unresolved translation link \"{href}\"");
                }
                continue;
            };
            // Targets outside the batch (deleted posts, pages) are left alone.
            let Some(&target) = index.get(&destination.idx) else {
                continue;
            };
            let back_edge = posts[target]
                .translations
                .iter()
                .any(|back| back.destination.as_ref().is_some_and(|d| d.idx == post.id));
            if !back_edge {
                let lang = post.language.clone().unwrap_or_default();
                missing.push((target, TranslationLink::new(post.link.clone(), lang)));
            }
        }
    }

    for (target, link) in missing {
        posts[target].translations.push(link);
    }
}

/// Runs the extraction pass over a directory of downloaded batches.
pub struct WpExtractor {
    source: LocalStorage,
    output: LocalStorage,
    prefix: Option<String>,
    mirror: Option<MirrorMap>,
    pickers: Vec<Box<dyn LangPicker>>,
}

impl WpExtractor {
    pub fn new(
        json_dir: impl Into<PathBuf>,
        out_dir: impl Into<PathBuf>,
        prefix: Option<String>,
        mirror: Option<MirrorMap>,
    ) -> Self {
        Self {
            source: LocalStorage::new(json_dir),
            output: LocalStorage::new(out_dir),
            prefix,
            mirror,
            pickers: default_pickers(),
        }
    }

    pub async fn extract(&self) -> Result<()> {
        let mut registry = LinkRegistry::new();

        let media = self.load_batch(EntityKind::Media).await?;
        register(&mut registry, EntityKind::Media, &media)?;
        let posts = self.load_batch(EntityKind::Post).await?;
        register(&mut registry, EntityKind::Post, &posts)?;
        let pages = self.load_batch(EntityKind::Page).await?;
        register(&mut registry, EntityKind::Page, &pages)?;
        let tags = self.load_batch(EntityKind::Tag).await?;
        register(&mut registry, EntityKind::Tag, &tags)?;
        let categories = self.load_batch(EntityKind::Category).await?;
        register(&mut registry, EntityKind::Category, &categories)?;
        // Users are passed through untouched; their archive URLs are never
        // link targets in practice.
        let users = self.load_batch(EntityKind::User).await?;

        log::info!("Registered {} link targets", registry.links().len());

        let mut records = self.build_records(posts)?;
        log::info!("Parsed {} posts", records.len());

        for record in &mut records {
            resolve_links(&registry, &mut record.links);
            resolve_images(&registry, &mut record.images);
            resolve_links(&registry, &mut record.translations);
        }
        ensure_symmetric_translations(&mut records);
        for record in &mut records {
            resolve_links(&registry, &mut record.translations);
        }

        let enriched: Vec<Value> = records
            .iter()
            .map(PostRecord::to_export)
            .collect::<Result<_>>()?;
        self.write_batch(EntityKind::Post, &enriched).await?;
        self.write_batch(EntityKind::Page, &pages).await?;
        self.write_batch(EntityKind::Media, &media).await?;
        self.write_batch(EntityKind::Tag, &tags).await?;
        self.write_batch(EntityKind::Category, &categories).await?;
        self.write_batch(EntityKind::User, &users).await?;

        log::info!("Exported {} enriched posts", records.len());
        Ok(())
    }

    async fn load_batch(&self, kind: EntityKind) -> Result<Vec<WpObject>> {
        let key = kind.file_name(self.prefix.as_deref());
        match self.source.read_json(&key).await? {
            Some(batch) => Ok(batch),
            None => {
                log::warn!("No {key} in the input directory, assuming no {}", kind.slug());
                Ok(Vec::new())
            }
        }
    }

    async fn write_batch<T: Serialize>(&self, kind: EntityKind, batch: &[T]) -> Result<()> {
        let key = kind.file_name(self.prefix.as_deref());
        self.output.write_json(&key, batch).await
    }

    /// Parse every post's content and gather its translation links.
    fn build_records(&self, posts: Vec<WpObject>) -> Result<Vec<PostRecord>> {
        let mut records = Vec::with_capacity(posts.len());
        for post in posts {
            let (Some(id), Some(link)) = (post.id(), post.get_str("link").map(str::to_string))
            else {
                log::warn!("Skipping a post without id or link");
                continue;
            };

            let html = post
                .get("content")
                .and_then(|content| content.get("rendered"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            let content = match parse_content(&link, html) {
                Ok(content) => content,
                Err(err) => {
                    log::warn!("Could not parse content of {link}: {err}");
                    ParsedContent::default()
                }
            };

            let mut language = extract_locale(&link);
            let mut translations = Vec::new();
            if let Some(mirror) = &self.mirror {
                match mirror.load_page(&link) {
                    Ok(Some(doc)) => {
                        if let Some(found) = extract_translations(&doc, &link, &self.pickers) {
                            if language.is_none() {
                                language = found.lang.as_deref().map(normalize_lang_tag);
                            }
                            translations = found.links;
                        }
                    }
                    Ok(None) => log::debug!("No mirrored page for {link}"),
                    Err(err) => log::warn!("Could not read the mirrored page for {link}: {err}"),
                }
            }

            records.push(PostRecord {
                id,
                link,
                data: post,
                language,
                links: content.links,
                external_links: content.external_links,
                images: content.images,
                external_images: content.external_images,
                embeds: content.embeds,
                text: content.text,
                translations,
            });
        }
        Ok(records)
    }
}

/// Register one batch's URLs under the kind's singular label.
fn register(registry: &mut LinkRegistry, kind: EntityKind, batch: &[WpObject]) -> Result<()> {
    let mut urls = Vec::new();
    let mut idxes = Vec::new();
    for entry in batch {
        if let (Some(url), Some(id)) = (entry.url(kind), entry.id()) {
            urls.push(url.to_string());
            idxes.push(id);
        }
    }
    registry.add_linkables(kind.label(), urls, idxes)
}
