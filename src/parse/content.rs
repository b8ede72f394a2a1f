// src/parse/content.rs

//! Rendered-content parsing.
//!
//! Splits a WordPress `content.rendered` HTML fragment into the pieces the
//! resolver works on: hyperlinks and images partitioned into on-site
//! (resolvable) and off-site ones, embed URLs, and the visible text.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::models::{Link, MediaUse, ResolvableLink, ResolvableMediaUse};
use crate::utils::{resolve_url, same_host, squash_whitespace};

static ANCHORS: LazyLock<Selector> = LazyLock::new(|| selector("a"));
static IMAGES: LazyLock<Selector> = LazyLock::new(|| selector("img"));
static IFRAMES: LazyLock<Selector> = LazyLock::new(|| selector("iframe"));
static FIGCAPTION: LazyLock<Selector> = LazyLock::new(|| selector("figcaption"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("Failed to parse selector")
}

/// Everything extracted from one rendered HTML fragment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedContent {
    /// On-site hyperlinks, candidates for resolution.
    pub links: Vec<ResolvableLink>,
    /// Off-site hyperlinks, kept as written.
    pub external_links: Vec<Link>,
    /// On-site images, candidates for resolution.
    pub images: Vec<ResolvableMediaUse>,
    /// Off-site images.
    pub external_images: Vec<MediaUse>,
    /// `iframe` sources.
    pub embeds: Vec<String>,
    /// Visible text with paragraph and line-break boundaries preserved.
    pub text: String,
}

/// Parse a rendered HTML fragment belonging to the entity at `self_link`.
///
/// Relative URLs are absolutized against `self_link`; a link or image is
/// on-site when its absolutized URL shares the entity's host.
pub fn parse_content(self_link: &str, html: &str) -> crate::error::Result<ParsedContent> {
    let base = Url::parse(self_link)?;
    let doc = Html::parse_fragment(html);
    let mut parsed = ParsedContent::default();

    for anchor in doc.select(&ANCHORS) {
        let text = element_text(anchor);
        let text = (!text.is_empty()).then_some(text);
        let Some(href) = anchor.value().attr("href") else {
            parsed.external_links.push(Link { text, href: None });
            continue;
        };

        match base.join(href) {
            Ok(absolute) if same_host(&base, &absolute) => {
                parsed
                    .links
                    .push(ResolvableLink::new(text, Some(absolute.to_string())));
            }
            // Off-site links keep the href exactly as written.
            _ => parsed.external_links.push(Link {
                text,
                href: Some(href.to_string()),
            }),
        }
    }

    for image in doc.select(&IMAGES) {
        let alt = image.value().attr("alt").map(str::to_string);
        let caption = figure_caption(image);
        let Some(src) = image.value().attr("src") else {
            log::warn!("Image without source in {self_link}");
            parsed.external_images.push(MediaUse {
                src: String::new(),
                alt,
                caption,
            });
            continue;
        };

        let src = resolve_url(&base, src);
        match Url::parse(&src) {
            Ok(absolute) if same_host(&base, &absolute) => {
                parsed
                    .images
                    .push(ResolvableMediaUse::new(src, alt, caption));
            }
            _ => parsed.external_images.push(MediaUse { src, alt, caption }),
        }
    }

    for iframe in doc.select(&IFRAMES) {
        if let Some(src) = iframe.value().attr("src") {
            parsed.embeds.push(resolve_url(&base, src));
        }
    }

    let mut text = String::new();
    collect_text(doc.root_element(), &mut text);
    parsed.text = squash_whitespace(&text);

    Ok(parsed)
}

/// Squashed text content of one element.
fn element_text(element: ElementRef<'_>) -> String {
    squash_whitespace(&element.text().collect::<String>())
}

/// Caption of the `<figure>` enclosing `image`, if there is one.
fn figure_caption(image: ElementRef<'_>) -> Option<String> {
    let figure = image
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "figure")?;
    let caption = figure.select(&FIGCAPTION).next()?;
    Some(element_text(caption))
}

/// Visible text of a subtree: `<br>` and paragraph ends become newlines,
/// `<figcaption>` contents are left out (they belong to their image).
fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            match child_el.value().name() {
                "figcaption" => {}
                "br" => out.push('\n'),
                name => {
                    collect_text(child_el, out);
                    if name == "p" {
                        out.push('\n');
                    }
                }
            }
        } else if let Some(text) = child.value().as_text() {
            out.push_str(text);
        }
    }
}
