// src/parse/lang.rs

//! Language-switcher scraping.
//!
//! Multilingual sites render a language picker somewhere in the page; its
//! markup depends on the plugin and theme. Each [`LangPicker`] knows one
//! layout: it claims a page by finding its root element, then reads the
//! page's own language and the links to the page's translations.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::models::TranslationLink;
use crate::utils::squash_whitespace;

static WIDGET_ROOT: LazyLock<Selector> = LazyLock::new(|| selector(".widget_polylang"));
static WIDGET_CURRENT: LazyLock<Selector> =
    LazyLock::new(|| selector(".lang-item.current-lang a"));
static WIDGET_OTHERS: LazyLock<Selector> =
    LazyLock::new(|| selector(".lang-item:not(.no-translation):not(.current-lang) a"));

static SWITCHER_ROOT: LazyLock<Selector> = LazyLock::new(|| selector(".header-lang_switcher"));
static SWITCHER_CURRENT: LazyLock<Selector> =
    LazyLock::new(|| selector(".current-lang-switcher"));
static SWITCHER_OTHERS: LazyLock<Selector> =
    LazyLock::new(|| selector(".lang-item:not(.no-translation) a"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("Failed to parse selector")
}

/// Language data read from one mirrored page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageTranslations {
    /// The page's own language tag, as the page declares it.
    pub lang: Option<String>,
    /// Links to the page's translations.
    pub links: Vec<TranslationLink>,
}

/// One known language-switcher layout.
pub trait LangPicker {
    /// Root element of this picker's layout, when the page uses it.
    fn get_root<'a>(&self, doc: &'a Html) -> Option<ElementRef<'a>>;

    /// Read the language data out of a claimed root.
    fn extract(&self, root: ElementRef<'_>) -> PageTranslations;
}

/// Polylang's stock sidebar widget.
pub struct PolylangWidget;

impl LangPicker for PolylangWidget {
    fn get_root<'a>(&self, doc: &'a Html) -> Option<ElementRef<'a>> {
        doc.select(&WIDGET_ROOT).next()
    }

    fn extract(&self, root: ElementRef<'_>) -> PageTranslations {
        let lang = root
            .select(&WIDGET_CURRENT)
            .next()
            .and_then(|anchor| anchor.value().attr("lang"))
            .map(str::to_string);
        PageTranslations {
            lang,
            links: translation_links(root, &WIDGET_OTHERS),
        }
    }
}

/// A themed header switcher that marks the current language with a separate
/// element instead of a list entry.
pub struct PolylangCustomDropdown;

impl LangPicker for PolylangCustomDropdown {
    fn get_root<'a>(&self, doc: &'a Html) -> Option<ElementRef<'a>> {
        doc.select(&SWITCHER_ROOT).next()
    }

    fn extract(&self, root: ElementRef<'_>) -> PageTranslations {
        let lang = root
            .select(&SWITCHER_CURRENT)
            .next()
            .map(|el| squash_whitespace(&el.text().collect::<String>()))
            .filter(|text| !text.is_empty());
        PageTranslations {
            lang,
            links: translation_links(root, &SWITCHER_OTHERS),
        }
    }
}

fn translation_links(root: ElementRef<'_>, links: &Selector) -> Vec<TranslationLink> {
    root.select(links)
        .filter_map(|anchor| {
            let href = anchor.value().attr("href")?;
            let lang = anchor.value().attr("lang")?;
            Some(TranslationLink::new(href, lang))
        })
        .collect()
}

/// The picker layouts known to this crate, in matching order.
pub fn default_pickers() -> Vec<Box<dyn LangPicker>> {
    vec![Box::new(PolylangWidget), Box::new(PolylangCustomDropdown)]
}

/// Try each picker in order; the first whose layout is present wins.
///
/// `link` only labels the debug log when nothing matches.
pub fn extract_translations(
    doc: &Html,
    link: &str,
    pickers: &[Box<dyn LangPicker>],
) -> Option<PageTranslations> {
    for picker in pickers {
        if let Some(root) = picker.get_root(doc) {
            return Some(picker.extract(root));
        }
    }
    log::debug!("No translation pickers matched \"{link}\", unable to extract translations.");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIDGET_PAGE: &str = r#"
        <html><body>
        <div class="widget widget_polylang">
            <ul>
                <li class="lang-item current-lang">
                    <a lang="en-US" href="https://example.org/hello/">English</a>
                </li>
                <li class="lang-item">
                    <a lang="fr-FR" href="https://example.org/fr/bonjour/">Français</a>
                </li>
                <li class="lang-item no-translation">
                    <a lang="de-DE" href="https://example.org/de/">Deutsch</a>
                </li>
            </ul>
        </div>
        </body></html>
    "#;

    const SWITCHER_PAGE: &str = r#"
        <html><body>
        <div class="header-lang_switcher">
            <span class="current-lang-switcher"> EN </span>
            <ul>
                <li class="lang-item">
                    <a lang="fr" href="https://example.org/fr/bonjour/">FR</a>
                </li>
                <li class="lang-item no-translation">
                    <a lang="de" href="https://example.org/de/">DE</a>
                </li>
            </ul>
        </div>
        </body></html>
    "#;

    #[test]
    fn test_widget_picker() {
        let doc = Html::parse_document(WIDGET_PAGE);
        let translations =
            extract_translations(&doc, "https://example.org/hello/", &default_pickers()).unwrap();

        assert_eq!(translations.lang.as_deref(), Some("en-US"));
        assert_eq!(translations.links.len(), 1);
        assert_eq!(translations.links[0].lang, "fr-FR");
        assert_eq!(
            translations.links[0].href.as_deref(),
            Some("https://example.org/fr/bonjour/")
        );
        assert_eq!(translations.links[0].language(), "fr-FR");
    }

    #[test]
    fn test_switcher_picker() {
        let doc = Html::parse_document(SWITCHER_PAGE);
        let translations =
            extract_translations(&doc, "https://example.org/hello/", &default_pickers()).unwrap();

        assert_eq!(translations.lang.as_deref(), Some("EN"));
        assert_eq!(translations.links.len(), 1);
        assert_eq!(translations.links[0].lang, "fr");
    }

    #[test]
    fn test_no_picker_matches() {
        let doc = Html::parse_document("<html><body><p>Nothing here</p></body></html>");
        assert!(extract_translations(&doc, "https://example.org/", &default_pickers()).is_none());
    }
}
