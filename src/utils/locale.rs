// src/utils/locale.rs

//! Language-tag detection for site URLs.
//!
//! Multilingual WordPress sites usually carry the page language as the first
//! path segment (`/fr/some-post/`). These helpers tell plausible language
//! tags apart from ordinary path segments and normalize their casing.

use url::Url;

/// Path segments that look like language tags but never are.
const EXCLUDED_TAGS: &[&str] = &["tag"];

/// Whether `tag` is shaped like a language tag: a two or three letter
/// primary subtag, optionally followed by one two-to-four letter subtag
/// (`fr`, `en-US`, `zh-Hant`).
pub fn is_lang_tag(tag: &str) -> bool {
    let mut parts = tag.split('-');
    let primary = match parts.next() {
        Some(primary) => primary,
        None => return false,
    };
    if !(2..=3).contains(&primary.len()) || !primary.chars().all(|c| c.is_ascii_alphabetic()) {
        return false;
    }

    match (parts.next(), parts.next()) {
        (None, _) => true,
        (Some(suffix), None) => {
            (2..=4).contains(&suffix.len()) && suffix.chars().all(|c| c.is_ascii_alphabetic())
        }
        _ => false,
    }
}

/// Normalize the casing of a language tag: lowercase primary subtag,
/// uppercase two-letter regions and titlecase four-letter scripts
/// (`FR-fr` becomes `fr-FR`, `ZH-hant` becomes `zh-Hant`).
pub fn normalize_lang_tag(tag: &str) -> String {
    let mut parts = tag.split('-');
    let mut normalized = match parts.next() {
        Some(primary) => primary.to_ascii_lowercase(),
        None => return String::new(),
    };

    for part in parts {
        normalized.push('-');
        match part.len() {
            2 => normalized.push_str(&part.to_ascii_uppercase()),
            4 => {
                let mut chars = part.chars();
                if let Some(first) = chars.next() {
                    normalized.push(first.to_ascii_uppercase());
                    normalized.push_str(&chars.as_str().to_ascii_lowercase());
                }
            }
            _ => normalized.push_str(&part.to_ascii_lowercase()),
        }
    }

    normalized
}

/// Extract the normalized language tag from the first path segment of
/// `link`, if that segment is shaped like one.
pub fn extract_locale(link: &str) -> Option<String> {
    let url = Url::parse(link).ok()?;
    let first = url.path().split('/').find(|part| !part.is_empty())?;
    if EXCLUDED_TAGS.contains(&first) || !is_lang_tag(first) {
        return None;
    }
    Some(normalize_lang_tag(first))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_lang_tag() {
        assert!(is_lang_tag("fr"));
        assert!(is_lang_tag("fil"));
        assert!(is_lang_tag("en-US"));
        assert!(is_lang_tag("zh-Hant"));
        assert!(!is_lang_tag("x"));
        assert!(!is_lang_tag("english"));
        assert!(!is_lang_tag("en_US"));
        assert!(!is_lang_tag("en-"));
        assert!(!is_lang_tag("en-US-x"));
    }

    #[test]
    fn test_normalize_lang_tag() {
        assert_eq!(normalize_lang_tag("EN"), "en");
        assert_eq!(normalize_lang_tag("FR-fr"), "fr-FR");
        assert_eq!(normalize_lang_tag("ZH-hant"), "zh-Hant");
        assert_eq!(normalize_lang_tag("en-US"), "en-US");
    }

    #[test]
    fn test_extract_locale() {
        assert_eq!(
            extract_locale("https://example.org/fr/some-post/"),
            Some("fr".to_string())
        );
        assert_eq!(
            extract_locale("https://example.org/en-us/about/"),
            Some("en-US".to_string())
        );
        assert_eq!(extract_locale("https://example.org/blog/some-post/"), None);
        assert_eq!(extract_locale("https://example.org/"), None);
    }

    #[test]
    fn test_extract_locale_skips_excluded_segments() {
        assert_eq!(extract_locale("https://example.org/tag/news/"), None);
    }
}
