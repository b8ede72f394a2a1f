//! Shared helper utilities.

pub mod locale;
pub mod text;
pub mod url;

pub use locale::{extract_locale, is_lang_tag, normalize_lang_tag};
pub use text::squash_whitespace;
pub use url::{normalize_target, resolve_url, same_host};
