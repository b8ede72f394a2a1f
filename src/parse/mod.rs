//! HTML parsing: rendered content, language switchers and mirrored pages.

pub mod content;
pub mod lang;
pub mod mirror;

pub use content::{ParsedContent, parse_content};
pub use lang::{
    LangPicker, PageTranslations, PolylangCustomDropdown, PolylangWidget, default_pickers,
    extract_translations,
};
pub use mirror::MirrorMap;
