// src/models/object.rs

//! Weakly-typed WordPress API records and the entity kinds that produce them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AppError;

/// A record returned by the WordPress REST API.
///
/// Field sets vary between sites, versions and plugin stacks, so records are
/// kept as opaque JSON maps. Only the `id` field and the kind's URL-bearing
/// field are ever interpreted; everything else passes through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WpObject(pub Map<String, Value>);

impl WpObject {
    /// The record's numeric `id`, if present.
    pub fn id(&self) -> Option<i64> {
        self.0.get("id").and_then(Value::as_i64)
    }

    /// Look up an arbitrary field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Look up a string field.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// The canonical URL of this record for the given kind.
    ///
    /// Media records expose `source_url` (the uploaded file), everything else
    /// a `link` permalink.
    pub fn url(&self, kind: EntityKind) -> Option<&str> {
        self.get_str(kind.link_field())
    }

    /// Insert or replace a field, returning the previous value if any.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }
}

impl From<Map<String, Value>> for WpObject {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// The entity collections exposed under the `wp/v2` REST namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    User,
    Tag,
    Category,
    Post,
    Page,
    Comment,
    Media,
}

impl EntityKind {
    /// All kinds, in download order.
    pub const ALL: [EntityKind; 7] = [
        EntityKind::User,
        EntityKind::Tag,
        EntityKind::Category,
        EntityKind::Post,
        EntityKind::Page,
        EntityKind::Comment,
        EntityKind::Media,
    ];

    /// The collection path segment under `wp/v2`, also used as the export
    /// file stem and the CLI spelling.
    pub fn slug(&self) -> &'static str {
        match self {
            EntityKind::User => "users",
            EntityKind::Tag => "tags",
            EntityKind::Category => "categories",
            EntityKind::Post => "posts",
            EntityKind::Page => "pages",
            EntityKind::Comment => "comments",
            EntityKind::Media => "media",
        }
    }

    /// Singular tag used as the registry `data_type`.
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Tag => "tag",
            EntityKind::Category => "category",
            EntityKind::Post => "post",
            EntityKind::Page => "page",
            EntityKind::Comment => "comment",
            EntityKind::Media => "media",
        }
    }

    /// Capitalized plural for log lines.
    pub fn display_name(&self) -> &'static str {
        match self {
            EntityKind::User => "Users",
            EntityKind::Tag => "Tags",
            EntityKind::Category => "Categories",
            EntityKind::Post => "Posts",
            EntityKind::Page => "Pages",
            EntityKind::Comment => "Comments",
            EntityKind::Media => "Media",
        }
    }

    /// The record field carrying this kind's canonical URL.
    pub fn link_field(&self) -> &'static str {
        match self {
            EntityKind::Media => "source_url",
            _ => "link",
        }
    }

    /// Name of this kind's exported batch file, with the optional prefix.
    ///
    /// The download and extract stages must agree on this, so it lives here.
    pub fn file_name(&self, prefix: Option<&str>) -> String {
        match prefix {
            Some(prefix) => format!("{prefix}-{}.json", self.slug()),
            None => format!("{}.json", self.slug()),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for EntityKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.slug() == s)
            .ok_or_else(|| AppError::validation(format!("Unknown entity type '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_and_url_fields() {
        let obj: WpObject = serde_json::from_str(
            r#"{"id": 42, "link": "https://example.org/a/", "source_url": "https://example.org/f.jpg"}"#,
        )
        .unwrap();
        assert_eq!(obj.id(), Some(42));
        assert_eq!(obj.url(EntityKind::Post), Some("https://example.org/a/"));
        assert_eq!(obj.url(EntityKind::Media), Some("https://example.org/f.jpg"));
    }

    #[test]
    fn test_missing_id() {
        let obj: WpObject = serde_json::from_str(r#"{"slug": "no-id"}"#).unwrap();
        assert_eq!(obj.id(), None);
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("posts".parse::<EntityKind>().unwrap(), EntityKind::Post);
        assert_eq!("media".parse::<EntityKind>().unwrap(), EntityKind::Media);
        assert!("revisions".parse::<EntityKind>().is_err());
    }

    #[test]
    fn test_transparent_serialization() {
        let obj: WpObject = serde_json::from_str(r#"{"id": 1}"#).unwrap();
        assert_eq!(serde_json::to_string(&obj).unwrap(), r#"{"id":1}"#);
    }

    #[test]
    fn test_batch_file_names() {
        assert_eq!(EntityKind::Post.file_name(None), "posts.json");
        assert_eq!(EntityKind::Media.file_name(Some("site")), "site-media.json");
    }
}
