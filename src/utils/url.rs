// src/utils/url.rs

//! URL manipulation utilities.

use url::Url;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    match base.join(href) {
        Ok(url) => url.to_string(),
        Err(_) => href.to_string(),
    }
}

/// Whether two URLs point at the same host.
pub fn same_host(a: &Url, b: &Url) -> bool {
    a.host_str() == b.host_str()
}

/// Normalize a crawl target: default to `http://` when no scheme is given
/// and ensure a trailing slash.
pub fn normalize_target(target: &str) -> String {
    let with_scheme = if target.starts_with("http://") || target.starts_with("https://") {
        target.to_string()
    } else {
        format!("http://{target}")
    };

    if with_scheme.ends_with('/') {
        with_scheme
    } else {
        format!("{with_scheme}/")
    }
}
