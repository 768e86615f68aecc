//! URL helpers shared by the keyword, bridge and normalization services

use url::Url;

/// Append `name=<encoded value>` using `&` when `url` already has a query string.
pub fn append_query_param(url: &str, name: &str, value: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{name}={}", urlencoding::encode(value))
}

/// Whether the query string of `url` carries exactly `name=value`
pub fn has_query_pair(url: &str, name: &str, value: &str) -> bool {
    let pair = format!("{name}={value}");
    url.split_once('?')
        .is_some_and(|(_, query)| query.split('&').any(|p| p == pair))
}

/// `url` with `name=value` in its query string (unchanged when already there)
pub fn with_query_pair(url: &str, name: &str, value: &str) -> String {
    if has_query_pair(url, name, value) {
        url.to_string()
    } else {
        append_query_param(url, name, value)
    }
}

/// `url` without any `name=value` pair; other parameters keep their order
pub fn without_query_pair(url: &str, name: &str, value: &str) -> String {
    let Some((path, query)) = url
        .split_once('?')
        .filter(|_| has_query_pair(url, name, value))
    else {
        return url.to_string();
    };
    let pair = format!("{name}={value}");
    let kept: Vec<&str> = query.split('&').filter(|p| *p != pair).collect();
    if kept.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{}", kept.join("&"))
    }
}

/// Prefix `value` with `origin` unless it already starts with it.
///
/// Returns `None` when nothing needs to change (empty value or already
/// qualified), so applying the result again is always a no-op.
pub fn qualify(value: &str, origin: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value.starts_with(origin) {
        return None;
    }
    let separator = if value.starts_with('/') { "" } else { "/" };
    Some(format!("{origin}{separator}{value}"))
}

/// Resolve a detail URL taken from markup.
///
/// Absolute URLs are kept as they are; relative ones are qualified with the
/// content service origin.
pub fn resolve_against_origin(value: &str, origin: &str) -> String {
    let value = value.trim();
    if Url::parse(value).is_ok() {
        return value.to_string();
    }
    qualify(value, origin).unwrap_or_else(|| value.to_string())
}

/// ASCII origin of an absolute URL, e.g. `https://courses.example.com`
pub fn origin_of(url: &Url) -> String {
    url.origin().ascii_serialization()
}
