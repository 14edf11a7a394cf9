//! Canonical forms of listing URLs and titles used as deduplication keys.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));
static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("valid punctuation regex"));

/// Canonicalizes a listing href into an absolute URL without query string,
/// fragment, or trailing slash.
///
/// Scheme-relative hrefs (`//host/path`) get `https:`; other relative hrefs
/// are resolved against `origin`. Returns an empty string for empty input or
/// for schemes other than `http`/`https`, which callers treat as "reject".
///
/// Normalizing an already-normalized URL returns it unchanged.
#[must_use]
pub fn normalize_url(href: &str, origin: &Url) -> String {
    let href = href.trim();
    if href.is_empty() {
        return String::new();
    }

    let resolved = if let Some(rest) = href.strip_prefix("//") {
        Url::parse(&format!("https://{rest}"))
    } else if href.starts_with("http://") || href.starts_with("https://") {
        Url::parse(href)
    } else {
        origin.join(href)
    };

    match resolved {
        Ok(mut url) => {
            if !matches!(url.scheme(), "http" | "https") {
                return String::new();
            }
            url.set_query(None);
            url.set_fragment(None);
            url.as_str().trim_end_matches('/').to_owned()
        }
        Err(e) => {
            tracing::debug!(href, error = %e, "unparseable href; stripping query and fragment by hand");
            let without_query = href.split(['?', '#']).next().unwrap_or(href);
            without_query.trim_end_matches('/').to_owned()
        }
    }
}

/// Canonicalizes a display title for equality comparison: lowercase, runs of
/// whitespace collapsed to one space, punctuation removed.
///
/// Whitespace is collapsed before punctuation is removed, so `"A - B"` keeps
/// two spaces where the dash was.
#[must_use]
pub fn normalize_title(title: &str) -> String {
    let lowered = title.trim().to_lowercase();
    let collapsed = WHITESPACE_RUN.replace_all(&lowered, " ");
    NON_WORD.replace_all(&collapsed, "").into_owned()
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
