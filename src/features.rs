//! Feature extraction: turns a tab into the text handed to the classifier

use crate::types::TabRecord;

/// Title browsers report for pages that never set one
pub const UNTITLED: &str = "Untitled";
/// Synthetic domain of `about:` pages
pub const ABOUT_DOMAIN: &str = "about";

const MAX_TOKENS: usize = 512;
const CHARS_PER_TOKEN: usize = 4;
/// Crude token budget; no tokenization happens here
pub const MAX_FEATURE_CHARS: usize = MAX_TOKENS * CHARS_PER_TOKEN;

/// Build the classifier input: title, domain, then URL path words.
/// Returns `None` when the tab offers no usable signal.
pub fn extract(tab: &TabRecord) -> Option<String> {
    let mut fragments: Vec<String> = Vec::with_capacity(3);

    let title = tab.title.trim();
    if !title.is_empty() && title != UNTITLED {
        fragments.push(title.to_string());
    }

    let domain = tab.domain.trim();
    if !domain.is_empty() && domain != ABOUT_DOMAIN {
        fragments.push(domain.to_string());
    }

    let path_words = url_path(&tab.url)
        .split(|c: char| c == '/' || c == '_' || c == '-' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if !path_words.is_empty() {
        fragments.push(path_words);
    }

    if fragments.is_empty() {
        return None;
    }

    let text = fragments.join(" ");
    if text.chars().count() > MAX_FEATURE_CHARS {
        Some(text.chars().take(MAX_FEATURE_CHARS).collect())
    } else {
        Some(text)
    }
}

/// Whether extracted text is long enough to be worth a classifier call
pub fn is_sufficient(text: &str, min_chars: usize) -> bool {
    text.trim().chars().count() >= min_chars
}

/// Path component of a URL, without query or fragment
fn url_path(url: &str) -> &str {
    let rest = match url.find("://") {
        Some(idx) => &url[idx + 3..],
        None => return "",
    };
    let path = match rest.find('/') {
        Some(idx) => &rest[idx..],
        None => return "",
    };
    let end = path.find(|c: char| c == '?' || c == '#').unwrap_or(path.len());
    &path[..end]
}
