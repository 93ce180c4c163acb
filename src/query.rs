//! Active search query extraction from a result page address.
//!
//! Each engine names its query parameter differently; Baidu even uses two.
//! A missing or blank query is a normal outcome that ends the pass early.

use url::Url;

/// Host substring → query parameter names, first non-empty wins.
const QUERY_PARAMS: &[(&str, &[&str])] = &[
    ("google", &["q"]),
    ("bing", &["q"]),
    ("baidu", &["wd", "word"]),
];

/// Extract the user's search terms from a page address.
///
/// Returns `None` when the address cannot be parsed, the host is not a
/// known engine, or every candidate parameter is absent or blank.
///
/// # Examples
///
/// ```
/// use serp_sieve::query::extract_query;
///
/// let q = extract_query("https://www.bing.com/search?q=wireless+mouse&form=QBLH");
/// assert_eq!(q.as_deref(), Some("wireless mouse"));
/// assert_eq!(extract_query("https://example.com/?q=x"), None);
/// ```
pub fn extract_query(address: &str) -> Option<String> {
    let Ok(parsed) = Url::parse(address) else {
        tracing::trace!("address is not a URL");
        return None;
    };
    query_from_url(&parsed)
}

/// Same as [`extract_query`] for an already-parsed URL.
pub fn query_from_url(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_ascii_lowercase();
    let (_, params) = QUERY_PARAMS
        .iter()
        .find(|(pattern, _)| host.contains(pattern))?;

    params.iter().find_map(|name| {
        url.query_pairs()
            .find(|(key, value)| &**key == *name && !value.trim().is_empty())
            .map(|(_, value)| value.into_owned())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn google_reads_q() {
        let q = extract_query("https://www.google.com/search?q=rust+lang&hl=en");
        assert_eq!(q.as_deref(), Some("rust lang"));
    }

    #[test]
    fn bing_reads_q() {
        let q = extract_query("https://www.bing.com/search?form=QBLH&q=wireless%20mouse");
        assert_eq!(q.as_deref(), Some("wireless mouse"));
    }

    #[test]
    fn baidu_prefers_wd() {
        let q = extract_query("https://www.baidu.com/s?wd=%E9%BC%A0%E6%A0%87&word=other");
        assert_eq!(q.as_deref(), Some("鼠标"));
    }

    #[test]
    fn baidu_falls_back_to_word() {
        let q = extract_query("https://m.baidu.com/s?word=keyboard");
        assert_eq!(q.as_deref(), Some("keyboard"));
    }

    #[test]
    fn baidu_skips_blank_wd() {
        let q = extract_query("https://www.baidu.com/s?wd=&word=keyboard");
        assert_eq!(q.as_deref(), Some("keyboard"));
    }

    #[test]
    fn unknown_host_returns_none() {
        assert_eq!(extract_query("https://duckduckgo.com/?q=rust"), None);
    }

    #[test]
    fn missing_param_returns_none() {
        assert_eq!(extract_query("https://www.google.com/search?hl=en"), None);
    }

    #[test]
    fn blank_param_returns_none() {
        assert_eq!(extract_query("https://www.google.com/search?q=+++"), None);
    }

    #[test]
    fn invalid_address_returns_none() {
        assert_eq!(extract_query("not a url"), None);
        assert_eq!(extract_query(""), None);
    }

    #[test]
    fn host_match_is_case_insensitive() {
        let q = extract_query("https://WWW.GOOGLE.COM/search?q=abc");
        assert_eq!(q.as_deref(), Some("abc"));
    }
}
