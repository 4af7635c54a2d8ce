//! RSS-specific utility functions for the aggregator

/// URL utilities for article links
pub mod url {
    use url::Url;

    const TRACKING_PARAMS: [&str; 6] = ["fbclid", "gclid", "mc_cid", "mc_eid", "ref", "cmpid"];

    /// Extract domain from URL
    pub fn extract_domain(url_str: &str) -> Option<String> {
        if let Ok(url) = Url::parse(url_str) {
            url.domain().map(|d| d.to_string())
        } else {
            None
        }
    }

    /// Derive the dedupe identifier for an article link.
    ///
    /// Scheme and host are lower-cased by the parser, the fragment and
    /// tracking query parameters are dropped and a trailing slash on the path
    /// is trimmed. Links that fail to parse are used verbatim (trimmed).
    pub fn canonical_identifier(link: &str) -> String {
        let trimmed = link.trim();
        let Ok(mut url) = Url::parse(trimmed) else {
            return trimmed.to_string();
        };

        url.set_fragment(None);

        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| !is_tracking_param(k))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }

        let path = url.path().to_string();
        if path.len() > 1 && path.ends_with('/') {
            url.set_path(path.trim_end_matches('/'));
        }

        url.to_string()
    }

    fn is_tracking_param(key: &str) -> bool {
        key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
    }

    /// True for http(s) links that point below the site root. Domain-only
    /// links render without a preview and are not treated as articles.
    pub fn is_article_url(url_str: &str) -> bool {
        match Url::parse(url_str) {
            Ok(url) => {
                (url.scheme() == "http" || url.scheme() == "https")
                    && url.host_str().is_some()
                    && !url.path().trim_matches('/').is_empty()
            }
            Err(_) => false,
        }
    }

    /// Google News wraps articles in redirect links
    pub fn is_google_news(url_str: &str) -> bool {
        extract_domain(url_str)
            .map(|d| d == "news.google.com")
            .unwrap_or(false)
    }

    /// Validate feed URL format
    pub fn is_valid_feed_url(url_str: &str) -> bool {
        if let Ok(url) = Url::parse(url_str) {
            url.scheme() == "http" || url.scheme() == "https"
        } else {
            false
        }
    }
}

/// Feed text utilities
pub mod feed {
    /// Extract clean text content from HTML
    pub fn extract_text_from_html(html: &str) -> String {
        html.chars()
            .fold((String::new(), false), |(mut text, in_tag), c| match c {
                '<' => (text, true),
                '>' => (text, false),
                _ if !in_tag => {
                    text.push(c);
                    (text, in_tag)
                }
                _ => (text, in_tag),
            })
            .0
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Keep at most `max_chars` characters, never splitting a code point
    pub fn truncate_chars(text: &str, max_chars: usize) -> String {
        match text.char_indices().nth(max_chars) {
            Some((idx, _)) => text[..idx].to_string(),
            None => text.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::feed::*;
    use super::url::*;

    #[test]
    fn canonical_identifier_strips_noise() {
        assert_eq!(
            canonical_identifier("https://Example.com/news/story/?utm_source=rss&id=7#comments"),
            "https://example.com/news/story?id=7"
        );
        assert_eq!(
            canonical_identifier(" https://example.com/a/b/ "),
            "https://example.com/a/b"
        );
        assert_eq!(canonical_identifier("not a url"), "not a url");
    }

    #[test]
    fn canonical_identifier_is_stable() {
        let link = "https://www.theverge.com/2025/1/1/story?utm_medium=feed";
        assert_eq!(canonical_identifier(link), canonical_identifier(link));
        assert_eq!(
            canonical_identifier(link),
            canonical_identifier("https://www.theverge.com/2025/1/1/story")
        );
    }

    #[test]
    fn article_url_requires_path() {
        assert!(is_article_url("https://example.com/2025/01/story"));
        assert!(!is_article_url("https://example.com/"));
        assert!(!is_article_url("https://example.com"));
        assert!(!is_article_url("ftp://example.com/file"));
        assert!(!is_article_url("garbage"));
    }

    #[test]
    fn google_news_detection() {
        assert!(is_google_news("https://news.google.com/rss/articles/CBMiabc"));
        assert!(!is_google_news("https://www.google.com/search"));
    }

    #[test]
    fn html_text_extraction() {
        assert_eq!(
            extract_text_from_html("<p>Hello <b>new</b>\n  phone</p>"),
            "Hello new phone"
        );
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
