use crate::rss_utils::{feed, url};
use crate::types::{BotError, ParsedEntry, Result};
use feed_rs::parser;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

const SUMMARY_MAX_CHARS: usize = 300;

static EMBEDDED_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s<>"{}|\\^`\[\]]+"#).expect("valid url regex"));

pub struct FeedParser;

impl FeedParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse an RSS or Atom document into entries, in document order.
    /// Entries without a usable title or article link are dropped here;
    /// entries without a publish timestamp are kept and filtered later.
    pub fn parse_feed(&self, content: &str) -> Result<Vec<ParsedEntry>> {
        debug!("Parsing feed content ({} bytes)", content.len());

        let feed = parser::parse(content.as_bytes())
            .map_err(|e| BotError::Parse(format!("Failed to parse feed: {}", e)))?;

        let total = feed.entries.len();
        let entries: Vec<ParsedEntry> = feed
            .entries
            .into_iter()
            .filter_map(|entry| self.parse_entry(entry))
            .collect();

        debug!("Parsed feed: kept {} of {} entries", entries.len(), total);
        Ok(entries)
    }

    fn parse_entry(&self, entry: feed_rs::model::Entry) -> Option<ParsedEntry> {
        let title = entry
            .title
            .map(|t| feed::extract_text_from_html(&t.content))
            .unwrap_or_default();
        if title.is_empty() {
            debug!("Skipping entry without title");
            return None;
        }

        let raw_summary = entry
            .summary
            .map(|s| s.content)
            .filter(|s| !s.trim().is_empty())
            .or_else(|| entry.content.and_then(|c| c.body))
            .unwrap_or_default();
        let summary = feed::truncate_chars(
            &feed::extract_text_from_html(&raw_summary),
            SUMMARY_MAX_CHARS,
        );

        let hrefs: Vec<String> = entry
            .links
            .iter()
            .map(|l| l.href.trim().to_string())
            .filter(|h| !h.is_empty())
            .collect();
        let link = resolve_article_link(&hrefs, &summary, &title)?;

        // `updated` is not a publish time; entries without `published` stay undated.
        let published_at = entry.published;

        Some(ParsedEntry {
            identifier: url::canonical_identifier(&link),
            link,
            title,
            summary,
            published_at,
        })
    }
}

impl Default for FeedParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Pick the link to post for an entry.
///
/// Google News items point at redirect pages that render without a link
/// preview, so the first non-Google article link among the entry's links (or
/// embedded in its text) replaces it; without one the entry is dropped.
fn resolve_article_link(hrefs: &[String], summary: &str, title: &str) -> Option<String> {
    let primary = hrefs.first()?;

    let link = if url::is_google_news(primary) {
        let alternate = hrefs
            .iter()
            .skip(1)
            .find(|h| !url::is_google_news(h) && url::is_article_url(h))
            .cloned()
            .or_else(|| {
                let text = format!("{} {}", summary, title);
                EMBEDDED_URL
                    .find_iter(&text)
                    .map(|m| m.as_str().to_string())
                    .find(|u| !url::is_google_news(u) && url::is_article_url(u))
            });
        match alternate {
            Some(found) => found,
            None => {
                debug!("Skipping Google News redirect entry: {}", title);
                return None;
            }
        }
    } else {
        primary.clone()
    };

    if !url::is_article_url(&link) {
        debug!("Rejecting domain-only link {} for entry: {}", link, title);
        return None;
    }
    Some(link)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn links(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn plain_links_pass_through() {
        let got = resolve_article_link(&links(&["https://example.com/story"]), "", "t");
        assert_eq!(got.as_deref(), Some("https://example.com/story"));
    }

    #[test]
    fn google_news_uses_alternate_link() {
        let got = resolve_article_link(
            &links(&[
                "https://news.google.com/rss/articles/CBMiXYZ",
                "https://www.example.com/2025/nvidia-story",
            ]),
            "",
            "t",
        );
        assert_eq!(got.as_deref(), Some("https://www.example.com/2025/nvidia-story"));
    }

    #[test]
    fn google_news_uses_embedded_link() {
        let got = resolve_article_link(
            &links(&["https://news.google.com/rss/articles/CBMiXYZ"]),
            "Read at https://www.example.com/amd/launch now",
            "t",
        );
        assert_eq!(got.as_deref(), Some("https://www.example.com/amd/launch"));
    }

    #[test]
    fn google_news_without_alternate_is_dropped() {
        let got = resolve_article_link(
            &links(&["https://news.google.com/rss/articles/CBMiXYZ"]),
            "no link here",
            "t",
        );
        assert!(got.is_none());
    }

    #[test]
    fn domain_only_is_dropped() {
        assert!(resolve_article_link(&links(&["https://example.com/"]), "", "t").is_none());
        assert!(resolve_article_link(&[], "", "t").is_none());
    }
}
