//! Post-processing for generated post text: cleanup, style checks,
//! truncation and link composition.

use once_cell::sync::Lazy;
use regex::Regex;

/// X shortens every link to this many characters on standard accounts.
pub const SHORT_LINK_LENGTH: usize = 23;
/// Accounts at or under this limit get shortened-link accounting.
pub const STANDARD_POST_LIMIT: usize = 280;
const LONG_LINK_CAP: usize = 100;

const META_PREFIXES: [&str; 8] = [
    "here's a tweet:",
    "okay, here's",
    "tweet:",
    "here's",
    "okay,",
    "alright,",
    "so,",
    "well,",
];

const FORBIDDEN_PHRASES: [&str; 12] = [
    "as an ai",
    "as a language model",
    "as an artificial intelligence",
    "in this article",
    "according to",
    "here's a tweet",
    "okay, here's",
    "channeling my inner",
    "designed to go viral",
    "here's what i think",
    "my take on",
    "let me tell you",
];

static BOLD_STARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("valid regex"));
static BOLD_UNDERSCORES: Lazy<Regex> = Lazy::new(|| Regex::new(r"__([^_]+)__").expect("valid regex"));
static ITALIC_STARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*([^*\n]+)\*").expect("valid regex"));
static ITALIC_UNDERSCORES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|\s)_([^_\s][^_\n]*)_").expect("valid regex"));
static META_LEADS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^.*?(channeling my inner|designed to go viral|here's what i think|my take).*?:")
        .expect("valid regex")
});
static QUOTED_AFTER_META: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^(.*?)[:]\s*["']([^"']+)["']"#).expect("valid regex"));
static SENTENCE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"([.!?])[ \t]+([A-Z])").expect("valid regex"));
static LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").expect("valid regex"));

/// Normalize raw model output into post text. Line breaks survive;
/// whitespace within a line is collapsed.
pub fn clean_generated_text(raw: &str) -> String {
    let mut text = strip_wrapping_quotes(raw.trim()).to_string();

    text = BOLD_STARS.replace_all(&text, "$1").into_owned();
    text = BOLD_UNDERSCORES.replace_all(&text, "$1").into_owned();
    text = ITALIC_STARS.replace_all(&text, "$1").into_owned();
    text = ITALIC_UNDERSCORES.replace_all(&text, "$1$2").into_owned();

    // "Here's my tweet: "actual text"" keeps only the quoted part.
    let quoted = QUOTED_AFTER_META.captures(&text).and_then(|caps| {
        let lead = caps[1].to_lowercase();
        let is_meta = lead.len() > 20
            && ["tweet", "here", "okay", "channeling", "designed"]
                .iter()
                .any(|w| lead.contains(w));
        is_meta.then(|| caps[2].to_string())
    });
    if let Some(quoted) = quoted {
        text = quoted;
    }

    let lines: Vec<String> = text.lines().map(clean_line).collect();
    let joined = lines.join("\n");

    strip_wrapping_quotes(joined.trim()).trim().to_string()
}

fn clean_line(line: &str) -> String {
    let collapsed = line
        .split_whitespace()
        .filter(|w| *w != "*" && *w != "_")
        .collect::<Vec<_>>()
        .join(" ");
    let stripped = strip_meta_prefix(&collapsed);
    META_LEADS.replace(stripped, "").trim().to_string()
}

fn strip_meta_prefix(line: &str) -> &str {
    for prefix in META_PREFIXES {
        let matches = line
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix));
        if matches {
            let rest = line[prefix.len()..].trim_start();
            return rest.strip_prefix(':').unwrap_or(rest).trim_start();
        }
    }
    line
}

fn strip_wrapping_quotes(text: &str) -> &str {
    for quote in ['"', '\''] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return &text[1..text.len() - 1];
        }
    }
    text
}

/// Put each sentence on its own paragraph when the model produced one block.
pub fn add_line_breaks(text: &str) -> String {
    SENTENCE_BREAK.replace_all(text, "$1\n\n$2").trim().to_string()
}

/// Reject text that reads like assistant output or still carries markdown.
pub fn validate_style(text: &str) -> std::result::Result<(), String> {
    let lower = text.to_lowercase();
    if let Some(phrase) = FORBIDDEN_PHRASES.iter().find(|p| lower.contains(*p)) {
        return Err(format!("contains meta phrase {:?}", phrase));
    }
    if BOLD_STARS.is_match(text)
        || ITALIC_STARS.is_match(text)
        || BOLD_UNDERSCORES.is_match(text)
        || ITALIC_UNDERSCORES.is_match(text)
    {
        return Err("contains markdown emphasis".to_string());
    }

    let opening = lower.split_whitespace().take(3).collect::<Vec<_>>().join(" ");
    let meta_start = ["okay,", "alright,", "so,", "well,", "here's", "let me"]
        .iter()
        .any(|s| opening.starts_with(s));
    if meta_start && ["tweet", "here", "tell", "think"].iter().any(|w| opening.contains(w)) {
        return Err(format!("opens with meta-commentary: {:?}", opening));
    }
    Ok(())
}

/// Shorten `text` to at most `max_chars` characters. Prefers cutting at a
/// line break in the back half, then at a space in the last fifth, and marks
/// non-line cuts with `...`.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let head: String = text.chars().take(keep).collect();

    if let Some(nl) = head.rfind('\n') {
        if head[..nl].chars().count() * 2 > max_chars {
            return head[..nl].trim_end().to_string();
        }
    }
    let cut = match head.rfind(' ') {
        Some(sp) if head[..sp].chars().count() * 5 > max_chars * 4 => &head[..sp],
        _ => head.as_str(),
    };
    format!("{}...", cut)
}

/// Characters a link occupies against `max_len`.
pub fn link_cost(link: &str, max_len: usize) -> usize {
    if max_len <= STANDARD_POST_LIMIT {
        SHORT_LINK_LENGTH
    } else {
        link.chars().count().min(LONG_LINK_CAP)
    }
}

/// Length of `text` as the network counts it against `max_len`.
pub fn weighted_length(text: &str, max_len: usize) -> usize {
    let mut total = text.chars().count();
    if max_len <= STANDARD_POST_LIMIT {
        for m in LINK.find_iter(text) {
            total = total - m.as_str().chars().count() + SHORT_LINK_LENGTH;
        }
    }
    total
}

/// Append `link` after a space, trimming `body` so the result fits `max_len`.
pub fn compose_with_link(body: &str, link: &str, max_len: usize) -> String {
    if link.is_empty() {
        return reflow(truncate_text(body, max_len));
    }

    let budget = max_len.saturating_sub(link_cost(link, max_len) + 1);
    let mut trimmed = reflow(truncate_text(body, budget));
    let mut composed = format!("{} {}", trimmed, link);

    if weighted_length(&composed, max_len) > max_len {
        let budget = max_len.saturating_sub(link.chars().count() + 1);
        trimmed = reflow(truncate_text(&trimmed, budget));
        composed = format!("{} {}", trimmed, link);
    }
    composed
}

fn reflow(text: String) -> String {
    if !text.contains('\n') && text.chars().count() > 50 {
        add_line_breaks(&text)
    } else {
        text
    }
}

/// Non-empty and within `max_len` as the network counts it.
pub fn validate_length(text: &str, max_len: usize) -> std::result::Result<(), String> {
    if text.trim().is_empty() {
        return Err("generated text is empty".to_string());
    }
    let len = weighted_length(text, max_len);
    if len > max_len {
        return Err(format!("generated text is {} chars, limit {}", len, max_len));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_quotes_and_markdown() {
        assert_eq!(
            clean_generated_text("\"**Nvidia** just did *what*?\""),
            "Nvidia just did what?"
        );
    }

    #[test]
    fn strips_meta_prefixes() {
        assert_eq!(
            clean_generated_text("Here's a tweet: Pixel 10 leaks again.\nWho's surprised?"),
            "Pixel 10 leaks again.\nWho's surprised?"
        );
        assert_eq!(clean_generated_text("Okay, Linux wins."), "Linux wins.");
    }

    #[test]
    fn collapses_spaces_but_keeps_lines() {
        assert_eq!(
            clean_generated_text("  One   line.\n\nTwo    lines.  "),
            "One line.\n\nTwo lines."
        );
    }

    #[test]
    fn breaks_between_sentences() {
        assert_eq!(
            add_line_breaks("AMD ships. Intel sighs! Who wins?"),
            "AMD ships.\n\nIntel sighs!\n\nWho wins?"
        );
    }

    #[test]
    fn style_rejections() {
        assert!(validate_style("As an AI, I love GPUs #Technews").is_err());
        assert!(validate_style("This is **bold**").is_err());
        assert!(validate_style("Okay, here's the thing about phones").is_err());
        assert!(validate_style("New Pixel drops.\nWorth it? #Technews").is_ok());
        assert!(validate_style("snake_case names are fine").is_ok());
    }

    #[test]
    fn truncation_prefers_line_breaks() {
        let text = format!("{}\n{}", "a".repeat(60), "b".repeat(60));
        assert_eq!(truncate_text(&text, 100), "a".repeat(60));
    }

    #[test]
    fn truncation_falls_back_to_ellipsis() {
        let out = truncate_text(&"x".repeat(50), 20);
        assert_eq!(out, format!("{}...", "x".repeat(17)));
        assert_eq!(out.chars().count(), 20);
    }

    #[test]
    fn short_links_count_as_23() {
        let link = format!("https://example.com/{}", "p".repeat(200));
        let composed = compose_with_link(&"word ".repeat(100), &link, 280);
        assert!(composed.ends_with(&link));
        assert!(weighted_length(&composed, 280) <= 280);
        assert!(validate_length(&composed, 280).is_ok());
    }

    #[test]
    fn long_limits_use_real_link_length() {
        let link = "https://example.com/story";
        assert_eq!(link_cost(link, 25_000), link.len());
        let composed = compose_with_link("Short take. #Technews", link, 25_000);
        assert_eq!(composed, format!("Short take. #Technews {}", link));
    }

    #[test]
    fn empty_text_is_invalid() {
        assert!(validate_length("   ", 280).is_err());
        assert!(validate_length(&"z".repeat(281), 280).is_err());
    }
}
