//! Content parser: turns raw model output into structured post fragments.
//!
//! Total functions: text that does not follow the `POST <n>:` convention
//! yields an empty list, never an error.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub const MAX_SUGGESTIONS: usize = 5;

/// One AI-produced content variant with its extracted hashtags and image ideas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedPost {
    pub content: String,
    pub hashtags: Vec<String>,
    pub image_suggestions: Vec<String>,
}

fn post_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r"(?im)^[\s*#]*POST\s*\d+\s*:\**").expect("post marker regex is valid")
    })
}

fn list_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r"^(?:[-*•]+|\d+[.)])\s*").expect("list marker regex is valid")
    })
}

/// Splits model output on `POST <n>:` markers into structured posts.
///
/// Text before the first marker is ignored. Within a section, lines that start
/// with `#` (or a `Hashtags:` label) are hashtag lines; everything else is body.
pub fn parse_generated_posts(text: &str) -> Vec<GeneratedPost> {
    let markers: Vec<_> = post_marker().find_iter(text).collect();

    markers
        .iter()
        .enumerate()
        .filter_map(|(i, m)| {
            let end = markers.get(i + 1).map_or(text.len(), |next| next.start());
            parse_section(&text[m.end()..end])
        })
        .collect()
}

fn parse_section(section: &str) -> Option<GeneratedPost> {
    let mut hashtags: Vec<String> = Vec::new();
    let mut body: Vec<&str> = Vec::new();

    for line in section.lines() {
        let candidate = strip_hashtag_label(line.trim());
        if candidate.starts_with('#') {
            for tag in extract_hashtags(candidate) {
                if !hashtags.contains(&tag) {
                    hashtags.push(tag);
                }
            }
        } else {
            body.push(line.trim_end());
        }
    }

    let content = body.join("\n").trim().to_string();
    if content.is_empty() {
        return None;
    }

    Some(GeneratedPost {
        content,
        hashtags,
        image_suggestions: Vec::new(),
    })
}

fn strip_hashtag_label(line: &str) -> &str {
    const LABEL: &str = "hashtags:";
    match line.get(..LABEL.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(LABEL) => line[LABEL.len()..].trim_start(),
        _ => line,
    }
}

/// Keeps whitespace-separated tokens that start with `#`.
pub fn extract_hashtags(line: &str) -> Vec<String> {
    line.split_whitespace()
        .filter(|token| token.starts_with('#'))
        .map(|token| token.trim_end_matches(|c: char| matches!(c, ',' | '.' | ';' | '!' | '?')))
        .filter(|token| token.len() > 1)
        .map(str::to_string)
        .collect()
}

/// Newline-separated suggestions, list markers removed, first five kept.
pub fn parse_suggestions(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| list_marker().replace(line.trim(), "").trim().to_string())
        .filter(|line| !line.is_empty())
        .take(MAX_SUGGESTIONS)
        .collect()
}
