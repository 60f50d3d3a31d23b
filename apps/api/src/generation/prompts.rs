//! Prompt templates and builders for the generation module.
//!
//! Pure string construction. Templates use `{placeholder}` markers that are
//! filled in a single pass, so user text that looks like a marker stays as-is.

use crate::generation::generator::GenerationRequest;
use crate::generation::guidelines::{platform_guidelines, tone_guidelines};

/// Multi-post generation prompt.
/// Replace: {days}, {platform}, {bullets}, {platform_guidelines}, {tone},
///          {tone_guidelines}, {additional_context}, {hashtag_instruction}
pub const POSTS_PROMPT_TEMPLATE: &str = r#"Generate {days} different {platform} posts based on the following bullet points:
{bullets}

PLATFORM GUIDELINES ({platform}):
{platform_guidelines}

TONE ({tone}):
{tone_guidelines}
{additional_context}
Each post must be a distinct variant that stands on its own.
{hashtag_instruction}
Format your response EXACTLY as follows, with nothing before the first post:

POST 1:
[post content]

POST 2:
[post content]

Continue until POST {days}."#;

const HASHTAG_INSTRUCTION: &str =
    "End each post with 3-5 relevant hashtags on their own line, each starting with #.";

const NO_HASHTAG_INSTRUCTION: &str = "Do NOT include hashtags.";

/// Hashtag prompt. Replace: {platform}, {content}
pub const HASHTAG_PROMPT_TEMPLATE: &str = r#"Suggest 5 relevant hashtags for the following {platform} post.
Return ONLY the hashtags on a single line, separated by spaces, each starting with #.

POST:
{content}"#;

/// Image suggestion prompt. Replace: {content}
pub const IMAGE_SUGGESTION_PROMPT_TEMPLATE: &str = r#"Suggest up to 5 short image ideas (2-4 keywords each) that would accompany the following social media post.
Return one suggestion per line with no numbering and no extra text.

POST:
{content}"#;

/// Image description prompt. Replace: {platform}, {tone}, {content}
pub const IMAGE_DESCRIPTION_PROMPT_TEMPLATE: &str = r#"Describe, in one short phrase of at most 8 words, a stock photo that would suit this {platform} post written in a {tone} tone.
Return ONLY the phrase.

POST:
{content}"#;

/// Substitutes each `{key}` marker in one left-to-right scan. Inserted values
/// are never rescanned; unknown markers are kept verbatim.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let hit = values.iter().find(|(key, _)| {
            tail[1..].starts_with(key) && tail[1 + key.len()..].starts_with('}')
        });
        match hit {
            Some((key, value)) => {
                out.push_str(value);
                rest = &tail[key.len() + 2..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Builds the main generation prompt from a request.
pub fn build_posts_prompt(request: &GenerationRequest) -> String {
    let platform = request.platform.as_str();
    let tone = request.tone.as_str();

    let bullets = request
        .input_bullets
        .iter()
        .map(|b| format!("- {}", b.trim()))
        .collect::<Vec<_>>()
        .join("\n");

    let additional_context = match request.additional_context.as_deref().map(str::trim) {
        Some(ctx) if !ctx.is_empty() => format!("\nADDITIONAL CONTEXT:\n{ctx}\n"),
        _ => String::new(),
    };

    let hashtag_instruction = if request.include_hashtags {
        HASHTAG_INSTRUCTION
    } else {
        NO_HASHTAG_INSTRUCTION
    };

    let days = request.days.to_string();
    fill(
        POSTS_PROMPT_TEMPLATE,
        &[
            ("days", days.as_str()),
            ("platform", platform),
            ("bullets", bullets.as_str()),
            ("platform_guidelines", platform_guidelines(platform)),
            ("tone", tone),
            ("tone_guidelines", tone_guidelines(tone)),
            ("additional_context", additional_context.as_str()),
            ("hashtag_instruction", hashtag_instruction),
        ],
    )
}

pub fn build_hashtag_prompt(content: &str, platform: &str) -> String {
    fill(
        HASHTAG_PROMPT_TEMPLATE,
        &[("platform", platform), ("content", content.trim())],
    )
}

pub fn build_image_suggestion_prompt(content: &str) -> String {
    fill(IMAGE_SUGGESTION_PROMPT_TEMPLATE, &[("content", content.trim())])
}

pub fn build_image_description_prompt(content: &str, platform: &str, tone: &str) -> String {
    fill(
        IMAGE_DESCRIPTION_PROMPT_TEMPLATE,
        &[("platform", platform), ("tone", tone), ("content", content.trim())],
    )
}
