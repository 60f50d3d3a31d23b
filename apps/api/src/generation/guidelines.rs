//! Guideline tables: canned style guidance per platform and per tone.
//!
//! Lookups are by key so that an unknown platform or tone degrades to generic
//! guidance instead of failing prompt construction.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitter,
    Facebook,
    Instagram,
    Linkedin,
    Tiktok,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::Twitter,
        Platform::Facebook,
        Platform::Instagram,
        Platform::Linkedin,
        Platform::Tiktok,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Twitter => "twitter",
            Platform::Facebook => "facebook",
            Platform::Instagram => "instagram",
            Platform::Linkedin => "linkedin",
            Platform::Tiktok => "tiktok",
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| {
                "platform must be one of: twitter, facebook, instagram, linkedin, tiktok"
                    .to_string()
            })
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Professional,
    Casual,
    Humorous,
    Formal,
    Friendly,
    Enthusiastic,
}

impl Tone {
    pub const ALL: [Tone; 6] = [
        Tone::Professional,
        Tone::Casual,
        Tone::Humorous,
        Tone::Formal,
        Tone::Friendly,
        Tone::Enthusiastic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Casual => "casual",
            Tone::Humorous => "humorous",
            Tone::Formal => "formal",
            Tone::Friendly => "friendly",
            Tone::Enthusiastic => "enthusiastic",
        }
    }
}

impl FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tone::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| {
                "tone must be one of: professional, casual, humorous, formal, friendly, enthusiastic"
                    .to_string()
            })
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const GENERIC_PLATFORM_GUIDELINES: &str =
    "Write clear, engaging social media copy suited to a general audience.";

const GENERIC_TONE_GUIDELINES: &str = "Use a balanced, approachable voice.";

/// Style guidance for a platform key; unknown keys get generic guidance.
pub fn platform_guidelines(key: &str) -> &'static str {
    match key.trim().to_ascii_lowercase().as_str() {
        "twitter" => {
            "Keep it under 280 characters. Be punchy and direct, lead with the hook, \
             and use at most 2-3 hashtags."
        }
        "facebook" => {
            "Write a conversational post of 1-3 short paragraphs. Encourage comments \
             and shares with a question or call to action."
        }
        "instagram" => {
            "Write a visual, story-driven caption with line breaks and a few emojis. \
             Hashtags may be more numerous and go at the end."
        }
        "linkedin" => {
            "Write a professional, insight-driven post. Open with a strong first line, \
             share a lesson or result, and end with a question for your network."
        }
        "tiktok" => {
            "Write a short, energetic caption that complements a video. Use trending, \
             casual language and a clear hook in the first few words."
        }
        _ => GENERIC_PLATFORM_GUIDELINES,
    }
}

/// Voice guidance for a tone key; unknown keys get generic guidance.
pub fn tone_guidelines(key: &str) -> &'static str {
    match key.trim().to_ascii_lowercase().as_str() {
        "professional" => "Polished and credible. Focus on expertise and outcomes.",
        "casual" => "Relaxed and conversational, like talking to a friend.",
        "humorous" => "Light-hearted and witty without undermining the message.",
        "formal" => "Precise and respectful. Avoid slang, contractions and emojis.",
        "friendly" => "Warm, welcoming and personable.",
        "enthusiastic" => "High-energy and excited. Celebrate the news.",
        _ => GENERIC_TONE_GUIDELINES,
    }
}
