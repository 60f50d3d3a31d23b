//! Image service: derives search terms for a post and fetches stock photos.
//!
//! Never fails. Without a photo key, or when every lookup comes back empty,
//! the fixed placeholder set is returned as `Outcome::Degraded`.

pub mod unsplash;

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::generation::prompts::build_image_description_prompt;
use crate::llm_client::TextModel;
use crate::outcome::Outcome;

pub use unsplash::{PhotoSearch, UnsplashClient};

pub const MAX_SEARCH_TERMS: usize = 3;
const MIN_TERM_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: String,
    pub url: String,
    pub alt: String,
    pub photographer: String,
    pub download_url: String,
}

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "the", "of", "in", "on", "at", "to", "for", "with", "by", "from", "into",
    "over", "under", "about", "as", "is", "are", "was", "be", "this", "that", "these", "those",
    "it", "its", "their", "your", "our", "some", "very", "photo", "image", "picture", "stock",
    "showing", "shot", "close", "up",
];

const BUSINESS_VOCABULARY: &[&str] = &[
    "business",
    "technology",
    "team",
    "office",
    "meeting",
    "growth",
    "success",
    "innovation",
    "marketing",
    "startup",
    "product",
    "launch",
    "data",
    "finance",
    "conference",
    "leadership",
    "customer",
    "software",
    "design",
    "strategy",
    "sales",
    "community",
    "education",
    "health",
    "travel",
    "coffee",
];

fn platform_default_terms(platform: &str) -> &'static [&'static str] {
    match platform {
        "twitter" => &["technology", "news"],
        "facebook" => &["community", "people"],
        "instagram" => &["lifestyle", "aesthetic"],
        "linkedin" => &["business", "professional"],
        "tiktok" => &["creative", "trending"],
        _ => &["abstract", "workspace"],
    }
}

/// Fixed images used whenever real photos cannot be fetched.
pub fn placeholder_images() -> Vec<ImageRecord> {
    [
        ("placeholder-1", "photo-1497366216548-37526070297c", "Modern office workspace"),
        ("placeholder-2", "photo-1522071820081-009f0129c71c", "Team collaborating at a table"),
        ("placeholder-3", "photo-1460925895917-afdab827c52f", "Laptop showing analytics"),
    ]
    .into_iter()
    .map(|(id, photo, alt)| ImageRecord {
        id: id.to_string(),
        url: format!("https://images.unsplash.com/{photo}?w=1080&q=80"),
        alt: alt.to_string(),
        photographer: "Unsplash".to_string(),
        download_url: format!("https://images.unsplash.com/{photo}"),
    })
    .collect()
}

/// Up to three search terms from a free-text description.
pub fn extract_search_terms(description: &str) -> Vec<String> {
    let cleaned: String = description
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() || matches!(c, ',' | '/' | '-') {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect();

    let mut seen = HashSet::new();
    cleaned
        .split(|c: char| c.is_whitespace() || matches!(c, ',' | '/' | '-'))
        .filter(|t| t.chars().count() >= MIN_TERM_LEN && !STOP_WORDS.contains(t))
        .filter(|t| seen.insert(t.to_string()))
        .take(MAX_SEARCH_TERMS)
        .map(str::to_string)
        .collect()
}

/// Keyword heuristic used when the model gives nothing usable.
pub fn fallback_search_terms(content: &str, platform: &str) -> Vec<String> {
    let words: HashSet<String> = content
        .split(|c: char| !c.is_alphanumeric())
        .map(|w| w.to_lowercase())
        .collect();

    let mut terms: Vec<String> = Vec::new();
    let vocabulary_hits = BUSINESS_VOCABULARY.iter().filter(|v| words.contains(**v));
    for term in vocabulary_hits.chain(platform_default_terms(platform).iter()) {
        if terms.len() == MAX_SEARCH_TERMS {
            break;
        }
        if !terms.iter().any(|t| t == term) {
            terms.push(term.to_string());
        }
    }
    terms
}

#[derive(Clone)]
pub struct ImageService {
    model: Arc<dyn TextModel>,
    photos: Option<Arc<dyn PhotoSearch>>,
}

impl ImageService {
    /// `photos` is `None` when no photo API key is configured.
    pub fn new(model: Arc<dyn TextModel>, photos: Option<Arc<dyn PhotoSearch>>) -> Self {
        Self { model, photos }
    }

    pub async fn generate_images_for_post(
        &self,
        content: &str,
        platform: &str,
        tone: &str,
        count: usize,
    ) -> Outcome<Vec<ImageRecord>> {
        if self.photos.is_none() {
            debug!("No photo API key configured, using placeholder images");
            return Outcome::Degraded(placeholder_images());
        }

        let prompt = build_image_description_prompt(content, platform, tone);
        let mut terms = match self.model.complete(&prompt).await {
            Ok(description) => extract_search_terms(&description),
            Err(e) => {
                warn!("Image description call failed, using keyword fallback: {e}");
                Vec::new()
            }
        };
        if terms.is_empty() {
            terms = fallback_search_terms(content, platform);
        }

        self.fetch_images(&terms, count).await
    }

    /// One lookup per term; failed or empty lookups are skipped.
    pub async fn fetch_images(&self, terms: &[String], count: usize) -> Outcome<Vec<ImageRecord>> {
        let Some(photos) = self.photos.as_ref() else {
            return Outcome::Degraded(placeholder_images());
        };

        let mut images: Vec<ImageRecord> = Vec::new();
        for term in terms.iter().take(count.max(1)) {
            match photos.search_first(term).await {
                Ok(Some(image)) if !images.iter().any(|i| i.id == image.id) => images.push(image),
                Ok(_) => debug!("No new photo for term '{term}'"),
                Err(e) => warn!("Photo search for '{term}' failed: {e}"),
            }
        }

        if images.is_empty() {
            warn!("No photos found for {:?}, using placeholders", terms);
            return Outcome::Degraded(placeholder_images());
        }
        Outcome::Ok(images)
    }
}
