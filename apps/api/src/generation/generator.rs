//! Content generation: orchestrates prompt building, model calls and parsing.
//!
//! Flow: build_posts_prompt → model.complete → parse_generated_posts →
//!       per post: hashtag backfill (if requested and missing) → image suggestions.
//!
//! Only the main call can fail the operation. Secondary calls degrade to empty
//! lists and are reported through `Outcome`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::generation::guidelines::{Platform, Tone};
use crate::generation::parser::{
    extract_hashtags, parse_generated_posts, parse_suggestions, GeneratedPost,
};
use crate::generation::prompts::{
    build_hashtag_prompt, build_image_suggestion_prompt, build_posts_prompt,
};
use crate::llm_client::{LlmError, TextModel};
use crate::outcome::Outcome;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Failed to generate posts: {0}")]
    Failed(#[from] LlmError),

    #[error("Failed to generate posts: response contained no usable posts")]
    NoPosts,
}

/// Everything the generator needs to produce a batch of posts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub input_bullets: Vec<String>,
    pub platform: Platform,
    pub tone: Tone,
    pub additional_context: Option<String>,
    /// Number of variants to produce (one per scheduled day).
    pub days: u32,
    pub include_hashtags: bool,
    pub include_images: bool,
}

#[derive(Clone)]
pub struct ContentGenerator {
    model: Arc<dyn TextModel>,
}

impl ContentGenerator {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self { model }
    }

    /// Produces `request.days` structured posts (fewer if the model under-delivers).
    pub async fn generate_posts(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<GeneratedPost>, GenerationError> {
        let prompt = build_posts_prompt(request);

        let raw = self.model.complete(&prompt).await.map_err(|e| {
            warn!("Post generation call failed: {e}");
            GenerationError::Failed(e)
        })?;

        let mut posts = parse_generated_posts(&raw);
        if posts.is_empty() {
            warn!(
                "Model response had no POST sections ({} chars)",
                raw.chars().count()
            );
            return Err(GenerationError::NoPosts);
        }
        if posts.len() != request.days as usize {
            warn!(
                "Requested {} posts, model returned {}",
                request.days,
                posts.len()
            );
        }

        for post in posts.iter_mut() {
            if request.include_hashtags && post.hashtags.is_empty() {
                post.hashtags = self
                    .generate_hashtags(&post.content, request.platform.as_str())
                    .await
                    .into_inner();
            }
            if !request.include_hashtags {
                post.hashtags.clear();
            }
            if request.include_images {
                post.image_suggestions = self
                    .generate_image_suggestions(&post.content)
                    .await
                    .into_inner();
            }
        }

        info!(
            "Generated {} {} posts ({} tone)",
            posts.len(),
            request.platform,
            request.tone
        );

        Ok(posts)
    }

    pub async fn generate_hashtags(&self, content: &str, platform: &str) -> Outcome<Vec<String>> {
        match self.model.complete(&build_hashtag_prompt(content, platform)).await {
            Ok(raw) => Outcome::Ok(extract_hashtags(&raw)),
            Err(e) => {
                warn!("Hashtag generation failed, continuing without: {e}");
                Outcome::Degraded(Vec::new())
            }
        }
    }

    pub async fn generate_image_suggestions(&self, content: &str) -> Outcome<Vec<String>> {
        match self.model.complete(&build_image_suggestion_prompt(content)).await {
            Ok(raw) => Outcome::Ok(parse_suggestions(&raw)),
            Err(e) => {
                warn!("Image suggestion generation failed, continuing without: {e}");
                Outcome::Degraded(Vec::new())
            }
        }
    }
}
