//! Post service: CRUD, listing and stats, composed with content generation.
//!
//! Store failures are logged here and surfaced as a generic
//! `AppError::Operation`; callers never see driver errors.

use std::sync::Arc;

use tracing::{error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::generator::{ContentGenerator, GenerationError, GenerationRequest};
use crate::generation::guidelines::{Platform, Tone};
use crate::generation::parser::GeneratedPost;
use crate::images::ImageService;
use crate::posts::models::{
    ImagesUpdate, NewPost, PostFilter, PostPage, PostPatch, PostRow, PostStats, PostStatus,
};
use crate::posts::store::{PostStore, StoreError};
use crate::posts::validation::{CreatePostInput, ImagesInput, RegenerateInput, MAX_DAYS};
use crate::response::Pagination;

fn store_failure(action: &'static str) -> impl FnOnce(StoreError) -> AppError {
    move |e| {
        error!("Failed to {action}: {e}");
        AppError::Operation(format!("Failed to {action}"))
    }
}

fn generation_failure(e: GenerationError) -> AppError {
    error!("{e}");
    AppError::Operation("Failed to generate posts".to_string())
}

fn post_not_found() -> AppError {
    AppError::NotFound("Post not found".to_string())
}

/// Flattens generated fragments into the post's stored columns.
/// Hashtags and image suggestions are de-duplicated, first occurrence wins.
fn aggregate(posts: Vec<GeneratedPost>) -> (Vec<String>, Vec<String>, Vec<String>) {
    let mut content = Vec::with_capacity(posts.len());
    let mut hashtags: Vec<String> = Vec::new();
    let mut images: Vec<String> = Vec::new();

    for post in posts {
        content.push(post.content);
        for tag in post.hashtags {
            if !hashtags.contains(&tag) {
                hashtags.push(tag);
            }
        }
        for suggestion in post.image_suggestions {
            if !images.contains(&suggestion) {
                images.push(suggestion);
            }
        }
    }
    (content, hashtags, images)
}

#[derive(Clone)]
pub struct PostService {
    store: Arc<dyn PostStore>,
    generator: ContentGenerator,
    images: ImageService,
}

impl PostService {
    pub fn new(store: Arc<dyn PostStore>, generator: ContentGenerator, images: ImageService) -> Self {
        Self {
            store,
            generator,
            images,
        }
    }

    pub async fn create_post(&self, user_id: Uuid, input: CreatePostInput) -> Result<PostRow, AppError> {
        let generated = self
            .generator
            .generate_posts(&input.generation)
            .await
            .map_err(generation_failure)?;
        let (generated_content, hashtags, images) = aggregate(generated);

        let post = self
            .store
            .insert_post(NewPost {
                user_id,
                platform: input.generation.platform,
                tone: input.generation.tone,
                input_bullets: input.generation.input_bullets,
                generated_content,
                hashtags,
                images,
                scheduled_at: input.scheduled_at,
                status: PostStatus::Draft,
            })
            .await
            .map_err(store_failure("create post"))?;

        info!("Created post {} for user {}", post.id, user_id);
        Ok(post)
    }

    pub async fn get_post_by_id(&self, user_id: Uuid, id: Uuid) -> Result<PostRow, AppError> {
        self.store
            .find_post(user_id, id)
            .await
            .map_err(store_failure("fetch post"))?
            .ok_or_else(post_not_found)
    }

    pub async fn get_posts(
        &self,
        user_id: Uuid,
        filter: PostFilter,
        page: Pagination,
    ) -> Result<PostPage, AppError> {
        let (posts, total) = self
            .store
            .list_posts(user_id, &filter, page)
            .await
            .map_err(store_failure("fetch posts"))?;

        Ok(PostPage {
            posts,
            total,
            page: page.page,
            limit: page.limit,
            has_more: page.has_more(total),
        })
    }

    pub async fn get_scheduled_posts(&self, user_id: Uuid) -> Result<Vec<PostRow>, AppError> {
        self.store
            .list_scheduled_posts(user_id)
            .await
            .map_err(store_failure("fetch scheduled posts"))
    }

    pub async fn update_post(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: PostPatch,
    ) -> Result<PostRow, AppError> {
        // Ownership check first; the update itself is also owner-scoped.
        self.get_post_by_id(user_id, id).await?;

        let post = self
            .store
            .update_post(user_id, id, &patch)
            .await
            .map_err(store_failure("update post"))?
            .ok_or_else(post_not_found)?;

        info!("Updated post {id} for user {user_id}");
        Ok(post)
    }

    pub async fn regenerate_content(
        &self,
        user_id: Uuid,
        id: Uuid,
        input: RegenerateInput,
    ) -> Result<PostRow, AppError> {
        let existing = self.get_post_by_id(user_id, id).await?;

        let request = GenerationRequest {
            platform: existing
                .platform
                .parse::<Platform>()
                .map_err(|e| AppError::Internal(anyhow::anyhow!("stored post {id}: {e}")))?,
            tone: existing
                .tone
                .parse::<Tone>()
                .map_err(|e| AppError::Internal(anyhow::anyhow!("stored post {id}: {e}")))?,
            days: input.days.unwrap_or_else(|| {
                existing.generated_content.len().clamp(1, MAX_DAYS as usize) as u32
            }),
            input_bullets: existing.input_bullets,
            additional_context: input.additional_context,
            include_hashtags: input.include_hashtags,
            include_images: input.include_images,
        };

        let generated = self
            .generator
            .generate_posts(&request)
            .await
            .map_err(generation_failure)?;
        let (generated_content, hashtags, images) = aggregate(generated);

        let patch = PostPatch {
            generated_content: Some(generated_content),
            hashtags: Some(hashtags),
            images: Some(images),
            ..Default::default()
        };
        let post = self
            .store
            .update_post(user_id, id, &patch)
            .await
            .map_err(store_failure("regenerate post content"))?
            .ok_or_else(post_not_found)?;

        info!("Regenerated content for post {id}");
        Ok(post)
    }

    pub async fn update_images(
        &self,
        user_id: Uuid,
        id: Uuid,
        input: ImagesInput,
    ) -> Result<ImagesUpdate, AppError> {
        let existing = self.get_post_by_id(user_id, id).await?;

        let (urls, records, placeholder) = match input {
            ImagesInput::Explicit(urls) => (urls, Vec::new(), false),
            ImagesInput::Generate { count } => {
                let content = existing
                    .generated_content
                    .first()
                    .cloned()
                    .unwrap_or_else(|| existing.input_bullets.join("\n"));
                let outcome = self
                    .images
                    .generate_images_for_post(&content, &existing.platform, &existing.tone, count)
                    .await;
                let placeholder = outcome.is_degraded();
                let records = outcome.into_inner();
                let urls = records.iter().map(|r| r.url.clone()).collect();
                (urls, records, placeholder)
            }
        };

        let patch = PostPatch {
            images: Some(urls),
            ..Default::default()
        };
        let post = self
            .store
            .update_post(user_id, id, &patch)
            .await
            .map_err(store_failure("update post images"))?
            .ok_or_else(post_not_found)?;

        Ok(ImagesUpdate {
            post,
            images: records,
            placeholder,
        })
    }

    pub async fn delete_post(&self, user_id: Uuid, id: Uuid) -> Result<(), AppError> {
        self.get_post_by_id(user_id, id).await?;

        let deleted = self
            .store
            .delete_post(user_id, id)
            .await
            .map_err(store_failure("delete post"))?;
        if !deleted {
            return Err(post_not_found());
        }

        info!("Deleted post {id} for user {user_id}");
        Ok(())
    }

    pub async fn get_post_stats(&self, user_id: Uuid) -> Result<PostStats, AppError> {
        let posts = self
            .store
            .list_all_posts(user_id)
            .await
            .map_err(store_failure("fetch post stats"))?;
        Ok(PostStats::tally(&posts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::placeholder_images;
    use crate::llm_client::LlmError;
    use crate::test_support::{sample_post, InMemoryPostStore, ScriptedModel};

    fn service(model: Arc<ScriptedModel>, store: Arc<InMemoryPostStore>) -> PostService {
        PostService::new(
            store,
            ContentGenerator::new(model.clone()),
            ImageService::new(model, None),
        )
    }

    fn create_input(days: u32) -> CreatePostInput {
        CreatePostInput {
            generation: GenerationRequest {
                input_bullets: vec!["Launched v2".to_string()],
                platform: Platform::Linkedin,
                tone: Tone::Professional,
                additional_context: None,
                days,
                include_hashtags: true,
                include_images: true,
            },
            scheduled_at: None,
        }
    }

    #[test]
    fn test_aggregate_dedupes_hashtags_and_suggestions() {
        let (content, hashtags, images) = aggregate(vec![
            GeneratedPost {
                content: "one".into(),
                hashtags: vec!["#a".into(), "#b".into()],
                image_suggestions: vec!["desk".into()],
            },
            GeneratedPost {
                content: "two".into(),
                hashtags: vec!["#b".into(), "#c".into()],
                image_suggestions: vec!["desk".into(), "city".into()],
            },
        ]);
        assert_eq!(content, vec!["one", "two"]);
        assert_eq!(hashtags, vec!["#a", "#b", "#c"]);
        assert_eq!(images, vec!["desk", "city"]);
    }

    #[tokio::test]
    async fn test_create_post_persists_draft() {
        let model = ScriptedModel::new(vec![
            Ok("POST 1:\nWe launched v2!\n#launch".to_string()),
            Ok("rocket launch".to_string()),
        ]);
        let store = InMemoryPostStore::new();
        let svc = service(model, store.clone());
        let user = Uuid::new_v4();

        let post = svc.create_post(user, create_input(1)).await.unwrap();

        assert_eq!(post.status, "draft");
        assert_eq!(post.user_id, user);
        assert_eq!(post.generated_content, vec!["We launched v2!"]);
        assert_eq!(post.hashtags, vec!["#launch"]);
        assert_eq!(post.images, vec!["rocket launch"]);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_create_post_generation_failure_writes_nothing() {
        let model = ScriptedModel::new(vec![Err(LlmError::MissingApiKey)]);
        let store = InMemoryPostStore::new();
        let svc = service(model, store.clone());

        let err = svc.create_post(Uuid::new_v4(), create_input(1)).await.unwrap_err();
        assert!(matches!(err, AppError::Operation(ref m) if m == "Failed to generate posts"));
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_is_generic() {
        let model = ScriptedModel::new(vec![]);
        let store = InMemoryPostStore::new();
        store.fail_next();
        let svc = service(model, store);

        let err = svc.get_post_stats(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::Operation(ref m) if m == "Failed to fetch post stats"));
    }

    #[tokio::test]
    async fn test_update_post_of_other_user_is_not_found() {
        let store = InMemoryPostStore::new();
        let owner = Uuid::new_v4();
        let post = store.seed(sample_post(owner, "twitter", "draft"));
        let svc = service(ScriptedModel::new(vec![]), store.clone());

        let patch = PostPatch {
            status: Some(PostStatus::Archived),
            ..Default::default()
        };
        let err = svc.update_post(Uuid::new_v4(), post.id, patch.clone()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let updated = svc.update_post(owner, post.id, patch).await.unwrap();
        assert_eq!(updated.status, "archived");
    }

    #[tokio::test]
    async fn test_regenerate_uses_stored_inputs_and_overwrites() {
        let store = InMemoryPostStore::new();
        let owner = Uuid::new_v4();
        let mut seeded = sample_post(owner, "tiktok", "draft");
        seeded.tone = "humorous".to_string();
        seeded.generated_content = vec!["old one".into(), "old two".into()];
        let post = store.seed(seeded);

        let model = ScriptedModel::new(vec![
            Ok("POST 1:\nnew one\n#x\nPOST 2:\nnew two\n#y".to_string()),
            Ok("dance".to_string()),
            Ok("music".to_string()),
        ]);
        let svc = service(model.clone(), store);

        let updated = svc
            .regenerate_content(owner, post.id, RegenerateInput {
                include_hashtags: true,
                include_images: true,
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(updated.generated_content, vec!["new one", "new two"]);
        assert_eq!(updated.hashtags, vec!["#x", "#y"]);
        assert_eq!(updated.images, vec!["dance", "music"]);
        assert!(model.prompts()[0].contains("Generate 2 different tiktok posts"));
        assert!(model.prompts()[0].contains("humorous"));
    }

    #[tokio::test]
    async fn test_update_images_without_photo_key_stores_placeholders() {
        let store = InMemoryPostStore::new();
        let owner = Uuid::new_v4();
        let post = store.seed(sample_post(owner, "instagram", "draft"));
        let svc = service(ScriptedModel::new(vec![]), store);

        let result = svc
            .update_images(owner, post.id, ImagesInput::Generate { count: 3 })
            .await
            .unwrap();

        assert!(result.placeholder);
        assert_eq!(result.images, placeholder_images());
        assert_eq!(result.post.images.len(), placeholder_images().len());
    }

    #[tokio::test]
    async fn test_update_images_explicit_list() {
        let store = InMemoryPostStore::new();
        let owner = Uuid::new_v4();
        let post = store.seed(sample_post(owner, "instagram", "draft"));
        let svc = service(ScriptedModel::new(vec![]), store);

        let result = svc
            .update_images(owner, post.id, ImagesInput::Explicit(vec!["https://img.test/1.jpg".into()]))
            .await
            .unwrap();
        assert!(!result.placeholder);
        assert_eq!(result.post.images, vec!["https://img.test/1.jpg"]);
    }

    #[tokio::test]
    async fn test_stats_counts_only_callers_posts() {
        let store = InMemoryPostStore::new();
        let me = Uuid::new_v4();
        store.seed(sample_post(me, "twitter", "draft"));
        store.seed(sample_post(me, "linkedin", "published"));
        store.seed(sample_post(Uuid::new_v4(), "twitter", "draft"));
        let svc = service(ScriptedModel::new(vec![]), store);

        let stats = svc.get_post_stats(me).await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.by_platform["twitter"], 1);
        assert_eq!(stats.by_status["published"], 1);
    }
}
