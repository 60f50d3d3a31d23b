//! Post persistence. Every query is scoped by owner id.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

pub use crate::db::StoreError;
use crate::posts::models::{NewPost, PostFilter, PostPatch, PostRow};
use crate::response::Pagination;

#[async_trait]
pub trait PostStore: Send + Sync {
    async fn insert_post(&self, new: NewPost) -> Result<PostRow, StoreError>;

    async fn find_post(&self, user_id: Uuid, id: Uuid) -> Result<Option<PostRow>, StoreError>;

    /// One page of matching posts, newest first, plus the total match count.
    async fn list_posts(
        &self,
        user_id: Uuid,
        filter: &PostFilter,
        page: Pagination,
    ) -> Result<(Vec<PostRow>, i64), StoreError>;

    async fn list_all_posts(&self, user_id: Uuid) -> Result<Vec<PostRow>, StoreError>;

    /// Posts with status `scheduled`, soonest first.
    async fn list_scheduled_posts(&self, user_id: Uuid) -> Result<Vec<PostRow>, StoreError>;

    /// Returns `None` when no row matches `(user_id, id)`.
    async fn update_post(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: &PostPatch,
    ) -> Result<Option<PostRow>, StoreError>;

    /// Returns whether a row was removed.
    async fn delete_post(&self, user_id: Uuid, id: Uuid) -> Result<bool, StoreError>;
}

#[derive(Clone)]
pub struct PgPostStore {
    pool: PgPool,
}

impl PgPostStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Escapes LIKE wildcards so user search text matches literally.
fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, user_id: Uuid, filter: &PostFilter) {
    qb.push(" WHERE user_id = ").push_bind(user_id);
    if let Some(platform) = filter.platform {
        qb.push(" AND platform = ").push_bind(platform.as_str());
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(tone) = filter.tone {
        qb.push(" AND tone = ").push_bind(tone.as_str());
    }
    if let Some(start) = filter.start_date {
        qb.push(" AND created_at >= ").push_bind(start);
    }
    if let Some(end) = filter.end_date {
        qb.push(" AND created_at <= ").push_bind(end);
    }
    if let Some(search) = filter.search.as_deref() {
        let pattern = like_pattern(search);
        qb.push(" AND (array_to_string(input_bullets, ' ') ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR array_to_string(generated_content, ' ') ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait]
impl PostStore for PgPostStore {
    async fn insert_post(&self, new: NewPost) -> Result<PostRow, StoreError> {
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            INSERT INTO posts
                (user_id, platform, tone, input_bullets, generated_content,
                 hashtags, images, scheduled_at, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(new.user_id)
        .bind(new.platform.as_str())
        .bind(new.tone.as_str())
        .bind(&new.input_bullets)
        .bind(&new.generated_content)
        .bind(&new.hashtags)
        .bind(&new.images)
        .bind(new.scheduled_at)
        .bind(new.status.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_post(&self, user_id: Uuid, id: Uuid) -> Result<Option<PostRow>, StoreError> {
        Ok(
            sqlx::query_as::<_, PostRow>("SELECT * FROM posts WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn list_posts(
        &self,
        user_id: Uuid,
        filter: &PostFilter,
        page: Pagination,
    ) -> Result<(Vec<PostRow>, i64), StoreError> {
        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM posts");
        push_filters(&mut count_query, user_id, filter);
        let total: i64 = count_query
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut rows_query = QueryBuilder::<Postgres>::new("SELECT * FROM posts");
        push_filters(&mut rows_query, user_id, filter);
        rows_query
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(page.limit as i64)
            .push(" OFFSET ")
            .push_bind(page.offset());
        let posts = rows_query
            .build_query_as::<PostRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok((posts, total))
    }

    async fn list_all_posts(&self, user_id: Uuid) -> Result<Vec<PostRow>, StoreError> {
        Ok(sqlx::query_as::<_, PostRow>(
            "SELECT * FROM posts WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn list_scheduled_posts(&self, user_id: Uuid) -> Result<Vec<PostRow>, StoreError> {
        Ok(sqlx::query_as::<_, PostRow>(
            r#"
            SELECT * FROM posts
            WHERE user_id = $1 AND status = 'scheduled'
            ORDER BY scheduled_at ASC NULLS LAST
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn update_post(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: &PostPatch,
    ) -> Result<Option<PostRow>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE posts SET updated_at = now()");
        if let Some(platform) = patch.platform {
            qb.push(", platform = ").push_bind(platform.as_str());
        }
        if let Some(tone) = patch.tone {
            qb.push(", tone = ").push_bind(tone.as_str());
        }
        if let Some(status) = patch.status {
            qb.push(", status = ").push_bind(status.as_str());
        }
        if let Some(bullets) = &patch.input_bullets {
            qb.push(", input_bullets = ").push_bind(bullets.clone());
        }
        if let Some(content) = &patch.generated_content {
            qb.push(", generated_content = ").push_bind(content.clone());
        }
        if let Some(hashtags) = &patch.hashtags {
            qb.push(", hashtags = ").push_bind(hashtags.clone());
        }
        if let Some(images) = &patch.images {
            qb.push(", images = ").push_bind(images.clone());
        }
        if let Some(scheduled_at) = patch.scheduled_at {
            qb.push(", scheduled_at = ").push_bind(scheduled_at);
        }
        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(" AND user_id = ")
            .push_bind(user_id)
            .push(" RETURNING *");

        Ok(qb
            .build_query_as::<PostRow>()
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_post(&self, user_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::guidelines::{Platform, Tone};
    use crate::posts::models::PostStatus;
    use chrono::{Duration, Utc};

    fn new_post(user_id: Uuid, platform: Platform, text: &str) -> NewPost {
        NewPost {
            user_id,
            platform,
            tone: Tone::Professional,
            input_bullets: vec![text.to_string()],
            generated_content: vec![format!("{text}!")],
            hashtags: vec![],
            images: vec![],
            scheduled_at: None,
            status: PostStatus::Draft,
        }
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("plain"), "%plain%");
    }

    #[test]
    fn test_filters_render_in_order() {
        let filter = PostFilter {
            platform: Some(Platform::Twitter),
            search: Some("launch".to_string()),
            ..Default::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM posts");
        push_filters(&mut qb, Uuid::nil(), &filter);
        assert_eq!(
            qb.sql(),
            "SELECT * FROM posts WHERE user_id = $1 AND platform = $2 AND \
             (array_to_string(input_bullets, ' ') ILIKE $3 OR \
             array_to_string(generated_content, ' ') ILIKE $4)"
        );
    }

    #[sqlx::test]
    #[ignore = "Requires a Postgres DATABASE_URL"]
    async fn test_list_posts_filters_in_postgres(pool: PgPool) {
        let store = PgPostStore::new(pool.clone());
        let owner = Uuid::new_v4();
        let launch = store
            .insert_post(new_post(owner, Platform::Twitter, "Launched 50% faster builds"))
            .await
            .unwrap();
        let hiring = store
            .insert_post(new_post(owner, Platform::Linkedin, "We are hiring"))
            .await
            .unwrap();
        store
            .insert_post(new_post(Uuid::new_v4(), Platform::Twitter, "Launched elsewhere"))
            .await
            .unwrap();
        sqlx::query("UPDATE posts SET created_at = $1 WHERE id = $2")
            .bind(Utc::now() - Duration::days(10))
            .bind(hiring.id)
            .execute(&pool)
            .await
            .unwrap();

        let page = Pagination::from_query(None, None);
        let list = |filter: PostFilter| {
            let store = store.clone();
            async move { store.list_posts(owner, &filter, page).await.unwrap() }
        };

        let (rows, total) = list(PostFilter::default()).await;
        assert_eq!(total, 2);
        assert_eq!(rows[0].id, launch.id);

        let (rows, total) = list(PostFilter {
            search: Some("launched 50%".to_string()),
            ..Default::default()
        })
        .await;
        assert_eq!(total, 1);
        assert_eq!(rows[0].id, launch.id);

        let (_, total) = list(PostFilter {
            search: Some("5_%".to_string()),
            ..Default::default()
        })
        .await;
        assert_eq!(total, 0);

        let (rows, _) = list(PostFilter {
            start_date: Some(Utc::now() - Duration::days(11)),
            end_date: Some(Utc::now() - Duration::days(9)),
            ..Default::default()
        })
        .await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, hiring.id);

        let (rows, _) = list(PostFilter {
            platform: Some(Platform::Linkedin),
            start_date: Some(Utc::now() - Duration::days(1)),
            ..Default::default()
        })
        .await;
        assert!(rows.is_empty());
    }
}
