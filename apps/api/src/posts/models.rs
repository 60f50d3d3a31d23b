use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::generation::guidelines::{Platform, Tone};
use crate::images::ImageRecord;

/// A row of the `posts` table. Enum columns are stored as lowercase text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PostRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub platform: String,
    pub tone: String,
    pub input_bullets: Vec<String>,
    pub generated_content: Vec<String>,
    pub hashtags: Vec<String>,
    pub images: Vec<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Scheduled,
    Published,
    Archived,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Scheduled => "scheduled",
            PostStatus::Published => "published",
            PostStatus::Archived => "archived",
        }
    }
}

impl FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(PostStatus::Draft),
            "scheduled" => Ok(PostStatus::Scheduled),
            "published" => Ok(PostStatus::Published),
            "archived" => Ok(PostStatus::Archived),
            _ => Err("status must be one of: draft, scheduled, published, archived".to_string()),
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values for a new `posts` row; id and timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub user_id: Uuid,
    pub platform: Platform,
    pub tone: Tone,
    pub input_bullets: Vec<String>,
    pub generated_content: Vec<String>,
    pub hashtags: Vec<String>,
    pub images: Vec<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub status: PostStatus,
}

/// Partial update. `None` leaves a column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostPatch {
    pub platform: Option<Platform>,
    pub tone: Option<Tone>,
    pub status: Option<PostStatus>,
    pub input_bullets: Option<Vec<String>>,
    pub generated_content: Option<Vec<String>>,
    pub hashtags: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl PostPatch {
    pub fn is_empty(&self) -> bool {
        *self == PostPatch::default()
    }
}

/// Listing filters; all are optional and combined with AND.
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub platform: Option<Platform>,
    pub status: Option<PostStatus>,
    pub tone: Option<Tone>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// Case-insensitive substring match over bullets and generated content.
    pub search: Option<String>,
}

/// In-memory mirror of the SQL filter in `PgPostStore`.
#[cfg(test)]
impl PostFilter {
    pub fn matches(&self, post: &PostRow) -> bool {
        if self.platform.is_some_and(|p| p.as_str() != post.platform) {
            return false;
        }
        if self.status.is_some_and(|s| s.as_str() != post.status) {
            return false;
        }
        if self.tone.is_some_and(|t| t.as_str() != post.tone) {
            return false;
        }
        if self.start_date.is_some_and(|start| post.created_at < start) {
            return false;
        }
        if self.end_date.is_some_and(|end| post.created_at > end) {
            return false;
        }
        match self.search.as_deref() {
            Some(needle) => {
                let needle = needle.to_lowercase();
                post.input_bullets
                    .iter()
                    .chain(post.generated_content.iter())
                    .any(|text| text.to_lowercase().contains(&needle))
            }
            None => true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPage {
    pub posts: Vec<PostRow>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub has_more: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostStats {
    pub total: i64,
    pub by_status: BTreeMap<String, i64>,
    pub by_platform: BTreeMap<String, i64>,
    pub by_tone: BTreeMap<String, i64>,
}

impl PostStats {
    pub fn tally(posts: &[PostRow]) -> Self {
        let mut stats = PostStats {
            total: posts.len() as i64,
            ..Default::default()
        };
        for post in posts {
            *stats.by_status.entry(post.status.clone()).or_default() += 1;
            *stats.by_platform.entry(post.platform.clone()).or_default() += 1;
            *stats.by_tone.entry(post.tone.clone()).or_default() += 1;
        }
        stats
    }
}

/// Result of `PUT /posts/:id/images`.
#[derive(Debug, Clone, Serialize)]
pub struct ImagesUpdate {
    pub post: PostRow,
    pub images: Vec<ImageRecord>,
    /// True when placeholder images were used.
    pub placeholder: bool,
}
