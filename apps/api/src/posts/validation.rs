//! Request validation for the posts API.
//!
//! Runs before any model or store call. Each failure names the offending field.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;

use crate::errors::AppError;
use crate::generation::generator::GenerationRequest;
use crate::generation::guidelines::{Platform, Tone};
use crate::posts::models::{PostFilter, PostPatch, PostStatus};
use crate::response::Pagination;

pub const MAX_BULLETS: usize = 10;
pub const MAX_BULLET_CHARS: usize = 500;
pub const MAX_DAYS: u32 = 7;
pub const MAX_CONTEXT_CHARS: usize = 1000;
pub const MAX_IMAGE_COUNT: usize = 5;
pub const DEFAULT_IMAGE_COUNT: usize = 3;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreatePostRequest {
    pub platform: Option<String>,
    pub tone: Option<String>,
    pub input_bullets: Option<Vec<String>>,
    pub additional_context: Option<String>,
    pub days: Option<u32>,
    pub include_hashtags: Option<bool>,
    pub include_images: Option<bool>,
    pub scheduled_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePostRequest {
    pub platform: Option<String>,
    pub tone: Option<String>,
    pub status: Option<String>,
    pub input_bullets: Option<Vec<String>>,
    pub generated_content: Option<Vec<String>>,
    pub hashtags: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
    pub scheduled_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListPostsQuery {
    pub platform: Option<String>,
    pub status: Option<String>,
    pub tone: Option<String>,
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegenerateRequest {
    pub additional_context: Option<String>,
    pub days: Option<u32>,
    pub include_hashtags: Option<bool>,
    pub include_images: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateImagesRequest {
    pub images: Option<Vec<String>>,
    pub count: Option<usize>,
}

/// A create request that passed validation.
#[derive(Debug, Clone)]
pub struct CreatePostInput {
    pub generation: GenerationRequest,
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Regeneration overrides; unset fields come from the stored post.
#[derive(Debug, Clone, Default)]
pub struct RegenerateInput {
    pub additional_context: Option<String>,
    pub days: Option<u32>,
    pub include_hashtags: bool,
    pub include_images: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImagesInput {
    /// Replace the stored list verbatim.
    Explicit(Vec<String>),
    /// Look up this many photos for the post.
    Generate { count: usize },
}

fn invalid(msg: impl Into<String>) -> AppError {
    AppError::Validation(msg.into())
}

fn parse_platform(raw: &str) -> Result<Platform, AppError> {
    raw.parse::<Platform>().map_err(invalid)
}

fn parse_tone(raw: &str) -> Result<Tone, AppError> {
    raw.parse::<Tone>().map_err(invalid)
}

fn parse_status(raw: &str) -> Result<PostStatus, AppError> {
    raw.parse::<PostStatus>().map_err(invalid)
}

pub fn validate_bullets(bullets: &[String]) -> Result<Vec<String>, AppError> {
    if bullets.is_empty() || bullets.len() > MAX_BULLETS {
        return Err(invalid(format!(
            "input_bullets must contain between 1 and {MAX_BULLETS} items"
        )));
    }
    bullets
        .iter()
        .enumerate()
        .map(|(i, bullet)| {
            let trimmed = bullet.trim();
            if trimmed.is_empty() {
                Err(invalid(format!("input_bullets[{i}] cannot be empty")))
            } else if trimmed.chars().count() > MAX_BULLET_CHARS {
                Err(invalid(format!(
                    "input_bullets[{i}] must be at most {MAX_BULLET_CHARS} characters"
                )))
            } else {
                Ok(trimmed.to_string())
            }
        })
        .collect()
}

fn validate_days(days: Option<u32>) -> Result<u32, AppError> {
    match days {
        None => Ok(1),
        Some(d) if (1..=MAX_DAYS).contains(&d) => Ok(d),
        Some(_) => Err(invalid(format!("days must be between 1 and {MAX_DAYS}"))),
    }
}

fn validate_context(context: Option<String>) -> Result<Option<String>, AppError> {
    match context.map(|c| c.trim().to_string()) {
        Some(c) if c.chars().count() > MAX_CONTEXT_CHARS => Err(invalid(format!(
            "additional_context must be at most {MAX_CONTEXT_CHARS} characters"
        ))),
        Some(c) if c.is_empty() => Ok(None),
        other => Ok(other),
    }
}

/// Parses an RFC 3339 timestamp that must lie strictly after `now`.
pub fn validate_scheduled_at(raw: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, AppError> {
    let parsed = DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| invalid("scheduled_at must be a valid ISO 8601 date"))?;
    if parsed <= now {
        return Err(invalid("scheduled_at must be in the future"));
    }
    Ok(parsed)
}

pub fn validate_hashtags(hashtags: &[String]) -> Result<Vec<String>, AppError> {
    hashtags
        .iter()
        .map(|tag| {
            let tag = tag.trim();
            if tag.starts_with('#') && tag.len() > 1 && !tag.contains(char::is_whitespace) {
                Ok(tag.to_string())
            } else {
                Err(invalid(format!("hashtag '{tag}' must start with #")))
            }
        })
        .collect()
}

fn validate_non_empty_strings(field: &str, values: &[String]) -> Result<Vec<String>, AppError> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| match v.trim() {
            "" => Err(invalid(format!("{field}[{i}] cannot be empty"))),
            trimmed => Ok(trimmed.to_string()),
        })
        .collect()
}

pub fn validate_create(
    req: CreatePostRequest,
    now: DateTime<Utc>,
) -> Result<CreatePostInput, AppError> {
    let platform = parse_platform(
        req.platform
            .as_deref()
            .ok_or_else(|| invalid("platform is required"))?,
    )?;
    let tone = parse_tone(req.tone.as_deref().ok_or_else(|| invalid("tone is required"))?)?;
    let input_bullets = validate_bullets(
        req.input_bullets
            .as_deref()
            .ok_or_else(|| invalid("input_bullets is required"))?,
    )?;
    let days = validate_days(req.days)?;
    let additional_context = validate_context(req.additional_context)?;
    let scheduled_at = req
        .scheduled_at
        .as_deref()
        .map(|raw| validate_scheduled_at(raw, now))
        .transpose()?;

    Ok(CreatePostInput {
        generation: GenerationRequest {
            input_bullets,
            platform,
            tone,
            additional_context,
            days,
            include_hashtags: req.include_hashtags.unwrap_or(true),
            include_images: req.include_images.unwrap_or(true),
        },
        scheduled_at,
    })
}

pub fn validate_update(req: UpdatePostRequest, now: DateTime<Utc>) -> Result<PostPatch, AppError> {
    let patch = PostPatch {
        platform: req.platform.as_deref().map(parse_platform).transpose()?,
        tone: req.tone.as_deref().map(parse_tone).transpose()?,
        status: req.status.as_deref().map(parse_status).transpose()?,
        input_bullets: req.input_bullets.as_deref().map(validate_bullets).transpose()?,
        generated_content: req
            .generated_content
            .as_deref()
            .map(|c| validate_non_empty_strings("generated_content", c))
            .transpose()?,
        hashtags: req.hashtags.as_deref().map(validate_hashtags).transpose()?,
        images: req
            .images
            .as_deref()
            .map(|i| validate_non_empty_strings("images", i))
            .transpose()?,
        scheduled_at: req
            .scheduled_at
            .as_deref()
            .map(|raw| validate_scheduled_at(raw, now))
            .transpose()?,
    };

    if patch.is_empty() {
        return Err(invalid("No fields to update"));
    }
    Ok(patch)
}

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates.
/// A plain end date covers the whole day.
fn parse_date_bound(field: &str, raw: &str, end_of_day: bool) -> Result<DateTime<Utc>, AppError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| invalid(format!("{field} must be a valid date")))?;
    let time = if end_of_day {
        NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)
    }
    .ok_or_else(|| invalid(format!("{field} must be a valid date")))?;
    Ok(date.and_time(time).and_utc())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub fn validate_list_query(query: ListPostsQuery) -> Result<(PostFilter, Pagination), AppError> {
    let start_date = non_blank(query.start_date)
        .map(|raw| parse_date_bound("startDate", &raw, false))
        .transpose()?;
    let end_date = non_blank(query.end_date)
        .map(|raw| parse_date_bound("endDate", &raw, true))
        .transpose()?;
    if let (Some(start), Some(end)) = (start_date, end_date) {
        if start > end {
            return Err(invalid("startDate must be before endDate"));
        }
    }

    let filter = PostFilter {
        platform: non_blank(query.platform)
            .as_deref()
            .map(parse_platform)
            .transpose()?,
        status: non_blank(query.status)
            .as_deref()
            .map(parse_status)
            .transpose()?,
        tone: non_blank(query.tone).as_deref().map(parse_tone).transpose()?,
        start_date,
        end_date,
        search: non_blank(query.search),
    };

    Ok((filter, Pagination::from_query(query.page, query.limit)))
}

pub fn validate_regenerate(req: RegenerateRequest) -> Result<RegenerateInput, AppError> {
    Ok(RegenerateInput {
        additional_context: validate_context(req.additional_context)?,
        days: req.days.map(|d| validate_days(Some(d))).transpose()?,
        include_hashtags: req.include_hashtags.unwrap_or(true),
        include_images: req.include_images.unwrap_or(true),
    })
}

pub fn validate_images(req: UpdateImagesRequest) -> Result<ImagesInput, AppError> {
    if let Some(images) = req.images {
        return Ok(ImagesInput::Explicit(validate_non_empty_strings(
            "images", &images,
        )?));
    }
    match req.count {
        None => Ok(ImagesInput::Generate {
            count: DEFAULT_IMAGE_COUNT,
        }),
        Some(count) if (1..=MAX_IMAGE_COUNT).contains(&count) => {
            Ok(ImagesInput::Generate { count })
        }
        Some(_) => Err(invalid(format!(
            "count must be between 1 and {MAX_IMAGE_COUNT}"
        ))),
    }
}
