use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::posts::models::{ImagesUpdate, PostPage, PostRow, PostStats};
use crate::posts::validation::{
    validate_create, validate_images, validate_list_query, validate_regenerate, validate_update,
    CreatePostRequest, ListPostsQuery, RegenerateRequest, UpdateImagesRequest, UpdatePostRequest,
};
use crate::response::{self, ApiResponse};
use crate::state::AppState;

type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

/// A request sent without a JSON body takes the defaults; a JSON body must parse.
fn optional_body<T: Default>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    match body {
        Ok(Json(req)) => Ok(req),
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(T::default()),
        Err(rejection) => Err(rejection.into()),
    }
}

/// POST /api/v1/posts
pub async fn handle_create_post(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<CreatePostRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<PostRow>>), AppError> {
    let Json(req) = body?;
    let input = validate_create(req, Utc::now())?;
    let post = state.posts.create_post(user.id, input).await?;
    Ok(response::created(post, "Post created successfully"))
}

/// GET /api/v1/posts
pub async fn handle_list_posts(
    State(state): State<AppState>,
    user: AuthUser,
    query: Result<Query<ListPostsQuery>, QueryRejection>,
) -> ApiResult<PostPage> {
    let Query(query) = query?;
    let (filter, page) = validate_list_query(query)?;
    let posts = state.posts.get_posts(user.id, filter, page).await?;
    Ok(response::ok(posts))
}

/// GET /api/v1/posts/stats
pub async fn handle_post_stats(State(state): State<AppState>, user: AuthUser) -> ApiResult<PostStats> {
    Ok(response::ok(state.posts.get_post_stats(user.id).await?))
}

/// GET /api/v1/posts/scheduled
pub async fn handle_scheduled_posts(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Vec<PostRow>> {
    Ok(response::ok(state.posts.get_scheduled_posts(user.id).await?))
}

/// GET /api/v1/posts/:id
pub async fn handle_get_post(
    State(state): State<AppState>,
    user: AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<PostRow> {
    let Path(id) = id?;
    Ok(response::ok(state.posts.get_post_by_id(user.id, id).await?))
}

/// PUT /api/v1/posts/:id
pub async fn handle_update_post(
    State(state): State<AppState>,
    user: AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<UpdatePostRequest>, JsonRejection>,
) -> ApiResult<PostRow> {
    let Path(id) = id?;
    let Json(req) = body?;
    let patch = validate_update(req, Utc::now())?;
    let post = state.posts.update_post(user.id, id, patch).await?;
    Ok(response::ok_with_message(post, "Post updated successfully"))
}

/// POST /api/v1/posts/:id/regenerate
///
/// The body is optional; an empty request regenerates with the stored inputs.
pub async fn handle_regenerate_post(
    State(state): State<AppState>,
    user: AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<RegenerateRequest>, JsonRejection>,
) -> ApiResult<PostRow> {
    let Path(id) = id?;
    let req = optional_body(body)?;
    let input = validate_regenerate(req)?;
    let post = state.posts.regenerate_content(user.id, id, input).await?;
    Ok(response::ok_with_message(post, "Content regenerated successfully"))
}

/// PUT /api/v1/posts/:id/images
pub async fn handle_update_images(
    State(state): State<AppState>,
    user: AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<UpdateImagesRequest>, JsonRejection>,
) -> ApiResult<ImagesUpdate> {
    let Path(id) = id?;
    let req = optional_body(body)?;
    let input = validate_images(req)?;
    let update = state.posts.update_images(user.id, id, input).await?;
    let message = if update.placeholder {
        "Images updated with placeholders"
    } else {
        "Images updated successfully"
    };
    Ok(response::ok_with_message(update, message))
}

/// DELETE /api/v1/posts/:id
pub async fn handle_delete_post(
    State(state): State<AppState>,
    user: AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let Path(id) = id?;
    state.posts.delete_post(user.id, id).await?;
    Ok(response::message_only("Post deleted successfully"))
}
