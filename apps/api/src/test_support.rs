//! In-memory fakes for the external collaborators, shared by unit and router tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::google::{GoogleClaims, GoogleTokenError, GoogleVerifier};
use crate::auth::identity::{IdentityError, IdentityProvider, IdentityUser, NewIdentityUser, Session};
use crate::auth::profiles::{Profile, ProfileStore};
use crate::auth::service::AuthService;
use crate::db::StoreError;
use crate::generation::generator::ContentGenerator;
use crate::images::unsplash::PhotoError;
use crate::images::{ImageRecord, ImageService, PhotoSearch};
use crate::llm_client::{LlmError, TextModel};
use crate::posts::models::{NewPost, PostFilter, PostPatch, PostRow};
use crate::posts::service::PostService;
use crate::posts::store::PostStore;
use crate::response::Pagination;
use crate::routes::build_router;
use crate::routes::health::TableProbe;
use crate::state::AppState;

fn store_down() -> StoreError {
    StoreError::Database(sqlx::Error::PoolTimedOut)
}

/// Replays canned completions in order and records every prompt.
/// Once the script runs out, calls fail with `EmptyContent`.
pub struct ScriptedModel {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(script: Vec<Result<String, LlmError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyContent))
    }
}

/// Photo search that finds exactly the configured terms.
pub struct FakePhotos {
    hits: HashSet<String>,
    failing: Mutex<HashSet<String>>,
    queries: Mutex<Vec<String>>,
}

impl FakePhotos {
    pub fn new(hits: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            hits: hits.iter().map(|h| h.to_string()).collect(),
            failing: Mutex::new(HashSet::new()),
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn failing_on(self: Arc<Self>, term: &str) -> Arc<Self> {
        self.failing.lock().unwrap().insert(term.to_string());
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl PhotoSearch for FakePhotos {
    async fn search_first(&self, query: &str) -> Result<Option<ImageRecord>, PhotoError> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.failing.lock().unwrap().contains(query) {
            return Err(PhotoError::Api {
                status: 500,
                message: "search unavailable".to_string(),
            });
        }
        Ok(self.hits.contains(query).then(|| ImageRecord {
            id: format!("photo-{query}"),
            url: format!("https://img.test/{query}.jpg"),
            alt: query.to_string(),
            photographer: "Tester".to_string(),
            download_url: format!("https://img.test/{query}/download"),
        }))
    }
}

pub fn sample_post(user_id: Uuid, platform: &str, status: &str) -> PostRow {
    let now = Utc::now();
    PostRow {
        id: Uuid::new_v4(),
        user_id,
        platform: platform.to_string(),
        tone: "professional".to_string(),
        input_bullets: vec!["Launched v2".to_string()],
        generated_content: vec!["We launched v2".to_string()],
        hashtags: vec!["#launch".to_string()],
        images: vec![],
        scheduled_at: None,
        status: status.to_string(),
        created_at: now,
        updated_at: now,
    }
}

#[derive(Default)]
pub struct InMemoryPostStore {
    rows: Mutex<Vec<PostRow>>,
    fail_next: AtomicBool,
    delete_calls: AtomicUsize,
}

impl InMemoryPostStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed(&self, row: PostRow) -> PostRow {
        self.rows.lock().unwrap().push(row.clone());
        row
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn get(&self, id: Uuid) -> Option<PostRow> {
        self.rows.lock().unwrap().iter().find(|r| r.id == id).cloned()
    }

    /// Makes the next store call fail.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(store_down());
        }
        Ok(())
    }

    fn owned(&self, user_id: Uuid) -> Vec<PostRow> {
        let mut rows: Vec<PostRow> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows
    }
}

#[async_trait]
impl PostStore for InMemoryPostStore {
    async fn insert_post(&self, new: NewPost) -> Result<PostRow, StoreError> {
        self.check()?;
        let now = Utc::now();
        Ok(self.seed(PostRow {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            platform: new.platform.as_str().to_string(),
            tone: new.tone.as_str().to_string(),
            input_bullets: new.input_bullets,
            generated_content: new.generated_content,
            hashtags: new.hashtags,
            images: new.images,
            scheduled_at: new.scheduled_at,
            status: new.status.as_str().to_string(),
            created_at: now,
            updated_at: now,
        }))
    }

    async fn find_post(&self, user_id: Uuid, id: Uuid) -> Result<Option<PostRow>, StoreError> {
        self.check()?;
        Ok(self.get(id).filter(|r| r.user_id == user_id))
    }

    async fn list_posts(
        &self,
        user_id: Uuid,
        filter: &PostFilter,
        page: Pagination,
    ) -> Result<(Vec<PostRow>, i64), StoreError> {
        self.check()?;
        let matching: Vec<PostRow> = self
            .owned(user_id)
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect();
        let total = matching.len() as i64;
        let posts = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect();
        Ok((posts, total))
    }

    async fn list_all_posts(&self, user_id: Uuid) -> Result<Vec<PostRow>, StoreError> {
        self.check()?;
        Ok(self.owned(user_id))
    }

    async fn list_scheduled_posts(&self, user_id: Uuid) -> Result<Vec<PostRow>, StoreError> {
        self.check()?;
        let mut rows: Vec<PostRow> = self
            .owned(user_id)
            .into_iter()
            .filter(|r| r.status == "scheduled")
            .collect();
        rows.sort_by_key(|r| (r.scheduled_at.is_none(), r.scheduled_at));
        Ok(rows)
    }

    async fn update_post(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: &PostPatch,
    ) -> Result<Option<PostRow>, StoreError> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows.iter_mut().find(|r| r.id == id && r.user_id == user_id) else {
            return Ok(None);
        };
        if let Some(platform) = patch.platform {
            row.platform = platform.as_str().to_string();
        }
        if let Some(tone) = patch.tone {
            row.tone = tone.as_str().to_string();
        }
        if let Some(status) = patch.status {
            row.status = status.as_str().to_string();
        }
        if let Some(bullets) = &patch.input_bullets {
            row.input_bullets = bullets.clone();
        }
        if let Some(content) = &patch.generated_content {
            row.generated_content = content.clone();
        }
        if let Some(hashtags) = &patch.hashtags {
            row.hashtags = hashtags.clone();
        }
        if let Some(images) = &patch.images {
            row.images = images.clone();
        }
        if let Some(scheduled_at) = patch.scheduled_at {
            row.scheduled_at = Some(scheduled_at);
        }
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn delete_post(&self, user_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        self.check()?;
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| !(r.id == id && r.user_id == user_id));
        Ok(rows.len() < before)
    }
}

struct Account {
    user: IdentityUser,
    password: String,
}

/// Identity provider holding accounts in memory. Tokens look like `token-<id>`.
#[derive(Default)]
pub struct FakeIdentity {
    accounts: Mutex<Vec<Account>>,
    tokens: Mutex<HashMap<String, Uuid>>,
    fail_sessions: AtomicBool,
    sessions_issued: AtomicUsize,
}

impl FakeIdentity {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_user(&self, email: &str, password: &str, google: bool) -> IdentityUser {
        let metadata = if google {
            json!({ "provider": "google" })
        } else {
            json!({})
        };
        let user = self.add_account(email, password, metadata);
        self.token_for(&user);
        user
    }

    pub fn token_for(&self, user: &IdentityUser) -> String {
        let token = format!("token-{}", user.id);
        self.tokens.lock().unwrap().insert(token.clone(), user.id);
        token
    }

    pub fn user_count(&self) -> usize {
        self.accounts.lock().unwrap().len()
    }

    pub fn sessions_issued(&self) -> usize {
        self.sessions_issued.load(Ordering::SeqCst)
    }

    pub fn fail_sessions(&self) {
        self.fail_sessions.store(true, Ordering::SeqCst);
    }

    fn add_account(&self, email: &str, password: &str, metadata: Value) -> IdentityUser {
        let user = IdentityUser {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
            user_metadata: metadata,
            app_metadata: json!({}),
            created_at: Some(Utc::now().to_rfc3339()),
        };
        self.accounts.lock().unwrap().push(Account {
            user: user.clone(),
            password: password.to_string(),
        });
        user
    }

    fn session_for(&self, user: &IdentityUser) -> Session {
        Session {
            access_token: self.token_for(user),
            refresh_token: Some("refresh".to_string()),
            token_type: Some("bearer".to_string()),
            expires_in: Some(3600),
            expires_at: None,
        }
    }

    fn by_email(&self, email: &str) -> Option<IdentityUser> {
        self.accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| {
                a.user
                    .email
                    .as_deref()
                    .is_some_and(|e| e.eq_ignore_ascii_case(email))
            })
            .map(|a| a.user.clone())
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<IdentityUser>, IdentityError> {
        Ok(self.by_email(email))
    }

    async fn create_user(&self, new: NewIdentityUser) -> Result<IdentityUser, IdentityError> {
        Ok(self.add_account(&new.email, &new.password, new.metadata))
    }

    async fn update_user_metadata(
        &self,
        id: Uuid,
        metadata: Value,
    ) -> Result<IdentityUser, IdentityError> {
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts
            .iter_mut()
            .find(|a| a.user.id == id)
            .ok_or_else(|| IdentityError::Api {
                status: 404,
                message: "User not found".to_string(),
            })?;
        // The admin API merges top-level metadata keys.
        match (&mut account.user.user_metadata, metadata) {
            (Value::Object(stored), Value::Object(update)) => stored.extend(update),
            (stored, update) => *stored = update,
        }
        Ok(account.user.clone())
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(IdentityUser, Session), IdentityError> {
        let user = self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| {
                a.password == password
                    && a.user.email.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(email))
            })
            .map(|a| a.user.clone())
            .ok_or(IdentityError::InvalidCredentials)?;
        let session = self.session_for(&user);
        Ok((user, session))
    }

    async fn issue_session(&self, email: &str) -> Result<Session, IdentityError> {
        if self.fail_sessions.load(Ordering::SeqCst) {
            return Err(IdentityError::Api {
                status: 500,
                message: "link generation failed".to_string(),
            });
        }
        let user = self.by_email(email).ok_or_else(|| IdentityError::Api {
            status: 404,
            message: "User not found".to_string(),
        })?;
        self.sessions_issued.fetch_add(1, Ordering::SeqCst);
        Ok(self.session_for(&user))
    }

    async fn get_user(&self, access_token: &str) -> Result<IdentityUser, IdentityError> {
        let id = self
            .tokens
            .lock()
            .unwrap()
            .get(access_token)
            .copied()
            .ok_or(IdentityError::InvalidToken)?;
        self.accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.user.id == id)
            .map(|a| a.user.clone())
            .ok_or(IdentityError::InvalidToken)
    }
}

#[derive(Default)]
pub struct InMemoryProfiles {
    rows: Mutex<HashMap<Uuid, Profile>>,
}

impl InMemoryProfiles {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn get(&self, id: Uuid) -> Option<Profile> {
        self.rows.lock().unwrap().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfiles {
    async fn upsert_profile(&self, profile: &Profile) -> Result<Profile, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        let mut merged = profile.clone();
        if let Some(stored) = rows.get(&profile.id) {
            merged.full_name = merged.full_name.or_else(|| stored.full_name.clone());
            merged.avatar_url = merged.avatar_url.or_else(|| stored.avatar_url.clone());
        }
        rows.insert(merged.id, merged.clone());
        Ok(merged)
    }

    async fn find_profile(&self, id: Uuid) -> Result<Option<Profile>, StoreError> {
        Ok(self.get(id))
    }
}

/// Accepts only the credentials registered with `with_token`.
#[derive(Default)]
pub struct FakeGoogle {
    tokens: Mutex<HashMap<String, GoogleClaims>>,
}

impl FakeGoogle {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers `credential` as a valid ID token for `email`.
    pub fn with_token(&self, credential: &str, email: &str, name: Option<&str>) {
        self.tokens.lock().unwrap().insert(
            credential.to_string(),
            GoogleClaims {
                subject: format!("google-{email}"),
                email: email.to_string(),
                name: name.map(str::to_string),
                picture: None,
            },
        );
    }
}

#[async_trait]
impl GoogleVerifier for FakeGoogle {
    async fn verify_id_token(&self, id_token: &str) -> Result<GoogleClaims, GoogleTokenError> {
        self.tokens
            .lock()
            .unwrap()
            .get(id_token)
            .cloned()
            .ok_or_else(|| GoogleTokenError::Invalid("unknown token".to_string()))
    }
}

#[derive(Default)]
pub struct FakeTableProbe {
    failing: Mutex<HashSet<&'static str>>,
}

impl FakeTableProbe {
    pub fn fail_table(&self, table: &'static str) {
        self.failing.lock().unwrap().insert(table);
    }
}

#[async_trait]
impl TableProbe for FakeTableProbe {
    async fn probe(&self, table: &'static str) -> Result<(), StoreError> {
        if self.failing.lock().unwrap().contains(table) {
            return Err(store_down());
        }
        Ok(())
    }
}

/// All fakes wired into one application state.
pub struct Harness {
    pub model: Arc<ScriptedModel>,
    pub photos: Option<Arc<FakePhotos>>,
    pub store: Arc<InMemoryPostStore>,
    pub identity: Arc<FakeIdentity>,
    pub profiles: Arc<InMemoryProfiles>,
    pub google: Arc<FakeGoogle>,
    pub probe: Arc<FakeTableProbe>,
}

impl Harness {
    pub fn new(script: Vec<Result<String, LlmError>>) -> Self {
        Self {
            model: ScriptedModel::new(script),
            photos: None,
            store: InMemoryPostStore::new(),
            identity: FakeIdentity::new(),
            profiles: InMemoryProfiles::new(),
            google: FakeGoogle::new(),
            probe: Arc::new(FakeTableProbe::default()),
        }
    }

    pub fn state(&self) -> AppState {
        let photos = self
            .photos
            .clone()
            .map(|p| p as Arc<dyn PhotoSearch>);
        AppState {
            auth: AuthService::new(
                self.identity.clone(),
                self.profiles.clone(),
                self.google.clone(),
            ),
            posts: PostService::new(
                self.store.clone(),
                ContentGenerator::new(self.model.clone()),
                ImageService::new(self.model.clone(), photos),
            ),
            probe: self.probe.clone(),
        }
    }

    pub fn router(&self) -> Router {
        build_router(self.state())
    }
}
