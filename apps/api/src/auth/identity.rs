//! Identity provider client for the Supabase GoTrue REST API.
//!
//! Admin calls authenticate with the service-role key; password sign-in and
//! token lookups use the anon key as `apikey`.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

const ADMIN_PAGE_SIZE: usize = 1000;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("identity provider error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid or expired token")]
    InvalidToken,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Value,
    #[serde(default)]
    pub app_metadata: Value,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl IdentityUser {
    /// Whether the account was created through Google sign-in.
    pub fn is_google(&self) -> bool {
        let tagged = |meta: &Value| meta.get("provider").and_then(Value::as_str) == Some("google");
        let linked = self
            .app_metadata
            .get("providers")
            .and_then(Value::as_array)
            .is_some_and(|providers| providers.iter().any(|p| p.as_str() == Some("google")));
        tagged(&self.user_metadata) || tagged(&self.app_metadata) || linked
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
}

/// Values for an admin-created, already confirmed account.
#[derive(Debug, Clone)]
pub struct NewIdentityUser {
    pub email: String,
    pub password: String,
    pub metadata: Value,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<IdentityUser>, IdentityError>;

    async fn create_user(&self, new: NewIdentityUser) -> Result<IdentityUser, IdentityError>;

    async fn update_user_metadata(
        &self,
        id: Uuid,
        metadata: Value,
    ) -> Result<IdentityUser, IdentityError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(IdentityUser, Session), IdentityError>;

    /// Issues a real session for an existing account without its password.
    async fn issue_session(&self, email: &str) -> Result<Session, IdentityError>;

    /// Resolves a bearer token to its user.
    async fn get_user(&self, access_token: &str) -> Result<IdentityUser, IdentityError>;
}

#[derive(Debug, Deserialize)]
struct UserList {
    users: Vec<IdentityUser>,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    #[serde(flatten)]
    session: Session,
    user: IdentityUser,
}

#[derive(Debug, Deserialize)]
struct GeneratedLink {
    #[serde(default)]
    hashed_token: Option<String>,
    #[serde(default)]
    properties: Option<LinkProperties>,
}

#[derive(Debug, Deserialize)]
struct LinkProperties {
    hashed_token: String,
}

impl GeneratedLink {
    fn token(self) -> Option<String> {
        self.hashed_token
            .or_else(|| self.properties.map(|p| p.hashed_token))
    }
}

async fn api_error(response: Response) -> IdentityError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| {
            ["msg", "error_description", "message", "error"]
                .iter()
                .find_map(|key| v.get(key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or(body);
    IdentityError::Api { status, message }
}

#[derive(Clone)]
pub struct SupabaseIdentity {
    client: Client,
    base_url: String,
    service_key: String,
    anon_key: String,
}

impl SupabaseIdentity {
    pub fn new(base_url: &str, service_key: &str, anon_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
            anon_key: anon_key.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.base_url, path)
    }

    fn admin(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    async fn verify_magic_link(&self, token_hash: &str) -> Result<Session, IdentityError> {
        let response = self
            .client
            .post(self.url("/verify"))
            .header("apikey", &self.anon_key)
            .json(&json!({ "type": "magiclink", "token_hash": token_hash }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(response.json::<SessionResponse>().await?.session)
    }
}

#[async_trait]
impl IdentityProvider for SupabaseIdentity {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<IdentityUser>, IdentityError> {
        let mut page = 1usize;
        loop {
            let response = self
                .admin(self.client.get(self.url("/admin/users")))
                .query(&[("page", page), ("per_page", ADMIN_PAGE_SIZE)])
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(api_error(response).await);
            }

            let batch = response.json::<UserList>().await?.users;
            let fetched = batch.len();
            let found = batch.into_iter().find(|u| {
                u.email
                    .as_deref()
                    .is_some_and(|e| e.eq_ignore_ascii_case(email))
            });
            if found.is_some() || fetched < ADMIN_PAGE_SIZE {
                return Ok(found);
            }
            page += 1;
        }
    }

    async fn create_user(&self, new: NewIdentityUser) -> Result<IdentityUser, IdentityError> {
        let response = self
            .admin(self.client.post(self.url("/admin/users")))
            .json(&json!({
                "email": new.email,
                "password": new.password,
                "email_confirm": true,
                "user_metadata": new.metadata,
            }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(response.json().await?)
    }

    async fn update_user_metadata(
        &self,
        id: Uuid,
        metadata: Value,
    ) -> Result<IdentityUser, IdentityError> {
        let response = self
            .admin(self.client.put(self.url(&format!("/admin/users/{id}"))))
            .json(&json!({ "user_metadata": metadata }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(response.json().await?)
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(IdentityUser, Session), IdentityError> {
        let response = self
            .client
            .post(self.url("/token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        match response.status().as_u16() {
            400 | 401 => {
                debug!("Password sign-in rejected for {email}");
                Err(IdentityError::InvalidCredentials)
            }
            s if !(200..300).contains(&s) => Err(api_error(response).await),
            _ => {
                let body: SessionResponse = response.json().await?;
                Ok((body.user, body.session))
            }
        }
    }

    async fn issue_session(&self, email: &str) -> Result<Session, IdentityError> {
        let response = self
            .admin(self.client.post(self.url("/admin/generate_link")))
            .json(&json!({ "type": "magiclink", "email": email }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let token = response
            .json::<GeneratedLink>()
            .await?
            .token()
            .ok_or_else(|| IdentityError::Api {
                status: 200,
                message: "magic link response carried no token".to_string(),
            })?;
        self.verify_magic_link(&token).await
    }

    async fn get_user(&self, access_token: &str) -> Result<IdentityUser, IdentityError> {
        let response = self
            .client
            .get(self.url("/user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        match response.status().as_u16() {
            401 | 403 => Err(IdentityError::InvalidToken),
            s if !(200..300).contains(&s) => Err(api_error(response).await),
            _ => Ok(response.json().await?),
        }
    }
}
