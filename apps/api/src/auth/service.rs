//! Account flows layered over the identity provider.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::google::{GoogleTokenError, GoogleVerifier};
use crate::auth::identity::{IdentityError, IdentityProvider, IdentityUser, NewIdentityUser, Session};
use crate::auth::profiles::{Profile, ProfileStore};
use crate::errors::AppError;

pub const MIN_PASSWORD_CHARS: usize = 6;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(alias = "name")]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SigninRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Carries the Google ID token returned to the browser by Google Identity Services.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoogleAuthRequest {
    #[serde(alias = "id_token", alias = "idToken")]
    pub credential: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthPayload {
    pub user: IdentityUser,
    /// `null` only when a Google session could not be issued.
    pub session: Option<Session>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MePayload {
    pub user: IdentityUser,
    pub profile: Option<Profile>,
}

fn invalid(msg: impl Into<String>) -> AppError {
    AppError::Validation(msg.into())
}

pub fn validate_email(raw: Option<&str>) -> Result<String, AppError> {
    let email = raw
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| invalid("email is required"))?;
    let well_formed = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if !well_formed {
        return Err(invalid("email must be a valid email address"));
    }
    Ok(email.to_lowercase())
}

fn validate_password(raw: Option<&str>) -> Result<String, AppError> {
    let password = raw
        .filter(|p| !p.is_empty())
        .ok_or_else(|| invalid("password is required"))?;
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(invalid(format!(
            "password must be at least {MIN_PASSWORD_CHARS} characters"
        )));
    }
    Ok(password.to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn provider_failure(action: &'static str) -> impl FnOnce(IdentityError) -> AppError {
    move |e| {
        error!("Failed to {action}: {e}");
        AppError::Operation(format!("Failed to {action}"))
    }
}

/// Placeholder credential for Google accounts; it is never shown to anyone.
fn placeholder_password() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// User metadata for a Google account; absent claims leave stored values alone.
fn google_metadata(subject: &str, name: Option<&str>, picture: Option<&str>) -> Value {
    let mut metadata = Map::new();
    metadata.insert("provider".to_string(), json!("google"));
    metadata.insert("google_id".to_string(), json!(subject));
    if let Some(name) = name {
        metadata.insert("full_name".to_string(), json!(name));
    }
    if let Some(picture) = picture {
        metadata.insert("avatar_url".to_string(), json!(picture));
    }
    Value::Object(metadata)
}

#[derive(Clone)]
pub struct AuthService {
    identity: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileStore>,
    google: Arc<dyn GoogleVerifier>,
}

impl AuthService {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileStore>,
        google: Arc<dyn GoogleVerifier>,
    ) -> Self {
        Self {
            identity,
            profiles,
            google,
        }
    }

    pub async fn signup(&self, req: SignupRequest) -> Result<AuthPayload, AppError> {
        let email = validate_email(req.email.as_deref())?;
        let password = validate_password(req.password.as_deref())?;

        let existing = self
            .identity
            .find_user_by_email(&email)
            .await
            .map_err(provider_failure("look up user"))?;
        if existing.is_some() {
            return Err(AppError::Conflict(
                "User with this email already exists".to_string(),
            ));
        }

        let full_name = non_blank(req.full_name);
        self.identity
            .create_user(NewIdentityUser {
                email: email.clone(),
                password: password.clone(),
                metadata: json!({ "full_name": full_name }),
            })
            .await
            .map_err(provider_failure("create user"))?;

        let (user, session) = self
            .identity
            .sign_in_with_password(&email, &password)
            .await
            .map_err(provider_failure("sign in"))?;

        info!("Registered user {}", user.id);
        Ok(AuthPayload {
            user,
            session: Some(session),
        })
    }

    pub async fn signin(&self, req: SigninRequest) -> Result<AuthPayload, AppError> {
        let email = validate_email(req.email.as_deref())?;
        let password = req
            .password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| invalid("password is required"))?;

        match self.identity.sign_in_with_password(&email, &password).await {
            Ok((user, session)) => Ok(AuthPayload {
                user,
                session: Some(session),
            }),
            Err(IdentityError::InvalidCredentials) => Err(AppError::Unauthorized(
                "Invalid email or password".to_string(),
            )),
            Err(e) => Err(provider_failure("sign in")(e)),
        }
    }

    /// Signs in or registers a Google user from a verified ID token. An account
    /// that was created with a password is never taken over.
    pub async fn google(&self, req: GoogleAuthRequest) -> Result<AuthPayload, AppError> {
        let credential = req
            .credential
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| AppError::Unauthorized("Google credential required".to_string()))?;

        let claims = self
            .google
            .verify_id_token(credential.trim())
            .await
            .map_err(|e| match e {
                GoogleTokenError::Invalid(reason) => {
                    warn!("Rejected Google credential: {reason}");
                    AppError::Unauthorized("Invalid Google credential".to_string())
                }
                other => {
                    error!("Failed to verify Google credential: {other}");
                    AppError::Operation("Failed to verify Google credential".to_string())
                }
            })?;

        let email = validate_email(Some(claims.email.as_str()))?;
        let name = non_blank(claims.name);
        let picture = non_blank(claims.picture);
        let metadata = google_metadata(&claims.subject, name.as_deref(), picture.as_deref());

        let existing = self
            .identity
            .find_user_by_email(&email)
            .await
            .map_err(provider_failure("look up user"))?;

        let user = match existing {
            Some(user) if !user.is_google() => {
                return Err(AppError::Conflict(
                    "An account with this email already exists. Please sign in with your password."
                        .to_string(),
                ));
            }
            Some(user) => self
                .identity
                .update_user_metadata(user.id, metadata)
                .await
                .map_err(provider_failure("update user"))?,
            None => self
                .identity
                .create_user(NewIdentityUser {
                    email: email.clone(),
                    password: placeholder_password(),
                    metadata,
                })
                .await
                .map_err(provider_failure("create user"))?,
        };

        let session = match self.identity.issue_session(&email).await {
            Ok(session) => Some(session),
            Err(e) => {
                warn!("Could not issue session for Google user {}: {e}", user.id);
                None
            }
        };

        let profile = Profile {
            id: user.id,
            email,
            full_name: name,
            avatar_url: picture,
            updated_at: Utc::now(),
        };
        if let Err(e) = self.profiles.upsert_profile(&profile).await {
            warn!("Profile upsert failed for user {}: {e}", user.id);
        }

        Ok(AuthPayload { user, session })
    }

    /// Resolves a bearer token; any provider failure reads as unauthorized.
    pub async fn authenticate(&self, token: &str) -> Result<IdentityUser, AppError> {
        self.identity.get_user(token).await.map_err(|e| {
            match e {
                IdentityError::InvalidToken => {}
                other => warn!("Token lookup failed: {other}"),
            }
            AppError::Unauthorized("Invalid or expired token".to_string())
        })
    }

    pub async fn me(&self, user: IdentityUser) -> Result<MePayload, AppError> {
        let profile = self.profiles.find_profile(user.id).await.map_err(|e| {
            error!("Failed to fetch profile: {e}");
            AppError::Operation("Failed to fetch profile".to_string())
        })?;
        Ok(MePayload { user, profile })
    }
}
