//! HTTP client for a hosted Supabase-compatible backend.
//!
//! Auth goes through the GoTrue endpoints under `/auth/v1`, profile rows through
//! PostgREST under `/rest/v1`. Every request carries the project's anon key as
//! `apikey` and a bearer token: the signed-in user's access token when there is
//! one, the anon key otherwise.
//!
//! The client owns the current session. It is persisted under
//! [`BackendConfig::storage_key`] (browser `localStorage` on WASM, memory
//! elsewhere) and every change to it is announced through
//! [`AuthBackend::on_auth_state_change`].

pub(crate) mod callback;
mod storage;

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use url::Url;

use crate::backend::{AuthBackend, OAuthProvider, ProfileBackend, SignUpRequest, SignUpResponse};
use crate::config::BackendConfig;
use crate::error::BackendError;
use crate::events::{AuthChangeEvent, AuthEvents, Subscription};
use crate::models::{NewProfile, Profile, ProfileChanges, Session, UserIdentity};

use callback::CallbackParams;
pub use storage::{MemorySessionStorage, PlatformStorage, SessionStorage};
#[cfg(target_arch = "wasm32")]
pub use storage::LocalSessionStorage;

const CLIENT_INFO: &str = concat!("platewise-web/", env!("CARGO_PKG_VERSION"));
const PROFILES_TABLE: &str = "user_profiles";
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Backend message for an error body, looked up in the order GoTrue and
/// PostgREST use: `msg`, `error_description`, `message`, `error`.
fn api_message(body: &Value) -> Option<String> {
    ["msg", "error_description", "message", "error"]
        .iter()
        .find_map(|key| body.get(key).and_then(Value::as_str).filter(|m| !m.is_empty()))
        .map(str::to_string)
}

async fn error_from_response(response: Response) -> BackendError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|value| api_message(&value))
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
    BackendError::api(status.as_u16(), message)
}

/// A sign-up answers with a session when the email needs no confirmation and
/// with the bare user otherwise.
fn parse_sign_up(value: Value) -> Result<SignUpResponse, BackendError> {
    if value.get("access_token").is_some() {
        let session = serde_json::from_value::<Session>(value)?.with_expiry_from(Utc::now());
        return Ok(SignUpResponse {
            user: Some(session.user.clone()),
            session: Some(session),
        });
    }

    let user = value.get("user").cloned().unwrap_or(value);
    let user = if user.get("id").is_some() {
        Some(serde_json::from_value::<UserIdentity>(user)?)
    } else {
        None
    };
    Ok(SignUpResponse {
        user,
        session: None,
    })
}

#[derive(Clone, Debug)]
pub struct SupabaseClient<S = PlatformStorage> {
    http: Client,
    config: BackendConfig,
    storage: S,
    storage_key: String,
    session: Arc<Mutex<Option<Session>>>,
    events: AuthEvents,
}

impl SupabaseClient<PlatformStorage> {
    pub fn new(config: BackendConfig) -> Self {
        Self::with_storage(config, PlatformStorage::default())
    }
}

impl<S: SessionStorage> SupabaseClient<S> {
    /// Build a client, restoring any session left in `storage` by an earlier
    /// page load.
    pub fn with_storage(config: BackendConfig, storage: S) -> Self {
        let storage_key = config.storage_key();
        let restored = storage.load(&storage_key).and_then(|raw| {
            serde_json::from_str::<Session>(&raw)
                .inspect_err(|e| tracing::warn!(error = %e, "discarding unreadable persisted session"))
                .ok()
        });
        if restored.is_some() {
            tracing::debug!(key = %storage_key, "found persisted session");
        }

        Self {
            http: Client::new(),
            config,
            storage,
            storage_key,
            session: Arc::new(Mutex::new(restored)),
            events: AuthEvents::new(),
        }
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn lock_session(&self) -> MutexGuard<'_, Option<Session>> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn cached_session(&self) -> Option<Session> {
        self.lock_session().clone()
    }

    fn set_session(&self, session: Option<Session>) {
        match session {
            Some(ref session) => match serde_json::to_string(session) {
                Ok(raw) => self.storage.store(&self.storage_key, &raw),
                Err(e) => tracing::warn!(error = %e, "could not serialize session"),
            },
            None => self.storage.remove(&self.storage_key),
        }
        *self.lock_session() = session;
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.config.base_url(), path)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.config.base_url(), table)
    }

    /// A request authorized as the signed-in user, or with the anon key when
    /// nobody is signed in.
    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let token = self
            .cached_session()
            .map(|session| session.access_token)
            .unwrap_or_else(|| self.config.anon_key.clone());
        self.request_as(method, url, &token)
    }

    /// A request authorized with the anon key only, for the token endpoints
    /// where a stale access token must not be sent.
    fn anon_request(&self, method: Method, url: &str) -> RequestBuilder {
        self.request_as(method, url, &self.config.anon_key)
    }

    fn request_as(&self, method: Method, url: &str, token: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.config.anon_key)
            .header("X-Client-Info", CLIENT_INFO)
            .bearer_auth(token)
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, BackendError> {
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response.json().await?)
    }

    async fn send_empty(request: RequestBuilder) -> Result<(), BackendError> {
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }

    async fn fetch_user(&self, access_token: &str) -> Result<UserIdentity, BackendError> {
        Self::send(
            self.request_as(Method::GET, &self.auth_url("user"), access_token),
        )
        .await
    }

    /// Exchange a refresh token. A token the backend refuses ends the session;
    /// server and network failures keep it for the next attempt.
    async fn refresh_with(&self, refresh_token: &str) -> Result<Session, BackendError> {
        let result = Self::send::<Session>(
            self.anon_request(Method::POST, &self.auth_url("token?grant_type=refresh_token"))
                .json(&json!({ "refresh_token": refresh_token })),
        )
        .await;

        match result {
            Ok(session) => {
                let session = session.with_expiry_from(Utc::now());
                self.set_session(Some(session.clone()));
                self.events
                    .emit(AuthChangeEvent::TokenRefreshed, Some(session.clone()));
                Ok(session)
            }
            Err(e) if e.invalidates_session() => {
                tracing::warn!(error = %e, "refresh token rejected, signing out");
                self.set_session(None);
                self.events.emit(AuthChangeEvent::SignedOut, None);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }
}

impl<S: SessionStorage> AuthBackend for SupabaseClient<S> {
    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpResponse, BackendError> {
        let value: Value =
            Self::send(self.anon_request(Method::POST, &self.auth_url("signup")).json(request)).await?;
        let response = parse_sign_up(value)?;

        if let Some(ref session) = response.session {
            self.set_session(Some(session.clone()));
            self.events
                .emit(AuthChangeEvent::SignedIn, Some(session.clone()));
        }
        Ok(response)
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, BackendError> {
        let session = Self::send::<Session>(
            self.anon_request(Method::POST, &self.auth_url("token?grant_type=password"))
                .json(&json!({ "email": email, "password": password })),
        )
        .await?
        .with_expiry_from(Utc::now());

        self.set_session(Some(session.clone()));
        self.events
            .emit(AuthChangeEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    fn authorize_url(
        &self,
        provider: OAuthProvider,
        redirect_to: &str,
    ) -> Result<String, BackendError> {
        Url::parse_with_params(
            &self.auth_url("authorize"),
            &[("provider", provider.as_str()), ("redirect_to", redirect_to)],
        )
        .map(String::from)
        .map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        let result = match self.cached_session() {
            Some(session) => {
                Self::send_empty(self.request_as(
                    Method::POST,
                    &self.auth_url("logout"),
                    &session.access_token,
                ))
                .await
            }
            None => Ok(()),
        };

        // The local session goes regardless; an already revoked token is not an error.
        self.set_session(None);
        self.events.emit(AuthChangeEvent::SignedOut, None);
        match result {
            Err(BackendError::Api {
                status: 401 | 403 | 404,
                ..
            }) => Ok(()),
            other => other,
        }
    }

    async fn get_session(&self) -> Result<Option<Session>, BackendError> {
        let Some(session) = self.cached_session() else {
            return Ok(None);
        };
        if !session.is_expired(Utc::now()) {
            return Ok(Some(session));
        }

        tracing::debug!("persisted session expired, refreshing");
        self.refresh_with(&session.refresh_token).await.map(Some)
    }

    async fn refresh_session(&self) -> Result<Session, BackendError> {
        let session = self.cached_session().ok_or(BackendError::SessionMissing)?;
        self.refresh_with(&session.refresh_token).await
    }

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), BackendError> {
        let url = Url::parse_with_params(&self.auth_url("recover"), &[("redirect_to", redirect_to)])
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        Self::send_empty(
            self.request(Method::POST, url.as_str())
                .json(&json!({ "email": email })),
        )
        .await
    }

    async fn update_password(&self, password: &str) -> Result<UserIdentity, BackendError> {
        let mut session = self.cached_session().ok_or(BackendError::SessionMissing)?;
        let user: UserIdentity = Self::send(
            self.request(Method::PUT, &self.auth_url("user"))
                .json(&json!({ "password": password })),
        )
        .await?;

        session.user = user.clone();
        self.set_session(Some(session.clone()));
        self.events
            .emit(AuthChangeEvent::UserUpdated, Some(session));
        Ok(user)
    }

    async fn session_from_url(
        &self,
        url: &str,
    ) -> Result<Option<(AuthChangeEvent, Session)>, BackendError> {
        let url = Url::parse(url).map_err(|e| BackendError::Decode(e.to_string()))?;
        let Some(params) = CallbackParams::from_url(&url)? else {
            return Ok(None);
        };

        let user = self.fetch_user(&params.access_token).await?;
        let event = if params.is_recovery() {
            AuthChangeEvent::PasswordRecovery
        } else {
            AuthChangeEvent::SignedIn
        };
        let session = params.into_session(user);

        self.set_session(Some(session.clone()));
        self.events.emit(event, Some(session.clone()));
        Ok(Some((event, session)))
    }

    fn on_auth_state_change(&self) -> Subscription {
        self.events.subscribe()
    }
}

impl<S: SessionStorage> ProfileBackend for SupabaseClient<S> {
    async fn select_profile(&self, user_id: &str) -> Result<Option<Profile>, BackendError> {
        let rows: Vec<Profile> = Self::send(
            self.request(Method::GET, &self.rest_url(PROFILES_TABLE))
                .query(&[("id", format!("eq.{user_id}")), ("select", "*".to_string())]),
        )
        .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_profile(&self, row: &NewProfile) -> Result<Profile, BackendError> {
        Self::send(
            self.request(Method::POST, &self.rest_url(PROFILES_TABLE))
                .header("Prefer", "return=representation")
                .header("Accept", SINGLE_OBJECT)
                .json(row),
        )
        .await
    }

    async fn update_profile(
        &self,
        user_id: &str,
        changes: &ProfileChanges,
    ) -> Result<Profile, BackendError> {
        Self::send(
            self.request(Method::PATCH, &self.rest_url(PROFILES_TABLE))
                .query(&[("id", format!("eq.{user_id}"))])
                .header("Prefer", "return=representation")
                .header("Accept", SINGLE_OBJECT)
                .json(changes),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BackendConfig {
        BackendConfig::new("https://abcd.supabase.co/", "anon-key", "https://platewise.app").unwrap()
    }

    fn session_value(expires_at: i64) -> Value {
        json!({
            "access_token": "at",
            "refresh_token": "rt",
            "token_type": "bearer",
            "expires_in": 3600,
            "expires_at": expires_at,
            "user": {
                "id": "11111111-1111-1111-1111-111111111111",
                "email": "a@x.com",
                "email_confirmed_at": "2024-01-01T00:00:00Z"
            }
        })
    }

    #[test]
    fn test_api_message_precedence() {
        assert_eq!(
            api_message(&json!({ "error": "invalid_grant", "error_description": "Invalid login credentials" })),
            Some("Invalid login credentials".to_string())
        );
        assert_eq!(
            api_message(&json!({ "code": 422, "msg": "User already registered", "message": "ignored" })),
            Some("User already registered".to_string())
        );
        assert_eq!(
            api_message(&json!({ "msg": "", "message": "JSON object requested, multiple (or no) rows returned" })),
            Some("JSON object requested, multiple (or no) rows returned".to_string())
        );
        assert_eq!(api_message(&json!({ "code": 500 })), None);
    }

    #[test]
    fn test_sign_up_shapes() {
        let confirmed = parse_sign_up(session_value(1_700_000_000)).unwrap();
        assert!(confirmed.session.is_some());
        assert!(confirmed.user.unwrap().is_confirmed());

        let pending = parse_sign_up(json!({
            "id": "22222222-2222-2222-2222-222222222222",
            "email": "b@x.com",
            "email_confirmed_at": null
        }))
        .unwrap();
        assert!(pending.session.is_none());
        assert!(!pending.user.unwrap().is_confirmed());

        let empty = parse_sign_up(json!({})).unwrap();
        assert!(empty.user.is_none());
    }

    #[test]
    fn test_authorize_url() {
        let client = SupabaseClient::with_storage(config(), MemorySessionStorage::new());
        let url = client
            .authorize_url(OAuthProvider::Google, "https://platewise.app/auth/callback")
            .unwrap();
        assert_eq!(
            url,
            "https://abcd.supabase.co/auth/v1/authorize?provider=google&redirect_to=https%3A%2F%2Fplatewise.app%2Fauth%2Fcallback"
        );
    }

    #[tokio::test]
    async fn test_restores_persisted_session() {
        let storage = MemorySessionStorage::new();
        let far_future = Utc::now().timestamp() + 3600;
        storage.store("sb-abcd-auth-token", &session_value(far_future).to_string());

        let client = SupabaseClient::with_storage(config(), storage);
        let session = client.get_session().await.unwrap().unwrap();
        assert_eq!(session.access_token, "at");
        assert_eq!(session.user.email.as_deref(), Some("a@x.com"));
    }

    #[tokio::test]
    async fn test_unreadable_session_is_ignored() {
        let storage = MemorySessionStorage::new();
        storage.store("sb-abcd-auth-token", "not json");

        let client = SupabaseClient::with_storage(config(), storage);
        assert_eq!(client.get_session().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sign_out_without_session_is_local() {
        let client = SupabaseClient::with_storage(config(), MemorySessionStorage::new());
        let mut changes = client.on_auth_state_change();

        client.sign_out().await.unwrap();
        assert_eq!(changes.try_next().unwrap().event, AuthChangeEvent::SignedOut);
        assert_eq!(
            client.refresh_session().await.unwrap_err(),
            BackendError::SessionMissing
        );
    }
}
