//! # Backend seams
//!
//! The hosted backend is reached through two traits so that the gateway and the
//! coordinator can run against the HTTP client in the browser and against
//! [`crate::MemoryBackend`] in tests.
//!
//! - [`AuthBackend`] mirrors the GoTrue surface: sign-up, password sign-in, OAuth
//!   authorize URL, sign-out, session get/refresh, password reset and update,
//!   redirect completion and the auth state change subscription.
//! - [`ProfileBackend`] is the slice of the PostgREST row store the client uses:
//!   select, insert and update on `user_profiles`, always keyed by identity id.

use std::fmt;
use std::future::Future;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::BackendError;
use crate::events::{AuthChangeEvent, Subscription};
use crate::models::{NewProfile, Profile, ProfileChanges, Session, UserIdentity};

/// Body of a sign-up request.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    /// Stored by the backend as the identity's `user_metadata`.
    pub data: Map<String, Value>,
}

impl SignUpRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            data: Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }
}

/// What a sign-up returns. `session` is only present when the backend confirms
/// the email straight away.
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpResponse {
    pub user: Option<UserIdentity>,
    pub session: Option<Session>,
}

/// External identity providers offered on the sign-in form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OAuthProvider {
    Google,
    Facebook,
    Github,
}

impl OAuthProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Facebook => "facebook",
            Self::Github => "github",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Google => "Google",
            Self::Facebook => "Facebook",
            Self::Github => "GitHub",
        }
    }
}

impl fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OAuthProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "facebook" => Ok(Self::Facebook),
            "github" => Ok(Self::Github),
            other => Err(format!("Unknown provider: {other}")),
        }
    }
}

/// Authentication operations offered by the backend.
///
/// Implementations keep the current session themselves and announce every change
/// to it through the subscriptions handed out by
/// [`on_auth_state_change`](AuthBackend::on_auth_state_change).
pub trait AuthBackend {
    fn sign_up(
        &self,
        request: &SignUpRequest,
    ) -> impl Future<Output = Result<SignUpResponse, BackendError>>;
    fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Session, BackendError>>;
    /// URL to send the browser to for an OAuth sign-in.
    fn authorize_url(
        &self,
        provider: OAuthProvider,
        redirect_to: &str,
    ) -> Result<String, BackendError>;
    fn sign_out(&self) -> impl Future<Output = Result<(), BackendError>>;
    /// The persisted session, if any. Implementations refresh an expired one.
    fn get_session(&self) -> impl Future<Output = Result<Option<Session>, BackendError>>;
    fn refresh_session(&self) -> impl Future<Output = Result<Session, BackendError>>;
    fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> impl Future<Output = Result<(), BackendError>>;
    fn update_password(
        &self,
        password: &str,
    ) -> impl Future<Output = Result<UserIdentity, BackendError>>;
    /// Finish an OAuth sign-in or a password reset link from the tokens in
    /// `url`'s fragment, persisting and announcing the session. Returns the
    /// announced event with the session, or `None` when the URL has no tokens.
    fn session_from_url(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<Option<(AuthChangeEvent, Session)>, BackendError>>;
    fn on_auth_state_change(&self) -> Subscription;
}

/// Row operations on `user_profiles`.
pub trait ProfileBackend {
    /// The profile row for `user_id`, or `None` when no row exists.
    fn select_profile(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Option<Profile>, BackendError>>;
    fn insert_profile(
        &self,
        row: &NewProfile,
    ) -> impl Future<Output = Result<Profile, BackendError>>;
    fn update_profile(
        &self,
        user_id: &str,
        changes: &ProfileChanges,
    ) -> impl Future<Output = Result<Profile, BackendError>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sign_up_request_body() {
        let request = SignUpRequest::new("a@x.com", "secret1")
            .with_metadata("display_name", "A")
            .with_metadata("primary_language", "es");
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "email": "a@x.com",
                "password": "secret1",
                "data": { "display_name": "A", "primary_language": "es" }
            })
        );
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!("Google".parse::<OAuthProvider>(), Ok(OAuthProvider::Google));
        assert_eq!(OAuthProvider::Facebook.to_string(), "facebook");
        assert!("myspace".parse::<OAuthProvider>().is_err());
    }
}
