//! # Identities and sessions issued by the auth backend
//!
//! ## [`UserIdentity`]
//!
//! The backend's user record as the client sees it. The client never creates or
//! mutates one directly (apart from changing the password). `email_confirmed_at`
//! being `None` means the address has not been confirmed yet, which is also what
//! decides whether registration creates the profile row straight away.
//!
//! ## [`Session`]
//!
//! An access/refresh token pair plus the identity it was issued for. The backend
//! reports `expires_in` and usually `expires_at`; when `expires_at` is missing it
//! is derived from the time the session was received (see
//! [`Session::with_expiry_from`]) so that the auto-refresh tick can compare it
//! against the clock.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A user known to the auth backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserIdentity {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_confirmed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Free-form metadata supplied at sign-up (`display_name`, `primary_language`).
    #[serde(default)]
    pub user_metadata: Map<String, Value>,
}

impl UserIdentity {
    pub fn is_confirmed(&self) -> bool {
        self.email_confirmed_at.is_some()
    }

    /// Name to greet the user with: sign-up metadata, then email, then id.
    pub fn display_name(&self) -> &str {
        self.user_metadata
            .get("display_name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .or(self.email.as_deref())
            .unwrap_or(&self.id)
    }
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// A time-bounded, refreshable proof of authentication.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime in seconds at the moment of issue.
    pub expires_in: i64,
    /// Unix timestamp (seconds) after which the access token is rejected.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: UserIdentity,
}

impl Session {
    /// Fill in `expires_at` from `expires_in` if the backend left it out.
    pub fn with_expiry_from(mut self, issued: DateTime<Utc>) -> Self {
        if self.expires_at.is_none() {
            self.expires_at = Some(issued.timestamp() + self.expires_in);
        }
        self
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_within(now, Duration::zero())
    }

    /// Whether the access token expires within `margin` of `now`. A session
    /// without a known expiry never needs refreshing.
    pub fn expires_within(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        self.expires_at()
            .is_some_and(|expires_at| expires_at - now <= margin)
    }
}
