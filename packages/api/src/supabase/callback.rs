use std::collections::HashMap;

use chrono::Utc;
use url::{form_urlencoded, Url};

use crate::error::BackendError;
use crate::models::{Session, UserIdentity};

const DEFAULT_EXPIRES_IN: i64 = 3600;

/// Tokens handed back in the URL fragment after an OAuth sign-in or a
/// password reset link.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CallbackParams {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub expires_at: Option<i64>,
    /// `recovery` for password reset links, `signup`, `magiclink`, ... otherwise.
    pub kind: Option<String>,
}

impl CallbackParams {
    /// `Ok(None)` when the URL carries no tokens. An error reported by the
    /// provider comes back as a [`BackendError::Api`].
    pub fn from_url(url: &Url) -> Result<Option<Self>, BackendError> {
        let Some(fragment) = url.fragment().filter(|f| !f.is_empty()) else {
            return Ok(None);
        };
        let mut params: HashMap<String, String> =
            form_urlencoded::parse(fragment.as_bytes()).into_owned().collect();

        if let Some(message) = params
            .remove("error_description")
            .or_else(|| params.remove("error"))
        {
            return Err(BackendError::api(400, message));
        }

        let Some(access_token) = params.remove("access_token") else {
            return Ok(None);
        };

        Ok(Some(Self {
            access_token,
            refresh_token: params.remove("refresh_token").unwrap_or_default(),
            token_type: params
                .remove("token_type")
                .unwrap_or_else(|| "bearer".to_string()),
            expires_in: params
                .get("expires_in")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_EXPIRES_IN),
            expires_at: params.get("expires_at").and_then(|v| v.parse().ok()),
            kind: params.remove("type"),
        }))
    }

    pub fn is_recovery(&self) -> bool {
        self.kind.as_deref() == Some("recovery")
    }

    /// The session these tokens grant to `user`.
    pub fn into_session(self, user: UserIdentity) -> Session {
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type,
            expires_in: self.expires_in,
            expires_at: self.expires_at,
            user,
        }
        .with_expiry_from(Utc::now())
    }
}
