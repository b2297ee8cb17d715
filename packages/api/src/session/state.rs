use crate::auth::Language;
use crate::error::BackendError;
use crate::events::AuthStateChange;
use crate::models::{CulturalPreferences, Profile, Session, UserIdentity, DEFAULT_LANGUAGE};

/// Where the coordinator is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthStatus {
    /// No coordinator attached yet.
    #[default]
    Uninitialized,
    /// Waiting for the persisted session.
    Loading,
    Anonymous,
    /// `profile_loaded` turns true once a profile fetch for the current identity
    /// has finished, whether or not a row was found.
    Authenticated { profile_loaded: bool },
}

/// Everything the UI knows about the signed-in user.
///
/// Only the coordinator writes it. Each session write bumps `seq`, and a write
/// that was started against an older `seq` is dropped, so concurrent startup and
/// notification handling settle on whatever was notified last.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    status: AuthStatus,
    session: Option<Session>,
    profile: Option<Profile>,
    error: Option<String>,
    seq: u64,
}

impl SessionState {
    pub fn loading() -> Self {
        Self {
            status: AuthStatus::Loading,
            ..Default::default()
        }
    }

    pub fn status(&self) -> AuthStatus {
        self.status
    }

    pub fn current_session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn current_user(&self) -> Option<&UserIdentity> {
        self.session.as_ref().map(|session| &session.user)
    }

    pub fn current_profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    /// The last failure, cleared by the next session change.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.status == AuthStatus::Loading
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }

    pub fn is_profile_complete(&self) -> bool {
        self.profile.as_ref().is_some_and(Profile::is_complete)
    }

    pub fn preferred_language(&self) -> &str {
        self.profile
            .as_ref()
            .map_or(DEFAULT_LANGUAGE, Profile::preferred_language)
    }

    /// [`preferred_language`](Self::preferred_language) as a [`Language`];
    /// unsupported codes read as English.
    pub fn language(&self) -> Language {
        Language::from_code(self.preferred_language()).unwrap_or_default()
    }

    pub fn cultural_preferences(&self) -> Option<CulturalPreferences> {
        self.profile.as_ref().map(Profile::cultural_preferences)
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Apply the startup session fetch begun at `ticket`. Returns the profile
    /// fetch to run next, if any.
    pub(crate) fn apply_initial_session(
        &mut self,
        ticket: u64,
        result: Result<Option<Session>, BackendError>,
    ) -> Option<(u64, String)> {
        if ticket != self.seq {
            tracing::debug!(ticket, seq = self.seq, "discarding stale startup session");
            return None;
        }
        self.seq += 1;

        match result {
            Ok(Some(session)) => {
                tracing::debug!(user = %session.user.id, "restored persisted session");
                let user_id = session.user.id.clone();
                self.session = Some(session);
                self.status = AuthStatus::Authenticated {
                    profile_loaded: false,
                };
                Some((self.seq, user_id))
            }
            Ok(None) => {
                tracing::debug!("no persisted session");
                self.status = AuthStatus::Anonymous;
                None
            }
            Err(e) => {
                tracing::debug!(error = %e, "session fetch failed");
                self.status = AuthStatus::Anonymous;
                self.error = Some(e.to_string());
                None
            }
        }
    }

    /// Fold a session change notification in. The profile is kept when the
    /// identity is unchanged (e.g. a token refresh) and dropped otherwise.
    /// Returns the profile fetch to run next, if any.
    pub(crate) fn apply_change(&mut self, change: &AuthStateChange) -> Option<(u64, String)> {
        self.seq += 1;
        self.error = None;
        tracing::debug!(event = change.event.as_str(), seq = self.seq, "applying auth change");

        let previous = self.current_user().map(|user| user.id.clone());
        self.session = change.session.clone();

        let Some(user_id) = self.current_user().map(|user| user.id.clone()) else {
            self.profile = None;
            self.status = AuthStatus::Anonymous;
            return None;
        };

        let same_user = previous.as_deref() == Some(user_id.as_str());
        if !same_user {
            self.profile = None;
        }
        let profile_loaded = same_user
            && matches!(
                self.status,
                AuthStatus::Authenticated {
                    profile_loaded: true
                }
            );
        self.status = AuthStatus::Authenticated { profile_loaded };
        Some((self.seq, user_id))
    }

    /// Apply a profile fetch begun at `ticket`. A failure is recorded and leaves
    /// the cached profile as it was. Returns whether the result was applied.
    pub(crate) fn apply_profile(
        &mut self,
        ticket: u64,
        result: Result<Option<Profile>, BackendError>,
    ) -> bool {
        if ticket != self.seq || !self.is_authenticated() {
            tracing::debug!(ticket, seq = self.seq, "discarding stale profile");
            return false;
        }

        match result {
            Ok(profile) => self.profile = profile,
            Err(e) => self.error = Some(e.to_string()),
        }
        self.status = AuthStatus::Authenticated {
            profile_loaded: true,
        };
        true
    }

    pub(crate) fn record_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::AuthChangeEvent;

    fn session(user_id: &str) -> Session {
        Session {
            access_token: format!("at-{user_id}"),
            refresh_token: "rt".to_string(),
            token_type: "bearer".to_string(),
            expires_in: 3600,
            expires_at: None,
            user: UserIdentity {
                id: user_id.to_string(),
                email: Some(format!("{user_id}@x.com")),
                email_confirmed_at: None,
                created_at: None,
                user_metadata: Default::default(),
            },
        }
    }

    fn change(event: AuthChangeEvent, session: Option<Session>) -> AuthStateChange {
        AuthStateChange { event, session }
    }

    fn profile(user_id: &str) -> Profile {
        Profile {
            id: user_id.to_string(),
            primary_language: Some("ar".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        assert_eq!(SessionState::default().status(), AuthStatus::Uninitialized);

        let state = SessionState::loading();
        assert!(state.is_loading());
        assert!(!state.is_authenticated());
        assert!(!state.is_profile_complete());
        assert_eq!(state.preferred_language(), "en");
        assert_eq!(state.language(), Language::En);
        assert!(state.cultural_preferences().is_none());
    }

    #[test]
    fn test_initial_session_transitions() {
        let mut state = SessionState::loading();
        let fetch = state.apply_initial_session(0, Ok(Some(session("u1"))));
        assert_eq!(fetch, Some((1, "u1".to_string())));
        assert_eq!(
            state.status(),
            AuthStatus::Authenticated {
                profile_loaded: false
            }
        );

        let mut state = SessionState::loading();
        assert_eq!(state.apply_initial_session(0, Ok(None)), None);
        assert_eq!(state.status(), AuthStatus::Anonymous);

        let mut state = SessionState::loading();
        let failed = Err(BackendError::Network("offline".to_string()));
        assert_eq!(state.apply_initial_session(0, failed), None);
        assert_eq!(state.status(), AuthStatus::Anonymous);
        assert_eq!(state.error(), Some("network error: offline"));
    }

    #[test]
    fn test_stale_initial_session_is_discarded() {
        let mut state = SessionState::loading();
        state.apply_change(&change(AuthChangeEvent::SignedIn, Some(session("u1"))));

        assert_eq!(state.apply_initial_session(0, Ok(None)), None);
        assert!(state.is_authenticated());
    }

    #[test]
    fn test_profile_follows_identity() {
        let mut state = SessionState::loading();
        let (ticket, _) = state
            .apply_change(&change(AuthChangeEvent::SignedIn, Some(session("u1"))))
            .unwrap();
        assert!(state.apply_profile(ticket, Ok(Some(profile("u1")))));
        assert_eq!(state.language(), Language::Ar);

        // Same identity: the profile survives while it is refetched.
        state.apply_change(&change(AuthChangeEvent::TokenRefreshed, Some(session("u1"))));
        assert!(state.current_profile().is_some());
        assert_eq!(
            state.status(),
            AuthStatus::Authenticated {
                profile_loaded: true
            }
        );

        // A different identity drops it.
        state.apply_change(&change(AuthChangeEvent::SignedIn, Some(session("u2"))));
        assert!(state.current_profile().is_none());

        state.apply_change(&change(AuthChangeEvent::SignedOut, None));
        assert!(!state.is_authenticated());
        assert!(state.current_profile().is_none());
        assert_eq!(state.status(), AuthStatus::Anonymous);
    }

    #[test]
    fn test_stale_profile_is_discarded() {
        let mut state = SessionState::loading();
        let (ticket, _) = state
            .apply_change(&change(AuthChangeEvent::SignedIn, Some(session("u1"))))
            .unwrap();
        state.apply_change(&change(AuthChangeEvent::SignedOut, None));

        assert!(!state.apply_profile(ticket, Ok(Some(profile("u1")))));
        assert!(state.current_profile().is_none());
    }

    #[test]
    fn test_failed_profile_fetch_keeps_cached_profile() {
        let mut state = SessionState::loading();
        let (ticket, _) = state
            .apply_change(&change(AuthChangeEvent::SignedIn, Some(session("u1"))))
            .unwrap();
        state.apply_profile(ticket, Ok(Some(profile("u1"))));

        let failed = Err(BackendError::api(503, "profile store unavailable"));
        assert!(state.apply_profile(ticket, failed));
        assert_eq!(state.current_profile(), Some(&profile("u1")));
        assert_eq!(state.error(), Some("profile store unavailable"));

        // The next change clears the error.
        state.apply_change(&change(AuthChangeEvent::TokenRefreshed, Some(session("u1"))));
        assert_eq!(state.error(), None);
    }
}
