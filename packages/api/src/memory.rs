use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tokio::sync::oneshot;
use url::Url;

use crate::backend::{AuthBackend, OAuthProvider, ProfileBackend, SignUpRequest, SignUpResponse};
use crate::error::BackendError;
use crate::events::{AuthChangeEvent, AuthEvents, Subscription};
use crate::models::{NewProfile, Profile, ProfileChanges, Session, UserIdentity};
use crate::supabase::callback::CallbackParams;

const SESSION_LIFETIME_SECS: i64 = 3600;
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug)]
struct Account {
    password: String,
    user: UserIdentity,
}

#[derive(Debug, Default)]
struct MemoryState {
    accounts: HashMap<String, Account>,
    profiles: HashMap<String, Profile>,
    session: Option<Session>,
    auto_confirm: bool,
    fail_profile_inserts: bool,
    fail_profile_reads: bool,
    redirect_tokens: HashMap<String, UserIdentity>,
    session_gate: Option<oneshot::Receiver<()>>,
    profile_gate: Option<oneshot::Receiver<()>>,
    issued: u64,
    reset_requests: Vec<(String, String)>,
}

impl MemoryState {
    fn issue_session(&mut self, user: UserIdentity) -> Session {
        self.issued += 1;
        let session = Session {
            access_token: format!("memory-access-{}", self.issued),
            refresh_token: format!("memory-refresh-{}", self.issued),
            token_type: "bearer".to_string(),
            expires_in: SESSION_LIFETIME_SECS,
            expires_at: None,
            user,
        }
        .with_expiry_from(Utc::now());
        self.session = Some(session.clone());
        session
    }
}

/// In-memory auth and profile backend for testing and offline demos.
///
/// Behaves like the hosted backend closely enough for the gateway and the
/// coordinator: same error messages, same events, same confirmation rules. The
/// knobs (`with_auto_confirm`, `fail_profile_inserts`, the `hold_next_*_fetch`
/// gates, ...) reproduce the situations that are awkward to provoke against a
/// real server.
#[derive(Clone, Debug, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
    events: AuthEvents,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Confirm new accounts immediately, the way a backend with email
    /// confirmation disabled does.
    pub fn with_auto_confirm(self, auto_confirm: bool) -> Self {
        self.lock().auto_confirm = auto_confirm;
        self
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn fail_profile_inserts(&self, fail: bool) {
        self.lock().fail_profile_inserts = fail;
    }

    pub fn fail_profile_reads(&self, fail: bool) {
        self.lock().fail_profile_reads = fail;
    }

    /// Create an account directly, bypassing sign-up.
    pub fn seed_account(&self, email: &str, password: &str, confirmed: bool) -> UserIdentity {
        let user = UserIdentity {
            id: uuid::Uuid::new_v4().to_string(),
            email: Some(email.to_string()),
            email_confirmed_at: confirmed.then(Utc::now),
            created_at: Some(Utc::now()),
            user_metadata: Default::default(),
        };
        self.lock().accounts.insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                user: user.clone(),
            },
        );
        user
    }

    pub fn seed_profile(&self, profile: Profile) {
        self.lock().profiles.insert(profile.id.clone(), profile);
    }

    /// Store a session as if it had been persisted by an earlier page load.
    /// No event is emitted.
    pub fn persist_session_for(&self, user: &UserIdentity) -> Session {
        self.lock().issue_session(user.clone())
    }

    /// Make the next `get_session` wait until the returned sender fires (or is
    /// dropped). The held fetch answers with the session stored when it was
    /// issued, which reproduces a slow startup fetch overtaken by a change.
    pub fn hold_next_session_fetch(&self) -> oneshot::Sender<()> {
        let (release, gate) = oneshot::channel();
        self.lock().session_gate = Some(gate);
        release
    }

    /// Make the next `select_profile` wait until the returned sender fires (or
    /// is dropped), answering with the row as it was when the read began.
    pub fn hold_next_profile_fetch(&self) -> oneshot::Sender<()> {
        let (release, gate) = oneshot::channel();
        self.lock().profile_gate = Some(gate);
        release
    }

    /// Push a change to subscribers as if the backend had produced it, e.g. a
    /// sign-out forced by a failed token refresh. The stored session follows
    /// the change.
    pub fn emit(&self, event: AuthChangeEvent, session: Option<Session>) {
        self.lock().session = session.clone();
        self.events.emit(event, session);
    }

    pub fn profile(&self, user_id: &str) -> Option<Profile> {
        self.lock().profiles.get(user_id).cloned()
    }

    pub fn current_session(&self) -> Option<Session> {
        self.lock().session.clone()
    }

    /// The URL the backend would send `user` back to after an OAuth sign-in,
    /// or after following a reset link when `recovery` is set. Its access
    /// token is only accepted by `session_from_url`.
    pub fn redirect_url_for(&self, user: &UserIdentity, recovery: bool) -> String {
        let mut state = self.lock();
        state.issued += 1;
        let access_token = format!("memory-redirect-{}", state.issued);
        state
            .redirect_tokens
            .insert(access_token.clone(), user.clone());

        let mut url = format!(
            "http://localhost:8080/auth/callback#access_token={access_token}&refresh_token=memory-refresh-{}&expires_in={SESSION_LIFETIME_SECS}&token_type=bearer",
            state.issued
        );
        if recovery {
            url.push_str("&type=recovery");
        }
        url
    }

    /// `(email, redirect_to)` for every password reset requested so far.
    pub fn reset_requests(&self) -> Vec<(String, String)> {
        self.lock().reset_requests.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.subscriber_count()
    }
}

impl AuthBackend for MemoryBackend {
    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpResponse, BackendError> {
        let (user, session) = {
            let mut state = self.lock();
            if state.accounts.contains_key(&request.email) {
                return Err(BackendError::api(422, "User already registered"));
            }
            if request.password.len() < MIN_PASSWORD_LEN {
                return Err(BackendError::api(
                    422,
                    "Password should be at least 6 characters",
                ));
            }

            let user = UserIdentity {
                id: uuid::Uuid::new_v4().to_string(),
                email: Some(request.email.clone()),
                email_confirmed_at: state.auto_confirm.then(Utc::now),
                created_at: Some(Utc::now()),
                user_metadata: request.data.clone(),
            };
            state.accounts.insert(
                request.email.clone(),
                Account {
                    password: request.password.clone(),
                    user: user.clone(),
                },
            );
            let session = if state.auto_confirm {
                Some(state.issue_session(user.clone()))
            } else {
                None
            };
            (user, session)
        };

        if let Some(ref session) = session {
            self.events
                .emit(AuthChangeEvent::SignedIn, Some(session.clone()));
        }
        Ok(SignUpResponse {
            user: Some(user),
            session,
        })
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, BackendError> {
        let session = {
            let mut state = self.lock();
            let user = match state.accounts.get(email) {
                Some(account) if account.password == password => account.user.clone(),
                _ => return Err(BackendError::api(400, "Invalid login credentials")),
            };
            if !user.is_confirmed() {
                return Err(BackendError::api(400, "Email not confirmed"));
            }
            state.issue_session(user)
        };

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
            "memory://auth/authorize",
            &[("provider", provider.as_str()), ("redirect_to", redirect_to)],
        )
        .map(String::from)
        .map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.lock().session = None;
        self.events.emit(AuthChangeEvent::SignedOut, None);
        Ok(())
    }

    async fn get_session(&self) -> Result<Option<Session>, BackendError> {
        // The answer is read before waiting, like a request already in flight.
        let (gate, session) = {
            let mut state = self.lock();
            (state.session_gate.take(), state.session.clone())
        };
        if let Some(gate) = gate {
            // A dropped sender releases the fetch as well.
            let _ = gate.await;
        }
        Ok(session)
    }

    async fn refresh_session(&self) -> Result<Session, BackendError> {
        let session = {
            let mut state = self.lock();
            let Some(user) = state.session.as_ref().map(|s| s.user.clone()) else {
                return Err(BackendError::SessionMissing);
            };
            state.issue_session(user)
        };

        self.events
            .emit(AuthChangeEvent::TokenRefreshed, Some(session.clone()));
        Ok(session)
    }

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), BackendError> {
        self.lock()
            .reset_requests
            .push((email.to_string(), redirect_to.to_string()));
        Ok(())
    }

    async fn update_password(&self, password: &str) -> Result<UserIdentity, BackendError> {
        let session = {
            let mut state = self.lock();
            let Some(mut session) = state.session.clone() else {
                return Err(BackendError::SessionMissing);
            };
            if password.len() < MIN_PASSWORD_LEN {
                return Err(BackendError::api(
                    422,
                    "Password should be at least 6 characters",
                ));
            }
            let email = session.user.email.clone().unwrap_or_default();
            let Some(account) = state.accounts.get_mut(&email) else {
                return Err(BackendError::api(404, "User not found"));
            };
            account.password = password.to_string();
            session.user = account.user.clone();
            state.session = Some(session.clone());
            session
        };

        let user = session.user.clone();
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

        let event = if params.is_recovery() {
            AuthChangeEvent::PasswordRecovery
        } else {
            AuthChangeEvent::SignedIn
        };
        let session = {
            let mut state = self.lock();
            let Some(user) = state.redirect_tokens.remove(&params.access_token) else {
                return Err(BackendError::api(401, "invalid JWT"));
            };
            let session = params.into_session(user);
            state.session = Some(session.clone());
            session
        };

        self.events.emit(event, Some(session.clone()));
        Ok(Some((event, session)))
    }

    fn on_auth_state_change(&self) -> Subscription {
        self.events.subscribe()
    }
}

impl ProfileBackend for MemoryBackend {
    async fn select_profile(&self, user_id: &str) -> Result<Option<Profile>, BackendError> {
        let (gate, answer) = {
            let mut state = self.lock();
            let answer = if state.fail_profile_reads {
                Err(BackendError::api(503, "profile store unavailable"))
            } else {
                Ok(state.profiles.get(user_id).cloned())
            };
            (state.profile_gate.take(), answer)
        };
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        answer
    }

    async fn insert_profile(&self, row: &NewProfile) -> Result<Profile, BackendError> {
        let mut state = self.lock();
        if state.fail_profile_inserts {
            return Err(BackendError::api(503, "profile store unavailable"));
        }
        if state.profiles.contains_key(&row.id) {
            return Err(BackendError::api(
                409,
                "duplicate key value violates unique constraint \"user_profiles_pkey\"",
            ));
        }
        let profile = row.clone().into_profile();
        state.profiles.insert(profile.id.clone(), profile.clone());
        Ok(profile)
    }

    async fn update_profile(
        &self,
        user_id: &str,
        changes: &ProfileChanges,
    ) -> Result<Profile, BackendError> {
        let mut state = self.lock();
        let Some(profile) = state.profiles.get_mut(user_id) else {
            return Err(BackendError::api(
                406,
                "JSON object requested, multiple (or no) rows returned",
            ));
        };
        profile.apply(changes);
        Ok(profile.clone())
    }
}
