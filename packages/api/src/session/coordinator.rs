use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::watch;

use crate::auth::{AuthFailure, AuthGateway};
use crate::backend::{AuthBackend, ProfileBackend};
use crate::error::BackendError;
use crate::events::{AuthChanges, AuthStateChange, SubscriptionHandle};
use crate::models::{
    CulturalPreferences, Profile, ProfileChanges, ProfileSeed, Session, UserIdentity,
};

use super::state::SessionState;

type ProfileLoad<'a> = Pin<Box<dyn Future<Output = ()> + 'a>>;

enum Next {
    Change(Option<AuthStateChange>),
    Loaded,
}

/// How often the UI should call [`SessionCoordinator::tick_auto_refresh`].
pub const AUTO_REFRESH_TICK: Duration = Duration::from_secs(30);
/// A session expiring within this many seconds is refreshed on the next tick.
pub const AUTO_REFRESH_MARGIN_SECS: i64 = 90;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinatorError {
    #[error("No authenticated user")]
    NoAuthenticatedUser,
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Owns the [`SessionState`] and keeps it in step with the backend.
///
/// Built for a single-threaded executor: shared as `Rc`, state behind
/// `RefCell`s, and no borrow is held across an `.await`. Two tasks write the
/// state: [`initialize`](Self::initialize) once at startup and
/// [`listen`](Self::listen) for the lifetime of the app. Every write is
/// published to the [`watch`](Self::watch) channel.
pub struct SessionCoordinator<B> {
    gateway: AuthGateway<B>,
    state: RefCell<SessionState>,
    publisher: watch::Sender<SessionState>,
    subscription: RefCell<Option<SubscriptionHandle>>,
    changes: RefCell<Option<AuthChanges>>,
}

impl<B> SessionCoordinator<B>
where
    B: AuthBackend + ProfileBackend + Clone,
{
    /// Subscribes to session changes immediately, so nothing that happens while
    /// [`initialize`](Self::initialize) runs is missed.
    pub fn new(gateway: AuthGateway<B>) -> Self {
        let (subscription, changes) = gateway.subscribe_to_session_changes().split();
        let state = SessionState::loading();
        let (publisher, _) = watch::channel(state.clone());

        Self {
            gateway,
            state: RefCell::new(state),
            publisher,
            subscription: RefCell::new(Some(subscription)),
            changes: RefCell::new(Some(changes)),
        }
    }

    pub fn gateway(&self) -> &AuthGateway<B> {
        &self.gateway
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver that sees every published state, starting with the current one.
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.publisher.subscribe()
    }

    pub fn current_user(&self) -> Option<UserIdentity> {
        self.state.borrow().current_user().cloned()
    }

    pub fn current_session(&self) -> Option<Session> {
        self.state.borrow().current_session().cloned()
    }

    pub fn current_profile(&self) -> Option<Profile> {
        self.state.borrow().current_profile().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    pub fn is_profile_complete(&self) -> bool {
        self.state.borrow().is_profile_complete()
    }

    pub fn preferred_language(&self) -> String {
        self.state.borrow().preferred_language().to_string()
    }

    pub fn cultural_preferences(&self) -> Option<CulturalPreferences> {
        self.state.borrow().cultural_preferences()
    }

    fn update<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let (result, snapshot) = {
            let mut state = self.state.borrow_mut();
            let result = f(&mut state);
            (result, state.clone())
        };
        self.publisher.send_replace(snapshot);
        result
    }

    /// Restore the persisted session and load its profile. A notification
    /// handled while the fetch is in flight supersedes its result.
    pub async fn initialize(&self) {
        let ticket = self.state.borrow().seq();
        let result = self.gateway.load_session().await;
        let fetch = self.update(|state| state.apply_initial_session(ticket, result));
        if let Some((ticket, user_id)) = fetch {
            self.load_profile(ticket, user_id).await;
        }
    }

    /// Apply session changes until [`shutdown`](Self::shutdown) releases the
    /// subscription. Only the first call listens; later calls return at once.
    ///
    /// Each change is folded into the state as soon as it arrives, even while
    /// the profile load started by the previous one is still running. A newer
    /// change always supersedes that load, so it is dropped.
    pub async fn listen(&self) {
        let Some(mut changes) = self.changes.borrow_mut().take() else {
            tracing::debug!("session changes already being consumed");
            return;
        };

        let mut pending: Option<ProfileLoad<'_>> = None;
        loop {
            let next = match pending.as_mut() {
                Some(load) => tokio::select! {
                    biased;
                    change = changes.next() => Next::Change(change),
                    () = load => Next::Loaded,
                },
                None => Next::Change(changes.next().await),
            };

            match next {
                Next::Loaded => pending = None,
                Next::Change(Some(change)) => {
                    if pending.take().is_some() {
                        tracing::debug!(event = ?change.event, "dropping superseded profile load");
                    }
                    pending = self.apply_change(&change).map(|(ticket, user_id)| {
                        Box::pin(self.load_profile(ticket, user_id)) as ProfileLoad<'_>
                    });
                }
                Next::Change(None) => break,
            }
        }

        if let Some(load) = pending {
            load.await;
        }
        tracing::debug!("session change stream ended");
    }

    /// Fold one notification into the state, then load the profile of the
    /// identity it carries.
    pub async fn handle_change(&self, change: AuthStateChange) {
        if let Some((ticket, user_id)) = self.apply_change(&change) {
            self.load_profile(ticket, user_id).await;
        }
    }

    fn apply_change(&self, change: &AuthStateChange) -> Option<(u64, String)> {
        self.update(|state| state.apply_change(change))
    }

    async fn load_profile(&self, ticket: u64, user_id: String) {
        let result = self.gateway.profiles().get(&user_id).await;
        if let Err(ref e) = result {
            tracing::warn!(user = %user_id, error = %e, "could not load profile");
        }
        self.update(|state| state.apply_profile(ticket, result));
    }

    fn current_ticket(&self) -> Result<(u64, String), CoordinatorError> {
        let state = self.state.borrow();
        let user = state
            .current_user()
            .ok_or(CoordinatorError::NoAuthenticatedUser)?;
        Ok((state.seq(), user.id.clone()))
    }

    /// Refetch the current user's profile. On failure the error is recorded
    /// and the cached profile is left as it was.
    pub async fn refresh_profile(&self) -> Result<Option<Profile>, CoordinatorError> {
        let (ticket, user_id) = self.current_ticket()?;
        match self.gateway.profiles().get(&user_id).await {
            Ok(profile) => {
                self.update(|state| state.apply_profile(ticket, Ok(profile.clone())));
                Ok(profile)
            }
            Err(e) => {
                self.update(|state| state.record_error(e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Write `changes` to the current user's profile and cache the result.
    ///
    /// An identity without a profile row (sign-up with email confirmation, or
    /// a failed insert at registration) gets the row created from `changes`.
    pub async fn update_profile(
        &self,
        changes: &ProfileChanges,
    ) -> Result<Profile, CoordinatorError> {
        let (ticket, user_id) = self.current_ticket()?;
        let has_row = self.state.borrow().current_profile().is_some();
        let result = if has_row {
            self.gateway.profiles().update(&user_id, changes).await
        } else {
            self.create_profile(&user_id, changes).await
        };

        match result {
            Ok(profile) => {
                self.update(|state| state.apply_profile(ticket, Ok(Some(profile.clone()))));
                Ok(profile)
            }
            Err(e) => {
                self.update(|state| state.record_error(e.to_string()));
                Err(e.into())
            }
        }
    }

    async fn create_profile(
        &self,
        user_id: &str,
        changes: &ProfileChanges,
    ) -> Result<Profile, BackendError> {
        let profiles = self.gateway.profiles();
        match profiles.create(user_id, &ProfileSeed::from(changes)).await {
            Ok(profile) if !changes.sets_secondary() => Ok(profile),
            Ok(_) => profiles.update(user_id, changes).await,
            // The row exists but was never loaded into the cache.
            Err(BackendError::Api { status: 409, .. }) => {
                tracing::debug!(user = user_id, "profile row already exists, updating");
                profiles.update(user_id, changes).await
            }
            Err(e) => Err(e),
        }
    }

    /// Refresh the session when it expires within the auto-refresh margin.
    /// Returns the new session, or `None` if nothing needed refreshing. The
    /// state itself is updated by the resulting notification.
    pub async fn tick_auto_refresh(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, AuthFailure> {
        let due = self.state.borrow().current_session().is_some_and(|session| {
            session.expires_within(now, chrono::Duration::seconds(AUTO_REFRESH_MARGIN_SECS))
        });
        if !due {
            return Ok(None);
        }

        tracing::debug!("session close to expiry, refreshing");
        match self.gateway.refresh_session().await {
            Ok(session) => Ok(Some(session)),
            Err(failure) => {
                tracing::warn!(error = %failure, "session refresh failed");
                self.update(|state| state.record_error(failure.message.clone()));
                Err(failure)
            }
        }
    }

    /// Release the session change subscription. [`listen`](Self::listen)
    /// returns once the queued changes are handled. Calling it again does
    /// nothing.
    pub fn shutdown(&self) {
        let handle = self.subscription.borrow_mut().take();
        if let Some(handle) = handle {
            tracing::debug!(subscription = handle.id(), "releasing session listener");
            handle.unsubscribe();
        }
    }

    pub fn is_listening(&self) -> bool {
        self.subscription.borrow().is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::auth::Language;
    use crate::events::AuthChangeEvent;
    use crate::session::AuthStatus;
    use crate::MemoryBackend;

    fn coordinator(backend: &MemoryBackend) -> SessionCoordinator<MemoryBackend> {
        SessionCoordinator::new(AuthGateway::new(backend.clone(), "http://localhost:8080"))
    }

    fn profile(user_id: &str) -> Profile {
        Profile {
            id: user_id.to_string(),
            display_name: Some("Amara".to_string()),
            primary_language: Some("es".to_string()),
            primary_cuisine: Some("mexican".to_string()),
            family_size: Some(4),
            monthly_budget: Some(400.0),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_initialize_without_session() {
        let backend = MemoryBackend::new();
        let coordinator = coordinator(&backend);
        assert!(coordinator.is_loading());

        coordinator.initialize().await;
        assert!(!coordinator.is_loading());
        assert!(!coordinator.is_authenticated());
        assert_eq!(coordinator.snapshot().status(), AuthStatus::Anonymous);
    }

    #[tokio::test]
    async fn test_initialize_restores_session_and_profile() {
        let backend = MemoryBackend::new();
        let user = backend.seed_account("a@x.com", "secret1", true);
        backend.seed_profile(profile(&user.id));
        backend.persist_session_for(&user);
        let coordinator = coordinator(&backend);
        let watcher = coordinator.watch();

        coordinator.initialize().await;
        assert_eq!(coordinator.current_user().map(|u| u.id), Some(user.id));
        assert!(coordinator.is_profile_complete());
        assert_eq!(coordinator.preferred_language(), "es");
        assert_eq!(*watcher.borrow(), coordinator.snapshot());
    }

    #[tokio::test]
    async fn test_profile_failure_still_authenticates() {
        let backend = MemoryBackend::new();
        let user = backend.seed_account("a@x.com", "secret1", true);
        backend.persist_session_for(&user);
        backend.fail_profile_reads(true);
        let coordinator = coordinator(&backend);

        coordinator.initialize().await;
        let state = coordinator.snapshot();
        assert!(state.is_authenticated());
        assert!(state.current_profile().is_none());
        assert_eq!(state.error(), Some("profile store unavailable"));
    }

    #[tokio::test]
    async fn test_change_during_held_initialize_wins() {
        let backend = MemoryBackend::new();
        let user = backend.seed_account("a@x.com", "secret1", true);
        backend.seed_profile(profile(&user.id));
        let coordinator = coordinator(&backend);
        let release = backend.hold_next_session_fetch();

        tokio::join!(coordinator.initialize(), coordinator.listen(), async {
            coordinator
                .gateway()
                .authenticate("a@x.com", "secret1", Language::En)
                .await
                .unwrap();
            tokio::task::yield_now().await;
            tokio::task::yield_now().await;
            let _ = release.send(());
            tokio::task::yield_now().await;
            tokio::task::yield_now().await;
            coordinator.shutdown();
        });

        // The held fetch saw no session; the sign-in notification is newer.
        assert!(coordinator.is_authenticated());
        assert_eq!(coordinator.current_profile(), Some(profile(&user.id)));
        assert!(!coordinator.is_listening());
    }

    #[tokio::test]
    async fn test_sign_out_clears_profile() {
        let backend = MemoryBackend::new();
        let user = backend.seed_account("a@x.com", "secret1", true);
        backend.seed_profile(profile(&user.id));
        backend.persist_session_for(&user);
        let coordinator = coordinator(&backend);
        coordinator.initialize().await;
        assert!(coordinator.current_profile().is_some());

        tokio::join!(coordinator.listen(), async {
            coordinator.gateway().terminate_session().await.unwrap();
            coordinator.shutdown();
        });

        assert!(!coordinator.is_authenticated());
        assert!(coordinator.current_profile().is_none());
        assert_eq!(coordinator.preferred_language(), "en");
    }

    #[tokio::test]
    async fn test_refresh_profile_requires_user() {
        let backend = MemoryBackend::new();
        let coordinator = coordinator(&backend);
        coordinator.initialize().await;

        assert_eq!(
            coordinator.refresh_profile().await,
            Err(CoordinatorError::NoAuthenticatedUser)
        );
        assert_eq!(
            coordinator
                .update_profile(&ProfileChanges::default())
                .await
                .unwrap_err()
                .to_string(),
            "No authenticated user"
        );
    }

    #[tokio::test]
    async fn test_refresh_profile_failure_keeps_cache() {
        let backend = MemoryBackend::new();
        let user = backend.seed_account("a@x.com", "secret1", true);
        backend.seed_profile(profile(&user.id));
        backend.persist_session_for(&user);
        let coordinator = coordinator(&backend);
        coordinator.initialize().await;

        backend.fail_profile_reads(true);
        assert!(coordinator.refresh_profile().await.is_err());
        assert_eq!(coordinator.current_profile(), Some(profile(&user.id)));
        assert_eq!(
            coordinator.snapshot().error(),
            Some("profile store unavailable")
        );
    }

    #[tokio::test]
    async fn test_update_profile_replaces_cache() {
        let backend = MemoryBackend::new();
        let user = backend.seed_account("a@x.com", "secret1", true);
        backend.seed_profile(profile(&user.id));
        backend.persist_session_for(&user);
        let coordinator = coordinator(&backend);
        coordinator.initialize().await;

        let updated = coordinator
            .update_profile(&ProfileChanges {
                primary_language: Some("ar".to_string()),
                monthly_budget: Some(None),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(coordinator.current_profile(), Some(updated));
        assert_eq!(coordinator.snapshot().language(), Language::Ar);
        assert!(!coordinator.is_profile_complete());
    }

    #[tokio::test]
    async fn test_sign_out_applies_while_profile_load_pending() {
        let backend = MemoryBackend::new();
        let user = backend.seed_account("a@x.com", "secret1", true);
        backend.seed_profile(profile(&user.id));
        let coordinator = coordinator(&backend);
        coordinator.initialize().await;
        let release = backend.hold_next_profile_fetch();

        tokio::join!(coordinator.listen(), async {
            coordinator
                .gateway()
                .authenticate("a@x.com", "secret1", Language::En)
                .await
                .unwrap();
            tokio::task::yield_now().await;
            tokio::task::yield_now().await;
            assert!(coordinator.is_authenticated());
            assert!(coordinator.current_profile().is_none());

            // The profile read for the sign-in is still held.
            coordinator.gateway().terminate_session().await.unwrap();
            tokio::task::yield_now().await;
            tokio::task::yield_now().await;
            assert!(!coordinator.is_authenticated());
            assert!(coordinator.current_session().is_none());

            let _ = release.send(());
            tokio::task::yield_now().await;
            coordinator.shutdown();
        });

        assert!(!coordinator.is_authenticated());
        assert!(coordinator.current_profile().is_none());
        assert_eq!(coordinator.snapshot().status(), AuthStatus::Anonymous);
    }

    #[tokio::test]
    async fn test_update_profile_creates_missing_row() {
        let backend = MemoryBackend::new();
        let user = backend.seed_account("a@x.com", "secret1", true);
        backend.persist_session_for(&user);
        let coordinator = coordinator(&backend);
        coordinator.initialize().await;
        assert!(coordinator.is_authenticated());
        assert!(coordinator.current_profile().is_none());

        let created = coordinator
            .update_profile(&ProfileChanges {
                display_name: Some("Amara".to_string()),
                primary_language: Some("es".to_string()),
                primary_cuisine: Some("mexican".to_string()),
                secondary_cuisines: Some(BTreeSet::from(["indian".to_string()])),
                family_size: Some(4),
                monthly_budget: Some(Some(400.0)),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(backend.profile(&user.id), Some(created.clone()));
        assert_eq!(coordinator.current_profile(), Some(created.clone()));
        assert!(created.secondary_cuisines.contains("indian"));
        assert!(coordinator.is_profile_complete());
    }

    #[tokio::test]
    async fn test_update_profile_with_row_missing_from_cache() {
        let backend = MemoryBackend::new();
        let user = backend.seed_account("a@x.com", "secret1", true);
        backend.persist_session_for(&user);
        backend.fail_profile_reads(true);
        let coordinator = coordinator(&backend);
        coordinator.initialize().await;
        assert!(coordinator.current_profile().is_none());

        backend.fail_profile_reads(false);
        backend.seed_profile(profile(&user.id));
        let updated = coordinator
            .update_profile(&ProfileChanges {
                family_size: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(updated.family_size, Some(2));
        assert_eq!(updated.display_name.as_deref(), Some("Amara"));
        assert_eq!(coordinator.current_profile(), Some(updated));
    }

    #[tokio::test]
    async fn test_auto_refresh_near_expiry() {
        let backend = MemoryBackend::new();
        let user = backend.seed_account("a@x.com", "secret1", true);
        let session = backend.persist_session_for(&user);
        let coordinator = coordinator(&backend);
        coordinator.initialize().await;

        let now = Utc::now();
        assert_eq!(coordinator.tick_auto_refresh(now).await, Ok(None));

        let near_expiry = session.expires_at().unwrap() - chrono::Duration::seconds(60);
        let refreshed = coordinator
            .tick_auto_refresh(near_expiry)
            .await
            .unwrap()
            .unwrap();
        assert_ne!(refreshed.access_token, session.access_token);

        tokio::join!(coordinator.listen(), async { coordinator.shutdown() });
        assert_eq!(
            coordinator.current_session().map(|s| s.access_token),
            Some(refreshed.access_token)
        );
    }

    #[tokio::test]
    async fn test_shutdown_releases_once() {
        let backend = MemoryBackend::new();
        let coordinator = coordinator(&backend);
        assert_eq!(backend.subscriber_count(), 1);

        coordinator.shutdown();
        coordinator.shutdown();
        assert_eq!(backend.subscriber_count(), 0);
        assert!(!coordinator.is_listening());

        backend.emit(AuthChangeEvent::SignedOut, None);
        coordinator.listen().await;
    }
}
