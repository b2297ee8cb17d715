//! # Auth state change notifications
//!
//! The backend client pushes an [`AuthStateChange`] whenever its session changes:
//! sign-in, sign-out, token refresh, user update, password recovery. Listeners
//! register through [`AuthEvents::subscribe`] and receive every change emitted
//! after that point, in order.
//!
//! A [`Subscription`] is an owned handle. Dropping it (or calling
//! [`Subscription::unsubscribe`]) removes the listener, so release happens exactly
//! once and cannot be repeated. A subscription can be split into the
//! [`SubscriptionHandle`] that keeps it registered and the [`AuthChanges`] stream
//! that yields the changes; the stream ends as soon as the handle is released.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::models::Session;

/// What caused a session change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthChangeEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    PasswordRecovery,
}

impl AuthChangeEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SignedIn => "SIGNED_IN",
            Self::SignedOut => "SIGNED_OUT",
            Self::TokenRefreshed => "TOKEN_REFRESHED",
            Self::UserUpdated => "USER_UPDATED",
            Self::PasswordRecovery => "PASSWORD_RECOVERY",
        }
    }
}

/// A change pushed to subscribers: the event and the session after it.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthStateChange {
    pub event: AuthChangeEvent,
    pub session: Option<Session>,
}

#[derive(Debug, Default)]
struct Listeners {
    next_id: u64,
    senders: Vec<(u64, UnboundedSender<AuthStateChange>)>,
}

fn lock(listeners: &Mutex<Listeners>) -> MutexGuard<'_, Listeners> {
    listeners.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Fan-out of auth state changes to every live subscription.
#[derive(Clone, Debug, Default)]
pub struct AuthEvents {
    listeners: Arc<Mutex<Listeners>>,
}

impl AuthEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = {
            let mut listeners = lock(&self.listeners);
            listeners.next_id += 1;
            let id = listeners.next_id;
            listeners.senders.push((id, sender));
            id
        };
        tracing::debug!(subscription = id, "auth listener registered");

        Subscription {
            handle: SubscriptionHandle {
                id,
                listeners: Arc::downgrade(&self.listeners),
            },
            changes: AuthChanges { receiver },
        }
    }

    /// Push a change to every subscriber. Listeners whose stream has been
    /// dropped are pruned.
    pub fn emit(&self, event: AuthChangeEvent, session: Option<Session>) {
        tracing::debug!(
            event = event.as_str(),
            user = session.as_ref().and_then(|s| s.user.email.as_deref()),
            "auth state changed"
        );
        let change = AuthStateChange { event, session };
        lock(&self.listeners)
            .senders
            .retain(|(_, sender)| sender.send(change.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.listeners).senders.len()
    }
}

/// Keeps a listener registered until it is dropped.
#[derive(Debug)]
pub struct SubscriptionHandle {
    id: u64,
    listeners: Weak<Mutex<Listeners>>,
}

impl SubscriptionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn unsubscribe(self) {}
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        let Some(listeners) = self.listeners.upgrade() else {
            return;
        };
        lock(&listeners).senders.retain(|(id, _)| *id != self.id);
        tracing::debug!(subscription = self.id, "auth listener released");
    }
}

/// The stream of changes delivered to one subscription.
#[derive(Debug)]
pub struct AuthChanges {
    receiver: UnboundedReceiver<AuthStateChange>,
}

impl AuthChanges {
    /// Wait for the next change. Returns `None` once the subscription has been
    /// released and every queued change has been delivered.
    pub async fn next(&mut self) -> Option<AuthStateChange> {
        self.receiver.recv().await
    }

    /// Take a queued change without waiting.
    pub fn try_next(&mut self) -> Option<AuthStateChange> {
        self.receiver.try_recv().ok()
    }
}

/// A registered auth listener.
#[derive(Debug)]
pub struct Subscription {
    handle: SubscriptionHandle,
    changes: AuthChanges,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.handle.id
    }

    pub async fn next(&mut self) -> Option<AuthStateChange> {
        self.changes.next().await
    }

    pub fn try_next(&mut self) -> Option<AuthStateChange> {
        self.changes.try_next()
    }

    pub fn unsubscribe(self) {}

    pub fn split(self) -> (SubscriptionHandle, AuthChanges) {
        (self.handle, self.changes)
    }
}
