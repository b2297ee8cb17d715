//! # API crate: backend access and session state for PlateWise
//!
//! PlateWise keeps no server of its own: authentication, row storage and access
//! control are provided by a hosted Supabase-compatible backend. This crate is the
//! client-side half of that contract. It talks to the backend, normalises every
//! outcome into typed results, and owns the process-wide view of "who is signed in
//! and what are their preferences".
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`backend`] | The two backend seams: [`AuthBackend`] (GoTrue-style auth) and [`ProfileBackend`] (PostgREST-style row store) |
//! | [`supabase`] | HTTP implementation of both seams with `reqwest`, plus session persistence |
//! | [`memory`] | In-memory implementation of both seams for tests and offline demos |
//! | [`events`] | Auth state change fan-out and the owned [`Subscription`] handle |
//! | [`profiles`] | Profile Store Accessor over the `user_profiles` table |
//! | [`auth`] | Auth Gateway and localisation of backend error messages |
//! | [`session`] | Session Coordinator: the state machine the UI renders from |
//! | [`models`] | Identities, sessions, profiles and their derived views |
//! | [`config`] | Backend connection settings from the environment |
//!
//! ## Data flow
//!
//! A UI event calls the [`AuthGateway`], which performs a backend round trip and
//! converts the result to `Result<_, AuthFailure>`. The backend pushes an
//! [`AuthStateChange`] to every live subscription, and the [`SessionCoordinator`]
//! folds it into its [`SessionState`], which the UI mirrors.

pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod events;
pub mod memory;
pub mod models;
pub mod profiles;
pub mod session;
pub mod supabase;

pub use auth::{AuthErrorKind, AuthFailure, AuthGateway, Language, Registration, SignIn};
pub use backend::{AuthBackend, OAuthProvider, ProfileBackend, SignUpRequest, SignUpResponse};
pub use config::{BackendConfig, ConfigError};
pub use error::BackendError;
pub use events::{AuthChangeEvent, AuthChanges, AuthEvents, AuthStateChange, Subscription, SubscriptionHandle};
pub use memory::MemoryBackend;
pub use models::{CulturalPreferences, NewProfile, Profile, ProfileChanges, ProfileSeed, Session, UserIdentity};
pub use profiles::ProfileStore;
pub use session::{AuthStatus, CoordinatorError, SessionCoordinator, SessionState};
pub use supabase::SupabaseClient;
