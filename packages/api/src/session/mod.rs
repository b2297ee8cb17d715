//! Session Coordinator: the single source of truth for who is signed in.
//!
//! [`SessionState`] is the plain data the UI renders from;
//! [`SessionCoordinator`] owns it and keeps it in step with the backend.

mod coordinator;
mod state;

pub use coordinator::{
    CoordinatorError, SessionCoordinator, AUTO_REFRESH_MARGIN_SECS, AUTO_REFRESH_TICK,
};
pub use state::{AuthStatus, SessionState};
