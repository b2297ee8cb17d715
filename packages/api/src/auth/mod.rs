//! Auth Gateway and the localisation of backend auth errors.
//!
//! The gateway is the only place that calls the backend's auth operations. Each
//! call returns `Result<_, AuthFailure>`, where the failure already carries a
//! message the UI can show in the user's language.

mod gateway;
mod i18n;

pub use gateway::{AuthGateway, Registration, SignIn, OAUTH_CALLBACK_PATH, PASSWORD_RESET_PATH};
pub use i18n::{AuthErrorKind, AuthFailure, Language};
