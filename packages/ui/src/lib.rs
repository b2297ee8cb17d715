//! This crate contains all shared UI for the workspace.

pub mod components;
pub mod options;

// Re-export icon library
pub use dioxus_free_icons::Icon;
pub mod icons {
    pub use dioxus_free_icons::icons::fa_solid_icons::*;
}
pub mod brand_icons {
    pub use dioxus_free_icons::icons::fa_brands_icons::*;
}

mod auth;
pub use auth::{use_auth, use_coordinator, AppCoordinator, AuthProvider, OAuthButton, SignOutButton};

mod auth_form;
pub use auth_form::{
    check_new_password, parse_budget, parse_family_size, AuthForm, AuthFormState, AuthMode,
    FormError, MAX_FAMILY_SIZE, MIN_PASSWORD_LEN,
};

mod profile_summary;
pub use profile_summary::{format_budget, ProfileSummary};

pub use components::{BadgeKind, BentoCard, BentoSize, BentoVariant, CulturalBadge};
