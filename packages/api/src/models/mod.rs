//! Data models shared by the backend client, the gateway and the UI.

mod profile;
mod user;

pub use profile::{
    CulturalPreferences, NewProfile, Profile, ProfileChanges, ProfileSeed, DEFAULT_CUISINE,
    DEFAULT_FAMILY_SIZE, DEFAULT_LANGUAGE,
};
pub use user::{Session, UserIdentity};
