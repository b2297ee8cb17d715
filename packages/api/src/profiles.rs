//! Profile Store Accessor: read, create and update the one `user_profiles` row
//! that belongs to each identity.
//!
//! Every operation returns `Result<_, BackendError>`; callers decide whether a
//! failure is fatal (a profile update from the settings form) or only worth a
//! log line (the profile insert that follows registration).

use crate::backend::ProfileBackend;
use crate::error::BackendError;
use crate::models::{NewProfile, Profile, ProfileChanges, ProfileSeed};

#[derive(Clone, Debug)]
pub struct ProfileStore<B> {
    backend: B,
}

impl<B: ProfileBackend> ProfileStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// The profile of `user_id`, or `None` if the row was never created.
    pub async fn get(&self, user_id: &str) -> Result<Option<Profile>, BackendError> {
        self.backend.select_profile(user_id).await.inspect_err(|e| {
            tracing::debug!(user = user_id, error = %e, "profile read failed");
        })
    }

    /// Insert the profile for a freshly registered identity, applying the
    /// registration defaults to whatever the seed leaves out.
    pub async fn create(&self, user_id: &str, seed: &ProfileSeed) -> Result<Profile, BackendError> {
        let row = NewProfile::from_seed(user_id, seed);
        self.backend.insert_profile(&row).await.inspect_err(|e| {
            tracing::debug!(user = user_id, error = %e, "profile insert failed");
        })
    }

    pub async fn update(
        &self,
        user_id: &str,
        changes: &ProfileChanges,
    ) -> Result<Profile, BackendError> {
        self.backend
            .update_profile(user_id, changes)
            .await
            .inspect_err(|e| {
                tracing::debug!(user = user_id, error = %e, "profile update failed");
            })
    }
}
