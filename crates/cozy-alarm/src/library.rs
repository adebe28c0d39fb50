//! Sound library collaborator contract.
//!
//! The resolver reads user sounds through this trait; library management
//! (upload, rename, favorites UI) lives outside the core.

use async_trait::async_trait;

use cozy_core::error::CozyError;
use cozy_core::types::UserSound;
use cozy_storage::SoundRepository;

/// Read access to the user sound library.
#[async_trait]
pub trait SoundLibrary: Send + Sync {
    /// Look up one sound by store id.
    async fn get_by_id(&self, id: i64) -> Result<Option<UserSound>, CozyError>;

    /// All favorited sounds, oldest first.
    async fn list_favorited(&self) -> Result<Vec<UserSound>, CozyError>;
}

#[async_trait]
impl SoundLibrary for SoundRepository {
    async fn get_by_id(&self, id: i64) -> Result<Option<UserSound>, CozyError> {
        SoundRepository::get_by_id(self, id)
    }

    async fn list_favorited(&self) -> Result<Vec<UserSound>, CozyError> {
        SoundRepository::list_favorited(self)
    }
}
