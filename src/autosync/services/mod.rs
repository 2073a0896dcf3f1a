use async_trait::async_trait;

use super::models::{Resource, User, WatchStatus};

pub mod aggregate;
pub mod simkl;

/// A third-party tracker receiving per-user watch progress.
#[async_trait]
pub trait SyncService: Send + Sync {
    fn name(&self) -> &'static str;

    /// Services declare themselves off when their credentials are missing.
    fn enabled(&self) -> bool {
        true
    }

    async fn update(
        &self,
        user: &User,
        resource: &Resource,
        status: &WatchStatus,
    ) -> anyhow::Result<()>;
}
