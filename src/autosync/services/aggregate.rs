use async_trait::async_trait;

use crate::autosync::models::{Resource, User, WatchStatus};

use super::SyncService;

/// Fan-out to every enabled sync service.
pub struct Aggregate {
    services: Vec<Box<dyn SyncService>>,
}

impl Aggregate {
    pub fn new(services: Vec<Box<dyn SyncService>>) -> Self {
        let services: Vec<Box<dyn SyncService>> =
            services.into_iter().filter(|s| s.enabled()).collect();
        let names: Vec<&str> = services.iter().map(|s| s.name()).collect();
        tracing::info!("Autosync enabled with {names:?}");
        Self { services }
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

#[async_trait]
impl SyncService for Aggregate {
    fn name(&self) -> &'static str {
        "aggregate"
    }

    async fn update(
        &self,
        user: &User,
        resource: &Resource,
        status: &WatchStatus,
    ) -> anyhow::Result<()> {
        for service in &self.services {
            service.update(user, resource, status).await?;
        }
        Ok(())
    }
}
