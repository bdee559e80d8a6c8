use crate::features::observability::repo::ObservabilityRepository;
use crate::features::observability::service::ObservabilityService;
use crate::shared::error::{BotError, BotResult};
use crate::shared::types::LifecycleAction;
use std::sync::Arc;

pub struct ObservabilityController {
    service: ObservabilityService,
}

impl ObservabilityController {
    pub fn new(service: ObservabilityService) -> Self {
        Self { service }
    }

    /// Controller over a fresh registry
    pub fn build() -> BotResult<Arc<Self>> {
        let repo = ObservabilityRepository::new().map_err(BotError::StorageError)?;
        Ok(Arc::new(Self::new(ObservabilityService::new(Arc::new(
            repo,
        )))))
    }

    pub fn record_interaction(&self, kind: &str, outcome: &str, seconds: f64) {
        self.service.record_interaction(kind, outcome, seconds);
    }

    pub fn record_lifecycle_request(&self, action: LifecycleAction, accepted: bool) {
        self.service.record_lifecycle_request(action, accepted);
    }

    pub fn record_directory_refresh(&self, seconds: f64, records: usize) {
        self.service.record_directory_refresh(seconds, records);
    }

    pub fn set_active_sessions(&self, count: usize) {
        self.service.set_active_sessions(count);
    }

    pub fn render_metrics(&self) -> Result<String, String> {
        self.service.render_metrics()
    }
}
