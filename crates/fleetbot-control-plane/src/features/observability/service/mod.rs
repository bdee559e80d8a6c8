use crate::features::observability::repo::ObservabilityRepository;
use crate::shared::types::LifecycleAction;
use std::sync::Arc;

pub struct ObservabilityService {
    repo: Arc<ObservabilityRepository>,
}

impl ObservabilityService {
    pub fn new(repo: Arc<ObservabilityRepository>) -> Self {
        Self { repo }
    }

    pub fn record_interaction(&self, kind: &str, outcome: &str, seconds: f64) {
        self.repo.observe_interaction(kind, outcome, seconds);
    }

    pub fn record_lifecycle_request(&self, action: LifecycleAction, accepted: bool) {
        self.repo.inc_lifecycle_request(action.as_str(), accepted);
    }

    pub fn record_directory_refresh(&self, seconds: f64, records: usize) {
        self.repo.observe_directory_refresh(seconds, records);
    }

    pub fn set_active_sessions(&self, count: usize) {
        self.repo.set_active_sessions(count as f64);
    }

    pub fn render_metrics(&self) -> Result<String, String> {
        self.repo.render_metrics()
    }
}
