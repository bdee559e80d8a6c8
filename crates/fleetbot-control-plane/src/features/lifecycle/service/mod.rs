use crate::features::instance_directory::repo::FleetRepository;
use crate::shared::types::LifecycleAction;
use std::sync::Arc;
use tracing::{info, warn};

/// Issues start/stop requests for single fleet members.
///
/// A `true` result means the provider accepted the request and reported the
/// instance as transitioning; it does not mean the instance reached the
/// target state. Provider failures are logged and reported as `false`.
pub struct LifecycleService {
    repo: Arc<dyn FleetRepository>,
}

impl LifecycleService {
    pub fn new(repo: Arc<dyn FleetRepository>) -> Self {
        Self { repo }
    }

    pub async fn start_instance(&self, instance_id: &str) -> bool {
        self.apply(LifecycleAction::Start, instance_id).await
    }

    pub async fn stop_instance(&self, instance_id: &str) -> bool {
        self.apply(LifecycleAction::Stop, instance_id).await
    }

    pub async fn apply(&self, action: LifecycleAction, instance_id: &str) -> bool {
        let ids = [instance_id.to_string()];
        let result = match action {
            LifecycleAction::Start => self.repo.start_instances(&ids).await,
            LifecycleAction::Stop => self.repo.stop_instances(&ids).await,
        };

        match result {
            Ok(transitioning) => {
                let accepted = transitioning.iter().any(|id| id == instance_id);
                info!(
                    instance_id = %instance_id,
                    action = %action,
                    accepted,
                    "Lifecycle request issued"
                );
                accepted
            }
            Err(e) => {
                warn!(
                    instance_id = %instance_id,
                    action = %action,
                    error = %e,
                    "Lifecycle request failed"
                );
                false
            }
        }
    }
}
