pub mod ec2;

use crate::shared::error::ProviderError;
use crate::shared::types::{FleetFilter, InstanceStatus, LifecycleAction};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, RwLock};

#[cfg(test)]
use mockall::automock;

/// Raw instance descriptor as reported by the fleet provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawInstance {
    pub instance_id: String,
    pub tags: Vec<(String, String)>,
    pub public_ip: Option<String>,
    pub security_group_ids: Vec<String>,
    pub state: InstanceStatus,
}

impl RawInstance {
    pub fn new(instance_id: impl Into<String>, state: InstanceStatus) -> Self {
        Self {
            instance_id: instance_id.into(),
            tags: Vec::new(),
            public_ip: None,
            security_group_ids: Vec::new(),
            state,
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push((key.into(), value.into()));
        self
    }

    pub fn with_public_ip(mut self, ip: impl Into<String>) -> Self {
        self.public_ip = Some(ip.into());
        self
    }

    pub fn with_security_group(mut self, group_id: impl Into<String>) -> Self {
        self.security_group_ids.push(group_id.into());
        self
    }
}

/// A launch batch; groups zero or more instances
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reservation {
    pub instances: Vec<RawInstance>,
}

/// Security-group rule metadata used to resolve an instance's port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRule {
    pub group_id: String,
    pub from_port: Option<i32>,
    pub is_egress: bool,
}

impl AccessRule {
    pub fn ingress(group_id: impl Into<String>, from_port: i32) -> Self {
        Self {
            group_id: group_id.into(),
            from_port: Some(from_port),
            is_egress: false,
        }
    }
}

/// Boundary to the cloud service that owns the fleet
#[cfg_attr(test, automock)]
#[async_trait]
pub trait FleetRepository: Send + Sync {
    /// All reservations holding instances that match the filter
    async fn describe_instances(
        &self,
        filter: &FleetFilter,
    ) -> Result<Vec<Reservation>, ProviderError>;

    /// All security-group rules that match the filter
    async fn describe_access_rules(
        &self,
        filter: &FleetFilter,
    ) -> Result<Vec<AccessRule>, ProviderError>;

    /// Request a start; returns the ids the provider is transitioning
    async fn start_instances(&self, instance_ids: &[String]) -> Result<Vec<String>, ProviderError>;

    /// Request a stop; returns the ids the provider is transitioning
    async fn stop_instances(&self, instance_ids: &[String]) -> Result<Vec<String>, ProviderError>;
}

#[derive(Default)]
struct FleetState {
    reservations: Vec<Reservation>,
    rules: Vec<AccessRule>,
    rejected: HashSet<String>,
    unavailable: bool,
    describe_calls: usize,
    control_requests: Vec<(LifecycleAction, String)>,
}

/// In-memory fleet with call recording, used by tests. Start/stop requests are
/// accepted for every known instance that has not been marked as rejected,
/// and move it to the matching transitional state.
#[derive(Clone, Default)]
pub struct InMemoryFleetRepository {
    state: Arc<RwLock<FleetState>>,
}

fn lock_poisoned() -> ProviderError {
    ProviderError::Request("Lock poisoned".to_string())
}

impl InMemoryFleetRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reservation(self, instances: Vec<RawInstance>) -> Self {
        if let Ok(mut state) = self.state.write() {
            state.reservations.push(Reservation { instances });
        }
        self
    }

    pub fn with_access_rule(self, rule: AccessRule) -> Self {
        if let Ok(mut state) = self.state.write() {
            state.rules.push(rule);
        }
        self
    }

    /// Make the provider omit this id from start/stop responses
    pub fn reject_control(&self, instance_id: &str) {
        if let Ok(mut state) = self.state.write() {
            state.rejected.insert(instance_id.to_string());
        }
    }

    /// Make every call fail as if the provider were unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut state) = self.state.write() {
            state.unavailable = unavailable;
        }
    }

    pub fn describe_calls(&self) -> usize {
        self.state.read().map(|s| s.describe_calls).unwrap_or(0)
    }

    pub fn control_requests(&self) -> Vec<(LifecycleAction, String)> {
        self.state
            .read()
            .map(|s| s.control_requests.clone())
            .unwrap_or_default()
    }

    fn control(
        &self,
        action: LifecycleAction,
        instance_ids: &[String],
    ) -> Result<Vec<String>, ProviderError> {
        let mut state = self.state.write().map_err(|_| lock_poisoned())?;
        if state.unavailable {
            return Err(ProviderError::Request("fleet provider unavailable".to_string()));
        }

        let target = match action {
            LifecycleAction::Start => InstanceStatus::Pending,
            LifecycleAction::Stop => InstanceStatus::Stopping,
        };

        let mut accepted = Vec::new();
        for instance_id in instance_ids {
            state.control_requests.push((action, instance_id.clone()));
            if state.rejected.contains(instance_id) {
                continue;
            }

            let mut found = false;
            for instance in state
                .reservations
                .iter_mut()
                .flat_map(|r| r.instances.iter_mut())
                .filter(|i| &i.instance_id == instance_id)
            {
                instance.state = target;
                found = true;
            }
            if found {
                accepted.push(instance_id.clone());
            }
        }

        Ok(accepted)
    }
}

#[async_trait]
impl FleetRepository for InMemoryFleetRepository {
    async fn describe_instances(
        &self,
        _filter: &FleetFilter,
    ) -> Result<Vec<Reservation>, ProviderError> {
        let mut state = self.state.write().map_err(|_| lock_poisoned())?;
        state.describe_calls += 1;
        if state.unavailable {
            return Err(ProviderError::Request("fleet provider unavailable".to_string()));
        }
        Ok(state.reservations.clone())
    }

    async fn describe_access_rules(
        &self,
        _filter: &FleetFilter,
    ) -> Result<Vec<AccessRule>, ProviderError> {
        let state = self.state.read().map_err(|_| lock_poisoned())?;
        if state.unavailable {
            return Err(ProviderError::Request("fleet provider unavailable".to_string()));
        }
        Ok(state.rules.clone())
    }

    async fn start_instances(&self, instance_ids: &[String]) -> Result<Vec<String>, ProviderError> {
        self.control(LifecycleAction::Start, instance_ids)
    }

    async fn stop_instances(&self, instance_ids: &[String]) -> Result<Vec<String>, ProviderError> {
        self.control(LifecycleAction::Stop, instance_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fleet() -> InMemoryFleetRepository {
        InMemoryFleetRepository::new()
            .with_reservation(vec![
                RawInstance::new("i-1", InstanceStatus::Stopped).with_security_group("sg-1"),
                RawInstance::new("i-2", InstanceStatus::Running).with_security_group("sg-1"),
            ])
            .with_access_rule(AccessRule::ingress("sg-1", 25565))
    }

    #[tokio::test]
    async fn test_describe_instances_counts_calls() {
        let repo = fleet();
        let reservations = repo
            .describe_instances(&FleetFilter::default())
            .await
            .unwrap();

        assert_eq!(reservations.len(), 1);
        assert_eq!(reservations[0].instances.len(), 2);
        assert_eq!(repo.describe_calls(), 1);
    }

    #[tokio::test]
    async fn test_start_known_instance_is_accepted() {
        let repo = fleet();
        let accepted = repo.start_instances(&["i-1".to_string()]).await.unwrap();
        assert_eq!(accepted, vec!["i-1".to_string()]);

        let reservations = repo
            .describe_instances(&FleetFilter::default())
            .await
            .unwrap();
        assert_eq!(reservations[0].instances[0].state, InstanceStatus::Pending);
    }

    #[tokio::test]
    async fn test_unknown_and_rejected_instances_are_omitted() {
        let repo = fleet();
        repo.reject_control("i-2");

        let accepted = repo
            .stop_instances(&["i-2".to_string(), "i-404".to_string()])
            .await
            .unwrap();
        assert!(accepted.is_empty());
        assert_eq!(repo.control_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_unavailable_provider_fails_every_call() {
        let repo = fleet();
        repo.set_unavailable(true);

        assert!(repo
            .describe_instances(&FleetFilter::default())
            .await
            .is_err());
        assert!(repo
            .describe_access_rules(&FleetFilter::default())
            .await
            .is_err());
        assert!(repo.start_instances(&["i-1".to_string()]).await.is_err());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let repo = fleet();
        let clone = repo.clone();
        clone.reject_control("i-1");

        let accepted = repo.start_instances(&["i-1".to_string()]).await.unwrap();
        assert!(accepted.is_empty());
    }
}
