use crate::features::instance_directory::repo::{AccessRule, FleetRepository, Reservation};
use crate::shared::error::ProviderError;
use crate::shared::types::{FleetFilter, InstanceRecord, NAME_TAG_KEY};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Builds the normalized fleet directory from provider inventory
pub struct InstanceDirectoryService {
    repo: Arc<dyn FleetRepository>,
    filter: FleetFilter,
}

impl InstanceDirectoryService {
    pub fn new(repo: Arc<dyn FleetRepository>) -> Self {
        Self::with_filter(repo, FleetFilter::default())
    }

    pub fn with_filter(repo: Arc<dyn FleetRepository>, filter: FleetFilter) -> Self {
        Self { repo, filter }
    }

    /// Fetch every fleet member with its port. Either both provider queries
    /// succeed and the full directory is returned, or the error is.
    pub async fn list_instances(&self) -> Result<Vec<InstanceRecord>, ProviderError> {
        let reservations = self.repo.describe_instances(&self.filter).await?;
        let rules = self.repo.describe_access_rules(&self.filter).await?;

        let records = build_records(&reservations, &port_mappings(&rules));
        info!(records = records.len(), "Instance directory refreshed");

        Ok(records)
    }
}

/// Security group id -> origin port of the first ingress rule seen for it
pub fn port_mappings(rules: &[AccessRule]) -> HashMap<String, String> {
    let mut ports = HashMap::new();
    for rule in rules.iter().filter(|rule| !rule.is_egress) {
        if let Some(port) = rule.from_port {
            ports
                .entry(rule.group_id.clone())
                .or_insert_with(|| port.to_string());
        }
    }
    ports
}

/// One record per (instance, attached security group) pair
pub fn build_records(
    reservations: &[Reservation],
    ports: &HashMap<String, String>,
) -> Vec<InstanceRecord> {
    let mut records = Vec::new();

    for instance in reservations.iter().flat_map(|r| r.instances.iter()) {
        let name = instance
            .tags
            .iter()
            .find(|(key, _)| key == NAME_TAG_KEY)
            .map(|(_, value)| value.clone())
            .unwrap_or_default();

        for group_id in &instance.security_group_ids {
            records.push(InstanceRecord {
                instance_id: instance.instance_id.clone(),
                name: name.clone(),
                address: instance.public_ip.clone().unwrap_or_default(),
                port: ports.get(group_id).cloned().unwrap_or_default(),
                status: instance.state,
            });
        }
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::instance_directory::repo::{
        InMemoryFleetRepository, MockFleetRepository, RawInstance,
    };
    use crate::shared::types::InstanceStatus;
    use proptest::prelude::*;

    fn create_test_service(repo: InMemoryFleetRepository) -> InstanceDirectoryService {
        InstanceDirectoryService::new(Arc::new(repo))
    }

    #[tokio::test]
    async fn test_list_instances_resolves_name_port_and_address() {
        let repo = InMemoryFleetRepository::new()
            .with_reservation(vec![RawInstance::new("i-1", InstanceStatus::Running)
                .with_tag("Type", "minecraft")
                .with_tag("Name", "survival")
                .with_public_ip("203.0.113.7")
                .with_security_group("sg-1")])
            .with_access_rule(AccessRule::ingress("sg-1", 25565));

        let records = create_test_service(repo).list_instances().await.unwrap();

        assert_eq!(
            records,
            vec![InstanceRecord::new("i-1", InstanceStatus::Running)
                .with_name("survival")
                .with_address("203.0.113.7")
                .with_port("25565")]
        );
    }

    #[tokio::test]
    async fn test_instance_with_many_groups_yields_many_records() {
        let repo = InMemoryFleetRepository::new()
            .with_reservation(vec![RawInstance::new("i-1", InstanceStatus::Stopped)
                .with_security_group("sg-1")
                .with_security_group("sg-2")
                .with_security_group("sg-3")])
            .with_access_rule(AccessRule::ingress("sg-1", 25565))
            .with_access_rule(AccessRule::ingress("sg-3", 19132));

        let records = create_test_service(repo).list_instances().await.unwrap();

        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.instance_id == "i-1"));
        let ports: Vec<&str> = records.iter().map(|r| r.port.as_str()).collect();
        assert_eq!(ports, vec!["25565", "", "19132"]);
    }

    #[tokio::test]
    async fn test_instance_without_groups_yields_no_records() {
        let repo = InMemoryFleetRepository::new().with_reservation(vec![
            RawInstance::new("i-lonely", InstanceStatus::Running),
            RawInstance::new("i-2", InstanceStatus::Stopped).with_security_group("sg-9"),
        ]);

        let records = create_test_service(repo).list_instances().await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].instance_id, "i-2");
        assert_eq!(records[0].port, "");
        assert_eq!(records[0].name, "");
        assert_eq!(records[0].address, "");
    }

    #[tokio::test]
    async fn test_empty_reservations() {
        let repo = InMemoryFleetRepository::new()
            .with_reservation(vec![])
            .with_reservation(vec![]);

        let records = create_test_service(repo).list_instances().await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_describe_failure_aborts_refresh() {
        let repo = InMemoryFleetRepository::new()
            .with_reservation(vec![
                RawInstance::new("i-1", InstanceStatus::Running).with_security_group("sg-1")
            ]);
        repo.set_unavailable(true);

        let result = create_test_service(repo).list_instances().await;
        assert!(matches!(result, Err(ProviderError::Request(_))));
    }

    #[tokio::test]
    async fn test_rule_query_failure_returns_no_partial_directory() {
        let mut repo = MockFleetRepository::new();
        repo.expect_describe_instances().times(1).returning(|_| {
            Ok(vec![Reservation {
                instances: vec![
                    RawInstance::new("i-1", InstanceStatus::Running).with_security_group("sg-1")
                ],
            }])
        });
        repo.expect_describe_access_rules()
            .times(1)
            .returning(|_| Err(ProviderError::Request("RequestLimitExceeded".to_string())));

        let service = InstanceDirectoryService::new(Arc::new(repo));
        let err = service.list_instances().await.unwrap_err();
        assert_eq!(
            err,
            ProviderError::Request("RequestLimitExceeded".to_string())
        );
    }

    #[tokio::test]
    async fn test_list_instances_passes_fleet_filter() {
        let mut repo = MockFleetRepository::new();
        repo.expect_describe_instances()
            .withf(|filter| filter.tag_key == "Type" && filter.tag_value == "minecraft")
            .returning(|_| Ok(vec![]));
        repo.expect_describe_access_rules()
            .withf(|filter| filter.tag_key == "Type" && filter.tag_value == "minecraft")
            .returning(|_| Ok(vec![]));

        let service = InstanceDirectoryService::new(Arc::new(repo));
        assert!(service.list_instances().await.unwrap().is_empty());
    }

    #[test]
    fn test_port_mapping_first_rule_wins() {
        let rules = vec![
            AccessRule::ingress("sg-1", 25565),
            AccessRule::ingress("sg-1", 25575),
        ];
        let ports = port_mappings(&rules);
        assert_eq!(ports.get("sg-1").map(String::as_str), Some("25565"));
    }

    #[test]
    fn test_port_mapping_skips_egress_and_portless_rules() {
        let rules = vec![
            AccessRule {
                group_id: "sg-1".to_string(),
                from_port: Some(443),
                is_egress: true,
            },
            AccessRule {
                group_id: "sg-2".to_string(),
                from_port: None,
                is_egress: false,
            },
            AccessRule::ingress("sg-1", 25565),
        ];

        let ports = port_mappings(&rules);
        assert_eq!(ports.get("sg-1").map(String::as_str), Some("25565"));
        assert!(!ports.contains_key("sg-2"));
    }

    fn arb_instance() -> impl Strategy<Value = RawInstance> {
        (
            "i-[a-f0-9]{4}",
            prop::collection::vec("sg-[0-9]{1,2}", 0..4),
        )
            .prop_map(|(id, groups)| {
                groups
                    .into_iter()
                    .fold(RawInstance::new(id, InstanceStatus::Stopped), |raw, group| {
                        raw.with_security_group(group)
                    })
            })
    }

    proptest! {
        #[test]
        fn prop_one_record_per_instance_group_pair(
            reservations in prop::collection::vec(prop::collection::vec(arb_instance(), 0..4), 0..4),
            rule_groups in prop::collection::vec(("sg-[0-9]{1,2}", 1i32..65535), 0..6),
        ) {
            let reservations: Vec<Reservation> = reservations
                .into_iter()
                .map(|instances| Reservation { instances })
                .collect();
            let rules: Vec<AccessRule> = rule_groups
                .into_iter()
                .map(|(group, port)| AccessRule::ingress(group, port))
                .collect();

            let expected: usize = reservations
                .iter()
                .flat_map(|r| r.instances.iter())
                .map(|i| i.security_group_ids.len())
                .sum();

            let ports = port_mappings(&rules);
            let records = build_records(&reservations, &ports);
            prop_assert_eq!(records.len(), expected);

            let pairs = reservations
                .iter()
                .flat_map(|r| r.instances.iter())
                .flat_map(|i| i.security_group_ids.iter());
            for (record, group_id) in records.iter().zip(pairs) {
                let expected_port = ports.get(group_id).cloned().unwrap_or_default();
                prop_assert_eq!(&record.port, &expected_port);
            }
        }

        #[test]
        fn prop_service_matches_correlation(instances in prop::collection::vec(arb_instance(), 0..6)) {
            let rule = AccessRule::ingress("sg-1", 25565);
            let repo = InMemoryFleetRepository::new()
                .with_reservation(instances.clone())
                .with_access_rule(rule.clone());
            let service = InstanceDirectoryService::new(Arc::new(repo));

            let records = tokio_test::block_on(service.list_instances()).unwrap();
            let expected = build_records(&[Reservation { instances }], &port_mappings(&[rule]));
            prop_assert_eq!(records, expected);
        }
    }
}
