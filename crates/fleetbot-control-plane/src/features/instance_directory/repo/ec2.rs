use super::{AccessRule, FleetRepository, RawInstance, Reservation};
use crate::shared::config::AwsSettings;
use crate::shared::error::ProviderError;
use crate::shared::types::{FleetFilter, InstanceStatus};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_ec2::config::Credentials;
use aws_sdk_ec2::error::DisplayErrorContext;
use aws_sdk_ec2::types::{Filter, Instance};
use aws_sdk_ec2::Client;
use tracing::debug;

const CREDENTIALS_PROVIDER_NAME: &str = "fleetbot-static";

/// EC2-backed fleet. Credentials are the static key pair from configuration.
#[derive(Clone)]
pub struct Ec2FleetRepository {
    client: Client,
}

impl Ec2FleetRepository {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn connect(settings: &AwsSettings) -> Self {
        let credentials = Credentials::new(
            settings.access_key_id.clone(),
            settings.secret_access_key.clone(),
            None,
            None,
            CREDENTIALS_PROVIDER_NAME,
        );

        let mut loader = aws_config::defaults(BehaviorVersion::latest()).credentials_provider(credentials);
        if let Some(region) = &settings.region {
            loader = loader.region(Region::new(region.clone()));
        }

        let sdk_config = loader.load().await;
        Self::new(Client::new(&sdk_config))
    }
}

fn tag_filter(filter: &FleetFilter) -> Filter {
    Filter::builder()
        .name(format!("tag:{}", filter.tag_key))
        .values(filter.tag_value.clone())
        .build()
}

fn request_error<E>(err: E) -> ProviderError
where
    E: std::error::Error + 'static,
{
    ProviderError::Request(DisplayErrorContext(err).to_string())
}

fn raw_instance(instance: &Instance) -> Result<RawInstance, ProviderError> {
    let instance_id = instance
        .instance_id()
        .ok_or_else(|| ProviderError::MissingField("InstanceId".to_string()))?;

    let state_name = instance
        .state()
        .and_then(|state| state.name())
        .ok_or_else(|| ProviderError::MissingField(format!("State of {instance_id}")))?;
    let state = state_name
        .as_str()
        .parse::<InstanceStatus>()
        .map_err(|_| ProviderError::UnexpectedState(state_name.as_str().to_string()))?;

    Ok(RawInstance {
        instance_id: instance_id.to_string(),
        tags: instance
            .tags()
            .iter()
            .filter_map(|tag| Some((tag.key()?.to_string(), tag.value()?.to_string())))
            .collect(),
        public_ip: instance.public_ip_address().map(ToString::to_string),
        security_group_ids: instance
            .security_groups()
            .iter()
            .filter_map(|group| group.group_id().map(ToString::to_string))
            .collect(),
        state,
    })
}

#[async_trait]
impl FleetRepository for Ec2FleetRepository {
    async fn describe_instances(
        &self,
        filter: &FleetFilter,
    ) -> Result<Vec<Reservation>, ProviderError> {
        let mut reservations = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .describe_instances()
                .dry_run(false)
                .filters(tag_filter(filter))
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(request_error)?;

            for reservation in output.reservations() {
                reservations.push(Reservation {
                    instances: reservation
                        .instances()
                        .iter()
                        .map(raw_instance)
                        .collect::<Result<_, _>>()?,
                });
            }

            match output.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        debug!(reservations = reservations.len(), "Described fleet instances");
        Ok(reservations)
    }

    async fn describe_access_rules(
        &self,
        filter: &FleetFilter,
    ) -> Result<Vec<AccessRule>, ProviderError> {
        let mut rules = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .describe_security_group_rules()
                .dry_run(false)
                .filters(tag_filter(filter))
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(request_error)?;

            for rule in output.security_group_rules() {
                let Some(group_id) = rule.group_id() else {
                    continue;
                };
                rules.push(AccessRule {
                    group_id: group_id.to_string(),
                    from_port: rule.from_port(),
                    is_egress: rule.is_egress().unwrap_or(false),
                });
            }

            match output.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        debug!(rules = rules.len(), "Described fleet access rules");
        Ok(rules)
    }

    async fn start_instances(&self, instance_ids: &[String]) -> Result<Vec<String>, ProviderError> {
        let output = self
            .client
            .start_instances()
            .set_instance_ids(Some(instance_ids.to_vec()))
            .send()
            .await
            .map_err(request_error)?;

        Ok(output
            .starting_instances()
            .iter()
            .filter_map(|change| change.instance_id().map(ToString::to_string))
            .collect())
    }

    async fn stop_instances(&self, instance_ids: &[String]) -> Result<Vec<String>, ProviderError> {
        let output = self
            .client
            .stop_instances()
            .set_instance_ids(Some(instance_ids.to_vec()))
            .send()
            .await
            .map_err(request_error)?;

        Ok(output
            .stopping_instances()
            .iter()
            .filter_map(|change| change.instance_id().map(ToString::to_string))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_ec2::types::{GroupIdentifier, InstanceState, InstanceStateName, Tag};

    #[test]
    fn test_tag_filter_uses_tag_prefix() {
        let filter = tag_filter(&FleetFilter::default());
        assert_eq!(filter.name(), Some("tag:Type"));
        assert_eq!(filter.values(), &["minecraft".to_string()]);
    }

    #[test]
    fn test_raw_instance_from_sdk_instance() {
        let instance = Instance::builder()
            .instance_id("i-0abc")
            .state(
                InstanceState::builder()
                    .name(InstanceStateName::ShuttingDown)
                    .build(),
            )
            .tags(Tag::builder().key("Name").value("survival").build())
            .security_groups(GroupIdentifier::builder().group_id("sg-1").build())
            .security_groups(GroupIdentifier::builder().group_id("sg-2").build())
            .public_ip_address("203.0.113.9")
            .build();

        let raw = raw_instance(&instance).unwrap();
        assert_eq!(raw.instance_id, "i-0abc");
        assert_eq!(raw.state, InstanceStatus::ShuttingDown);
        assert_eq!(raw.tags, vec![("Name".to_string(), "survival".to_string())]);
        assert_eq!(raw.security_group_ids, vec!["sg-1", "sg-2"]);
        assert_eq!(raw.public_ip.as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn test_raw_instance_without_id_is_error() {
        let instance = Instance::builder().build();
        assert!(matches!(
            raw_instance(&instance),
            Err(ProviderError::MissingField(_))
        ));
    }

    #[test]
    fn test_raw_instance_without_state_is_error() {
        let instance = Instance::builder().instance_id("i-1").build();
        assert!(matches!(
            raw_instance(&instance),
            Err(ProviderError::MissingField(_))
        ));
    }
}
