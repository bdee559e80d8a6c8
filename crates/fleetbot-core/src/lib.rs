pub mod interaction;
pub mod reply;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub use interaction::{AuthorizationContext, ComponentId, InteractionEvent, SessionId};
pub use reply::{ActionButton, MenuOption, Reply, ReplyComponent};

/// Tag key/value pair that marks an instance as a fleet member
pub const FLEET_TAG_KEY: &str = "Type";
pub const FLEET_TAG_VALUE: &str = "minecraft";

/// Tag key holding an instance's display name
pub const NAME_TAG_KEY: &str = "Name";

/// Name of the slash command that opens a fleet flow
pub const SERVER_COMMAND_NAME: &str = "server";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid instance status: {0}")]
    InvalidInstanceStatus(String),
    #[error("Invalid component id: {0}")]
    InvalidComponentId(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstanceStatus {
    Pending,
    Running,
    Stopping,
    Stopped,
    ShuttingDown,
    Terminated,
}

impl InstanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceStatus::Pending => "pending",
            InstanceStatus::Running => "running",
            InstanceStatus::Stopping => "stopping",
            InstanceStatus::Stopped => "stopped",
            InstanceStatus::ShuttingDown => "shutting-down",
            InstanceStatus::Terminated => "terminated",
        }
    }

    /// Whether a start request makes sense from this status
    pub fn can_start(&self) -> bool {
        matches!(self, InstanceStatus::Stopped)
    }

    /// Whether a stop request makes sense from this status
    pub fn can_stop(&self) -> bool {
        matches!(self, InstanceStatus::Running)
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstanceStatus {
    type Err = CoreError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "pending" => Ok(InstanceStatus::Pending),
            "running" => Ok(InstanceStatus::Running),
            "stopping" => Ok(InstanceStatus::Stopping),
            "stopped" => Ok(InstanceStatus::Stopped),
            "shutting-down" => Ok(InstanceStatus::ShuttingDown),
            "terminated" => Ok(InstanceStatus::Terminated),
            other => Err(CoreError::InvalidInstanceStatus(other.to_string())),
        }
    }
}

/// Normalized view of one fleet member and its resolved port.
///
/// Records are recomputed on every directory refresh. Fields the provider
/// did not report are empty strings rather than options, matching what the
/// chat replies display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub instance_id: String,
    pub name: String,
    pub address: String,
    pub port: String,
    pub status: InstanceStatus,
}

impl InstanceRecord {
    pub fn new(instance_id: impl Into<String>, status: InstanceStatus) -> Self {
        Self {
            instance_id: instance_id.into(),
            name: String::new(),
            address: String::new(),
            port: String::new(),
            status,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn with_port(mut self, port: impl Into<String>) -> Self {
        self.port = port.into();
        self
    }

    /// Name shown to users; falls back to the identifier for untagged instances
    pub fn display_label(&self) -> &str {
        if self.name.is_empty() {
            &self.instance_id
        } else {
            &self.name
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    Start,
    Stop,
}

impl LifecycleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleAction::Start => "start",
            LifecycleAction::Stop => "stop",
        }
    }
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error_code: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_status_parses_provider_names() {
        assert_eq!(
            "shutting-down".parse::<InstanceStatus>().unwrap(),
            InstanceStatus::ShuttingDown
        );
        assert_eq!(
            "stopped".parse::<InstanceStatus>().unwrap(),
            InstanceStatus::Stopped
        );
        for status in [
            InstanceStatus::Pending,
            InstanceStatus::Running,
            InstanceStatus::Stopping,
            InstanceStatus::Stopped,
            InstanceStatus::ShuttingDown,
            InstanceStatus::Terminated,
        ] {
            assert_eq!(status.as_str().parse::<InstanceStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_instance_status_rejects_unknown_name() {
        let err = "rebooting".parse::<InstanceStatus>().unwrap_err();
        assert_eq!(
            err,
            CoreError::InvalidInstanceStatus("rebooting".to_string())
        );
    }

    #[test]
    fn test_instance_status_serializes_kebab_case() {
        let json = serde_json::to_string(&InstanceStatus::ShuttingDown).unwrap();
        assert_eq!(json, "\"shutting-down\"");
    }

    #[test]
    fn test_instance_status_action_availability() {
        assert!(InstanceStatus::Stopped.can_start());
        assert!(!InstanceStatus::Stopped.can_stop());
        assert!(InstanceStatus::Running.can_stop());
        assert!(!InstanceStatus::Running.can_start());
        assert!(!InstanceStatus::Pending.can_start());
        assert!(!InstanceStatus::Stopping.can_stop());
    }

    #[test]
    fn test_instance_record_display_label_falls_back_to_id() {
        let unnamed = InstanceRecord::new("i-1", InstanceStatus::Stopped);
        assert_eq!(unnamed.display_label(), "i-1");

        let named = unnamed.clone().with_name("survival");
        assert_eq!(named.display_label(), "survival");
    }

    #[test]
    fn test_instance_record_builders() {
        let record = InstanceRecord::new("i-1", InstanceStatus::Running)
            .with_name("creative")
            .with_address("203.0.113.7")
            .with_port("25565");

        assert_eq!(record.address, "203.0.113.7");
        assert_eq!(record.port, "25565");
        assert_eq!(record.status, InstanceStatus::Running);
    }

    #[test]
    fn test_error_response_creation() {
        let response = ErrorResponse::new("INVALID_SIGNATURE", "bad signature");
        assert_eq!(response.error_code, "INVALID_SIGNATURE");
        assert_eq!(response.message, "bad signature");
    }

    #[test]
    fn test_lifecycle_action_display() {
        assert_eq!(LifecycleAction::Start.to_string(), "start");
        assert_eq!(LifecycleAction::Stop.to_string(), "stop");
    }
}
