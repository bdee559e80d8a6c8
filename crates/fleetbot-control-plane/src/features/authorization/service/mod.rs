use crate::shared::types::AuthorizationContext;
use tracing::debug;

/// Admits an event only when it comes from the control channel and the
/// invoker holds the control role.
#[derive(Debug, Clone)]
pub struct AuthorizationGate {
    control_channel_id: String,
    control_role_id: String,
}

impl AuthorizationGate {
    pub fn new(control_channel_id: impl Into<String>, control_role_id: impl Into<String>) -> Self {
        Self {
            control_channel_id: control_channel_id.into(),
            control_role_id: control_role_id.into(),
        }
    }

    pub fn can_execute(&self, context: &AuthorizationContext) -> bool {
        let in_channel = context.channel_id == self.control_channel_id;
        let has_role = context.has_role(&self.control_role_id);

        if !(in_channel && has_role) {
            debug!(
                invoker = %context.invoker_id,
                channel = %context.channel_id,
                in_channel,
                has_role,
                "Authorization denied"
            );
        }

        in_channel && has_role
    }
}
