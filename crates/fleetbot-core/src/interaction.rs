use crate::{CoreError, LifecycleAction, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

const SELECT_SERVER_PREFIX: &str = "select-minecraft-server";
const START_SERVER_PREFIX: &str = "start-server";
const STOP_SERVER_PREFIX: &str = "stop-server";

/// Identifies one command flow: the id of the interaction that opened it
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who is asking and from where. Built fresh from every inbound event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthorizationContext {
    pub channel_id: String,
    pub invoker_id: String,
    pub roles: HashSet<String>,
}

impl AuthorizationContext {
    pub fn new(
        channel_id: impl Into<String>,
        invoker_id: impl Into<String>,
        roles: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            invoker_id: invoker_id.into(),
            roles: roles.into_iter().collect(),
        }
    }

    pub fn has_role(&self, role_id: &str) -> bool {
        self.roles.contains(role_id)
    }
}

/// Interactive component identifiers carried back by follow-up events.
///
/// On the wire a component id is `<kind>:<session id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ComponentId {
    SelectServer(SessionId),
    Lifecycle(LifecycleAction, SessionId),
}

impl ComponentId {
    pub fn session_id(&self) -> &SessionId {
        match self {
            ComponentId::SelectServer(session) => session,
            ComponentId::Lifecycle(_, session) => session,
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            ComponentId::SelectServer(_) => SELECT_SERVER_PREFIX,
            ComponentId::Lifecycle(LifecycleAction::Start, _) => START_SERVER_PREFIX,
            ComponentId::Lifecycle(LifecycleAction::Stop, _) => STOP_SERVER_PREFIX,
        }
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.prefix(), self.session_id())
    }
}

impl FromStr for ComponentId {
    type Err = CoreError;

    fn from_str(value: &str) -> Result<Self> {
        let (prefix, session) = value
            .split_once(':')
            .ok_or_else(|| CoreError::InvalidComponentId(value.to_string()))?;

        if session.is_empty() {
            return Err(CoreError::InvalidComponentId(value.to_string()));
        }
        let session = SessionId::new(session);

        match prefix {
            SELECT_SERVER_PREFIX => Ok(ComponentId::SelectServer(session)),
            START_SERVER_PREFIX => Ok(ComponentId::Lifecycle(LifecycleAction::Start, session)),
            STOP_SERVER_PREFIX => Ok(ComponentId::Lifecycle(LifecycleAction::Stop, session)),
            _ => Err(CoreError::InvalidComponentId(value.to_string())),
        }
    }
}

/// The three interaction kinds the bot understands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionEvent {
    CommandInvoke {
        session_id: SessionId,
        context: AuthorizationContext,
        command: String,
    },
    Selection {
        session_id: SessionId,
        context: AuthorizationContext,
        instance_id: String,
    },
    Action {
        session_id: SessionId,
        context: AuthorizationContext,
        action: LifecycleAction,
    },
}

impl InteractionEvent {
    pub fn session_id(&self) -> &SessionId {
        match self {
            InteractionEvent::CommandInvoke { session_id, .. }
            | InteractionEvent::Selection { session_id, .. }
            | InteractionEvent::Action { session_id, .. } => session_id,
        }
    }

    pub fn context(&self) -> &AuthorizationContext {
        match self {
            InteractionEvent::CommandInvoke { context, .. }
            | InteractionEvent::Selection { context, .. }
            | InteractionEvent::Action { context, .. } => context,
        }
    }

    /// Short label used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            InteractionEvent::CommandInvoke { .. } => "command",
            InteractionEvent::Selection { .. } => "selection",
            InteractionEvent::Action {
                action: LifecycleAction::Start,
                ..
            } => "start",
            InteractionEvent::Action {
                action: LifecycleAction::Stop,
                ..
            } => "stop",
        }
    }
}
