use crate::features::authorization::service::AuthorizationGate;
use crate::features::instance_directory::service::InstanceDirectoryService;
use crate::features::interaction::repo::{SessionRecord, SessionRepository, SessionState};
use crate::features::lifecycle::service::LifecycleService;
use crate::features::observability::controller::ObservabilityController;
use crate::shared::error::{BotError, BotResult, SessionError};
use crate::shared::types::{
    ActionButton, AuthorizationContext, ComponentId, InstanceRecord, InteractionEvent,
    LifecycleAction, MenuOption, Reply, ReplyComponent, SessionId,
};
use chrono::Utc;
use fleetbot_proto::MAX_SELECT_OPTIONS;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

pub const UNAUTHORIZED_REPLY: &str = "Unable to run command in this channel";
pub const NO_SERVERS_REPLY: &str = "No servers found";
pub const SELECT_PROMPT: &str = "Please select a server to change its state";
pub const SELECT_PLACEHOLDER: &str = "Select a server to change it's state";
pub const START_BUTTON_LABEL: &str = "Start Server";
pub const STOP_BUTTON_LABEL: &str = "Stop Server";

/// Drives each command flow through
/// `Idle -> AwaitingSelection -> AwaitingAction -> Idle`.
///
/// Flows are keyed by session id, so concurrent flows never see each
/// other's selection. Events that do not fit the addressed session are
/// rejected without changing it.
pub struct InteractionService {
    directory: Arc<InstanceDirectoryService>,
    lifecycle: Arc<LifecycleService>,
    gate: AuthorizationGate,
    sessions: Arc<dyn SessionRepository>,
    metrics: Arc<ObservabilityController>,
}

impl InteractionService {
    pub fn new(
        directory: Arc<InstanceDirectoryService>,
        lifecycle: Arc<LifecycleService>,
        gate: AuthorizationGate,
        sessions: Arc<dyn SessionRepository>,
        metrics: Arc<ObservabilityController>,
    ) -> Self {
        Self {
            directory,
            lifecycle,
            gate,
            sessions,
            metrics,
        }
    }

    pub fn sessions(&self) -> Arc<dyn SessionRepository> {
        Arc::clone(&self.sessions)
    }

    pub async fn handle(&self, event: InteractionEvent) -> BotResult<Reply> {
        match event {
            InteractionEvent::CommandInvoke {
                session_id,
                context,
                command,
            } => self.open_session(session_id, &context, &command).await,
            InteractionEvent::Selection {
                session_id,
                context,
                instance_id,
            } => self.select(&session_id, &context, &instance_id).await,
            InteractionEvent::Action {
                session_id,
                context,
                action,
            } => self.act(&session_id, &context, action).await,
        }
    }

    async fn open_session(
        &self,
        session_id: SessionId,
        context: &AuthorizationContext,
        command: &str,
    ) -> BotResult<Reply> {
        if !self.gate.can_execute(context) {
            return Ok(Reply::text(UNAUTHORIZED_REPLY));
        }

        let started = Instant::now();
        let instances = self.directory.list_instances().await?;
        self.metrics
            .record_directory_refresh(started.elapsed().as_secs_f64(), instances.len());

        if instances.is_empty() {
            return Ok(Reply::text(NO_SERVERS_REPLY));
        }

        let options = menu_options(&instances);
        let reply = Reply::text(SELECT_PROMPT).with_component(ReplyComponent::SelectMenu {
            id: ComponentId::SelectServer(session_id.clone()),
            placeholder: SELECT_PLACEHOLDER.to_string(),
            options,
        });

        info!(
            session = %session_id,
            invoker = %context.invoker_id,
            command = %command,
            records = instances.len(),
            "Command flow opened"
        );
        self.sessions
            .put(SessionRecord::new(
                session_id,
                context.invoker_id.clone(),
                instances,
                Utc::now(),
            ))
            .await?;

        Ok(reply)
    }

    async fn select(
        &self,
        session_id: &SessionId,
        context: &AuthorizationContext,
        instance_id: &str,
    ) -> BotResult<Reply> {
        let mut session = match self.authorized_session(session_id, context).await? {
            Ok(session) => session,
            Err(rejection) => return Ok(rejection),
        };

        let selected = session
            .find_instance(instance_id)
            .cloned()
            .ok_or_else(|| SessionError::UnknownInstance {
                session: session_id.to_string(),
                instance_id: instance_id.to_string(),
            })?;

        let reply = Reply::text(format!(
            "Start or stop the server {}?",
            selected.display_label()
        ))
        .with_component(ReplyComponent::Buttons(vec![
            ActionButton {
                id: ComponentId::Lifecycle(LifecycleAction::Start, session_id.clone()),
                label: START_BUTTON_LABEL.to_string(),
                disabled: !selected.status.can_start(),
            },
            ActionButton {
                id: ComponentId::Lifecycle(LifecycleAction::Stop, session_id.clone()),
                label: STOP_BUTTON_LABEL.to_string(),
                disabled: !selected.status.can_stop(),
            },
        ]));

        debug!(
            session = %session_id,
            instance_id = %selected.instance_id,
            status = %selected.status,
            "Server selected"
        );
        let now = Utc::now();
        session.state = SessionState::AwaitingAction { selected };
        session.touched_at = now;
        // An action may have closed the flow since it was read
        if !self.sessions.replace(session, now).await? {
            return Err(SessionError::NotFound(session_id.to_string()).into());
        }

        Ok(reply)
    }

    async fn act(
        &self,
        session_id: &SessionId,
        context: &AuthorizationContext,
        action: LifecycleAction,
    ) -> BotResult<Reply> {
        let session = match self.authorized_session(session_id, context).await? {
            Ok(session) => session,
            Err(rejection) => return Ok(rejection),
        };

        if session.state == SessionState::AwaitingSelection {
            return Err(unexpected_action(session_id, action));
        }

        // Claiming the session first keeps a double click from issuing two
        // requests. The claimed record is authoritative for the selection.
        let claimed = self
            .sessions
            .remove(session_id)
            .await?
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        let selected = match claimed.state {
            SessionState::AwaitingAction { selected } => selected,
            SessionState::AwaitingSelection => {
                return Err(unexpected_action(session_id, action))
            }
        };

        let accepted = self.lifecycle.apply(action, &selected.instance_id).await;
        self.metrics.record_lifecycle_request(action, accepted);

        Ok(Reply::text(outcome_message(action, accepted, selected.display_label())))
    }

    /// Load a live session owned by the invoker. The inner `Err` is the
    /// rejection reply for an invoker the gate turns away.
    async fn authorized_session(
        &self,
        session_id: &SessionId,
        context: &AuthorizationContext,
    ) -> BotResult<Result<SessionRecord, Reply>> {
        let session = self
            .sessions
            .get(session_id, Utc::now())
            .await?
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;

        if session.owner_id != context.invoker_id {
            return Err(SessionError::NotOwner {
                session: session_id.to_string(),
            }
            .into());
        }

        if !self.gate.can_execute(context) {
            return Ok(Err(Reply::text(UNAUTHORIZED_REPLY)));
        }

        Ok(Ok(session))
    }

    /// Drop abandoned flows; returns how many were dropped
    pub async fn evict_expired(&self) -> BotResult<usize> {
        let evicted = self.sessions.evict_expired(Utc::now()).await?;
        if evicted > 0 {
            info!(evicted, "Expired command flows evicted");
        }
        Ok(evicted)
    }
}

/// One option per distinct instance, in directory order, capped at the
/// platform's select-menu limit
pub fn menu_options(instances: &[InstanceRecord]) -> Vec<MenuOption> {
    let mut seen = HashSet::new();
    instances
        .iter()
        .filter(|record| seen.insert(record.instance_id.as_str()))
        .take(MAX_SELECT_OPTIONS)
        .map(|record| MenuOption {
            label: record.display_label().to_string(),
            value: record.instance_id.clone(),
            description: record.status.to_string(),
        })
        .collect()
}

fn unexpected_action(session_id: &SessionId, action: LifecycleAction) -> BotError {
    SessionError::UnexpectedEvent {
        session: session_id.to_string(),
        event: action.to_string(),
    }
    .into()
}

fn outcome_message(action: LifecycleAction, accepted: bool, label: &str) -> String {
    match (action, accepted) {
        (LifecycleAction::Start, true) => format!("Started server {label}"),
        (LifecycleAction::Start, false) => format!("There was a problem starting server {label}"),
        (LifecycleAction::Stop, true) => format!("Stopped server {label}"),
        (LifecycleAction::Stop, false) => format!("There was a problem stopping server {label}"),
    }
}
