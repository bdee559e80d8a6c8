use crate::features::interaction::service::InteractionService;
use crate::features::observability::controller::ObservabilityController;
use crate::shared::error::UNSUPPORTED_REPLY;
use crate::shared::types::{InteractionEvent, Reply};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info, warn};

/// Entry point for decoded chat events. Every event gets a reply; failures
/// become an ephemeral message in the conversation that caused them.
pub struct InteractionController {
    service: Arc<InteractionService>,
    metrics: Arc<ObservabilityController>,
}

impl InteractionController {
    pub fn new(service: Arc<InteractionService>, metrics: Arc<ObservabilityController>) -> Self {
        Self { service, metrics }
    }

    pub async fn handle(&self, event: InteractionEvent) -> Reply {
        let kind = event.kind();
        let session = event.session_id().clone();
        let invoker = event.context().invoker_id.clone();
        info!(kind, session = %session, invoker = %invoker, "Received interaction");

        let started = Instant::now();
        let (reply, outcome) = match self.service.handle(event).await {
            Ok(reply) => (reply, "ok"),
            Err(error) => {
                warn!(
                    kind,
                    session = %session,
                    code = error.code(),
                    error = %error,
                    "Interaction rejected"
                );
                (Reply::text(error.user_message()), "error")
            }
        };
        self.metrics
            .record_interaction(kind, outcome, started.elapsed().as_secs_f64());
        self.refresh_session_gauge().await;

        reply
    }

    /// Unsupported payloads still get an answer; no session is touched
    pub fn unsupported(&self, reason: &str) -> Reply {
        debug!(reason, "Unsupported interaction");
        self.metrics.record_interaction("unsupported", "error", 0.0);
        Reply::text(UNSUPPORTED_REPLY)
    }

    pub fn spawn_session_eviction(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            loop {
                ticker.tick().await;

                if let Err(error) = self.service.evict_expired().await {
                    warn!(error = %error, "Failed to evict expired command flows");
                } else {
                    self.refresh_session_gauge().await;
                }
            }
        })
    }

    async fn refresh_session_gauge(&self) {
        match self.service.sessions().len().await {
            Ok(count) => self.metrics.set_active_sessions(count),
            Err(error) => debug!(error = %error, "Session count unavailable"),
        }
    }
}
