use prometheus::{
    opts, Encoder, Gauge, Histogram, HistogramOpts, HistogramVec, IntCounterVec, Registry,
    TextEncoder,
};

pub struct ObservabilityRepository {
    registry: Registry,
    interaction_total: IntCounterVec,
    interaction_latency_seconds: HistogramVec,
    lifecycle_request_total: IntCounterVec,
    directory_refresh_latency_seconds: Histogram,
    directory_instance_count: Gauge,
    active_sessions: Gauge,
}

impl ObservabilityRepository {
    pub fn new() -> Result<Self, String> {
        let registry = Registry::new();

        let interaction_total = IntCounterVec::new(
            opts!("fleetbot_interaction_total", "Handled chat interactions"),
            &["kind", "outcome"],
        )
        .map_err(|e| e.to_string())?;
        let interaction_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "fleetbot_interaction_latency_seconds",
                "Interaction handling latency (seconds)",
            ),
            &["kind"],
        )
        .map_err(|e| e.to_string())?;
        let lifecycle_request_total = IntCounterVec::new(
            opts!(
                "fleetbot_lifecycle_request_total",
                "Start/stop requests sent to the fleet provider"
            ),
            &["action", "accepted"],
        )
        .map_err(|e| e.to_string())?;
        let directory_refresh_latency_seconds = Histogram::with_opts(HistogramOpts::new(
            "fleetbot_directory_refresh_latency_seconds",
            "Instance directory refresh latency (seconds)",
        ))
        .map_err(|e| e.to_string())?;
        let directory_instance_count = Gauge::with_opts(opts!(
            "fleetbot_directory_instance_count",
            "Records in the last refreshed instance directory"
        ))
        .map_err(|e| e.to_string())?;
        let active_sessions = Gauge::with_opts(opts!(
            "fleetbot_active_sessions",
            "Command flows awaiting a follow-up"
        ))
        .map_err(|e| e.to_string())?;

        registry
            .register(Box::new(interaction_total.clone()))
            .map_err(|e| e.to_string())?;
        registry
            .register(Box::new(interaction_latency_seconds.clone()))
            .map_err(|e| e.to_string())?;
        registry
            .register(Box::new(lifecycle_request_total.clone()))
            .map_err(|e| e.to_string())?;
        registry
            .register(Box::new(directory_refresh_latency_seconds.clone()))
            .map_err(|e| e.to_string())?;
        registry
            .register(Box::new(directory_instance_count.clone()))
            .map_err(|e| e.to_string())?;
        registry
            .register(Box::new(active_sessions.clone()))
            .map_err(|e| e.to_string())?;

        Ok(Self {
            registry,
            interaction_total,
            interaction_latency_seconds,
            lifecycle_request_total,
            directory_refresh_latency_seconds,
            directory_instance_count,
            active_sessions,
        })
    }

    pub fn observe_interaction(&self, kind: &str, outcome: &str, seconds: f64) {
        self.interaction_total
            .with_label_values(&[kind, outcome])
            .inc();
        self.interaction_latency_seconds
            .with_label_values(&[kind])
            .observe(seconds);
    }

    pub fn inc_lifecycle_request(&self, action: &str, accepted: bool) {
        self.lifecycle_request_total
            .with_label_values(&[action, if accepted { "true" } else { "false" }])
            .inc();
    }

    pub fn observe_directory_refresh(&self, seconds: f64, records: usize) {
        self.directory_refresh_latency_seconds.observe(seconds);
        self.directory_instance_count.set(records as f64);
    }

    pub fn set_active_sessions(&self, count: f64) {
        self.active_sessions.set(count);
    }

    pub fn render_metrics(&self) -> Result<String, String> {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|e| e.to_string())?;
        String::from_utf8(buffer).map_err(|e| e.to_string())
    }
}
