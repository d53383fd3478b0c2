use std::sync::Arc;

use chrono::{DateTime, Utc};
use powgate_engine::Engine;
use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

/// Shared state type alias used across all route handlers.
pub type SharedState = Arc<AppState>;

/// Engine handle plus the bookkeeping the HTTP surface reports on.
pub struct AppState {
    pub engine: Engine,
    pub metrics: CommandMetrics,
    pub start_time: std::time::Instant,
    pub started_at: DateTime<Utc>,
}

/// Prometheus metrics for executed commands.
pub struct CommandMetrics {
    pub registry: Registry,
    pub commands_total: IntCounterVec,
    pub command_errors_total: IntCounterVec,
    pub visitors_total: IntCounter,
    pub challenges_issued_total: IntCounter,
}

impl CommandMetrics {
    /// Create the counters and register them against a fresh registry.
    pub fn new() -> Self {
        let registry = Registry::new();

        let commands_total = IntCounterVec::new(
            Opts::new("powgate_commands_total", "Commands executed, by command name"),
            &["command"],
        )
        .expect("failed to create commands_total counter");

        let command_errors_total = IntCounterVec::new(
            Opts::new(
                "powgate_command_errors_total",
                "Commands that returned an error, by command name",
            ),
            &["command"],
        )
        .expect("failed to create command_errors_total counter");

        let visitors_total = IntCounter::with_opts(Opts::new(
            "powgate_visitors_total",
            "Visitors counted across all captchas",
        ))
        .expect("failed to create visitors_total counter");

        let challenges_issued_total = IntCounter::with_opts(Opts::new(
            "powgate_challenges_issued_total",
            "Challenges stored across all captchas",
        ))
        .expect("failed to create challenges_issued_total counter");

        registry.register(Box::new(commands_total.clone())).expect("failed to register commands_total");
        registry.register(Box::new(command_errors_total.clone())).expect("failed to register command_errors_total");
        registry.register(Box::new(visitors_total.clone())).expect("failed to register visitors_total");
        registry.register(Box::new(challenges_issued_total.clone())).expect("failed to register challenges_issued_total");

        Self {
            registry,
            commands_total,
            command_errors_total,
            visitors_total,
            challenges_issued_total,
        }
    }
}

impl Default for CommandMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            metrics: CommandMetrics::new(),
            start_time: std::time::Instant::now(),
            started_at: Utc::now(),
        }
    }
}
