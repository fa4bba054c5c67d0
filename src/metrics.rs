// Prometheus metrics definitions for the scorekeeper bot.

use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    /// Commands dispatched, by module, command and outcome (ok/error kind).
    pub static ref COMMANDS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("scorekeeper_commands_total", "Total commands dispatched"),
        &["module", "command", "outcome"],
    )
    .unwrap();

    /// Lines appended to the scoreboard message.
    pub static ref SCOREBOARD_LINES_TOTAL: IntCounter = IntCounter::new(
        "scorekeeper_scoreboard_lines_total",
        "Score lines appended to the scoreboard",
    )
    .unwrap();

    /// Failed fetches/edits of the scoreboard message, by error kind.
    pub static ref SCOREBOARD_FAILURES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "scorekeeper_scoreboard_failures_total",
            "Scoreboard message fetch or edit failures",
        ),
        &["kind"],
    )
    .unwrap();
}

static REGISTER: Once = Once::new();

/// Register all metrics with the custom registry. Later calls do nothing.
pub fn register_metrics() {
    REGISTER.call_once(|| {
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(COMMANDS_TOTAL.clone()),
            Box::new(SCOREBOARD_LINES_TOTAL.clone()),
            Box::new(SCOREBOARD_FAILURES_TOTAL.clone()),
        ];

        for c in collectors {
            if let Err(e) = REGISTRY.register(c) {
                tracing::warn!("Failed to register metric: {e}");
            }
        }
    });
}

/// Serialize all registered metrics to the Prometheus text exposition format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {e}");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_twice_and_gather() {
        register_metrics();
        register_metrics();

        COMMANDS_TOTAL
            .with_label_values(&["gangs", "create", "ok"])
            .inc();
        let output = gather_metrics();
        assert!(output.contains("scorekeeper_commands_total"));
    }

    #[test]
    fn test_metric_increments() {
        let before = SCOREBOARD_LINES_TOTAL.get();
        SCOREBOARD_LINES_TOTAL.inc();
        assert!(SCOREBOARD_LINES_TOTAL.get() > before);

        SCOREBOARD_FAILURES_TOTAL
            .with_label_values(&["not_found"])
            .inc();
        assert!(
            SCOREBOARD_FAILURES_TOTAL
                .with_label_values(&["not_found"])
                .get()
                >= 1
        );
    }
}
