#[cfg(feature = "metrics")]
pub use otel::{KeelMetrics, METRICS};

#[cfg(feature = "metrics")]
mod otel {
    use once_cell::sync::Lazy;
    use opentelemetry::{
        global,
        metrics::{Counter, Histogram, Meter},
        KeyValue,
    };
    use std::time::Duration;

    pub static METRICS: Lazy<KeelMetrics> = Lazy::new(KeelMetrics::init);

    /// Statement instruments. Nothing is exported unless the application
    /// installs a meter provider.
    pub struct KeelMetrics {
        pub statements_total: Counter<u64>,
        pub statement_errors_total: Counter<u64>,
        pub slow_statements_total: Counter<u64>,
        pub statement_duration: Histogram<f64>,
    }

    impl KeelMetrics {
        pub fn init() -> Self {
            Self::from_meter(&global::meter("keel"))
        }

        pub fn from_meter(meter: &Meter) -> Self {
            let statements_total = meter
                .u64_counter("keel_statements_total")
                .with_description("Total statements executed")
                .build();

            let statement_errors_total = meter
                .u64_counter("keel_statement_errors_total")
                .with_description("Statements the executor failed")
                .build();

            let slow_statements_total = meter
                .u64_counter("keel_slow_statements_total")
                .with_description("Statements slower than slow_query_ms")
                .build();

            let statement_duration = meter
                .f64_histogram("keel_statement_duration_seconds")
                .with_description("Duration of statements")
                .build();

            Self {
                statements_total,
                statement_errors_total,
                slow_statements_total,
                statement_duration,
            }
        }

        pub fn record_statement(&self, kind: &'static str, elapsed: Duration) {
            let attrs = [KeyValue::new("kind", kind)];
            self.statements_total.add(1, &attrs);
            self.statement_duration.record(elapsed.as_secs_f64(), &attrs);
        }

        pub fn record_error(&self, kind: &'static str) {
            self.statement_errors_total.add(1, &[KeyValue::new("kind", kind)]);
        }

        pub fn record_slow(&self, kind: &'static str) {
            self.slow_statements_total.add(1, &[KeyValue::new("kind", kind)]);
        }
    }

}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    /// Span wrapping one statement execution.
    pub fn statement_span(kind: &'static str, sql: &str) -> tracing::Span {
        tracing::debug_span!("keel.statement", kind = kind, sql = sql)
    }
}
