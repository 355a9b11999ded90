//! Observability hooks.
//!
//! With the `metrics` feature, [`METRICS`] records query, error and
//! connection-wait metrics through OpenTelemetry into a Prometheus registry.
//! With the `tracing` feature, [`tracing_helpers`] opens spans around
//! statements and transactions.

#[cfg(feature = "metrics")]
pub use self::prometheus_metrics::{TablewrightMetrics, METRICS};

#[cfg(feature = "metrics")]
mod prometheus_metrics {
    use once_cell::sync::Lazy;
    use opentelemetry::metrics::{Counter, Histogram, Meter, MeterProvider as _};
    use opentelemetry::global;
    use opentelemetry_sdk::metrics::SdkMeterProvider;
    use prometheus::{Encoder, Registry, TextEncoder};
    use std::time::Duration;

    pub static METRICS: Lazy<TablewrightMetrics> = Lazy::new(TablewrightMetrics::init);

    pub struct TablewrightMetrics {
        pub registry: Registry,
        provider: Option<SdkMeterProvider>,
        pub queries_total: Counter<u64>,
        pub query_errors_total: Counter<u64>,
        pub query_duration: Histogram<f64>,
        pub connection_wait_duration: Histogram<f64>,
    }

    impl TablewrightMetrics {
        pub fn init() -> Self {
            let registry = Registry::new();
            let provider = match opentelemetry_prometheus::exporter()
                .with_registry(registry.clone())
                .build()
            {
                Ok(exporter) => Some(SdkMeterProvider::builder().with_reader(exporter).build()),
                Err(e) => {
                    log::warn!("Prometheus exporter unavailable, metrics go to the global meter: {e}");
                    None
                }
            };
            let meter: Meter = match &provider {
                Some(provider) => provider.meter("tablewright"),
                None => global::meter("tablewright"),
            };

            let queries_total = meter
                .u64_counter("tablewright_queries_total")
                .with_description("Total statements executed")
                .build();
            let query_errors_total = meter
                .u64_counter("tablewright_query_errors_total")
                .with_description("Statements that failed")
                .build();
            let query_duration = meter
                .f64_histogram("tablewright_query_duration_seconds")
                .with_description("Duration of statements")
                .build();
            let connection_wait_duration = meter
                .f64_histogram("tablewright_connection_wait_seconds")
                .with_description("Time spent opening or acquiring a connection")
                .build();

            Self {
                registry,
                provider,
                queries_total,
                query_errors_total,
                query_duration,
                connection_wait_duration,
            }
        }

        pub fn record_query_duration(&self, elapsed: Duration) {
            self.queries_total.add(1, &[]);
            self.query_duration.record(elapsed.as_secs_f64(), &[]);
        }

        pub fn record_query_error(&self) {
            self.query_errors_total.add(1, &[]);
        }

        pub fn record_connection_wait(&self, duration: Duration) {
            self.connection_wait_duration.record(duration.as_secs_f64(), &[]);
        }

        /// Prometheus text exposition of everything recorded so far.
        pub fn gather(&self) -> String {
            if let Some(provider) = &self.provider {
                if let Err(e) = provider.force_flush() {
                    log::debug!("metrics flush failed: {e}");
                }
            }
            let mut buffer = Vec::new();
            if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
                log::warn!("failed to encode metrics: {e}");
            }
            String::from_utf8_lossy(&buffer).into_owned()
        }
    }
}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::{debug_span, info_span, Span};

    pub fn execute_query_span(query: &str) -> Span {
        debug_span!("tablewright.query", sql = %query)
    }

    pub fn acquire_connection_span() -> Span {
        info_span!("tablewright.connect")
    }

    pub fn begin_transaction_span() -> Span {
        debug_span!("tablewright.transaction.begin")
    }

    pub fn commit_transaction_span() -> Span {
        debug_span!("tablewright.transaction.commit")
    }

    pub fn rollback_transaction_span() -> Span {
        debug_span!("tablewright.transaction.rollback")
    }

    /// Span around one session verb.
    pub fn verb_span(verb: &'static str, table: &str) -> Span {
        info_span!("tablewright.session", verb, table = %table)
    }
}
