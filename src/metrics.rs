//! Observability for query objects.
//!
//! With the `metrics` feature a process-wide [`METRICS`] meter provider
//! exports Prometheus counters for executed statements and applied filters
//! into its own registry ([`LifequeryMetrics::encode`] renders it for
//! scraping). With the `tracing` feature, [`tracing_helpers`] provides the
//! spans used around filter application and statement execution.

#[cfg(feature = "metrics")]
pub use self::prometheus_metrics::*;

#[cfg(feature = "metrics")]
mod prometheus_metrics {
    use once_cell::sync::Lazy;
    use opentelemetry::{
        metrics::{Counter, Histogram, MeterProvider},
        KeyValue,
    };
    use opentelemetry_sdk::metrics::SdkMeterProvider;
    use prometheus::{proto::MetricFamily, Registry, TextEncoder};

    pub static METRICS: Lazy<LifequeryMetrics> = Lazy::new(LifequeryMetrics::init);

    pub struct LifequeryMetrics {
        registry: Registry,
        // Owns the Prometheus reader; instruments stop reporting once it drops.
        _provider: SdkMeterProvider,
        pub queries_total: Counter<u64>,
        pub query_errors_total: Counter<u64>,
        pub query_duration: Histogram<f64>,
        pub filters_applied_total: Counter<u64>,
    }

    impl LifequeryMetrics {
        pub fn init() -> Self {
            let registry = Registry::new();
            let mut builder = SdkMeterProvider::builder();
            match opentelemetry_prometheus::exporter()
                .with_registry(registry.clone())
                .build()
            {
                Ok(exporter) => builder = builder.with_reader(exporter),
                Err(e) => log::error!(
                    "Failed to build Prometheus exporter, lifequery metrics are not exported: {}",
                    e
                ),
            }
            let provider = builder.build();
            let meter = provider.meter("lifequery");

            let queries_total = meter
                .u64_counter("lifequery_queries_total")
                .with_description("Total statements executed for query objects")
                .build();

            let query_errors_total = meter
                .u64_counter("lifequery_query_errors_total")
                .with_description("Statements that failed in the backend")
                .build();

            let query_duration = meter
                .f64_histogram("lifequery_query_duration_seconds")
                .with_description("Duration of statements executed for query objects")
                .build();

            let filters_applied_total = meter
                .u64_counter("lifequery_filters_applied_total")
                .with_description("Filters applied to relations, by kind")
                .build();

            Self {
                registry,
                _provider: provider,
                queries_total,
                query_errors_total,
                query_duration,
                filters_applied_total,
            }
        }

        /// Registry the exporter writes to, for mounting in an application's
        /// own scrape endpoint.
        pub fn registry(&self) -> &Registry {
            &self.registry
        }

        pub fn gather(&self) -> Vec<MetricFamily> {
            self.registry.gather()
        }

        /// Current metrics in the Prometheus text format.
        pub fn encode(&self) -> Result<String, prometheus::Error> {
            TextEncoder::new().encode_to_string(&self.gather())
        }

        pub fn record_query(&self, elapsed: std::time::Duration) {
            self.queries_total.add(1, &[]);
            self.query_duration.record(elapsed.as_secs_f64(), &[]);
        }

        pub fn record_query_error(&self) {
            self.query_errors_total.add(1, &[]);
        }

        pub fn record_filter(&self, kind: &str) {
            self.filters_applied_total
                .add(1, &[KeyValue::new("kind", kind.to_string())]);
        }
    }

}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::Span;

    /// Span around a single statement sent to the executor.
    pub fn execute_query_span(query: &str) -> Span {
        tracing::debug_span!("lifequery.execute", sql = query)
    }

    /// Span around one filter narrowing a relation.
    pub fn apply_filter_span(query: &str, feature: &str, kind: &str) -> Span {
        tracing::trace_span!("lifequery.filter", query, feature, kind)
    }

    /// Span around counting or loading a relation through a source.
    pub fn materialize_span(table: &str, operation: &'static str) -> Span {
        tracing::debug_span!("lifequery.materialize", table, operation)
    }
}
