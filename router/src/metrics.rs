//! Router metrics registry wiring: names and buckets exactly as listed in
//! `spec.md` §6's "Router metrics" row.

use metrics_exporter_prometheus::PrometheusBuilder;

const LATENCY_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.2, 0.5, 1.0];

/// Installs the global Prometheus recorder and binds it to an HTTP listener
/// on `metrics_port`. Must be called once, before any request is routed.
pub fn install(metrics_port: u16) -> anyhow::Result<()> {
    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Full("gw_request_duration_seconds".into()),
            LATENCY_BUCKETS,
        )?
        .with_http_listener(([0, 0, 0, 0], metrics_port));

    builder.install()?;

    metrics::describe_counter!("gw_requests_total", "Requests routed, by shard and status class");
    metrics::describe_histogram!("gw_request_duration_seconds", "End-to-end router->shard round trip");
    metrics::describe_counter!("gw_routing_errors_total", "Routing failures, by reason");

    Ok(())
}
