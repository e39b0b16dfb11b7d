//! Metrics registry wiring: names, buckets, and labels exactly as listed in
//! `spec.md` §6, installed through `metrics-exporter-prometheus`.

use metrics_exporter_prometheus::PrometheusBuilder;

const LATENCY_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.2, 0.5, 1.0];
const FAST_BUCKETS: &[f64] = &[0.0001, 0.0005, 0.001, 0.005, 0.01];
const MATCH_ALGO_BUCKETS: &[f64] = &[0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05];
const WAL_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1];

/// Installs the global Prometheus recorder and binds it to an HTTP listener
/// on `metrics_port`. Must be called once, before the handler or ingress
/// threads start recording.
pub fn install(metrics_port: u16) -> anyhow::Result<()> {
    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Full("me_match_duration_seconds".into()),
            LATENCY_BUCKETS,
        )?
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Full("me_order_validation_duration_seconds".into()),
            FAST_BUCKETS,
        )?
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Full("me_orderbook_insertion_duration_seconds".into()),
            FAST_BUCKETS,
        )?
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Full("me_matching_algorithm_duration_seconds".into()),
            MATCH_ALGO_BUCKETS,
        )?
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Full("me_wal_append_duration_seconds".into()),
            WAL_BUCKETS,
        )?
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Full("me_event_publish_duration_seconds".into()),
            FAST_BUCKETS,
        )?
        .with_http_listener(([0, 0, 0, 0], metrics_port));

    builder.install()?;

    metrics::describe_counter!("me_matches_total", "Number of MatchEvents produced");
    metrics::describe_counter!("me_orders_received_total", "Orders accepted at ingress");
    metrics::describe_counter!("me_orders_rejected_total", "Orders rejected by handler-side validation, by reason");
    metrics::describe_gauge!("me_orderbook_depth", "Total resting quantity per side");
    metrics::describe_gauge!("me_orderbook_price_levels", "Distinct price levels per side");
    metrics::describe_gauge!("me_ringbuffer_utilization_ratio", "Sequencer ring occupancy in [0,1]");
    metrics::describe_counter!("publish_drops_total", "Match events dropped by the publisher");
    metrics::describe_counter!("me_wal_force_failures_total", "Transient WAL force (durability) failures");

    Ok(())
}
