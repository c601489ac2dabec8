mod common;

use medassist_api::observability::metrics::{
    AppMetrics, DURATION_BUCKETS, HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION,
};
use medassist_api::observability::{MetricsRegistry, RegistryError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn test_concurrent_counter_updates_are_not_lost() {
    let registry = Arc::new(MetricsRegistry::new());
    let counter = registry
        .counter("work_total", "Work items", &["worker"])
        .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let counter = counter.clone();
            thread::spawn(move || {
                let label = if i % 2 == 0 { "even" } else { "odd" };
                for _ in 0..1_000 {
                    counter.with_labels(&[label]).increment(1);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(registry.counter_value("work_total", &["even"]), Some(4_000));
    assert_eq!(registry.counter_value("work_total", &["odd"]), Some(4_000));
}

#[test]
fn test_concurrent_gauge_returns_to_zero() {
    let registry = Arc::new(MetricsRegistry::new());
    let gauge = registry.gauge("busy", "Busy workers", &[]).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let gauge = gauge.with_labels(&[]);
            thread::spawn(move || {
                for _ in 0..500 {
                    gauge.increment(1.0);
                    gauge.decrement(1.0);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(registry.gauge_value("busy", &[]), Some(0.0));
}

#[test]
fn test_snapshot_is_deterministic_and_sorted() {
    let registry = MetricsRegistry::new();
    let zebra = registry.counter("zebra_total", "Z", &["kind"]).unwrap();
    let alpha = registry.gauge("alpha_level", "A", &[]).unwrap();
    zebra.with_labels(&["b"]).increment(1);
    zebra.with_labels(&["a"]).increment(2);
    alpha.with_labels(&[]).set(3.5);

    let first = registry.snapshot();
    assert_eq!(first, registry.snapshot());

    let expected = "\
# HELP alpha_level A
# TYPE alpha_level gauge
alpha_level 3.5
# HELP zebra_total Z
# TYPE zebra_total counter
zebra_total{kind=\"a\"} 2
zebra_total{kind=\"b\"} 1
";
    assert_eq!(first, expected);
}

#[test]
fn test_label_values_are_escaped() {
    let registry = MetricsRegistry::new();
    let counter = registry.counter("odd_total", "Odd labels", &["path"]).unwrap();
    counter.with_labels(&["a\"b\\c\nd"]).increment(1);

    assert!(registry
        .snapshot()
        .contains("odd_total{path=\"a\\\"b\\\\c\\nd\"} 1\n"));
}

#[test]
fn test_histogram_exposition_layout() {
    let registry = MetricsRegistry::new();
    let hist = registry
        .histogram("op_seconds", "Op latency", &["op"], &[0.5, 1.0])
        .unwrap();
    hist.with_labels(&["read"]).record(0.25);
    hist.with_labels(&["read"]).record(0.75);

    let text = registry.snapshot();
    assert!(text.contains("# TYPE op_seconds histogram\n"));
    assert!(text.contains("op_seconds_bucket{op=\"read\",le=\"0.5\"} 1\n"));
    assert!(text.contains("op_seconds_bucket{op=\"read\",le=\"1\"} 2\n"));
    assert!(text.contains("op_seconds_bucket{op=\"read\",le=\"+Inf\"} 2\n"));
    assert!(text.contains("op_seconds_sum{op=\"read\"} 1\n"));
    assert!(text.contains("op_seconds_count{op=\"read\"} 2\n"));
}

#[test]
fn test_reregistration_rules() {
    let registry = MetricsRegistry::new();
    registry.counter("jobs_total", "Jobs", &["queue"]).unwrap();

    assert!(registry.counter("jobs_total", "Jobs", &["queue"]).is_ok());
    assert_eq!(
        registry.gauge("jobs_total", "Jobs", &["queue"]).unwrap_err(),
        RegistryError::ShapeMismatch("jobs_total".to_string())
    );
    assert_eq!(
        registry.counter("jobs_total", "Jobs", &["other"]).unwrap_err(),
        RegistryError::ShapeMismatch("jobs_total".to_string())
    );
    registry
        .histogram("wait_seconds", "Wait", &[], &[0.1, 1.0])
        .unwrap();
    assert!(registry
        .histogram("wait_seconds", "Wait", &[], &[0.1, 1.0])
        .is_ok());
    assert_eq!(
        registry
            .histogram("wait_seconds", "Wait", &[], &[0.5, 1.0])
            .unwrap_err(),
        RegistryError::ShapeMismatch("wait_seconds".to_string())
    );
    assert!(matches!(
        registry.counter("bad-name", "Bad", &[]),
        Err(RegistryError::InvalidName(_))
    ));
    assert!(matches!(
        registry.counter("reserved_total", "Reserved", &["le"]),
        Err(RegistryError::InvalidLabel { .. })
    ));
}

#[test]
fn test_label_arity_mismatch_is_dropped() {
    let (logs, _guard) = common::LogCapture::install();
    let registry = MetricsRegistry::new();
    let counter = registry
        .counter("pairs_total", "Pairs", &["left", "right"])
        .unwrap();

    assert!(matches!(
        counter.try_with_labels(&["only-one"]),
        Err(RegistryError::LabelArity {
            expected: 2,
            actual: 1,
            ..
        })
    ));

    counter.with_labels(&["only-one"]).increment(5);
    assert_eq!(registry.counter_value("pairs_total", &["only-one"]), None);
    assert!(!registry.snapshot().contains("pairs_total{"));
    assert_eq!(logs.with_message("dropping metric update").len(), 1);
}

#[test]
fn test_app_metrics_share_an_injected_registry() {
    let registry = Arc::new(MetricsRegistry::new());
    let metrics = AppMetrics::new(registry.clone()).unwrap();
    metrics.record_http_request("GET", "/api/doctors", 200, Duration::from_millis(120));

    assert_eq!(
        registry.counter_value(HTTP_REQUESTS_TOTAL, &["GET", "/api/doctors", "200"]),
        Some(1)
    );
    let hist = registry
        .histogram_value(HTTP_REQUEST_DURATION, &["GET", "/api/doctors"])
        .unwrap();
    assert_eq!(hist.buckets.len(), DURATION_BUCKETS.len() + 1);
    // 0.12 s lands in the 0.25 bucket and every bucket above it.
    let cumulative: Vec<u64> = hist.buckets.iter().map(|(_, c)| *c).collect();
    assert_eq!(cumulative, vec![0, 0, 0, 0, 1, 1, 1, 1, 1, 1]);

    let fresh = AppMetrics::standalone().unwrap();
    assert_eq!(
        fresh
            .registry()
            .counter_value(HTTP_REQUESTS_TOTAL, &["GET", "/api/doctors", "200"]),
        None
    );
}
