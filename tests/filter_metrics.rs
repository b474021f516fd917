mod support;

use std::collections::HashSet;

use metrics_util::debugging::DebuggingRecorder;
use serial_test::serial;

use instock_nav::domain::types::ProductId;

use support::*;

#[tokio::test]
#[serial]
async fn filter_and_invalidation_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let h = harness().await;

    // miss, query, then hit
    h.module
        .filter_post_ids(&ids(&[10, 11, 12]), SIZE, TERM_M)
        .await;
    h.module
        .filter_post_ids(&ids(&[10, 11, 12]), SIZE, TERM_M)
        .await;

    // queue, consume and delete
    h.module.on_stock_set(ProductId(10)).await;

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "instock_nav_transient_hit_total",
        "instock_nav_transient_miss_total",
        "instock_nav_transient_delete_total",
        "instock_nav_event_queue_len",
        "instock_nav_filter_query_ms",
        "instock_nav_consume_ms",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
