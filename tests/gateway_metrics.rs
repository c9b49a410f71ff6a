mod common;

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use axum::http::header;
use httpmock::MockServer;
use metrics_util::debugging::DebuggingRecorder;
use smart_erp::application::planning::{LineItemDraft, PlanningService};
use smart_erp::gateway::{Fetcher, GatewayRequest, MemoryCacheStorage};
use smart_erp::infra::telemetry::describe_metrics;
use smart_erp::infra::upstream::UpstreamFetcher;
use time::macros::date;
use url::Url;

use common::{ScriptedFetcher, active_gateway, foundry_backend, url};

#[tokio::test]
async fn gateway_and_planning_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");
    describe_metrics();

    // One slot left after the three shell assets.
    let storage = MemoryCacheStorage::new().with_entry_limit(NonZeroUsize::new(4).expect("4"));
    let fetcher = ScriptedFetcher::new();
    let gateway = active_gateway(storage, fetcher.clone()).await;

    let asset = GatewayRequest::get(url("/assets/app.js"));
    gateway.respond(&asset).await.expect("miss");
    gateway.respond(&asset).await.expect("hit");
    gateway.settle().await;
    gateway
        .respond(&GatewayRequest::get(url("/assets/vendor.css")))
        .await
        .expect("served with failed write");

    fetcher.set_offline(true);
    gateway
        .respond(
            &GatewayRequest::get(url("/planning")).with_header(header::ACCEPT, "text/html"),
        )
        .await
        .expect("offline document");

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/manifest.json");
        then.status(200).body("{}");
    });
    let upstream = UpstreamFetcher::new(Duration::from_secs(5)).expect("client");
    let manifest = Url::parse(&server.url("/manifest.json")).expect("url");
    upstream
        .fetch(&GatewayRequest::get(manifest))
        .await
        .expect("upstream fetch");

    let backend = Arc::new(foundry_backend());
    let planning = PlanningService::new(backend);
    planning.select_pattern(7).await.expect("pattern");
    planning.select_all_parts().expect("parts");
    planning
        .add_line_item(LineItemDraft {
            plan_date: Some(date!(2026 - 10 - 19)),
            plate_qty: Some(10),
            shift: Some(1),
        })
        .expect("line item");
    planning.submit_all().await.expect("submit");

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "smart_erp_gateway_cache_hit_total",
        "smart_erp_gateway_cache_miss_total",
        "smart_erp_gateway_cache_write_failed_total",
        "smart_erp_gateway_offline_fallback_total",
        "smart_erp_upstream_fetch_ms",
        "smart_erp_planning_submit_total",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
