mod common;

use std::sync::Arc;

use common::{controller, ok, url, FakeNetwork};
use pretty_assertions::assert_eq;
use qcsheet_offline::{
    InstallError, Method, MemoryResourceCache, Request, ResourceCache, Response, ResponseKind,
};

fn setup() -> (Arc<MemoryResourceCache>, Arc<FakeNetwork>) {
    (Arc::new(MemoryResourceCache::new()), Arc::new(FakeNetwork::new()))
}

#[tokio::test]
async fn network_first_resources_are_fetched_and_cached() {
    let (cache, network) = setup();
    network.serve("manifest.json", ok("{\"name\":\"uipc\"}"));
    let controller = controller("v1", cache.clone(), network.clone());

    let response = controller
        .handle_fetch(Request::get(url("manifest.json")))
        .await;
    assert_eq!(response.body, b"{\"name\":\"uipc\"}");
    controller.settle().await;

    let cached = cache
        .match_request("uipc-pwa-cache-v1", &Request::get(url("manifest.json")))
        .expect("lookup");
    assert_eq!(cached, Some(response));

    // Network-first always asks the network while it is reachable.
    network.serve("manifest.json", ok("{\"name\":\"uipc2\"}"));
    let response = controller
        .handle_fetch(Request::get(url("manifest.json")))
        .await;
    assert_eq!(response.body, b"{\"name\":\"uipc2\"}");
    assert_eq!(network.call_count(), 2);
}

#[tokio::test]
async fn network_first_falls_back_to_cache_then_offline_page() {
    let (cache, network) = setup();
    network.serve("index.html", ok("<html>app</html>"));
    let controller = controller("v1", cache.clone(), network.clone());

    controller.handle_fetch(Request::get(url("index.html"))).await;
    controller.settle().await;

    network.set_offline(true);
    let response = controller
        .handle_fetch(Request::get(url("index.html#top")))
        .await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body, b"<html>app</html>");

    let response = controller.handle_fetch(Request::get(url("upload.html"))).await;
    assert_eq!(response.status, 503);
    assert_eq!(response.kind, ResponseKind::Default);
    assert!(response
        .content_type()
        .is_some_and(|ct| ct.starts_with("text/html")));
}

#[tokio::test]
async fn root_path_is_network_first() {
    let (cache, network) = setup();
    network.serve("", ok("<html>root</html>"));
    let controller = controller("v1", cache.clone(), network.clone());

    controller.handle_fetch(Request::get(url(""))).await;
    controller.settle().await;
    assert_eq!(cache.entry_count("uipc-pwa-cache-v1"), 1);

    network.set_offline(true);
    let response = controller.handle_fetch(Request::get(url(""))).await;
    assert_eq!(response.body, b"<html>root</html>");
}

#[tokio::test]
async fn cache_first_hits_never_touch_the_network() {
    let (cache, network) = setup();
    let request = Request::get(url("js/xlsx-0.20.3.full.min.js"));
    cache
        .put("uipc-pwa-cache-v1", &request, &ok("cached xlsx"))
        .expect("seed");
    let controller = controller("v1", cache.clone(), network.clone());

    let response = controller.handle_fetch(request).await;
    assert_eq!(response.body, b"cached xlsx");
    assert_eq!(network.call_count(), 0);
}

#[tokio::test]
async fn cache_first_miss_fetches_and_stores() {
    let (cache, network) = setup();
    network.serve("css/purecss-3.0.0-min.css", ok("body{}"));
    let controller = controller("v1", cache.clone(), network.clone());

    let first = controller
        .handle_fetch(Request::get(url("css/purecss-3.0.0-min.css")))
        .await;
    controller.settle().await;
    let second = controller
        .handle_fetch(Request::get(url("css/purecss-3.0.0-min.css")))
        .await;

    assert_eq!(first, second);
    assert_eq!(network.call_count(), 1);
}

#[tokio::test]
async fn cache_first_miss_while_offline_yields_offline_page() {
    let (cache, network) = setup();
    network.set_offline(true);
    let controller = controller("v1", cache.clone(), network.clone());

    let response = controller
        .handle_fetch(Request::get(url("js/xlsx-0.20.3.full.min.js")))
        .await;

    assert_eq!(response.status, 503);
    assert_eq!(response.content_type(), Some("text/html; charset=utf-8"));
    assert!(String::from_utf8_lossy(&response.body).contains("离线"));
    assert_eq!(network.call_count(), 1);
}

#[tokio::test]
async fn passthrough_requests_bypass_the_cache() {
    let (cache, network) = setup();
    network.serve("excel/samples.xlsx", ok("xlsx bytes"));
    let controller = controller("v1", cache.clone(), network.clone());

    let response = controller
        .handle_fetch(Request::get(url("excel/samples.xlsx")))
        .await;
    controller.settle().await;
    assert_eq!(response.body, b"xlsx bytes");
    assert_eq!(cache.entry_count("uipc-pwa-cache-v1"), 0);

    network.set_offline(true);
    let response = controller
        .handle_fetch(Request::get(url("excel/samples.xlsx")))
        .await;
    assert_eq!(response.status, 503);
}

#[tokio::test]
async fn only_successful_same_origin_gets_are_cached() {
    let (cache, network) = setup();
    network.serve(
        "app.js",
        Response::new(200, ResponseKind::Cors, "cross-origin"),
    );
    network.serve("js/index.js", ok("index"));
    let controller = controller("v1", cache.clone(), network.clone());

    controller.handle_fetch(Request::get(url("app.js"))).await;
    controller.handle_fetch(Request::get(url("js/upload.js"))).await;
    controller
        .handle_fetch(Request::new(Method::POST, url("js/index.js")))
        .await;
    controller.settle().await;

    assert_eq!(cache.entry_count("uipc-pwa-cache-v1"), 0);
}

#[tokio::test]
async fn install_precaches_the_manifest() {
    let (cache, network) = setup();
    network.serve_precache();
    let controller = controller("v1", cache.clone(), network.clone());

    controller.install().await.expect("install");

    assert_eq!(cache.entry_count("uipc-pwa-cache-v1"), 5);
    assert_eq!(
        network.calls(),
        vec![
            url("icon/icon_192.png").to_string(),
            url("icon/icon_512.png").to_string(),
            url("css/purecss-3.0.0-min.css").to_string(),
            url("js/xlsx-0.20.3.full.min.js").to_string(),
            url("js/crypto-js-4.1.1.min.js").to_string(),
        ]
    );

    // Precached assets are served offline.
    network.set_offline(true);
    let response = controller
        .handle_fetch(Request::get(url("icon/icon_512.png")))
        .await;
    assert_eq!(response.body, b"icon/icon_512.png");
}

#[tokio::test]
async fn install_fails_atomically_when_an_entry_is_missing() {
    let (cache, network) = setup();
    for entry in ["icon/icon_192.png", "icon/icon_512.png", "css/purecss-3.0.0-min.css"] {
        network.serve(entry, ok(entry));
    }
    let controller = controller("v1", cache.clone(), network.clone());

    let err = controller.install().await.expect_err("missing entry");
    match err {
        InstallError::BadResponse { url: failed, status } => {
            assert_eq!(failed, url("js/xlsx-0.20.3.full.min.js"));
            assert_eq!(status, 404);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(cache.list_namespaces().expect("list"), Vec::<String>::new());
}

#[tokio::test]
async fn install_fails_when_the_network_is_down() {
    let (cache, network) = setup();
    network.set_offline(true);
    let controller = controller("v1", cache.clone(), network.clone());

    let err = controller.install().await.expect_err("offline");
    assert!(matches!(err, InstallError::Fetch { .. }), "{err}");
    assert_eq!(network.call_count(), 1);
    assert_eq!(cache.entry_count("uipc-pwa-cache-v1"), 0);
}

#[tokio::test]
async fn activation_deletes_every_other_namespace() {
    let (cache, network) = setup();
    network.serve_precache();
    for stale in ["uipc-pwa-cache-v1", "uipc-pwa-cache-v0", "someone-else"] {
        cache.open_namespace(stale).expect("open");
    }
    cache
        .put("uipc-pwa-cache-v1", &Request::get(url("app.js")), &ok("old"))
        .expect("seed");

    let controller = controller("v2", cache.clone(), network.clone());
    controller.install().await.expect("install");
    assert!(!controller.is_controlling());

    let removed = controller.activate().await.expect("activate");

    assert_eq!(
        removed,
        vec![
            "someone-else".to_string(),
            "uipc-pwa-cache-v0".to_string(),
            "uipc-pwa-cache-v1".to_string(),
        ]
    );
    assert_eq!(
        cache.list_namespaces().expect("list"),
        vec!["uipc-pwa-cache-v2".to_string()]
    );
    assert_eq!(cache.entry_count("uipc-pwa-cache-v2"), 5);
    assert!(controller.is_controlling());
}

#[tokio::test]
async fn activation_without_install_leaves_only_an_empty_current_namespace() {
    let (cache, network) = setup();
    cache.open_namespace("uipc-pwa-cache-v1").expect("open");
    let controller = controller("v2", cache.clone(), network);

    controller.activate().await.expect("activate");

    assert_eq!(
        cache.list_namespaces().expect("list"),
        vec!["uipc-pwa-cache-v2".to_string()]
    );
    assert_eq!(cache.entry_count("uipc-pwa-cache-v2"), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn settle_waits_for_concurrent_background_writes() {
    let (cache, network) = setup();
    let entries = [
        "index.html",
        "upload.html",
        "manifest.json",
        "app.js",
        "js/index.js",
        "js/excel_search.js",
        "js/upload.js",
    ];
    for entry in entries {
        network.serve(entry, ok(entry));
    }
    let controller = Arc::new(controller("v1", cache.clone(), network.clone()));

    let mut tasks = Vec::new();
    for entry in entries {
        let controller = controller.clone();
        tasks.push(tokio::spawn(async move {
            controller.handle_fetch(Request::get(url(entry))).await
        }));
    }
    for task in tasks {
        assert_eq!(task.await.expect("task").status, 200);
    }
    controller.settle().await;

    assert_eq!(cache.entry_count("uipc-pwa-cache-v1"), entries.len());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn finished_background_writes_are_reaped_without_settle() {
    let (cache, network) = setup();
    for i in 0..300 {
        network.serve(&format!("app.js?v={i}"), ok("app"));
    }
    let controller = controller("v1", cache.clone(), network.clone());

    for i in 0..300 {
        let response = controller
            .handle_fetch(Request::get(url(&format!("app.js?v={i}"))))
            .await;
        assert_eq!(response.status, 200);
    }
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;

    assert_eq!(controller.pending_writes(), 0);
    assert_eq!(cache.entry_count("uipc-pwa-cache-v1"), 300);
}
