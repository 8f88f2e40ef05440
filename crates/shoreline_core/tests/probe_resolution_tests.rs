//! Live-probe resolution tests.
//!
//! These stand up a local HTTP server in place of the gateway and walk the
//! registry's probe loop against it. Captured status pages are served at each
//! family's page path, so the whole fetch-fingerprint-parse pipeline runs
//! without a device on the bench.

use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use reqwest::Client;
use tokio::net::TcpListener;

use shoreline_core::fetch::{fetch_capped, BODY_CAP};
use shoreline_core::ModemRegistry;

const SB6121_PAGE: &str = include_str!("../testdata/SB6121-signal.html");
const SB6183_PAGE: &str = include_str!("../testdata/SB6183.html");
const SB8200_PAGE: &str = include_str!("../testdata/SB8200.html");

/// Bind an ephemeral port and serve `router` for the rest of the test.
async fn gateway(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// The probe loop should skip families whose page path 404s and settle on
/// the one whose fingerprint answers.
#[tokio::test]
async fn test_resolve_walks_probe_order_to_the_matching_family() {
    let router = Router::new().route("/cmconnectionstatus.html", get(|| async { SB8200_PAGE }));
    let gw = gateway(router).await;
    let client = Client::new();

    let modem = ModemRegistry::standard()
        .resolve(&client, &gw, None)
        .await
        .expect("served page should resolve");
    assert_eq!(modem.name(), "SB8200");

    let report = modem.status(&client).await.unwrap();
    assert_eq!(report.downstream.len(), 33);
    assert_eq!(report.upstream.len(), 5);
}

/// When more than one page answers, the first registered family wins.
#[tokio::test]
async fn test_resolve_prefers_earlier_registration() {
    let router = Router::new()
        .route("/cmSignalData.htm", get(|| async { SB6121_PAGE }))
        .route("/", get(|| async { SB6183_PAGE }));
    let gw = gateway(router).await;
    let client = Client::new();

    let modem = ModemRegistry::standard()
        .resolve(&client, &gw, None)
        .await
        .expect("served page should resolve");
    assert_eq!(modem.name(), "SB6121");
}

/// Fingerprint detection runs on the body alone; an error status on the
/// right page must not hide the modem.
#[tokio::test]
async fn test_resolve_ignores_http_status() {
    let router = Router::new().route(
        "/",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, SB6183_PAGE) }),
    );
    let gw = gateway(router).await;
    let client = Client::new();

    let modem = ModemRegistry::standard()
        .resolve(&client, &gw, None)
        .await
        .expect("fingerprint should match despite the 500");
    assert_eq!(modem.name(), "SB6183");
}

/// A gateway that serves pages none of the fingerprints recognize resolves
/// to nothing rather than erroring.
#[tokio::test]
async fn test_resolve_unrecognized_gateway_is_none() {
    let router = Router::new().route("/", get(|| async { "<html><body>router admin</body></html>" }));
    let gw = gateway(router).await;
    let client = Client::new();

    assert!(ModemRegistry::standard()
        .resolve(&client, &gw, None)
        .await
        .is_none());
}

/// Connection failures on every probe are an expected outcome, not an error.
#[tokio::test]
async fn test_resolve_unreachable_gateway_is_none() {
    let client = Client::new();
    assert!(ModemRegistry::standard()
        .resolve(&client, "http://127.0.0.1:9", None)
        .await
        .is_none());
}

/// The oldest firmware declares windows-1252, so a real capture can carry
/// bytes that are not valid UTF-8. Such bytes decode lossily on a live
/// fetch, and a fixture file with the same bytes must resolve and parse
/// identically.
#[tokio::test]
async fn test_fixture_decodes_like_a_fetched_body() {
    // 0x92 is the windows-1252 right single quote, invalid as UTF-8.
    let mut bytes = SB6121_PAGE.as_bytes().to_vec();
    let pos = bytes.windows(9).position(|w| w == b"</CENTER>").unwrap();
    bytes.insert(pos, 0x92);

    let served = bytes.clone();
    let router = Router::new().route(
        "/cmSignalData.htm",
        get(move || {
            let body = served.clone();
            async move { body }
        }),
    );
    let gw = gateway(router).await;
    let client = Client::new();
    let registry = ModemRegistry::standard();

    let live = registry
        .resolve(&client, &gw, None)
        .await
        .expect("live probe should resolve");
    assert_eq!(live.name(), "SB6121");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("capture.html");
    std::fs::write(&path, &bytes).unwrap();

    let fixture = registry
        .resolve(&client, "http://127.0.0.1:9", Some(&path))
        .await
        .expect("capture bytes should resolve like the fetched body");
    assert_eq!(fixture.name(), "SB6121");

    let live_report = live.status(&client).await.unwrap();
    let fixture_report = fixture.status(&client).await.unwrap();
    assert_eq!(live_report, fixture_report);
    assert_eq!(fixture_report.downstream.len(), 4);
}

/// Bodies larger than the cap come back truncated instead of growing the
/// heap with whatever answered on the gateway address.
#[tokio::test]
async fn test_fetch_caps_oversized_body() {
    let router = Router::new().route("/big", get(|| async { "x".repeat(BODY_CAP + 4096) }));
    let gw = gateway(router).await;
    let client = Client::new();

    let body = fetch_capped(&client, &format!("{}/big", gw)).await.unwrap();
    assert_eq!(body.len(), BODY_CAP);
}

/// Small bodies pass through untouched.
#[tokio::test]
async fn test_fetch_returns_small_body_intact() {
    let router = Router::new().route("/page", get(|| async { SB6121_PAGE }));
    let gw = gateway(router).await;
    let client = Client::new();

    let body = fetch_capped(&client, &format!("{}/page", gw)).await.unwrap();
    assert_eq!(body, SB6121_PAGE);
}
