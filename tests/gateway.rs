//! End-to-end tests: client → gateway → mock upstream.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use trace_gateway::config::{GatewayConfig, RouteConfig};
use trace_gateway::filter::InMemorySink;
use trace_gateway::{GatewayServer, Shutdown};

mod common;

struct Harness {
    addr: SocketAddr,
    sink: Arc<InMemorySink>,
    shutdown: Shutdown,
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

fn route_to(upstream: SocketAddr) -> RouteConfig {
    RouteConfig {
        name: "api".into(),
        host: None,
        path_prefix: Some("/".into()),
        upstream: format!("http://{}", upstream),
        strip_prefix: false,
        priority: 0,
    }
}

async fn start_gateway(mut config: GatewayConfig) -> Harness {
    config.observability.metrics_enabled = false;
    config.timeouts.connect_secs = 1;

    let sink = Arc::new(InMemorySink::new());
    let server = GatewayServer::new(config, sink.clone()).unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, signal).await;
    });

    Harness { addr, sink, shutdown }
}

async fn gateway_for(upstream: SocketAddr) -> Harness {
    let mut config = GatewayConfig::default();
    config.routes.push(route_to(upstream));
    start_gateway(config).await
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

async fn assert_envelope(res: reqwest::Response) {
    assert_eq!(res.status(), 500);
    assert!(res.headers().contains_key("x-trace-id"));
    let json: serde_json::Value = res.json().await.unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "success": false,
            "code": "0x000004",
            "msg": "service call failed",
            "data": null
        })
    );
}

#[tokio::test]
async fn test_chunked_json_passes_through() {
    let upstream = common::start_chunked_backend("application/json", &["{\"id\":\"42\"", "", ",\"n\":1}"]).await;
    let gateway = gateway_for(upstream).await;

    let res = client()
        .get(format!("http://{}/orders/42", gateway.addr))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    let trace_id = res.headers()["x-trace-id"].to_str().unwrap().to_string();
    assert!(trace_id.starts_with("#GET:/orders/42"));
    assert!(trace_id.ends_with('#'));
    assert_eq!(res.text().await.unwrap(), "{\"id\":\"42\",\"n\":1}");

    let samples = gateway.sink.samples();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].route_key, "/orders/42");
}

#[tokio::test]
async fn test_plain_text_untouched() {
    let upstream = common::start_mock_backend("text/plain", "hello upstream").await;
    let gateway = gateway_for(upstream).await;

    let res = client()
        .get(format!("http://{}/greeting", gateway.addr))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "hello upstream");
}

#[tokio::test]
async fn test_unreachable_upstream_returns_envelope() {
    let gateway = gateway_for(common::unused_addr()).await;

    let res = client()
        .post(format!("http://{}/api/items", gateway.addr))
        .send()
        .await
        .unwrap();

    assert_envelope(res).await;
    let tags = gateway.sink.requests();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].exception, "UnhandledDownstreamFailure");
}

#[tokio::test]
async fn test_no_route_returns_envelope() {
    let gateway = start_gateway(GatewayConfig::default()).await;

    let res = client()
        .get(format!("http://{}/nowhere", gateway.addr))
        .send()
        .await
        .unwrap();

    assert_envelope(res).await;
}

#[tokio::test]
async fn test_token_short_circuits_before_upstream() {
    let gateway = gateway_for(common::unused_addr()).await;

    let res = client()
        .get(format!("http://{}/orders/42?token=abc", gateway.addr))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert!(!res.headers().contains_key("x-trace-id"));
    assert!(res.text().await.unwrap().is_empty());
    assert!(gateway.sink.samples().is_empty());
}

#[tokio::test]
async fn test_truncated_upstream_body_returns_envelope() {
    let upstream = common::start_truncating_backend(64, "{\"partial\":").await;
    let gateway = gateway_for(upstream).await;

    let res = client()
        .get(format!("http://{}/orders", gateway.addr))
        .send()
        .await
        .unwrap();

    assert_envelope(res).await;
    assert_eq!(gateway.sink.requests()[0].exception, "AggregationFailure");
}

#[tokio::test]
async fn test_slow_upstream_times_out() {
    let upstream = common::start_slow_backend(Duration::from_secs(3)).await;
    let mut config = GatewayConfig::default();
    config.timeouts.request_secs = 1;
    config.routes.push(route_to(upstream));
    let gateway = start_gateway(config).await;

    let res = client()
        .get(format!("http://{}/slow", gateway.addr))
        .send()
        .await
        .unwrap();

    assert_envelope(res).await;
    assert_eq!(gateway.sink.requests()[0].exception, "Timeout");
}
