//! End-to-end tests of the HTTP API through the client SDK.

use dashboard_sdk::{DashboardClient, DataQuery};
use reqwest::StatusCode;
use serde_json::{json, Value};

mod common;

fn window(length: f64, to: f64) -> DataQuery {
    DataQuery {
        length: Some(length),
        to: Some(to),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_service_routes() {
    let server = common::spawn(common::memory_config()).await;
    let client = DashboardClient::new(&server.url());

    assert_eq!(client.ping().await.unwrap(), "pong");
    let version = client.version().await.unwrap();
    assert_eq!(version["name"], "dashboard-server");
}

#[tokio::test]
async fn test_channel_listing() {
    let server = common::spawn(common::memory_config()).await;
    let client = DashboardClient::new(&server.url());

    let channels = client.channels().await.unwrap();
    let temp = channels.iter().find(|c| c.name == "temp").unwrap();
    assert_eq!(temp.channel_type, "timeseries");
    let hist = channels.iter().find(|c| c.name == "hist").unwrap();
    assert_eq!(hist.channel_type, "histogram");
    assert!(channels.iter().all(|c| !c.current));

    client.publish("pressure", &json!(1013.2)).await.unwrap();
    let channels = client.channels().await.unwrap();
    let pressure = channels.iter().find(|c| c.name == "pressure").unwrap();
    assert_eq!(pressure.channel_type, "numeric");
    assert!(pressure.current);
}

#[tokio::test]
async fn test_historical_query() {
    let server = common::spawn(common::memory_config()).await;
    let client = DashboardClient::new(&server.url());

    let frame = client.data(&["temp", "hist"], &window(10.0, 105.0)).await.unwrap();
    assert_eq!(frame["temp"]["start"], json!(95.0));
    assert_eq!(frame["temp"]["t"], json!([5.0, 6.0, 7.0, 8.0, 9.0]));
    assert_eq!(frame["temp"]["x"], json!([1.0, 2.0, 3.0, 4.0, 5.0]));
    assert_eq!(frame["hist"]["t"], json!(7.0));
    assert_eq!(frame["hist"]["x"]["counts"], json!([4, 5]));

    let narrow = client.data(&["temp"], &window(2.0, 104.0)).await.unwrap();
    assert_eq!(narrow["temp"]["x"], json!([3.0, 4.0, 5.0]));
}

#[tokio::test]
async fn test_resampled_query() {
    let server = common::spawn(common::memory_config()).await;
    let client = DashboardClient::new(&server.url());

    let query = DataQuery {
        length: Some(6.0),
        to: Some(106.0),
        resample: Some(2.0),
        reducer: Some("sum".into()),
    };
    let frame = client.data(&["temp"], &query).await.unwrap();
    assert_eq!(frame["temp"]["t"], json!([1.0, 3.0, 5.0]));
    assert_eq!(frame["temp"]["x"], json!([3.0, 7.0, 5.0]));
}

#[tokio::test]
async fn test_live_value_in_query() {
    let server = common::spawn(common::memory_config()).await;
    let client = DashboardClient::new(&server.url());

    let receipt = client.publish("temp", &json!(42.0)).await.unwrap();
    assert_eq!(receipt.channel, "temp");
    assert!(receipt.timestamp > 0.0);

    // Historical samples lie far in the past; only the live value is in the window.
    let frame = client.data(&["temp"], &window(60.0, 0.0)).await.unwrap();
    assert_eq!(frame["temp"]["x"], json!([42.0]));

    assert!(client.delete("temp").await.unwrap());
    assert!(!client.delete("temp").await.unwrap());
    let frame = client.data(&["temp"], &window(60.0, 0.0)).await.unwrap();
    assert_eq!(frame["temp"]["x"], json!([]));
}

#[tokio::test]
async fn test_live_object_channel() {
    let server = common::spawn(common::memory_config()).await;
    let client = DashboardClient::new(&server.url());

    let graph = json!({"x": [1, 2], "y": [3, 4]});
    client.publish("plot", &graph).await.unwrap();
    let frame = client.data(&["plot"], &window(60.0, 0.0)).await.unwrap();
    assert_eq!(frame["plot"]["x"], graph);
}

#[tokio::test]
async fn test_request_errors() {
    let server = common::spawn(common::memory_config()).await;
    let http = reqwest::Client::new();
    let url = server.url();

    let res = http.get(format!("{}/api/nothing", url)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = http.put(format!("{}/api/ping", url)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);

    let res = http
        .get(format!("{}/api/data/temp?reducer=mode", url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = http
        .get(format!("{}/api/data/temp?length=-5", url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = http
        .get(format!("{}/api/data/temp?resample=1e-300", url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = http
        .post(format!("{}/api/publish/temp", url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_request_id_propagated() {
    let server = common::spawn(common::memory_config()).await;
    let res = reqwest::get(format!("{}/api/ping", server.url())).await.unwrap();
    assert!(res.headers().contains_key("x-request-id"));
}
