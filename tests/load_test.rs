//! Load testing for the dashboard server.

use std::time::Instant;

use dashboard_server::config::DataSourceConfig;
use serde_json::json;

mod common;

#[tokio::test]
async fn test_load_performance() {
    // 1. Server with a generated source and the in-memory store
    let mut config = common::memory_config();
    config.data_sources.push(DataSourceConfig::new(
        "sim",
        "dummy",
        json!({ "interval": 1.0, "channels": ["sin", "ramp"] }),
    ));
    let server = common::spawn(config).await;

    // 2. Mixed read/write load
    let concurrency = 20;
    let requests_per_task = 50;
    let total_requests = concurrency * requests_per_task;

    let client = reqwest::Client::new();
    let start = Instant::now();

    let mut tasks = Vec::new();
    for task_id in 0..concurrency {
        let client = client.clone();
        let base = server.url();
        tasks.push(tokio::spawn(async move {
            let mut latencies = Vec::new();
            for i in 0..requests_per_task {
                let req_start = Instant::now();
                let result = if i % 5 == 0 {
                    client
                        .post(format!("{}/api/publish/load{}", base, task_id))
                        .json(&json!(i))
                        .send()
                        .await
                } else {
                    client
                        .get(format!("{}/api/data/sin,ramp,temp?length=600&resample=10", base))
                        .send()
                        .await
                };
                if let Ok(res) = result {
                    if res.status().is_success() {
                        latencies.push(req_start.elapsed());
                    }
                }
            }
            latencies
        }));
    }

    let mut all_latencies = Vec::new();
    for task in tasks {
        let latencies = task.await.unwrap();
        all_latencies.extend(latencies);
    }

    let duration = start.elapsed();
    let rps = total_requests as f64 / duration.as_secs_f64();

    if all_latencies.is_empty() {
        panic!("No successful requests recorded");
    }

    all_latencies.sort();
    let p50 = all_latencies[all_latencies.len() / 2];
    let p95 = all_latencies[(all_latencies.len() as f64 * 0.95) as usize];
    let p99 = all_latencies[(all_latencies.len() as f64 * 0.99) as usize];

    println!("\n--- Load Test Results ---");
    println!("Total Requests: {}", total_requests);
    println!("Concurrency:    {}", concurrency);
    println!("Total Duration: {:?}", duration);
    println!("Requests/sec:   {:.2}", rps);
    println!("P50 Latency:    {:?}", p50);
    println!("P95 Latency:    {:?}", p95);
    println!("P99 Latency:    {:?}", p99);
    println!("Success Rate:   {}/{}", all_latencies.len(), total_requests);
    println!("-------------------------\n");

    assert_eq!(all_latencies.len(), total_requests);

    let channels = reqwest::get(format!("{}/api/channels", server.url()))
        .await
        .unwrap()
        .json::<Vec<serde_json::Value>>()
        .await
        .unwrap();
    let live = channels.iter().filter(|c| c["current"] == true).count();
    assert_eq!(live, concurrency);
}
