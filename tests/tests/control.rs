mod utils;
#[allow(unused)]
use utils::*;

use drover::prelude::*;
use mock_client::MockClient;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

async fn serve_agent(client: Arc<MockClient>, port: u16) -> Arc<Agent> {
    let agent = Arc::new(Agent::new(AgentConfig::default(), client).expect("valid config"));
    let server = agent.clone();
    tokio::spawn(async move {
        if let Err(err) = drover_runtime::serve(server, port).await {
            panic!("control server failed: {err}");
        }
    });
    tokio::time::sleep(Duration::from_millis(200)).await;
    agent
}

fn workload_config_json() -> serde_json::Value {
    json!({
        "schemas": [{
            "name": "users",
            "collection": "users",
            "fields": {
                "_id": { "type": "id" },
                "name": { "type": "word", "length": 10 }
            },
            "save": ["_id"]
        }],
        "workloads": [{
            "name": "writes",
            "type": "insert_one",
            "schema": "users",
            "connections": 8,
            "operations": 300
        }]
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(60000)]
async fn start_progress_stop_round_trip() -> anyhow::Result<()> {
    init();
    let mock = Arc::new(MockClient::new());
    serve_agent(mock.clone(), 4417).await;
    let http = reqwest::Client::new();
    let base = "http://127.0.0.1:4417";

    let res = http
        .post(format!("{base}/config"))
        .json(&workload_config_json())
        .send()
        .await?;
    assert!(res.status().is_success());

    let res = http.post(format!("{base}/workload/start")).send().await?;
    assert!(res.status().is_success());

    // poll until drained
    let mut drained = false;
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let progress: serde_json::Value = http
            .get(format!("{base}/workload/progress"))
            .send()
            .await?
            .json()
            .await?;
        let entries = progress.as_array().expect("progress array");
        assert_eq!(entries.len(), 1);
        if entries[0]["state"] == "drained" {
            assert_eq!(entries[0]["requests_done"], 300);
            drained = true;
            break;
        }
    }
    assert!(drained, "workload never drained");
    assert_eq!(mock.insert_count(), 300);

    // stop after completion is a no-op but still accepted
    let res = http.post(format!("{base}/workload/stop")).send().await?;
    assert!(res.status().is_success());

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(60000)]
async fn starting_twice_is_a_conflict() -> anyhow::Result<()> {
    init();
    let mock = Arc::new(MockClient::new());
    let agent = serve_agent(mock, 4418).await;
    let http = reqwest::Client::new();
    let base = "http://127.0.0.1:4418";

    let mut config = workload_config_json();
    // run until stopped so the second start is guaranteed to collide
    config["workloads"][0]
        .as_object_mut()
        .expect("workload object")
        .remove("operations");
    let res = http.post(format!("{base}/config")).json(&config).send().await?;
    assert!(res.status().is_success());

    let res = http.post(format!("{base}/workload/start")).send().await?;
    assert!(res.status().is_success());

    let res = http.post(format!("{base}/workload/start")).send().await?;
    assert_eq!(res.status(), reqwest::StatusCode::CONFLICT);

    let res = http.post(format!("{base}/workload/stop")).send().await?;
    assert!(res.status().is_success());

    // the stop drains the run; idempotent to repeat
    let res = http.post(format!("{base}/workload/stop")).send().await?;
    assert!(res.status().is_success());

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(agent.progress()[0].1.state, RunState::Drained);

    Ok(())
}

#[tokio::test]
async fn invalid_config_is_rejected_over_the_wire() -> anyhow::Result<()> {
    init();
    let mock = Arc::new(MockClient::new());
    serve_agent(mock, 4419).await;
    let http = reqwest::Client::new();

    let mut config = workload_config_json();
    config["workloads"][0]["duration"] = json!(1.0);
    // duration plus operations is two termination policies at once
    let res = http
        .post("http://127.0.0.1:4419/config")
        .json(&config)
        .send()
        .await?;
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);

    Ok(())
}
