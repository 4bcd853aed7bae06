use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use scan_feed_rs::client::ScanApiClient;
use scan_feed_rs::config::ClientConfig;
use scan_feed_rs::console::ScanConsole;
use scan_feed_rs::history::ActiveView;
use scan_feed_rs::session::SessionState;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

const FEED: &str = concat!(
    "data: {\"type\":\"status\",\"message\":\"Starting scan\"}\n\n",
    "data: {\"type\":\"host_result\",\"data\":{\"host\":\"10.0.0.1\",\"hostname\":null,\"state\":\"up\",\"protocols\":[]}}\n\n",
    "data: {not valid json}\n\n",
    "data: {\"type\":\"host_result\",\"data\":{\"host\":\"10.0.0.2\",\"hostname\":\"box2\",\"state\":\"up\",\"protocols\":[{\"protocol\":\"tcp\",\"ports\":[{\"port\":22,\"state\":\"open\",\"service\":\"ssh\",\"version\":\"OpenSSH\"}]}]}}\n\n",
);

#[derive(Clone, Default)]
struct Remote {
    history: Arc<Mutex<Vec<Value>>>,
    deleted: Arc<Mutex<Vec<String>>>,
}

fn id_of(entry: &Value) -> String {
    match &entry["id"] {
        Value::String(id) => id.clone(),
        other => other.to_string(),
    }
}

async fn post_scan(State(remote): State<Remote>, Json(req): Json<Value>) -> Response {
    let target = req["target"].as_str().unwrap_or_default().to_string();
    match target.as_str() {
        "bad" => (StatusCode::BAD_REQUEST, "No target specified").into_response(),
        "broken" => {
            let parts: Vec<Result<Vec<u8>, std::io::Error>> = vec![
                Ok(FEED.as_bytes()[..60].to_vec()),
                Err(std::io::Error::other("scanner crashed")),
            ];
            Body::from_stream(futures_util::stream::iter(parts)).into_response()
        }
        _ => {
            remote.history.lock().unwrap().insert(
                0,
                json!({"id": 2, "target": target, "timestamp": "2024-05-02 08:00:00", "results": []}),
            );
            // Split mid-frame and mid-delimiter on purpose.
            let bytes = FEED.as_bytes();
            let parts: Vec<Result<Vec<u8>, std::io::Error>> = vec![
                Ok(bytes[..13].to_vec()),
                Ok(bytes[13..62].to_vec()),
                Ok(bytes[62..].to_vec()),
            ];
            Body::from_stream(futures_util::stream::iter(parts)).into_response()
        }
    }
}

async fn get_history(State(remote): State<Remote>) -> impl IntoResponse {
    Json(Value::Array(remote.history.lock().unwrap().clone()))
}

async fn delete_history(State(remote): State<Remote>, Path(id): Path<String>) -> Response {
    remote.deleted.lock().unwrap().push(id.clone());
    if id == "1" {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Delete Error: database is locked").into_response();
    }
    remote
        .history
        .lock()
        .unwrap()
        .retain(|e| id_of(e) != id);
    Json(json!({"status": "success"})).into_response()
}

async fn spawn_remote(remote: Remote) -> ClientConfig {
    let api = Router::new()
        .route("/scan", post(post_scan))
        .route("/history", get(get_history))
        .route("/history/{id}", delete(delete_history))
        .with_state(remote);
    let app = Router::new().nest("/api", api);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    ClientConfig::new(format!("http://{addr}/api/"))
}

fn seeded() -> Remote {
    let remote = Remote::default();
    remote.history.lock().unwrap().push(json!({
        "id": 1,
        "target": "10.0.0.1",
        "timestamp": "2024-05-01 10:00:00",
        "results": {"host": "10.0.0.1", "hostname": null, "state": "up", "protocols": []}
    }));
    remote
}

#[tokio::test]
async fn completed_scan_refreshes_history() {
    let config = spawn_remote(seeded()).await;
    let mut console = ScanConsole::new(ScanApiClient::new(config).unwrap());

    let session = console
        .start_session("10.0.0.0/30", CancellationToken::new(), &mut ())
        .await
        .unwrap();

    assert_eq!(session.state, SessionState::Completed);
    assert_eq!(session.host_count, 2);
    assert_eq!(session.decode_errors, 1);
    assert_eq!(session.hosts[1].protocols[0].ports[0].port, 22);
    let ids: Vec<&str> = console.history().iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["2", "1"]);
    assert!(!console.controller().is_busy());
}

#[tokio::test]
async fn rejected_request_fails_without_history_reload() {
    let config = spawn_remote(seeded()).await;
    let mut console = ScanConsole::new(ScanApiClient::new(config).unwrap());

    let session = console
        .start_session("bad", CancellationToken::new(), &mut ())
        .await
        .unwrap();

    assert_eq!(session.state, SessionState::Failed);
    assert_eq!(session.log.len(), 1);
    assert!(session.log[0].message.starts_with("Request Error:"));
    assert!(session.log[0].message.contains("400"));
    assert!(console.history().is_empty());
}

#[tokio::test]
async fn broken_stream_fails_the_session() {
    let config = spawn_remote(seeded()).await;
    let mut console = ScanConsole::new(ScanApiClient::new(config).unwrap());

    let session = console
        .start_session("broken", CancellationToken::new(), &mut ())
        .await
        .unwrap();

    assert_eq!(session.state, SessionState::Failed);
    assert_eq!(session.host_count, 0);
    assert!(session.log.last().unwrap().is_error());
    assert!(console.history().is_empty());
}

#[tokio::test]
async fn unreachable_server_fails_the_session() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let client = ScanApiClient::new(ClientConfig::new(format!("http://{addr}/api"))).unwrap();
    let mut console = ScanConsole::new(client);

    let session = console
        .start_session("10.0.0.1", CancellationToken::new(), &mut ())
        .await
        .unwrap();
    assert_eq!(session.state, SessionState::Failed);
    assert!(console.reload_history().await.is_err());
}

#[tokio::test]
async fn select_and_delete_round_trip_through_the_server() {
    let remote = seeded();
    remote.history.lock().unwrap().insert(
        0,
        json!({"id": 5, "target": "10.0.0.5", "timestamp": "2024-05-03 12:00:00", "results": []}),
    );
    let config = spawn_remote(remote.clone()).await;
    let mut console = ScanConsole::new(ScanApiClient::new(config).unwrap());
    assert_eq!(console.reload_history().await.unwrap(), 2);

    assert!(console.select_history("5").is_some());
    match console.view() {
        ActiveView::Session { csv_url, hosts, .. } => {
            assert!(csv_url.as_deref().unwrap().ends_with("/api/export/csv/5"));
            assert!(hosts.is_empty());
        }
        other => panic!("unexpected view {other:?}"),
    }

    let err = console.delete_history("1").await.unwrap_err();
    assert!(err.to_string().contains("database is locked"));
    assert_eq!(console.history().len(), 2);

    console.delete_history("5").await.unwrap();
    assert_eq!(console.view(), &ActiveView::Deleted);
    assert_eq!(console.history().len(), 1);
    assert_eq!(remote.history.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn reserved_characters_in_ids_address_one_entry() {
    let remote = Remote::default();
    {
        let mut history = remote.history.lock().unwrap();
        history.push(json!({"id": "1?x", "target": "a", "timestamp": "2024-05-04 09:00:00", "results": []}));
        history.push(json!({"id": "2", "target": "b", "timestamp": "2024-05-04 09:05:00", "results": []}));
        history.push(json!({"id": "a/b#c", "target": "c", "timestamp": "2024-05-04 09:10:00", "results": []}));
    }
    let config = spawn_remote(remote.clone()).await;
    let client = ScanApiClient::new(config).unwrap();

    let csv = client.csv_export_url("1?x").unwrap();
    assert!(csv.ends_with("/api/export/csv/1%3Fx"), "{csv}");
    assert!(client.csv_export_url("a/b#c").unwrap().ends_with("/csv/a%2Fb%23c"));

    let mut console = ScanConsole::new(client);
    assert_eq!(console.reload_history().await.unwrap(), 3);

    console.delete_history("1?x").await.unwrap();
    console.delete_history("a/b#c").await.unwrap();

    assert_eq!(*remote.deleted.lock().unwrap(), vec!["1?x", "a/b#c"]);
    let left: Vec<String> = remote.history.lock().unwrap().iter().map(id_of).collect();
    assert_eq!(left, vec!["2"]);
    let ids: Vec<&str> = console.history().iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["2"]);
}
