//! Agent round-trip over real HTTP: write log files to disk, start the axum
//! server on a loopback port, and drive it with `reqwest` the way a fan-out
//! client would, mirroring the teacher's `tests/end_to_end_tests.rs` style of
//! exercising a whole pipeline rather than one function.

use std::io::Write;
use std::net::SocketAddr;
use std::time::Duration;

async fn start_agent(addr: SocketAddr) {
    tokio::spawn(async move {
        let _ = hblog::agent::run_agent(addr).await;
    });
    // Give the listener a moment to bind before the first request.
    tokio::time::sleep(Duration::from_millis(50)).await;
}

fn write_log(dir: &tempfile::TempDir, name: &str, lines: &[&str]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    for line in lines {
        writeln!(f, "{line}").unwrap();
    }
    path
}

#[tokio::test]
async fn log_stream_returns_ndjson_records_and_a_final_exit_status() {
    let dir = tempfile::tempdir().unwrap();
    write_log(
        &dir,
        "region-server.log",
        &[
            "2013-12-30 23:50:00,000000 INFO Opened region server",
            "2013-12-30 23:50:05,000000 WARN disk getting full",
            "2013-12-30 23:50:10,000000 ERROR lost lease",
        ],
    );

    let addr: SocketAddr = "127.0.0.1:16957".parse().unwrap();
    start_agent(addr).await;

    let glob = format!("{}/*.log", dir.path().display());
    let url = format!("http://{addr}/log/stream?glob={}", urlencode(&glob));
    let body = reqwest::get(&url).await.unwrap().text().await.unwrap();

    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines.len(), 4, "3 records + 1 exit-status, got: {body}");

    let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first["pkg-cls"], "log-accessor-line");
    assert_eq!(first["pkg-obj"]["level"], "INFO");

    let last: serde_json::Value = serde_json::from_str(lines[3]).unwrap();
    assert_eq!(last["pkg-cls"], "exit-status");
    assert_eq!(last["pkg-obj"]["status"], "success");
}

#[tokio::test]
async fn log_summary_aggregates_counts_and_omits_the_cursor() {
    let dir = tempfile::tempdir().unwrap();
    write_log(
        &dir,
        "a.log",
        &[
            "2013-12-30 23:50:00,000000 INFO Opened region server at 10.0.0.5:60020",
            "2013-12-30 23:50:05,000000 INFO Opened region server at 10.0.0.6:60020",
        ],
    );

    let addr: SocketAddr = "127.0.0.1:16958".parse().unwrap();
    start_agent(addr).await;

    let glob = format!("{}/*.log", dir.path().display());
    let url = format!("http://{addr}/log/summary?glob={}", urlencode(&glob));
    let body = reqwest::get(&url).await.unwrap().text().await.unwrap();
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines.len(), 2);

    let summary: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(summary["pkg-cls"], "log-accessor-line");
    let fp_table = summary["pkg-obj"]["fp"].as_object().unwrap();
    assert_eq!(fp_table.len(), 1, "both lines normalize to one fingerprint");

    let exit_status: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
    assert!(exit_status["pkg-obj"].get("universal-offset").is_none());
}

#[tokio::test]
async fn log_stream_rejects_a_request_with_no_glob() {
    let addr: SocketAddr = "127.0.0.1:16959".parse().unwrap();
    start_agent(addr).await;

    let status = reqwest::get(format!("http://{addr}/log/stream"))
        .await
        .unwrap()
        .status();
    assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
}

fn urlencode(s: &str) -> String {
    s.replace(':', "%3A").replace('*', "%2A").replace('/', "%2F")
}
