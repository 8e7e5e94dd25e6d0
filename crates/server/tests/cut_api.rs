//! End-to-end cut job tests through the HTTP router, with a shell script
//! standing in for ffmpeg.
#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use audiocut_core::{AudioConfig, CutRequest, JobState, SourceRef};
use audiocut_server::{create_app_with_state, AppState};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use serde_json::Value;
use tower::ServiceExt;

/// `ticks` status lines `interval` seconds apart, then the output file.
fn fake_ffmpeg(dir: &Path, ticks: u32, interval: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join("fake-ffmpeg");
    let script = format!(
        "#!/bin/sh\n\
         i=1\n\
         while [ $i -le {ticks} ]; do\n\
         sleep {interval}\n\
         printf 'size=1kB time=00:00:%02d.00 bitrate=1kbits/s\\r' $i >&2\n\
         i=$((i+1))\n\
         done\n\
         for out in \"$@\"; do :; done\n\
         echo cut > \"$out\"\n"
    );
    std::fs::write(&path, script).unwrap();
    let mut permissions = std::fs::metadata(&path).unwrap().permissions();
    permissions.set_mode(0o755);
    std::fs::set_permissions(&path, permissions).unwrap();
    path
}

struct Harness {
    _tmp: tempfile::TempDir,
    output_dir: PathBuf,
    state: Arc<AppState>,
    app: Router,
}

fn harness(ticks: u32, interval: &str) -> Harness {
    let tmp = tempfile::tempdir().unwrap();
    let library = tmp.path().join("library");
    let output_dir = tmp.path().join("cuts");
    std::fs::create_dir_all(library.join("radio-1")).unwrap();
    std::fs::write(library.join("radio-1").join("show.mp3"), b"ID3").unwrap();
    let tool = fake_ffmpeg(tmp.path(), ticks, interval);
    let config = AudioConfig::new(&library, &output_dir)
        .with_ffmpeg_path(tool.to_string_lossy())
        .with_probe(false);
    let state = AppState::new(config);
    let app = create_app_with_state(state.clone());
    Harness {
        _tmp: tmp,
        output_dir,
        state,
        app,
    }
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn cut_body(duration: f64) -> Value {
    serde_json::json!({
        "source": { "collection": "radio-1", "fileName": "show.mp3" },
        "startOffsetSecs": 0,
        "durationSecs": duration,
    })
}

async fn wait_until_terminal(app: &Router) -> Value {
    let deadline = Instant::now() + Duration::from_secs(15);
    loop {
        let (_, progress) = call(app, "GET", "/api/cut/progress", None).await;
        let state = progress["state"].as_str().unwrap_or_default().to_string();
        if matches!(state.as_str(), "completed" | "cancelled" | "failed") {
            return progress;
        }
        assert!(Instant::now() < deadline, "job never finished: {progress}");
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

#[tokio::test]
async fn test_start_runs_to_completion_and_lists_the_cut() {
    let h = harness(4, "0.05");

    let (status, started) = call(&h.app, "POST", "/api/cut", Some(cut_body(8.0))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(started["jobId"], 1);
    let output = started["output"].as_str().unwrap().to_string();

    let done = wait_until_terminal(&h.app).await;
    assert_eq!(done["state"], "completed");
    assert_eq!(done["percentComplete"], 100);
    assert_eq!(done["output"], output.as_str());
    assert!(h.output_dir.join(&output).is_file());

    let (status, cuts) = call(&h.app, "GET", "/api/cuts", None).await;
    assert_eq!(status, StatusCode::OK);
    let (date, file) = output.split_once('/').unwrap();
    assert_eq!(cuts[date], serde_json::json!([file]));
}

#[tokio::test]
async fn test_second_start_conflicts_while_running() {
    let h = harness(40, "0.1");

    let (status, _) = call(&h.app, "POST", "/api/cut", Some(cut_body(60.0))).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, body) = call(&h.app, "POST", "/api/cut", Some(cut_body(60.0))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["details"].as_str().unwrap().contains("running"));

    let (_, progress) = call(&h.app, "GET", "/api/cut/progress", None).await;
    assert_eq!(progress["jobId"], 1);
    assert_eq!(progress["state"], "running");

    let (status, body) = call(&h.app, "POST", "/api/cut/cancel", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancelled"], true);
    assert_eq!(wait_until_terminal(&h.app).await["state"], "cancelled");
}

#[tokio::test]
async fn test_cancel_twice_is_the_same_as_once() {
    let h = harness(40, "0.1");
    call(&h.app, "POST", "/api/cut", Some(cut_body(60.0))).await;

    let (_, first) = call(&h.app, "POST", "/api/cut/cancel", None).await;
    let (status, second) = call(&h.app, "POST", "/api/cut/cancel", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["cancelled"], true);
    assert_eq!(second["cancelled"], false);
    assert_eq!(second["state"], "cancelled");

    // Stays cancelled once the worker has gone.
    tokio::time::sleep(Duration::from_millis(300)).await;
    let (_, progress) = call(&h.app, "GET", "/api/cut/progress", None).await;
    assert_eq!(progress["state"], "cancelled");
    assert_eq!(progress["percentComplete"], first["percentComplete"]);
}

#[tokio::test]
async fn test_pause_holds_percent_and_resume_finishes() {
    let h = harness(6, "0.1");
    call(&h.app, "POST", "/api/cut", Some(cut_body(10.0))).await;
    tokio::time::sleep(Duration::from_millis(250)).await;

    let (status, paused) = call(&h.app, "POST", "/api/cut/pause", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paused["state"], "paused");

    let (_, a) = call(&h.app, "GET", "/api/cut/progress", None).await;
    tokio::time::sleep(Duration::from_millis(400)).await;
    let (_, b) = call(&h.app, "GET", "/api/cut/progress", None).await;
    assert_eq!(a["percentComplete"], b["percentComplete"]);
    assert_eq!(b["state"], "paused");

    let (status, _) = call(&h.app, "POST", "/api/cut/pause", None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, resumed) = call(&h.app, "POST", "/api/cut/resume", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resumed["state"], "running");

    let done = wait_until_terminal(&h.app).await;
    assert_eq!(done["state"], "completed");
    assert_eq!(done["percentComplete"], 100);
}

#[tokio::test]
async fn test_pause_right_after_start_extends_wall_time() {
    let h = harness(3, "0.1");
    let request = CutRequest::new(SourceRef::new(Some("radio-1".into()), "show.mp3"), 0.0, 5.0);

    let began = Instant::now();
    let started = h.state.cuts.start(request).await.unwrap();
    h.state.cuts.pause().unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;
    h.state.cuts.resume().unwrap();

    assert_eq!(started.completion.wait().await, JobState::Completed);
    let elapsed = began.elapsed();
    // The pause plus the ticks still pending after it.
    assert!(elapsed >= Duration::from_millis(750), "elapsed {elapsed:?}");
    assert!(h.output_dir.join(&started.output).is_file());
}

#[tokio::test]
async fn test_progress_stream_sends_current_snapshot() {
    let h = harness(1, "0.01");
    let response = h
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/cut/progress/stream")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    use tokio_stream::StreamExt;
    let mut stream = response.into_body().into_data_stream();
    let chunk = tokio::time::timeout(Duration::from_secs(5), stream.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let text = String::from_utf8(chunk.to_vec()).unwrap();
    assert!(text.contains("event: progress"));
    assert!(text.contains("\"state\":\"idle\""));
}
