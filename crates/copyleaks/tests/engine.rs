//! Lifecycle tests for the request engine over a scripted transport:
//! completion ordering, progress, control signals and registry hygiene.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;

use common::{MockTransport, Script, ScriptBody};
use copyleaks::{
    ApiConfig, ApiError, ApiRequest, CopyleaksSession, MemoryTokenStore, Payload, ScanOptions,
    HttpMethod, TransportError,
};

fn session(transport: &MockTransport) -> CopyleaksSession<MockTransport> {
    CopyleaksSession::with_transport(
        transport.clone(),
        ApiConfig::default(),
        Arc::new(MemoryTokenStore::new()),
    )
}

fn get(session: &CopyleaksSession<MockTransport>, route: &str) -> ApiRequest {
    session
        .request::<serde_json::Value>(HttpMethod::Get, route, None, &ScanOptions::default())
        .expect("request built")
}

/// Wait until the request has made the expected receive progress.
async fn wait_for_progress(request: &ApiRequest, completed: u64) {
    for _ in 0..200 {
        if request.progress().completed_units() == completed {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!(
        "progress never reached {completed}, stuck at {}",
        request.progress().completed_units()
    );
}

/// A JSON document of exactly `len` bytes.
fn json_of_len(len: usize) -> String {
    let fixed = r#"{"pad":""}"#.len();
    let body = format!("{{\"pad\":\"{}\"}}", "a".repeat(len - fixed));
    assert_eq!(body.len(), len);
    body
}

#[tokio::test]
async fn completion_fires_after_the_last_chunk_with_monotonic_progress() {
    let transport = MockTransport::new();
    let (tx, rx) = mpsc::unbounded_channel();
    transport.push(Script::ok(
        200,
        &[("content-length", "1000")],
        ScriptBody::Channel(rx),
    ));

    let session = session(&transport);
    let request = get(&session, "businesses/list");

    let observed = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&observed);
    request.on_download_progress(move |_, received, expected| {
        sink.lock().unwrap().push((received, expected));
    });

    let body = json_of_len(1000);
    let bytes = body.as_bytes();
    for range in [0..100, 100..350, 350..1000] {
        tx.send(Ok(Bytes::copy_from_slice(&bytes[range])))
            .expect("driver alive");
    }
    drop(tx);

    let response = request.response_json().await;

    let payload = response.result.expect("success");
    assert!(payload.as_json().and_then(|v| v.get("pad")).is_some());
    assert_eq!(response.data.as_ref().map(|d| d.len()), Some(1000));

    assert_eq!(
        *observed.lock().unwrap(),
        vec![
            (100, Some(1000)),
            (350, Some(1000)),
            (1000, Some(1000)),
        ]
    );
    let progress = request.progress();
    assert_eq!(progress.completed_units(), 1000);
    assert_eq!(progress.total_units(), Some(1000));
}

#[tokio::test]
async fn service_error_header_overrides_ok_status() {
    let transport = MockTransport::new();
    transport.push(Script::ok(
        200,
        &[("copyleaks-error-code", "13")],
        ScriptBody::Chunks(vec![Ok(Bytes::from_static(
            br#"{"Message":"Not enough credits"}"#,
        ))]),
    ));

    let session = session(&transport);
    let response = get(&session, "businesses/count-credits").response_json().await;

    match response.result {
        Err(ApiError::Service { code, reason }) => {
            assert_eq!(code, 13);
            assert_eq!(reason, "Not enough credits");
        }
        other => panic!("expected service failure, got {other:?}"),
    }
}

#[tokio::test]
async fn no_content_resolves_to_the_marker() {
    let transport = MockTransport::new();
    transport.push(Script::ok(204, &[], ScriptBody::Chunks(vec![])));

    let session = session(&transport);
    let response = get(&session, "businesses/p1/delete").response_json().await;

    assert_eq!(response.result.expect("success"), Payload::NoContent);
}

#[tokio::test]
async fn empty_body_fails_decoding() {
    let transport = MockTransport::new();
    transport.push(Script::ok(200, &[], ScriptBody::Chunks(vec![])));

    let session = session(&transport);
    let response = get(&session, "businesses/p1/status").response_json().await;

    assert!(matches!(response.result, Err(ApiError::Decode(_))));
}

#[tokio::test]
async fn transport_failure_surfaces_and_clears_the_registry() {
    let transport = MockTransport::new();
    transport.push(Script::Fail(TransportError::Connect(
        "dns lookup failed".to_string(),
    )));

    let session = session(&transport);
    let request = get(&session, "businesses/list");
    let response = request.response_json().await;

    match response.result {
        Err(ApiError::Transport(TransportError::Connect(reason))) => {
            assert!(reason.contains("dns"));
        }
        other => panic!("expected transport failure, got {other:?}"),
    }
    assert!(session.registry().is_empty());
}

#[tokio::test]
async fn cancellation_tears_down_through_the_completion_path() {
    let transport = MockTransport::new();
    transport.push(Script::ok(
        200,
        &[("content-length", "4096")],
        ScriptBody::ChunksThenHang(vec![Ok(Bytes::from_static(b"partial"))]),
    ));

    let session = session(&transport);
    let request = get(&session, "businesses/list");

    // The delegate is registered for as long as the task lives.
    assert_eq!(session.registry().len(), 1);
    wait_for_progress(&request, 7).await;

    request.cancel();
    let response = request.response_json().await;

    match response.result {
        Err(ApiError::Transport(error)) => assert!(error.is_cancelled()),
        other => panic!("expected cancellation, got {other:?}"),
    }
    // Removed exactly once, on the completion transition.
    assert!(session.registry().is_empty());
}

#[tokio::test]
async fn cancel_while_suspended_completes() {
    let transport = MockTransport::new();
    transport.push(Script::ok(
        200,
        &[],
        ScriptBody::ChunksThenHang(vec![Ok(Bytes::from_static(b"partial"))]),
    ));

    let session = session(&transport);
    let request = get(&session, "businesses/list");
    wait_for_progress(&request, 7).await;

    request.suspend();
    tokio::time::sleep(Duration::from_millis(50)).await;
    request.cancel();

    let response = request.response_json().await;
    match response.result {
        Err(ApiError::Transport(error)) => assert!(error.is_cancelled()),
        other => panic!("expected cancellation, got {other:?}"),
    }
    assert!(session.registry().is_empty());
}

#[tokio::test]
async fn suspension_pauses_chunk_consumption() {
    let transport = MockTransport::new();
    let (tx, rx) = mpsc::unbounded_channel();
    transport.push(Script::ok(200, &[], ScriptBody::Channel(rx)));

    let session = session(&transport);
    let request = get(&session, "businesses/list");

    tx.send(Ok(Bytes::from(vec![b'x'; 100]))).expect("driver alive");
    wait_for_progress(&request, 100).await;

    request.suspend();
    tokio::time::sleep(Duration::from_millis(50)).await;

    tx.send(Ok(Bytes::from(vec![b'y'; 100]))).expect("driver alive");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(request.progress().completed_units(), 100);

    request.resume();
    wait_for_progress(&request, 200).await;
    drop(tx);

    let response = request.response_json().await;
    assert_eq!(response.data.as_ref().map(|d| d.len()), Some(200));
    // Not JSON, so decoding fails, but every byte arrived in order.
    assert!(matches!(response.result, Err(ApiError::Decode(_))));
}

#[tokio::test]
#[should_panic(expected = "completion handler")]
async fn second_completion_handler_is_a_programmer_error() {
    let transport = MockTransport::new();
    transport.push(Script::json(200, r#"{"ok":true}"#));

    let session = session(&transport);
    let request = get(&session, "businesses/list");

    let _ = request.response_json().await;
    request.response_json_with(|_| {});
}

#[tokio::test]
async fn callback_flavor_delivers_the_response() {
    let transport = MockTransport::new();
    transport.push(Script::json(200, r#"{"Status":"Finished"}"#));

    let session = session(&transport);
    let request = get(&session, "businesses/p9/status");

    let (done_tx, done_rx) = tokio::sync::oneshot::channel();
    request.response_json_with(move |response| {
        let _ = done_tx.send(response.result.is_ok());
    });

    assert!(done_rx.await.expect("handler ran"));
}

#[tokio::test]
async fn concurrent_requests_resolve_independently() {
    let transport = MockTransport::new();
    transport.push(Script::json(200, r#"{"first":1}"#));
    transport.push(Script::json(200, r#"{"second":2}"#));

    let session = session(&transport);
    let first = get(&session, "businesses/p1/status");
    let second = get(&session, "businesses/p2/status");
    assert_ne!(first.task_id(), second.task_id());

    let (first, second) = tokio::join!(first.response_json(), second.response_json());
    // Drivers race for the scripted bodies; each request gets exactly one.
    let mut keys: Vec<String> = [first, second]
        .into_iter()
        .map(|response| {
            let payload = response.result.expect("success");
            let json = payload.as_json().expect("json body").clone();
            json.as_object().unwrap().keys().next().unwrap().clone()
        })
        .collect();
    keys.sort();
    assert_eq!(keys, vec!["first".to_string(), "second".to_string()]);
    assert!(session.registry().is_empty());
}
