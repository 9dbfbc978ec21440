//! `ReqwestTransport` against a local one-shot server.

use std::time::Duration;

use herald::executor::{BoundedExecutor, ExecuteError, RequestSpec};
use serde_json::json;

use crate::support::{closed_port_url, serve};

#[tokio::test]
async fn posts_json_with_bearer_token() {
    let (base, mut requests) = serve(&[("202 Accepted", r#"{"ok":true}"#)]).await;
    let executor = BoundedExecutor::http(Duration::from_secs(5));

    let request = RequestSpec::post_json(json!({"subject": "hi"})).with_bearer(Some("tok-123"));
    let result = executor
        .execute_default(&format!("{base}/email/send"), &request)
        .await;
    let response = match result {
        Ok(response) => response,
        Err(err) => panic!("request should complete: {err}"),
    };
    assert_eq!(response.status, 202);
    assert_eq!(response.body, r#"{"ok":true}"#);

    let captured = match requests.recv().await {
        Some(captured) => captured,
        None => panic!("server should capture the request"),
    };
    assert!(captured.head.starts_with("post /email/send"));
    assert!(captured.head.contains("authorization: bearer tok-123"));
    assert_eq!(captured.json(), json!({"subject": "hi"}));
}

#[tokio::test]
async fn error_status_comes_back_as_response() {
    let (base, _requests) = serve(&[("503 Service Unavailable", "down")]).await;
    let executor = BoundedExecutor::http(Duration::from_secs(5));
    let result = executor.execute_default(&base, &RequestSpec::get()).await;
    match result {
        Ok(response) => {
            assert_eq!(response.status, 503);
            assert_eq!(response.body, "down");
        }
        Err(err) => panic!("request should complete: {err}"),
    }
}

#[tokio::test]
async fn unreachable_host_is_a_transport_error() {
    let executor = BoundedExecutor::http(Duration::from_secs(5));
    let result = executor
        .execute_default(&closed_port_url().await, &RequestSpec::get())
        .await;
    assert!(matches!(result, Err(ExecuteError::Transport(_))));
}
