use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
};
use chrono::Duration;
use http_body_util::BodyExt;
use httpmock::{Method::GET, Method::POST, MockServer};
use serde_json::{json, Value};
use tower::ServiceExt;

use artemis_console_gateway::{
    auth::{TokenManager, SESSION_HEADER},
    endpoints::{ComponentKind, Substitutions},
    handlers::build_router,
    jolokia::{BrokerIdentity, JolokiaClient, JolokiaError},
    session::SessionStore,
    state::AppState,
};

const BROKER_BEAN: &str = "org.apache.activemq.artemis:broker=\"amq-broker\"";

fn identity_for(server: &MockServer) -> BrokerIdentity {
    BrokerIdentity {
        host: "127.0.0.1".to_string(),
        port: server.port(),
        scheme: "http".to_string(),
        username: "admin".to_string(),
        password: "admin".to_string(),
    }
}

fn search_envelope(names: &[&str]) -> Value {
    json!({
        "request": { "type": "search" },
        "value": names,
        "timestamp": 1724572800,
        "status": 200,
    })
}

async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn validate_caches_broker_name_on_single_match() {
    let server = MockServer::start_async().await;
    let search = server
        .mock_async(|when, then| {
            when.method(GET)
                .path_contains("/console/jolokia/search/")
                .header("origin", "http://127.0.0.1")
                .header_exists("authorization");
            then.status(200).json_body(search_envelope(&[BROKER_BEAN]));
        })
        .await;

    let client = JolokiaClient::new(identity_for(&server));
    assert!(client.validate().await.unwrap());
    assert_eq!(client.broker_name().as_deref(), Some("amq-broker"));
    search.assert_async().await;
}

#[tokio::test]
async fn validate_is_false_for_ambiguous_broker() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path_contains("/console/jolokia/search/");
            then.status(200).json_body(search_envelope(&[
                "org.apache.activemq.artemis:broker=\"a\"",
                "org.apache.activemq.artemis:broker=\"b\"",
            ]));
        })
        .await;

    let client = JolokiaClient::new(identity_for(&server));
    assert!(!client.validate().await.unwrap());
    assert!(client.broker_name().is_none());
}

#[tokio::test]
async fn validate_is_false_for_zero_matches() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path_contains("/console/jolokia/search/");
            then.status(200).json_body(search_envelope(&[]));
        })
        .await;

    let client = JolokiaClient::new(identity_for(&server));
    assert!(!client.validate().await.unwrap());
}

#[tokio::test]
async fn search_surfaces_jolokia_protocol_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path_contains("/console/jolokia/search/");
            then.status(200).json_body(json!({
                "error": "java.lang.SecurityException: Authentication failed",
                "error_type": "java.lang.SecurityException",
                "status": 403,
            }));
        })
        .await;

    let client = JolokiaClient::new(identity_for(&server));
    let err = client.validate().await.unwrap_err();
    match err {
        JolokiaError::Protocol {
            status,
            error,
            error_type,
        } => {
            assert_eq!(status, 403);
            assert!(error.contains("Authentication failed"));
            assert_eq!(error_type.as_deref(), Some("java.lang.SecurityException"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn bulk_read_preserves_request_order() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path_contains("/console/jolokia/search/");
            then.status(200).json_body(search_envelope(&[BROKER_BEAN]));
        })
        .await;
    let bulk = server
        .mock_async(|when, then| {
            when.method(POST).path("/console/jolokia").json_body(json!([
                { "type": "read", "mbean": BROKER_BEAN, "attribute": "Status" },
                { "type": "read", "mbean": BROKER_BEAN, "attribute": "Version" },
            ]));
            then.status(200).json_body(json!([
                { "value": "STARTED", "status": 200 },
                { "value": "2.33.0", "status": 200 },
            ]));
        })
        .await;

    let client = JolokiaClient::new(identity_for(&server));
    assert!(client.validate().await.unwrap());
    let envelopes = client
        .read_attributes(
            ComponentKind::BrokerDetails,
            &Substitutions::new(),
            &["Status".to_string(), "Version".to_string()],
        )
        .await
        .unwrap();
    assert_eq!(envelopes.len(), 2);
    assert_eq!(envelopes[0].value, Some(json!("STARTED")));
    assert_eq!(envelopes[1].value, Some(json!("2.33.0")));
    bulk.assert_async().await;
}

#[tokio::test]
async fn empty_read_issues_no_request() {
    // Nothing listens on port 1, so any outbound attempt would error.
    let client = JolokiaClient::new(BrokerIdentity {
        host: "127.0.0.1".to_string(),
        port: 1,
        scheme: "http".to_string(),
        username: "admin".to_string(),
        password: "admin".to_string(),
    });
    let envelopes = client
        .read_attributes(ComponentKind::BrokerDetails, &Substitutions::new(), &[])
        .await
        .unwrap();
    assert!(envelopes.is_empty());
}

#[tokio::test]
async fn exec_posts_a_single_element_batch() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path_contains("/console/jolokia/search/");
            then.status(200).json_body(search_envelope(&[BROKER_BEAN]));
        })
        .await;
    let exec = server
        .mock_async(|when, then| {
            when.method(POST).path("/console/jolokia").json_body(json!([{
                "type": "exec",
                "mbean": BROKER_BEAN,
                "operation": "listAddresses(java.lang.String)",
                "arguments": [","],
            }]));
            then.status(200)
                .json_body(json!([{ "value": "DLQ,ExpiryQueue", "status": 200 }]));
        })
        .await;

    let client = JolokiaClient::new(identity_for(&server));
    assert!(client.validate().await.unwrap());
    let envelope = client
        .exec_operation(
            ComponentKind::BrokerDetails,
            &Substitutions::new(),
            "listAddresses(java.lang.String)",
            &[",".to_string()],
        )
        .await
        .unwrap();
    assert_eq!(envelope.status, 200);
    assert_eq!(envelope.value, Some(json!("DLQ,ExpiryQueue")));
    exec.assert_async().await;
}

fn test_state() -> AppState {
    AppState {
        sessions: SessionStore::new(Duration::seconds(60)),
        tokens: TokenManager::from_config(Some("test-secret"), Duration::seconds(60)),
    }
}

#[tokio::test]
async fn login_then_authenticated_request_reaches_the_same_broker() {
    let server = MockServer::start_async().await;
    let search = server
        .mock_async(|when, then| {
            when.method(GET).path_contains("/console/jolokia/search/");
            then.status(200).json_body(search_envelope(&[BROKER_BEAN]));
        })
        .await;

    let state = test_state();
    let sessions = state.sessions.clone();
    let app = build_router(state);

    let form = format!(
        "brokerName=broker-0&userName=admin&password=admin&jolokiaHost=127.0.0.1&scheme=http&port={}",
        server.port()
    );
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/jolokia/login")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "success");
    let token = body["jolokia-session-id"].as_str().unwrap().to_string();

    let stored = sessions.get("broker-0").expect("client stored after login");
    assert_eq!(stored.broker_name().as_deref(), Some("amq-broker"));
    assert_eq!(stored.identity().port, server.port());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/brokers")
                .header(SESSION_HEADER, token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body, json!([BROKER_BEAN]));
    // One search for the login probe, one for the authenticated request.
    assert_eq!(search.hits_async().await, 2);
}

#[tokio::test]
async fn ambiguous_probe_fails_login_and_stores_nothing() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path_contains("/console/jolokia/search/");
            then.status(200).json_body(search_envelope(&[
                "org.apache.activemq.artemis:broker=\"a\"",
                "org.apache.activemq.artemis:broker=\"b\"",
            ]));
        })
        .await;

    let state = test_state();
    let sessions = state.sessions.clone();
    let app = build_router(state);

    let form = format!(
        "brokerName=broker-0&userName=admin&password=wrong&jolokiaHost=127.0.0.1&scheme=http&port={}",
        server.port()
    );
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/jolokia/login")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["status"], "failed");
    assert!(sessions.is_empty());
}
