//! OpenAI-compatible oracle client against a local axum endpoint

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use gqa_validator::error::OracleError;
use gqa_validator::models::{ClassificationField, Record};
use gqa_validator::services::{ClassificationOracle, OpenAiOracle, OracleSettings, ReferenceDocs};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// One request as seen by the endpoint
#[derive(Debug, Clone)]
struct Captured {
    headers: HeaderMap,
    body: Value,
}

#[derive(Clone)]
struct CannedReply {
    status: StatusCode,
    body: Value,
    captured: Arc<Mutex<Vec<Captured>>>,
}

async fn chat_completions(
    State(reply): State<CannedReply>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    reply.captured.lock().unwrap().push(Captured { headers, body });
    (reply.status, Json(reply.body.clone()))
}

/// Serve `body` with `status` on an ephemeral port; returns the base URL and captured requests
async fn serve(status: StatusCode, body: Value) -> (String, Arc<Mutex<Vec<Captured>>>) {
    let captured = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .with_state(CannedReply {
            status,
            body,
            captured: Arc::clone(&captured),
        });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}/v1", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (base_url, captured)
}

fn oracle(base_url: String, model: &str) -> OpenAiOracle {
    let mut settings = OracleSettings::new("sk-test-key");
    settings.base_url = base_url;
    settings.model = model.to_string();
    settings.timeout = Duration::from_secs(5);
    OpenAiOracle::new(settings).unwrap()
}

fn completion(content: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

fn sample_record() -> Record {
    Record::new("adidas-ultraboost-22", "Adidas", "Shoes > Running")
        .with_field(ClassificationField::L1, "Footwear")
        .with_field(ClassificationField::PrimaryFop, "sportswear")
}

fn only_request(captured: &Arc<Mutex<Vec<Captured>>>) -> Captured {
    let requests = captured.lock().unwrap();
    assert_eq!(requests.len(), 1);
    requests[0].clone()
}

#[tokio::test]
async fn test_classify_sends_prompt_and_decodes_proposal() {
    let content = r#"{"l1_validated": "Footwear", "primary_fop_validated": "running", "sub_sport_validated": "road_running", "corrected_columns": ["primary_fop", "sub_sport"], "reasoning": "Running shoe"}"#;
    let (base_url, captured) = serve(StatusCode::OK, completion(content)).await;
    let oracle = oracle(base_url, "gpt-4o");

    let proposal = oracle
        .classify(&sample_record(), &ReferenceDocs::from_text("FoP definitions here"))
        .await
        .unwrap();

    assert_eq!(proposal.primary_fop_validated.as_deref(), Some("running"));
    assert_eq!(proposal.corrected_columns, vec!["primary_fop", "sub_sport"]);

    let request = only_request(&captured);
    assert_eq!(
        request.headers.get("authorization").unwrap(),
        "Bearer sk-test-key"
    );
    assert_eq!(request.body["model"], "gpt-4o");
    assert_eq!(request.body["response_format"]["type"], "json_object");
    assert_eq!(request.body["temperature"], 0.0);

    let prompt = request.body["messages"][0]["content"].as_str().unwrap();
    assert!(prompt.contains("FoP definitions here"));
    assert!(prompt.contains("adidas-ultraboost-22"));
}

#[tokio::test]
async fn test_non_deterministic_model_omits_temperature() {
    let (base_url, captured) = serve(StatusCode::OK, completion("{}")).await;

    oracle(base_url, "gpt-5-mini")
        .classify(&sample_record(), &ReferenceDocs::default())
        .await
        .unwrap();

    let request = only_request(&captured);
    assert_eq!(request.body["model"], "gpt-5-mini");
    assert!(request.body.get("temperature").is_none());
}

#[tokio::test]
async fn test_http_error_is_transport_error() {
    let (base_url, _captured) = serve(
        StatusCode::TOO_MANY_REQUESTS,
        json!({ "error": { "message": "Rate limit reached" } }),
    )
    .await;

    let err = oracle(base_url, "gpt-4o")
        .classify(&sample_record(), &ReferenceDocs::default())
        .await
        .unwrap_err();

    match err {
        OracleError::Transport(message) => {
            assert!(message.contains("429"));
            assert!(message.contains("Rate limit reached"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_prose_reply_is_parse_error() {
    let (base_url, _captured) = serve(StatusCode::OK, completion("I think this is a shoe.")).await;

    let err = oracle(base_url, "gpt-4o")
        .classify(&sample_record(), &ReferenceDocs::default())
        .await
        .unwrap_err();

    assert!(matches!(err, OracleError::Parse(_)));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport_error() {
    // Bind then drop to get a port nobody listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = oracle(format!("http://{}/v1", addr), "gpt-4o")
        .classify(&sample_record(), &ReferenceDocs::default())
        .await
        .unwrap_err();

    assert!(matches!(err, OracleError::Transport(_)));
}
