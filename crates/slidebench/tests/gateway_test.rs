//! Tests for the HTTP model gateway against a mock provider.

use serde_json::json;
use slidebench::{BenchConfig, Board, Direction, GatewaySettings, LlmGateway, ModelGateway};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(base_url: &str, provider: &str) -> GatewaySettings {
    let toml = format!(
        "[gateway]\nprovider = \"{}\"\nbase_url = \"{}\"\ntimeout_secs = 5\n",
        provider, base_url
    );
    BenchConfig::from_toml(&toml)
        .expect("Valid config")
        .gateway()
        .clone()
}

fn openai_reply(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }],
        "usage": { "prompt_tokens": 120, "completion_tokens": 6, "total_tokens": 126 }
    })
}

fn one_move_board() -> Board {
    Board::solved(3)
        .apply_move(Direction::Left)
        .expect("Legal move")
}

#[tokio::test]
async fn test_openai_reply_is_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({ "model": "openai/gpt-4.1-mini", "max_tokens": 16 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_reply(r#"{"move": "right"}"#)))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = LlmGateway::new(&settings(&server.uri(), "openai"), Some("test-key".to_string()))
        .expect("Gateway builds");
    let reply = gateway
        .suggest_move(&one_move_board(), "openai/gpt-4.1-mini", 42)
        .await
        .expect("Call succeeds");

    assert_eq!(reply.parsed_move, Some(Direction::Right));
    assert_eq!(reply.content, r#"{"move": "right"}"#);
    assert_eq!(reply.raw_response["id"], "chatcmpl-1");
    let usage = reply.token_usage.expect("Usage reported");
    assert_eq!(usage.prompt_tokens, Some(120));
    assert_eq!(usage.completion_tokens, Some(6));
    assert_eq!(usage.total_tokens, Some(126));
}

#[tokio::test]
async fn test_request_carries_board_and_budget() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_reply(r#"{"move":"up"}"#)))
        .mount(&server)
        .await;

    let gateway = LlmGateway::new(&settings(&server.uri(), "openai"), Some("k".to_string()))
        .expect("Gateway builds");
    gateway
        .suggest_move(&Board::solved(2).apply_move(Direction::Up).expect("Legal"), "m", 7)
        .await
        .expect("Call succeeds");

    let requests = server.received_requests().await.expect("Recording enabled");
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).expect("JSON body");
    assert_eq!(body["messages"][0]["role"], "system");
    let user = body["messages"][1]["content"].as_str().expect("User message");
    assert!(user.contains("[[1,null],[3,2]]"));
    assert!(user.contains("at most 7 moves"));
}

#[tokio::test]
async fn test_unusable_content_is_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(openai_reply("I'd slide the 8 tile left.")),
        )
        .mount(&server)
        .await;

    let gateway = LlmGateway::new(&settings(&server.uri(), "openai"), Some("k".to_string()))
        .expect("Gateway builds");
    let reply = gateway
        .suggest_move(&one_move_board(), "m", 10)
        .await
        .expect("Call succeeds");

    assert_eq!(reply.parsed_move, None);
    assert_eq!(reply.content, "I'd slide the 8 tile left.");
}

#[tokio::test]
async fn test_error_status_is_gateway_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let gateway = LlmGateway::new(&settings(&server.uri(), "openai"), Some("k".to_string()))
        .expect("Gateway builds");
    let err = gateway
        .suggest_move(&one_move_board(), "m", 10)
        .await
        .expect_err("Call fails");

    assert!(err.message.contains("500"));
    assert!(err.message.contains("upstream exploded"));
}

#[tokio::test]
async fn test_missing_content_is_gateway_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let gateway = LlmGateway::new(&settings(&server.uri(), "openai"), Some("k".to_string()))
        .expect("Gateway builds");
    let result = gateway.suggest_move(&one_move_board(), "m", 10).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_anthropic_wire_format() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(header("x-api-key", "anthropic-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_1",
            "content": [{ "type": "text", "text": "{\"move\": \"down\"}" }],
            "usage": { "input_tokens": 80, "output_tokens": 4 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = LlmGateway::new(
        &settings(&server.uri(), "anthropic"),
        Some("anthropic-key".to_string()),
    )
    .expect("Gateway builds");
    let reply = gateway
        .suggest_move(&one_move_board(), "claude-test", 10)
        .await
        .expect("Call succeeds");

    assert_eq!(reply.parsed_move, Some(Direction::Down));
    let usage = reply.token_usage.expect("Usage reported");
    assert_eq!(usage.total_tokens, Some(84));

    let requests = server.received_requests().await.expect("Recording enabled");
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).expect("JSON body");
    assert!(body["system"].as_str().expect("System prompt").contains("sliding tile"));
    assert_eq!(body["messages"].as_array().expect("Messages").len(), 1);
}

#[tokio::test]
async fn test_missing_key_fails_at_call_time() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_reply(r#"{"move":"up"}"#)))
        .expect(0)
        .mount(&server)
        .await;

    let gateway =
        LlmGateway::new(&settings(&server.uri(), "openai"), None).expect("Gateway builds");
    let err = gateway
        .suggest_move(&one_move_board(), "m", 10)
        .await
        .expect_err("Call fails");
    assert!(err.message.contains("API key"));
}
