//! LLM client tests against a local stub HTTP server.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use db_ask::config::LlmConfig;
use db_ask::error::AskError;
use db_ask::llm::{
    create_client, CompletionRequest, LlmClient, LlmProvider, Message, OpenAiCompatClient,
    OpenAiCompatConfig, ResilientClient, RetryPolicy,
};
use db_ask::observability::RecordingEventSink;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const COMPLETION: &str = r#"{"choices":[{"message":{"role":"assistant","content":"SELECT 1;"}}]}"#;

/// Serves canned responses in order, repeating the last one.
struct StubServer {
    base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    async fn start(responses: Vec<(u16, &'static str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/v1", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let seen = requests.clone();
        tokio::spawn(async move {
            let mut served = 0;
            while let Ok((mut stream, _)) = listener.accept().await {
                let Some(request) = read_request(&mut stream).await else {
                    continue;
                };
                seen.lock().unwrap().push(request);

                let (status, body) = responses[served.min(responses.len() - 1)];
                served += 1;
                let response = format!(
                    "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        Self { base_url, requests }
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// Reads one HTTP/1.1 request: headers plus a `Content-Length` body.
async fn read_request(stream: &mut TcpStream) -> Option<String> {
    let mut data = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&data).to_string();
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if data.len() >= header_end + 4 + content_length {
                return Some(text);
            }
        }
    }
}

fn client(server: &StubServer, sink: Arc<RecordingEventSink>) -> ResilientClient<OpenAiCompatClient> {
    let config = OpenAiCompatConfig::new("sk-test", "test-model", &server.base_url).with_timeout(5);
    ResilientClient::new(OpenAiCompatClient::new(config).unwrap())
        .with_policy(RetryPolicy::new(3, Duration::from_millis(1)))
        .with_sink(sink)
}

fn request() -> CompletionRequest {
    CompletionRequest::new(vec![
        Message::system("You are an expert SQL assistant."),
        Message::user("How many users?"),
    ])
    .with_temperature(0.3)
    .with_max_tokens(200)
}

#[tokio::test]
async fn test_successful_completion() {
    let server = StubServer::start(vec![(200, COMPLETION)]).await;
    let sink = Arc::new(RecordingEventSink::new());

    let text = client(&server, sink.clone()).complete(&request()).await.unwrap();

    assert_eq!(text, "SELECT 1;");
    assert_eq!(sink.attempts_started(), 1);
    let events = sink.events();
    assert_eq!(events[0].endpoint, format!("{}/chat/completions", server.base_url));
    assert_eq!(events[0].component, "llm_client");

    let raw = server.requests().remove(0);
    let lowered = raw.to_lowercase();
    assert!(raw.starts_with("POST /v1/chat/completions HTTP/1.1"));
    assert!(lowered.contains("authorization: bearer sk-test"));

    let body = &raw[raw.find("\r\n\r\n").unwrap() + 4..];
    let json: serde_json::Value = serde_json::from_str(body).unwrap();
    assert_eq!(json["model"], "test-model");
    assert_eq!(json["max_tokens"], 200);
    assert_eq!(json["messages"][0]["role"], "system");
    assert_eq!(json["messages"][1]["content"], "How many users?");
    assert!((json["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
}

#[tokio::test]
async fn test_server_errors_exhaust_three_attempts() {
    let server = StubServer::start(vec![(503, r#"{"error":{"message":"overloaded"}}"#)]).await;
    let sink = Arc::new(RecordingEventSink::new());

    let err = client(&server, sink.clone())
        .complete(&request())
        .await
        .unwrap_err();

    assert!(matches!(err, AskError::TransientApi(_)));
    assert!(err.to_string().contains("overloaded"));
    assert_eq!(server.request_count(), 3);
    assert_eq!(
        sink.retry_delays(),
        vec![Duration::from_millis(1), Duration::from_millis(2)]
    );
}

#[tokio::test]
async fn test_recovers_after_transient_error() {
    let server = StubServer::start(vec![
        (429, r#"{"error":{"message":"slow down"}}"#),
        (200, COMPLETION),
    ])
    .await;

    let text = client(&server, Arc::new(RecordingEventSink::new()))
        .complete(&request())
        .await
        .unwrap();

    assert_eq!(text, "SELECT 1;");
    assert_eq!(server.request_count(), 2);
}

#[tokio::test]
async fn test_auth_failure_is_not_retried() {
    let server = StubServer::start(vec![(401, r#"{"error":{"message":"Invalid API key"}}"#)]).await;

    let err = client(&server, Arc::new(RecordingEventSink::new()))
        .complete(&request())
        .await
        .unwrap_err();

    assert!(matches!(err, AskError::PermanentApi(_)));
    assert!(err.to_string().contains("Invalid API key"));
    assert_eq!(server.request_count(), 1);
}

#[tokio::test]
async fn test_bad_request_is_not_retried() {
    let server =
        StubServer::start(vec![(400, r#"{"error":{"message":"model not found"}}"#)]).await;

    let err = client(&server, Arc::new(RecordingEventSink::new()))
        .complete(&request())
        .await
        .unwrap_err();

    assert!(matches!(err, AskError::PermanentApi(_)));
    assert!(err.to_string().contains("model not found"));
    assert_eq!(server.request_count(), 1);
}

#[tokio::test]
async fn test_unexpected_shape_is_permanent() {
    let server = StubServer::start(vec![(200, r#"{"choices":[]}"#)]).await;

    let err = client(&server, Arc::new(RecordingEventSink::new()))
        .complete(&request())
        .await
        .unwrap_err();

    assert!(matches!(err, AskError::PermanentApi(_)));
    assert_eq!(server.request_count(), 1);
}

#[tokio::test]
async fn test_connection_refused_is_retried() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let sink = Arc::new(RecordingEventSink::new());
    let config = OpenAiCompatConfig::new("sk-test", "test-model", format!("http://{addr}/v1"))
        .with_timeout(5);
    let client = ResilientClient::new(OpenAiCompatClient::new(config).unwrap())
        .with_policy(RetryPolicy::new(3, Duration::from_millis(1)))
        .with_sink(sink.clone());

    let err = client.complete(&request()).await.unwrap_err();

    assert!(matches!(err, AskError::TransientApi(_)));
    assert_eq!(sink.attempts_started(), 3);
}

#[tokio::test]
async fn test_factory_client_talks_to_openrouter_endpoint() {
    let server = StubServer::start(vec![(200, COMPLETION)]).await;
    let config = LlmConfig {
        provider: LlmProvider::OpenRouter,
        api_key: Some("sk-or-test".to_string()),
        model: Some("meta-llama/llama-3.1-8b-instruct:free".to_string()),
        base_url: Some(server.base_url.clone()),
        retry_base_delay_ms: 1,
        ..LlmConfig::default()
    };

    let client = create_client(&config, Arc::new(RecordingEventSink::new())).unwrap();
    let text = client.complete(&request()).await.unwrap();

    assert_eq!(text, "SELECT 1;");
    let raw = server.requests().remove(0).to_lowercase();
    assert!(raw.contains("authorization: bearer sk-or-test"));
    assert!(raw.contains("x-title: db-ask"));
    assert!(raw.contains("http-referer: http://localhost"));
    assert!(raw.contains("meta-llama/llama-3.1-8b-instruct:free"));
}
