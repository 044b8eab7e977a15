//! LLM Client — [`ChatProvider`] over Ollama and OpenAI-compatible HTTP APIs.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::{ProviderError, Result};
use crate::provider::ChatProvider;
use crate::types::{ChatMessage, ChatOptions, ChatResponse, TokenUsage};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Provider backend for chat completions.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    /// Ollama running locally, via its `/api/chat` endpoint.
    Ollama {
        /// e.g. `http://localhost:11434`.
        base_url: String,
    },
    /// OpenAI-compatible `/v1/chat/completions` API.
    OpenAiCompatible {
        /// e.g. `https://api.openai.com`.
        base_url: String,
        /// Sent as a bearer token.
        api_key: String,
    },
    /// No backend; every call fails so the game serves fallback replies.
    None,
}

/// HTTP chat client with bounded retries and a per-request timeout.
pub struct LlmClient {
    provider: LlmProvider,
    http: Client,
    model: String,
    max_retries: u32,
    timeout: Duration,
}

impl LlmClient {
    /// Create a new client.
    #[must_use]
    pub fn new(provider: LlmProvider, model: impl Into<String>, max_retries: u32) -> Self {
        Self {
            provider,
            http: Client::new(),
            model: model.into(),
            max_retries,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create a client with no backend (all calls fail with `Unavailable`).
    #[must_use]
    pub fn none() -> Self {
        Self::new(LlmProvider::None, String::new(), 0)
    }

    /// Set the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check if the client has a backend configured.
    #[must_use]
    pub fn is_available(&self) -> bool {
        !matches!(self.provider, LlmProvider::None)
    }

    /// Model name requests are sent with.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// POST `body` to `url`, retrying transport failures, 429 and 5xx.
    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        bearer: Option<&str>,
    ) -> Result<(Value, u64)> {
        let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
        let mut last_error = String::new();
        let mut timed_out = false;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                debug!(attempt = attempt + 1, of = self.max_retries + 1, url, "Retrying LLM call");
                tokio::time::sleep(Duration::from_millis(200 * u64::from(attempt))).await;
            }

            let mut request = self.http.post(url).json(body).timeout(self.timeout);
            if let Some(key) = bearer {
                request = request.bearer_auth(key);
            }

            let start = Instant::now();
            match request.send().await {
                Ok(resp) if resp.status().is_success() => {
                    let json: Value = resp
                        .json()
                        .await
                        .map_err(|e| ProviderError::ParseError(e.to_string()))?;
                    let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                    return Ok((json, latency_ms));
                }
                Ok(resp) => {
                    timed_out = false;
                    let status = resp.status();
                    let text = resp.text().await.unwrap_or_default();
                    last_error = format!("HTTP {status}: {text}");
                    if !is_retryable(status) {
                        warn!(%status, "LLM backend rejected request");
                        return Err(ProviderError::RequestFailed(last_error));
                    }
                    warn!(%status, attempt = attempt + 1, "LLM backend returned error");
                }
                Err(e) => {
                    last_error = e.to_string();
                    timed_out = e.is_timeout();
                    if timed_out {
                        warn!(timeout_ms, attempt = attempt + 1, "LLM request timed out");
                    } else {
                        warn!(error = %last_error, "LLM request failed");
                    }
                }
            }
        }

        if timed_out {
            return Err(ProviderError::Timeout(timeout_ms));
        }
        Err(ProviderError::RetriesExhausted {
            attempts: self.max_retries + 1,
            last_error,
        })
    }

    async fn chat_ollama(
        &self,
        base_url: &str,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<ChatResponse> {
        let url = format!("{}/api/chat", base_url.trim_end_matches('/'));
        let body = ollama_body(&self.model, messages, options);
        let (json, latency_ms) = self.post_json(&url, &body, None).await?;
        let mut response = parse_ollama(json)?;
        response.latency_ms = latency_ms;
        Ok(response)
    }

    async fn chat_openai(
        &self,
        base_url: &str,
        api_key: &str,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<ChatResponse> {
        let url = format!("{}/v1/chat/completions", base_url.trim_end_matches('/'));
        let body = openai_body(&self.model, messages, options);
        let (json, latency_ms) = self.post_json(&url, &body, Some(api_key)).await?;
        let mut response = parse_openai(json)?;
        response.latency_ms = latency_ms;
        Ok(response)
    }
}

#[async_trait]
impl ChatProvider for LlmClient {
    fn name(&self) -> &str {
        match self.provider {
            LlmProvider::Ollama { .. } => "ollama",
            LlmProvider::OpenAiCompatible { .. } => "openai-compatible",
            LlmProvider::None => "none",
        }
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<ChatResponse> {
        match &self.provider {
            LlmProvider::None => Err(ProviderError::Unavailable(
                "No LLM provider configured".into(),
            )),
            LlmProvider::Ollama { base_url } => {
                self.chat_ollama(base_url, messages, options).await
            }
            LlmProvider::OpenAiCompatible { base_url, api_key } => {
                if api_key.is_empty() {
                    return Err(ProviderError::ConfigError("API key is empty".into()));
                }
                self.chat_openai(base_url, api_key, messages, options).await
            }
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn wire_messages(messages: &[ChatMessage]) -> Vec<Value> {
    messages
        .iter()
        .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
        .collect()
}

fn openai_body(model: &str, messages: &[ChatMessage], options: &ChatOptions) -> Value {
    json!({
        "model": model,
        "messages": wire_messages(messages),
        "max_tokens": options.max_tokens,
        "temperature": options.temperature,
    })
}

fn ollama_body(model: &str, messages: &[ChatMessage], options: &ChatOptions) -> Value {
    json!({
        "model": model,
        "messages": wire_messages(messages),
        "stream": false,
        "options": {
            "temperature": options.temperature,
            "num_predict": options.max_tokens,
        }
    })
}

// ---------------------------------------------------------------------------
// Response shapes
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct OpenAiReply {
    #[serde(default)]
    model: String,
    choices: Vec<OpenAiChoice>,
    usage: Option<TokenUsage>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: WireMessage,
}

#[derive(Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct OllamaReply {
    #[serde(default)]
    model: String,
    message: WireMessage,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
}

fn parse_openai(json: Value) -> Result<ChatResponse> {
    let reply: OpenAiReply =
        serde_json::from_value(json).map_err(|e| ProviderError::ParseError(e.to_string()))?;
    let content = reply
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ProviderError::ParseError("response has no message content".into()))?;
    Ok(ChatResponse {
        content,
        usage: reply.usage,
        model: reply.model,
        latency_ms: 0,
    })
}

fn parse_ollama(json: Value) -> Result<ChatResponse> {
    let reply: OllamaReply =
        serde_json::from_value(json).map_err(|e| ProviderError::ParseError(e.to_string()))?;
    let content = reply
        .message
        .content
        .ok_or_else(|| ProviderError::ParseError("response has no message content".into()))?;
    let usage = match (reply.prompt_eval_count, reply.eval_count) {
        (None, None) => None,
        (prompt, completion) => {
            let prompt_tokens = prompt.unwrap_or(0);
            let completion_tokens = completion.unwrap_or(0);
            Some(TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens.saturating_add(completion_tokens),
            })
        }
    };
    Ok(ChatResponse {
        content,
        usage,
        model: reply.model,
        latency_ms: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::Mutex;

    /// Serve one canned `(status, body)` per connection, recording request bodies.
    async fn serve(responses: Vec<(u16, String)>) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&seen);
        tokio::spawn(async move {
            for (status, body) in responses {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let request = read_request(&mut socket).await;
                recorded.lock().await.push(request);
                let reply = format!(
                    "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(reply.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        (format!("http://{addr}"), seen)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0_u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.expect("read");
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    return String::from_utf8_lossy(&buf[end + 4..end + 4 + length]).into_owned();
                }
            }
        }
        String::new()
    }

    fn messages() -> Vec<ChatMessage> {
        vec![ChatMessage::system("あなたはさくらです"), ChatMessage::user("続けて")]
    }

    #[tokio::test]
    async fn none_provider_is_unavailable() {
        let client = LlmClient::none();
        assert!(!client.is_available());
        let err = client
            .chat(&messages(), &ChatOptions::default())
            .await
            .expect_err("no backend");
        assert!(matches!(err, ProviderError::Unavailable(_)));
    }

    #[tokio::test]
    async fn empty_api_key_is_a_config_error() {
        let client = LlmClient::new(
            LlmProvider::OpenAiCompatible {
                base_url: "http://127.0.0.1:9".into(),
                api_key: String::new(),
            },
            "gpt-4o-mini",
            0,
        );
        let err = client
            .chat(&messages(), &ChatOptions::default())
            .await
            .expect_err("empty key");
        assert!(matches!(err, ProviderError::ConfigError(_)));
    }

    #[tokio::test]
    async fn openai_round_trip_reads_content_and_usage() {
        let body = r#"{"model":"gpt-4o-mini","choices":[{"message":{"role":"assistant","content":"こんにちは [MOOD:+2]"}}],"usage":{"prompt_tokens":10,"completion_tokens":4,"total_tokens":14}}"#;
        let (base_url, seen) = serve(vec![(200, body.to_string())]).await;
        let client = LlmClient::new(
            LlmProvider::OpenAiCompatible {
                base_url,
                api_key: "sk-test".into(),
            },
            "gpt-4o-mini",
            0,
        );
        let response = client
            .chat(&messages(), &ChatOptions::default())
            .await
            .expect("chat");
        assert_eq!(response.content, "こんにちは [MOOD:+2]");
        assert_eq!(response.usage.map(|u| u.total_tokens), Some(14));

        let sent: Value = serde_json::from_str(&seen.lock().await[0]).expect("json body");
        assert_eq!(sent["messages"][0]["role"], "system");
        assert_eq!(sent["messages"][1]["content"], "続けて");
        assert_eq!(sent["max_tokens"], 1000);
    }

    #[tokio::test]
    async fn ollama_retries_server_errors() {
        let ok = r#"{"model":"qwen2.5","message":{"role":"assistant","content":"うん！"},"done":true,"prompt_eval_count":7,"eval_count":3}"#;
        let (base_url, seen) = serve(vec![(500, "{}".into()), (200, ok.to_string())]).await;
        let client = LlmClient::new(LlmProvider::Ollama { base_url }, "qwen2.5", 2);
        let response = client
            .chat(&messages(), &ChatOptions::default())
            .await
            .expect("chat after retry");
        assert_eq!(response.content, "うん！");
        assert_eq!(response.usage.map(|u| u.total_tokens), Some(10));
        assert_eq!(seen.lock().await.len(), 2);

        let sent: Value = serde_json::from_str(&seen.lock().await[1]).expect("json body");
        assert_eq!(sent["stream"], false);
        assert_eq!(sent["options"]["num_predict"], 1000);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let (base_url, seen) = serve(vec![(401, r#"{"error":"bad key"}"#.into())]).await;
        let client = LlmClient::new(
            LlmProvider::OpenAiCompatible {
                base_url,
                api_key: "sk-wrong".into(),
            },
            "gpt-4o-mini",
            3,
        );
        let err = client
            .chat(&messages(), &ChatOptions::default())
            .await
            .expect_err("unauthorized");
        assert!(matches!(err, ProviderError::RequestFailed(_)));
        assert_eq!(seen.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn exhausted_retries_report_attempts() {
        let (base_url, _) = serve(vec![(503, "{}".into()), (503, "{}".into())]).await;
        let client = LlmClient::new(LlmProvider::Ollama { base_url }, "qwen2.5", 1);
        let err = client
            .chat(&messages(), &ChatOptions::default())
            .await
            .expect_err("always failing");
        assert!(matches!(err, ProviderError::RetriesExhausted { attempts: 2, .. }));
    }

    #[tokio::test]
    async fn silent_backend_reports_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        let client = LlmClient::new(
            LlmProvider::Ollama {
                base_url: format!("http://{addr}"),
            },
            "qwen2.5",
            1,
        )
        .with_timeout(Duration::from_millis(200));
        let err = client
            .chat(&messages(), &ChatOptions::default())
            .await
            .expect_err("backend never answers");
        assert!(matches!(err, ProviderError::Timeout(200)), "got {err:?}");
    }

    #[test]
    fn missing_content_is_a_parse_error() {
        let json = json!({ "choices": [] });
        assert!(matches!(parse_openai(json), Err(ProviderError::ParseError(_))));
        let json = json!({ "message": { "role": "assistant" } });
        assert!(matches!(parse_ollama(json), Err(ProviderError::ParseError(_))));
    }
}
