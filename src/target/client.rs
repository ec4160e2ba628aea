use std::time::{Duration, Instant};

use futures::{SinkExt, StreamExt};
use reqwest::Client;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::config::{AuthKind, TargetConfig, TargetProtocol};
use crate::errors::KestrelError;

/// A single round-trip with the target, trimmed to what the scorer suite and
/// artifact store need.
#[derive(Debug, Clone)]
pub struct TargetResponse {
    pub status: u16,
    pub body: String,
    pub latency_ms: u64,
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Sends probe/exploit payloads to the target and returns its raw response,
/// injecting auth the way the target's config says to and never leaking the
/// credential back into logs or artifacts.
pub struct TargetClient {
    http: Client,
    config: TargetConfig,
    ws: Mutex<Option<WsStream>>,
}

impl TargetClient {
    pub fn new(config: TargetConfig) -> Result<Self, KestrelError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| KestrelError::Config(format!("failed to build target HTTP client: {}", e)))?;
        Ok(Self { http, config, ws: Mutex::new(None) })
    }

    pub async fn send(&self, message: &str) -> Result<TargetResponse, KestrelError> {
        match self.config.protocol {
            TargetProtocol::Http => self.send_http(message).await,
            TargetProtocol::WebSocket => self.send_ws(message).await,
        }
    }

    async fn send_http(&self, message: &str) -> Result<TargetResponse, KestrelError> {
        let body = json!({ self.config.message_field.clone(): message });
        let mut req = self.http.post(&self.config.url).json(&body);
        req = self.apply_auth(req);

        let started = Instant::now();
        let resp = req.send().await.map_err(|e| {
            if e.is_timeout() {
                KestrelError::TargetTimeout(format!("{}: {}", self.config.url, e))
            } else if e.is_connect() {
                KestrelError::TargetUnreachable(format!("{}: {}", self.config.url, e))
            } else {
                KestrelError::TargetUnreachable(format!("{}: {}", self.config.url, e))
            }
        })?;
        let latency_ms = started.elapsed().as_millis() as u64;

        let status = resp.status();
        if status.as_u16() == 429 {
            return Err(KestrelError::RateLimit(format!("target {} rate limited us", self.config.url)));
        }
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(KestrelError::TargetRefused(format!(
                "target {} refused the request (HTTP {})",
                self.config.url,
                status.as_u16()
            )));
        }

        let raw = resp
            .text()
            .await
            .map_err(|e| KestrelError::TargetUnreachable(format!("failed to read target response: {}", e)))?;
        debug!(url = %self.config.url, status = status.as_u16(), latency_ms, "target round-trip complete");

        Ok(TargetResponse {
            status: status.as_u16(),
            body: extract_response_text(&raw, &self.config.message_field),
            latency_ms,
        })
    }

    /// Opens a fresh connection per send, unless `ws_session_id` is set, in
    /// which case the connection is kept open and reused across sends.
    async fn send_ws(&self, message: &str) -> Result<TargetResponse, KestrelError> {
        let body = json!({ self.config.message_field.clone(): message }).to_string();
        let started = Instant::now();
        let reuse = self.config.ws_session_id.is_some();

        let mut slot = self.ws.lock().await;
        if slot.is_none() {
            let (stream, _) = connect_async(&self.config.url)
                .await
                .map_err(|e| KestrelError::TargetUnreachable(format!("{}: {}", self.config.url, e)))?;
            *slot = Some(stream);
        }
        let stream = slot.as_mut().expect("populated above");

        stream
            .send(Message::Text(body))
            .await
            .map_err(|e| KestrelError::TargetUnreachable(format!("{}: {}", self.config.url, e)))?;

        let budget = Duration::from_secs(self.config.request_timeout_secs);
        let reply = loop {
            match tokio::time::timeout(budget, stream.next()).await {
                Ok(Some(Ok(Message::Text(text)))) => break text,
                Ok(Some(Ok(Message::Binary(bytes)))) => break String::from_utf8_lossy(&bytes).into_owned(),
                Ok(Some(Ok(_))) => continue,
                Ok(Some(Err(e))) => return Err(KestrelError::TargetUnreachable(format!("{}: {}", self.config.url, e))),
                Ok(None) => return Err(KestrelError::TargetUnreachable(format!("{}: connection closed", self.config.url))),
                Err(_) => return Err(KestrelError::TargetTimeout(format!("{}: websocket read timed out", self.config.url))),
            }
        };

        if !reuse {
            if let Some(mut s) = slot.take() {
                let _ = s.close(None).await;
            }
        }

        let latency_ms = started.elapsed().as_millis() as u64;
        debug!(url = %self.config.url, latency_ms, "target websocket round-trip complete");

        Ok(TargetResponse {
            status: 200,
            body: extract_response_text(&reply, &self.config.message_field),
            latency_ms,
        })
    }

    pub fn target_url(&self) -> &str {
        &self.config.url
    }

    fn apply_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let auth = &self.config.auth;
        match auth.kind {
            AuthKind::None => req,
            AuthKind::Bearer => match &auth.token {
                Some(t) => req.header("Authorization", format!("Bearer {}", t)),
                None => req,
            },
            AuthKind::ApiKey => match &auth.token {
                Some(t) => {
                    let header = auth.header_name.as_deref().unwrap_or("x-api-key");
                    req.header(header, t)
                }
                None => req,
            },
            AuthKind::Basic => match (&auth.username, &auth.password) {
                (Some(u), p) => req.basic_auth(u, p.as_ref()),
                _ => req,
            },
        }
    }
}

/// Targets that reply with structured JSON usually nest the reply under a
/// field like `response` or `reply`; fall back to the raw body for plain-text
/// targets.
fn extract_response_text(raw: &str, message_field: &str) -> String {
    let Ok(data) = serde_json::from_str::<Value>(raw) else {
        return raw.to_string();
    };
    for field in ["response", "reply", "output", "text", message_field] {
        if let Some(s) = data.get(field).and_then(Value::as_str) {
            return s.to_string();
        }
    }
    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_response_text_prefers_known_fields() {
        let raw = r#"{"response": "hello there"}"#;
        assert_eq!(extract_response_text(raw, "message"), "hello there");
    }

    #[test]
    fn extract_response_text_falls_back_to_raw_body() {
        let raw = "plain text reply";
        assert_eq!(extract_response_text(raw, "message"), "plain text reply");
    }

    #[test]
    fn websocket_protocol_is_accepted_at_construction() {
        let cfg = TargetConfig {
            url: "wss://example.test".into(),
            protocol: TargetProtocol::WebSocket,
            message_field: "message".into(),
            auth: Default::default(),
            request_timeout_secs: 30,
            ws_session_id: None,
        };
        assert!(TargetClient::new(cfg).is_ok());
    }
}
