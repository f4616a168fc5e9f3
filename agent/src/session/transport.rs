//! WebSocket transport for the session

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use http::header::{HeaderValue, AUTHORIZATION, USER_AGENT};
use secrecy::{ExposeSecret, SecretString};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};
use url::Url;

use crate::errors::AgentError;
use crate::session::stomp::Frame;

/// Path of the STOMP endpoint on the gateway
pub const SESSION_PATH: &str = "/wsocket/ws";

/// One open session transport
#[async_trait]
pub trait SessionLink: Send {
    async fn send(&mut self, frame: &Frame) -> Result<(), AgentError>;

    /// Next frame; `None` once the peer has closed
    async fn recv(&mut self) -> Option<Result<Frame, AgentError>>;

    /// Close gracefully, ignoring failures
    async fn close(&mut self);
}

/// Opens authenticated session transports
#[async_trait]
pub trait SessionTransport: Send + Sync {
    async fn open(&self, token: &SecretString) -> Result<Box<dyn SessionLink>, AgentError>;

    /// Value of the STOMP `host` header
    fn host(&self) -> String;
}

/// Resolve the session endpoint: explicit URL, or the gateway URL with a
/// WebSocket scheme and [`SESSION_PATH`] appended
pub fn session_url(explicit: Option<&str>, gateway_url: &str) -> Result<Url, AgentError> {
    if let Some(explicit) = explicit {
        return Url::parse(explicit).map_err(|e| AgentError::ConfigError(e.to_string()));
    }

    let mut url = Url::parse(gateway_url).map_err(|e| AgentError::ConfigError(e.to_string()))?;
    let scheme = match url.scheme() {
        "http" => "ws",
        "https" => "wss",
        other => {
            return Err(AgentError::ConfigError(format!(
                "cannot derive a session URL from scheme {}",
                other
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| AgentError::ConfigError("failed to set scheme".to_string()))?;
    url.set_path(&format!("{}{}", url.path().trim_end_matches('/'), SESSION_PATH));

    Ok(url)
}

/// tokio-tungstenite transport
pub struct WsTransport {
    url: Url,
    connect_timeout: Duration,
}

impl WsTransport {
    pub fn new(url: Url, connect_timeout: Duration) -> Self {
        Self { url, connect_timeout }
    }
}

#[async_trait]
impl SessionTransport for WsTransport {
    async fn open(&self, token: &SecretString) -> Result<Box<dyn SessionLink>, AgentError> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| AgentError::SessionError(e.to_string()))?;

        let bearer = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .map_err(|_| AgentError::AuthError("session token is not a valid header".to_string()))?;
        request.headers_mut().insert(AUTHORIZATION, bearer);
        request.headers_mut().insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("signage-agent/", env!("CARGO_PKG_VERSION"))),
        );

        debug!("Opening session transport to {}", self.url);
        let (stream, _) = tokio::time::timeout(self.connect_timeout, connect_async(request))
            .await
            .map_err(|_| AgentError::SessionError("timed out opening the WebSocket".to_string()))?
            .map_err(|e| AgentError::SessionError(e.to_string()))?;

        Ok(Box::new(WsLink { stream }))
    }

    fn host(&self) -> String {
        self.url.host_str().unwrap_or("localhost").to_string()
    }
}

struct WsLink {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl SessionLink for WsLink {
    async fn send(&mut self, frame: &Frame) -> Result<(), AgentError> {
        self.stream
            .send(Message::Text(frame.encode().into()))
            .await
            .map_err(|e| AgentError::SessionError(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<Frame, AgentError>> {
        loop {
            let text = match self.stream.next().await? {
                Ok(Message::Text(text)) => text.as_str().to_string(),
                Ok(Message::Binary(data)) => match String::from_utf8(data.to_vec()) {
                    Ok(text) => text,
                    Err(e) => return Some(Err(AgentError::ParseError(e.to_string()))),
                },
                Ok(Message::Close(_)) => return None,
                Ok(_) => continue,
                Err(e) => return Some(Err(AgentError::SessionError(e.to_string()))),
            };

            match Frame::decode(&text) {
                Ok(Some(frame)) => return Some(Ok(frame)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            warn!("Session transport close failed: {}", e);
        }
    }
}
