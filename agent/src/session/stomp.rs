//! STOMP 1.2 frames carried in WebSocket text messages

use std::fmt;

use secrecy::{ExposeSecret, SecretString};

use crate::errors::AgentError;

/// Frame commands used by the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect,
    Connected,
    Send,
    Subscribe,
    Unsubscribe,
    Message,
    Receipt,
    Error,
    Disconnect,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Connect => "CONNECT",
            Command::Connected => "CONNECTED",
            Command::Send => "SEND",
            Command::Subscribe => "SUBSCRIBE",
            Command::Unsubscribe => "UNSUBSCRIBE",
            Command::Message => "MESSAGE",
            Command::Receipt => "RECEIPT",
            Command::Error => "ERROR",
            Command::Disconnect => "DISCONNECT",
        }
    }

    fn parse(s: &str) -> Option<Command> {
        let command = match s {
            "CONNECT" | "STOMP" => Command::Connect,
            "CONNECTED" => Command::Connected,
            "SEND" => Command::Send,
            "SUBSCRIBE" => Command::Subscribe,
            "UNSUBSCRIBE" => Command::Unsubscribe,
            "MESSAGE" => Command::Message,
            "RECEIPT" => Command::Receipt,
            "ERROR" => Command::Error,
            "DISCONNECT" => Command::Disconnect,
            _ => return None,
        };
        Some(command)
    }

    /// CONNECT and CONNECTED headers are never escaped
    fn escapes_headers(&self) -> bool {
        !matches!(self, Command::Connect | Command::Connected)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A STOMP frame
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: Command,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Header values may carry the bearer token.
        let names: Vec<&str> = self.headers.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("Frame")
            .field("command", &self.command)
            .field("headers", &names)
            .field("body_len", &self.body.len())
            .finish()
    }
}

impl Frame {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// First value of a header
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn connect(host: &str, token: &SecretString) -> Self {
        Frame::new(Command::Connect)
            .with_header("accept-version", "1.2")
            .with_header("host", host)
            .with_header("heart-beat", "0,0")
            .with_header("Authorization", format!("Bearer {}", token.expose_secret()))
    }

    pub fn subscribe(id: &str, destination: &str) -> Self {
        Frame::new(Command::Subscribe)
            .with_header("id", id)
            .with_header("destination", destination)
            .with_header("ack", "auto")
    }

    /// SEND with a JSON body
    pub fn send_json(destination: &str, body: &serde_json::Value) -> Self {
        let body = body.to_string();
        Frame::new(Command::Send)
            .with_header("destination", destination)
            .with_header("content-type", "application/json")
            .with_header("content-length", body.len().to_string())
            .with_body(body)
    }

    pub fn disconnect(receipt: &str) -> Self {
        Frame::new(Command::Disconnect).with_header("receipt", receipt)
    }

    /// Serialize to wire text, NUL-terminated
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');

        let escape = self.command.escapes_headers();
        for (name, value) in &self.headers {
            if escape {
                out.push_str(&escape_header(name));
                out.push(':');
                out.push_str(&escape_header(value));
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }

        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Parse wire text. Heart-beat EOLs decode to `None`.
    pub fn decode(text: &str) -> Result<Option<Frame>, AgentError> {
        let text = text.trim_start_matches(['\r', '\n']);
        if text.is_empty() {
            return Ok(None);
        }

        let (head, rest) = split_head(text)
            .ok_or_else(|| AgentError::ParseError("STOMP frame has no header terminator".to_string()))?;

        let mut lines = head.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l));
        let command_line = lines.next().unwrap_or_default();
        let command = Command::parse(command_line).ok_or_else(|| {
            AgentError::ParseError(format!("unknown STOMP command {:?}", command_line))
        })?;

        let mut frame = Frame::new(command);
        for line in lines.filter(|l| !l.is_empty()) {
            let (name, value) = line.split_once(':').ok_or_else(|| {
                AgentError::ParseError(format!("malformed STOMP header {:?}", line))
            })?;
            let (name, value) = if command.escapes_headers() {
                (unescape_header(name)?, unescape_header(value)?)
            } else {
                (name.to_string(), value.to_string())
            };
            frame.headers.push((name, value));
        }

        let length = match frame.header("content-length") {
            Some(len) => Some(len.trim().parse::<usize>().map_err(|_| {
                AgentError::ParseError(format!("invalid content-length {:?}", len))
            })?),
            None => None,
        };

        frame.body = match length {
            Some(len) => rest
                .get(..len)
                .ok_or_else(|| AgentError::ParseError("STOMP body shorter than content-length".to_string()))?
                .to_string(),
            None => rest.split('\0').next().unwrap_or_default().to_string(),
        };

        Ok(Some(frame))
    }
}

fn split_head(text: &str) -> Option<(&str, &str)> {
    let lf = text.find("\n\n").map(|i| (i, 2));
    let crlf = text.find("\r\n\r\n").map(|i| (i, 4));
    let (index, width) = match (lf, crlf) {
        (Some(a), Some(b)) => if a.0 <= b.0 { a } else { b },
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => return None,
    };
    Some((&text[..index], &text[index + width..]))
}

fn escape_header(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

fn unescape_header(value: &str) -> Result<String, AgentError> {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            other => {
                return Err(AgentError::ParseError(format!(
                    "invalid STOMP escape \\{}",
                    other.map(String::from).unwrap_or_default()
                )))
            }
        }
    }
    Ok(out)
}
