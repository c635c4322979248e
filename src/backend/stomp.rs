//! Minimal STOMP 1.2 frame codec for the chat broker.
//!
//! One WebSocket text message may carry several frames and bare EOL
//! heart-beats; [`decode`] returns them in order.

use std::time::Duration;

use thiserror::Error;

pub const NULL: char = '\0';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StompError {
    #[error("frame is not terminated by NUL")]
    Truncated,
    #[error("frame has no command line")]
    MissingCommand,
    #[error("malformed header line: {0}")]
    InvalidHeader(String),
    #[error("invalid escape sequence in header")]
    InvalidEscape,
    #[error("content-length does not match the body")]
    BadContentLength,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    Heartbeat,
    Frame(Frame),
}

impl Frame {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// First occurrence wins when a header is repeated.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn connect(host: &str, access_token: &str, heartbeat: Duration) -> Self {
        let heartbeat_ms = heartbeat.as_millis();
        Self::new("CONNECT")
            .with_header("accept-version", "1.2")
            .with_header("host", host)
            .with_header("heart-beat", format!("{heartbeat_ms},{heartbeat_ms}"))
            .with_header("Authorization", format!("Bearer {access_token}"))
    }

    pub fn subscribe(id: &str, destination: &str) -> Self {
        Self::new("SUBSCRIBE")
            .with_header("id", id)
            .with_header("destination", destination)
            .with_header("ack", "auto")
    }

    pub fn unsubscribe(id: &str) -> Self {
        Self::new("UNSUBSCRIBE").with_header("id", id)
    }

    pub fn send_json(destination: &str, body: String) -> Self {
        Self::new("SEND")
            .with_header("destination", destination)
            .with_header("content-type", "application/json")
            .with_header("content-length", body.len().to_string())
            .with_body(body)
    }

    pub fn disconnect() -> Self {
        Self::new("DISCONNECT")
    }

    pub fn encode(&self) -> String {
        let escape_headers = !matches!(self.command.as_str(), "CONNECT" | "CONNECTED");

        let mut out = String::with_capacity(self.body.len() + 64);
        out.push_str(&self.command);
        out.push('\n');
        for (name, value) in &self.headers {
            if escape_headers {
                out.push_str(&escape(name));
                out.push(':');
                out.push_str(&escape(value));
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push(NULL);
        out
    }
}

/// Splits one transport message into heart-beats and frames.
pub fn decode(input: &str) -> Result<Vec<Chunk>, StompError> {
    let mut chunks = Vec::new();
    let mut rest = input;

    loop {
        let trimmed = skip_eols(rest);
        if trimmed.len() != rest.len() {
            chunks.push(Chunk::Heartbeat);
        }
        rest = trimmed;
        if rest.is_empty() {
            return Ok(chunks);
        }

        let (frame, remaining) = decode_frame(rest)?;
        chunks.push(Chunk::Frame(frame));
        rest = remaining;
    }
}

fn skip_eols(input: &str) -> &str {
    let mut rest = input;
    loop {
        if let Some(next) = rest.strip_prefix("\r\n") {
            rest = next;
        } else if let Some(next) = rest.strip_prefix('\n') {
            rest = next;
        } else {
            return rest;
        }
    }
}

fn decode_frame(input: &str) -> Result<(Frame, &str), StompError> {
    let (command, mut rest) = split_line(input).ok_or(StompError::Truncated)?;
    if command.is_empty() {
        return Err(StompError::MissingCommand);
    }
    let unescape_headers = command != "CONNECTED";

    let mut headers = Vec::new();
    loop {
        let (line, next) = split_line(rest).ok_or(StompError::Truncated)?;
        rest = next;
        if line.is_empty() {
            break;
        }

        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| StompError::InvalidHeader(line.to_owned()))?;
        if unescape_headers {
            headers.push((unescape(name)?, unescape(value)?));
        } else {
            headers.push((name.to_owned(), value.to_owned()));
        }
    }

    let content_length = headers
        .iter()
        .find(|(name, _)| name == "content-length")
        .map(|(_, value)| value.trim().parse::<usize>())
        .transpose()
        .map_err(|_| StompError::BadContentLength)?;

    let (body, after) = match content_length {
        Some(length) => {
            let body = rest.get(..length).ok_or(StompError::BadContentLength)?;
            let after = rest
                .get(length..)
                .and_then(|tail| tail.strip_prefix(NULL))
                .ok_or(StompError::BadContentLength)?;
            (body, after)
        }
        None => {
            let end = rest.find(NULL).ok_or(StompError::Truncated)?;
            (&rest[..end], &rest[end + NULL.len_utf8()..])
        }
    };

    Ok((
        Frame {
            command: command.to_owned(),
            headers,
            body: body.to_owned(),
        },
        after,
    ))
}

fn split_line(input: &str) -> Option<(&str, &str)> {
    let end = input.find('\n')?;
    let line = input[..end].strip_suffix('\r').unwrap_or(&input[..end]);
    Some((line, &input[end + 1..]))
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

fn unescape(value: &str) -> Result<String, StompError> {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            _ => return Err(StompError::InvalidEscape),
        }
    }
    Ok(out)
}

/// Heart-beat intervals agreed with the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    /// How often the client must send something, if at all.
    pub send_every: Option<Duration>,
    /// How often the server promised to send something, if at all.
    pub expect_every: Option<Duration>,
}

/// Combines the client's `heart-beat` offer with the server's CONNECTED header.
pub fn negotiate_heartbeat(client: Duration, server_header: Option<&str>) -> Heartbeat {
    let (server_send, server_want) = server_header
        .and_then(|value| value.split_once(','))
        .and_then(|(sx, sy)| Some((sx.trim().parse::<u64>().ok()?, sy.trim().parse::<u64>().ok()?)))
        .unwrap_or((0, 0));
    let client_ms = u64::try_from(client.as_millis()).unwrap_or(u64::MAX);

    let agree = |ours: u64, theirs: u64| {
        (ours != 0 && theirs != 0).then(|| Duration::from_millis(ours.max(theirs)))
    };

    Heartbeat {
        send_every: agree(client_ms, server_want),
        expect_every: agree(client_ms, server_send),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_frame_escapes_header_values() {
        let frame = Frame::new("SEND").with_header("note", "a:b\nc\\d");

        assert_eq!(frame.encode(), "SEND\nnote:a\\cb\\nc\\\\d\n\n\0");
    }

    #[test]
    fn connect_frame_is_not_escaped() {
        let frame = Frame::connect("rooms.example.com", "abc", Duration::from_secs(10));
        let encoded = frame.encode();

        assert!(encoded.starts_with("CONNECT\naccept-version:1.2\nhost:rooms.example.com\n"));
        assert!(encoded.contains("heart-beat:10000,10000\n"));
        assert!(encoded.ends_with("\n\n\0"));
    }

    #[test]
    fn decodes_escaped_message_headers() {
        let chunks = decode("MESSAGE\ndestination:/topic/messages/1\nx-note:a\\cb\n\n{}\0")
            .expect("frame should decode");

        let Chunk::Frame(frame) = &chunks[0] else {
            panic!("expected a frame");
        };
        assert_eq!(frame.header("x-note"), Some("a:b"));
        assert_eq!(frame.body, "{}");
    }

    #[test]
    fn decodes_heartbeats_and_multiple_frames() {
        let input = "\n\r\nMESSAGE\nsubscription:sub-0\n\nfirst\0\nRECEIPT\nreceipt-id:7\n\n\0";

        let chunks = decode(input).expect("frames should decode");

        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0], Chunk::Heartbeat);
        assert!(matches!(&chunks[1], Chunk::Frame(frame) if frame.body == "first"));
        assert_eq!(chunks[2], Chunk::Heartbeat);
        assert!(matches!(&chunks[3], Chunk::Frame(frame) if frame.command == "RECEIPT"));
    }

    #[test]
    fn content_length_allows_nul_in_body() {
        let chunks = decode("MESSAGE\ncontent-length:3\n\na\0b\0").expect("frame should decode");

        assert!(matches!(&chunks[0], Chunk::Frame(frame) if frame.body == "a\0b"));
    }

    #[test]
    fn missing_terminator_is_reported() {
        assert_eq!(decode("MESSAGE\n\nbody"), Err(StompError::Truncated));
    }

    #[test]
    fn unknown_escape_is_rejected() {
        assert_eq!(
            decode("MESSAGE\nbad:a\\tb\n\n\0"),
            Err(StompError::InvalidEscape)
        );
    }

    #[test]
    fn heartbeat_uses_slower_side_and_zero_disables() {
        let agreed = negotiate_heartbeat(Duration::from_secs(10), Some("20000,0"));

        assert_eq!(agreed.send_every, None);
        assert_eq!(agreed.expect_every, Some(Duration::from_secs(20)));

        let none = negotiate_heartbeat(Duration::from_secs(10), None);
        assert_eq!(none.send_every, None);
        assert_eq!(none.expect_every, None);
    }
}
