use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AppConfig {
    pub logging: LogConfig,
    pub backend: BackendConfig,
    pub chat: ChatConfig,
    pub realtime: RealtimeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackendConfig {
    /// REST root, e.g. `http://localhost:8080/api`.
    pub base_url: String,
    /// STOMP WebSocket endpoint.
    pub ws_url: String,
    pub request_timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_owned(),
            ws_url: "ws://localhost:8080/ws".to_owned(),
            request_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatConfig {
    pub page_size: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self { page_size: 20 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RealtimeConfig {
    pub reconnect_delay_ms: u64,
    pub heartbeat_ms: u64,
    pub handshake_timeout_ms: u64,
    /// Consecutive failed attempts before the status bar shows `disconnected`.
    pub disconnect_notice_after: u32,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: 5_000,
            heartbeat_ms: 10_000,
            handshake_timeout_ms: 10_000,
            disconnect_notice_after: 3,
        }
    }
}
