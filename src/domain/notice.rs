//! User-visible, non-blocking notifications.

use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    /// Stable upper-case code, safe to show and to log.
    pub code: &'static str,
    pub text: String,
    pub at_unix_ms: u128,
}

impl Notice {
    pub fn new(level: NoticeLevel, code: &'static str, text: impl Into<String>) -> Self {
        Self {
            level,
            code,
            text: text.into(),
            at_unix_ms: now_unix_ms(),
        }
    }

    pub fn error(code: &'static str, text: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, code, text)
    }

    pub fn warning(code: &'static str, text: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, code, text)
    }

    pub fn info(code: &'static str, text: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, code, text)
    }
}

pub fn now_unix_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}
