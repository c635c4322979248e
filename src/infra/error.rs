use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to read config file at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to initialize logging: {0}")]
    LoggingInit(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
    #[error("failed to resolve storage path: {details}")]
    StoragePathResolution { details: String },
    #[error("failed to create storage directory at {path}: {source}")]
    StorageDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("another roomchat instance is already running (lock held at {path})")]
    SessionStoreBusy { path: PathBuf },
    #[error("failed to open session lock at {path}: {source}")]
    SessionLockCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("not logged in; run `roomchat login` first")]
    NotLoggedIn,
    #[error("failed to access auth store at {path}: {source}")]
    AuthStoreIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("auth store at {path} is malformed: {source}")]
    AuthStoreParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("access token is invalid: {details}")]
    InvalidToken { details: String },
    #[error("failed to start async runtime: {0}")]
    RuntimeInit(#[source] std::io::Error),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}
