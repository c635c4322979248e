mod app_config;
mod file_config;
mod loader;

pub use app_config::{AppConfig, BackendConfig, ChatConfig, LogConfig, RealtimeConfig};
pub use loader::load;
