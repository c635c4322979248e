//! Infrastructure layer: adapters for config, storage, and OS integrations.

pub mod auth_store;
pub mod config;
pub mod error;
pub mod logging;
pub mod secrets;
pub mod storage_layout;
