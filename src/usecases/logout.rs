use crate::infra::{auth_store::AuthStore, error::AppError, storage_layout::StorageLayout};

use super::startup::acquire_session_lock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutOutcome {
    pub credentials_removed: bool,
}

/// Forgets the stored credentials. Refused while a client is running.
pub fn logout(layout: &StorageLayout) -> Result<LogoutOutcome, AppError> {
    layout.ensure_dirs()?;
    let _lock = acquire_session_lock(layout.session_lock_file())?;

    let credentials_removed = AuthStore::new(layout.auth_file()).clear()?;
    tracing::info!(code = "AUTH_LOGGED_OUT", credentials_removed, "logout completed");

    Ok(LogoutOutcome {
        credentials_removed,
    })
}
