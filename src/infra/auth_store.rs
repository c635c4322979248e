//! Local credential store: `auth.json` written by `roomchat login`.

use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::{
    domain::user::{display_name_or_fallback, CurrentUser, UserId},
    infra::error::AppError,
};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredAuth {
    access_token: String,
    #[serde(default)]
    user: Option<StoredUser>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredUser {
    #[serde(default)]
    id: Option<UserId>,
    #[serde(default)]
    full_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AuthStore {
    path: PathBuf,
}

impl AuthStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `None` when nobody is logged in.
    pub fn load(&self) -> Result<Option<CurrentUser>, AppError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(source) if source.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(AppError::AuthStoreIo {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let stored: StoredAuth =
            serde_json::from_str(&raw).map_err(|source| AppError::AuthStoreParse {
                path: self.path.clone(),
                source,
            })?;

        let user = stored.user.unwrap_or_default();
        let id = match user.id {
            Some(id) => id,
            None => user_id_from_token(&stored.access_token)?,
        };

        Ok(Some(CurrentUser {
            id,
            display_name: display_name_or_fallback(user.full_name.as_deref().unwrap_or(""), id),
            access_token: stored.access_token,
        }))
    }

    pub fn save(&self, user: &CurrentUser) -> Result<(), AppError> {
        let stored = StoredAuth {
            access_token: user.access_token.clone(),
            user: Some(StoredUser {
                id: Some(user.id),
                full_name: Some(user.display_name.clone()),
            }),
        };
        let encoded = serde_json::to_vec_pretty(&stored).map_err(|source| AppError::AuthStoreParse {
            path: self.path.clone(),
            source,
        })?;

        let io_error = |source| AppError::AuthStoreIo {
            path: self.path.clone(),
            source,
        };
        let mut file = open_private(&self.path).map_err(io_error)?;
        file.write_all(&encoded).map_err(io_error)?;
        file.sync_all().map_err(io_error)
    }

    /// Removes the stored credentials. Returns whether anything was removed.
    pub fn clear(&self) -> Result<bool, AppError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(source) if source.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(AppError::AuthStoreIo {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

/// Reads the user id from the `sub` (or `userId`) claim of a JWT.
///
/// The signature is not checked; the backend does that on every request.
pub fn user_id_from_token(token: &str) -> Result<UserId, AppError> {
    let invalid = |details: &str| AppError::InvalidToken {
        details: details.to_owned(),
    };

    let payload = token
        .trim()
        .split('.')
        .nth(1)
        .ok_or_else(|| invalid("expected three dot-separated segments"))?;
    let decoded = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|_| invalid("payload is not base64url"))?;
    let claims: serde_json::Value =
        serde_json::from_slice(&decoded).map_err(|_| invalid("payload is not JSON"))?;

    ["sub", "userId"]
        .iter()
        .filter_map(|claim| claims.get(claim))
        .find_map(claim_as_id)
        .ok_or_else(|| invalid("no numeric sub or userId claim"))
}

fn claim_as_id(value: &serde_json::Value) -> Option<UserId> {
    match value {
        serde_json::Value::Number(number) => number.as_i64(),
        serde_json::Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}
