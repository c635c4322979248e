use std::{
    fs::{File, OpenOptions},
    path::PathBuf,
};

use fs2::FileExt;

use crate::{
    domain::user::CurrentUser,
    infra::{auth_store::AuthStore, error::AppError, storage_layout::StorageLayout},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupFlowState {
    LaunchTui(CurrentUser),
    LoginRequired,
}

/// Exclusive advisory lock on `session.lock`; released on drop.
#[derive(Debug)]
pub struct SessionLockGuard {
    file: File,
    path: PathBuf,
}

impl Drop for SessionLockGuard {
    fn drop(&mut self) {
        if let Err(error) = FileExt::unlock(&self.file) {
            tracing::warn!(
                code = "SESSION_LOCK_RELEASE_FAILED",
                path = %self.path.display(),
                error = %error,
                "failed to release session lock"
            );
        }
    }
}

pub struct StartupPlan {
    pub lock_guard: SessionLockGuard,
    pub state: StartupFlowState,
}

pub fn plan_startup(layout: &StorageLayout) -> Result<StartupPlan, AppError> {
    layout.ensure_dirs()?;
    let lock_guard = acquire_session_lock(layout.session_lock_file())?;

    let state = match AuthStore::new(layout.auth_file()).load()? {
        Some(user) => StartupFlowState::LaunchTui(user),
        None => StartupFlowState::LoginRequired,
    };

    Ok(StartupPlan { lock_guard, state })
}

pub fn acquire_session_lock(path: PathBuf) -> Result<SessionLockGuard, AppError> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&path)
        .map_err(|source| AppError::SessionLockCreate {
            path: path.clone(),
            source,
        })?;

    match file.try_lock_exclusive() {
        Ok(()) => Ok(SessionLockGuard { file, path }),
        Err(source) if source.kind() == fs2::lock_contended_error().kind() => {
            Err(AppError::SessionStoreBusy { path })
        }
        Err(source) => Err(AppError::SessionLockCreate { path, source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> (tempfile::TempDir, StorageLayout) {
        let temp_dir = tempfile::tempdir().expect("temp dir should be created");
        let layout = StorageLayout::under(temp_dir.path().join("roomchat"));
        (temp_dir, layout)
    }

    #[test]
    fn requires_login_without_auth_file() {
        let (_temp_dir, layout) = layout();

        let plan = plan_startup(&layout).expect("startup plan should be built");

        assert_eq!(plan.state, StartupFlowState::LoginRequired);
    }

    #[test]
    fn launches_tui_for_stored_user() {
        let (_temp_dir, layout) = layout();
        layout.ensure_dirs().expect("dirs should be created");
        let user = CurrentUser {
            id: 3,
            display_name: "Renter".to_owned(),
            access_token: "t".to_owned(),
        };
        AuthStore::new(layout.auth_file())
            .save(&user)
            .expect("save should succeed");

        let plan = plan_startup(&layout).expect("startup plan should be built");

        assert_eq!(plan.state, StartupFlowState::LaunchTui(user));
    }

    #[test]
    fn second_instance_is_refused_until_first_releases() {
        let (_temp_dir, layout) = layout();
        let first = plan_startup(&layout).expect("first instance should start");

        let err = plan_startup(&layout).err().expect("second instance must fail");
        assert!(matches!(err, AppError::SessionStoreBusy { .. }));

        drop(first);
        assert!(plan_startup(&layout).is_ok());
    }
}
