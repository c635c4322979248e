use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;

use crate::{
    infra::{self, config, error::AppError, storage_layout::StorageLayout},
    usecases::context::AppContext,
};

/// Loads config, prepares the storage tree and starts file logging.
///
/// Keep the returned guard alive for the whole run; dropping it flushes logs.
pub fn bootstrap(config_path: Option<&Path>) -> Result<(AppContext, WorkerGuard), AppError> {
    let layout = StorageLayout::resolve()?;
    let context = build_context(config_path, layout)?;
    context.layout.ensure_dirs()?;
    let guard = infra::logging::init(&context.config.logging, &context.layout.log_dir)?;

    tracing::info!(
        code = "APP_BOOTSTRAPPED",
        config_dir = %context.layout.config_dir.display(),
        base_url = %context.config.backend.base_url,
        "configuration loaded"
    );
    Ok((context, guard))
}

fn build_context(config_path: Option<&Path>, layout: StorageLayout) -> Result<AppContext, AppError> {
    let config = config::load(config_path)?;
    Ok(AppContext::new(config, layout))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn builds_context_with_default_config_when_file_is_missing() {
        let context = build_context(
            Some(Path::new("./missing-config.toml")),
            StorageLayout::under(PathBuf::from("/tmp/roomchat-test")),
        )
        .expect("context should build from defaults");

        assert_eq!(context.config, crate::infra::config::AppConfig::default());
    }

    #[test]
    fn surfaces_parse_errors_from_config_file() {
        let temp_dir = tempfile::tempdir().expect("temp dir should be created");
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[backend\n").expect("must write config");

        let err = build_context(Some(&path), StorageLayout::under(temp_dir.path().to_path_buf()))
            .expect_err("context must fail");

        assert!(matches!(err, AppError::ConfigParse { .. }));
    }
}
