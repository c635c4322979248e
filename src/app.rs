use std::{sync::mpsc, sync::Arc, time::Duration};

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;

use crate::{
    backend::{
        realtime::{RealtimeSettings, StompChannel},
        rest::RestChatApi,
        task_runner::RuntimeTaskRunner,
    },
    cli::{Cli, Command},
    domain::user::CurrentUser,
    infra::{auth_store::AuthStore, error::AppError, storage_layout::StorageLayout},
    ui,
    usecases::{
        bootstrap,
        chat_session::ChatSession,
        context::AppContext,
        login::{run_login, LoginOutcome, StdTerminal, DEFAULT_ATTEMPTS},
        logout::logout,
        shell::DefaultShellOrchestrator,
        startup::{acquire_session_lock, plan_startup, StartupFlowState},
    },
};

const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

pub fn run(cli: Cli) -> Result<()> {
    match cli.command_or_default() {
        Command::Run => {
            let (context, _log_guard) = bootstrap::bootstrap(cli.config.as_deref())?;
            let startup = plan_startup(&context.layout)?;

            let user = match startup.state {
                StartupFlowState::LaunchTui(user) => user,
                StartupFlowState::LoginRequired => {
                    tracing::info!(code = "AUTH_LOGIN_REQUIRED", "no stored credentials");
                    let store = AuthStore::new(context.layout.auth_file());
                    match run_login(&mut StdTerminal, &store, DEFAULT_ATTEMPTS)? {
                        LoginOutcome::LoggedIn(_) => store.load()?.ok_or(AppError::NotLoggedIn)?,
                        LoginOutcome::Cancelled => return Ok(()),
                    }
                }
            };

            launch_tui(&context, user)?;
            drop(startup.lock_guard);
        }
        Command::Login => {
            let (context, _log_guard) = bootstrap::bootstrap(cli.config.as_deref())?;
            let _lock = acquire_session_lock(context.layout.session_lock_file())?;
            let store = AuthStore::new(context.layout.auth_file());
            run_login(&mut StdTerminal, &store, DEFAULT_ATTEMPTS)?;
        }
        Command::Logout => {
            let (layout, _log_guard) = logout_layout(cli.config.as_deref())?;
            let outcome = logout(&layout)?;
            if outcome.credentials_removed {
                println!("Logged out. Stored credentials were removed.");
            } else {
                println!("Nothing to do: no stored credentials.");
            }
        }
        Command::Whoami => {
            let layout = StorageLayout::resolve()?;
            let user = AuthStore::new(layout.auth_file())
                .load()?
                .ok_or(AppError::NotLoggedIn)?;
            println!("{} (#{})", user.display_name, user.id);
        }
    }

    Ok(())
}

/// Logout must work even when the config file is broken.
fn logout_layout(
    config_path: Option<&std::path::Path>,
) -> Result<(StorageLayout, Option<WorkerGuard>), AppError> {
    match bootstrap::bootstrap(config_path) {
        Ok((context, log_guard)) => Ok((context.layout, Some(log_guard))),
        Err(error) => {
            eprintln!("warning: {error}; continuing with local cleanup");
            Ok((StorageLayout::resolve()?, None))
        }
    }
}

fn launch_tui(context: &AppContext, user: CurrentUser) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("roomchat-io")
        .build()
        .map_err(AppError::RuntimeInit)?;
    let handle = runtime.handle().clone();
    let (events_tx, events_rx) = mpsc::channel();

    let config = &context.config;
    let api = RestChatApi::new(&config.backend, user.access_token.clone(), handle.clone())?;
    let channel = StompChannel::new(
        handle.clone(),
        RealtimeSettings::from_config(&config.backend, &config.realtime),
        user.access_token.clone(),
        events_tx.clone(),
    );
    let runner = RuntimeTaskRunner::new(handle, events_tx);

    let session = ChatSession::new(user, Arc::new(api), channel, runner, config.chat.page_size);
    let mut orchestrator = DefaultShellOrchestrator::new(session);
    orchestrator.start()?;

    let mut event_source = ui::CrosstermEventSource::new(events_rx);
    let result = ui::shell::start(context, &mut event_source, &mut orchestrator);

    drop(orchestrator);
    // Blocking REST calls still in flight are abandoned.
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);
    result
}
