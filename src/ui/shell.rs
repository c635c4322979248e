use anyhow::Result;

use crate::usecases::{
    context::AppContext,
    contracts::{AppEventSource, ShellOrchestrator},
};

use super::{terminal::TerminalSession, view};

pub fn start(
    context: &AppContext,
    event_source: &mut dyn AppEventSource,
    orchestrator: &mut dyn ShellOrchestrator,
) -> Result<()> {
    tracing::info!(
        code = "TUI_STARTED",
        log_level = %context.config.logging.level,
        base_url = %context.config.backend.base_url,
        "starting TUI shell"
    );

    let mut terminal = TerminalSession::new()?;
    run_loop(event_source, orchestrator, |orchestrator| {
        let viewer = orchestrator.viewer_id();
        let (shell, session) = orchestrator.view_mut();
        terminal.draw(|frame| view::render(frame, viewer, shell, session))
    })?;

    tracing::info!(code = "TUI_STOPPED", "TUI shell stopped");
    Ok(())
}

/// Draws, then handles one event, until the orchestrator stops running.
fn run_loop<D>(
    event_source: &mut dyn AppEventSource,
    orchestrator: &mut dyn ShellOrchestrator,
    mut draw: D,
) -> Result<()>
where
    D: FnMut(&mut dyn ShellOrchestrator) -> Result<()>,
{
    while orchestrator.shell().is_running() {
        draw(orchestrator)?;

        if let Some(event) = event_source.next_event()? {
            orchestrator.handle_event(event)?;
        }
    }

    Ok(())
}
