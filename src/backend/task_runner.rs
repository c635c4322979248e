use std::sync::mpsc::Sender;

use tokio::runtime::Handle;

use crate::usecases::{
    contracts::{Job, TaskRunner},
    events::AppEvent,
};

const TASK_RESULT_DROPPED: &str = "TASK_RESULT_DROPPED";

/// Runs backend calls on the runtime's blocking pool and posts the
/// resulting `SessionEvent` to the UI loop.
#[derive(Debug, Clone)]
pub struct RuntimeTaskRunner {
    runtime: Handle,
    events: Sender<AppEvent>,
}

impl RuntimeTaskRunner {
    pub fn new(runtime: Handle, events: Sender<AppEvent>) -> Self {
        Self { runtime, events }
    }
}

impl TaskRunner for RuntimeTaskRunner {
    fn spawn(&self, label: &'static str, job: Job) {
        let events = self.events.clone();
        self.runtime.spawn_blocking(move || {
            tracing::debug!(task = label, "background task started");
            let event = job();
            if events.send(AppEvent::Session(event)).is_err() {
                tracing::debug!(
                    code = TASK_RESULT_DROPPED,
                    task = label,
                    "event loop closed before the task finished"
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::mpsc, time::Duration};

    use super::*;
    use crate::{
        domain::events::ConnectivityStatus,
        usecases::events::SessionEvent,
    };

    #[test]
    fn job_result_is_posted_as_app_event() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .build()
            .expect("runtime should build");
        let (events_tx, events_rx) = mpsc::channel();
        let runner = RuntimeTaskRunner::new(runtime.handle().clone(), events_tx);

        runner.spawn(
            "status",
            Box::new(|| SessionEvent::ConnectivityChanged {
                link: 1,
                status: ConnectivityStatus::Connected,
            }),
        );

        let event = events_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("event should arrive");
        assert_eq!(
            event,
            AppEvent::Session(SessionEvent::ConnectivityChanged {
                link: 1,
                status: ConnectivityStatus::Connected,
            })
        );
    }
}
