use anyhow::Result;
use thiserror::Error;

use crate::domain::{
    message::{MessageId, OutgoingMessage},
    session_state::SessionState,
    shell_state::ShellState,
    user::UserId,
};

use super::{
    create_conversation::ConversationCreator, events::AppEvent, events::SessionEvent,
    list_conversations::ConversationsSource, load_messages::MessagesSource,
    mark_seen::SeenMarker, search_users::UserDirectory,
};

pub trait AppEventSource {
    fn next_event(&mut self) -> Result<Option<AppEvent>>;
}

pub trait ShellOrchestrator {
    fn viewer_id(&self) -> UserId;
    fn shell(&self) -> &ShellState;
    /// Shell state plus the session state the view renders from.
    fn view_mut(&mut self) -> (&ShellState, &mut SessionState);
    fn handle_event(&mut self, event: AppEvent) -> Result<()>;
}

/// Classification of a failed REST call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("request was not authorized")]
    Unauthorized,
    #[error("backend is temporarily unavailable")]
    Unavailable,
    #[error("backend returned data that violates the contract")]
    InvalidData,
    #[error("requested resource was not found")]
    NotFound,
}

impl SourceError {
    pub fn code(self) -> &'static str {
        match self {
            Self::Unauthorized => "API_UNAUTHORIZED",
            Self::Unavailable => "API_UNAVAILABLE",
            Self::InvalidData => "API_INVALID_DATA",
            Self::NotFound => "API_NOT_FOUND",
        }
    }
}

/// Every REST capability the chat session needs.
pub trait ChatApi:
    ConversationsSource
    + MessagesSource
    + ConversationCreator
    + SeenMarker
    + UserDirectory
    + Send
    + Sync
    + 'static
{
}

impl<T> ChatApi for T where
    T: ConversationsSource
        + MessagesSource
        + ConversationCreator
        + SeenMarker
        + UserDirectory
        + Send
        + Sync
        + 'static
{
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("realtime channel is not connected")]
    NotConnected,
    #[error("realtime channel is closed")]
    Closed,
    #[error("realtime channel could not start: {0}")]
    Start(String),
}

/// Identifies one `subscribe` call. Status events name the link they came
/// from, so a replaced link cannot overwrite the status of its successor.
pub type LinkId = u64;

/// The push side of the backend: one subscription, one publish destination.
pub trait RealtimeChannel {
    /// Starts delivering pushes for `user_id`. Status changes and pushes are
    /// reported asynchronously as `SessionEvent`s.
    fn subscribe(&mut self, user_id: UserId) -> Result<LinkId, ChannelError>;
    /// Queues `message` for delivery. A frame that is accepted here but lost
    /// on the wire is reported later as `SessionEvent::PublishFailed(pending_id)`.
    fn publish(&self, pending_id: MessageId, message: &OutgoingMessage) -> Result<(), ChannelError>;
    /// Releases the subscription. Safe to call when not subscribed.
    fn unsubscribe(&mut self);
}

pub type Job = Box<dyn FnOnce() -> SessionEvent + Send + 'static>;

/// Runs blocking backend calls off the UI thread and delivers their result
/// back as a `SessionEvent`.
pub trait TaskRunner {
    fn spawn(&self, label: &'static str, job: Job);
}
