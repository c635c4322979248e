use crate::domain::{
    conversation::{Conversation, ConversationId},
    events::{ConnectivityStatus, KeyInput, PushedMessage},
    message::{MessageId, MessagePage},
    open_conversation_state::PageTicket,
    user::UserSummary,
};

use super::contracts::{LinkId, SourceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// Newest page right after opening.
    First,
    /// Next page backwards in time.
    Older,
    /// Newest page re-fetched after a push.
    Refresh,
}

/// Results and notifications applied to a `ChatSession` one at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    ConnectivityChanged {
        link: LinkId,
        status: ConnectivityStatus,
    },
    MessagePushed(PushedMessage),
    /// A queued message never reached the broker.
    PublishFailed(MessageId),
    ConversationsLoaded(Result<Vec<Conversation>, SourceError>),
    MessagesLoaded {
        ticket: PageTicket,
        kind: PageKind,
        result: Result<MessagePage, SourceError>,
    },
    SeenMarked {
        conversation_id: ConversationId,
        result: Result<(), SourceError>,
    },
    UsersFound {
        query: String,
        result: Result<Vec<UserSummary>, SourceError>,
    },
    ConversationCreated(Result<Conversation, SourceError>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Tick,
    QuitRequested,
    InputKey(KeyInput),
    Session(SessionEvent),
}
