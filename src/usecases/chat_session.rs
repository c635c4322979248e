//! One logged-in user's live view of their conversations.
//!
//! Every operation either changes state synchronously or hands a blocking
//! backend call to the [`TaskRunner`]. Results come back as [`SessionEvent`]s
//! and are applied one at a time by [`ChatSession::handle_event`], so the
//! only interleaving point is between two events.

use std::sync::Arc;

use thiserror::Error;

use crate::domain::{
    conversation::{Conversation, ConversationId},
    events::{ConnectivityStatus, PushedMessage},
    message::{Message, MessageId, MessagePage},
    notice::{now_unix_ms, Notice},
    open_conversation_state::PageTicket,
    session_state::SessionState,
    user::{CurrentUser, UserId},
};

use super::{
    contracts::{ChannelError, ChatApi, LinkId, RealtimeChannel, SourceError, TaskRunner},
    create_conversation::{self, CreateConversationCommand, CreateConversationError},
    events::{PageKind, SessionEvent},
    list_conversations::{self, ListConversationsQuery},
    load_messages::{self, normalize_page_size, LoadMessagesQuery},
    mark_seen::SeenMarker,
    search_users::{self, normalize_query},
    send_message::{self, SendMessageCommand, SendMessageError},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("you cannot start a conversation with yourself")]
    SelfConversation,
    #[error("no conversation is open")]
    NoOpenConversation,
    #[error("conversation {0} is not in your list")]
    UnknownConversation(ConversationId),
    #[error(transparent)]
    Send(#[from] SendMessageError),
    #[error("could not subscribe to live updates: {0}")]
    Channel(#[from] ChannelError),
}

impl SessionError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::SelfConversation => "CHAT_SELF_CONVERSATION",
            Self::NoOpenConversation => "CHAT_NOT_OPEN",
            Self::UnknownConversation(_) => "CHAT_UNKNOWN_CONVERSATION",
            Self::Send(SendMessageError::EmptyMessage) => "CHAT_EMPTY_MESSAGE",
            Self::Send(SendMessageError::NotConnected) => "CHAT_SEND_OFFLINE",
            Self::Send(_) => "CHAT_SEND_FAILED",
            Self::Channel(_) => "REALTIME_SUBSCRIBE_FAILED",
        }
    }
}

pub struct ChatSession<A, C, R>
where
    A: ChatApi,
    C: RealtimeChannel,
    R: TaskRunner,
{
    viewer: CurrentUser,
    api: Arc<A>,
    channel: C,
    runner: R,
    page_size: usize,
    state: SessionState,
    current: Option<Conversation>,
    subscribed_user: Option<UserId>,
    link: Option<LinkId>,
    connected_once: bool,
    seen_confirmed: Option<PageTicket>,
    next_pending_id: u64,
    notices: Vec<Notice>,
}

impl<A, C, R> ChatSession<A, C, R>
where
    A: ChatApi,
    C: RealtimeChannel,
    R: TaskRunner,
{
    pub fn new(viewer: CurrentUser, api: Arc<A>, channel: C, runner: R, page_size: usize) -> Self {
        Self {
            viewer,
            api,
            channel,
            runner,
            page_size: normalize_page_size(page_size),
            state: SessionState::default(),
            current: None,
            subscribed_user: None,
            link: None,
            connected_once: false,
            seen_confirmed: None,
            next_pending_id: 0,
            notices: Vec::new(),
        }
    }

    pub fn viewer(&self) -> &CurrentUser {
        &self.viewer
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Selection and scroll live in the state too; the shell moves them.
    pub fn state_mut(&mut self) -> &mut SessionState {
        &mut self.state
    }

    pub fn current_conversation(&self) -> Option<&Conversation> {
        self.current.as_ref()
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Subscribes to pushes for `user_id`. A repeated call for the same user
    /// is a no-op; a different user replaces the old subscription.
    pub fn connect(&mut self, user_id: UserId) -> Result<(), SessionError> {
        if self.subscribed_user == Some(user_id) {
            return Ok(());
        }

        if let Some(previous) = self.subscribed_user.take() {
            tracing::info!(
                code = "REALTIME_RESUBSCRIBE",
                previous_user_id = previous,
                user_id,
                "replacing realtime subscription"
            );
            self.channel.unsubscribe();
            self.link = None;
        }

        self.state.connectivity = ConnectivityStatus::Connecting;
        let link = match self.channel.subscribe(user_id) {
            Ok(link) => link,
            Err(error) => {
                self.state.connectivity = ConnectivityStatus::Disconnected;
                tracing::warn!(code = "REALTIME_SUBSCRIBE_FAILED", error = %error);
                return Err(error.into());
            }
        };

        self.subscribed_user = Some(user_id);
        self.link = Some(link);
        self.connected_once = false;
        Ok(())
    }

    pub fn list_conversations(&mut self) {
        let api = Arc::clone(&self.api);
        let query = ListConversationsQuery {
            user_id: self.viewer.id,
        };

        self.runner.spawn(
            "list_conversations",
            Box::new(move || {
                let result = list_conversations::list_conversations(&*api, query)
                    .map(|output| output.conversations);
                SessionEvent::ConversationsLoaded(result)
            }),
        );
    }

    /// Opens a conversation from the loaded list.
    pub fn open_conversation(&mut self, conversation_id: ConversationId) -> Result<(), SessionError> {
        let conversation = self
            .state
            .conversations
            .get(conversation_id)
            .cloned()
            .ok_or(SessionError::UnknownConversation(conversation_id))?;

        self.open(conversation);
        Ok(())
    }

    pub fn load_older_messages(&mut self) -> bool {
        let Some(ticket) = self.state.open.ticket() else {
            return false;
        };
        let Some(page) = self.state.open.begin_older(self.page_size) else {
            return false;
        };

        self.spawn_page_load(ticket, PageKind::Older, page);
        true
    }

    /// Shows `text` immediately as pending and publishes it.
    ///
    /// The pending entry is replaced by the stored message on the next refresh
    /// of the window. It is removed again if publishing fails, whether that is
    /// known right away or reported later by the channel.
    pub fn send_message(&mut self, text: &str) -> Result<MessageId, SessionError> {
        let conversation = self.current.as_ref().ok_or(SessionError::NoOpenConversation)?;
        let outgoing = send_message::prepare_outgoing(SendMessageCommand {
            conversation,
            sender_id: self.viewer.id,
            text,
        })?;

        if self.state.connectivity != ConnectivityStatus::Connected {
            return Err(SendMessageError::NotConnected.into());
        }

        self.next_pending_id += 1;
        let pending_id = MessageId::Pending(self.next_pending_id);
        self.state.open.insert_pending(Message {
            id: pending_id,
            conversation_id: outgoing.conversation_id,
            sender_id: outgoing.sender_id,
            receiver_id: outgoing.receiver_id,
            content: outgoing.content.clone(),
            created_at_ms: i64::try_from(now_unix_ms()).unwrap_or(i64::MAX),
            seen: false,
        });

        if let Err(error) = send_message::publish_outgoing(&self.channel, pending_id, &outgoing) {
            self.state.open.remove_pending(pending_id);
            tracing::warn!(
                code = "CHAT_SEND_FAILED",
                conversation_id = outgoing.conversation_id,
                error = %error,
                "message was not published"
            );
            return Err(error.into());
        }

        tracing::debug!(
            code = "CHAT_SEND_PENDING",
            conversation_id = outgoing.conversation_id,
            "message published, awaiting confirmation"
        );
        Ok(pending_id)
    }

    /// Fire-and-forget; only a failure is reported, as a notice.
    pub fn mark_seen(&mut self, conversation_id: ConversationId) {
        let api = Arc::clone(&self.api);
        let user_id = self.viewer.id;

        self.runner.spawn(
            "mark_seen",
            Box::new(move || SessionEvent::SeenMarked {
                conversation_id,
                result: api.mark_seen(conversation_id, user_id),
            }),
        );
    }

    /// Starts a user search. Only the latest query's results are kept.
    pub fn search_users(&mut self, query: &str) {
        let Some(normalized) = normalize_query(query) else {
            self.state.search_query.clear();
            self.state.search_results.clear();
            return;
        };

        let query = normalized.to_owned();
        self.state.search_query = query.clone();

        let api = Arc::clone(&self.api);
        let viewer_id = self.viewer.id;
        self.runner.spawn(
            "search_users",
            Box::new(move || {
                let result = search_users::search_users(&*api, &query, viewer_id);
                SessionEvent::UsersFound { query, result }
            }),
        );
    }

    /// Opens the conversation with `other_user_id`, creating it if needed.
    pub fn create_conversation(&mut self, other_user_id: UserId) -> Result<(), SessionError> {
        let command = CreateConversationCommand {
            viewer_id: self.viewer.id,
            other_user_id,
        };
        if create_conversation::validate(command).is_err() {
            return Err(SessionError::SelfConversation);
        }

        if let Some(existing) = self
            .state
            .conversations
            .find_between(self.viewer.id, other_user_id)
            .cloned()
        {
            self.open(existing);
            return Ok(());
        }

        let api = Arc::clone(&self.api);
        self.runner.spawn(
            "create_conversation",
            Box::new(move || {
                let result = create_conversation::create_conversation(&*api, command)
                    .map_err(|error| match error {
                        CreateConversationError::Source(source) => source,
                        _ => SourceError::InvalidData,
                    });
                SessionEvent::ConversationCreated(result)
            }),
        );
        Ok(())
    }

    /// Releases the subscription and closes the open conversation.
    pub fn teardown(&mut self) {
        if self.subscribed_user.take().is_some() {
            self.channel.unsubscribe();
        }
        self.link = None;
        self.state.connectivity = ConnectivityStatus::Disconnected;
        self.state.open.clear();
        self.current = None;
        self.seen_confirmed = None;
        tracing::info!(code = "CHAT_SESSION_CLOSED", "chat session torn down");
    }

    pub fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::ConnectivityChanged { link, status } => self.on_connectivity(link, status),
            SessionEvent::MessagePushed(push) => self.on_push(push),
            SessionEvent::PublishFailed(pending_id) => self.on_publish_failed(pending_id),
            SessionEvent::ConversationsLoaded(result) => self.on_conversations(result),
            SessionEvent::MessagesLoaded {
                ticket,
                kind,
                result,
            } => self.on_messages(ticket, kind, result),
            SessionEvent::SeenMarked {
                conversation_id,
                result,
            } => self.on_seen(conversation_id, result),
            SessionEvent::UsersFound { query, result } => {
                if query != self.state.search_query {
                    tracing::debug!(code = "USER_SEARCH_STALE", "dropping outdated search results");
                    return;
                }
                match result {
                    Ok(users) => self.state.search_results = users,
                    Err(error) => self.notify_failure("USER_SEARCH_FAILED", "User search failed", error),
                }
            }
            SessionEvent::ConversationCreated(result) => match result {
                Ok(conversation) => {
                    tracing::info!(
                        code = "CHAT_CONVERSATION_CREATED",
                        conversation_id = conversation.id
                    );
                    self.list_conversations();
                    self.open(conversation);
                }
                Err(error) => self.notify_failure(
                    "CHAT_CREATE_FAILED",
                    "Could not start the conversation",
                    error,
                ),
            },
        }
    }

    fn open(&mut self, conversation: Conversation) {
        let title = conversation.partner_name(self.viewer.id);
        let ticket = self.state.open.begin(conversation.id, title);
        self.state.conversations.select(conversation.id);
        self.current = Some(conversation);
        self.seen_confirmed = None;

        self.spawn_page_load(ticket, PageKind::First, 0);
        self.mark_seen(ticket.conversation_id);
    }

    fn spawn_page_load(&self, ticket: PageTicket, kind: PageKind, page: usize) {
        let api = Arc::clone(&self.api);
        let query = LoadMessagesQuery {
            conversation_id: ticket.conversation_id,
            page,
            size: self.page_size,
        };
        let label = match kind {
            PageKind::First => "load_first_page",
            PageKind::Older => "load_older_page",
            PageKind::Refresh => "refresh_page",
        };

        self.runner.spawn(
            label,
            Box::new(move || SessionEvent::MessagesLoaded {
                ticket,
                kind,
                result: load_messages::load_messages(&*api, query),
            }),
        );
    }

    fn on_connectivity(&mut self, link: LinkId, status: ConnectivityStatus) {
        if self.link != Some(link) {
            tracing::debug!(
                code = "REALTIME_STATUS_STALE",
                link,
                "dropping status of a replaced link"
            );
            return;
        }

        let previous = self.state.connectivity;
        self.state.connectivity = status;
        if previous == status {
            return;
        }

        tracing::info!(
            code = "REALTIME_STATUS",
            status = status.as_label(),
            "connectivity changed"
        );

        match status {
            ConnectivityStatus::Connected => {
                // Pushes sent while offline were lost; catch up once.
                if self.connected_once {
                    self.refresh_after_push(None);
                }
                self.connected_once = true;
            }
            ConnectivityStatus::Disconnected => self.notices.push(Notice::warning(
                "REALTIME_DISCONNECTED",
                "Live updates are unavailable, still retrying",
            )),
            ConnectivityStatus::Connecting => {}
        }
    }

    fn on_publish_failed(&mut self, pending_id: MessageId) {
        if !self.state.open.remove_pending(pending_id) {
            return;
        }

        tracing::warn!(code = "CHAT_SEND_LOST", "queued message was not delivered");
        self.notices.push(Notice::error(
            "CHAT_SEND_LOST",
            "Message was not delivered, connection lost",
        ));
    }

    fn on_push(&mut self, push: PushedMessage) {
        if self.subscribed_user.is_none() {
            return;
        }
        self.refresh_after_push(push.conversation_id);
    }

    fn refresh_after_push(&mut self, target: Option<ConversationId>) {
        self.list_conversations();

        let Some(ticket) = self.state.open.ticket() else {
            return;
        };
        if target.map_or(true, |conversation_id| conversation_id == ticket.conversation_id) {
            self.spawn_page_load(ticket, PageKind::Refresh, 0);
        }
    }

    fn on_conversations(&mut self, result: Result<Vec<Conversation>, SourceError>) {
        match result {
            Ok(conversations) => {
                if let Some(current) = self.current.as_mut() {
                    if let Some(fresh) = conversations.iter().find(|c| c.id == current.id) {
                        *current = fresh.clone();
                        let title = fresh.partner_name(self.viewer.id);
                        self.state.open.set_title(title);
                    }
                }
                self.state.conversations.set_ready(conversations);
            }
            Err(error) => {
                self.state.conversations.set_error();
                self.notify_failure(
                    "CHAT_LIST_UNAVAILABLE",
                    "Could not load conversations, try again",
                    error,
                );
            }
        }
    }

    fn on_messages(
        &mut self,
        ticket: PageTicket,
        kind: PageKind,
        result: Result<MessagePage, SourceError>,
    ) {
        if !self.state.open.accepts(ticket) {
            tracing::debug!(
                code = "CHAT_PAGE_STALE",
                conversation_id = ticket.conversation_id,
                "dropping page for a window that is no longer open"
            );
            return;
        }

        match (kind, result) {
            (PageKind::First, Ok(page)) => {
                self.state.open.apply_first_page(page);
                if self.seen_confirmed == Some(ticket) {
                    self.state.open.mark_seen_for(self.viewer.id);
                }
            }
            (PageKind::First, Err(error)) => {
                self.state.open.set_error();
                self.notify_failure("CHAT_HISTORY_UNAVAILABLE", "Could not load messages", error);
            }
            (PageKind::Older, Ok(page)) => {
                let added = self.state.open.apply_older_page(page);
                tracing::debug!(code = "CHAT_OLDER_PAGE", added, "prepended older messages");
            }
            (PageKind::Older, Err(error)) => {
                self.state.open.older_failed();
                self.notify_failure(
                    "CHAT_HISTORY_UNAVAILABLE",
                    "Could not load older messages",
                    error,
                );
            }
            (PageKind::Refresh, Ok(page)) => self.state.open.apply_refresh(page),
            (PageKind::Refresh, Err(error)) => {
                self.notify_failure("CHAT_REFRESH_FAILED", "Could not refresh messages", error)
            }
        }
    }

    fn on_seen(&mut self, conversation_id: ConversationId, result: Result<(), SourceError>) {
        match result {
            Ok(()) => {
                let Some(ticket) = self.state.open.ticket() else {
                    return;
                };
                if ticket.conversation_id == conversation_id {
                    self.state.open.mark_seen_for(self.viewer.id);
                    self.seen_confirmed = Some(ticket);
                }
            }
            Err(error) => self.notify_failure(
                "CHAT_SEEN_FAILED",
                "Could not mark the conversation as read",
                error,
            ),
        }
    }

    fn notify_failure(&mut self, code: &'static str, text: &str, error: SourceError) {
        tracing::warn!(code, source_code = error.code(), error = %error, "{text}");
        self.notices.push(Notice::error(code, format!("{text}: {error}")));
    }
}
