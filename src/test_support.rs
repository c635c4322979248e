use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
};

use crate::{
    domain::{
        conversation::{Conversation, ConversationId},
        message::{Message, MessageId, MessagePage, OutgoingMessage},
        user::{UserId, UserSummary},
    },
    usecases::{
        contracts::{ChannelError, Job, LinkId, RealtimeChannel, SourceError, TaskRunner},
        create_conversation::ConversationCreator,
        events::SessionEvent,
        list_conversations::ConversationsSource,
        load_messages::MessagesSource,
        mark_seen::SeenMarker,
        search_users::UserDirectory,
    },
};

static ENV_LOCK: Mutex<()> = Mutex::new(());

pub fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().expect("env lock should not be poisoned")
}

pub fn conversation(id: ConversationId, user_a_id: UserId, user_b_id: UserId) -> Conversation {
    Conversation {
        id,
        user_a_id,
        user_b_id,
        user_a_name: Some(format!("user-{user_a_id}")),
        user_b_name: Some(format!("user-{user_b_id}")),
        last_message_preview: None,
        last_message_unix_ms: None,
    }
}

pub fn message(
    id: i64,
    conversation_id: ConversationId,
    sender_id: UserId,
    receiver_id: UserId,
    content: &str,
) -> Message {
    Message {
        id: MessageId::Confirmed(id),
        conversation_id,
        sender_id,
        receiver_id,
        content: content.to_owned(),
        created_at_ms: 1_700_000_000_000 + id * 1_000,
        seen: false,
    }
}

/// Queues spawned jobs so a test decides when, and in which order, they complete.
#[derive(Clone, Default)]
pub struct ManualTaskRunner {
    queue: Arc<Mutex<VecDeque<(&'static str, Job)>>>,
}

impl ManualTaskRunner {
    pub fn pending_labels(&self) -> Vec<&'static str> {
        self.queue
            .lock()
            .expect("runner queue lock")
            .iter()
            .map(|(label, _)| *label)
            .collect()
    }

    pub fn run_next(&self) -> Option<SessionEvent> {
        let next = self.queue.lock().expect("runner queue lock").pop_front();
        next.map(|(_, job)| job())
    }

    /// Removes every queued job without running it, in spawn order.
    pub fn take_all(&self) -> Vec<(&'static str, Job)> {
        self.queue.lock().expect("runner queue lock").drain(..).collect()
    }
}

impl TaskRunner for ManualTaskRunner {
    fn spawn(&self, label: &'static str, job: Job) {
        self.queue
            .lock()
            .expect("runner queue lock")
            .push_back((label, job));
    }
}

#[derive(Default)]
struct FakeChatApiState {
    conversations: Vec<Conversation>,
    messages: HashMap<ConversationId, Vec<Message>>,
    users: Vec<UserSummary>,
    next_conversation_id: ConversationId,
    list_failure: Option<SourceError>,
    messages_failure: Option<SourceError>,
    seen_failure: Option<SourceError>,
    calls: Vec<String>,
}

/// In-memory backend that pages the way the REST API does: newest first.
#[derive(Clone, Default)]
pub struct FakeChatApi {
    state: Arc<Mutex<FakeChatApiState>>,
}

impl FakeChatApi {
    fn lock(&self) -> MutexGuard<'_, FakeChatApiState> {
        self.state.lock().expect("fake api lock")
    }

    pub fn add_conversation(&self, conversation: Conversation) {
        let mut state = self.lock();
        state.next_conversation_id = state.next_conversation_id.max(conversation.id);
        state.conversations.push(conversation);
    }

    pub fn add_message(&self, message: Message) {
        self.lock()
            .messages
            .entry(message.conversation_id)
            .or_default()
            .push(message);
    }

    pub fn add_user(&self, user: UserSummary) {
        self.lock().users.push(user);
    }

    pub fn fail_list(&self, failure: Option<SourceError>) {
        self.lock().list_failure = failure;
    }

    pub fn fail_messages(&self, failure: Option<SourceError>) {
        self.lock().messages_failure = failure;
    }

    pub fn fail_seen(&self, failure: Option<SourceError>) {
        self.lock().seen_failure = failure;
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, prefix: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    pub fn conversation_count(&self) -> usize {
        self.lock().conversations.len()
    }
}

impl ConversationsSource for FakeChatApi {
    fn list_conversations(&self, user_id: UserId) -> Result<Vec<Conversation>, SourceError> {
        let mut state = self.lock();
        state.calls.push(format!("list_conversations:{user_id}"));
        if let Some(failure) = state.list_failure {
            return Err(failure);
        }

        Ok(state
            .conversations
            .iter()
            .filter(|conversation| conversation.involves(user_id))
            .cloned()
            .collect())
    }
}

impl MessagesSource for FakeChatApi {
    fn list_messages(
        &self,
        conversation_id: ConversationId,
        page: usize,
        size: usize,
    ) -> Result<MessagePage, SourceError> {
        let mut state = self.lock();
        state
            .calls
            .push(format!("list_messages:{conversation_id}:{page}:{size}"));
        if let Some(failure) = state.messages_failure {
            return Err(failure);
        }

        let mut newest_first = state
            .messages
            .get(&conversation_id)
            .cloned()
            .unwrap_or_default();
        newest_first.sort_by_key(|message| std::cmp::Reverse(message.sort_key()));

        let total_elements = newest_first.len();
        let messages = newest_first
            .into_iter()
            .skip(page * size)
            .take(size)
            .collect();

        Ok(MessagePage {
            messages,
            total_elements,
        })
    }
}

impl ConversationCreator for FakeChatApi {
    fn create_conversation(
        &self,
        user_a_id: UserId,
        user_b_id: UserId,
    ) -> Result<Conversation, SourceError> {
        let mut state = self.lock();
        state
            .calls
            .push(format!("create_conversation:{user_a_id}:{user_b_id}"));

        if let Some(existing) = state
            .conversations
            .iter()
            .find(|conversation| conversation.is_between(user_a_id, user_b_id))
        {
            return Ok(existing.clone());
        }

        state.next_conversation_id += 1;
        let created = conversation(state.next_conversation_id, user_a_id, user_b_id);
        state.conversations.push(created.clone());
        Ok(created)
    }
}

impl SeenMarker for FakeChatApi {
    fn mark_seen(&self, conversation_id: ConversationId, user_id: UserId) -> Result<(), SourceError> {
        let mut state = self.lock();
        state
            .calls
            .push(format!("mark_seen:{conversation_id}:{user_id}"));
        if let Some(failure) = state.seen_failure {
            return Err(failure);
        }

        if let Some(messages) = state.messages.get_mut(&conversation_id) {
            for message in messages.iter_mut().filter(|m| m.receiver_id == user_id) {
                message.mark_seen();
            }
        }
        Ok(())
    }
}

impl UserDirectory for FakeChatApi {
    fn search_users(&self, query: &str) -> Result<Vec<UserSummary>, SourceError> {
        let mut state = self.lock();
        state.calls.push(format!("search_users:{query}"));
        let needle = query.to_lowercase();

        Ok(state
            .users
            .iter()
            .filter(|user| user.full_name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct FakeChannelState {
    subscriptions: Vec<UserId>,
    active: usize,
    unsubscribes: usize,
    published: Vec<OutgoingMessage>,
    publish_failure: Option<ChannelError>,
}

/// Records subscriptions and publishes; clones share the same log.
#[derive(Clone, Default)]
pub struct FakeChannel {
    state: Arc<Mutex<FakeChannelState>>,
}

impl FakeChannel {
    fn lock(&self) -> MutexGuard<'_, FakeChannelState> {
        self.state.lock().expect("fake channel lock")
    }

    /// Id handed out by the latest `subscribe`.
    pub fn current_link(&self) -> LinkId {
        self.lock().subscriptions.len() as LinkId
    }

    pub fn subscriptions(&self) -> Vec<UserId> {
        self.lock().subscriptions.clone()
    }

    pub fn active_subscriptions(&self) -> usize {
        self.lock().active
    }

    pub fn unsubscribe_count(&self) -> usize {
        self.lock().unsubscribes
    }

    pub fn published(&self) -> Vec<OutgoingMessage> {
        self.lock().published.clone()
    }

    pub fn fail_publish(&self, failure: Option<ChannelError>) {
        self.lock().publish_failure = failure;
    }
}

impl RealtimeChannel for FakeChannel {
    fn subscribe(&mut self, user_id: UserId) -> Result<LinkId, ChannelError> {
        let mut state = self.lock();
        state.subscriptions.push(user_id);
        state.active += 1;
        Ok(state.subscriptions.len() as LinkId)
    }

    fn publish(&self, _pending_id: MessageId, message: &OutgoingMessage) -> Result<(), ChannelError> {
        let mut state = self.lock();
        if let Some(failure) = state.publish_failure.clone() {
            return Err(failure);
        }
        state.published.push(message.clone());
        Ok(())
    }

    fn unsubscribe(&mut self) {
        let mut state = self.lock();
        if state.active > 0 {
            state.active -= 1;
            state.unsubscribes += 1;
        }
    }
}
