//! Use case layer: application workflows and orchestration.

pub mod bootstrap;
pub mod chat_session;
pub mod context;
pub mod contracts;
pub mod create_conversation;
pub mod events;
pub mod list_conversations;
pub mod load_messages;
pub mod login;
pub mod logout;
pub mod mark_seen;
pub mod search_users;
pub mod send_message;
pub mod shell;
pub mod startup;
