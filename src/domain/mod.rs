//! Domain layer: core entities and business rules.

pub mod conversation;
pub mod conversation_list_state;
pub mod events;
pub mod message;
pub mod message_input_state;
pub mod notice;
pub mod open_conversation_state;
pub mod session_state;
pub mod shell_state;
pub mod user;

