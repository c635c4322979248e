//! Validation and publishing of outgoing messages.
//!
//! The optimistic insert and its rollback live in the chat session; this
//! module only decides whether a message may be sent and to whom.

use thiserror::Error;

use crate::domain::{
    conversation::Conversation,
    message::{MessageId, OutgoingMessage},
    user::UserId,
};

use super::contracts::{ChannelError, RealtimeChannel};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageCommand<'a> {
    pub conversation: &'a Conversation,
    pub sender_id: UserId,
    pub text: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendMessageError {
    /// Message text is empty after trimming whitespace.
    #[error("message is empty")]
    EmptyMessage,
    #[error("you are not a participant of this conversation")]
    NotParticipant,
    #[error("not connected to the chat server")]
    NotConnected,
    #[error("message could not be delivered: {0}")]
    PublishFailed(ChannelError),
}

pub trait MessagePublisher {
    fn publish(&self, pending_id: MessageId, message: &OutgoingMessage) -> Result<(), ChannelError>;
}

impl<C: RealtimeChannel + ?Sized> MessagePublisher for C {
    fn publish(&self, pending_id: MessageId, message: &OutgoingMessage) -> Result<(), ChannelError> {
        RealtimeChannel::publish(self, pending_id, message)
    }
}

/// Builds the payload for `command`; the receiver is the other participant.
pub fn prepare_outgoing(command: SendMessageCommand<'_>) -> Result<OutgoingMessage, SendMessageError> {
    let content = command.text.trim();
    if content.is_empty() {
        return Err(SendMessageError::EmptyMessage);
    }

    let receiver_id = command
        .conversation
        .partner_id(command.sender_id)
        .ok_or(SendMessageError::NotParticipant)?;

    Ok(OutgoingMessage {
        conversation_id: command.conversation.id,
        sender_id: command.sender_id,
        receiver_id,
        content: content.to_owned(),
    })
}

pub fn publish_outgoing(
    publisher: &dyn MessagePublisher,
    pending_id: MessageId,
    message: &OutgoingMessage,
) -> Result<(), SendMessageError> {
    publisher.publish(pending_id, message).map_err(|error| match error {
        ChannelError::NotConnected => SendMessageError::NotConnected,
        other => SendMessageError::PublishFailed(other),
    })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    struct StubPublisher {
        result: Result<(), ChannelError>,
        captured: RefCell<Option<OutgoingMessage>>,
    }

    impl StubPublisher {
        fn with_result(result: Result<(), ChannelError>) -> Self {
            Self {
                result,
                captured: RefCell::new(None),
            }
        }
    }

    impl MessagePublisher for StubPublisher {
        fn publish(&self, _pending_id: MessageId, message: &OutgoingMessage) -> Result<(), ChannelError> {
            *self.captured.borrow_mut() = Some(message.clone());
            self.result.clone()
        }
    }

    fn conversation() -> Conversation {
        Conversation {
            id: 5,
            user_a_id: 1,
            user_b_id: 2,
            user_a_name: None,
            user_b_name: None,
            last_message_preview: None,
            last_message_unix_ms: None,
        }
    }

    #[test]
    fn rejects_whitespace_only_text() {
        let conversation = conversation();

        let result = prepare_outgoing(SendMessageCommand {
            conversation: &conversation,
            sender_id: 1,
            text: "   \n\t ",
        });

        assert_eq!(result, Err(SendMessageError::EmptyMessage));
    }

    #[test]
    fn receiver_is_the_other_participant() {
        let conversation = conversation();

        let outgoing = prepare_outgoing(SendMessageCommand {
            conversation: &conversation,
            sender_id: 2,
            text: "  is the room free?  ",
        })
        .expect("message should be prepared");

        assert_eq!(outgoing.receiver_id, 1);
        assert_eq!(outgoing.content, "is the room free?");
        assert_eq!(outgoing.conversation_id, 5);
    }

    #[test]
    fn rejects_sender_outside_conversation() {
        let conversation = conversation();

        let result = prepare_outgoing(SendMessageCommand {
            conversation: &conversation,
            sender_id: 3,
            text: "hi",
        });

        assert_eq!(result, Err(SendMessageError::NotParticipant));
    }

    #[test]
    fn publish_passes_payload_through() {
        let publisher = StubPublisher::with_result(Ok(()));
        let message = OutgoingMessage {
            conversation_id: 5,
            sender_id: 1,
            receiver_id: 2,
            content: "hi".to_owned(),
        };

        publish_outgoing(&publisher, MessageId::Pending(1), &message).expect("publish should succeed");

        assert_eq!(*publisher.captured.borrow(), Some(message));
    }

    #[test]
    fn maps_not_connected_error() {
        let publisher = StubPublisher::with_result(Err(ChannelError::NotConnected));
        let message = OutgoingMessage {
            conversation_id: 5,
            sender_id: 1,
            receiver_id: 2,
            content: "hi".to_owned(),
        };

        let result = publish_outgoing(&publisher, MessageId::Pending(1), &message);

        assert_eq!(result, Err(SendMessageError::NotConnected));
    }
}
