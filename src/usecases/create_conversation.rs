use thiserror::Error;

use crate::domain::{conversation::Conversation, user::UserId};

use super::contracts::SourceError;

pub trait ConversationCreator {
    /// Returns the conversation between the two users, creating it if needed.
    fn create_conversation(
        &self,
        user_a_id: UserId,
        user_b_id: UserId,
    ) -> Result<Conversation, SourceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateConversationCommand {
    pub viewer_id: UserId,
    pub other_user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CreateConversationError {
    #[error("you cannot start a conversation with yourself")]
    SelfConversation,
    #[error("backend returned a conversation for a different pair of users")]
    UnexpectedParticipants,
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Rejects a self-chat before any network traffic.
pub fn validate(command: CreateConversationCommand) -> Result<(), CreateConversationError> {
    if command.viewer_id == command.other_user_id {
        return Err(CreateConversationError::SelfConversation);
    }
    Ok(())
}

pub fn create_conversation(
    creator: &dyn ConversationCreator,
    command: CreateConversationCommand,
) -> Result<Conversation, CreateConversationError> {
    validate(command)?;

    let conversation = creator.create_conversation(command.viewer_id, command.other_user_id)?;
    if !conversation.is_between(command.viewer_id, command.other_user_id) {
        return Err(CreateConversationError::UnexpectedParticipants);
    }

    Ok(conversation)
}
