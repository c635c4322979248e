use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tokio::runtime::Handle;

use crate::{
    backend::wire::{
        ConversationDto, CreateConversationRequest, MessagePageDto, SeenRequest, UserDto,
    },
    domain::{
        conversation::{Conversation, ConversationId},
        message::MessagePage,
        user::{UserId, UserSummary},
    },
    infra::{config::BackendConfig, error::AppError, secrets::redact_text},
    usecases::{
        contracts::SourceError, create_conversation::ConversationCreator,
        list_conversations::ConversationsSource, load_messages::MessagesSource,
        mark_seen::SeenMarker, search_users::UserDirectory,
    },
};

const ERROR_BODY_LOG_LIMIT: usize = 200;

/// Blocking facade over the async REST client.
///
/// Calls park the current thread on the shared runtime, so they must run
/// from a blocking task, never from inside the runtime's async workers.
#[derive(Clone)]
pub struct RestChatApi {
    client: Client,
    base_url: String,
    access_token: String,
    runtime: Handle,
}

impl std::fmt::Debug for RestChatApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestChatApi")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl RestChatApi {
    pub fn new(config: &BackendConfig, access_token: String, runtime: Handle) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .connect_timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(AppError::HttpClient)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            access_token,
            runtime,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, SourceError> {
        let request = self.client.get(self.url(path)).query(query);
        self.execute_json(path, request)
    }

    fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, SourceError> {
        let request = self.client.post(self.url(path)).json(body);
        self.execute_json(path, request)
    }

    fn execute_json<T: DeserializeOwned>(&self, path: &str, request: RequestBuilder) -> Result<T, SourceError> {
        let request = request.bearer_auth(&self.access_token);

        self.runtime.block_on(async {
            let response = request.send().await.map_err(|error| {
                tracing::warn!(
                    code = "API_TRANSPORT_FAILED",
                    path,
                    timeout = error.is_timeout(),
                    "request did not reach the backend"
                );
                SourceError::Unavailable
            })?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let error = classify_status(status);
                tracing::warn!(
                    code = error.code(),
                    path,
                    status = status.as_u16(),
                    body = %truncate(&redact_text(&body), ERROR_BODY_LOG_LIMIT),
                    "backend rejected request"
                );
                return Err(error);
            }

            let bytes = response.bytes().await.map_err(|_| SourceError::Unavailable)?;
            // Acknowledgement endpoints may answer with an empty body.
            let bytes: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };
            serde_json::from_slice(bytes).map_err(|error| {
                tracing::warn!(
                    code = "API_INVALID_DATA",
                    path,
                    error = %error,
                    "backend response did not match the expected shape"
                );
                SourceError::InvalidData
            })
        })
    }
}

fn classify_status(status: StatusCode) -> SourceError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SourceError::Unauthorized,
        StatusCode::NOT_FOUND => SourceError::NotFound,
        status if status.is_server_error() => SourceError::Unavailable,
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => SourceError::Unavailable,
        _ => SourceError::InvalidData,
    }
}

fn truncate(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

impl ConversationsSource for RestChatApi {
    fn list_conversations(&self, user_id: UserId) -> Result<Vec<Conversation>, SourceError> {
        let dtos: Vec<ConversationDto> =
            self.get("/conversations", &[("userId", user_id.to_string())])?;
        Ok(dtos.into_iter().map(Conversation::from).collect())
    }
}

impl MessagesSource for RestChatApi {
    fn list_messages(
        &self,
        conversation_id: ConversationId,
        page: usize,
        size: usize,
    ) -> Result<MessagePage, SourceError> {
        let dto: MessagePageDto = self.get(
            "/messages",
            &[
                ("conversationId", conversation_id.to_string()),
                ("page", page.to_string()),
                ("size", size.to_string()),
            ],
        )?;
        Ok(dto.into())
    }
}

impl ConversationCreator for RestChatApi {
    fn create_conversation(
        &self,
        user_a_id: UserId,
        user_b_id: UserId,
    ) -> Result<Conversation, SourceError> {
        let dto: ConversationDto = self.post(
            "/conversation",
            &CreateConversationRequest {
                user_a_id,
                user_b_id,
            },
        )?;
        Ok(dto.into())
    }
}

impl SeenMarker for RestChatApi {
    fn mark_seen(&self, conversation_id: ConversationId, user_id: UserId) -> Result<(), SourceError> {
        let _ack: serde_json::Value = self.post(
            "/seen",
            &SeenRequest {
                conversation_id,
                user_id,
            },
        )?;
        Ok(())
    }
}

impl UserDirectory for RestChatApi {
    fn search_users(&self, query: &str) -> Result<Vec<UserSummary>, SourceError> {
        let dtos: Vec<UserDto> = self.get("/users", &[("search", query.to_owned())])?;
        Ok(dtos.into_iter().map(UserSummary::from).collect())
    }
}
