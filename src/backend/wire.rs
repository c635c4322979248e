//! JSON shapes exchanged with the marketplace backend.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{
    conversation::{Conversation, ConversationId},
    events::PushedMessage,
    message::{Message, MessageId, MessagePage},
    user::{UserId, UserSummary},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationDto {
    pub id: ConversationId,
    pub user_a_id: UserId,
    pub user_b_id: UserId,
    #[serde(default)]
    pub user_a_name: Option<String>,
    #[serde(default)]
    pub user_b_name: Option<String>,
    #[serde(default, alias = "lastMessageContent")]
    pub last_message: Option<String>,
    #[serde(default, alias = "lastMessageAt", alias = "updatedAt")]
    pub last_message_time: Option<Value>,
}

impl From<ConversationDto> for Conversation {
    fn from(dto: ConversationDto) -> Self {
        Self {
            id: dto.id,
            user_a_id: dto.user_a_id,
            user_b_id: dto.user_b_id,
            user_a_name: dto.user_a_name.filter(|name| !name.trim().is_empty()),
            user_b_name: dto.user_b_name.filter(|name| !name.trim().is_empty()),
            last_message_preview: dto.last_message,
            last_message_unix_ms: dto.last_message_time.as_ref().and_then(parse_timestamp),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub id: i64,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    #[serde(default, alias = "sentAt", alias = "timestamp")]
    pub created_at: Option<Value>,
    #[serde(default, alias = "isSeen")]
    pub seen: bool,
}

impl From<MessageDto> for Message {
    fn from(dto: MessageDto) -> Self {
        let created_at_ms = dto.created_at.as_ref().and_then(parse_timestamp).unwrap_or_else(|| {
            tracing::warn!(
                code = "WIRE_TIMESTAMP_UNPARSEABLE",
                message_id = dto.id,
                "message timestamp missing or unparseable; ordering by id"
            );
            0
        });

        Self {
            id: MessageId::Confirmed(dto.id),
            conversation_id: dto.conversation_id,
            sender_id: dto.sender_id,
            receiver_id: dto.receiver_id,
            content: dto.content,
            created_at_ms,
            seen: dto.seen,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePageDto {
    #[serde(default, alias = "content")]
    pub data: Vec<MessageDto>,
    #[serde(default)]
    pub total_elements: usize,
}

impl From<MessagePageDto> for MessagePage {
    fn from(dto: MessagePageDto) -> Self {
        Self {
            messages: dto.data.into_iter().map(Message::from).collect(),
            total_elements: dto.total_elements,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: UserId,
    #[serde(default, alias = "name")]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl From<UserDto> for UserSummary {
    fn from(dto: UserDto) -> Self {
        Self {
            id: dto.id,
            full_name: dto.full_name.unwrap_or_default(),
            email: dto.email,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationRequest {
    pub user_a_id: UserId,
    pub user_b_id: UserId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeenRequest {
    pub conversation_id: ConversationId,
    pub user_id: UserId,
}

/// Attributes a pushed MESSAGE body to a conversation when possible.
///
/// Any body is accepted; an unreadable one still triggers a refresh.
pub fn parse_push(body: &str) -> PushedMessage {
    let conversation_id = serde_json::from_str::<Value>(body).ok().and_then(|value| {
        value
            .get("conversationId")
            .and_then(value_as_i64)
            .or_else(|| value.pointer("/conversation/id").and_then(value_as_i64))
    });

    PushedMessage { conversation_id }
}

fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Accepts RFC 3339, naive ISO local date-time, epoch milliseconds, or a
/// `[y, m, d, h, min, s, nanos]` array.
///
/// Values without an offset are read in the local time zone, the same clock
/// pending messages are stamped with.
pub fn parse_timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => parse_timestamp_text(text.trim()),
        Value::Array(parts) => parse_timestamp_parts(parts),
        _ => None,
    }
}

fn parse_timestamp_text(text: &str) -> Option<i64> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.timestamp_millis());
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Some(local_millis(parsed));
        }
    }

    text.parse().ok()
}

fn parse_timestamp_parts(parts: &[Value]) -> Option<i64> {
    let part = |index: usize| parts.get(index).and_then(Value::as_u64).unwrap_or(0);
    let year = i32::try_from(parts.first()?.as_i64()?).ok()?;
    let month = u32::try_from(part(1)).ok()?;
    let day = u32::try_from(part(2)).ok()?;

    let datetime = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_nano_opt(
        u32::try_from(part(3)).ok()?,
        u32::try_from(part(4)).ok()?,
        u32::try_from(part(5)).ok()?,
        u32::try_from(part(6)).ok()?,
    )?;

    Some(local_millis(datetime))
}

/// A wall-clock time skipped by a DST change has no local reading; it falls
/// back to UTC.
fn local_millis(naive: NaiveDateTime) -> i64 {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map_or_else(|| naive.and_utc().timestamp_millis(), |local| local.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn message_page_maps_to_domain() {
        let raw = r#"{
            "data": [{"id": 5, "conversationId": 2, "senderId": 1, "receiverId": 3,
                      "content": "hi", "createdAt": "2024-03-01T10:00:00Z", "seen": true}],
            "totalElements": 41
        }"#;

        let page: MessagePage = serde_json::from_str::<MessagePageDto>(raw)
            .expect("page should parse")
            .into();

        assert_eq!(page.total_elements, 41);
        assert_eq!(page.messages[0].id, MessageId::Confirmed(5));
        assert_eq!(page.messages[0].created_at_ms, 1_709_287_200_000);
        assert!(page.messages[0].seen);
    }

    #[test]
    fn timestamps_accept_all_backend_shapes() {
        let expected = Some(1_709_287_200_000);

        assert_eq!(parse_timestamp(&json!("2024-03-01T10:00:00Z")), expected);
        assert_eq!(parse_timestamp(&json!("2024-03-01T12:00:00+02:00")), expected);
        assert_eq!(parse_timestamp(&json!(1_709_287_200_000_i64)), expected);
        assert_eq!(parse_timestamp(&json!("yesterday")), None);
    }

    #[test]
    fn naive_timestamps_are_read_in_local_time() {
        let naive = NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|date| date.and_hms_opt(10, 0, 0))
            .expect("valid date-time");
        let expected = Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|local| local.timestamp_millis());

        assert_eq!(parse_timestamp(&json!("2024-03-01T10:00:00.000")), expected);
        assert_eq!(parse_timestamp(&json!("2024-03-01 10:00:00")), expected);
        assert_eq!(parse_timestamp(&json!([2024, 3, 1, 10, 0])), expected);
    }

    #[test]
    fn conversation_blank_names_become_none() {
        let raw = r#"{"id": 1, "userAId": 1, "userBId": 2, "userAName": " ", "userBName": "Bob"}"#;

        let conversation: Conversation = serde_json::from_str::<ConversationDto>(raw)
            .expect("conversation should parse")
            .into();

        assert_eq!(conversation.user_a_name, None);
        assert_eq!(conversation.user_b_name.as_deref(), Some("Bob"));
    }

    #[test]
    fn push_is_attributed_when_possible() {
        assert_eq!(
            parse_push(r#"{"conversationId": "12", "content": "hi"}"#).conversation_id,
            Some(12)
        );
        assert_eq!(
            parse_push(r#"{"conversation": {"id": 4}}"#).conversation_id,
            Some(4)
        );
        assert_eq!(parse_push("not json").conversation_id, None);
    }

    #[test]
    fn requests_serialize_camel_case() {
        let body = serde_json::to_value(CreateConversationRequest {
            user_a_id: 1,
            user_b_id: 2,
        })
        .expect("request should serialize");

        assert_eq!(body, json!({"userAId": 1, "userBId": 2}));
    }
}
