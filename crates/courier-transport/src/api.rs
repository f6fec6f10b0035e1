//! Bot API wire format.
//!
//! Every method answers with the same envelope:
//!
//! ```json
//! { "ok": true, "result": ... }
//! { "ok": false, "error_code": 400, "description": "Bad Request: chat not found" }
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use courier_core::{ChatId, MessageId, TransportError, TransportResult, Update};

/// Update types requested from `getUpdates`.
pub const ALLOWED_UPDATES: &[&str] = &["message", "callback_query"];

/// The response envelope of every Bot API method.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(default = "Option::default")]
    pub result: Option<T>,
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: Option<ResponseParameters>,
}

/// Extra information attached to some errors.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseParameters {
    /// Seconds to wait before retrying after a flood-control error.
    #[serde(default)]
    pub retry_after: Option<u64>,
}

impl<T> ApiResponse<T> {
    /// Unwraps the result or turns the error into a [`TransportError`].
    pub fn into_result(self) -> TransportResult<T> {
        if !self.ok {
            let mut description = self
                .description
                .unwrap_or_else(|| "unknown error".to_string());
            if let Some(retry_after) = self.parameters.and_then(|p| p.retry_after) {
                description.push_str(&format!(" (retry after {retry_after}s)"));
            }
            return Err(TransportError::Api {
                code: self.error_code.unwrap_or_default(),
                description,
            });
        }
        self.result
            .ok_or_else(|| TransportError::decode("response is ok but carries no result"))
    }
}

/// Decodes a response body into its result.
pub fn decode_response<T: DeserializeOwned>(body: &[u8]) -> TransportResult<T> {
    serde_json::from_slice::<ApiResponse<T>>(body)?.into_result()
}

/// Parameters of `getUpdates`.
#[derive(Debug, Clone, Serialize)]
pub struct GetUpdates {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    pub limit: u32,
    pub timeout: u64,
    pub allowed_updates: &'static [&'static str],
}

/// Parameters of `editMessageReplyMarkup` without a markup, which removes
/// the inline keyboard.
#[derive(Debug, Clone, Serialize)]
pub struct RemoveReplyMarkup {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// A decoded `getUpdates` result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateBatch {
    /// Supported updates, in delivery order.
    pub updates: Vec<Update>,
    /// Offset acknowledging every update of the batch, including skipped ones.
    pub next_offset: Option<i64>,
}

/// Decodes the raw updates of a `getUpdates` result.
///
/// Updates of kinds other than messages and callback queries are skipped,
/// but still count towards the next offset so they are not delivered again.
pub fn decode_updates(raw: Vec<Value>) -> TransportResult<UpdateBatch> {
    let mut batch = UpdateBatch::default();
    let mut last_id: Option<i64> = None;

    for value in raw {
        let update_id = value
            .get("update_id")
            .and_then(Value::as_i64)
            .ok_or_else(|| TransportError::decode("update without update_id"))?;
        last_id = Some(last_id.map_or(update_id, |last| last.max(update_id)));

        match serde_json::from_value::<Update>(value) {
            Ok(update) => batch.updates.push(update),
            Err(err) => debug!(update_id, error = %err, "Skipping unsupported update"),
        }
    }

    batch.next_offset = last_id.map(|last| last + 1);
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_error_envelope() {
        let body = br#"{"ok":false,"error_code":429,"description":"Too Many Requests","parameters":{"retry_after":3}}"#;
        let err = decode_response::<bool>(body).unwrap_err();
        match err {
            TransportError::Api { code, description } => {
                assert_eq!(code, 429);
                assert_eq!(description, "Too Many Requests (retry after 3s)");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_decode_ok_envelope() {
        let result: bool = decode_response(br#"{"ok":true,"result":true}"#).unwrap();
        assert!(result);

        let missing = decode_response::<bool>(br#"{"ok":true}"#);
        assert!(matches!(missing, Err(TransportError::Decode(_))));

        let garbage = decode_response::<bool>(b"<html>");
        assert!(matches!(garbage, Err(TransportError::Decode(_))));
    }

    #[test]
    fn test_decode_updates_skips_unsupported_kinds() {
        let raw = vec![
            json!({
                "update_id": 10,
                "message": {
                    "message_id": 1,
                    "date": 1700000000,
                    "chat": { "id": 42, "type": "private" },
                    "from": { "id": 7, "is_bot": false, "first_name": "Ada" },
                    "text": "/start",
                    "entities": [{ "type": "bot_command", "offset": 0, "length": 6 }]
                }
            }),
            json!({
                "update_id": 11,
                "edited_message": { "message_id": 1, "chat": { "id": 42 }, "text": "/stop" }
            }),
            json!({
                "update_id": 12,
                "callback_query": {
                    "id": "abc",
                    "from": { "id": 7, "first_name": "Ada" },
                    "message": { "message_id": 2, "chat": { "id": 42 } },
                    "data": "vote:yes"
                }
            }),
        ];

        let batch = decode_updates(raw).unwrap();
        assert_eq!(batch.next_offset, Some(13));
        assert_eq!(batch.updates.len(), 2);
        assert_eq!(batch.updates[0].update_id, 10);
        assert_eq!(batch.updates[0].sender_id(), Some(7));
        assert_eq!(
            batch.updates[1].as_callback().and_then(|c| c.data.as_deref()),
            Some("vote:yes")
        );
    }

    #[test]
    fn test_decode_updates_only_unsupported_still_advances() {
        let raw = vec![json!({ "update_id": 5, "channel_post": { "message_id": 1, "chat": { "id": -1 } } })];
        let batch = decode_updates(raw).unwrap();
        assert!(batch.updates.is_empty());
        assert_eq!(batch.next_offset, Some(6));
    }

    #[test]
    fn test_decode_updates_empty() {
        assert_eq!(decode_updates(Vec::new()).unwrap(), UpdateBatch::default());
    }

    #[test]
    fn test_get_updates_omits_missing_offset() {
        let request = GetUpdates {
            offset: None,
            limit: 100,
            timeout: 30,
            allowed_updates: ALLOWED_UPDATES,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("offset").is_none());
        assert_eq!(value["allowed_updates"], json!(["message", "callback_query"]));
    }
}
