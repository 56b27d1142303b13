use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CommandError;

/// Inbound request envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    pub seq: i64,
    pub command: String,
    #[serde(default)]
    pub arguments: Value,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// A frame that could not be decoded into a [`Request`].
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRequest {
    pub seq: Option<i64>,
    pub command: Option<String>,
    pub reason: String,
}

/// Decodes a request body, keeping whatever envelope fields survive when it fails.
pub fn decode_request(body: &[u8]) -> Result<Request, RejectedRequest> {
    let value: Value = serde_json::from_slice(body).map_err(|e| RejectedRequest {
        seq: None,
        command: None,
        reason: format!("invalid JSON: {}", e),
    })?;

    serde_json::from_value::<Request>(value.clone()).map_err(|e| RejectedRequest {
        seq: value.get("seq").and_then(Value::as_i64),
        command: value.get("command").and_then(Value::as_str).map(str::to_owned),
        reason: format!("invalid request envelope: {}", e),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub request_seq: i64,
    pub command: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub event: &'static str,
    pub body: Value,
}

/// Outbound message before it has been assigned a sequence number.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Outbound {
    Response(Response),
    Event(Event),
}

impl Outbound {
    /// Builds the response for `command`; failures carry a message instead of a body.
    pub fn response(request_seq: i64, command: &str, result: Result<Value, CommandError>) -> Self {
        let response = match result {
            Ok(body) => Response {
                request_seq,
                command: command.to_owned(),
                success: true,
                message: None,
                body: Some(body),
            },
            Err(e) => Response {
                request_seq,
                command: command.to_owned(),
                success: false,
                message: Some(e.response_message(command)),
                body: None,
            },
        };
        Outbound::Response(response)
    }

    pub fn event(event: &'static str, body: Value) -> Self {
        Outbound::Event(Event { event, body })
    }
}

/// Wire form of an outbound message: `seq` followed by the tagged message fields.
#[derive(Debug, Serialize)]
pub(crate) struct Envelope<'a> {
    pub seq: u64,
    #[serde(flatten)]
    pub message: &'a Outbound,
}

/// Process-wide outbound message counter.
///
/// Only reachable through the output lock, so sequence order and write order agree.
#[derive(Debug)]
pub(crate) struct Sequencer {
    next: u64,
}

impl Default for Sequencer {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl Sequencer {
    pub fn peek(&self) -> u64 {
        self.next
    }

    pub fn advance(&mut self) -> u64 {
        let seq = self.next;
        self.next += 1;
        seq
    }
}
