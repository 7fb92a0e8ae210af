//! The parsed form of one webhook delivery.
//!
//! An [`Event`] carries the event kind from the `X-GitHub-Event` header, the
//! optional action from the payload, the delivery id, and the payload itself
//! as untyped JSON. Nothing about the payload shape is checked here: a handler
//! that needs a field asks for it and fails if it is absent, so a malformed
//! `check_run` only affects the handlers that read `check_run`.

use serde_json::Value;

use crate::types::DeliveryId;

/// One inbound webhook delivery. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    kind: String,
    action: Option<String>,
    delivery_id: DeliveryId,
    payload: Value,
}

impl Event {
    /// Builds an event, taking the action from the payload's top-level
    /// `"action"` string if there is one.
    pub fn new(kind: impl Into<String>, delivery_id: impl Into<DeliveryId>, payload: Value) -> Self {
        let action = payload
            .get("action")
            .and_then(Value::as_str)
            .map(str::to_string);
        Event {
            kind: kind.into(),
            action,
            delivery_id: delivery_id.into(),
            payload,
        }
    }

    /// Builds an event with an explicit action, ignoring the payload's.
    pub fn with_action(
        kind: impl Into<String>,
        action: Option<&str>,
        delivery_id: impl Into<DeliveryId>,
        payload: Value,
    ) -> Self {
        Event {
            kind: kind.into(),
            action: action.map(str::to_string),
            delivery_id: delivery_id.into(),
            payload,
        }
    }

    /// Parses a raw delivery body. An empty body is treated as `{}`.
    pub fn from_body(
        kind: impl Into<String>,
        delivery_id: impl Into<DeliveryId>,
        body: &[u8],
    ) -> Result<Self, serde_json::Error> {
        let payload = if body.iter().all(u8::is_ascii_whitespace) {
            Value::Object(Default::default())
        } else {
            serde_json::from_slice(body)?
        };
        Ok(Self::new(kind, delivery_id, payload))
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    pub fn delivery_id(&self) -> &DeliveryId {
        &self.delivery_id
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Looks up a value by JSON pointer (e.g. `/check_run/conclusion`).
    pub fn get(&self, pointer: &str) -> Option<&Value> {
        self.payload.pointer(pointer)
    }

    pub fn get_str(&self, pointer: &str) -> Option<&str> {
        self.get(pointer).and_then(Value::as_str)
    }

    pub fn get_u64(&self, pointer: &str) -> Option<u64> {
        self.get(pointer).and_then(Value::as_u64)
    }
}
