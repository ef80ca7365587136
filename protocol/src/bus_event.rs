//! Events read from the notification bus, one JSON object per line.
//!
//! ```text
//! {"type":"notify","id":"m1","group":"chat","user":"alice","text":"hello"}
//! {"type":"retract","id":"m1"}
//! {"type":"kill","id":"m1"}
//! ```
//!
//! Lines that are not JSON objects are accepted as plain-text notifications so that any program
//! printing lines can feed the ticker.

use serde::Deserialize;
use serde::Serialize;
use strum_macros::Display;

use crate::MessageId;
use crate::Notification;

/// Group assigned to plain-text lines.
pub const PLAIN_TEXT_GROUP: &str = "stdin";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Display)]
#[serde(tag = "type", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BusEvent {
    /// A new message (or a replacement for a live message with the same id).
    Notify(Notification),
    /// Remove a message from the ticker.
    Retract { id: MessageId },
    /// Remove a message and suppress any later message in its thread.
    Kill { id: MessageId },
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("invalid bus event: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl BusEvent {
    /// Parses one line of bus output.
    ///
    /// Returns `Ok(None)` for blank lines.
    pub fn parse_line(line: &str) -> Result<Option<Self>, ParseError> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        if !trimmed.starts_with('{') {
            return Ok(Some(BusEvent::Notify(Notification::new(
                PLAIN_TEXT_GROUP,
                "",
                trimmed,
            ))));
        }
        Ok(Some(serde_json::from_str(trimmed)?))
    }

    /// Id of the message the event refers to.
    pub fn message_id(&self) -> &MessageId {
        match self {
            BusEvent::Notify(notification) => &notification.id,
            BusEvent::Retract { id } | BusEvent::Kill { id } => id,
        }
    }
}
