use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::MessageId;

/// A single message published on the notification bus.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Notification {
    #[serde(default)]
    pub id: MessageId,
    /// Channel the message was published to (xtickertape calls this the "group").
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub user: String,
    pub text: String,
    /// Lifetime before the message has fully faded out.
    ///
    /// `None` defers to the client's configured default; `Some(0)` keeps the message until it is
    /// explicitly deleted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Optional attachment, usually a URL the user can open from the ticker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
    /// Id of the message this one replies to; used to suppress killed threads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<MessageId>,
}

impl Notification {
    pub fn new(group: impl Into<String>, user: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            group: group.into(),
            user: user.into(),
            text: text.into(),
            timeout_ms: None,
            attachment: None,
            in_reply_to: None,
        }
    }

    /// Resolves the message lifetime against the client default.
    ///
    /// A zero duration means "never expire".
    pub fn timeout_or(&self, default: Duration) -> Duration {
        self.timeout_ms.map_or(default, Duration::from_millis)
    }

    /// Text shown in the ticker strip: `group:user:text`, skipping empty segments.
    pub fn display_text(&self) -> String {
        let mut out = String::new();
        for segment in [self.group.as_str(), self.user.as_str()] {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            out.push_str(segment);
            out.push(':');
        }
        out.push_str(self.text.trim());
        out
    }

    pub fn has_attachment(&self) -> bool {
        self.attachment
            .as_deref()
            .is_some_and(|attachment| !attachment.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn display_text_joins_non_empty_segments() {
        let msg = Notification::new("chat", "alice", "hello");
        assert_eq!(msg.display_text(), "chat:alice:hello");

        let msg = Notification::new("", "alice", " hi ");
        assert_eq!(msg.display_text(), "alice:hi");

        let msg = Notification::new("", "", "bare");
        assert_eq!(msg.display_text(), "bare");
    }

    #[test]
    fn timeout_defaults_when_unset_and_zero_is_permanent() {
        let mut msg = Notification::new("g", "u", "t");
        assert_eq!(
            msg.timeout_or(Duration::from_secs(60)),
            Duration::from_secs(60)
        );

        msg.timeout_ms = Some(0);
        assert_eq!(msg.timeout_or(Duration::from_secs(60)), Duration::ZERO);
    }

    #[test]
    fn blank_attachment_does_not_count() {
        let mut msg = Notification::new("g", "u", "t");
        assert!(!msg.has_attachment());
        msg.attachment = Some("  ".to_string());
        assert!(!msg.has_attachment());
        msg.attachment = Some("https://example.com".to_string());
        assert!(msg.has_attachment());
    }
}
