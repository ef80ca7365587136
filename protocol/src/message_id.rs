use std::fmt::Display;

use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

/// Identity of a notification on the bus.
///
/// Publishers choose their own ids (they are opaque strings on the wire); ids minted locally use a
/// UUID v7 so they sort by arrival time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for MessageId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn generated_ids_are_unique() {
        let a = MessageId::new();
        let b = MessageId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = MessageId::from("abc-1");
        assert_eq!(serde_json::to_string(&id).expect("serialize"), "\"abc-1\"");
        let parsed: MessageId = serde_json::from_str("\"abc-1\"").expect("deserialize");
        assert_eq!(parsed, id);
    }
}
