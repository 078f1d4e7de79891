use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TITLE: &str = "Untitled Paste";
pub const DEFAULT_SYNTAX: &str = "none";
pub const DEFAULT_VISIBILITY: &str = "public";

/// A stored paste.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasteRecord {
    pub id: String,
    pub content: String,
    pub title: String,
    pub syntax: String,
    /// Accepted and stored, never enforced.
    pub visibility: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub views: i64,
}

impl PasteRecord {
    /// Whether the paste has not yet expired at `now`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at > now,
            None => true,
        }
    }

    /// Length of the content in characters, used to rank "top" pastes.
    pub fn size(&self) -> usize {
        self.content.chars().count()
    }
}

/// Everything needed to create a paste, before an id is assigned.
#[derive(Debug, Clone)]
pub struct NewPaste {
    pub content: String,
    pub title: String,
    pub syntax: String,
    pub expires: String,
    pub visibility: String,
}

impl NewPaste {
    pub fn new(content: impl Into<String>) -> Self {
        NewPaste {
            content: content.into(),
            title: DEFAULT_TITLE.to_owned(),
            syntax: DEFAULT_SYNTAX.to_owned(),
            expires: crate::expiry::NEVER.to_owned(),
            visibility: DEFAULT_VISIBILITY.to_owned(),
        }
    }

    pub fn expires(mut self, token: impl Into<String>) -> Self {
        self.expires = token.into();
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    pub(crate) fn record(id: &str, content: &str, created_at: DateTime<Utc>) -> PasteRecord {
        PasteRecord {
            id: id.to_owned(),
            content: content.to_owned(),
            title: format!("title of {id}"),
            syntax: "rust".to_owned(),
            visibility: "public".to_owned(),
            created_at,
            expires_at: None,
            views: 0,
        }
    }

    #[test]
    fn liveness_is_strict() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut paste = record("a", "x", now - Duration::hours(1));
        assert!(paste.is_live(now));

        paste.expires_at = Some(now + Duration::seconds(1));
        assert!(paste.is_live(now));

        paste.expires_at = Some(now);
        assert!(!paste.is_live(now));

        paste.expires_at = Some(now - Duration::seconds(1));
        assert!(!paste.is_live(now));
    }

    #[test]
    fn size_counts_characters() {
        let now = Utc::now();
        assert_eq!(record("a", "héllo", now).size(), 5);
    }

    #[test]
    fn serialized_shape() {
        let created_at = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let mut paste = record("abc", "body", created_at);

        let value = serde_json::to_value(&paste).unwrap();
        assert_eq!(value["createdAt"], "2024-05-06T07:08:09Z");
        assert!(value.get("expiresAt").is_none());
        assert_eq!(value["views"], 0);

        paste.expires_at = Some(created_at + Duration::days(1));
        let value = serde_json::to_value(&paste).unwrap();
        assert_eq!(value["expiresAt"], "2024-05-07T07:08:09Z");

        let parsed: PasteRecord = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, paste);
    }
}
