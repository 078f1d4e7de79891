use serde::{Deserialize, Serialize};

use crate::models::{self, NewPaste, PasteRecord};

/// Form fields accepted when creating a paste.
#[derive(Debug, Deserialize)]
pub struct CreatePaste {
    pub content: Option<String>,
    pub title: Option<String>,
    pub syntax: Option<String>,
    pub expires: Option<String>,
    pub visibility: Option<String>,
}

impl CreatePaste {
    /// `None` if there is no content to store. Blank fields count as missing.
    pub fn into_new_paste(self) -> Option<NewPaste> {
        let content = non_empty(self.content)?;
        Some(NewPaste {
            content,
            title: or_default(self.title, models::DEFAULT_TITLE),
            syntax: or_default(self.syntax, models::DEFAULT_SYNTAX),
            expires: or_default(self.expires, crate::expiry::NEVER),
            visibility: or_default(self.visibility, models::DEFAULT_VISIBILITY),
        })
    }
}

fn non_empty(field: Option<String>) -> Option<String> {
    field.filter(|value| !value.is_empty())
}

fn or_default(field: Option<String>, default: &str) -> String {
    non_empty(field).unwrap_or_else(|| default.to_owned())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedPaste {
    pub url: String,
}

/// An entry in the top and recent listings.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PasteSummary {
    pub id: String,
    pub title: String,
}

impl From<PasteRecord> for PasteSummary {
    fn from(paste: PasteRecord) -> Self {
        PasteSummary {
            id: paste.id,
            title: paste.title,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(content: Option<&str>) -> CreatePaste {
        CreatePaste {
            content: content.map(str::to_owned),
            title: None,
            syntax: None,
            expires: None,
            visibility: None,
        }
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let new = form(Some("body")).into_new_paste().unwrap();
        assert_eq!(new.content, "body");
        assert_eq!(new.title, "Untitled Paste");
        assert_eq!(new.syntax, "none");
        assert_eq!(new.expires, "never");
        assert_eq!(new.visibility, "public");
    }

    #[test]
    fn blank_fields_get_defaults() {
        let new = CreatePaste {
            content: Some("body".to_owned()),
            title: Some(String::new()),
            syntax: Some(String::new()),
            expires: Some(String::new()),
            visibility: Some(String::new()),
        }
        .into_new_paste()
        .unwrap();

        assert_eq!(new.title, "Untitled Paste");
        assert_eq!(new.syntax, "none");
        assert_eq!(new.expires, "never");
        assert_eq!(new.visibility, "public");
    }

    #[test]
    fn content_is_required() {
        assert!(form(None).into_new_paste().is_none());
        assert!(form(Some("")).into_new_paste().is_none());
    }
}
