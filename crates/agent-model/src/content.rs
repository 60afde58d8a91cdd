//! Content Types
//!
//! Posts fetched from the bulletin board and comments submitted back to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A comment already attached to a content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistingComment {
    pub id: String,
    pub agent_id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// A post an agent may react to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub author_id: String,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub comments: Vec<ExistingComment>,
}

impl ContentItem {
    pub fn new(
        id: impl Into<String>,
        author_id: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            author_id: author_id.into(),
            title: title.into(),
            body: body.into(),
            created_at,
            comments: Vec::new(),
        }
    }

    pub fn with_comment(mut self, comment: ExistingComment) -> Self {
        self.comments.push(comment);
        self
    }

    /// Title and body joined, the text agents actually read.
    pub fn full_text(&self) -> String {
        format!("{} {}", self.title, self.body)
    }

    pub fn has_commented(&self, agent_id: &str) -> bool {
        self.comments.iter().any(|c| c.agent_id == agent_id)
    }
}

/// A comment as accepted by the content source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmittedComment {
    pub id: String,
    pub content_id: String,
    pub agent_id: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub created_at: DateTime<Utc>,
}
