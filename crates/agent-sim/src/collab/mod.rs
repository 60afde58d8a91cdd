//! External collaborators: where content comes from, where replies go, and
//! who writes the first draft of a reply.

pub mod drafter;
pub mod feed;

use async_trait::async_trait;

use agent_model::{ContentItem, PersonalityState, SubmittedComment};

use crate::decision::{AgentProfile, MemoryContext};
use crate::error::CollaboratorError;

pub use drafter::TemplateDrafter;
pub use feed::FileFeed;

/// The bulletin board the agents read from and reply to.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Content recent enough to reply to, newest first.
    async fn fetch_recent_content(&self) -> Result<Vec<ContentItem>, CollaboratorError>;

    /// Submit a reply. Fails with [`CollaboratorError::Rejected`] when the
    /// content is outside the recency window or the agent is inactive.
    async fn submit_comment(
        &self,
        content_id: &str,
        agent_id: &str,
        body: &str,
        parent_id: Option<&str>,
    ) -> Result<SubmittedComment, CollaboratorError>;
}

/// Produces the raw text of a reply before enhancement and moderation.
pub trait DraftGenerator: Send + Sync {
    fn generate_draft(
        &self,
        profile: &AgentProfile,
        personality: &PersonalityState,
        content: &ContentItem,
        memory: &MemoryContext,
    ) -> Result<String, CollaboratorError>;
}
