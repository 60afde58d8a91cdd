//! File-backed content source: a JSON feed file in, a JSON-lines comment log
//! out.

use async_trait::async_trait;
use chrono::Duration;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use agent_model::{ContentItem, ExistingComment, SubmittedComment};

use super::ContentSource;
use crate::clock::{Clock, SystemClock};
use crate::error::CollaboratorError;

/// Default window in which content accepts replies.
pub const DEFAULT_RECENCY_HOURS: i64 = 24;

pub struct FileFeed {
    feed_path: PathBuf,
    comments_path: PathBuf,
    recency: Duration,
    /// When set, only these agents may comment
    active_agents: Option<BTreeSet<String>>,
    clock: Arc<dyn Clock>,
    write_lock: Mutex<()>,
}

impl FileFeed {
    pub fn new(feed_path: impl Into<PathBuf>, comments_path: impl Into<PathBuf>) -> Self {
        Self {
            feed_path: feed_path.into(),
            comments_path: comments_path.into(),
            recency: Duration::hours(DEFAULT_RECENCY_HOURS),
            active_agents: None,
            clock: Arc::new(SystemClock),
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_recency(mut self, recency: Duration) -> Self {
        self.recency = recency;
        self
    }

    pub fn with_active_agents<I, S>(mut self, agents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.active_agents = Some(agents.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    async fn read_feed(&self) -> Result<Vec<ContentItem>, CollaboratorError> {
        let text = tokio::fs::read_to_string(&self.feed_path).await.map_err(|e| {
            CollaboratorError::Unavailable(format!("{}: {}", self.feed_path.display(), e))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            CollaboratorError::Unavailable(format!("{}: {}", self.feed_path.display(), e))
        })
    }

    /// Comments previously written to the log. Corrupt lines are skipped.
    async fn read_submitted(&self) -> Vec<SubmittedComment> {
        let text = match tokio::fs::read_to_string(&self.comments_path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(path = %self.comments_path.display(), error = %e, "Failed to read comment log");
                return Vec::new();
            }
        };
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }

    fn is_recent(&self, item: &ContentItem) -> bool {
        item.created_at >= self.clock.now() - self.recency
    }

    fn is_active(&self, agent_id: &str) -> bool {
        self.active_agents
            .as_ref()
            .map_or(true, |agents| agents.contains(agent_id))
    }
}

#[async_trait]
impl ContentSource for FileFeed {
    async fn fetch_recent_content(&self) -> Result<Vec<ContentItem>, CollaboratorError> {
        let mut items = self.read_feed().await?;
        let submitted = self.read_submitted().await;

        for item in &mut items {
            for comment in submitted.iter().filter(|c| c.content_id == item.id) {
                if !item.comments.iter().any(|c| c.id == comment.id) {
                    item.comments.push(ExistingComment {
                        id: comment.id.clone(),
                        agent_id: comment.agent_id.clone(),
                        body: comment.body.clone(),
                        created_at: comment.created_at,
                    });
                }
            }
        }

        let mut recent: Vec<ContentItem> = items.into_iter().filter(|i| self.is_recent(i)).collect();
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        debug!(items = recent.len(), "Fetched recent content");
        Ok(recent)
    }

    async fn submit_comment(
        &self,
        content_id: &str,
        agent_id: &str,
        body: &str,
        parent_id: Option<&str>,
    ) -> Result<SubmittedComment, CollaboratorError> {
        let items = self.read_feed().await?;
        let item = items
            .iter()
            .find(|i| i.id == content_id)
            .ok_or_else(|| CollaboratorError::NotFound(content_id.to_string()))?;

        if !self.is_recent(item) {
            return Err(CollaboratorError::Rejected {
                content_id: content_id.to_string(),
                reason: "content is outside the recency window".into(),
            });
        }
        if !self.is_active(agent_id) {
            return Err(CollaboratorError::Rejected {
                content_id: content_id.to_string(),
                reason: format!("agent {} is not active", agent_id),
            });
        }

        let comment = SubmittedComment {
            id: Uuid::new_v4().to_string(),
            content_id: content_id.to_string(),
            agent_id: agent_id.to_string(),
            body: body.to_string(),
            parent_id: parent_id.map(String::from),
            created_at: self.clock.now(),
        };
        let line = serde_json::to_string(&comment)
            .map_err(|e| CollaboratorError::Unavailable(e.to_string()))?;

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.comments_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CollaboratorError::Unavailable(e.to_string()))?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.comments_path)
            .await
            .map_err(|e| CollaboratorError::Unavailable(e.to_string()))?;
        file.write_all(format!("{}\n", line).as_bytes())
            .await
            .map_err(|e| CollaboratorError::Unavailable(e.to_string()))?;

        debug!(content_id, agent_id, comment_id = %comment.id, "Comment submitted");
        Ok(comment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn write_feed(dir: &std::path::Path) -> PathBuf {
        let path = dir.join("feed.json");
        let feed = agent_model::fixtures::sample_feed();
        std::fs::write(&path, serde_json::to_string(&feed).unwrap()).unwrap();
        path
    }

    fn clock() -> Arc<FixedClock> {
        Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2025, 3, 15, 12, 0, 0).unwrap()))
    }

    #[tokio::test]
    async fn test_fetch_applies_recency_window() {
        let dir = tempdir().unwrap();
        let feed = FileFeed::new(write_feed(dir.path()), dir.path().join("comments.jsonl"))
            .with_clock(clock());
        let items = feed.fetch_recent_content().await.unwrap();
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["post_0003", "post_0002"]);
    }

    #[tokio::test]
    async fn test_submitted_comments_show_up_on_next_fetch() {
        let dir = tempdir().unwrap();
        let feed = FileFeed::new(write_feed(dir.path()), dir.path().join("out/comments.jsonl"))
            .with_clock(clock());
        let comment = feed
            .submit_comment("post_0002", "deep_thinker", "Please add a rollback plan.", None)
            .await
            .unwrap();
        assert_eq!(comment.content_id, "post_0002");

        let items = feed.fetch_recent_content().await.unwrap();
        let post = items.iter().find(|i| i.id == "post_0002").unwrap();
        assert!(post.has_commented("deep_thinker"));
    }

    #[tokio::test]
    async fn test_rejections() {
        let dir = tempdir().unwrap();
        let feed = FileFeed::new(write_feed(dir.path()), dir.path().join("comments.jsonl"))
            .with_clock(clock())
            .with_active_agents(["byte_wizard"]);

        let stale = feed.submit_comment("post_0001", "byte_wizard", "late", None).await;
        assert!(matches!(stale, Err(CollaboratorError::Rejected { .. })));

        let inactive = feed.submit_comment("post_0003", "meme_lord", "hi", None).await;
        assert!(matches!(inactive, Err(CollaboratorError::Rejected { .. })));

        let missing = feed.submit_comment("post_9999", "byte_wizard", "hi", None).await;
        assert!(matches!(missing, Err(CollaboratorError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_missing_feed_is_unavailable() {
        let dir = tempdir().unwrap();
        let feed = FileFeed::new(dir.path().join("nope.json"), dir.path().join("c.jsonl"));
        assert!(matches!(
            feed.fetch_recent_content().await,
            Err(CollaboratorError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_wider_recency_window() {
        let dir = tempdir().unwrap();
        let feed = FileFeed::new(write_feed(dir.path()), dir.path().join("comments.jsonl"))
            .with_clock(clock())
            .with_recency(Duration::days(7));
        assert_eq!(feed.fetch_recent_content().await.unwrap().len(), 3);
    }
}
