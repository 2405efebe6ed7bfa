use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, warn};

use reelreply_channels::channel::{DirectMessage, DirectThread};
use reelreply_channels::channel_adapter::DirectInbox;
use reelreply_core::retry::{retry_transient, RetryPolicy};
use reelreply_storage::seen_store::SeenStore;

pub const UNKNOWN_SENDER: &str = "Unknown";

/// A shared reel selected for a reply in this cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub thread_id: String,
    pub message: DirectMessage,
    pub content_ref: String,
    pub peer_username: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanPolicy {
    /// Maximum message age.
    pub window: Duration,
    pub retry: RetryPolicy,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self {
            window: Duration::hours(24),
            retry: RetryPolicy::default(),
        }
    }
}

/// Within the window; a missing timestamp counts as the Unix epoch.
pub fn is_recent(message: &DirectMessage, now: DateTime<Utc>, window: Duration) -> bool {
    let sent_at = message.timestamp.unwrap_or_default();
    now.signed_duration_since(sent_at) <= window
}

fn is_eligible(
    message: &DirectMessage,
    self_id: &str,
    store: &SeenStore,
    now: DateTime<Utc>,
    window: Duration,
) -> bool {
    message.author_id != self_id
        && message.is_clip()
        && !store.contains(&message.id)
        && is_recent(message, now, window)
}

fn select_candidates(
    threads: &[DirectThread],
    self_id: &str,
    store: &mut SeenStore,
    now: DateTime<Utc>,
    window: Duration,
) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    for thread in threads {
        for message in &thread.messages {
            if !is_eligible(message, self_id, store, now, window) {
                continue;
            }
            let Some(content_ref) = message.content_ref.as_deref().filter(|c| !c.is_empty())
            else {
                debug!(
                    "Skipping clip {} in thread {}: no content reference",
                    message.id, thread.id
                );
                continue;
            };
            store.mark_seen(&message.id);
            candidates.push(Candidate {
                thread_id: thread.id.clone(),
                message: message.clone(),
                content_ref: content_ref.to_string(),
                peer_username: thread
                    .peer_username(self_id)
                    .unwrap_or(UNKNOWN_SENDER)
                    .to_string(),
            });
        }
    }
    candidates
}

/// Collect new shared reels from every thread and claim each one in `store`
/// before returning it.
///
/// Fetch failures never escape: transient ones are retried per
/// `policy.retry`, and anything left over yields an empty result.
pub async fn scan_inbox(
    inbox: &dyn DirectInbox,
    self_id: &str,
    store: &mut SeenStore,
    policy: ScanPolicy,
    now: DateTime<Utc>,
) -> Vec<Candidate> {
    let threads = match retry_transient(policy.retry, "Fetching threads", || {
        inbox.list_threads()
    })
    .await
    {
        Ok(threads) => threads,
        Err(e) if e.is_transient() => {
            warn!("Max retries reached, skipping this cycle");
            return Vec::new();
        }
        Err(e) => {
            error!("Unexpected error while scanning inbox: {e}");
            return Vec::new();
        }
    };
    select_candidates(&threads, self_id, store, now, policy.window)
}
