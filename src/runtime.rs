use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::ReelReplyError;
use crate::llm::LlmProvider;
use crate::responder::{decide, ReplyDecision};
use crate::sampler::{sample_comments, SampleLimits};
use crate::scanner::{scan_inbox, Candidate, ScanPolicy};
use crate::scraper::CommentScraper;
use reelreply_channels::channel_adapter::DirectInbox;
use reelreply_core::retry::retry_transient;
use reelreply_storage::seen_store::SeenStore;

const CONTENT_URL_PREFIX: &str = "https://www.instagram.com/p/";

pub fn content_url(content_ref: &str) -> String {
    format!("{CONTENT_URL_PREFIX}{content_ref}")
}

pub struct AppState {
    pub config: Config,
    pub inbox: Box<dyn DirectInbox>,
    pub scraper: Box<dyn CommentScraper>,
    pub llm: Box<dyn LlmProvider>,
    pub store: SeenStore,
}

/// Outcome counts for one pass over the inbox.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub candidates: usize,
    pub replied: usize,
    pub suppressed: usize,
    pub failed: usize,
}

impl AppState {
    fn scan_policy(&self) -> ScanPolicy {
        ScanPolicy {
            window: self.config.recency_window(),
            retry: self.config.retry_policy(),
        }
    }

    fn sample_limits(&self) -> SampleLimits {
        SampleLimits {
            results_limit: self.config.comment_results_limit,
            sample_size: self.config.comment_sample_size,
        }
    }

    /// Sign in, retrying transient failures per the configured policy.
    pub async fn login(&self) -> Result<String, ReelReplyError> {
        let inbox = self.inbox.as_ref();
        let username = self.config.insta_username.as_str();
        let password = self.config.insta_password.as_str();
        retry_transient(self.config.retry_policy(), "Login", || {
            inbox.login(username, password)
        })
        .await
    }

    /// One scan-and-reply pass. Only a missing account id is returned as
    /// an error; per-candidate failures are logged and counted.
    pub async fn run_cycle(&mut self, now: DateTime<Utc>) -> Result<CycleReport, ReelReplyError> {
        let self_id = self.inbox.self_user_id().ok_or_else(|| {
            ReelReplyError::LoginRequired("messaging session has no account id".into())
        })?;
        let policy = self.scan_policy();
        let candidates =
            scan_inbox(self.inbox.as_ref(), &self_id, &mut self.store, policy, now).await;

        let mut report = CycleReport {
            candidates: candidates.len(),
            ..CycleReport::default()
        };
        if candidates.is_empty() {
            info!("You have received no new reels");
            return Ok(report);
        }

        for candidate in &candidates {
            self.handle_candidate(candidate, &mut report).await;
        }
        debug!(
            "Cycle finished: {} candidates, {} replied, {} suppressed, {} failed",
            report.candidates, report.replied, report.suppressed, report.failed
        );
        Ok(report)
    }

    async fn handle_candidate(&self, candidate: &Candidate, report: &mut CycleReport) {
        let url = content_url(&candidate.content_ref);
        let comments = sample_comments(self.scraper.as_ref(), &url, self.sample_limits()).await;
        let reply = match decide(self.llm.as_ref(), &comments).await {
            ReplyDecision::Reply(text) => text,
            ReplyDecision::Suppressed => {
                report.suppressed += 1;
                return;
            }
        };

        let user = &candidate.peer_username;
        if let Err(e) = self
            .inbox
            .send_reply(&candidate.thread_id, &reply, &candidate.message)
            .await
        {
            error!("Error sending reply to {user}: {e}");
            report.failed += 1;
            return;
        }
        if let Err(e) = self
            .inbox
            .mark_thread_read(&candidate.thread_id, &candidate.message.id)
            .await
        {
            error!("Error marking thread {} read for {user}: {e}", candidate.thread_id);
            report.failed += 1;
            return;
        }
        info!("Replied to {user}: {reply}");
        report.replied += 1;
    }
}

/// Sleep before the next cycle: the poll interval after a completed cycle,
/// the recovery delay after a failed one.
pub fn next_delay(config: &Config, outcome: &Result<CycleReport, ReelReplyError>) -> Duration {
    match outcome {
        Ok(_) => config.poll_interval(),
        Err(_) => config.recovery_delay(),
    }
}

fn login_failure_message(inbox: &str, err: &ReelReplyError) -> String {
    if err.is_transient() {
        format!("Max login retries reached, exiting: {err}")
    } else {
        format!("{inbox} login failed: {err}")
    }
}

async fn drive(state: &mut AppState) -> anyhow::Result<()> {
    if let Err(e) = state.login().await {
        return Err(anyhow::anyhow!(login_failure_message(
            state.inbox.name(),
            &e
        )));
    }
    info!("Bot started. Replying to new funny reels only.");

    loop {
        let outcome = state.run_cycle(Utc::now()).await;
        if let Err(e) = &outcome {
            error!("Unexpected error in main loop: {e}");
        }
        tokio::time::sleep(next_delay(&state.config, &outcome)).await;
    }
}

/// Log in and poll until Ctrl-C. Returns an error only when login fails.
pub async fn run(mut state: AppState) -> anyhow::Result<()> {
    tokio::select! {
        result = drive(&mut state) => result,
        signal = tokio::signal::ctrl_c() => {
            signal.map_err(|e| anyhow::anyhow!("Failed to listen for Ctrl-C: {e}"))?;
            info!("Received Ctrl-C, shutting down");
            Ok(())
        }
    }
}
