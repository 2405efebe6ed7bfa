use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::error::ReelReplyError;

/// Loose per-comment record as returned by the scraping actor.
pub type ScrapedRecord = serde_json::Map<String, serde_json::Value>;

const MAX_STATUS_POLLS: usize = 10;
const WAIT_FOR_FINISH_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScrapeInput {
    #[serde(rename = "directUrls")]
    pub direct_urls: Vec<String>,
    #[serde(rename = "resultsLimit")]
    pub results_limit: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ActorRun {
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, rename = "defaultDatasetId")]
    pub default_dataset_id: Option<String>,
}

impl ActorRun {
    pub fn is_finished(&self) -> bool {
        matches!(
            self.status.as_str(),
            "SUCCEEDED" | "FAILED" | "TIMED-OUT" | "ABORTED"
        )
    }
}

#[derive(Debug, Deserialize)]
struct ApifyEnvelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct ApifyErrorResponse {
    error: ApifyErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApifyErrorDetail {
    message: String,
}

#[async_trait]
pub trait CommentScraper: Send + Sync {
    /// Start the comment actor and wait for it to finish.
    async fn run_actor(&self, input: &ScrapeInput) -> Result<ActorRun, ReelReplyError>;

    /// Read up to `limit` records from a finished run's dataset, in order.
    async fn dataset_items(
        &self,
        dataset_id: &str,
        limit: usize,
    ) -> Result<Vec<ScrapedRecord>, ReelReplyError>;
}

pub struct ApifyClient {
    http: reqwest::Client,
    token: String,
    base_url: String,
    actor_id: String,
}

impl ApifyClient {
    pub fn new(config: &Config) -> Result<Self, ReelReplyError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()?;
        Ok(ApifyClient {
            http,
            token: config.apify_key.clone(),
            base_url: config.apify_base_url.trim_end_matches('/').to_string(),
            actor_id: config.apify_actor_id.clone(),
        })
    }

    fn runs_url(&self) -> String {
        format!(
            "{}/acts/{}/runs",
            self.base_url,
            self.actor_id.replace('/', "~")
        )
    }

    async fn read_run(&self, response: reqwest::Response) -> Result<ActorRun, ReelReplyError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(api_error(status, &body));
        }
        let envelope: ApifyEnvelope<ActorRun> = serde_json::from_str(&body).map_err(|e| {
            ReelReplyError::Scraper(format!("Failed to parse run: {e}\nBody: {body}"))
        })?;
        Ok(envelope.data)
    }
}

fn api_error(status: reqwest::StatusCode, body: &str) -> ReelReplyError {
    if status.as_u16() == 429 {
        return ReelReplyError::RateLimited;
    }
    match serde_json::from_str::<ApifyErrorResponse>(body) {
        Ok(err) => ReelReplyError::Scraper(err.error.message),
        Err(_) => ReelReplyError::Scraper(format!("HTTP {status}: {body}")),
    }
}

fn records_from_items(items: Vec<serde_json::Value>) -> Vec<ScrapedRecord> {
    items
        .into_iter()
        .filter_map(|item| match item {
            serde_json::Value::Object(map) => Some(map),
            _ => None,
        })
        .collect()
}

#[async_trait]
impl CommentScraper for ApifyClient {
    async fn run_actor(&self, input: &ScrapeInput) -> Result<ActorRun, ReelReplyError> {
        let response = self
            .http
            .post(self.runs_url())
            .bearer_auth(&self.token)
            .query(&[("waitForFinish", WAIT_FOR_FINISH_SECS)])
            .json(input)
            .send()
            .await?;
        let mut run = self.read_run(response).await?;

        let mut polls = 0;
        while !run.is_finished() {
            if polls >= MAX_STATUS_POLLS {
                return Err(ReelReplyError::Scraper(format!(
                    "run {} still {} after {} status checks",
                    run.id, run.status, MAX_STATUS_POLLS
                )));
            }
            polls += 1;
            debug!("Apify run {} is {}, waiting", run.id, run.status);
            let response = self
                .http
                .get(format!("{}/actor-runs/{}", self.base_url, run.id))
                .bearer_auth(&self.token)
                .query(&[("waitForFinish", WAIT_FOR_FINISH_SECS)])
                .send()
                .await?;
            run = self.read_run(response).await?;
        }

        if run.status != "SUCCEEDED" {
            return Err(ReelReplyError::Scraper(format!(
                "run {} finished with status {}",
                run.id, run.status
            )));
        }
        Ok(run)
    }

    async fn dataset_items(
        &self,
        dataset_id: &str,
        limit: usize,
    ) -> Result<Vec<ScrapedRecord>, ReelReplyError> {
        let response = self
            .http
            .get(format!("{}/datasets/{}/items", self.base_url, dataset_id))
            .bearer_auth(&self.token)
            .query(&[("clean", "true"), ("format", "json")])
            .query(&[("limit", limit)])
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(api_error(status, &body));
        }
        let items: Vec<serde_json::Value> = serde_json::from_str(&body)?;
        Ok(records_from_items(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrape_input_wire_shape() {
        let input = ScrapeInput {
            direct_urls: vec!["https://www.instagram.com/p/abc".into()],
            results_limit: 10,
        };
        let value = serde_json::to_value(&input).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "directUrls": ["https://www.instagram.com/p/abc"],
                "resultsLimit": 10
            })
        );
    }

    #[test]
    fn test_run_envelope_parses_dataset_id() {
        let body = r#"{"data":{"id":"run1","status":"SUCCEEDED","defaultDatasetId":"ds1","actId":"x"}}"#;
        let envelope: ApifyEnvelope<ActorRun> = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.data.default_dataset_id.as_deref(), Some("ds1"));
        assert!(envelope.data.is_finished());
    }

    #[test]
    fn test_run_without_dataset_id() {
        let body = r#"{"data":{"id":"run1","status":"RUNNING"}}"#;
        let envelope: ApifyEnvelope<ActorRun> = serde_json::from_str(body).unwrap();
        assert!(envelope.data.default_dataset_id.is_none());
        assert!(!envelope.data.is_finished());
    }

    #[test]
    fn test_runs_url_escapes_named_actor() {
        let config = Config {
            apify_actor_id: "apify/instagram-comment-scraper".into(),
            apify_base_url: "https://api.apify.com/v2/".into(),
            ..Config::default()
        };
        let client = ApifyClient::new(&config).unwrap();
        assert_eq!(
            client.runs_url(),
            "https://api.apify.com/v2/acts/apify~instagram-comment-scraper/runs"
        );
    }

    #[test]
    fn test_api_error_prefers_message() {
        let err = api_error(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"error":{"type":"invalid-input","message":"directUrls is required"}}"#,
        );
        assert_eq!(err.to_string(), "Scraper error: directUrls is required");
        let err = api_error(reqwest::StatusCode::TOO_MANY_REQUESTS, "");
        assert!(matches!(err, ReelReplyError::RateLimited));
    }

    #[test]
    fn test_records_from_items_skips_non_objects() {
        let items = vec![
            serde_json::json!({"text": "lol"}),
            serde_json::json!("stray"),
            serde_json::json!({"caption": "haha"}),
        ];
        let records = records_from_items(items);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["caption"], "haha");
    }
}
