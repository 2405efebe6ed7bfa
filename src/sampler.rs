use tracing::{error, warn};

use crate::scraper::{CommentScraper, ScrapeInput, ScrapedRecord};

pub const PLACEHOLDER_COMMENT: &str = "No comment text available";

/// Fields that may carry a comment's text, in order of preference.
const TEXT_FIELDS: [&str; 3] = ["text", "caption", "comment_text"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleLimits {
    /// Results requested from the scraping job.
    pub results_limit: usize,
    /// Comments kept for classification.
    pub sample_size: usize,
}

impl Default for SampleLimits {
    fn default() -> Self {
        Self {
            results_limit: 10,
            sample_size: 5,
        }
    }
}

pub fn comment_text(record: &ScrapedRecord) -> String {
    TEXT_FIELDS
        .iter()
        .filter_map(|field| record.get(*field).and_then(|v| v.as_str()))
        .find(|text| !text.is_empty())
        .unwrap_or(PLACEHOLDER_COMMENT)
        .to_string()
}

/// Fetch up to `limits.sample_size` comment texts for the post at
/// `content_url`. Every failure yields an empty sample.
pub async fn sample_comments(
    scraper: &dyn CommentScraper,
    content_url: &str,
    limits: SampleLimits,
) -> Vec<String> {
    let input = ScrapeInput {
        direct_urls: vec![content_url.to_string()],
        results_limit: limits.results_limit,
    };
    let run = match scraper.run_actor(&input).await {
        Ok(run) => run,
        Err(e) => {
            error!("Error in getComments for {content_url}: {e}");
            return Vec::new();
        }
    };
    let Some(dataset_id) = run.default_dataset_id.filter(|id| !id.is_empty()) else {
        warn!("Apify run failed or returned no dataset");
        return Vec::new();
    };
    match scraper
        .dataset_items(&dataset_id, limits.results_limit)
        .await
    {
        Ok(records) => records
            .iter()
            .take(limits.sample_size)
            .map(comment_text)
            .collect(),
        Err(e) => {
            error!("Error in getComments for {content_url}: {e}");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReelReplyError;
    use crate::scraper::ActorRun;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeScraper {
        run: Result<ActorRun, String>,
        items: Result<Vec<ScrapedRecord>, String>,
        inputs: Mutex<Vec<ScrapeInput>>,
    }

    impl FakeScraper {
        fn with_items(items: Vec<serde_json::Value>) -> Self {
            FakeScraper {
                run: Ok(finished_run(Some("ds1"))),
                items: Ok(items
                    .into_iter()
                    .map(|v| v.as_object().cloned().unwrap())
                    .collect()),
                inputs: Mutex::new(Vec::new()),
            }
        }
    }

    fn finished_run(dataset: Option<&str>) -> ActorRun {
        ActorRun {
            id: "run1".into(),
            status: "SUCCEEDED".into(),
            default_dataset_id: dataset.map(str::to_string),
        }
    }

    #[async_trait]
    impl CommentScraper for FakeScraper {
        async fn run_actor(&self, input: &ScrapeInput) -> Result<ActorRun, ReelReplyError> {
            self.inputs.lock().unwrap().push(input.clone());
            self.run.clone().map_err(ReelReplyError::Scraper)
        }

        async fn dataset_items(
            &self,
            _dataset_id: &str,
            limit: usize,
        ) -> Result<Vec<ScrapedRecord>, ReelReplyError> {
            let items = self.items.clone().map_err(ReelReplyError::Scraper)?;
            Ok(items.into_iter().take(limit).collect())
        }
    }

    #[test]
    fn test_comment_text_falls_back_through_fields() {
        let record = serde_json::json!({"text": "", "caption": "from caption"});
        assert_eq!(comment_text(record.as_object().unwrap()), "from caption");

        let record = serde_json::json!({"comment_text": "third"});
        assert_eq!(comment_text(record.as_object().unwrap()), "third");

        let record = serde_json::json!({"text": 42, "ownerUsername": "x"});
        assert_eq!(comment_text(record.as_object().unwrap()), PLACEHOLDER_COMMENT);
    }

    #[tokio::test]
    async fn test_sample_requests_ten_and_keeps_five() {
        let items = (0..8)
            .map(|i| serde_json::json!({"text": format!("comment {i}")}))
            .collect();
        let scraper = FakeScraper::with_items(items);
        let url = "https://www.instagram.com/p/Cabc123";

        let sample = sample_comments(&scraper, url, SampleLimits::default()).await;

        assert_eq!(
            sample,
            vec!["comment 0", "comment 1", "comment 2", "comment 3", "comment 4"]
        );
        let inputs = scraper.inputs.lock().unwrap();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].direct_urls, vec![url.to_string()]);
        assert_eq!(inputs[0].results_limit, 10);
    }

    #[tokio::test]
    async fn test_sample_uses_placeholder_for_textless_records() {
        let scraper = FakeScraper::with_items(vec![
            serde_json::json!({"text": "lol"}),
            serde_json::json!({"likes": 3}),
        ]);
        let sample = sample_comments(&scraper, "u", SampleLimits::default()).await;
        assert_eq!(sample, vec!["lol".to_string(), PLACEHOLDER_COMMENT.to_string()]);
    }

    #[tokio::test]
    async fn test_sample_empty_when_run_fails() {
        let mut scraper = FakeScraper::with_items(vec![serde_json::json!({"text": "lol"})]);
        scraper.run = Err("actor crashed".into());
        assert!(sample_comments(&scraper, "u", SampleLimits::default())
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_sample_empty_without_dataset() {
        let mut scraper = FakeScraper::with_items(vec![serde_json::json!({"text": "lol"})]);
        scraper.run = Ok(finished_run(None));
        assert!(sample_comments(&scraper, "u", SampleLimits::default())
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_sample_empty_when_dataset_read_fails() {
        let mut scraper = FakeScraper::with_items(vec![]);
        scraper.items = Err("dataset gone".into());
        assert!(sample_comments(&scraper, "u", SampleLimits::default())
            .await
            .is_empty());
    }
}
