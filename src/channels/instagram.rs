use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::ReelReplyError;
use reelreply_channels::channel::{DirectMessage, DirectThread, InboxUser};
use reelreply_channels::channel_adapter::DirectInbox;
use reelreply_core::text::preview;

const USER_AGENT: &str = "Instagram 269.0.0.18.75 Android (26/8.0.0; 480dpi; 1080x1920; OnePlus; 6T Dev; devitron; qcom; en_US; 314665256)";
const APP_ID: &str = "567067343352427";
const INBOX_THREAD_LIMIT: &str = "20";
const INBOX_MESSAGE_LIMIT: &str = "10";

#[derive(Debug, Clone)]
struct InstagramSession {
    user_id: String,
    authorization: String,
}

/// Direct-message inbox backed by the Instagram mobile API.
pub struct InstagramInbox {
    http: reqwest::Client,
    base_url: String,
    device_id: String,
    session: RwLock<Option<InstagramSession>>,
}

impl InstagramInbox {
    pub fn new(config: &Config) -> Result<Self, ReelReplyError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .user_agent(USER_AGENT)
            .build()?;
        Ok(InstagramInbox {
            http,
            base_url: config.instagram_base_url.trim_end_matches('/').to_string(),
            device_id: uuid::Uuid::new_v4().to_string(),
            session: RwLock::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorization(&self) -> Result<String, ReelReplyError> {
        self.session
            .read()
            .ok()
            .and_then(|s| s.as_ref().map(|s| s.authorization.clone()))
            .ok_or_else(|| ReelReplyError::LoginRequired("no active session".into()))
    }

    async fn post_form(
        &self,
        path: &str,
        form: &[(&str, String)],
    ) -> Result<Value, ReelReplyError> {
        let response = self
            .http
            .post(self.url(path))
            .header("X-IG-App-ID", APP_ID)
            .header(reqwest::header::AUTHORIZATION, self.authorization()?)
            .form(form)
            .send()
            .await?;
        read_api_response(response).await
    }
}

async fn read_api_response(response: reqwest::Response) -> Result<Value, ReelReplyError> {
    let status = response.status();
    let body = response.text().await?;
    check_api_body(status, &body)
}

fn check_api_body(status: reqwest::StatusCode, body: &str) -> Result<Value, ReelReplyError> {
    if status.as_u16() == 429 {
        return Err(ReelReplyError::RateLimited);
    }
    let parsed: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) if !status.is_success() => {
            return Err(ReelReplyError::Messaging(format!(
                "HTTP {status}: {}",
                preview(body, 300)
            )));
        }
        Err(e) => return Err(e.into()),
    };
    let api_status = parsed.get("status").and_then(Value::as_str).unwrap_or("");
    if status.is_success() && api_status == "ok" {
        return Ok(parsed);
    }
    let message = parsed
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    if status.as_u16() == 401 || status.as_u16() == 403 || message == "login_required" {
        return Err(ReelReplyError::LoginRequired(message));
    }
    Err(ReelReplyError::Messaging(format!("HTTP {status}: {message}")))
}

fn encrypted_password(password: &str, now: DateTime<Utc>) -> String {
    format!("#PWD_INSTAGRAM:0:{}:{password}", now.timestamp())
}

/// Ids arrive as JSON numbers or strings depending on endpoint.
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn micros_to_datetime(value: &Value) -> Option<DateTime<Utc>> {
    let micros = match value {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.parse::<i64>().ok()?,
        _ => return None,
    };
    let secs = micros.div_euclid(1_000_000);
    let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
    DateTime::from_timestamp(secs, nanos)
}

#[derive(Debug, Deserialize)]
struct RawInbox {
    inbox: RawInboxBody,
}

#[derive(Debug, Deserialize)]
struct RawInboxBody {
    #[serde(default)]
    threads: Vec<RawThread>,
}

#[derive(Debug, Deserialize)]
struct RawThread {
    #[serde(default)]
    thread_id: Value,
    #[serde(default)]
    users: Vec<RawUser>,
    #[serde(default)]
    items: Vec<RawItem>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    #[serde(default)]
    pk: Value,
    #[serde(default)]
    username: String,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    #[serde(default)]
    item_id: Value,
    #[serde(default)]
    user_id: Value,
    #[serde(default)]
    timestamp: Value,
    #[serde(default)]
    item_type: String,
    #[serde(default)]
    clip: Option<Value>,
    #[serde(default)]
    client_context: Option<String>,
}

fn clip_code(clip: &Value) -> Option<String> {
    clip.pointer("/clip/code")
        .or_else(|| clip.get("code"))
        .and_then(Value::as_str)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

fn convert_thread(raw: RawThread) -> Option<DirectThread> {
    let id = id_string(&raw.thread_id)?;
    let users = raw
        .users
        .into_iter()
        .filter_map(|u| {
            Some(InboxUser {
                id: id_string(&u.pk)?,
                username: u.username,
            })
        })
        .collect();
    let messages = raw
        .items
        .into_iter()
        .filter_map(|item| {
            Some(DirectMessage {
                id: id_string(&item.item_id)?,
                author_id: id_string(&item.user_id).unwrap_or_default(),
                timestamp: micros_to_datetime(&item.timestamp),
                content_ref: item.clip.as_ref().and_then(clip_code),
                item_type: item.item_type,
                client_context: item.client_context,
            })
        })
        .collect();
    Some(DirectThread {
        id,
        users,
        messages,
    })
}

pub fn parse_inbox(body: Value) -> Result<Vec<DirectThread>, ReelReplyError> {
    let raw: RawInbox = serde_json::from_value(body)?;
    Ok(raw
        .inbox
        .threads
        .into_iter()
        .filter_map(convert_thread)
        .collect())
}

#[async_trait::async_trait]
impl DirectInbox for InstagramInbox {
    fn name(&self) -> &str {
        "instagram"
    }

    async fn login(&self, username: &str, password: &str) -> Result<String, ReelReplyError> {
        let form = [
            ("username", username.to_string()),
            ("enc_password", encrypted_password(password, Utc::now())),
            ("device_id", self.device_id.clone()),
            ("guid", self.device_id.clone()),
            ("phone_id", self.device_id.clone()),
            ("login_attempt_count", "0".to_string()),
        ];
        let response = self
            .http
            .post(self.url("accounts/login/"))
            .header("X-IG-App-ID", APP_ID)
            .form(&form)
            .send()
            .await?;
        let authorization = response
            .headers()
            .get("ig-set-authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = read_api_response(response).await.map_err(|e| match e {
            ReelReplyError::Messaging(msg) => ReelReplyError::LoginRequired(msg),
            other => other,
        })?;

        let user_id = body
            .get("logged_in_user")
            .and_then(|u| u.get("pk_id").or_else(|| u.get("pk")))
            .and_then(id_string)
            .ok_or_else(|| {
                ReelReplyError::LoginRequired("login response carried no user id".into())
            })?;
        let authorization = authorization
            .filter(|a| !a.trim().is_empty())
            .ok_or_else(|| {
                ReelReplyError::LoginRequired(
                    "login response carried no authorization header".into(),
                )
            })?;

        if let Ok(mut session) = self.session.write() {
            *session = Some(InstagramSession {
                user_id: user_id.clone(),
                authorization,
            });
        }
        info!("Logged in to instagram as {username} ({user_id})");
        Ok(user_id)
    }

    fn self_user_id(&self) -> Option<String> {
        self.session
            .read()
            .ok()
            .and_then(|s| s.as_ref().map(|s| s.user_id.clone()))
    }

    async fn list_threads(&self) -> Result<Vec<DirectThread>, ReelReplyError> {
        let response = self
            .http
            .get(self.url("direct_v2/inbox/"))
            .header("X-IG-App-ID", APP_ID)
            .header(reqwest::header::AUTHORIZATION, self.authorization()?)
            .query(&[
                ("visual_message_return_type", "unseen"),
                ("persistentBadging", "true"),
                ("limit", INBOX_THREAD_LIMIT),
                ("thread_message_limit", INBOX_MESSAGE_LIMIT),
            ])
            .send()
            .await?;
        let body = read_api_response(response).await?;
        let threads = parse_inbox(body)?;
        debug!("Fetched {} direct threads", threads.len());
        Ok(threads)
    }

    async fn send_reply(
        &self,
        thread_id: &str,
        text: &str,
        in_reply_to: &DirectMessage,
    ) -> Result<(), ReelReplyError> {
        let client_context = uuid::Uuid::new_v4().to_string();
        let mut form = vec![
            ("action", "send_item".to_string()),
            ("thread_ids", format!("[{thread_id}]")),
            ("text", text.to_string()),
            ("client_context", client_context.clone()),
            ("offline_threading_id", client_context.clone()),
            ("mutation_token", client_context),
            ("_uuid", self.device_id.clone()),
            ("device_id", self.device_id.clone()),
            ("replied_to_item_id", in_reply_to.id.clone()),
        ];
        if let Some(ctx) = in_reply_to.client_context.as_deref() {
            form.push(("replied_to_client_context", ctx.to_string()));
        }
        self.post_form("direct_v2/threads/broadcast/text/", &form)
            .await?;
        Ok(())
    }

    async fn mark_thread_read(
        &self,
        thread_id: &str,
        message_id: &str,
    ) -> Result<(), ReelReplyError> {
        let form = [
            ("action", "mark_seen".to_string()),
            ("thread_id", thread_id.to_string()),
            ("item_id", message_id.to_string()),
            ("use_unified_inbox", "true".to_string()),
            ("_uuid", self.device_id.clone()),
        ];
        self.post_form(
            &format!("direct_v2/threads/{thread_id}/items/{message_id}/seen/"),
            &form,
        )
        .await?;
        Ok(())
    }
}
