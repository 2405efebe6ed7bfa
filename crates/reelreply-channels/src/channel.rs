use chrono::{DateTime, Utc};

/// Item type of a shared reel in a direct thread.
pub const CLIP_ITEM_TYPE: &str = "clip";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxUser {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectMessage {
    pub id: String,
    pub author_id: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub item_type: String,
    /// Short code of the shared post, when the item carries one.
    pub content_ref: Option<String>,
    pub client_context: Option<String>,
}

impl DirectMessage {
    pub fn is_clip(&self) -> bool {
        self.item_type == CLIP_ITEM_TYPE
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectThread {
    pub id: String,
    pub users: Vec<InboxUser>,
    pub messages: Vec<DirectMessage>,
}

impl DirectThread {
    /// Username of the first participant that is not `self_id`.
    pub fn peer_username(&self, self_id: &str) -> Option<&str> {
        self.users
            .iter()
            .find(|u| u.id != self_id)
            .map(|u| u.username.as_str())
    }
}
