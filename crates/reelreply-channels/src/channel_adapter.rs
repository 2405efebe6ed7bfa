use async_trait::async_trait;
use reelreply_core::error::ReelReplyError;

use crate::channel::{DirectMessage, DirectThread};

#[async_trait]
pub trait DirectInbox: Send + Sync {
    /// Unique name: "instagram"
    fn name(&self) -> &str;

    /// Authenticate and return the account id of the logged-in user.
    async fn login(&self, username: &str, password: &str) -> Result<String, ReelReplyError>;

    /// Account id of the logged-in user, `None` before a successful login.
    fn self_user_id(&self) -> Option<String>;

    /// Every thread the account participates in, with its recent messages.
    async fn list_threads(&self) -> Result<Vec<DirectThread>, ReelReplyError>;

    /// Send `text` into `thread_id` as a reply to `in_reply_to`.
    async fn send_reply(
        &self,
        thread_id: &str,
        text: &str,
        in_reply_to: &DirectMessage,
    ) -> Result<(), ReelReplyError>;

    /// Mark `thread_id` read up to and including `message_id`.
    async fn mark_thread_read(
        &self,
        thread_id: &str,
        message_id: &str,
    ) -> Result<(), ReelReplyError>;
}
