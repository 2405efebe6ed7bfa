//! Direct-message inbox abstraction for reelreply.

pub mod channel;
pub mod channel_adapter;
