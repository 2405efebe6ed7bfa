//! Persistence for reelreply.

pub mod seen_store;
