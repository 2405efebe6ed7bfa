//! Shared error, retry and text primitives for reelreply.

pub mod error;
pub mod retry;
pub mod text;
