pub mod channels;
pub mod config;
pub mod doctor;
pub mod llm;
pub mod responder;
pub mod runtime;
pub mod sampler;
pub mod scanner;
pub mod scraper;

pub use reelreply_app::logging;
pub use reelreply_channels::channel;
pub use reelreply_channels::channel_adapter;
pub use reelreply_core::error;
pub use reelreply_core::retry;
pub use reelreply_core::text;
pub use reelreply_storage::seen_store;
