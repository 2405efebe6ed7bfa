pub mod instagram;

pub use instagram::InstagramInbox;
