//! Process-level wiring shared by the reelreply binary.

pub mod logging;
