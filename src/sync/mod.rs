//! Cross-service sync loops (spec §4.J): import Spotify likes, export
//! loves to Last.fm, import Last.fm play history. Each is a standalone
//! async function returning a [`crate::domain::SyncStats`], driven by
//! the shared batch processor and checkpointed for resumability.

pub mod likes;
pub mod loves;
pub mod plays;
pub mod stats;

pub use likes::import_likes_from_spotify;
pub use loves::export_loves_to_lastfm;
pub use plays::import_play_history_from_lastfm;
