//! Plain value types for the music metadata domain (spec §3/§4.A).
//!
//! Every entity here is persistence-agnostic: no `sea_orm` type appears
//! in this module. Conversion to and from the persistence layer lives
//! in `db::repositories::*::mapper`.

pub mod artist;
pub mod checkpoint;
pub mod mapping;
pub mod play;
pub mod playlist;
pub mod track;
pub mod tracklist;

pub use artist::Artist;
pub use checkpoint::{EntityType, SyncCheckpoint, SyncStats};
pub use mapping::{ConnectorTrack, MatchMethod, PlaylistMapping, TrackMapping};
pub use play::{TrackLike, TrackMetric, TrackPlay};
pub use playlist::Playlist;
pub use track::Track;
pub use tracklist::TrackList;
