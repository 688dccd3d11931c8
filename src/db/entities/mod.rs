//! `sea_orm::entity::prelude` models, one per table in the migration
//! crate. Field names and unique constraints mirror the schema exactly.

pub mod connector_track;
pub mod playlist;
pub mod playlist_mapping;
pub mod playlist_track;
pub mod sync_checkpoint;
pub mod track;
pub mod track_like;
pub mod track_mapping;
pub mod track_metric;
pub mod track_play;

pub use connector_track::Entity as ConnectorTrack;
pub use playlist::Entity as Playlist;
pub use playlist_mapping::Entity as PlaylistMapping;
pub use playlist_track::Entity as PlaylistTrack;
pub use sync_checkpoint::Entity as SyncCheckpoint;
pub use track::Entity as Track;
pub use track_like::Entity as TrackLike;
pub use track_mapping::Entity as TrackMapping;
pub use track_metric::Entity as TrackMetric;
pub use track_play::Entity as TrackPlay;
