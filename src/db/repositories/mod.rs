pub mod base;
pub mod playlist;
pub mod sync_checkpoint;
pub mod track_connector;
pub mod track_core;
pub mod track_like;
pub mod track_metrics;
pub mod track_play;

pub use base::BaseRepository;
pub use playlist::PlaylistRepository;
pub use sync_checkpoint::SyncCheckpointRepository;
pub use track_connector::TrackConnectorRepository;
pub use track_core::TrackCoreRepository;
pub use track_like::TrackLikeRepository;
pub use track_metrics::TrackMetricsRepository;
pub use track_play::TrackPlayRepository;
