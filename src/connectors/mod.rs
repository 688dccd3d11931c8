//! External service clients (spec §4.D). Each connector converts raw
//! service payloads into domain `Track`/`Playlist` values, stamping
//! `connector_track_ids`/`connector_metadata` under its own name and
//! never writing matching information — that lives in `TrackMapping`.

pub mod lastfm;
pub mod musicbrainz;
pub mod spotify;

use async_trait::async_trait;

use crate::domain::Playlist;
use crate::error::Result;

/// How `update_playlist` reconciles the connector's existing track list
/// with the incoming one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistWriteMode {
    /// Remove every existing track first, then write the incoming set.
    Replace,
    /// Leave existing tracks in place and add the incoming set after them.
    Append,
}

/// Common playlist surface every connector that can host playlists
/// implements (spec §4.D). `MusicBrainzConnector` and `LastFmConnector`
/// have no playlist concept and do not implement this trait.
#[async_trait]
pub trait Connector: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fetches a playlist by its connector-native id, following `next`
    /// pagination links until the full track list is retrieved.
    async fn get_playlist(&self, access_token: &str, external_id: &str) -> Result<Playlist>;

    /// Creates a new playlist on the connector, writing tracks in
    /// chunks, and returns the connector-native playlist id.
    async fn create_playlist(&self, access_token: &str, playlist: &Playlist, user_id: Option<&str>) -> Result<String>;

    /// Reconciles an existing connector playlist with `playlist`'s
    /// track list, per `mode`.
    async fn update_playlist(
        &self,
        access_token: &str,
        external_id: &str,
        playlist: &Playlist,
        mode: PlaylistWriteMode,
    ) -> Result<()>;
}
