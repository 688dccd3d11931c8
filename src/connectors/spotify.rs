use async_trait::async_trait;
use chrono::{DateTime, Utc};
use governor::{clock::DefaultClock, state::direct::NotKeyed, state::InMemoryState, Quota, RateLimiter as GovernorLimiter};
use nonzero_ext::nonzero;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::connectors::{Connector, PlaylistWriteMode};
use crate::domain::{Artist, Playlist, Track};
use crate::error::{classify_http_status, AppError, Result};

const SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";
const PLAYLIST_WRITE_CHUNK: usize = 100;

/// Spotify client (spec §4.D). OAuth/PKCE is out of this crate's scope
/// (spec.md's Non-goals); every method takes a caller-supplied
/// `access_token` rather than managing one. Grounded on the teacher's
/// `services/spotify.rs` pagination loop and rate limiter, narrowed to
/// the playlist surface the `Connector` trait requires.
#[derive(Clone)]
pub struct SpotifyConnector {
    client: Client,
    rate_limiter: Arc<GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl SpotifyConnector {
    pub fn new() -> Self {
        let quota = Quota::per_second(nonzero!(2u32));
        Self {
            client: Client::new(),
            rate_limiter: Arc::new(GovernorLimiter::direct(quota)),
        }
    }

    async fn get(&self, access_token: &str, url: &str) -> Result<reqwest::Response> {
        self.rate_limiter.until_ready().await;
        let response = self
            .client
            .get(url)
            .header("Authorization", format!("Bearer {access_token}"))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(classify_http_status(response.status(), "spotify"));
        }
        Ok(response)
    }

    fn track_from_item(item: &SpotifyPlaylistItem) -> Option<Track> {
        let raw = item.track.as_ref()?;
        let id = raw.id.as_ref()?;
        let artists: Vec<Artist> = raw
            .artists
            .iter()
            .filter_map(|a| Artist::new(a.name.clone()).ok())
            .collect();
        if artists.is_empty() {
            return None;
        }
        let track = Track::new(raw.name.clone(), artists).ok()?;
        let track = track.with_duration_ms(raw.duration_ms as i64);
        let track = if let Some(album) = &raw.album {
            track.with_album(album.name.clone())
        } else {
            track
        };
        let track = track.with_connector_track_id("spotify", id.clone());
        let mut metadata = std::collections::HashMap::new();
        if let Some(popularity) = raw.popularity {
            metadata.insert("spotify_popularity".to_string(), serde_json::json!(popularity));
        }
        metadata.insert("spotify_uri".to_string(), serde_json::json!(format!("spotify:track:{id}")));
        Some(track.with_connector_metadata("spotify", metadata))
    }
}

impl Default for SpotifyConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for SpotifyConnector {
    fn name(&self) -> &'static str {
        "spotify"
    }

    async fn get_playlist(&self, access_token: &str, external_id: &str) -> Result<Playlist> {
        let meta_url = format!("{SPOTIFY_API_BASE}/playlists/{external_id}?fields=name,description");
        let meta: SpotifyPlaylistMeta = self.get(access_token, &meta_url).await?.json().await?;

        let mut tracks = Vec::new();
        let mut next_url = Some(format!("{SPOTIFY_API_BASE}/playlists/{external_id}/tracks?limit=100"));
        while let Some(url) = next_url {
            let page: SpotifyPlaylistTracksPage = self.get(access_token, &url).await?.json().await?;
            tracks.extend(page.items.iter().filter_map(Self::track_from_item));
            next_url = page.next;
        }

        let playlist = Playlist::new(meta.name)?;
        let playlist = if let Some(description) = meta.description {
            playlist.with_description(description)
        } else {
            playlist
        };
        Ok(playlist.with_tracks(tracks).with_connector_playlist_id("spotify", external_id))
    }

    async fn create_playlist(&self, access_token: &str, playlist: &Playlist, user_id: Option<&str>) -> Result<String> {
        let user_id = user_id.ok_or_else(|| AppError::validation("spotify create_playlist requires a user id"))?;
        self.rate_limiter.until_ready().await;
        let response = self
            .client
            .post(format!("{SPOTIFY_API_BASE}/users/{user_id}/playlists"))
            .header("Authorization", format!("Bearer {access_token}"))
            .json(&serde_json::json!({
                "name": playlist.name,
                "description": playlist.description,
                "public": false,
            }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(classify_http_status(response.status(), "spotify create playlist"));
        }
        let created: SpotifyPlaylistMeta = response.json().await?;
        let external_id = created.id.ok_or_else(|| AppError::PermanentExternal("spotify did not return a playlist id".into()))?;

        self.update_playlist(access_token, &external_id, playlist, PlaylistWriteMode::Replace).await?;
        Ok(external_id)
    }

    async fn update_playlist(
        &self,
        access_token: &str,
        external_id: &str,
        playlist: &Playlist,
        mode: PlaylistWriteMode,
    ) -> Result<()> {
        let uris: Vec<String> = playlist
            .tracks
            .iter()
            .filter_map(|t| t.spotify_id())
            .map(|id| format!("spotify:track:{id}"))
            .collect();

        if mode == PlaylistWriteMode::Replace {
            self.rate_limiter.until_ready().await;
            let first_chunk: Vec<&String> = uris.iter().take(PLAYLIST_WRITE_CHUNK).collect();
            let response = self
                .client
                .put(format!("{SPOTIFY_API_BASE}/playlists/{external_id}/tracks"))
                .header("Authorization", format!("Bearer {access_token}"))
                .json(&serde_json::json!({ "uris": first_chunk }))
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(classify_http_status(response.status(), "spotify replace playlist tracks"));
            }
            for chunk in uris.chunks(PLAYLIST_WRITE_CHUNK).skip(1) {
                self.append_chunk(access_token, external_id, chunk).await?;
            }
        } else {
            for chunk in uris.chunks(PLAYLIST_WRITE_CHUNK) {
                self.append_chunk(access_token, external_id, chunk).await?;
            }
        }
        Ok(())
    }
}

/// One page of `GET /v1/me/tracks`, pre-conversion to a domain
/// `Track` (which needs the liked-at timestamp kept alongside it,
/// since `Track` itself has no notion of when it was liked).
#[derive(Debug, Clone)]
pub struct SpotifyLikedTrack {
    pub track: Track,
    pub added_at: DateTime<Utc>,
}

impl SpotifyConnector {
    /// Fetches one page of the current user's saved tracks. Pass the
    /// previous call's returned cursor as `next_url` to resume;
    /// `None` starts from the first page. Mirrors `get_playlist`'s
    /// pagination shape but returns the raw `next` URL as a cursor
    /// instead of looping to completion, since `sync::likes` needs to
    /// checkpoint between pages.
    pub async fn get_saved_tracks_page(&self, access_token: &str, next_url: Option<&str>) -> Result<(Vec<SpotifyLikedTrack>, Option<String>)> {
        let url = next_url.map(str::to_string).unwrap_or_else(|| format!("{SPOTIFY_API_BASE}/me/tracks?limit=50"));
        let page: SpotifySavedTracksPage = self.get(access_token, &url).await?.json().await?;
        let items = page
            .items
            .into_iter()
            .filter_map(|item| {
                let track = Self::track_from_item(&SpotifyPlaylistItem { track: item.track })?;
                let added_at = DateTime::parse_from_rfc3339(&item.added_at).ok()?.with_timezone(&Utc);
                Some(SpotifyLikedTrack { track, added_at })
            })
            .collect();
        Ok((items, page.next))
    }

    /// Fetches current popularity for up to 50 track ids per request
    /// (`GET /v1/tracks?ids=...`), feeding `enricher.spotify`'s metric
    /// refresh. Spotify returns `null` for an id it doesn't recognize;
    /// those are silently dropped rather than erroring the whole batch.
    pub async fn batch_get_track_popularity(&self, access_token: &str, spotify_track_ids: &[String]) -> Result<HashMap<String, i32>> {
        let mut out = HashMap::new();
        for chunk in spotify_track_ids.chunks(50) {
            let ids = chunk.join(",");
            let url = format!("{SPOTIFY_API_BASE}/tracks?ids={ids}");
            let page: SpotifyTracksResponse = self.get(access_token, &url).await?.json().await?;
            for track in page.tracks.into_iter().flatten() {
                if let (Some(id), Some(popularity)) = (track.id, track.popularity) {
                    out.insert(id, popularity);
                }
            }
        }
        Ok(out)
    }

    async fn append_chunk(&self, access_token: &str, external_id: &str, chunk: &[String]) -> Result<()> {
        self.rate_limiter.until_ready().await;
        let response = self
            .client
            .post(format!("{SPOTIFY_API_BASE}/playlists/{external_id}/tracks"))
            .header("Authorization", format!("Bearer {access_token}"))
            .json(&serde_json::json!({ "uris": chunk }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(classify_http_status(response.status(), "spotify append playlist tracks"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct SpotifyPlaylistMeta {
    #[serde(default)]
    id: Option<String>,
    name: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SpotifyTracksResponse {
    tracks: Vec<Option<SpotifyRawTrack>>,
}

#[derive(Debug, Deserialize)]
struct SpotifySavedTracksPage {
    items: Vec<SpotifySavedTrackItem>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SpotifySavedTrackItem {
    added_at: String,
    track: Option<SpotifyRawTrack>,
}

#[derive(Debug, Deserialize)]
struct SpotifyPlaylistTracksPage {
    items: Vec<SpotifyPlaylistItem>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SpotifyPlaylistItem {
    track: Option<SpotifyRawTrack>,
}

#[derive(Debug, Deserialize)]
struct SpotifyRawTrack {
    id: Option<String>,
    name: String,
    duration_ms: i32,
    popularity: Option<i32>,
    album: Option<SpotifyRawAlbum>,
    artists: Vec<SpotifyRawArtist>,
}

#[derive(Debug, Deserialize, Serialize)]
struct SpotifyRawAlbum {
    name: String,
}

#[derive(Debug, Deserialize, Serialize)]
struct SpotifyRawArtist {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_from_item_skips_tracks_without_an_id() {
        let item = SpotifyPlaylistItem {
            track: Some(SpotifyRawTrack {
                id: None,
                name: "Title".into(),
                duration_ms: 1000,
                popularity: None,
                album: None,
                artists: vec![SpotifyRawArtist { name: "Artist".into() }],
            }),
        };
        assert!(SpotifyConnector::track_from_item(&item).is_none());
    }

    #[test]
    fn track_from_item_stamps_spotify_connector_id() {
        let item = SpotifyPlaylistItem {
            track: Some(SpotifyRawTrack {
                id: Some("abc123".into()),
                name: "Title".into(),
                duration_ms: 1000,
                popularity: Some(42),
                album: Some(SpotifyRawAlbum { name: "Album".into() }),
                artists: vec![SpotifyRawArtist { name: "Artist".into() }],
            }),
        };
        let track = SpotifyConnector::track_from_item(&item).unwrap();
        assert_eq!(track.spotify_id(), Some("abc123"));
        assert_eq!(track.album.as_deref(), Some("Album"));
    }
}
