use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;

use crate::batch::RateLimiter;
use crate::config::Config;
use crate::domain::{Artist, Track, TrackPlay};
use crate::error::{AppError, Result};
use crate::matcher::{ConnectorMatch, TargetConnector};

const LASTFM_API_BASE: &str = "https://ws.audioscrobbler.com/2.0/";

/// Last.fm rate-limit error code (see ws.audioscrobbler.com's error
/// code table); everything else from the API is treated as permanent.
const RATE_LIMIT_ERROR_CODE: i64 = 29;

/// Track information pulled from Last.fm, following
/// `original_source/src/infrastructure/connectors/lastfm.py`'s
/// `LastFMTrackInfo`: `None` means "not fetched", not "zero".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LastFmTrackInfo {
    pub lastfm_title: Option<String>,
    pub lastfm_mbid: Option<String>,
    pub lastfm_url: Option<String>,
    pub lastfm_duration: Option<i64>,
    pub lastfm_artist_name: Option<String>,
    pub lastfm_artist_mbid: Option<String>,
    pub lastfm_album_name: Option<String>,
    pub lastfm_album_mbid: Option<String>,
    pub lastfm_user_playcount: Option<i64>,
    pub lastfm_global_playcount: Option<i64>,
    pub lastfm_listeners: Option<i64>,
    pub lastfm_user_loved: bool,
}

impl LastFmTrackInfo {
    pub fn is_empty(&self) -> bool {
        self.lastfm_url.is_none()
    }

    /// Converts to a domain `Track`, stamping the `lastfm` connector id
    /// and, when present, an MBID recognized by the musicbrainz connector.
    pub fn to_domain_track(&self) -> Option<Track> {
        let title = self.lastfm_title.clone()?;
        let artists = self
            .lastfm_artist_name
            .as_ref()
            .and_then(|name| Artist::new(name.clone()).ok())
            .into_iter()
            .collect::<Vec<_>>();
        if artists.is_empty() {
            return None;
        }
        let mut track = Track::new(title, artists).ok()?;
        if let Some(album) = &self.lastfm_album_name {
            track = track.with_album(album.clone());
        }
        if let Some(duration) = self.lastfm_duration {
            track = track.with_duration_ms(duration);
        }
        if let Some(mbid) = &self.lastfm_mbid {
            track = track.with_connector_track_id("musicbrainz", mbid.clone());
        }
        if let Some(url) = &self.lastfm_url {
            track = track.with_connector_track_id("lastfm", url.clone());
        }
        let mut metadata: HashMap<String, JsonValue> = HashMap::new();
        if let Some(v) = self.lastfm_user_playcount {
            metadata.insert("lastfm_user_playcount".into(), serde_json::json!(v));
        }
        if let Some(v) = self.lastfm_global_playcount {
            metadata.insert("lastfm_global_playcount".into(), serde_json::json!(v));
        }
        if let Some(v) = self.lastfm_listeners {
            metadata.insert("lastfm_listeners".into(), serde_json::json!(v));
        }
        if !metadata.is_empty() {
            track = track.with_connector_metadata("lastfm", metadata);
        }
        Some(track)
    }
}

/// Last.fm client (spec §4.D). Built against the plain `ws.audioscrobbler.com`
/// REST API rather than a client library (the corpus has no Rust
/// equivalent of `pylast`), following the method surface of
/// `original_source/src/infrastructure/connectors/lastfm.py`: track
/// info lookup by MBID or artist/title, multi-artist fallback, loving
/// tracks, and paginated recent-tracks history.
#[derive(Clone)]
pub struct LastFmConnector {
    client: Client,
    api_key: String,
    api_secret: String,
    username: Option<String>,
    password: Option<String>,
    rate_limiter: RateLimiter,
}

impl LastFmConnector {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            api_key: config.lastfm_key.clone(),
            api_secret: config.lastfm_secret.clone(),
            username: config.lastfm_username.clone(),
            password: config.lastfm_password.clone(),
            rate_limiter: RateLimiter::per_second(config.api_rate_limit),
        }
    }

    /// `md5(sorted "key" + "value" pairs concatenated, then the shared
    /// secret appended)`, the signing scheme every Last.fm write/auth
    /// call requires.
    fn sign(&self, params: &[(&str, &str)]) -> String {
        let mut sorted: Vec<&(&str, &str)> = params.iter().collect();
        sorted.sort_by_key(|(k, _)| *k);
        let mut buf = String::new();
        for (k, v) in sorted {
            buf.push_str(k);
            buf.push_str(v);
        }
        buf.push_str(&self.api_secret);
        format!("{:x}", md5::compute(buf.as_bytes()))
    }

    async fn call(&self, method: &str, params: &[(&str, &str)]) -> Result<JsonValue> {
        self.rate_limiter.acquire().await;
        let mut query: Vec<(&str, &str)> = vec![("method", method), ("api_key", &self.api_key), ("format", "json")];
        query.extend_from_slice(params);

        let response = self.client.get(LASTFM_API_BASE).query(&query).send().await?;
        if !response.status().is_success() {
            return Err(crate::error::classify_http_status(response.status(), &format!("lastfm {method}")));
        }
        let body: JsonValue = response.json().await?;
        if let Some(code) = body.get("error").and_then(JsonValue::as_i64) {
            let message = body.get("message").and_then(JsonValue::as_str).unwrap_or("unknown error");
            return Err(if code == RATE_LIMIT_ERROR_CODE {
                AppError::TransientExternal(format!("lastfm {method}: {message}"))
            } else {
                AppError::PermanentExternal(format!("lastfm {method} ({code}): {message}"))
            });
        }
        Ok(body)
    }

    /// Fetches comprehensive track info by MBID if given, otherwise by
    /// artist/title. A "track not found" response yields an empty
    /// [`LastFmTrackInfo`] rather than an error.
    pub async fn get_lastfm_track_info(
        &self,
        artist_name: Option<&str>,
        track_title: Option<&str>,
        mbid: Option<&str>,
        lastfm_username: Option<&str>,
    ) -> Result<LastFmTrackInfo> {
        let user = lastfm_username.or(self.username.as_deref());
        let mut params: Vec<(&str, &str)> = Vec::new();
        if let Some(mbid) = mbid {
            params.push(("mbid", mbid));
        } else if let (Some(artist), Some(title)) = (artist_name, track_title) {
            params.push(("artist", artist));
            params.push(("track", title));
        } else {
            return Err(AppError::validation("either mbid or (artist_name + track_title) must be provided"));
        }
        if let Some(user) = user {
            params.push(("username", user));
        }

        match self.call("track.getInfo", &params).await {
            Ok(body) => Ok(parse_track_info(&body)),
            Err(AppError::PermanentExternal(msg)) if msg.to_lowercase().contains("not found") => Ok(LastFmTrackInfo::default()),
            Err(err) => Err(err),
        }
    }

    /// Tries each artist in `artists` in order against `title`, stopping
    /// at the first non-empty result (spec §4.D's multi-artist fallback).
    pub async fn get_track_info_multi_artist(&self, artists: &[Artist], title: &str, user: Option<&str>) -> Result<LastFmTrackInfo> {
        for artist in artists {
            let info = self.get_lastfm_track_info(Some(&artist.name), Some(title), None, user).await?;
            if !info.is_empty() {
                return Ok(info);
            }
        }
        Ok(LastFmTrackInfo::default())
    }

    /// Resolves track info for each track, preferring its musicbrainz
    /// id when known, falling back to multi-artist lookup by title.
    /// Sequential, governed by the connector's own rate limiter — the
    /// batch processor's concurrency wrapper is layered on by callers
    /// that need bounded parallelism.
    pub async fn batch_get_track_info(&self, tracks: &[Track], lastfm_username: Option<&str>) -> Result<HashMap<i64, LastFmTrackInfo>> {
        let mut results = HashMap::new();
        for track in tracks {
            let Some(track_id) = track.id else { continue };
            let info = if let Some(mbid) = track.mbid() {
                self.get_lastfm_track_info(None, None, Some(mbid), lastfm_username).await?
            } else if !track.artists.is_empty() {
                self.get_track_info_multi_artist(&track.artists, &track.title, lastfm_username).await?
            } else {
                LastFmTrackInfo::default()
            };
            if !info.is_empty() {
                results.insert(track_id, info);
            }
        }
        Ok(results)
    }

    async fn session_key(&self) -> Result<String> {
        let username = self.username.as_deref().ok_or_else(|| AppError::Configuration("LASTFM_USERNAME not set".into()))?;
        let password = self.password.as_deref().ok_or_else(|| AppError::Configuration("LASTFM_PASSWORD not set".into()))?;
        let sig = self.sign(&[("method", "auth.getMobileSession"), ("username", username), ("password", password), ("api_key", &self.api_key)]);
        let body = self
            .call("auth.getMobileSession", &[("username", username), ("password", password), ("api_sig", &sig)])
            .await?;
        body.get("session")
            .and_then(|s| s.get("key"))
            .and_then(JsonValue::as_str)
            .map(str::to_string)
            .ok_or_else(|| AppError::PermanentExternal("lastfm auth.getMobileSession returned no session key".into()))
    }

    /// Loves a track on Last.fm. Requires `LASTFM_USERNAME`/`LASTFM_PASSWORD`.
    pub async fn love_track(&self, artist_name: &str, track_title: &str) -> Result<bool> {
        let sk = self.session_key().await?;
        let sig = self.sign(&[("method", "track.love"), ("artist", artist_name), ("track", track_title), ("api_key", &self.api_key), ("sk", &sk)]);
        match self.call("track.love", &[("artist", artist_name), ("track", track_title), ("sk", &sk), ("api_sig", &sig)]).await {
            Ok(_) => Ok(true),
            Err(AppError::PermanentExternal(msg)) if msg.to_lowercase().contains("not found") => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Fetches one page of scrobble history for `username`
    /// (`from_time`/`to_time` bound the UNIX-timestamp window Last.fm
    /// accepts), converted to domain [`TrackPlay`] records keyed by no
    /// track id (the caller resolves identity downstream).
    pub async fn get_recent_tracks(
        &self,
        username: Option<&str>,
        limit: u32,
        page: u32,
        from_time: Option<DateTime<Utc>>,
        to_time: Option<DateTime<Utc>>,
    ) -> Result<Vec<RecentTrack>> {
        let user = username.or(self.username.as_deref()).ok_or_else(|| AppError::Configuration("no lastfm username provided or configured".into()))?;
        let limit = limit.clamp(1, 200).to_string();
        let page_str = page.to_string();
        let mut params: Vec<(&str, &str)> = vec![("user", user), ("limit", &limit), ("page", &page_str)];
        let from_str;
        let to_str;
        if let Some(from) = from_time {
            from_str = from.timestamp().to_string();
            params.push(("from", &from_str));
        }
        if let Some(to) = to_time {
            to_str = to.timestamp().to_string();
            params.push(("to", &to_str));
        }

        let body = self.call("user.getRecentTracks", &params).await?;
        let parsed: RecentTracksResponse = serde_json::from_value(body).map_err(AppError::from)?;
        Ok(parsed
            .recenttracks
            .track
            .into_iter()
            .filter_map(|t| t.into_recent_track(page))
            .collect())
    }
}

/// One scrobble from `user.getRecentTracks`, pre-conversion to
/// [`TrackPlay`] (which needs a resolved canonical `track_id`).
#[derive(Debug, Clone)]
pub struct RecentTrack {
    pub artist_name: String,
    pub track_name: String,
    pub album_name: Option<String>,
    pub mbid: Option<String>,
    pub scrobbled_at: DateTime<Utc>,
    pub api_page: u32,
}

impl RecentTrack {
    pub fn into_track_play(self, track_id: i64) -> TrackPlay {
        TrackPlay::new(track_id, "lastfm", self.scrobbled_at)
    }
}

#[async_trait]
impl TargetConnector for LastFmConnector {
    fn connector_name(&self) -> &'static str {
        "lastfm"
    }

    async fn lookup_by_mbid(&self, mbid: &str) -> Result<Option<ConnectorMatch>> {
        let info = self.get_lastfm_track_info(None, None, Some(mbid), None).await?;
        Ok(info_to_connector_match(info))
    }

    async fn lookup_by_artist_title(&self, artists: &[Artist], title: &str) -> Result<Option<ConnectorMatch>> {
        let info = self.get_track_info_multi_artist(artists, title, None).await?;
        Ok(info_to_connector_match(info))
    }
}

fn info_to_connector_match(info: LastFmTrackInfo) -> Option<ConnectorMatch> {
    if info.is_empty() {
        return None;
    }
    let metadata = serde_json::to_value(&LastFmMetadataView {
        lastfm_user_playcount: info.lastfm_user_playcount,
        lastfm_global_playcount: info.lastfm_global_playcount,
        lastfm_listeners: info.lastfm_listeners,
    })
    .ok();
    Some(ConnectorMatch {
        connector_id: info.lastfm_url.clone()?,
        metadata,
        duration_ms: info.lastfm_duration,
        metric_type: Some("lastfm_user_playcount".to_string()),
        metric_value: info.lastfm_user_playcount.map(|v| v as f64),
    })
}

#[derive(serde::Serialize)]
struct LastFmMetadataView {
    lastfm_user_playcount: Option<i64>,
    lastfm_global_playcount: Option<i64>,
    lastfm_listeners: Option<i64>,
}

fn parse_track_info(body: &JsonValue) -> LastFmTrackInfo {
    let track = match body.get("track") {
        Some(t) => t,
        None => return LastFmTrackInfo::default(),
    };
    let str_field = |key: &str| track.get(key).and_then(JsonValue::as_str).map(str::to_string);
    let int_field = |key: &str| {
        track
            .get(key)
            .and_then(|v| v.as_str().and_then(|s| s.parse::<i64>().ok()).or_else(|| v.as_i64()))
    };
    LastFmTrackInfo {
        lastfm_title: str_field("name"),
        lastfm_mbid: str_field("mbid"),
        lastfm_url: str_field("url"),
        lastfm_duration: int_field("duration"),
        lastfm_artist_name: track.get("artist").and_then(|a| a.get("name")).and_then(JsonValue::as_str).map(str::to_string),
        lastfm_artist_mbid: track.get("artist").and_then(|a| a.get("mbid")).and_then(JsonValue::as_str).map(str::to_string),
        lastfm_album_name: track.get("album").and_then(|a| a.get("title")).and_then(JsonValue::as_str).map(str::to_string),
        lastfm_album_mbid: track.get("album").and_then(|a| a.get("mbid")).and_then(JsonValue::as_str).map(str::to_string),
        lastfm_user_playcount: int_field("userplaycount"),
        lastfm_global_playcount: int_field("playcount"),
        lastfm_listeners: int_field("listeners"),
        lastfm_user_loved: track.get("userloved").and_then(JsonValue::as_str).map(|s| s == "1").unwrap_or(false),
    }
}

#[derive(Debug, Deserialize)]
struct RecentTracksResponse {
    recenttracks: RecentTracksBody,
}

#[derive(Debug, Deserialize)]
struct RecentTracksBody {
    track: Vec<RawRecentTrack>,
}

#[derive(Debug, Deserialize)]
struct RawRecentTrack {
    name: String,
    artist: RawRecentArtist,
    album: Option<RawRecentAlbum>,
    mbid: Option<String>,
    #[serde(default)]
    date: Option<RawRecentDate>,
}

#[derive(Debug, Deserialize)]
struct RawRecentArtist {
    #[serde(rename = "#text")]
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawRecentAlbum {
    #[serde(rename = "#text")]
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawRecentDate {
    uts: String,
}

impl RawRecentTrack {
    /// `None` for the "now playing" entry, which has no `date`.
    fn into_recent_track(self, page: u32) -> Option<RecentTrack> {
        let uts: i64 = self.date?.uts.parse().ok()?;
        let scrobbled_at = Utc.timestamp_opt(uts, 0).single()?;
        Some(RecentTrack {
            artist_name: self.artist.name,
            track_name: self.name,
            album_name: self.album.map(|a| a.name),
            mbid: self.mbid.filter(|m| !m.is_empty()),
            scrobbled_at,
            api_page: page,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signing_is_order_independent() {
        let connector = LastFmConnector {
            client: Client::new(),
            api_key: "key".into(),
            api_secret: "secret".into(),
            username: None,
            password: None,
            rate_limiter: RateLimiter::per_second(5),
        };
        let a = connector.sign(&[("b", "2"), ("a", "1")]);
        let b = connector.sign(&[("a", "1"), ("b", "2")]);
        assert_eq!(a, b);
    }

    #[test]
    fn track_info_is_empty_without_a_url() {
        assert!(LastFmTrackInfo::default().is_empty());
    }
}
