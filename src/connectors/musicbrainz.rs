use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::domain::{Artist, Track};
use crate::error::{classify_http_status, AppError, Result};

const MUSICBRAINZ_API_BASE: &str = "https://musicbrainz.org/ws/2";
/// Enforced floor between requests; MusicBrainz's own limit is 1 req/s,
/// the extra 100ms is slack (spec §4.D).
const RATE_LIMIT_DELAY: Duration = Duration::from_millis(1100);

/// MusicBrainz client (spec §4.D). Extends the teacher's
/// `services/musicbrainz.rs` (same serial last-call-timestamp rate
/// limiter, same `execute_search`/503-vs-other-4xx classification)
/// with recording-level lookups the teacher never needed for its
/// album-only cover-art workflow: `lookup_recording_by_mbid` and
/// `batch_isrc_lookup`.
#[derive(Clone)]
pub struct MusicBrainzConnector {
    client: Client,
    last_request: Arc<Mutex<Option<Instant>>>,
}

#[derive(Debug, Deserialize)]
struct RecordingSearchResponse {
    recordings: Vec<RawRecording>,
}

#[derive(Debug, Deserialize)]
struct RawRecording {
    id: String,
    title: String,
    #[serde(rename = "artist-credit", default)]
    artist_credit: Vec<RawArtistCredit>,
    #[serde(default)]
    isrcs: Vec<String>,
    #[serde(default)]
    releases: Vec<RawRelease>,
}

#[derive(Debug, Deserialize)]
struct RawArtistCredit {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawRelease {
    title: String,
    #[serde(default)]
    date: Option<String>,
}

impl RawRecording {
    fn into_track(self) -> Option<Track> {
        let artists: Vec<Artist> = self.artist_credit.into_iter().filter_map(|a| Artist::new(a.name).ok()).collect();
        if artists.is_empty() {
            return None;
        }
        let mut track = Track::new(self.title, artists).ok()?;
        if let Some(release) = self.releases.first() {
            track = track.with_album(release.title.clone());
        }
        if let Some(isrc) = self.isrcs.first() {
            track = track.with_isrc(isrc.clone());
        }
        track = track.with_connector_track_id("musicbrainz", self.id);
        Some(track)
    }
}

impl MusicBrainzConnector {
    pub fn new(user_agent: String) -> Self {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build()
            .expect("http client configuration is static and valid");
        Self {
            client,
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    async fn wait_for_rate_limit(&self) {
        let mut last_request = self.last_request.lock().await;
        if let Some(last) = *last_request {
            let elapsed = last.elapsed();
            if elapsed < RATE_LIMIT_DELAY {
                sleep(RATE_LIMIT_DELAY - elapsed).await;
            }
        }
        *last_request = Some(Instant::now());
    }

    async fn execute_recording_search(&self, query: &str) -> Result<Vec<RawRecording>> {
        self.wait_for_rate_limit().await;
        let url = format!("{MUSICBRAINZ_API_BASE}/recording?query={}&fmt=json&limit=10", urlencoding::encode(query));
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            if response.status().as_u16() == 503 {
                tracing::warn!("musicbrainz rate limit hit, backing off");
                return Err(AppError::TransientExternal("musicbrainz rate limit exceeded".into()));
            }
            return Err(classify_http_status(response.status(), "musicbrainz recording search"));
        }

        let data: RecordingSearchResponse = response.json().await?;
        Ok(data.recordings)
    }

    /// Looks up a recording by artist/title, the generalized form of
    /// the teacher's release-group search scoped to tracks instead of
    /// albums.
    pub async fn search_recording(&self, artist: &str, title: &str) -> Result<Vec<Track>> {
        let query = format!("artist:\"{}\" AND recording:\"{}\"", normalize_artist(artist), title);
        let recordings = self.execute_recording_search(&query).await?;
        Ok(recordings.into_iter().filter_map(RawRecording::into_track).collect())
    }

    /// Direct MBID lookup (new: the teacher only ever searched by
    /// artist/album, never resolved a known recording id).
    pub async fn lookup_recording_by_mbid(&self, mbid: &str) -> Result<Option<Track>> {
        self.wait_for_rate_limit().await;
        let url = format!("{MUSICBRAINZ_API_BASE}/recording/{mbid}?fmt=json&inc=artist-credits+isrcs+releases");
        let response = self.client.get(&url).send().await?;
        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(classify_http_status(response.status(), "musicbrainz recording lookup"));
        }
        let raw: RawRecording = response.json().await?;
        Ok(raw.into_track())
    }

    /// Looks up a batch of ISRCs, one MusicBrainz request per code,
    /// respecting the connector's own 1.1s inter-request floor rather
    /// than the generic batch processor's concurrency (spec §4.D: "new
    /// — batches ISRC lookups with the connector's own 1.1s minimum").
    pub async fn batch_isrc_lookup(&self, isrcs: &[String]) -> Result<std::collections::HashMap<String, Vec<Track>>> {
        let mut results = std::collections::HashMap::with_capacity(isrcs.len());
        for isrc in isrcs {
            self.wait_for_rate_limit().await;
            let url = format!("{MUSICBRAINZ_API_BASE}/isrc/{isrc}?fmt=json&inc=artist-credits+releases");
            let response = self.client.get(&url).send().await?;
            if response.status().as_u16() == 404 {
                results.insert(isrc.clone(), Vec::new());
                continue;
            }
            if !response.status().is_success() {
                return Err(classify_http_status(response.status(), "musicbrainz isrc lookup"));
            }
            let data: RecordingSearchResponse = response.json().await?;
            let tracks = data.recordings.into_iter().filter_map(RawRecording::into_track).collect();
            results.insert(isrc.clone(), tracks);
        }
        Ok(results)
    }
}

fn normalize_artist(artist: &str) -> String {
    let mut normalized = artist.to_string();
    if let Some(pos) = normalized.find(" feat.") {
        normalized.truncate(pos);
    }
    if let Some(pos) = normalized.find(" ft.") {
        normalized.truncate(pos);
    }
    normalized.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_artist_strips_featuring_credits() {
        assert_eq!(normalize_artist("Artist feat. Someone"), "Artist");
        assert_eq!(normalize_artist("Artist ft. Someone"), "Artist");
    }

    #[test]
    fn raw_recording_without_artist_credit_is_dropped() {
        let raw = RawRecording {
            id: "mbid".into(),
            title: "Title".into(),
            artist_credit: vec![],
            isrcs: vec![],
            releases: vec![],
        };
        assert!(raw.into_track().is_none());
    }
}
