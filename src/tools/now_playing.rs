//! Last.fm now-playing lookup
//!
//! Used two ways: as a tool the model can call mid-conversation, and by the
//! status widget endpoint. Both go through [`fetch_now_playing`].

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{Tool, ToolError};

const API_URL: &str = "https://ws.audioscrobbler.com/2.0/";

#[derive(Debug, Clone)]
pub struct LastFmConfig {
    pub api_key: String,
    pub username: String,
}

/// A track being scrobbled right now.
#[derive(Debug, Clone, Serialize)]
pub struct NowPlaying {
    pub artist: String,
    pub song: String,
    pub album: String,
    pub image_url: Option<String>,
}

// Last.fm wire shapes. The odd field names ("@attr", "#text") are theirs.

#[derive(Debug, Default, Deserialize)]
struct RecentTracksResponse {
    #[serde(default)]
    recenttracks: RecentTracks,
}

#[derive(Debug, Default, Deserialize)]
struct RecentTracks {
    #[serde(default)]
    track: Vec<TrackEntry>,
}

#[derive(Debug, Deserialize)]
struct TrackEntry {
    name: String,
    artist: TaggedText,
    album: TaggedText,
    #[serde(default)]
    image: Vec<TrackImage>,
    #[serde(rename = "@attr", default)]
    attr: Option<TrackAttr>,
}

#[derive(Debug, Deserialize)]
struct TaggedText {
    #[serde(rename = "#text")]
    text: String,
}

#[derive(Debug, Deserialize)]
struct TrackImage {
    size: String,
    #[serde(rename = "#text")]
    url: String,
}

#[derive(Debug, Default, Deserialize)]
struct TrackAttr {
    #[serde(default)]
    nowplaying: Option<String>,
}

/// Look up the most recent scrobble; `None` when nothing is playing.
pub async fn fetch_now_playing(
    client: &Client,
    config: &LastFmConfig,
) -> Result<Option<NowPlaying>, ToolError> {
    let response = client
        .get(API_URL)
        .query(&[
            ("method", "user.getrecenttracks"),
            ("user", config.username.as_str()),
            ("api_key", config.api_key.as_str()),
            ("format", "json"),
            ("limit", "1"),
        ])
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(ToolError::Endpoint {
            status: response.status().as_u16(),
            message: "Failed to fetch data from Last.fm.".to_string(),
        });
    }

    let body: RecentTracksResponse = response.json().await?;
    Ok(now_playing_from(body))
}

fn now_playing_from(body: RecentTracksResponse) -> Option<NowPlaying> {
    let track = body.recenttracks.track.into_iter().next()?;

    let playing = track
        .attr
        .as_ref()
        .and_then(|a| a.nowplaying.as_deref())
        == Some("true");
    if !playing {
        return None;
    }

    Some(NowPlaying {
        artist: track.artist.text,
        song: track.name,
        album: track.album.text,
        image_url: track
            .image
            .into_iter()
            .find(|i| i.size == "large")
            .map(|i| i.url),
    })
}

pub struct NowPlayingTool {
    client: Client,
    config: Option<LastFmConfig>,
}

impl NowPlayingTool {
    pub fn new(client: Client, config: Option<LastFmConfig>) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl Tool for NowPlayingTool {
    fn name(&self) -> &str {
        "get_now_playing"
    }

    fn description(&self) -> &str {
        "Get the song the site owner is currently playing on Last.fm."
    }

    // All failure modes answer softly; the music lookup is never worth a
    // hard-failed turn on its own.
    async fn run(&self, _args: &Value) -> Result<Value, ToolError> {
        let Some(config) = &self.config else {
            return Ok(json!({ "error": "Server not configured for Last.fm API." }));
        };

        match fetch_now_playing(&self.client, config).await {
            Ok(Some(track)) => Ok(json!({
                "artist": track.artist,
                "song": track.song,
                "album": track.album
            })),
            Ok(None) => Ok(json!({ "status": "Not currently playing anything." })),
            Err(err) => Ok(json!({ "error": format!("Error connecting to Last.fm: {err}") })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(nowplaying: Option<&str>) -> RecentTracksResponse {
        let mut track = json!({
            "name": "Starlight",
            "artist": { "#text": "Muse" },
            "album": { "#text": "Black Holes and Revelations" },
            "image": [
                { "size": "small", "#text": "https://img/s.png" },
                { "size": "large", "#text": "https://img/l.png" }
            ]
        });
        if let Some(flag) = nowplaying {
            track["@attr"] = json!({ "nowplaying": flag });
        }
        serde_json::from_value(json!({ "recenttracks": { "track": [track] } })).unwrap()
    }

    #[test]
    fn detects_now_playing_track() {
        let playing = now_playing_from(fixture(Some("true"))).unwrap();
        assert_eq!(playing.artist, "Muse");
        assert_eq!(playing.song, "Starlight");
        assert_eq!(playing.album, "Black Holes and Revelations");
        assert_eq!(playing.image_url.as_deref(), Some("https://img/l.png"));
    }

    #[test]
    fn recent_but_not_playing_is_none() {
        assert!(now_playing_from(fixture(None)).is_none());
        assert!(now_playing_from(fixture(Some("false"))).is_none());
    }

    #[test]
    fn empty_track_list_is_none() {
        let body: RecentTracksResponse =
            serde_json::from_value(json!({ "recenttracks": { "track": [] } })).unwrap();
        assert!(now_playing_from(body).is_none());

        let body: RecentTracksResponse = serde_json::from_value(json!({})).unwrap();
        assert!(now_playing_from(body).is_none());
    }

    #[tokio::test]
    async fn unconfigured_tool_answers_softly() {
        let tool = NowPlayingTool::new(Client::new(), None);
        let result = tool.run(&json!({})).await.unwrap();
        assert_eq!(result["error"], "Server not configured for Last.fm API.");
    }
}
