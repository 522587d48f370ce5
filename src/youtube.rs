use std::collections::HashSet;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::emotion::Emotion;
use crate::knowledge::MusicKnowledge;
use crate::prefs::PreferenceProfile;

/// Results requested per search term.
const RESULTS_PER_TERM: usize = 5;

/// Final cap after merging all terms.
const MAX_RESULTS: usize = 10;

/// YouTube category id for Music.
const MUSIC_CATEGORY: &str = "10";

/// One video found on YouTube, with popularity counters.
#[derive(Debug, Clone, Serialize)]
pub struct Video {
    pub id: String,
    pub title: String,
    pub channel: String,
    pub thumbnail: String,
    pub url: String,
    pub views: u64,
    pub likes: u64,
}

/// Result of one emotion-driven search run.
#[derive(Debug, Serialize)]
pub struct SearchResult {
    pub emotion: Emotion,
    pub generated_at: String,
    /// Deduplicated, ranked by (views, likes) descending, at most 10.
    pub videos: Vec<Video>,
    pub terms_searched: usize,
    pub terms_failed: usize,
}

/// YouTube Data API v3 search response.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    title: String,
    #[serde(rename = "channelTitle")]
    channel_title: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Deserialize, Default)]
struct Thumbnails {
    medium: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    #[serde(default)]
    statistics: Statistics,
}

#[derive(Debug, Deserialize, Default)]
struct Statistics {
    #[serde(rename = "viewCount")]
    view_count: Option<String>,
    #[serde(rename = "likeCount")]
    like_count: Option<String>,
}

/// Thin client for the YouTube Data API v3.
pub struct YouTubeClient {
    api_key: String,
    rate_limit_ms: u64,
}

impl YouTubeClient {
    pub fn new(api_key: String, rate_limit_ms: u64) -> Self {
        Self { api_key, rate_limit_ms }
    }

    /// Search for music videos matching an emotion, biased toward the
    /// profile's favorite genres.
    ///
    /// Each of the emotion's search terms is queried on its own; a failing
    /// term is logged and contributes zero items, so quota exhaustion or a
    /// network hiccup degrades the result instead of aborting it. Merged
    /// results are deduplicated by video id (first occurrence wins), ranked
    /// by views with likes as tie-break, and capped at 10.
    pub fn search_for_emotion(
        &self,
        emotion: Emotion,
        knowledge: &MusicKnowledge,
        profile: &PreferenceProfile,
    ) -> SearchResult {
        let generated_at = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let Some(music) = knowledge.profile(emotion) else {
            log::warn!("No music profile for {emotion}, nothing to search");
            return SearchResult {
                emotion,
                generated_at,
                videos: Vec::new(),
                terms_searched: 0,
                terms_failed: 0,
            };
        };

        let mut gathered: Vec<Video> = Vec::new();
        let mut terms_failed = 0;

        for (i, term) in music.search_terms.iter().enumerate() {
            if i > 0 && self.rate_limit_ms > 0 {
                thread::sleep(Duration::from_millis(self.rate_limit_ms));
            }
            let query = build_query(term, profile);
            log::info!("Searching YouTube for \"{query}\"");
            match self.search_videos(&query) {
                Ok(videos) => gathered.extend(videos),
                Err(e) => {
                    terms_failed += 1;
                    log::warn!("Search term \"{term}\" failed: {e:#}");
                }
            }
        }

        SearchResult {
            emotion,
            generated_at,
            videos: dedup_and_rank(gathered, MAX_RESULTS),
            terms_searched: music.search_terms.len(),
            terms_failed,
        }
    }

    /// One search call, plus one statistics call per returned item.
    fn search_videos(&self, query: &str) -> Result<Vec<Video>> {
        let url = format!(
            "https://www.googleapis.com/youtube/v3/search?\
             part=snippet&type=video&videoCategoryId={MUSIC_CATEGORY}&\
             order=relevance&maxResults={RESULTS_PER_TERM}&\
             q={}&key={}",
            urlencoding::encode(query),
            self.api_key,
        );

        let resp: SearchResponse = ureq::get(&url)
            .call()
            .with_context(|| format!("HTTP request failed for \"{query}\""))?
            .body_mut()
            .read_json()
            .with_context(|| format!("Failed to parse search response for \"{query}\""))?;

        let mut videos = Vec::new();
        for item in resp.items {
            // Non-video hits carry no video id
            let Some(id) = item.id.video_id else {
                continue;
            };
            let (views, likes) = self
                .fetch_statistics(&id)
                .with_context(|| format!("Statistics lookup failed for video {id}"))?;

            videos.push(Video {
                url: format!("https://www.youtube.com/watch?v={id}"),
                id,
                title: item.snippet.title,
                channel: item.snippet.channel_title,
                thumbnail: item
                    .snippet
                    .thumbnails
                    .medium
                    .map(|t| t.url)
                    .unwrap_or_default(),
                views,
                likes,
            });
        }
        Ok(videos)
    }

    fn fetch_statistics(&self, video_id: &str) -> Result<(u64, u64)> {
        let url = format!(
            "https://www.googleapis.com/youtube/v3/videos?part=statistics&id={video_id}&key={}",
            self.api_key,
        );

        let resp: VideosResponse = ureq::get(&url)
            .call()
            .context("HTTP request failed")?
            .body_mut()
            .read_json()
            .context("Failed to parse statistics response")?;

        let stats = resp
            .items
            .into_iter()
            .next()
            .map(|v| v.statistics)
            .unwrap_or_default();
        Ok((parse_count(stats.view_count), parse_count(stats.like_count)))
    }
}

/// Append the favorite genres as a disjunctive filter, the query shape the
/// search service treats as "any of these".
fn build_query(term: &str, profile: &PreferenceProfile) -> String {
    if profile.favorite_genres.is_empty() {
        return term.to_string();
    }
    let genres: Vec<&str> = profile.favorite_genres.iter().map(|g| g.as_str()).collect();
    format!("{term} ({})", genres.join(" OR "))
}

/// Popularity counters arrive as JSON strings; absent or malformed counts
/// read as zero.
fn parse_count(raw: Option<String>) -> u64 {
    raw.and_then(|s| s.parse().ok()).unwrap_or(0)
}

/// Drop duplicate ids (first occurrence wins), rank by views then likes
/// descending, keep the top `limit`.
fn dedup_and_rank(videos: Vec<Video>, limit: usize) -> Vec<Video> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut unique: Vec<Video> = Vec::with_capacity(videos.len());
    for video in videos {
        if seen.insert(video.id.clone()) {
            unique.push(video);
        }
    }
    unique.sort_by(|a, b| (b.views, b.likes).cmp(&(a.views, a.likes)));
    unique.truncate(limit);
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(id: &str, views: u64, likes: u64) -> Video {
        Video {
            id: id.to_string(),
            title: format!("title-{id}"),
            channel: "channel".to_string(),
            thumbnail: String::new(),
            url: format!("https://www.youtube.com/watch?v={id}"),
            views,
            likes,
        }
    }

    #[test]
    fn test_dedup_first_occurrence_wins() {
        let mut duplicate = video("a", 999, 999);
        duplicate.title = "second copy".to_string();
        let result = dedup_and_rank(vec![video("a", 10, 1), duplicate, video("b", 5, 0)], 10);

        assert_eq!(result.len(), 2);
        let a = result.iter().find(|v| v.id == "a").unwrap();
        assert_eq!(a.title, "title-a");
        assert_eq!(a.views, 10);
    }

    #[test]
    fn test_rank_by_views_then_likes() {
        let result = dedup_and_rank(
            vec![
                video("low", 10, 500),
                video("high", 1000, 0),
                video("mid-more-likes", 100, 9),
                video("mid", 100, 3),
            ],
            10,
        );
        let order: Vec<&str> = result.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(order, vec!["high", "mid-more-likes", "mid", "low"]);
    }

    #[test]
    fn test_truncates_to_limit() {
        let videos = (0..30).map(|i| video(&format!("v{i}"), i, 0)).collect();
        let result = dedup_and_rank(videos, MAX_RESULTS);
        assert_eq!(result.len(), 10);
        assert_eq!(result[0].views, 29);
    }

    #[test]
    fn test_build_query_without_favorites() {
        let profile = PreferenceProfile::default();
        assert_eq!(build_query("upbeat music", &profile), "upbeat music");
    }

    #[test]
    fn test_build_query_appends_favorites_as_disjunction() {
        let mut profile = PreferenceProfile::default();
        profile.favorite_genres.insert("Pop".to_string());
        profile.favorite_genres.insert("Jazz".to_string());
        // BTreeSet iteration keeps the filter order stable
        assert_eq!(build_query("happy songs", &profile), "happy songs (Jazz OR Pop)");
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count(Some("1234".to_string())), 1234);
        assert_eq!(parse_count(Some("not a number".to_string())), 0);
        assert_eq!(parse_count(None), 0);
    }

    #[test]
    fn test_search_response_skips_non_video_items() {
        let json = r#"{
            "items": [
                {
                    "id": {"kind": "youtube#video", "videoId": "abc123"},
                    "snippet": {
                        "title": "Feel Good Mix",
                        "channelTitle": "MixChannel",
                        "thumbnails": {"medium": {"url": "https://i.ytimg.com/vi/abc123/mq.jpg"}}
                    }
                },
                {
                    "id": {"kind": "youtube#channel", "channelId": "ch9"},
                    "snippet": {"title": "A Channel", "channelTitle": "A Channel"}
                }
            ]
        }"#;
        let resp: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.items.len(), 2);
        assert_eq!(resp.items[0].id.video_id.as_deref(), Some("abc123"));
        assert!(resp.items[1].id.video_id.is_none());
        assert!(resp.items[1].snippet.thumbnails.medium.is_none());
    }

    #[test]
    fn test_statistics_response_counts_are_strings() {
        let json = r#"{"items": [{"statistics": {"viewCount": "5021", "favoriteCount": "0"}}]}"#;
        let resp: VideosResponse = serde_json::from_str(json).unwrap();
        let stats = resp.items.into_iter().next().unwrap().statistics;
        assert_eq!(parse_count(stats.view_count), 5021);
        assert_eq!(parse_count(stats.like_count), 0);
    }

    #[test]
    fn test_uncovered_emotion_searches_nothing() {
        let knowledge = MusicKnowledge::builtin().unwrap();
        let client = YouTubeClient::new("test-key".to_string(), 0);
        let result =
            client.search_for_emotion(Emotion::Disgust, &knowledge, &PreferenceProfile::default());
        assert!(result.videos.is_empty());
        assert_eq!(result.terms_searched, 0);
        assert_eq!(result.terms_failed, 0);
    }
}
