// RapidAPI backend - third-party TikTok download API
//
// The upstream response shape is not stable, so the body is decoded as a
// generic JSON value and probed with an ordered list of shape rules.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::downloader::errors::ExtractionError;
use crate::downloader::models::ResolvedMedia;
use crate::downloader::traits::ExtractionBackend;
use crate::downloader::utils::url_digest;

pub const DEFAULT_API_HOST: &str = "tiktok-video-downloader-api.p.rapidapi.com";

/// Per-request timeout for the API call
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// One known response shape: returns the object that carries `url`
struct ShapeRule {
    name: &'static str,
    probe: fn(&Value) -> Option<&Value>,
}

fn video_array(root: &Value) -> Option<&Value> {
    root.get("video")?.as_array()?.first()
}

fn video_object(root: &Value) -> Option<&Value> {
    root.get("video").filter(|v| v.is_object())
}

fn top_level(root: &Value) -> Option<&Value> {
    Some(root)
}

fn data_video_array(root: &Value) -> Option<&Value> {
    root.get("data").and_then(video_array)
}

fn data_video_object(root: &Value) -> Option<&Value> {
    root.get("data").and_then(video_object)
}

fn data_top_level(root: &Value) -> Option<&Value> {
    root.get("data").filter(|v| v.is_object())
}

/// Tried in order; the first rule that yields a non-empty `url` wins
const SHAPE_RULES: &[ShapeRule] = &[
    ShapeRule { name: "video[0].url", probe: video_array },
    ShapeRule { name: "video.url", probe: video_object },
    ShapeRule { name: "url", probe: top_level },
    ShapeRule { name: "data.video[0].url", probe: data_video_array },
    ShapeRule { name: "data.video.url", probe: data_video_object },
    ShapeRule { name: "data.url", probe: data_top_level },
];

const ID_KEYS: &[&str] = &["id", "video_id", "aweme_id"];
const TITLE_KEYS: &[&str] = &["title", "desc", "description"];

/// Media location found in an API response
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct LocatedMedia<'a> {
    pub rule: &'static str,
    pub url: &'a str,
    pub id: Option<&'a str>,
    pub title: Option<&'a str>,
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key)?.as_str().map(str::trim).filter(|s| !s.is_empty())
}

/// First non-empty string under any of `keys`, nearest scope first
fn first_field<'a>(scopes: &[&'a Value], keys: &[&str]) -> Option<&'a str> {
    scopes
        .iter()
        .flat_map(|scope| keys.iter().map(move |key| (scope, key)))
        .find_map(|(scope, key)| str_field(*scope, key))
}

/// Apply the shape rules to a decoded response body
pub(crate) fn locate_media(root: &Value) -> Option<LocatedMedia<'_>> {
    SHAPE_RULES.iter().find_map(|rule| {
        let holder = (rule.probe)(root)?;
        let url = str_field(holder, "url")?;

        let mut scopes = vec![holder, root];
        if let Some(data) = root.get("data") {
            scopes.push(data);
        }

        Some(LocatedMedia {
            rule: rule.name,
            url,
            id: first_field(&scopes, ID_KEYS),
            title: first_field(&scopes, TITLE_KEYS),
        })
    })
}

/// Backend calling `GET https://{api_host}/media?videoUrl=...`
pub struct RapidApiBackend {
    client: reqwest::Client,
    api_key: String,
    api_host: String,
    base_url: String,
}

impl RapidApiBackend {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>, api_host: impl Into<String>) -> Self {
        let api_host = api_host.into();
        Self {
            client,
            api_key: api_key.into(),
            base_url: format!("https://{}", api_host),
            api_host,
        }
    }

    /// Point the backend at a different origin (the `x-rapidapi-host` header is unchanged)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl ExtractionBackend for RapidApiBackend {
    fn name(&self) -> &'static str {
        "rapidapi"
    }

    async fn resolve(&self, url: &str) -> Result<ResolvedMedia, ExtractionError> {
        let response = self
            .client
            .get(format!("{}/media", self.base_url))
            .query(&[("videoUrl", url)])
            .header("x-rapidapi-key", &self.api_key)
            .header("x-rapidapi-host", &self.api_host)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ExtractionError::TimedOut(REQUEST_TIMEOUT_SECS)
                } else {
                    ExtractionError::Unreachable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractionError::Status(status.as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ExtractionError::Parse(e.to_string()))?;

        let located = locate_media(&body).ok_or(ExtractionError::NoMediaLocation)?;
        debug!(backend = self.name(), rule = located.rule, "media location found");

        let id = located
            .id
            .map(str::to_string)
            .or_else(|| numeric_id(&body))
            .unwrap_or_else(|| url_digest(url));

        Ok(ResolvedMedia::new(self.name(), located.url, &id, "mp4")
            .with_title(located.title.map(str::to_string)))
    }
}

/// Some API revisions return the id as a number
fn numeric_id(root: &Value) -> Option<String> {
    let scopes = [Some(root), root.get("data")];
    scopes
        .into_iter()
        .flatten()
        .flat_map(|scope| ID_KEYS.iter().filter_map(move |key| scope.get(*key)?.as_u64()))
        .next()
        .map(|n| n.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_video_array_shape() {
        let body = json!({"video": [{"url": "https://cdn/a.mp4"}, {"url": "https://cdn/b.mp4"}], "id": "1"});
        let found = locate_media(&body).unwrap();
        assert_eq!(found.url, "https://cdn/a.mp4");
        assert_eq!(found.rule, "video[0].url");
        assert_eq!(found.id, Some("1"));
    }

    #[test]
    fn test_video_object_shape() {
        let body = json!({"video": {"url": "https://cdn/a.mp4", "title": "t"}});
        let found = locate_media(&body).unwrap();
        assert_eq!(found.rule, "video.url");
        assert_eq!(found.title, Some("t"));
    }

    #[test]
    fn test_top_level_url_shape() {
        let body = json!({"url": "https://cdn/a.mp4", "desc": "dance"});
        let found = locate_media(&body).unwrap();
        assert_eq!(found.rule, "url");
        assert_eq!(found.title, Some("dance"));
    }

    #[test]
    fn test_nested_data_shapes() {
        let arr = json!({"data": {"video": [{"url": "https://cdn/a.mp4"}], "aweme_id": "77"}});
        let found = locate_media(&arr).unwrap();
        assert_eq!(found.rule, "data.video[0].url");
        assert_eq!(found.id, Some("77"));

        let obj = json!({"data": {"video": {"url": "https://cdn/b.mp4"}}});
        assert_eq!(locate_media(&obj).unwrap().rule, "data.video.url");

        let flat = json!({"data": {"url": "https://cdn/c.mp4"}});
        assert_eq!(locate_media(&flat).unwrap().rule, "data.url");
    }

    #[test]
    fn test_earlier_rule_wins() {
        let body = json!({"video": [{"url": "https://cdn/first.mp4"}], "url": "https://cdn/second.mp4"});
        assert_eq!(locate_media(&body).unwrap().url, "https://cdn/first.mp4");
    }

    #[test]
    fn test_empty_entries_fall_through() {
        let body = json!({"video": [], "data": {"url": "https://cdn/c.mp4"}});
        assert_eq!(locate_media(&body).unwrap().url, "https://cdn/c.mp4");

        let body = json!({"video": {"url": ""}, "url": "https://cdn/d.mp4"});
        assert_eq!(locate_media(&body).unwrap().url, "https://cdn/d.mp4");
    }

    #[test]
    fn test_no_location() {
        assert_eq!(locate_media(&json!({"status": "error"})), None);
        assert_eq!(locate_media(&json!([1, 2, 3])), None);
        assert_eq!(locate_media(&json!({"data": "nope"})), None);
    }

    #[test]
    fn test_numeric_id() {
        assert_eq!(numeric_id(&json!({"data": {"id": 7301}})), Some("7301".to_string()));
        assert_eq!(numeric_id(&json!({"id": "x"})), None);
    }
}
