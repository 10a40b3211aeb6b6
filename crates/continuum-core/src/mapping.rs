//! JSON to data model mapping
//!
//! Translates Vimeo API records into [`Video`], [`VideoPreset`] and
//! [`Credit`] values. Batch mapping is best-effort: a record missing a
//! required field is dropped and counted, the rest of the page is kept.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{FeedError, Result};
use crate::types::{Credit, Video, VideoPreset};

/// Outcome of mapping one page of the channel listing
#[derive(Debug, Clone, PartialEq)]
pub struct MappedPage {
    /// Valid videos in provider order
    pub videos: Vec<Video>,
    /// Page to request next, `None` at the end of the feed
    pub next_page: Option<u32>,
    /// Number of records that failed mapping
    pub dropped: usize,
}

type Record = Map<String, Value>;

fn as_record<'a>(value: &'a Value, what: &str) -> Result<&'a Record> {
    value
        .as_object()
        .ok_or_else(|| FeedError::MalformedResponse(format!("{} is not an object", what)))
}

fn required_str<'a>(record: &'a Record, key: &str) -> Result<&'a str> {
    record
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| FeedError::MalformedResponse(format!("missing field `{}`", key)))
}

fn optional_u64(record: &Record, key: &str) -> Option<u64> {
    record.get(key).and_then(Value::as_u64)
}

fn optional_u32(record: &Record, key: &str) -> Option<u32> {
    optional_u64(record, key).and_then(|n| u32::try_from(n).ok())
}

/// Extract the identifier from a resource URI such as `/videos/76979871`
pub fn identifier_from_uri(uri: &str) -> Option<&str> {
    uri.split('?')
        .next()
        .and_then(|path| path.trim_end_matches('/').rsplit('/').next())
        .filter(|id| !id.is_empty())
}

/// Pick the thumbnail for the preferred display width
///
/// Chooses the narrowest picture at least `preferred_width` wide, or the
/// widest one when none is large enough.
fn select_image(record: &Record, preferred_width: u32) -> Option<String> {
    let sizes = record
        .get("pictures")
        .and_then(|p| p.get("sizes"))
        .and_then(Value::as_array)?;

    let candidates: Vec<(u32, &str)> = sizes
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|size| {
            let link = size.get("link").and_then(Value::as_str)?;
            Some((optional_u32(size, "width").unwrap_or(0), link))
        })
        .collect();

    candidates
        .iter()
        .filter(|(width, _)| *width >= preferred_width)
        .min_by_key(|(width, _)| *width)
        .or_else(|| candidates.iter().max_by_key(|(width, _)| *width))
        .map(|(_, link)| link.to_string())
}

/// Map one file record into a preset
pub fn map_preset(value: &Value, video: &str, duration: u64) -> Result<VideoPreset> {
    let record = as_record(value, "preset")?;

    Ok(VideoPreset {
        video: video.to_string(),
        width: optional_u32(record, "width"),
        height: optional_u32(record, "height"),
        size: optional_u64(record, "size").unwrap_or(0),
        url: required_str(record, "link")?.to_string(),
        duration,
        quality: required_str(record, "quality")?.to_string(),
    })
}

/// Map one video record
///
/// `idx` is the feed position assigned by the caller.
pub fn map_video(value: &Value, idx: u64, preferred_image_width: u32) -> Result<Video> {
    let record = as_record(value, "video")?;

    let uri = required_str(record, "uri")?;
    let identifier = identifier_from_uri(uri)
        .ok_or_else(|| FeedError::MalformedResponse(format!("invalid uri `{}`", uri)))?
        .to_string();
    let name = required_str(record, "name")?.to_string();
    let created = required_str(record, "created_time")?;
    let creation_date = DateTime::parse_from_rfc3339(created)
        .map_err(|e| {
            FeedError::MalformedResponse(format!("invalid created_time `{}`: {}", created, e))
        })?
        .with_timezone(&Utc);

    let author = record
        .get("user")
        .and_then(|u| u.get("name"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let duration = optional_u64(record, "duration").unwrap_or(0);
    let presets = record.get("files").and_then(Value::as_array).map(|files| {
        files
            .iter()
            .filter_map(|file| match map_preset(file, &identifier, duration) {
                Ok(preset) => Some(preset),
                Err(e) => {
                    warn!(video = %identifier, error = %e, "skipping video file");
                    None
                }
            })
            .collect()
    });

    Ok(Video {
        image_path: select_image(record, preferred_image_width),
        identifier,
        idx,
        name,
        author,
        creation_date,
        presets,
        credits: None,
    })
}

/// Work out the page following `current` from the `paging` envelope
///
/// The `page` parameter of `paging.next` wins when it points past
/// `current`; otherwise the cursor advances by one, or the feed ends when
/// no page number is left.
fn next_page(envelope: &Record, current: u32) -> Option<u32> {
    let next = envelope
        .get("paging")
        .and_then(|p| p.get("next"))
        .and_then(Value::as_str)?;

    let from_link = next
        .split_once('?')
        .map(|(_, query)| query)
        .and_then(|query| {
            query
                .split('&')
                .filter_map(|pair| pair.split_once('='))
                .find(|(key, _)| *key == "page")
                .and_then(|(_, value)| value.parse::<u32>().ok())
        });

    // A link that does not move forward would repeat pages forever
    from_link
        .filter(|&page| page > current)
        .or_else(|| current.checked_add(1))
}

/// Map one page of the channel listing
///
/// Record `i` receives idx `first_idx + i`. Fails only when the envelope
/// itself is unusable.
pub fn map_page(
    body: &Value,
    page: u32,
    first_idx: u64,
    preferred_image_width: u32,
) -> Result<MappedPage> {
    let envelope = as_record(body, "response")?;
    let data = envelope
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| FeedError::MalformedResponse("missing field `data`".to_string()))?;

    let mut videos = Vec::with_capacity(data.len());
    let mut dropped = 0;

    for (position, record) in (0u64..).zip(data) {
        match map_video(record, first_idx + position, preferred_image_width) {
            Ok(video) => videos.push(video),
            Err(e) => {
                warn!(page, position, error = %e, "dropping malformed video record");
                dropped += 1;
            }
        }
    }

    Ok(MappedPage {
        videos,
        next_page: next_page(envelope, page),
        dropped,
    })
}

/// Map the credits listing of a video
pub fn map_credits(body: &Value) -> Result<Vec<Credit>> {
    let envelope = as_record(body, "response")?;
    let data = envelope
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| FeedError::MalformedResponse("missing field `data`".to_string()))?;

    Ok(data
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|credit| {
            let name = credit.get("name").and_then(Value::as_str)?;
            let role = credit.get("role").and_then(Value::as_str).unwrap_or_default();
            Some(Credit {
                role: role.to_string(),
                name: name.to_string(),
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn record(id: u64) -> Value {
        json!({
            "uri": format!("/videos/{}", id),
            "name": format!("Video {}", id),
            "created_time": "2015-06-01T12:00:00+00:00",
            "duration": 125,
            "user": { "name": "Continuum" },
            "pictures": {
                "sizes": [
                    { "width": 100, "height": 75, "link": "https://i.vimeocdn.com/100.jpg" },
                    { "width": 640, "height": 360, "link": "https://i.vimeocdn.com/640.jpg" },
                    { "width": 1280, "height": 720, "link": "https://i.vimeocdn.com/1280.jpg" }
                ]
            }
        })
    }

    #[test]
    fn test_identifier_from_uri() {
        assert_eq!(identifier_from_uri("/videos/76979871"), Some("76979871"));
        assert_eq!(identifier_from_uri("/videos/76979871/"), Some("76979871"));
        assert_eq!(identifier_from_uri("/videos/1?fields=uri"), Some("1"));
        assert_eq!(identifier_from_uri(""), None);
    }

    #[test]
    fn test_map_video_full_record() {
        let video = map_video(&record(42), 7, 640).expect("Record should map");

        assert_eq!(video.identifier, "42");
        assert_eq!(video.idx, 7);
        assert_eq!(video.name, "Video 42");
        assert_eq!(video.author.as_deref(), Some("Continuum"));
        assert_eq!(video.image_path.as_deref(), Some("https://i.vimeocdn.com/640.jpg"));
        assert_eq!(video.creation_date.to_rfc3339(), "2015-06-01T12:00:00+00:00");
        assert_eq!(video.presets, None);
    }

    #[test]
    fn test_map_video_picks_widest_when_all_small() {
        let video = map_video(&record(1), 0, 4096).expect("Record should map");
        assert_eq!(video.image_path.as_deref(), Some("https://i.vimeocdn.com/1280.jpg"));
    }

    #[test]
    fn test_map_video_missing_required_fields() {
        for key in ["uri", "name", "created_time"] {
            let mut value = record(1);
            if let Some(fields) = value.as_object_mut() {
                fields.remove(key);
            }
            let result = map_video(&value, 0, 640);
            assert!(
                matches!(result, Err(FeedError::MalformedResponse(ref msg)) if msg.contains(key)),
                "expected MalformedResponse for missing {}",
                key
            );
        }
    }

    #[test]
    fn test_map_video_invalid_date() {
        let mut value = record(1);
        value["created_time"] = json!("yesterday");
        assert!(matches!(
            map_video(&value, 0, 640),
            Err(FeedError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_map_video_files_become_presets() {
        let mut value = record(9);
        value["files"] = json!([
            { "quality": "hd", "width": 1280, "height": 720, "size": 2048, "link": "https://cdn/hd.mp4" },
            { "quality": "hls", "link": "https://cdn/master.m3u8" },
            { "quality": "sd", "width": 640 }
        ]);

        let video = map_video(&value, 0, 640).expect("Record should map");
        let presets = video.presets.expect("Files should map to presets");

        assert_eq!(presets.len(), 2);
        assert_eq!(presets[0].video, "9");
        assert_eq!(presets[0].duration, 125);
        assert_eq!(presets[0].size, 2048);
        assert_eq!(presets[1].quality, "hls");
        assert_eq!(presets[1].width, None);
        assert_eq!(presets[1].size, 0);
    }

    #[test]
    fn test_map_page_drops_malformed_records() {
        let mut data: Vec<Value> = (0..10).map(record).collect();
        data[3] = json!({ "name": "no uri" });
        data[8] = json!("not an object");
        let body = json!({ "page": 1, "paging": { "next": null }, "data": data });

        let page = map_page(&body, 1, 0, 640).expect("Page should map");

        assert_eq!(page.videos.len(), 8);
        assert_eq!(page.dropped, 2);
        assert_eq!(page.next_page, None);
        assert_eq!(page.videos[3].idx, 4);
    }

    #[test]
    fn test_map_page_missing_data() {
        let body = json!({ "page": 1 });
        assert!(matches!(
            map_page(&body, 1, 0, 640),
            Err(FeedError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_map_page_next_from_link() {
        let body = json!({
            "paging": { "next": "/channels/staffpicks/videos?page=5&per_page=10" },
            "data": []
        });
        let page = map_page(&body, 4, 30, 640).expect("Page should map");
        assert_eq!(page.next_page, Some(5));
    }

    #[test]
    fn test_map_page_next_without_page_param() {
        let body = json!({ "paging": { "next": "/channels/staffpicks/videos" }, "data": [] });
        let page = map_page(&body, 2, 0, 640).expect("Page should map");
        assert_eq!(page.next_page, Some(3));
    }

    #[test]
    fn test_map_page_next_never_goes_back() {
        for link in ["?page=3", "?page=2", "?page=1"] {
            let body = json!({
                "paging": { "next": format!("/channels/staffpicks/videos{}", link) },
                "data": []
            });
            let page = map_page(&body, 3, 20, 640).expect("Page should map");
            assert_eq!(page.next_page, Some(4), "link {}", link);
        }
    }

    #[test]
    fn test_map_page_next_ends_at_last_page_number() {
        let body = json!({ "paging": { "next": "/channels/staffpicks/videos" }, "data": [] });
        let page = map_page(&body, u32::MAX, 0, 640).expect("Page should map");
        assert_eq!(page.next_page, None);
    }

    #[test]
    fn test_map_credits() {
        let body = json!({
            "data": [
                { "role": "Director", "name": "Dan" },
                { "role": "Editor" },
                { "name": "Anonymous" }
            ]
        });
        let credits = map_credits(&body).expect("Credits should map");
        assert_eq!(
            credits,
            vec![
                Credit { role: "Director".to_string(), name: "Dan".to_string() },
                Credit { role: String::new(), name: "Anonymous".to_string() },
            ]
        );
    }

    proptest! {
        #[test]
        fn prop_page_keeps_valid_records_in_order(valid in proptest::collection::vec(any::<bool>(), 0..20)) {
            let data: Vec<Value> = valid
                .iter()
                .enumerate()
                .map(|(i, ok)| if *ok { record(i as u64) } else { json!({ "uri": "/videos/x" }) })
                .collect();
            let body = json!({ "data": data });

            let page = map_page(&body, 1, 0, 640).expect("Page should map");

            prop_assert_eq!(page.videos.len() + page.dropped, valid.len());
            prop_assert!(page.videos.windows(2).all(|w| w[0].idx < w[1].idx));
        }
    }
}
