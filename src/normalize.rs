//! Provider payload normalization.
//!
//! The two upstream providers (and the backend's stored favorites) all ship
//! different shapes for the same logical record. Everything funnels through
//! [`normalize`], which tries each known field alias in order and takes the
//! first non-empty value. Items that cannot be rendered are dropped by
//! returning `None` rather than surfacing half-empty records.

use serde_json::Value;

use crate::media::{MediaItem, MediaKind, MediaUrls};

/// Map an arbitrary provider payload into a canonical [`MediaItem`].
///
/// Already-canonical payloads pass through unchanged. Returns `None` when
/// neither a usable kind nor any displayable URL can be determined.
///
/// Pure: the input is never mutated and no I/O happens here.
pub fn normalize(raw: &Value, hint: Option<MediaKind>) -> Option<MediaItem> {
    // Canonical shape short-circuits; re-normalizing is a no-op.
    if let Ok(mut item) = serde_json::from_value::<MediaItem>(raw.clone()) {
        if item.id.is_empty() {
            item.id = synthesize_id();
        }
        return Some(item);
    }

    let kind = infer_kind(raw, hint)?;
    let id = extract_id(raw).unwrap_or_else(synthesize_id);
    let alt_description = first_str(raw, &[&["alt_description"], &["alt"]]).unwrap_or_default();
    let author_name = first_str(raw, &[&["user", "name"], &["photographer"]])
        .unwrap_or_else(|| "Unknown".to_string());

    let urls = match kind {
        MediaKind::Image => MediaUrls::Image {
            small: first_str(raw, &[&["urls", "small"], &["src", "medium"], &["image"]])
                .unwrap_or_default(),
            regular: first_str(raw, &[&["urls", "regular"], &["src", "large"], &["image"]])
                .unwrap_or_default(),
        },
        MediaKind::Video => MediaUrls::Video {
            thumbnail: first_str(raw, &[&["thumbnail"], &["image"], &["urls", "thumbnail"]])
                .unwrap_or_default(),
            video_url: first_str(raw, &[&["video_url"], &["urls", "video_url"]])
                .or_else(|| pick_video_file(raw))
                .unwrap_or_default(),
        },
    };

    if urls.display_url().is_empty() {
        return None;
    }

    Some(MediaItem { id, alt_description, author_name, urls })
}

/// Explicit `type` tag wins; otherwise the payload structure decides;
/// the provider hint is the last resort.
fn infer_kind(raw: &Value, hint: Option<MediaKind>) -> Option<MediaKind> {
    match first_str(raw, &[&["type"]]).as_deref() {
        Some("image") => return Some(MediaKind::Image),
        Some("video") => return Some(MediaKind::Video),
        _ => {}
    }
    if raw.get("video_files").map_or(false, Value::is_array) {
        return Some(MediaKind::Video);
    }
    if raw.get("urls").map_or(false, Value::is_object)
        || raw.get("src").map_or(false, Value::is_object)
    {
        return Some(MediaKind::Image);
    }
    hint
}

/// Ids arrive as strings or numbers depending on the provider.
fn extract_id(raw: &Value) -> Option<String> {
    for key in ["id", "_id"] {
        match raw.get(key) {
            Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

/// Stable enough for list rendering within one session; not guaranteed
/// collision-free across sessions.
fn synthesize_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Walk each alias path and return the first non-empty string found.
fn first_str(raw: &Value, paths: &[&[&str]]) -> Option<String> {
    for path in paths {
        let mut node = raw;
        let mut found = true;
        for segment in *path {
            match node.get(segment) {
                Some(next) => node = next,
                None => {
                    found = false;
                    break;
                }
            }
        }
        if found {
            if let Some(s) = node.as_str() {
                if !s.is_empty() {
                    return Some(s.to_string());
                }
            }
        }
    }
    None
}

/// Prefer an mp4 rendition; otherwise take whatever the provider listed
/// first.
fn pick_video_file(raw: &Value) -> Option<String> {
    let files = raw.get("video_files")?.as_array()?;
    let mp4 = files
        .iter()
        .find(|f| f.get("file_type").and_then(Value::as_str) == Some("video/mp4"));
    mp4.or_else(|| files.first())
        .and_then(|f| f.get("link"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
