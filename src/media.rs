use serde::{Deserialize, Serialize};

/// What a media item is, and therefore how it renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display URLs, tagged by kind. All rendering decisions switch on this
/// variant rather than probing for field presence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaUrls {
    Image { small: String, regular: String },
    Video { thumbnail: String, video_url: String },
}

impl MediaUrls {
    /// The preferred URL to show for this item. Guaranteed non-empty for
    /// any constructed [`MediaItem`].
    pub fn display_url(&self) -> &str {
        match self {
            MediaUrls::Image { small, regular } => {
                if small.is_empty() {
                    regular
                } else {
                    small
                }
            }
            MediaUrls::Video { thumbnail, video_url } => {
                if video_url.is_empty() {
                    thumbnail
                } else {
                    video_url
                }
            }
        }
    }

    fn is_renderable(&self) -> bool {
        !self.display_url().is_empty()
    }
}

/// Canonical media record, post-normalization.
///
/// Serializes to the wire shape shared with the favorites backend:
/// `{id, type, alt_description, urls: {...}, user: {name}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MediaPayload", into = "MediaPayload")]
pub struct MediaItem {
    pub id: String,
    pub alt_description: String,
    pub author_name: String,
    pub urls: MediaUrls,
}

impl MediaItem {
    pub fn kind(&self) -> MediaKind {
        match self.urls {
            MediaUrls::Image { .. } => MediaKind::Image,
            MediaUrls::Video { .. } => MediaKind::Video,
        }
    }
}

// --- Wire shape ---

/// Flat wire twin of [`MediaItem`]: every URL slot present, kind as a
/// string tag. The favorites backend stores media snapshots in this form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub alt_description: String,
    #[serde(default)]
    pub urls: UrlSlots,
    #[serde(default)]
    pub user: UserSlot,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UrlSlots {
    #[serde(default)]
    pub small: String,
    #[serde(default)]
    pub regular: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub video_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserSlot {
    #[serde(default)]
    pub name: String,
}

impl From<MediaItem> for MediaPayload {
    fn from(item: MediaItem) -> Self {
        let kind = item.kind().as_str().to_string();
        let urls = match item.urls {
            MediaUrls::Image { small, regular } => UrlSlots { small, regular, ..Default::default() },
            MediaUrls::Video { thumbnail, video_url } => {
                UrlSlots { thumbnail, video_url, ..Default::default() }
            }
        };
        MediaPayload {
            id: Some(item.id),
            kind,
            alt_description: item.alt_description,
            urls,
            user: UserSlot { name: item.author_name },
        }
    }
}

impl TryFrom<MediaPayload> for MediaItem {
    type Error = String;

    fn try_from(p: MediaPayload) -> Result<Self, Self::Error> {
        let urls = match p.kind.as_str() {
            "image" => MediaUrls::Image { small: p.urls.small, regular: p.urls.regular },
            "video" => {
                MediaUrls::Video { thumbnail: p.urls.thumbnail, video_url: p.urls.video_url }
            }
            other => return Err(format!("unknown media type `{other}`")),
        };
        if !urls.is_renderable() {
            return Err(format!("{} item has no display url", p.kind));
        }
        let author_name = if p.user.name.is_empty() { "Unknown".to_string() } else { p.user.name };
        Ok(MediaItem {
            id: p.id.unwrap_or_default(),
            alt_description: p.alt_description,
            author_name,
            urls,
        })
    }
}
