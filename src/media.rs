use serde::{Deserialize, Serialize};

/// MIME prefixes the file picker accepts.
pub const ACCEPTED_MIME_PREFIXES: [&str; 3] = ["image/", "video/", "audio/"];

/// Display category of a piece of media. Nothing is decoded here; the kind is
/// read off the declared MIME type.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
    Audio,
}

impl MediaKind {
    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.trim().to_ascii_lowercase();
        if mime.starts_with("image/") {
            Some(MediaKind::Photo)
        } else if mime.starts_with("video/") {
            Some(MediaKind::Video)
        } else if mime.starts_with("audio/") {
            Some(MediaKind::Audio)
        } else {
            None
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }
}

pub fn is_accepted(mime: &str) -> bool {
    let mime = mime.trim().to_ascii_lowercase();
    ACCEPTED_MIME_PREFIXES
        .iter()
        .any(|prefix| mime.starts_with(prefix))
}
