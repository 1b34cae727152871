//! Media models: the selected file and its classification

use std::path::Path;

use bytes::Bytes;
use mime_guess::mime::{self, Mime};
use serde::Deserialize;

use crate::error::{ClientError, ClientResult};

/// Which result kinds the client offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaSupport {
    /// Static images only; every `image/*` (GIF included) becomes ASCII text
    Images,
    /// Images as text, GIF and video as ASCII-rendered media
    #[default]
    ImagesAndMotion,
}

/// Category of a selected file, deciding endpoint and result kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaCategory {
    Image,
    Gif,
    Video,
}

impl MediaCategory {
    /// Classify a declared content type. Returns `None` for anything that is
    /// not an accepted image or video type under `support`.
    pub fn classify(content_type: &str, support: MediaSupport) -> Option<Self> {
        let parsed: Mime = content_type.trim().parse().ok()?;

        let motion = support == MediaSupport::ImagesAndMotion;

        if parsed.type_() == mime::IMAGE {
            if motion && parsed.subtype() == mime::GIF {
                Some(MediaCategory::Gif)
            } else {
                Some(MediaCategory::Image)
            }
        } else if parsed.type_() == mime::VIDEO && motion {
            Some(MediaCategory::Video)
        } else {
            None
        }
    }

    /// Conversion endpoint path for this category
    pub fn endpoint(self) -> &'static str {
        match self {
            MediaCategory::Image => "/api/process-image",
            MediaCategory::Gif => "/api/convert-gif",
            MediaCategory::Video => "/api/convert-video",
        }
    }

    /// File name offered when downloading a result of this category.
    /// Video always gets `.mp4`, whatever container the server encoded.
    pub fn download_file_name(self) -> &'static str {
        match self {
            MediaCategory::Image => "ascii-art.txt",
            MediaCategory::Gif => "ascii-animation.gif",
            MediaCategory::Video => "ascii-video.mp4",
        }
    }

    /// Whether results of this category are playable media rather than text
    pub fn is_motion(self) -> bool {
        !matches!(self, MediaCategory::Image)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MediaCategory::Image => "image",
            MediaCategory::Gif => "gif",
            MediaCategory::Video => "video",
        }
    }
}

/// A file the user picked or dropped
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl MediaFile {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, declaring the content type its extension
    /// suggests.
    pub async fn open(path: &Path) -> ClientResult<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                ClientError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("not a file path: {}", path.display()),
                ))
            })?
            .to_string();
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Ok(Self::new(name, content_type, bytes))
    }
}
