//! Aspect-ratio resolution for selected media
//!
//! Images (GIF included) are measured by decoding just enough of the file to
//! learn its pixel dimensions. Videos are measured from container metadata
//! reported by `ffprobe`.

use std::io::Cursor;
use std::process::Stdio;

use async_trait::async_trait;
use bytes::Bytes;
use image::ImageReader;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::error::{ClientError, ClientResult};
use crate::media::{MediaCategory, MediaFile};

/// Natural pixel dimensions of a media item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn aspect_ratio(&self) -> ClientResult<f64> {
        if self.width == 0 || self.height == 0 {
            return Err(ClientError::Probe(format!(
                "degenerate dimensions {}x{}",
                self.width, self.height
            )));
        }
        Ok(self.width as f64 / self.height as f64)
    }
}

/// Source of media dimensions
#[async_trait]
pub trait MetadataProbe: Send + Sync {
    async fn dimensions(
        &self,
        category: MediaCategory,
        file: &MediaFile,
    ) -> ClientResult<Dimensions>;
}

/// Probe backed by the `image` decoders and `ffprobe`
#[derive(Debug, Clone)]
pub struct MediaProbe {
    ffprobe: String,
}

impl Default for MediaProbe {
    fn default() -> Self {
        Self {
            ffprobe: "ffprobe".to_string(),
        }
    }
}

impl MediaProbe {
    pub fn new(ffprobe: impl Into<String>) -> Self {
        Self {
            ffprobe: ffprobe.into(),
        }
    }

    fn image_dimensions(bytes: &[u8]) -> ClientResult<Dimensions> {
        let (width, height) = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()?
            .into_dimensions()
            .map_err(|e| ClientError::Probe(e.to_string()))?;
        Ok(Dimensions { width, height })
    }

    async fn video_dimensions(&self, bytes: Bytes) -> ClientResult<Dimensions> {
        // Feed the file through stdin so nothing has to touch the disk
        let mut child = Command::new(&self.ffprobe)
            .arg("-v")
            .arg("quiet")
            .arg("-print_format")
            .arg("json")
            .arg("-show_streams")
            .arg("-i")
            .arg("pipe:0")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            tokio::spawn(async move {
                // ffprobe stops reading once it has seen the headers
                if let Err(e) = stdin.write_all(&bytes).await {
                    debug!("ffprobe closed stdin early: {}", e);
                }
            });
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            error!("ffprobe failed with status: {:?}", output.status);
            return Err(ClientError::Probe("ffprobe failed".to_string()));
        }

        let ffprobe_data: serde_json::Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| ClientError::Probe(format!("unreadable ffprobe output: {e}")))?;
        Self::parse_ffprobe_output(&ffprobe_data)
    }

    fn parse_ffprobe_output(ffprobe_data: &serde_json::Value) -> ClientResult<Dimensions> {
        let streams = ffprobe_data
            .get("streams")
            .and_then(|v| v.as_array())
            .ok_or_else(|| ClientError::Probe("no streams reported".to_string()))?;

        for stream in streams {
            if stream.get("codec_type").and_then(|v| v.as_str()) != Some("video") {
                continue;
            }

            let width = stream.get("width").and_then(|v| v.as_u64());
            let height = stream.get("height").and_then(|v| v.as_u64());
            if let (Some(width), Some(height)) = (width, height) {
                return Ok(Dimensions {
                    width: u32::try_from(width).unwrap_or(u32::MAX),
                    height: u32::try_from(height).unwrap_or(u32::MAX),
                });
            }
        }

        Err(ClientError::Probe("no video stream with dimensions".to_string()))
    }
}

#[async_trait]
impl MetadataProbe for MediaProbe {
    async fn dimensions(
        &self,
        category: MediaCategory,
        file: &MediaFile,
    ) -> ClientResult<Dimensions> {
        info!("Probing dimensions of {}", file.name);

        match category {
            MediaCategory::Image | MediaCategory::Gif => Self::image_dimensions(&file.bytes),
            MediaCategory::Video => self.video_dimensions(file.bytes.clone()).await,
        }
    }
}
