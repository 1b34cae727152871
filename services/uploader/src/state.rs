//! Upload/result state machine
//!
//! Owns the lifecycle of one media item: selection, local preview,
//! conversion, result and reset. Everything here is synchronous; the
//! [`Session`](crate::session::Session) feeds it completions from the
//! asynchronous side.
//!
//! Every conversion request is tagged with the [`Generation`] of the media
//! item it was issued for. Selecting a new file or resetting bumps the
//! generation, so a late response for a superseded item is recognised and
//! dropped instead of overwriting newer state.

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::error::{ClientError, ClientResult};
use crate::handles::{HandleRegistry, ObjectUrl};
use crate::media::{MediaCategory, MediaFile, MediaSupport};
use crate::messages::{COPY_CONFIRMED_LABEL, COPY_LABEL};

/// Aspect ratio shown while the real one is unknown
pub const DEFAULT_ASPECT_RATIO: f64 = 1.0;

/// Observable phase of the upload lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No media selected
    Empty,
    /// Preview allocated, request not issued yet
    PreviewReady,
    /// Request in flight
    Converting,
    /// Result available
    ResultReady,
    /// Request failed; preview is kept
    Failed,
}

/// Identity of a media item selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    fn next(self) -> Self {
        Generation(self.0 + 1)
    }
}

/// An accepted selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub generation: Generation,
    pub category: MediaCategory,
}

/// The active media item
#[derive(Debug, Clone)]
pub struct MediaItem {
    pub name: String,
    pub content_type: String,
    pub category: MediaCategory,
    pub preview: ObjectUrl,
    pub aspect_ratio: Option<f64>,
}

/// ASCII text produced for a static image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextResult {
    pub ascii: String,
    pub width: u32,
    pub height: u32,
}

/// What the conversion API handed back
#[derive(Debug, Clone)]
pub enum ConversionPayload {
    Text(TextResult),
    Media { bytes: Bytes, content_type: String },
}

/// A result held by the state machine
#[derive(Debug, Clone)]
pub enum ConversionResult {
    Text(TextResult),
    Media { url: ObjectUrl, content_type: String },
}

/// What applying a conversion outcome did
#[derive(Debug)]
pub enum ConversionApplied {
    /// Result is now shown
    Ready,
    /// Current request failed; the error is handed back for alerting
    Failed(ClientError),
    /// Outcome belonged to a superseded item and was dropped
    Stale,
}

/// Where the bytes of a download come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadSource {
    Text(String),
    Blob(ObjectUrl),
}

/// A download the current result offers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOffer {
    pub file_name: &'static str,
    pub source: DownloadSource,
}

/// How a result is rendered
#[derive(Debug, Clone, PartialEq)]
pub enum ResultView {
    Text {
        ascii: String,
        width: u32,
        height: u32,
    },
    Media {
        url: ObjectUrl,
        content_type: String,
        looping: bool,
    },
}

/// Immutable view of the state machine for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSnapshot {
    pub phase: Phase,
    pub file_name: Option<String>,
    pub category: Option<MediaCategory>,
    pub preview_url: Option<ObjectUrl>,
    pub aspect_ratio: f64,
    pub result: Option<ResultView>,
    /// Present only while a text result can be copied
    pub copy_label: Option<&'static str>,
    pub download_file_name: Option<&'static str>,
    pub busy: bool,
}

#[derive(Debug, Default)]
struct CopyFeedback {
    token: u64,
    confirmed: bool,
}

/// The upload/result state machine
#[derive(Debug)]
pub struct UploadState {
    phase: Phase,
    generation: Generation,
    media: Option<MediaItem>,
    result: Option<ConversionResult>,
    handles: HandleRegistry,
    picker: Option<String>,
    copy: CopyFeedback,
}

impl Default for UploadState {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Empty,
            generation: Generation::default(),
            media: None,
            result: None,
            handles: HandleRegistry::new(),
            picker: None,
            copy: CopyFeedback::default(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn media(&self) -> Option<&MediaItem> {
        self.media.as_ref()
    }

    pub fn result(&self) -> Option<&ConversionResult> {
        self.result.as_ref()
    }

    pub fn handles(&self) -> &HandleRegistry {
        &self.handles
    }

    /// Name currently held by the file picker
    pub fn picker_selection(&self) -> Option<&str> {
        self.picker.as_deref()
    }

    /// Accept a newly selected file.
    ///
    /// On rejection nothing changes. On acceptance the previous item and
    /// result are released, a preview is allocated and the state moves to
    /// [`Phase::PreviewReady`].
    pub fn select(&mut self, file: &MediaFile, support: MediaSupport) -> ClientResult<Selection> {
        let category = MediaCategory::classify(&file.content_type, support)
            .ok_or_else(|| ClientError::UnsupportedMediaType(file.content_type.clone()))?;

        self.release_all();
        self.generation = self.generation.next();

        let preview = self.handles.allocate(file.bytes.clone(), &file.content_type);
        self.media = Some(MediaItem {
            name: file.name.clone(),
            content_type: file.content_type.clone(),
            category,
            preview,
            aspect_ratio: None,
        });
        self.picker = Some(file.name.clone());
        self.copy.confirmed = false;
        self.phase = Phase::PreviewReady;

        info!(
            "Selected {} as {} (generation {})",
            file.name,
            category.as_str(),
            self.generation.0
        );
        Ok(Selection {
            generation: self.generation,
            category,
        })
    }

    /// Mark the request for `generation` as issued
    pub fn begin_conversion(&mut self, generation: Generation) -> bool {
        if generation != self.generation || self.phase != Phase::PreviewReady {
            return false;
        }
        self.phase = Phase::Converting;
        true
    }

    /// Apply the outcome of the request issued for `generation`
    pub fn apply_conversion(
        &mut self,
        generation: Generation,
        outcome: ClientResult<ConversionPayload>,
    ) -> ConversionApplied {
        if generation != self.generation || self.phase != Phase::Converting {
            debug!(
                "Dropping conversion outcome for generation {} (current {})",
                generation.0, self.generation.0
            );
            return ConversionApplied::Stale;
        }

        match outcome {
            Ok(ConversionPayload::Text(text)) => {
                info!("Conversion ready: {}x{} characters", text.width, text.height);
                self.result = Some(ConversionResult::Text(text));
                self.phase = Phase::ResultReady;
                ConversionApplied::Ready
            }
            Ok(ConversionPayload::Media {
                bytes,
                content_type,
            }) => {
                info!("Conversion ready: {} bytes of {}", bytes.len(), content_type);
                let url = self.handles.allocate(bytes, &content_type);
                self.result = Some(ConversionResult::Media { url, content_type });
                self.phase = Phase::ResultReady;
                ConversionApplied::Ready
            }
            Err(e) => {
                warn!("Conversion failed: {}", e);
                self.phase = Phase::Failed;
                ConversionApplied::Failed(e)
            }
        }
    }

    /// Record the aspect ratio probed for `generation`. Accepted in any
    /// phase as long as the item is still the active one.
    pub fn apply_aspect_ratio(&mut self, generation: Generation, ratio: f64) -> bool {
        if generation != self.generation {
            return false;
        }
        match self.media.as_mut() {
            Some(media) if ratio.is_finite() && ratio > 0.0 => {
                media.aspect_ratio = Some(ratio);
                true
            }
            _ => false,
        }
    }

    /// Return to [`Phase::Empty`], releasing every local reference
    pub fn reset(&mut self) -> bool {
        if self.phase == Phase::Empty {
            return false;
        }

        self.release_all();
        self.generation = self.generation.next();
        self.picker = None;
        self.copy.confirmed = false;
        self.phase = Phase::Empty;

        info!("Reset to empty (generation {})", self.generation.0);
        true
    }

    /// Text that the copy action would place on the clipboard
    pub fn copy_text(&self) -> Option<&str> {
        match (&self.phase, &self.result) {
            (Phase::ResultReady, Some(ConversionResult::Text(text))) => Some(&text.ascii),
            _ => None,
        }
    }

    /// Switch the copy label to its confirmation. Returns the token a later
    /// [`expire_copy`](Self::expire_copy) must present.
    pub fn confirm_copy(&mut self) -> u64 {
        self.copy.token += 1;
        self.copy.confirmed = true;
        self.copy.token
    }

    /// Revert the copy label, unless a newer copy happened since `token`
    pub fn expire_copy(&mut self, token: u64) -> bool {
        if token != self.copy.token || !self.copy.confirmed {
            return false;
        }
        self.copy.confirmed = false;
        true
    }

    pub fn copy_label(&self) -> &'static str {
        if self.copy.confirmed {
            COPY_CONFIRMED_LABEL
        } else {
            COPY_LABEL
        }
    }

    pub fn download_offer(&self) -> Option<DownloadOffer> {
        if self.phase != Phase::ResultReady {
            return None;
        }
        let category = self.media.as_ref()?.category;

        let source = match self.result.as_ref()? {
            ConversionResult::Text(text) => DownloadSource::Text(text.ascii.clone()),
            ConversionResult::Media { url, .. } => DownloadSource::Blob(url.clone()),
        };

        let file_name = match source {
            DownloadSource::Text(_) => MediaCategory::Image.download_file_name(),
            DownloadSource::Blob(_) => category.download_file_name(),
        };

        Some(DownloadOffer { file_name, source })
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        let result = match (&self.phase, &self.result) {
            (Phase::ResultReady, Some(ConversionResult::Text(text))) => Some(ResultView::Text {
                ascii: text.ascii.clone(),
                width: text.width,
                height: text.height,
            }),
            (Phase::ResultReady, Some(ConversionResult::Media { url, content_type })) => {
                Some(ResultView::Media {
                    url: url.clone(),
                    content_type: content_type.clone(),
                    looping: self.media.as_ref().is_some_and(|m| m.category.is_motion()),
                })
            }
            _ => None,
        };

        ViewSnapshot {
            phase: self.phase,
            file_name: self.media.as_ref().map(|m| m.name.clone()),
            category: self.media.as_ref().map(|m| m.category),
            preview_url: self.media.as_ref().map(|m| m.preview.clone()),
            aspect_ratio: self
                .media
                .as_ref()
                .and_then(|m| m.aspect_ratio)
                .unwrap_or(DEFAULT_ASPECT_RATIO),
            result,
            copy_label: self.copy_text().map(|_| self.copy_label()),
            download_file_name: self.download_offer().map(|offer| offer.file_name),
            busy: self.phase == Phase::Converting,
        }
    }

    fn release_all(&mut self) {
        if let Some(media) = self.media.take() {
            self.handles.release(media.preview.as_str());
        }
        if let Some(ConversionResult::Media { url, .. }) = self.result.take() {
            self.handles.release(url.as_str());
        }
    }
}
