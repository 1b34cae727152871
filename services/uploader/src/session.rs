//! Event loop around the upload state machine
//!
//! The session issues the conversion request and the aspect-ratio probe as
//! independent tasks. Each task reports back through a channel with the
//! generation it was started for; completions are applied one at a time,
//! so the state machine never sees concurrent mutation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use crate::client::Converter;
use crate::clipboard::Clipboard;
use crate::config::{ClientConfig, TextDownloadStrategy};
use crate::error::{ClientError, ClientResult};
use crate::media::{MediaCategory, MediaFile, MediaSupport};
use crate::messages::UserMessage;
use crate::probe::{Dimensions, MetadataProbe};
use crate::state::{
    ConversionApplied, ConversionPayload, DownloadSource, Generation, UploadState, ViewSnapshot,
};

/// Behaviour knobs of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub media_support: MediaSupport,
    pub text_download: TextDownloadStrategy,
    pub copy_confirmation: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            media_support: MediaSupport::default(),
            text_download: TextDownloadStrategy::default(),
            copy_confirmation: Duration::from_millis(1500),
        }
    }
}

impl From<&ClientConfig> for SessionSettings {
    fn from(config: &ClientConfig) -> Self {
        Self {
            media_support: config.media_support,
            text_download: config.text_download,
            copy_confirmation: config.copy_confirmation(),
        }
    }
}

/// Result of background work, routed back to the event loop
#[derive(Debug)]
enum Completion {
    Conversion {
        generation: Generation,
        outcome: ClientResult<ConversionPayload>,
    },
    Dimensions {
        generation: Generation,
        outcome: ClientResult<Dimensions>,
    },
    CopyExpired {
        token: u64,
    },
}

/// One user's upload session
pub struct Session {
    state: UploadState,
    settings: SessionSettings,
    converter: Arc<dyn Converter>,
    probe: Arc<dyn MetadataProbe>,
    clipboard: Arc<dyn Clipboard>,
    tx: UnboundedSender<Completion>,
    rx: UnboundedReceiver<Completion>,
    pending: usize,
    alerts: Vec<UserMessage>,
}

impl Session {
    pub fn new(
        settings: SessionSettings,
        converter: Arc<dyn Converter>,
        probe: Arc<dyn MetadataProbe>,
        clipboard: Arc<dyn Clipboard>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            state: UploadState::new(),
            settings,
            converter,
            probe,
            clipboard,
            tx,
            rx,
            pending: 0,
            alerts: Vec::new(),
        }
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        self.state.snapshot()
    }

    /// Number of background tasks whose completion has not been applied
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Drain the alerts raised since the last call
    pub fn take_alerts(&mut self) -> Vec<UserMessage> {
        std::mem::take(&mut self.alerts)
    }

    /// Handle a file picked from the dialog or dropped on the upload area.
    ///
    /// Returns immediately; the conversion and the probe run in the
    /// background. Returns `false` if the file was rejected.
    pub fn select(&mut self, file: MediaFile) -> bool {
        let selection = match self.state.select(&file, self.settings.media_support) {
            Ok(selection) => selection,
            Err(e) => {
                warn!("Rejected {}: {}", file.name, e);
                self.alert(UserMessage::UnsupportedFile(self.settings.media_support));
                return false;
            }
        };

        self.spawn_probe(selection.generation, selection.category, file.clone());
        self.state.begin_conversion(selection.generation);
        self.spawn_conversion(selection.generation, selection.category, file);
        true
    }

    /// Go back to the empty state, releasing every local reference
    pub fn reset(&mut self) -> bool {
        self.state.reset()
    }

    /// Copy the ASCII text of the current result to the clipboard
    pub async fn copy_result(&mut self) -> bool {
        let Some(text) = self.state.copy_text().map(str::to_owned) else {
            debug!("Nothing to copy");
            return false;
        };

        match self.clipboard.write_text(&text).await {
            Ok(()) => {
                let token = self.state.confirm_copy();
                self.spawn_copy_timer(token);
                info!("Copied {} bytes of ASCII to the clipboard", text.len());
                true
            }
            Err(e) => {
                warn!("Copy failed: {}", e);
                self.alert(UserMessage::CopyFailed);
                false
            }
        }
    }

    /// Save the current result into `dir` under its download file name
    pub async fn download(&mut self, dir: &Path) -> ClientResult<PathBuf> {
        let saved = self.save_result(dir).await;
        match &saved {
            Ok(path) => info!("Saved result to {}", path.display()),
            Err(ClientError::NoResult) => debug!("Nothing to download"),
            Err(e) => {
                warn!("Download failed: {}", e);
                self.alert(UserMessage::DownloadFailed);
            }
        }
        saved
    }

    /// Wait for the next background completion and apply it. Returns
    /// `false` when nothing is outstanding.
    pub async fn next_completion(&mut self) -> bool {
        if self.pending == 0 {
            return false;
        }

        match self.rx.recv().await {
            Some(completion) => {
                self.pending -= 1;
                self.apply(completion);
                true
            }
            None => false,
        }
    }

    /// Apply completions until no background work is outstanding
    pub async fn settle(&mut self) {
        while self.next_completion().await {}
    }

    fn apply(&mut self, completion: Completion) {
        match completion {
            Completion::Conversion {
                generation,
                outcome,
            } => match self.state.apply_conversion(generation, outcome) {
                ConversionApplied::Ready | ConversionApplied::Stale => {}
                ConversionApplied::Failed(_) => {
                    let category = self
                        .state
                        .media()
                        .map(|media| media.category)
                        .unwrap_or(MediaCategory::Image);
                    self.alert(UserMessage::ConversionFailed(category));
                }
            },
            Completion::Dimensions {
                generation,
                outcome,
            } => match outcome.and_then(|dims| dims.aspect_ratio()) {
                Ok(ratio) => {
                    if self.state.apply_aspect_ratio(generation, ratio) {
                        debug!("Aspect ratio resolved to {:.4}", ratio);
                    }
                }
                Err(e) => warn!("Could not resolve aspect ratio: {}", e),
            },
            Completion::CopyExpired { token } => {
                self.state.expire_copy(token);
            }
        }
    }

    async fn save_result(&self, dir: &Path) -> ClientResult<PathBuf> {
        let offer = self.state.download_offer().ok_or(ClientError::NoResult)?;

        let bytes = match offer.source {
            DownloadSource::Text(text) => match self.settings.text_download {
                TextDownloadStrategy::Local => Bytes::from(text),
                TextDownloadStrategy::Server => self.converter.download_ascii(&text).await?,
            },
            // Reuse the payload we already fetched
            DownloadSource::Blob(url) => self
                .state
                .handles()
                .bytes(&url)
                .ok_or(ClientError::NoResult)?,
        };

        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(offer.file_name);
        tokio::fs::write(&path, &bytes).await?;
        Ok(path)
    }

    fn spawn_conversion(&mut self, generation: Generation, category: MediaCategory, file: MediaFile) {
        let converter = Arc::clone(&self.converter);
        let tx = self.tx.clone();
        self.pending += 1;

        tokio::spawn(async move {
            let outcome = converter.convert(category, &file).await;
            let _ = tx.send(Completion::Conversion {
                generation,
                outcome,
            });
        });
    }

    fn spawn_probe(&mut self, generation: Generation, category: MediaCategory, file: MediaFile) {
        let probe = Arc::clone(&self.probe);
        let tx = self.tx.clone();
        self.pending += 1;

        tokio::spawn(async move {
            let outcome = probe.dimensions(category, &file).await;
            let _ = tx.send(Completion::Dimensions {
                generation,
                outcome,
            });
        });
    }

    fn spawn_copy_timer(&mut self, token: u64) {
        let delay = self.settings.copy_confirmation;
        let tx = self.tx.clone();
        self.pending += 1;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Completion::CopyExpired { token });
        });
    }

    fn alert(&mut self, message: UserMessage) {
        warn!("Alert: {}", message);
        self.alerts.push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{COPY_CONFIRMED_LABEL, COPY_LABEL};
    use crate::state::{Phase, ResultView, TextResult};
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Converter answering from a script, optionally after a delay
    #[derive(Default)]
    struct ScriptedConverter {
        delays: HashMap<String, Duration>,
        fail: bool,
        calls: Mutex<Vec<(MediaCategory, String)>>,
        downloads: Mutex<Vec<String>>,
    }

    impl ScriptedConverter {
        fn calls(&self) -> Vec<(MediaCategory, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Converter for ScriptedConverter {
        async fn convert(
            &self,
            category: MediaCategory,
            file: &MediaFile,
        ) -> ClientResult<ConversionPayload> {
            self.calls
                .lock()
                .unwrap()
                .push((category, file.name.clone()));
            if let Some(delay) = self.delays.get(&file.name) {
                tokio::time::sleep(*delay).await;
            }
            if self.fail {
                return Err(ClientError::Status(StatusCode::BAD_GATEWAY));
            }

            Ok(match category {
                MediaCategory::Image => ConversionPayload::Text(TextResult {
                    ascii: file.name.clone(),
                    width: file.name.len() as u32,
                    height: 1,
                }),
                _ => ConversionPayload::Media {
                    bytes: Bytes::from(format!("ascii:{}", file.name)),
                    content_type: "video/mp4".to_string(),
                },
            })
        }

        async fn download_ascii(&self, text: &str) -> ClientResult<Bytes> {
            self.downloads.lock().unwrap().push(text.to_string());
            Ok(Bytes::from(format!("served:{text}")))
        }
    }

    struct FixedProbe(Dimensions);

    #[async_trait]
    impl MetadataProbe for FixedProbe {
        async fn dimensions(
            &self,
            _category: MediaCategory,
            _file: &MediaFile,
        ) -> ClientResult<Dimensions> {
            Ok(self.0)
        }
    }

    #[derive(Default)]
    struct RecordingClipboard {
        deny: bool,
        written: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Clipboard for RecordingClipboard {
        async fn write_text(&self, text: &str) -> ClientResult<()> {
            if self.deny {
                return Err(ClientError::Clipboard("permission denied".to_string()));
            }
            self.written.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    fn session_with(
        settings: SessionSettings,
        converter: Arc<ScriptedConverter>,
        clipboard: Arc<RecordingClipboard>,
    ) -> Session {
        Session::new(
            settings,
            converter,
            Arc::new(FixedProbe(Dimensions {
                width: 1920,
                height: 1080,
            })),
            clipboard,
        )
    }

    fn session(converter: Arc<ScriptedConverter>) -> Session {
        session_with(
            SessionSettings::default(),
            converter,
            Arc::new(RecordingClipboard::default()),
        )
    }

    fn file(name: &str, content_type: &str) -> MediaFile {
        MediaFile::new(name, content_type, Bytes::from_static(b"input"))
    }

    #[tokio::test]
    async fn test_accepted_types_issue_one_request() {
        let cases = [
            ("a.png", "image/png", MediaCategory::Image),
            ("a.jpg", "image/jpeg", MediaCategory::Image),
            ("a.gif", "image/gif", MediaCategory::Gif),
            ("a.mp4", "video/mp4", MediaCategory::Video),
        ];

        for (name, content_type, category) in cases {
            let converter = Arc::new(ScriptedConverter::default());
            let mut session = session(converter.clone());

            assert!(session.select(file(name, content_type)));
            assert_eq!(session.snapshot().phase, Phase::Converting);

            session.settle().await;
            assert_eq!(converter.calls(), vec![(category, name.to_string())]);
            assert_eq!(session.snapshot().phase, Phase::ResultReady);
        }
    }

    #[tokio::test]
    async fn test_rejected_types_issue_no_request() {
        for content_type in ["text/plain", "application/pdf"] {
            let converter = Arc::new(ScriptedConverter::default());
            let mut session = session(converter.clone());

            assert!(!session.select(file("doc", content_type)));
            assert_eq!(session.pending(), 0);
            session.settle().await;

            assert_eq!(session.snapshot().phase, Phase::Empty);
            assert!(converter.calls().is_empty());
            assert_eq!(
                session.take_alerts(),
                vec![UserMessage::UnsupportedFile(MediaSupport::ImagesAndMotion)]
            );
        }
    }

    #[tokio::test]
    async fn test_failure_alerts_and_keeps_preview() {
        let converter = Arc::new(ScriptedConverter {
            fail: true,
            ..Default::default()
        });
        let mut session = session(converter);

        session.select(file("clip.mp4", "video/mp4"));
        session.settle().await;

        let view = session.snapshot();
        assert_eq!(view.phase, Phase::Failed);
        assert!(view.preview_url.is_some());
        assert!((view.aspect_ratio - 16.0 / 9.0).abs() < 1e-9);
        assert_eq!(
            session.take_alerts(),
            vec![UserMessage::ConversionFailed(MediaCategory::Video)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_response_does_not_overwrite_newer_selection() {
        let mut delays = HashMap::new();
        delays.insert("slow.png".to_string(), Duration::from_secs(5));
        delays.insert("fast.png".to_string(), Duration::from_secs(1));
        let converter = Arc::new(ScriptedConverter {
            delays,
            ..Default::default()
        });
        let mut session = session(converter.clone());

        session.select(file("slow.png", "image/png"));
        tokio::task::yield_now().await;
        session.select(file("fast.png", "image/png"));
        session.settle().await;

        assert_eq!(converter.calls().len(), 2);
        let view = session.snapshot();
        assert_eq!(view.file_name.as_deref(), Some("fast.png"));
        assert_eq!(
            view.result,
            Some(ResultView::Text {
                ascii: "fast.png".to_string(),
                width: 8,
                height: 1
            })
        );
        assert_eq!(session.state().handles().stats().live(), 1);
    }

    #[tokio::test]
    async fn test_reset_while_converting_discards_response() {
        let converter = Arc::new(ScriptedConverter::default());
        let mut session = session(converter);

        session.select(file("clip.mp4", "video/mp4"));
        assert!(session.reset());
        session.settle().await;

        let view = session.snapshot();
        assert_eq!(view.phase, Phase::Empty);
        assert_eq!(view.result, None);
        assert_eq!(session.state().handles().stats().live(), 0);
        assert_eq!(session.state().picker_selection(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_copy_confirmation_reverts() {
        let clipboard = Arc::new(RecordingClipboard::default());
        let mut session = session_with(
            SessionSettings::default(),
            Arc::new(ScriptedConverter::default()),
            clipboard.clone(),
        );
        session.select(file("photo.jpg", "image/jpeg"));
        session.settle().await;
        assert_eq!(session.snapshot().copy_label, Some(COPY_LABEL));

        let started = tokio::time::Instant::now();
        assert!(session.copy_result().await);
        assert_eq!(session.snapshot().copy_label, Some(COPY_CONFIRMED_LABEL));
        assert_eq!(*clipboard.written.lock().unwrap(), vec!["photo.jpg".to_string()]);

        session.settle().await;
        assert!(started.elapsed() >= Duration::from_millis(1500));
        assert_eq!(session.snapshot().copy_label, Some(COPY_LABEL));
    }

    #[tokio::test]
    async fn test_copy_denied_alerts() {
        let clipboard = Arc::new(RecordingClipboard {
            deny: true,
            ..Default::default()
        });
        let mut session = session_with(
            SessionSettings::default(),
            Arc::new(ScriptedConverter::default()),
            clipboard,
        );
        session.select(file("photo.jpg", "image/jpeg"));
        session.settle().await;

        assert!(!session.copy_result().await);
        assert_eq!(session.take_alerts(), vec![UserMessage::CopyFailed]);
        assert_eq!(session.snapshot().phase, Phase::ResultReady);
        assert_eq!(session.snapshot().copy_label, Some(COPY_LABEL));
    }

    #[tokio::test]
    async fn test_copy_needs_text_result() {
        let mut session = session(Arc::new(ScriptedConverter::default()));
        assert!(!session.copy_result().await);

        session.select(file("clip.mp4", "video/mp4"));
        session.settle().await;
        assert!(!session.copy_result().await);
        assert!(session.take_alerts().is_empty());
    }

    #[tokio::test]
    async fn test_download_media_reuses_payload() -> ClientResult<()> {
        let converter = Arc::new(ScriptedConverter::default());
        let mut session = session(converter.clone());
        let dir = tempfile::tempdir()?;

        session.select(file("anim.gif", "image/gif"));
        session.settle().await;

        let path = session.download(dir.path()).await?;
        assert_eq!(path.file_name().unwrap(), "ascii-animation.gif");
        assert_eq!(tokio::fs::read(&path).await?, b"ascii:anim.gif");
        assert_eq!(converter.calls().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_download_text_strategies() -> ClientResult<()> {
        for (strategy, expected) in [
            (TextDownloadStrategy::Local, "photo.jpg"),
            (TextDownloadStrategy::Server, "served:photo.jpg"),
        ] {
            let converter = Arc::new(ScriptedConverter::default());
            let mut session = session_with(
                SessionSettings {
                    text_download: strategy,
                    ..Default::default()
                },
                converter.clone(),
                Arc::new(RecordingClipboard::default()),
            );
            let dir = tempfile::tempdir()?;

            session.select(file("photo.jpg", "image/jpeg"));
            session.settle().await;

            let path = session.download(dir.path()).await?;
            assert_eq!(path.file_name().unwrap(), "ascii-art.txt");
            assert_eq!(tokio::fs::read_to_string(&path).await?, expected);

            let served = converter.downloads.lock().unwrap().len();
            assert_eq!(served, usize::from(strategy == TextDownloadStrategy::Server));
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_download_without_result() {
        let mut session = session(Arc::new(ScriptedConverter::default()));
        let dir = tempfile::tempdir().unwrap();

        assert!(matches!(
            session.download(dir.path()).await,
            Err(ClientError::NoResult)
        ));
        assert!(session.take_alerts().is_empty());
    }

    #[tokio::test]
    async fn test_images_only_routes_gif_as_image() {
        let converter = Arc::new(ScriptedConverter::default());
        let mut session = session_with(
            SessionSettings {
                media_support: MediaSupport::Images,
                ..Default::default()
            },
            converter.clone(),
            Arc::new(RecordingClipboard::default()),
        );

        assert!(!session.select(file("clip.mp4", "video/mp4")));
        assert!(session.select(file("anim.gif", "image/gif")));
        session.settle().await;

        assert_eq!(
            converter.calls(),
            vec![(MediaCategory::Image, "anim.gif".to_string())]
        );
        assert_eq!(session.snapshot().download_file_name, Some("ascii-art.txt"));
        assert_eq!(
            session.take_alerts(),
            vec![UserMessage::UnsupportedFile(MediaSupport::Images)]
        );
    }
}
