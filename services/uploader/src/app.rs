//! Top-level wiring of the uploader

use std::sync::Arc;

use common::storage::{FileStore, KeyValueStore, StoreConfig};
use tracing::info;

use crate::client::{Converter, HttpConverter};
use crate::clipboard::{Clipboard, SystemClipboard};
use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::probe::{MediaProbe, MetadataProbe};
use crate::session::{Session, SessionSettings};
use crate::state::ViewSnapshot;
use crate::theme::{Theme, ThemePreference};

/// Everything the page renders
#[derive(Debug, Clone, PartialEq)]
pub struct AppSnapshot {
    pub theme: Theme,
    pub view: ViewSnapshot,
}

/// The theme shell around one upload session
pub struct App {
    session: Session,
    theme: ThemePreference,
}

impl App {
    pub fn new(session: Session, theme: ThemePreference) -> Self {
        Self { session, theme }
    }

    /// Build the app against the real API, clipboard and state file
    pub async fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        let http = HttpConverter::new(&config.api_base_url)?;
        let converter_base = http.base_url().to_string();
        let converter: Arc<dyn Converter> = Arc::new(http);
        let probe: Arc<dyn MetadataProbe> = Arc::new(MediaProbe::default());
        let clipboard: Arc<dyn Clipboard> = Arc::new(SystemClipboard);

        let store_config = StoreConfig::resolve(config.state_file.clone())?;
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(&store_config));
        let theme = ThemePreference::load(store).await;

        info!(
            "Uploader ready against {} with {} theme",
            converter_base,
            theme.current()
        );

        let session = Session::new(SessionSettings::from(config), converter, probe, clipboard);
        Ok(Self::new(session, theme))
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn theme(&self) -> Theme {
        self.theme.current()
    }

    pub async fn toggle_theme(&mut self) -> ClientResult<Theme> {
        self.theme.toggle().await
    }

    pub fn snapshot(&self) -> AppSnapshot {
        AppSnapshot {
            theme: self.theme.current(),
            view: self.session.snapshot(),
        }
    }
}
