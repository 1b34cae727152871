//! Persisted dark/light theme preference

use std::fmt;
use std::sync::Arc;

use common::storage::KeyValueStore;
use tracing::{info, warn};

use crate::error::ClientResult;

/// Store key the preference lives under
pub const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "dark" => Some(Theme::Dark),
            "light" => Some(Theme::Light),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Applied theme, kept in sync with its persisted value
pub struct ThemePreference {
    store: Arc<dyn KeyValueStore>,
    current: Theme,
}

impl ThemePreference {
    /// Read the stored preference, falling back to dark when it is missing,
    /// unknown or unreadable
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let current = match store.get(THEME_KEY).await {
            Ok(Some(value)) => Theme::parse(&value).unwrap_or_else(|| {
                warn!("Ignoring unknown stored theme {:?}", value);
                Theme::default()
            }),
            Ok(None) => Theme::default(),
            Err(e) => {
                warn!("Could not read stored theme, using {}: {}", Theme::default(), e);
                Theme::default()
            }
        };

        Self { store, current }
    }

    pub fn current(&self) -> Theme {
        self.current
    }

    /// Flip the theme and persist it
    pub async fn toggle(&mut self) -> ClientResult<Theme> {
        let next = self.current.toggled();
        self.store.set(THEME_KEY, next.as_str()).await?;
        self.current = next;

        info!("Theme switched to {}", next);
        Ok(next)
    }
}
