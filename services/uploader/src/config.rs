//! Client configuration
//!
//! Values are layered: built-in defaults, then an optional config file, then
//! `ASCII_CONVERTER_*` environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::ClientResult;
use crate::media::MediaSupport;

/// How ASCII text results are saved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextDownloadStrategy {
    /// Write the text already held in memory
    #[default]
    Local,
    /// Ask `/api/download-ascii` to serve it back as an attachment
    Server,
}

/// Uploader configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the conversion API
    pub api_base_url: String,
    /// Which result kinds are offered
    pub media_support: MediaSupport,
    /// How text results are downloaded
    pub text_download: TextDownloadStrategy,
    /// How long the copy confirmation stays up, in milliseconds
    pub copy_confirmation_ms: u64,
    /// Where preferences are persisted; the platform config dir when unset
    #[serde(default)]
    pub state_file: Option<PathBuf>,
}

impl ClientConfig {
    /// Load configuration, optionally reading `file` first
    ///
    /// # Environment Variables
    /// - `ASCII_CONVERTER_API_BASE_URL` (default: `http://localhost:8000`)
    /// - `ASCII_CONVERTER_MEDIA_SUPPORT`: `images` or `images_and_motion`
    /// - `ASCII_CONVERTER_TEXT_DOWNLOAD`: `local` or `server`
    /// - `ASCII_CONVERTER_COPY_CONFIRMATION_MS` (default: 1500)
    /// - `ASCII_CONVERTER_STATE_FILE`
    pub fn load(file: Option<&Path>) -> ClientResult<Self> {
        let mut builder = Config::builder()
            .set_default("api_base_url", "http://localhost:8000")?
            .set_default("media_support", "images_and_motion")?
            .set_default("text_download", "local")?
            .set_default("copy_confirmation_ms", 1500)?;

        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config = builder
            .add_source(Environment::with_prefix("ASCII_CONVERTER"))
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Load configuration from the environment only
    pub fn from_env() -> ClientResult<Self> {
        Self::load(None)
    }

    pub fn copy_confirmation(&self) -> Duration {
        Duration::from_millis(self.copy_confirmation_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 4] = [
        "ASCII_CONVERTER_API_BASE_URL",
        "ASCII_CONVERTER_MEDIA_SUPPORT",
        "ASCII_CONVERTER_TEXT_DOWNLOAD",
        "ASCII_CONVERTER_COPY_CONFIRMATION_MS",
    ];

    fn clear_env() {
        unsafe {
            for var in VARS {
                std::env::remove_var(var);
            }
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();

        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config.api_base_url, "http://localhost:8000");
        assert_eq!(config.media_support, MediaSupport::ImagesAndMotion);
        assert_eq!(config.text_download, TextDownloadStrategy::Local);
        assert_eq!(config.copy_confirmation(), Duration::from_millis(1500));
    }

    #[test]
    #[serial]
    fn test_environment_overrides() {
        clear_env();
        unsafe {
            std::env::set_var("ASCII_CONVERTER_API_BASE_URL", "http://converter:9000");
            std::env::set_var("ASCII_CONVERTER_MEDIA_SUPPORT", "images");
            std::env::set_var("ASCII_CONVERTER_TEXT_DOWNLOAD", "server");
            std::env::set_var("ASCII_CONVERTER_COPY_CONFIRMATION_MS", "250");
        }

        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config.api_base_url, "http://converter:9000");
        assert_eq!(config.media_support, MediaSupport::Images);
        assert_eq!(config.text_download, TextDownloadStrategy::Server);
        assert_eq!(config.copy_confirmation_ms, 250);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_file_then_environment() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("uploader.toml");
        std::fs::write(
            &path,
            "api_base_url = \"http://from-file:1\"\ntext_download = \"server\"\n",
        )
        .unwrap();
        unsafe {
            std::env::set_var("ASCII_CONVERTER_API_BASE_URL", "http://from-env:2");
        }

        let config = ClientConfig::load(Some(&path)).unwrap();
        assert_eq!(config.api_base_url, "http://from-env:2");
        assert_eq!(config.text_download, TextDownloadStrategy::Server);

        clear_env();
    }
}
