//! Client for the ASCII converter API
//!
//! The uploader takes one media item at a time through selection, local
//! preview, remote conversion and result display. The state machine lives in
//! [`state`] and is driven by the [`session::Session`] event loop; the I/O
//! it needs sits behind the [`client::Converter`], [`probe::MetadataProbe`]
//! and [`clipboard::Clipboard`] traits.

pub mod app;
pub mod client;
pub mod clipboard;
pub mod config;
pub mod error;
pub mod handles;
pub mod media;
pub mod messages;
pub mod probe;
pub mod session;
pub mod state;
pub mod theme;

pub use app::{App, AppSnapshot};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use media::{MediaCategory, MediaFile, MediaSupport};
pub use session::{Session, SessionSettings};
pub use state::{Phase, ResultView, ViewSnapshot};
