//! User-facing messages, localised in Russian

use std::fmt;

use crate::media::{MediaCategory, MediaSupport};

/// Label of the copy action while idle
pub const COPY_LABEL: &str = "Скопировать ASCII";
/// Label of the copy action right after a successful copy
pub const COPY_CONFIRMED_LABEL: &str = "Скопировано!";

/// Alert surfaced to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserMessage {
    /// Selected file is not an accepted type
    UnsupportedFile(MediaSupport),
    /// Conversion request failed
    ConversionFailed(MediaCategory),
    /// Clipboard write failed
    CopyFailed,
    /// Result could not be saved
    DownloadFailed,
}

impl fmt::Display for UserMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            UserMessage::UnsupportedFile(MediaSupport::Images) => "Пожалуйста, выберите изображение",
            UserMessage::UnsupportedFile(MediaSupport::ImagesAndMotion) => {
                "Пожалуйста, выберите изображение или видео"
            }
            UserMessage::ConversionFailed(MediaCategory::Image) => {
                "Ошибка при обработке изображения"
            }
            UserMessage::ConversionFailed(_) => "Ошибка при обработке видео",
            UserMessage::CopyFailed => "Не удалось скопировать",
            UserMessage::DownloadFailed => "Не удалось сохранить файл",
        };
        f.write_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            UserMessage::ConversionFailed(MediaCategory::Image).to_string(),
            "Ошибка при обработке изображения"
        );
        assert_eq!(
            UserMessage::ConversionFailed(MediaCategory::Gif).to_string(),
            "Ошибка при обработке видео"
        );
        assert_eq!(
            UserMessage::UnsupportedFile(MediaSupport::Images).to_string(),
            "Пожалуйста, выберите изображение"
        );
        assert_eq!(UserMessage::CopyFailed.to_string(), "Не удалось скопировать");
    }
}
