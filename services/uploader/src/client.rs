//! HTTP client for the ASCII conversion API

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Url, header};
use serde::Deserialize;
use tracing::{error, info};

use crate::error::{ClientError, ClientResult};
use crate::media::{MediaCategory, MediaFile};
use crate::state::{ConversionPayload, TextResult};

/// Path of the text download endpoint
pub const DOWNLOAD_ASCII_PATH: &str = "/api/download-ascii";

/// Content type assumed for media payloads that do not declare one
const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

/// Body returned by `/api/process-image`
#[derive(Debug, Deserialize)]
struct ProcessImageResponse {
    #[serde(default)]
    ascii: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
}

impl From<ProcessImageResponse> for TextResult {
    fn from(body: ProcessImageResponse) -> Self {
        TextResult {
            ascii: body.ascii.unwrap_or_default(),
            width: body.width.unwrap_or(0),
            height: body.height.unwrap_or(0),
        }
    }
}

/// Remote side of a conversion
#[async_trait]
pub trait Converter: Send + Sync {
    /// Convert one file. Exactly one request is issued per call.
    async fn convert(
        &self,
        category: MediaCategory,
        file: &MediaFile,
    ) -> ClientResult<ConversionPayload>;

    /// Fetch `text` back from the server as a downloadable attachment
    async fn download_ascii(&self, text: &str) -> ClientResult<Bytes>;
}

/// Converter talking to the real API over HTTP
#[derive(Clone)]
pub struct HttpConverter {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpConverter {
    /// Create a converter for the API rooted at `base_url`. A path prefix
    /// such as `http://host/ascii` is kept in front of every endpoint.
    pub fn new(base_url: &str) -> ClientResult<Self> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| ClientError::InvalidBaseUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl(base_url.to_string()));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> ClientResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::MalformedResponse(format!("bad endpoint {path}: {e}")))
    }

    /// URL the server-side text download is served from
    pub fn download_ascii_url(&self, text: &str) -> ClientResult<Url> {
        let mut url = self.endpoint(DOWNLOAD_ASCII_PATH)?;
        url.query_pairs_mut().append_pair("text", text);
        Ok(url)
    }

    fn form_for(file: &MediaFile) -> ClientResult<Form> {
        let part = Part::bytes(file.bytes.to_vec())
            .file_name(file.name.clone())
            .mime_str(&file.content_type)?;
        Ok(Form::new().part("file", part))
    }

    async fn post_file(
        &self,
        category: MediaCategory,
        file: &MediaFile,
    ) -> ClientResult<reqwest::Response> {
        let url = self.endpoint(category.endpoint())?;
        info!("Uploading {} ({} bytes) to {}", file.name, file.bytes.len(), url);

        let response = self
            .http
            .post(url)
            .multipart(Self::form_for(file)?)
            .send()
            .await?;

        if !response.status().is_success() {
            error!(
                "Conversion of {} failed with status {}",
                file.name,
                response.status()
            );
            return Err(ClientError::Status(response.status()));
        }

        Ok(response)
    }
}

#[async_trait]
impl Converter for HttpConverter {
    async fn convert(
        &self,
        category: MediaCategory,
        file: &MediaFile,
    ) -> ClientResult<ConversionPayload> {
        let response = self.post_file(category, file).await?;

        match category {
            MediaCategory::Image => {
                let body: ProcessImageResponse = response
                    .json()
                    .await
                    .map_err(|e| ClientError::MalformedResponse(e.to_string()))?;
                Ok(ConversionPayload::Text(body.into()))
            }
            MediaCategory::Gif | MediaCategory::Video => {
                let content_type = response
                    .headers()
                    .get(header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or(FALLBACK_MEDIA_TYPE)
                    .to_string();
                let bytes = response.bytes().await?;
                Ok(ConversionPayload::Media {
                    bytes,
                    content_type,
                })
            }
        }
    }

    async fn download_ascii(&self, text: &str) -> ClientResult<Bytes> {
        let url = self.download_ascii_url(text)?;
        let response = self.http.get(url).send().await?;

        if !response.status().is_success() {
            return Err(ClientError::Status(response.status()));
        }

        Ok(response.bytes().await?)
    }
}
