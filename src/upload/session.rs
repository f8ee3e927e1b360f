//! Upload session client
//!
//! This module provides the four remote operations of a multipart upload:
//! session initialization, per-part destination lookup, part transmission,
//! and finalization. All HTTP traffic for an upload goes through a
//! [`SessionClient`].

use crate::config::UploadConfig;
use crate::error::{Result, UploadError};
use crate::upload::types::{Chunk, PartDestination, UploadPhase, UploadSession};
use async_trait::async_trait;
use log::debug;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Remote operations of the multipart upload protocol
#[async_trait]
pub trait SessionClient: Send + Sync {
    /// Open a new upload session in the configured team and folder
    async fn initialize(&self, content_type: &str) -> Result<UploadSession>;

    /// Fetch a fresh single-use destination for one part
    ///
    /// Must be called immediately before transmitting the part, since
    /// destinations may expire.
    async fn get_part_destination(
        &self,
        session: &UploadSession,
        sequence_number: u32,
        content_type: &str,
    ) -> Result<PartDestination>;

    /// Send a chunk's raw bytes to its destination
    async fn transmit_part(&self, destination: &PartDestination, chunk: &Chunk) -> Result<()>;

    /// Ask the server to assemble the parts and register the file
    ///
    /// Returns the stored-file reference.
    async fn finalize(
        &self,
        session: &UploadSession,
        file_name: &str,
        content_type: &str,
    ) -> Result<String>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContentTypeBody<'a> {
    content_type: &'a str,
}

#[derive(Serialize)]
struct FinalizeBody<'a> {
    file: FinalizeFile<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FinalizeFile<'a> {
    content_type: &'a str,
    name: &'a str,
}

/// Every API response wraps its payload in `data`
#[derive(Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitData {
    file_id: Option<String>,
    upload_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadUrlData {
    upload_url: Option<String>,
}

#[derive(Deserialize)]
struct FinalizeData {
    file: Option<serde_json::Value>,
}

/// [`SessionClient`] speaking the storage service's HTTP API
#[derive(Debug, Clone)]
pub struct HttpSessionClient {
    http: Client,
    api_root: Url,
    config: UploadConfig,
}

impl HttpSessionClient {
    /// Create a client for the given configuration
    ///
    /// The configuration is validated here, so a missing token or destination
    /// fails before any request is made.
    pub fn new(config: UploadConfig) -> Result<Self> {
        config.validate()?;

        let api_root = Url::parse(config.api_root()).map_err(|e| {
            UploadError::config_error(format!("Invalid base URL '{}': {}", config.base_url, e))
        })?;
        if api_root.cannot_be_a_base() {
            return Err(UploadError::config_error(format!(
                "Base URL cannot carry a path: '{}'",
                config.base_url
            )));
        }

        let http = Client::builder()
            .user_agent(concat!("storage-upload/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                UploadError::config_error(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            api_root,
            config,
        })
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Build an API URL; every segment is percent-encoded on its own
    fn endpoint(&self, action: &str, tail: &[&str]) -> Url {
        let mut url = self.api_root.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend([
                    "files",
                    "upload",
                    "multipart",
                    action,
                    self.config.team_id.as_str(),
                    self.config.folder_id.as_str(),
                ])
                .extend(tail);
        }
        url
    }

    /// Authenticated JSON `PUT` against the API, returning the `data` payload
    async fn put_json<B, T>(&self, phase: UploadPhase, url: Url, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        debug!("PUT {} ({})", url, phase);

        let response = self
            .http
            .put(url)
            .header(AUTHORIZATION, format!("Bearer {}", self.config.auth_token))
            .header(CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| UploadError::from_transport(phase, e))?;

        let text = read_success_body(phase, response).await?;

        let envelope: Envelope<T> = serde_json::from_str(&text).map_err(|e| {
            UploadError::protocol(phase, format!("malformed response body: {}", e))
        })?;

        envelope
            .data
            .ok_or_else(|| UploadError::protocol(phase, "response is missing 'data'"))
    }
}

/// Read a response body, turning non-success statuses into errors
async fn read_success_body(phase: UploadPhase, response: Response) -> Result<String> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| UploadError::from_transport(phase, e))?;

    if !status.is_success() {
        return Err(UploadError::from_status(phase, status, text.trim()));
    }

    Ok(text)
}

fn required(phase: UploadPhase, field: &str, value: Option<String>) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(UploadError::protocol(
            phase,
            format!("response is missing '{}'", field),
        )),
    }
}

#[async_trait]
impl SessionClient for HttpSessionClient {
    async fn initialize(&self, content_type: &str) -> Result<UploadSession> {
        let phase = UploadPhase::Initialize;
        let url = self.endpoint("init", &[]);

        let data: InitData = self
            .put_json(phase, url, &ContentTypeBody { content_type })
            .await?;

        Ok(UploadSession {
            file_id: required(phase, "fileId", data.file_id)?,
            upload_id: required(phase, "uploadId", data.upload_id)?,
            content_type: content_type.to_string(),
            team_id: self.config.team_id.clone(),
            folder_id: self.config.folder_id.clone(),
        })
    }

    async fn get_part_destination(
        &self,
        session: &UploadSession,
        sequence_number: u32,
        content_type: &str,
    ) -> Result<PartDestination> {
        let phase = UploadPhase::PartDestination;

        if sequence_number == 0 {
            return Err(UploadError::invalid_parameter(
                "sequence_number",
                "Part numbers start at 1",
            ));
        }

        let part = sequence_number.to_string();
        let url = self.endpoint(
            "url",
            &[
                session.file_id.as_str(),
                session.upload_id.as_str(),
                part.as_str(),
            ],
        );

        let data: UploadUrlData = self
            .put_json(phase, url, &ContentTypeBody { content_type })
            .await?;

        let upload_url = required(phase, "uploadUrl", data.upload_url)?;
        if Url::parse(&upload_url).is_err() {
            return Err(UploadError::protocol(
                phase,
                format!("unusable upload URL '{}'", upload_url),
            ));
        }

        Ok(PartDestination {
            url: upload_url,
            expected_sequence_number: sequence_number,
        })
    }

    async fn transmit_part(&self, destination: &PartDestination, chunk: &Chunk) -> Result<()> {
        let phase = UploadPhase::TransmitPart;

        if destination.expected_sequence_number != chunk.sequence_number {
            return Err(UploadError::invalid_parameter(
                "chunk",
                format!(
                    "destination is for part {} but chunk is part {}",
                    destination.expected_sequence_number, chunk.sequence_number
                ),
            ));
        }

        debug!("PUT part {} ({} bytes)", chunk.sequence_number, chunk.size());

        // The destination is pre-authorized; no bearer token here.
        let response = self
            .http
            .put(&destination.url)
            .body(chunk.data.clone())
            .send()
            .await
            .map_err(|e| UploadError::from_transport(phase, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::network(
                phase,
                format!(
                    "part {} rejected with {}: {}",
                    chunk.sequence_number,
                    status,
                    body.trim()
                ),
            ));
        }

        Ok(())
    }

    async fn finalize(
        &self,
        session: &UploadSession,
        file_name: &str,
        content_type: &str,
    ) -> Result<String> {
        let phase = UploadPhase::Finalize;
        let url = self.endpoint(
            "finalize",
            &[session.file_id.as_str(), session.upload_id.as_str()],
        );

        let body = FinalizeBody {
            file: FinalizeFile {
                content_type,
                name: file_name,
            },
        };

        let data: FinalizeData = self.put_json(phase, url, &body).await?;

        // A reference is either an opaque string or a file record object.
        match data.file {
            Some(serde_json::Value::String(reference)) if !reference.trim().is_empty() => {
                Ok(reference)
            }
            Some(record @ serde_json::Value::Object(_)) => Ok(record.to_string()),
            Some(serde_json::Value::Null) | Some(serde_json::Value::String(_)) | None => Err(
                UploadError::protocol(phase, "response is missing the stored file reference"),
            ),
            Some(other) => Err(UploadError::protocol(
                phase,
                format!("unexpected stored file reference: {}", other),
            )),
        }
    }
}
