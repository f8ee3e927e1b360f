use crate::error::{Result, UploadError};
use std::fmt;
use std::sync::Arc;

/// Content type used when the caller does not specify one
pub const DEFAULT_CONTENT_TYPE: &str = "video/mp4";

/// The remote call an error or log line belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    Initialize,
    PartDestination,
    TransmitPart,
    Finalize,
}

impl fmt::Display for UploadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadPhase::Initialize => write!(f, "initialize"),
            UploadPhase::PartDestination => write!(f, "part destination"),
            UploadPhase::TransmitPart => write!(f, "transmit part"),
            UploadPhase::Finalize => write!(f, "finalize"),
        }
    }
}

/// Lifecycle of a single upload driven by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    Initializing,
    UploadingParts,
    Finalizing,
    Completed,
    Failed,
}

impl UploadState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadState::Completed | UploadState::Failed)
    }

    /// Whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: UploadState) -> bool {
        use UploadState::*;
        match (self, next) {
            (Idle, Initializing)
            | (Initializing, UploadingParts)
            | (UploadingParts, Finalizing)
            | (Finalizing, Completed) => true,
            (current, Failed) => !current.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadState::Idle => write!(f, "idle"),
            UploadState::Initializing => write!(f, "initializing"),
            UploadState::UploadingParts => write!(f, "uploading_parts"),
            UploadState::Finalizing => write!(f, "finalizing"),
            UploadState::Completed => write!(f, "completed"),
            UploadState::Failed => write!(f, "failed"),
        }
    }
}

/// Server-side multipart session for one file
///
/// Immutable once created. Nothing on the client cleans it up; an abandoned
/// session is left for the service to expire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSession {
    pub file_id: String,
    pub upload_id: String,
    pub content_type: String,
    pub team_id: String,
    pub folder_id: String,
}

/// A contiguous byte range of the source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 1-based position in upload order
    pub sequence_number: u32,
    pub data: Vec<u8>,
}

impl Chunk {
    pub fn new(sequence_number: u32, data: Vec<u8>) -> Self {
        Self {
            sequence_number,
            data,
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Single-use location one chunk's bytes are sent to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartDestination {
    pub url: String,
    pub expected_sequence_number: u32,
}

#[derive(Debug, Clone)]
pub struct UploadProgress {
    pub bytes_uploaded: u64,
    pub total_bytes: u64,
    pub percentage: f64,
    pub current_part: u32,
    pub total_parts: u32,
    pub state: UploadState,
}

impl UploadProgress {
    pub fn new(
        state: UploadState,
        bytes_uploaded: u64,
        total_bytes: u64,
        current_part: u32,
        total_parts: u32,
    ) -> Self {
        let percentage = if total_bytes > 0 {
            bytes_uploaded as f64 / total_bytes as f64
        } else if state == UploadState::Completed {
            1.0
        } else {
            0.0
        };

        Self {
            bytes_uploaded,
            total_bytes,
            percentage: percentage.min(1.0),
            current_part,
            total_parts,
            state,
        }
    }
}

/// Per-upload options
#[derive(Clone)]
pub struct UploadOptions {
    pub content_type: String,
    pub file_name: Option<String>,
    pub on_progress: Option<Arc<dyn Fn(UploadProgress) + Send + Sync>>,
}

impl fmt::Debug for UploadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadOptions")
            .field("content_type", &self.content_type)
            .field("file_name", &self.file_name)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            file_name: None,
            on_progress: None,
        }
    }
}

impl UploadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Name registered with the stored file; defaults to the path's basename
    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(UploadProgress) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.content_type.trim().is_empty() {
            return Err(UploadError::invalid_parameter(
                "content_type",
                "Content type cannot be empty",
            ));
        }

        if let Some(ref name) = self.file_name {
            if name.trim().is_empty() {
                return Err(UploadError::invalid_parameter(
                    "file_name",
                    "File name cannot be empty",
                ));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    /// Reference to the stored file returned by finalize
    pub stored_file_reference: String,
    pub file_name: String,
    pub size: u64,
    pub parts: u32,
    pub duration_ms: u64,
    /// Hex SHA-256 of the transmitted bytes
    pub sha256: String,
}

impl UploadResult {
    pub fn new(stored_file_reference: String) -> Self {
        Self {
            stored_file_reference,
            file_name: String::new(),
            size: 0,
            parts: 0,
            duration_ms: 0,
            sha256: String::new(),
        }
    }

    pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn parts(mut self, parts: u32) -> Self {
        self.parts = parts;
        self
    }

    pub fn duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn sha256(mut self, sha256: impl Into<String>) -> Self {
        self.sha256 = sha256.into();
        self
    }

    pub fn size_display(&self) -> String {
        bytesize::ByteSize::b(self.size).to_string()
    }
}
