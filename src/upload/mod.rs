//! Multipart upload
//!
//! This module splits a file into parts, negotiates a multipart session with
//! the remote storage service, sends the parts in order, and finalizes the
//! session.

pub mod chunks;
pub mod orchestrator;
pub mod session;
pub mod types;

pub use chunks::ChunkReader;
pub use orchestrator::Uploader;
pub use session::{HttpSessionClient, SessionClient};
pub use types::{
    Chunk, PartDestination, UploadOptions, UploadPhase, UploadProgress, UploadResult,
    UploadSession, UploadState, DEFAULT_CONTENT_TYPE,
};
