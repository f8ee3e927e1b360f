pub mod config;
pub mod error;
pub mod upload;

pub use config::{UploadConfig, DEFAULT_BASE_URL, DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE};

pub use error::{Result, UploadError};

pub use upload::{
    Chunk, ChunkReader, HttpSessionClient, PartDestination, SessionClient, UploadOptions,
    UploadPhase, UploadProgress, UploadResult, UploadSession, UploadState, Uploader,
    DEFAULT_CONTENT_TYPE,
};
