//! Upload orchestration
//!
//! Drives a [`ChunkReader`] and a [`SessionClient`] through one complete
//! multipart upload: initialize, one destination lookup and transmission per
//! chunk in order, then finalize. Parts are sent strictly one at a time.
//!
//! Any failure moves the upload to [`UploadState::Failed`] and is returned
//! unchanged. A session that fails part way is abandoned, never finalized.

use crate::config::UploadConfig;
use crate::error::{Result, UploadError};
use crate::upload::chunks::ChunkReader;
use crate::upload::session::{HttpSessionClient, SessionClient};
use crate::upload::types::{
    Chunk, UploadOptions, UploadProgress, UploadResult, UploadSession, UploadState,
};
use futures::TryStreamExt;
use log::{debug, error, info, warn};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::{Duration, Instant};

/// Uploads files through a [`SessionClient`]
///
/// An `Uploader` holds no per-upload state, so one instance can run several
/// uploads concurrently; each call to [`Uploader::upload`] owns its own
/// session and file cursor.
#[derive(Debug)]
pub struct Uploader<C> {
    client: C,
    chunk_size: usize,
    max_part_retries: u32,
    retry_delay: Duration,
}

impl Uploader<HttpSessionClient> {
    /// Create an uploader talking HTTP to the configured service
    pub fn from_config(config: UploadConfig) -> Result<Self> {
        let client = HttpSessionClient::new(config.clone())?;
        Ok(Self::new(client, &config))
    }
}

impl<C> Uploader<C>
where
    C: SessionClient,
{
    pub fn new(client: C, config: &UploadConfig) -> Self {
        Self {
            client,
            chunk_size: config.chunk_size,
            max_part_retries: config.max_part_retries,
            retry_delay: config.retry_delay,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Upload the file at `path` as a multipart upload
    ///
    /// # Returns
    ///
    /// An `UploadResult` carrying the stored-file reference from finalize
    ///
    /// # Errors
    ///
    /// Returns the error of the first phase that failed. The file is opened
    /// before any network call, so a missing or empty file never creates a
    /// remote session.
    pub async fn upload(
        &self,
        path: impl AsRef<Path>,
        options: &UploadOptions,
    ) -> Result<UploadResult> {
        let path = path.as_ref();
        let mut run = UploadRun::new(options);

        match self.run(path, options, &mut run).await {
            Ok(result) => Ok(result),
            Err(e) => {
                error!("Upload of {} failed in state {}: {}", path.display(), run.state, e);
                run.transition(UploadState::Failed);
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        path: &Path,
        options: &UploadOptions,
        run: &mut UploadRun<'_>,
    ) -> Result<UploadResult> {
        options.validate()?;

        let file_name = match options.file_name {
            Some(ref name) => name.clone(),
            None => path
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
                .ok_or_else(|| {
                    UploadError::invalid_parameter(
                        "path",
                        format!("Cannot derive a file name from {}", path.display()),
                    )
                })?,
        };

        let reader = ChunkReader::open(path, self.chunk_size).await?;
        if reader.file_size() == 0 {
            return Err(UploadError::invalid_parameter(
                "path",
                format!("File is empty: {}", path.display()),
            ));
        }

        run.total_bytes = reader.file_size();
        run.total_parts = reader.total_chunks();
        let start_time = Instant::now();

        run.transition(UploadState::Initializing);
        let session = self.client.initialize(&options.content_type).await?;
        info!(
            "Started upload session {} for {} ({}, {} parts)",
            session.upload_id,
            file_name,
            bytesize::ByteSize::b(run.total_bytes),
            run.total_parts
        );

        run.transition(UploadState::UploadingParts);
        let mut hasher = Sha256::new();
        let chunks = reader.into_stream();
        futures::pin_mut!(chunks);
        while let Some(chunk) = chunks.try_next().await? {
            self.send_part(&session, &chunk, &options.content_type).await?;

            hasher.update(&chunk.data);
            run.part_done(&chunk);
            debug!(
                "Uploaded part {}/{} of {}",
                chunk.sequence_number, run.total_parts, file_name
            );
        }

        run.transition(UploadState::Finalizing);
        let reference = self
            .client
            .finalize(&session, &file_name, &options.content_type)
            .await?;

        run.transition(UploadState::Completed);
        let duration = start_time.elapsed();
        info!(
            "Upload of {} completed in {} ms",
            file_name,
            duration.as_millis()
        );

        Ok(UploadResult::new(reference)
            .file_name(file_name)
            .size(run.bytes_uploaded)
            .parts(run.current_part)
            .duration_ms(duration.as_millis() as u64)
            .sha256(format!("{:x}", hasher.finalize())))
    }

    /// Send one chunk, retrying network failures on a fresh destination
    ///
    /// Only failures of the transmission itself are retried; the part keeps
    /// its sequence number across attempts.
    async fn send_part(
        &self,
        session: &UploadSession,
        chunk: &Chunk,
        content_type: &str,
    ) -> Result<()> {
        let mut attempt = 0;

        loop {
            let destination = self
                .client
                .get_part_destination(session, chunk.sequence_number, content_type)
                .await?;

            match self.client.transmit_part(&destination, chunk).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() && attempt < self.max_part_retries => {
                    attempt += 1;
                    warn!(
                        "Part {} failed ({}), retry {}/{}",
                        chunk.sequence_number, e, attempt, self.max_part_retries
                    );
                    tokio::time::sleep(self.retry_delay * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Per-call upload state
struct UploadRun<'a> {
    options: &'a UploadOptions,
    state: UploadState,
    bytes_uploaded: u64,
    total_bytes: u64,
    current_part: u32,
    total_parts: u32,
}

impl<'a> UploadRun<'a> {
    fn new(options: &'a UploadOptions) -> Self {
        Self {
            options,
            state: UploadState::Idle,
            bytes_uploaded: 0,
            total_bytes: 0,
            current_part: 0,
            total_parts: 0,
        }
    }

    fn transition(&mut self, next: UploadState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        debug!("Upload state {} -> {}", self.state, next);
        self.state = next;
        self.report();
    }

    fn part_done(&mut self, chunk: &Chunk) {
        self.current_part = chunk.sequence_number;
        self.bytes_uploaded += chunk.size() as u64;
        self.report();
    }

    fn report(&self) {
        if let Some(ref callback) = self.options.on_progress {
            callback(UploadProgress::new(
                self.state,
                self.bytes_uploaded,
                self.total_bytes,
                self.current_part,
                self.total_parts,
            ));
        }
    }
}
