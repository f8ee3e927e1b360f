//! Chunk reader for multipart uploads
//!
//! Splits a file into an ordered sequence of fixed-size chunks. Reads are
//! sequential and the reader cannot be rewound; every chunk but the last is
//! exactly `chunk_size` bytes long.

use crate::error::{Result, UploadError};
use crate::upload::types::Chunk;
use futures::stream::{self, Stream};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// Lazily reads a file as numbered chunks
#[derive(Debug)]
pub struct ChunkReader {
    file: File,
    path: PathBuf,
    chunk_size: usize,
    file_size: u64,
    next_sequence: u32,
    bytes_read: u64,
    finished: bool,
}

impl ChunkReader {
    /// Open `path` for chunked reading
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `chunk_size` is zero
    /// - The file cannot be opened or is not a regular file
    pub async fn open(path: impl AsRef<Path>, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(UploadError::invalid_parameter(
                "chunk_size",
                "Chunk size must be greater than 0",
            ));
        }

        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).await?;
        let metadata = file.metadata().await?;

        if !metadata.is_file() {
            return Err(UploadError::invalid_parameter(
                "path",
                format!("Not a regular file: {}", path.display()),
            ));
        }

        Ok(Self {
            file,
            path,
            chunk_size,
            file_size: metadata.len(),
            next_sequence: 1,
            bytes_read: 0,
            finished: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Size of the file when it was opened
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Number of chunks the file splits into, `ceil(file_size / chunk_size)`
    pub fn total_chunks(&self) -> u32 {
        self.file_size.div_ceil(self.chunk_size as u64) as u32
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Read the next chunk, or `None` once the file is exhausted
    ///
    /// A chunk is only short when the end of file is reached while filling it.
    pub async fn next_chunk(&mut self) -> Result<Option<Chunk>> {
        if self.finished {
            return Ok(None);
        }

        let remaining = self.file_size.saturating_sub(self.bytes_read);
        let mut data = Vec::with_capacity(remaining.min(self.chunk_size as u64) as usize);
        (&mut self.file)
            .take(self.chunk_size as u64)
            .read_to_end(&mut data)
            .await?;

        if data.len() < self.chunk_size {
            self.finished = true;
        }

        if data.is_empty() {
            return Ok(None);
        }

        let chunk = Chunk::new(self.next_sequence, data);
        self.next_sequence += 1;
        self.bytes_read += chunk.size() as u64;

        Ok(Some(chunk))
    }

    /// Consume the reader as a stream of chunks
    pub fn into_stream(self) -> impl Stream<Item = Result<Chunk>> {
        stream::try_unfold(self, |mut reader| async move {
            let next = reader.next_chunk().await?;
            Ok::<_, UploadError>(next.map(|chunk| (chunk, reader)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_file_with(len: usize) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        file.write_all(&data).unwrap();
        file.flush().unwrap();
        file
    }

    async fn read_all(path: &Path, chunk_size: usize) -> Vec<Chunk> {
        let reader = ChunkReader::open(path, chunk_size).await.unwrap();
        reader.into_stream().try_collect().await.unwrap()
    }

    #[tokio::test]
    async fn test_chunk_count_and_sizes() {
        for (len, chunk_size) in [(10, 3), (9, 3), (1, 3), (3, 3), (1000, 64)] {
            let file = temp_file_with(len);
            let chunks = read_all(file.path(), chunk_size).await;

            assert_eq!(chunks.len(), len.div_ceil(chunk_size));
            assert_eq!(chunks.iter().map(Chunk::size).sum::<usize>(), len);

            let (last, rest) = chunks.split_last().unwrap();
            assert!(rest.iter().all(|c| c.size() == chunk_size));
            assert!(last.size() <= chunk_size && last.size() > 0);
        }
    }

    #[tokio::test]
    async fn test_sequence_numbers_are_contiguous() {
        let file = temp_file_with(100);
        let chunks = read_all(file.path(), 7).await;

        let numbers: Vec<u32> = chunks.iter().map(|c| c.sequence_number).collect();
        let expected: Vec<u32> = (1..=chunks.len() as u32).collect();
        assert_eq!(numbers, expected);
    }

    #[tokio::test]
    async fn test_chunks_reassemble_file() {
        let file = temp_file_with(4096 + 17);
        let chunks = read_all(file.path(), 512).await;

        let joined: Vec<u8> = chunks.into_iter().flat_map(|c| c.data).collect();
        assert_eq!(joined, std::fs::read(file.path()).unwrap());
    }

    #[tokio::test]
    async fn test_empty_file_yields_no_chunks() {
        let file = temp_file_with(0);
        let mut reader = ChunkReader::open(file.path(), 16).await.unwrap();
        assert_eq!(reader.total_chunks(), 0);
        assert!(reader.next_chunk().await.unwrap().is_none());
        assert!(reader.next_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_total_chunks_matches_reads() {
        let file = temp_file_with(12 * 1024);
        let mut reader = ChunkReader::open(file.path(), 5 * 1024).await.unwrap();
        assert_eq!(reader.total_chunks(), 3);

        let mut sizes = Vec::new();
        while let Some(chunk) = reader.next_chunk().await.unwrap() {
            sizes.push(chunk.size());
        }
        assert_eq!(sizes, vec![5 * 1024, 5 * 1024, 2 * 1024]);
        assert_eq!(reader.bytes_read(), 12 * 1024);
    }

    #[tokio::test]
    async fn test_huge_chunk_size_reads_small_file() {
        let file = temp_file_with(10);
        let mut reader = ChunkReader::open(file.path(), usize::MAX).await.unwrap();
        assert_eq!(reader.total_chunks(), 1);

        let chunk = reader.next_chunk().await.unwrap().unwrap();
        assert_eq!(chunk.sequence_number, 1);
        assert_eq!(chunk.size(), 10);
        assert!(reader.next_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_open_errors() {
        let file = temp_file_with(10);
        let err = ChunkReader::open(file.path(), 0).await.unwrap_err();
        assert!(matches!(err, UploadError::InvalidParameter { .. }));

        let err = ChunkReader::open("/definitely/not/here.bin", 16)
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Io(_)));

        let dir = tempfile::tempdir().unwrap();
        assert!(ChunkReader::open(dir.path(), 16).await.is_err());
    }
}
