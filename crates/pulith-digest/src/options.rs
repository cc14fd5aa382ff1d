use std::fmt;
use std::sync::Arc;

use crate::{DigestError, Result};

/// Staging buffer capacity used when none is configured.
pub const DEFAULT_BUFFER_CAPACITY: usize = 64 * 1024;

/// Largest slice handed to a hasher in one `update` when none is configured.
pub const DEFAULT_CHUNK_SIZE: usize = 4 * 1024;

/// Where a digest operation currently is.
///
/// `Idle -> Opened -> Digesting -> Finalized` on success, even for an empty
/// source; `Opened -> Digesting -> Failed` when a read fails; `Idle ->
/// FailedToOpen` when the source never opened. `Digesting` is reported again
/// after each refill of the staging buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DigestPhase {
    #[default]
    Idle,
    Opened,
    Digesting,
    Finalized,
    Failed,
    FailedToOpen,
}

impl DigestPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DigestPhase::Finalized | DigestPhase::Failed | DigestPhase::FailedToOpen
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Progress {
    pub phase:           DigestPhase,
    pub bytes_processed: u64,
    /// File length from metadata; `None` for plain readers.
    pub total_bytes:     Option<u64>,
}

impl Progress {
    pub fn percentage(&self) -> Option<f32> {
        self.total_bytes.map(|total| {
            if total == 0 {
                100.0
            } else {
                (self.bytes_processed as f32 / total as f32) * 100.0
            }
        })
    }
}

pub type ProgressCallback = Arc<dyn Fn(Progress) + Send + Sync>;

#[derive(Clone)]
pub struct DigestOptions {
    buffer_capacity: usize,
    chunk_size:      usize,
    on_progress:     Option<ProgressCallback>,
}

impl Default for DigestOptions {
    fn default() -> Self { Self::new() }
}

impl fmt::Debug for DigestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestOptions")
            .field("buffer_capacity", &self.buffer_capacity)
            .field("chunk_size", &self.chunk_size)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

impl DigestOptions {
    pub fn new() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            chunk_size:      DEFAULT_CHUNK_SIZE,
            on_progress:     None,
        }
    }

    /// Bytes requested from the source per underlying read.
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Upper bound on each slice passed to the hasher.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Called on every phase change and after each refill of the staging buffer.
    pub fn on_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    pub fn get_buffer_capacity(&self) -> usize { self.buffer_capacity }

    pub fn get_chunk_size(&self) -> usize { self.chunk_size }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(DigestError::InvalidOptions("chunk size must be non-zero"));
        }
        if self.chunk_size > self.buffer_capacity {
            return Err(DigestError::InvalidOptions(
                "chunk size exceeds buffer capacity",
            ));
        }
        Ok(())
    }

    pub(crate) fn report(&self, progress: impl FnOnce() -> Progress) {
        if let Some(callback) = &self.on_progress {
            callback(progress());
        }
    }
}
