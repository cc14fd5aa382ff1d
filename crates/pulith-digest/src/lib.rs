//! Bounded-memory file digests.
//!
//! Streams a file through a fixed-size staging buffer and hands it to an
//! incremental hasher in small fixed-size chunks. Storage sees few large reads;
//! the hasher sees cache-sized `update` calls.
//!
//! # Key Features
//!
//! - **Double buffering**: [`ChunkedReader`] decouples the read size (`buffer_capacity`)
//!   from the update size (`chunk_size`)
//! - **Algorithm-agnostic**: the pipeline only needs the minimal [`Hasher`] trait
//! - **Precise failures**: open and read failures are distinct and carry the path
//!
//! # Example
//!
//! ```
//! use pulith_digest::{DigestOptions, Sha256Hasher, digest_reader};
//!
//! let data = b"hello world";
//! let mut hasher = Sha256Hasher::new();
//! let mut out = [0u8; 32];
//! let options = DigestOptions::new().buffer_capacity(8).chunk_size(4);
//!
//! digest_reader(&data[..], &mut hasher, &mut out, &options).unwrap();
//! assert_eq!(out.to_vec(), Sha256Hasher::digest(data));
//! ```

pub use self::error::{DigestError, Result};
pub use self::hasher::{
    AnyHasher, DigestHasher, HashAlgorithm, Hasher, Sha256Hasher, Sha512Hasher,
};
pub use self::options::{
    DEFAULT_BUFFER_CAPACITY, DEFAULT_CHUNK_SIZE, DigestOptions, DigestPhase, Progress,
    ProgressCallback,
};
pub use self::pipeline::{DigestPipeline, DigestReport, digest_file, digest_reader};
pub use self::reader::{ChunkedReader, ReadStats};

#[cfg(feature = "sha3")]
pub use self::hasher::Sha3_256Hasher;

#[cfg(feature = "blake3")]
pub use self::hasher::Blake3Hasher;

mod error;
mod hasher;
mod options;
mod pipeline;
mod reader;
