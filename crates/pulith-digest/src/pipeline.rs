use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::{
    AnyHasher, ChunkedReader, DigestError, DigestOptions, DigestPhase, HashAlgorithm, Hasher,
    Progress, ReadStats, Result,
};

/// Outcome of a successful digest.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DigestReport {
    /// Bytes fed to the hasher.
    pub bytes:   u64,
    /// `update` calls made.
    pub chunks:  u64,
    /// Underlying reads issued, including the one that hit end of stream.
    pub reads:   u64,
    pub refills: u64,
}

impl From<ReadStats> for DigestReport {
    fn from(stats: ReadStats) -> Self {
        Self {
            bytes:   stats.bytes,
            chunks:  stats.chunks,
            reads:   stats.reads,
            refills: stats.refills,
        }
    }
}

/// Digest the file at `path` into `out`.
///
/// `out` must be exactly `hasher.output_len()` bytes long and is written only
/// on success. On [`DigestError::Open`] the hasher is not touched; on
/// [`DigestError::Read`] it holds a partial state and must be reset before reuse.
pub fn digest_file<H: Hasher + ?Sized>(
    path: impl AsRef<Path>,
    hasher: &mut H,
    out: &mut [u8],
    options: &DigestOptions,
) -> Result<DigestReport> {
    let path = path.as_ref();
    let _span = tracing::debug_span!("digest_file", path = %path.display()).entered();

    check_output(hasher, out)?;
    options.validate()?;

    let (file, total_bytes) = match open(path) {
        Ok(opened) => opened,
        Err(source) => {
            tracing::warn!(error = %source, "cannot open file for digest");
            options.report(|| Progress {
                phase: DigestPhase::FailedToOpen,
                bytes_processed: 0,
                total_bytes: None,
            });
            return Err(DigestError::Open {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    run(file, total_bytes, hasher, out, options).map_err(|e| e.with_path(path))
}

/// Digest everything `reader` yields into `out`.
///
/// Same contract as [`digest_file`], with read failures reported as
/// [`DigestError::Stream`].
pub fn digest_reader<R: Read, H: Hasher + ?Sized>(
    reader: R,
    hasher: &mut H,
    out: &mut [u8],
    options: &DigestOptions,
) -> Result<DigestReport> {
    check_output(hasher, out)?;
    options.validate()?;
    run(reader, None, hasher, out, options)
}

fn check_output<H: Hasher + ?Sized>(hasher: &H, out: &[u8]) -> Result<()> {
    let expected = hasher.output_len();
    if out.len() != expected {
        return Err(DigestError::OutputLength {
            expected,
            actual: out.len(),
        });
    }
    Ok(())
}

fn open(path: &Path) -> io::Result<(File, Option<u64>)> {
    let file = File::open(path)?;
    let metadata = file.metadata()?;
    if metadata.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::IsADirectory,
            "path is a directory",
        ));
    }
    let total_bytes = metadata.is_file().then(|| metadata.len());
    Ok((file, total_bytes))
}

fn run<R: Read, H: Hasher + ?Sized>(
    source: R,
    total_bytes: Option<u64>,
    hasher: &mut H,
    out: &mut [u8],
    options: &DigestOptions,
) -> Result<DigestReport> {
    options.report(|| Progress {
        phase: DigestPhase::Opened,
        bytes_processed: 0,
        total_bytes,
    });

    hasher.reset();
    let mut reader = ChunkedReader::with_options(source, options)?;
    options.report(|| Progress {
        phase: DigestPhase::Digesting,
        bytes_processed: 0,
        total_bytes,
    });

    let mut seen_refills = 0;
    let outcome = loop {
        match reader.next_chunk() {
            Ok(Some(chunk)) => hasher.update(chunk),
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        }

        let stats = reader.stats();
        if stats.refills != seen_refills {
            seen_refills = stats.refills;
            options.report(|| Progress {
                phase: DigestPhase::Digesting,
                bytes_processed: stats.bytes,
                total_bytes,
            });
        }
    };

    let stats = reader.stats();
    // Release the source and staging buffer before finalizing or reporting failure.
    drop(reader);

    if let Err(source) = outcome {
        tracing::warn!(error = %source, bytes = stats.bytes, "digest aborted by read failure");
        options.report(|| Progress {
            phase: DigestPhase::Failed,
            bytes_processed: stats.bytes,
            total_bytes,
        });
        return Err(DigestError::Stream(source));
    }

    hasher.finalize_into(out);
    options.report(|| Progress {
        phase: DigestPhase::Finalized,
        bytes_processed: stats.bytes,
        total_bytes,
    });
    tracing::debug!(
        bytes = stats.bytes,
        chunks = stats.chunks,
        reads = stats.reads,
        "digest finalized"
    );

    Ok(DigestReport::from(stats))
}

/// A hasher bundled with the options it is driven with.
///
/// Each call resets the hasher first, so one pipeline can digest many sources
/// in turn. Digesting in parallel needs one pipeline per thread.
pub struct DigestPipeline<H = AnyHasher> {
    hasher:  H,
    options: DigestOptions,
}

impl DigestPipeline<AnyHasher> {
    pub fn for_algorithm(algorithm: HashAlgorithm) -> Self { Self::new(algorithm.hasher()) }

    pub fn algorithm(&self) -> HashAlgorithm { self.hasher.algorithm() }
}

impl<H: Hasher> DigestPipeline<H> {
    pub fn new(hasher: H) -> Self {
        Self {
            hasher,
            options: DigestOptions::default(),
        }
    }

    pub fn with_options(mut self, options: DigestOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &DigestOptions { &self.options }

    pub fn hasher(&self) -> &H { &self.hasher }

    pub fn into_hasher(self) -> H { self.hasher }

    pub fn output_len(&self) -> usize { self.hasher.output_len() }

    pub fn digest_file(&mut self, path: impl AsRef<Path>, out: &mut [u8]) -> Result<DigestReport> {
        digest_file(path, &mut self.hasher, out, &self.options)
    }

    pub fn digest_reader<R: Read>(&mut self, reader: R, out: &mut [u8]) -> Result<DigestReport> {
        digest_reader(reader, &mut self.hasher, out, &self.options)
    }

    pub fn digest_file_to_vec(&mut self, path: impl AsRef<Path>) -> Result<Vec<u8>> {
        let mut out = vec![0; self.output_len()];
        self.digest_file(path, &mut out)?;
        Ok(out)
    }
}
