use std::io::{self, Read};

use crate::{DigestOptions, Result};

/// Counters for one [`ChunkedReader`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReadStats {
    /// Calls into the wrapped reader that returned, including the final empty one.
    pub reads:   u64,
    /// Reads that put at least one byte into the staging buffer.
    pub refills: u64,
    /// Chunks handed out.
    pub chunks:  u64,
    /// Bytes handed out.
    pub bytes:   u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Active,
    Exhausted,
    Failed,
}

/// Double-buffered reader.
///
/// Pulls up to `capacity` bytes per call from the wrapped source into an owned
/// staging buffer and serves them back in chunks of at most `chunk_size`.
/// Every byte of the source is served exactly once, in order.
///
/// End of stream and failure are both terminal: once the source reports
/// `Ok(0)` every later call yields end of stream without touching the source,
/// and once it reports an error every later call fails.
pub struct ChunkedReader<R> {
    inner:      R,
    staging:    Box<[u8]>,
    /// Next unserved byte in `staging`.
    pos:        usize,
    /// Valid bytes in `staging`; `pos <= filled <= staging.len()`.
    filled:     usize,
    chunk_size: usize,
    state:      State,
    stats:      ReadStats,
}

impl<R> ChunkedReader<R> {
    pub fn new(inner: R, capacity: usize, chunk_size: usize) -> Result<Self> {
        DigestOptions::new()
            .buffer_capacity(capacity)
            .chunk_size(chunk_size)
            .validate()?;

        Ok(Self {
            inner,
            staging: vec![0; capacity].into_boxed_slice(),
            pos: 0,
            filled: 0,
            chunk_size,
            state: State::Active,
            stats: ReadStats::default(),
        })
    }

    pub fn with_options(inner: R, options: &DigestOptions) -> Result<Self> {
        Self::new(inner, options.get_buffer_capacity(), options.get_chunk_size())
    }

    pub fn capacity(&self) -> usize { self.staging.len() }

    pub fn chunk_size(&self) -> usize { self.chunk_size }

    pub fn stats(&self) -> ReadStats { self.stats }

    /// Bytes staged but not yet served.
    pub fn buffered(&self) -> usize { self.filled - self.pos }

    pub fn is_exhausted(&self) -> bool { self.state == State::Exhausted }

    pub fn is_failed(&self) -> bool { self.state == State::Failed }

    /// Give back the wrapped source. Staged bytes are dropped.
    pub fn into_inner(self) -> R { self.inner }
}

impl<R: Read> ChunkedReader<R> {
    /// Lend the next chunk straight out of the staging buffer.
    ///
    /// Returns `Ok(None)` at end of stream. Every chunk holds exactly
    /// `chunk_size` bytes except the last one before end of stream, which may
    /// be shorter.
    pub fn next_chunk(&mut self) -> io::Result<Option<&[u8]>> {
        if self.state == State::Failed {
            return Err(io::Error::other("source failed on an earlier read"));
        }
        if self.state == State::Active && self.buffered() < self.chunk_size {
            self.refill()?;
        }
        if self.pos == self.filled {
            return Ok(None);
        }

        let start = self.pos;
        let end = self.filled.min(start + self.chunk_size);
        self.pos = end;
        self.stats.chunks += 1;
        self.stats.bytes += (end - start) as u64;
        Ok(Some(&self.staging[start..end]))
    }

    /// Copy the next chunk into `out` and return its length; `0` means end of stream.
    ///
    /// `out` must hold at least `chunk_size` bytes.
    pub fn read_chunk(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.len() < self.chunk_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "output buffer smaller than chunk size",
            ));
        }

        match self.next_chunk()? {
            Some(chunk) => {
                out[..chunk.len()].copy_from_slice(chunk);
                Ok(chunk.len())
            }
            None => Ok(0),
        }
    }

    /// Move the unserved tail to the front of the staging buffer and read
    /// behind it until a full chunk is staged or the source ends.
    fn refill(&mut self) -> io::Result<()> {
        let leftover = self.buffered();
        self.staging.copy_within(self.pos..self.filled, 0);
        self.pos = 0;
        self.filled = leftover;

        while self.filled < self.chunk_size {
            let space = self.staging.len() - self.filled;
            match self.inner.read(&mut self.staging[self.filled..]) {
                Ok(0) => {
                    self.stats.reads += 1;
                    self.state = State::Exhausted;
                    tracing::trace!(reads = self.stats.reads, "source exhausted");
                    return Ok(());
                }
                Ok(n) if n > space => {
                    self.state = State::Failed;
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "source reported more bytes than the buffer holds",
                    ));
                }
                Ok(n) => {
                    self.stats.reads += 1;
                    self.stats.refills += 1;
                    self.filled += n;
                    tracing::trace!(
                        filled = self.filled,
                        refills = self.stats.refills,
                        "staging buffer refilled"
                    );
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.state = State::Failed;
                    return Err(e);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DigestError;
    use std::io::Cursor;

    fn collect_chunks<R: Read>(reader: &mut ChunkedReader<R>) -> Vec<Vec<u8>> {
        let mut chunks = Vec::new();
        while let Some(chunk) = reader.next_chunk().unwrap() {
            chunks.push(chunk.to_vec());
        }
        chunks
    }

    /// Returns at most `step` bytes per read.
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.data.len().min(self.step).min(buf.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    /// Serves `good` bytes, then fails.
    struct FailAfter {
        good:  Cursor<Vec<u8>>,
        calls: usize,
    }

    impl Read for FailAfter {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.calls += 1;
            match self.good.read(buf)? {
                0 => Err(io::Error::new(io::ErrorKind::BrokenPipe, "device removed")),
                n => Ok(n),
            }
        }
    }

    #[test]
    fn test_abc_split_into_two_chunks() {
        let mut reader = ChunkedReader::new(Cursor::new(b"abc".to_vec()), 4, 2).unwrap();
        assert_eq!(collect_chunks(&mut reader), vec![b"ab".to_vec(), b"c".to_vec()]);
        assert!(reader.is_exhausted());
    }

    #[test]
    fn test_refill_boundary_not_multiple_of_chunk() {
        let data: Vec<u8> = (0..=9).collect();
        let mut reader = ChunkedReader::new(Cursor::new(data.clone()), 4, 3).unwrap();
        let chunks = collect_chunks(&mut reader);

        // reads of 4, 3, 3 bytes; the tail of each fill carries over
        assert_eq!(chunks, vec![vec![0, 1, 2], vec![3, 4, 5], vec![6, 7, 8], vec![9]]);
        assert_eq!(chunks.concat(), data);

        let stats = reader.stats();
        assert_eq!(stats.refills, 3);
        assert_eq!(stats.reads, 4);
        assert_eq!(stats.chunks, 4);
        assert_eq!(stats.bytes, 10);
    }

    #[test]
    fn test_short_underlying_reads_fill_whole_chunks() {
        let data = b"hello chunked world";
        let source = Trickle { data, step: 3 };
        let mut reader = ChunkedReader::new(source, 16, 8).unwrap();
        let chunks = collect_chunks(&mut reader);

        assert_eq!(chunks, vec![
            b"hello ch".to_vec(),
            b"unked wo".to_vec(),
            b"rld".to_vec()
        ]);
        assert_eq!(reader.stats().refills, 7);
    }

    #[test]
    fn test_tail_carried_across_refill() {
        let data = vec![7u8; 10];
        let mut reader = ChunkedReader::new(Cursor::new(data), 4, 3).unwrap();
        let lengths: Vec<_> = collect_chunks(&mut reader).iter().map(Vec::len).collect();
        assert_eq!(lengths, vec![3, 3, 3, 1]);
    }

    #[test]
    fn test_empty_source() {
        let mut reader = ChunkedReader::new(io::empty(), 8, 4).unwrap();
        assert!(reader.next_chunk().unwrap().is_none());
        assert_eq!(reader.stats().reads, 1);
        assert_eq!(reader.stats().refills, 0);
    }

    #[test]
    fn test_end_of_stream_is_sticky() {
        let mut reader = ChunkedReader::new(Cursor::new(b"xy".to_vec()), 4, 4).unwrap();
        assert_eq!(reader.next_chunk().unwrap(), Some(&b"xy"[..]));
        assert!(reader.next_chunk().unwrap().is_none());
        assert!(reader.next_chunk().unwrap().is_none());
        assert_eq!(reader.stats().reads, 2);
    }

    #[test]
    fn test_read_error_is_distinct_and_sticky() {
        let source = FailAfter {
            good:  Cursor::new(b"abcd".to_vec()),
            calls: 0,
        };
        let mut reader = ChunkedReader::new(source, 4, 2).unwrap();

        assert_eq!(reader.next_chunk().unwrap(), Some(&b"ab"[..]));
        assert_eq!(reader.next_chunk().unwrap(), Some(&b"cd"[..]));

        let err = reader.next_chunk().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert!(reader.is_failed());

        assert!(reader.next_chunk().is_err());
        assert_eq!(reader.into_inner().calls, 2);
    }

    #[test]
    fn test_interrupted_read_is_retried() {
        struct InterruptOnce {
            inner:       Cursor<Vec<u8>>,
            interrupted: bool,
        }

        impl Read for InterruptOnce {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                if !self.interrupted {
                    self.interrupted = true;
                    return Err(io::Error::from(io::ErrorKind::Interrupted));
                }
                self.inner.read(buf)
            }
        }

        let source = InterruptOnce {
            inner:       Cursor::new(b"data".to_vec()),
            interrupted: false,
        };
        let mut reader = ChunkedReader::new(source, 8, 8).unwrap();
        assert_eq!(collect_chunks(&mut reader), vec![b"data".to_vec()]);
    }

    #[test]
    fn test_read_chunk_copies_into_caller_buffer() {
        let mut reader = ChunkedReader::new(Cursor::new(b"abc".to_vec()), 4, 2).unwrap();
        let mut out = [0u8; 2];

        assert_eq!(reader.read_chunk(&mut out).unwrap(), 2);
        assert_eq!(&out, b"ab");
        assert_eq!(reader.read_chunk(&mut out).unwrap(), 1);
        assert_eq!(out[0], b'c');
        assert_eq!(reader.read_chunk(&mut out).unwrap(), 0);
    }

    #[test]
    fn test_read_chunk_rejects_small_buffer() {
        let mut reader = ChunkedReader::new(Cursor::new(b"abc".to_vec()), 4, 2).unwrap();
        let mut out = [0u8; 1];
        let err = reader.read_chunk(&mut out).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert_eq!(reader.stats().reads, 0);
    }

    #[test]
    fn test_oversized_read_report_fails() {
        struct Liar;

        impl Read for Liar {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> { Ok(buf.len() + 1) }
        }

        let mut reader = ChunkedReader::new(Liar, 4, 2).unwrap();
        let err = reader.next_chunk().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(reader.is_failed());
    }

    #[test]
    fn test_invalid_geometry_rejected() {
        assert!(matches!(
            ChunkedReader::new(io::empty(), 4, 8),
            Err(DigestError::InvalidOptions(_))
        ));
        assert!(matches!(
            ChunkedReader::new(io::empty(), 4, 0),
            Err(DigestError::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_buffered_tracks_cursor() {
        let mut reader = ChunkedReader::new(Cursor::new(vec![7u8; 6]), 6, 4).unwrap();
        assert_eq!(reader.buffered(), 0);
        reader.next_chunk().unwrap();
        assert_eq!(reader.buffered(), 2);
        reader.next_chunk().unwrap();
        assert_eq!(reader.buffered(), 0);
    }
}
