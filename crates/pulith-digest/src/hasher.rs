use std::fmt;
use std::str::FromStr;

use digest::{Digest, FixedOutputReset};

use crate::DigestError;

/// Incremental digest driven by the chunk pipeline.
///
/// Feeding `a` then `b` through [`Hasher::update`] must produce the same
/// output as feeding `a ‖ b` in one call. The pipeline relies on nothing else.
pub trait Hasher: Send {
    /// Length in bytes of the value written by [`Hasher::finalize_into`].
    fn output_len(&self) -> usize;

    /// Return to the algorithm's initial state. Calling it twice is harmless.
    fn reset(&mut self);

    fn update(&mut self, data: &[u8]);

    /// Write the digest into `out` and leave the state consumed.
    ///
    /// # Panics
    ///
    /// Panics if `out.len() != self.output_len()`.
    fn finalize_into(&mut self, out: &mut [u8]);

    fn finalize(&mut self) -> Vec<u8> {
        let mut out = vec![0; self.output_len()];
        self.finalize_into(&mut out);
        out
    }
}

/// Adapter for any RustCrypto [`Digest`] that can reset after finalizing.
pub struct DigestHasher<D>(D);

impl<D: Digest> DigestHasher<D> {
    pub fn new() -> Self { Self(D::new()) }

    pub fn digest(data: &[u8]) -> Vec<u8> { D::digest(data).to_vec() }
}

impl<D: Digest> Default for DigestHasher<D> {
    fn default() -> Self { Self::new() }
}

impl<D: Digest + FixedOutputReset + Send> Hasher for DigestHasher<D> {
    fn output_len(&self) -> usize { <D as Digest>::output_size() }

    fn reset(&mut self) { Digest::reset(&mut self.0); }

    fn update(&mut self, data: &[u8]) { Digest::update(&mut self.0, data); }

    fn finalize_into(&mut self, out: &mut [u8]) {
        out.copy_from_slice(&Digest::finalize_reset(&mut self.0));
    }
}

pub type Sha256Hasher = DigestHasher<sha2::Sha256>;

pub type Sha512Hasher = DigestHasher<sha2::Sha512>;

#[cfg(feature = "sha3")]
pub type Sha3_256Hasher = DigestHasher<sha3::Sha3_256>;

#[cfg(feature = "blake3")]
pub struct Blake3Hasher(blake3::Hasher);

#[cfg(feature = "blake3")]
impl Blake3Hasher {
    pub fn new() -> Self { Self(blake3::Hasher::new()) }

    pub fn digest(data: &[u8]) -> Vec<u8> { blake3::hash(data).as_bytes().to_vec() }
}

#[cfg(feature = "blake3")]
impl Default for Blake3Hasher {
    fn default() -> Self { Self::new() }
}

#[cfg(feature = "blake3")]
impl Hasher for Blake3Hasher {
    fn output_len(&self) -> usize { blake3::OUT_LEN }

    fn reset(&mut self) { self.0.reset(); }

    fn update(&mut self, data: &[u8]) { self.0.update(data); }

    fn finalize_into(&mut self, out: &mut [u8]) {
        out.copy_from_slice(self.0.finalize().as_bytes());
        self.0.reset();
    }
}

/// Algorithms selectable at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha256,
    Sha512,
    #[cfg(feature = "sha3")]
    Sha3_256,
    #[cfg(feature = "blake3")]
    Blake3,
}

impl HashAlgorithm {
    pub fn output_len(&self) -> usize {
        match *self {
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha512 => 64,
            #[cfg(feature = "sha3")]
            HashAlgorithm::Sha3_256 => 32,
            #[cfg(feature = "blake3")]
            HashAlgorithm::Blake3 => 32,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match *self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha512 => "sha512",
            #[cfg(feature = "sha3")]
            HashAlgorithm::Sha3_256 => "sha3-256",
            #[cfg(feature = "blake3")]
            HashAlgorithm::Blake3 => "blake3",
        }
    }

    pub fn hasher(&self) -> AnyHasher {
        match *self {
            HashAlgorithm::Sha256 => AnyHasher::Sha256(Sha256Hasher::new()),
            HashAlgorithm::Sha512 => AnyHasher::Sha512(Sha512Hasher::new()),
            #[cfg(feature = "sha3")]
            HashAlgorithm::Sha3_256 => AnyHasher::Sha3_256(Sha3_256Hasher::new()),
            #[cfg(feature = "blake3")]
            HashAlgorithm::Blake3 => AnyHasher::Blake3(Blake3Hasher::new()),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for HashAlgorithm {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(HashAlgorithm::Sha256),
            "sha512" | "sha-512" => Ok(HashAlgorithm::Sha512),
            #[cfg(feature = "sha3")]
            "sha3-256" | "sha3_256" => Ok(HashAlgorithm::Sha3_256),
            #[cfg(feature = "blake3")]
            "blake3" => Ok(HashAlgorithm::Blake3),
            _ => Err(DigestError::InvalidOptions("unsupported hash algorithm")),
        }
    }
}

/// Tagged hasher over every compiled-in algorithm.
pub enum AnyHasher {
    Sha256(Sha256Hasher),
    Sha512(Sha512Hasher),
    #[cfg(feature = "sha3")]
    Sha3_256(Sha3_256Hasher),
    #[cfg(feature = "blake3")]
    Blake3(Blake3Hasher),
}

macro_rules! dispatch {
    ($self:ident, $h:ident => $body:expr) => {
        match $self {
            AnyHasher::Sha256($h) => $body,
            AnyHasher::Sha512($h) => $body,
            #[cfg(feature = "sha3")]
            AnyHasher::Sha3_256($h) => $body,
            #[cfg(feature = "blake3")]
            AnyHasher::Blake3($h) => $body,
        }
    };
}

impl AnyHasher {
    pub fn algorithm(&self) -> HashAlgorithm {
        match self {
            AnyHasher::Sha256(_) => HashAlgorithm::Sha256,
            AnyHasher::Sha512(_) => HashAlgorithm::Sha512,
            #[cfg(feature = "sha3")]
            AnyHasher::Sha3_256(_) => HashAlgorithm::Sha3_256,
            #[cfg(feature = "blake3")]
            AnyHasher::Blake3(_) => HashAlgorithm::Blake3,
        }
    }
}

impl From<HashAlgorithm> for AnyHasher {
    fn from(algorithm: HashAlgorithm) -> Self { algorithm.hasher() }
}

impl Hasher for AnyHasher {
    fn output_len(&self) -> usize { dispatch!(self, h => h.output_len()) }

    fn reset(&mut self) { dispatch!(self, h => h.reset()) }

    fn update(&mut self, data: &[u8]) { dispatch!(self, h => h.update(data)) }

    fn finalize_into(&mut self, out: &mut [u8]) { dispatch!(self, h => h.finalize_into(out)) }
}
