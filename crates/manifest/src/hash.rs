//! Streaming content digests.
//!
//! Files are read in fixed-size chunks so memory use doesn't depend on file
//! size; mod jars and resource packs can be large.

use crate::error::{Error, ErrorKind, Result};
use exn::ResultExt;
use sha2::{Digest, Sha256, Sha512};
use std::fs::File;
use std::io::{ErrorKind as IoErrorKind, Read};
use std::path::Path;
use std::str::FromStr;

const CHUNK_SIZE: usize = 64 * 1024;

/// A supported digest algorithm. Defaults to SHA-256.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha512,
    Blake3,
}
impl FromStr for HashAlgorithm {
    type Err = Error;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "sha512" | "sha-512" => Ok(Self::Sha512),
            "blake3" => Ok(Self::Blake3),
            _ => exn::bail!(ErrorKind::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

enum Hasher {
    Sha256(Sha256),
    Sha512(Sha512),
    Blake3(Box<blake3::Hasher>),
}
impl Hasher {
    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha256(h) => h.update(data),
            Self::Sha512(h) => h.update(data),
            Self::Blake3(h) => {
                h.update(data);
            },
        }
    }

    fn finalize(self) -> String {
        match self {
            Self::Sha256(h) => hex::encode(h.finalize()),
            Self::Sha512(h) => hex::encode(h.finalize()),
            Self::Blake3(h) => h.finalize().to_hex().to_string(),
        }
    }
}

impl HashAlgorithm {
    fn hasher(self) -> Hasher {
        match self {
            Self::Sha256 => Hasher::Sha256(Sha256::new()),
            Self::Sha512 => Hasher::Sha512(Sha512::new()),
            Self::Blake3 => Hasher::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    /// Lowercase hex digest of everything `reader` yields.
    pub fn hash_reader(self, mut reader: impl Read) -> std::io::Result<String> {
        let mut hasher = self.hasher();
        let mut buffer = vec![0u8; CHUNK_SIZE];
        loop {
            let read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(read) => read,
                Err(e) if e.kind() == IoErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            hasher.update(&buffer[..read]);
        }
        Ok(hasher.finalize())
    }

    /// Lowercase hex digest of the file at `path`.
    ///
    /// Any failure (missing file, unreadable file) is raised as
    /// [`HashingFailed`](ErrorKind::HashingFailed) with the I/O error kept as
    /// its cause.
    pub fn hash_file(self, path: impl AsRef<Path>) -> Result<String> {
        let path = path.as_ref();
        let file = File::open(path).or_raise(|| ErrorKind::HashingFailed(path.to_path_buf()))?;
        self.hash_reader(file).or_raise(|| ErrorKind::HashingFailed(path.to_path_buf()))
    }
}

/// Hash the file at `path` with the algorithm named by `algorithm`
/// (e.g. `"sha256"`).
///
/// An unknown algorithm is a [`HashingFailed`](ErrorKind::HashingFailed) too,
/// with [`UnsupportedAlgorithm`](ErrorKind::UnsupportedAlgorithm) as its cause.
pub fn hash(path: impl AsRef<Path>, algorithm: &str) -> Result<String> {
    let path = path.as_ref();
    let algorithm = algorithm.parse::<HashAlgorithm>().or_raise(|| ErrorKind::HashingFailed(path.to_path_buf()))?;
    algorithm.hash_file(path)
}
