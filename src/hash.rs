// src/hash.rs

//! SHA-256 digests for content addressing
//!
//! Every blob in the content store is keyed by the SHA-256 of its exact bytes,
//! rendered as 64 lowercase hex characters. No salting and no algorithm prefix:
//! the digest value alone is the address.

use sha2::{Digest as _, Sha256};
use std::fmt;
use std::io::{self, Read};
use std::str::FromStr;

/// Length of a digest in hex characters
pub const DIGEST_HEX_LEN: usize = 64;

/// Digest parsing errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashError {
    /// Digest string has the wrong length
    InvalidLength { expected: usize, got: usize },
    /// Digest string contains non-hex characters
    InvalidHex(String),
}

impl fmt::Display for HashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLength { expected, got } => {
                write!(f, "invalid digest length: expected {}, got {}", expected, got)
            }
            Self::InvalidHex(s) => write!(f, "invalid hex in digest: {}", s),
        }
    }
}

impl std::error::Error for HashError {}

/// A validated SHA-256 digest in lowercase hex
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest(String);

impl Digest {
    /// Parse a digest from hex, normalizing to lowercase
    pub fn parse(s: &str) -> Result<Self, HashError> {
        if s.len() != DIGEST_HEX_LEN {
            return Err(HashError::InvalidLength {
                expected: DIGEST_HEX_LEN,
                got: s.len(),
            });
        }

        if !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(HashError::InvalidHex(s.to_string()));
        }

        Ok(Self(s.to_ascii_lowercase()))
    }

    /// Get the digest as a hex string
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into the two-character shard prefix and the remainder
    pub fn shard(&self) -> (&str, &str) {
        self.0.split_at(2)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Digest {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Incremental SHA-256 hasher
#[derive(Default)]
pub struct Hasher {
    state: Sha256,
    len: u64,
}

impl Hasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed more bytes into the hasher
    pub fn update(&mut self, data: &[u8]) {
        self.state.update(data);
        self.len += data.len() as u64;
    }

    /// Number of bytes hashed so far
    #[inline]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Finish hashing and return the digest
    pub fn finalize(self) -> Digest {
        Digest(hex::encode(self.state.finalize()))
    }
}

/// Compute the digest of a byte slice
pub fn sha256(data: &[u8]) -> Digest {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Compute the digest of everything a reader yields
pub fn sha256_reader<R: Read>(mut reader: R) -> io::Result<(Digest, u64)> {
    let mut hasher = Hasher::new();
    let mut buffer = [0u8; 8192];

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    let len = hasher.len();
    Ok((hasher.finalize(), len))
}
