// src/filesystem/cas.rs

//! Content-addressable storage for resource payloads
//!
//! Payloads are stored by the SHA-256 of their bytes, so adding the same bytes
//! twice stores them once. The on-disk layout shards by the first two hex
//! characters to bound directory fan-out:
//!
//! ```text
//! {root}/ab/cdef0123.../content
//! {root}/tmp/                      in-flight writes
//! ```
//!
//! The layout is not part of the addressing contract; a blob is addressed by
//! its digest alone.
//!
//! Writes go to a uniquely named temp file under `{root}/tmp` and are moved
//! into place with a no-clobber rename. Two writers racing on the same digest
//! both succeed: whichever rename lands first wins and the other discards its
//! identical copy.

use crate::error::{Error, Result};
use crate::hash::{self, Digest, Hasher};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;
use walkdir::WalkDir;

/// File name of a blob inside its digest directory
pub const CONTENT_FILE_NAME: &str = "content";

const TMP_DIR: &str = "tmp";

/// Content-addressable blob store
#[derive(Debug, Clone)]
pub struct ContentStore {
    /// Root directory for stored blobs (e.g., /var/lib/repo/content)
    root: PathBuf,
    /// Re-hash blobs on read and reject corrupted ones
    verify_on_read: bool,
}

impl ContentStore {
    /// Open or create a store rooted at `root`
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let tmp = root.join(TMP_DIR);

        if !tmp.exists() {
            fs::create_dir_all(&tmp)?;
            debug!("Created content store at {:?}", root);
        }

        Ok(Self {
            root,
            verify_on_read: true,
        })
    }

    /// Enable or disable digest verification on read
    pub fn with_verification(mut self, verify: bool) -> Self {
        self.verify_on_read = verify;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the filesystem path for a digest
    ///
    /// Path format: {root}/{first2}/{remaining}/content
    pub fn path(&self, digest: &Digest) -> PathBuf {
        let (prefix, rest) = digest.shard();
        self.root.join(prefix).join(rest).join(CONTENT_FILE_NAME)
    }

    /// Store bytes and return their digest
    ///
    /// Storing bytes that are already present is a no-op.
    pub fn put(&self, content: &[u8]) -> Result<Digest> {
        let digest = hash::sha256(content);
        let path = self.path(&digest);

        if path.exists() {
            debug!("Content already in store: {}", digest);
            return Ok(digest);
        }

        let mut temp = NamedTempFile::new_in(self.root.join(TMP_DIR))?;
        temp.write_all(content)?;
        temp.as_file().sync_all()?;

        self.persist(temp, &path)?;
        debug!("Stored content: {} ({} bytes)", digest, content.len());
        Ok(digest)
    }

    /// Stream a payload into the store, hashing while writing
    ///
    /// Returns the digest, the number of bytes read, and whether this call
    /// created the blob (false if the bytes were already stored).
    pub fn put_reader<R: Read>(&self, mut reader: R) -> Result<(Digest, u64, bool)> {
        let mut temp = NamedTempFile::new_in(self.root.join(TMP_DIR))?;
        let mut hasher = Hasher::new();
        let mut buffer = [0u8; 64 * 1024];

        loop {
            let n = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            hasher.update(&buffer[..n]);
            temp.write_all(&buffer[..n])?;
        }

        let size = hasher.len();
        let digest = hasher.finalize();
        let path = self.path(&digest);

        if path.exists() {
            // Dropping the temp file deletes it
            debug!("Content already in store: {}", digest);
            return Ok((digest, size, false));
        }

        temp.as_file().sync_all()?;
        let created = self.persist(temp, &path)?;
        debug!("Stored streamed content: {} ({} bytes)", digest, size);
        Ok((digest, size, created))
    }

    /// Move a temp file into place; false if another writer got there first
    fn persist(&self, temp: NamedTempFile, path: &Path) -> Result<bool> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        match temp.persist_noclobber(path) {
            Ok(_) => Ok(true),
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                debug!("Lost store race for {:?}, keeping existing copy", path);
                Ok(false)
            }
            Err(e) => Err(e.error.into()),
        }
    }

    /// Retrieve a blob by digest
    pub fn get(&self, digest: &Digest) -> Result<Vec<u8>> {
        let mut file = self.open(digest)?;
        let mut content = Vec::new();
        file.read_to_end(&mut content)?;

        if self.verify_on_read {
            let actual = hash::sha256(&content);
            if &actual != digest {
                return Err(Error::DigestMismatch {
                    expected: digest.to_string(),
                    actual: actual.to_string(),
                });
            }
        }

        debug!("Retrieved content: {} ({} bytes)", digest, content.len());
        Ok(content)
    }

    /// Open a blob for streaming reads
    pub fn open(&self, digest: &Digest) -> Result<File> {
        match File::open(self.path(digest)) {
            Ok(file) => Ok(file),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(Error::ContentNotFound(digest.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Check if a blob exists
    pub fn has(&self, digest: &Digest) -> bool {
        self.path(digest).exists()
    }

    /// Delete a blob; returns false if it was not present
    pub fn remove(&self, digest: &Digest) -> Result<bool> {
        let path = self.path(digest);

        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        }

        // Prune the now-empty digest and shard directories; a concurrent
        // writer may have repopulated them, so failures are ignored
        if let Some(digest_dir) = path.parent() {
            let _ = fs::remove_dir(digest_dir);
            if let Some(shard_dir) = digest_dir.parent() {
                let _ = fs::remove_dir(shard_dir);
            }
        }

        debug!("Removed content: {}", digest);
        Ok(true)
    }

    /// Every digest currently stored, sorted
    pub fn digests(&self) -> Result<Vec<Digest>> {
        let mut digests = Vec::new();

        for entry in WalkDir::new(&self.root).min_depth(3).max_depth(3) {
            let entry = entry.map_err(|e| {
                e.into_io_error()
                    .unwrap_or_else(|| io::Error::other("directory loop in content store"))
            })?;

            if !entry.file_type().is_file() || entry.file_name() != CONTENT_FILE_NAME {
                continue;
            }

            let Some(digest_dir) = entry.path().parent() else {
                continue;
            };
            let rest = digest_dir.file_name().and_then(|n| n.to_str());
            let prefix = digest_dir
                .parent()
                .and_then(|p| p.file_name())
                .and_then(|n| n.to_str());

            if let (Some(prefix), Some(rest)) = (prefix, rest) {
                if let Ok(digest) = Digest::parse(&format!("{}{}", prefix, rest)) {
                    digests.push(digest);
                }
            }
        }

        digests.sort();
        Ok(digests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_put_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let store = ContentStore::new(temp_dir.path()).unwrap();

        let content = b"Test content for the store";
        let digest = store.put(content).unwrap();

        assert_eq!(digest, hash::sha256(content));
        assert_eq!(store.get(&digest).unwrap(), content);
    }

    #[test]
    fn test_deduplication() {
        let temp_dir = TempDir::new().unwrap();
        let store = ContentStore::new(temp_dir.path()).unwrap();

        let content = b"Duplicate content";
        let first = store.put(content).unwrap();
        let second = store.put(content).unwrap();

        assert_eq!(first, second);
        assert!(store.has(&first));
        assert_eq!(store.digests().unwrap(), vec![first]);
    }

    #[test]
    fn test_layout() {
        let temp_dir = TempDir::new().unwrap();
        let store = ContentStore::new(temp_dir.path()).unwrap();

        let digest = hash::sha256(b"Hello, World!");
        let expected = temp_dir
            .path()
            .join("df")
            .join("fd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f")
            .join("content");
        assert_eq!(store.path(&digest), expected);
    }

    #[test]
    fn test_put_reader_matches_put() {
        let temp_dir = TempDir::new().unwrap();
        let store = ContentStore::new(temp_dir.path()).unwrap();

        let content = vec![42u8; 200_000];
        let (digest, size, created) = store.put_reader(content.as_slice()).unwrap();
        assert_eq!(size, 200_000);
        assert!(created);
        assert_eq!(digest, store.put(&content).unwrap());
        assert_eq!(store.digests().unwrap().len(), 1);

        // Second streamed write of the same bytes leaves no temp files behind
        let (_, _, created) = store.put_reader(content.as_slice()).unwrap();
        assert!(!created);
        assert_eq!(fs::read_dir(temp_dir.path().join(TMP_DIR)).unwrap().count(), 0);
    }

    #[test]
    fn test_get_missing() {
        let temp_dir = TempDir::new().unwrap();
        let store = ContentStore::new(temp_dir.path()).unwrap();

        let result = store.get(&hash::sha256(b"never stored"));
        assert!(matches!(result, Err(Error::ContentNotFound(_))));
    }

    #[test]
    fn test_corruption_detected() {
        let temp_dir = TempDir::new().unwrap();
        let store = ContentStore::new(temp_dir.path()).unwrap();

        let digest = store.put(b"original").unwrap();
        fs::write(store.path(&digest), b"tampered").unwrap();

        assert!(matches!(store.get(&digest), Err(Error::DigestMismatch { .. })));

        let unverified = store.clone().with_verification(false);
        assert_eq!(unverified.get(&digest).unwrap(), b"tampered");
    }

    #[test]
    fn test_remove() {
        let temp_dir = TempDir::new().unwrap();
        let store = ContentStore::new(temp_dir.path()).unwrap();

        let digest = store.put(b"short lived").unwrap();
        assert!(store.remove(&digest).unwrap());
        assert!(!store.has(&digest));
        assert!(!store.remove(&digest).unwrap());
        assert!(!store.path(&digest).parent().unwrap().exists());
        assert!(store.digests().unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_puts_of_same_bytes() {
        let temp_dir = TempDir::new().unwrap();
        let store = ContentStore::new(temp_dir.path()).unwrap();
        let content = vec![9u8; 50_000];

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let content = content.clone();
                std::thread::spawn(move || store.put(&content).unwrap())
            })
            .collect();

        let digests: Vec<Digest> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(digests.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(store.get(&digests[0]).unwrap(), content);
        assert_eq!(store.digests().unwrap().len(), 1);
    }
}
