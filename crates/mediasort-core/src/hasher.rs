//! Smart partial hashing for efficient duplicate detection.
//!
//! Files under 100 MiB are hashed in full. Larger files hash three 1 MiB
//! windows (start, middle, end) plus the decimal file size, trading a small
//! false-negative risk on huge files for bounded I/O. The fingerprint is an
//! equality token for dedup and move verification, not an integrity
//! guarantee.

use log::error;
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::Result;

/// Files at or above this size use the partial hashing scheme
pub const HASH_THRESHOLD: u64 = 100 * 1024 * 1024;

/// Window and streaming chunk size
pub const CHUNK_SIZE: usize = 1024 * 1024;

/// File hasher with the size-adaptive partial scheme.
///
/// Failure is reported through `Result`: an `Err` can never collide with a
/// valid digest, so callers must check it explicitly and count the file as
/// an error rather than grouping it.
#[derive(Debug, Default)]
pub struct SmartHasher;

impl SmartHasher {
    pub fn new() -> Self {
        SmartHasher
    }

    /// Compute the fingerprint for a file.
    ///
    /// Returns the lowercase hex Blake3 digest, or the I/O error from the
    /// stat/read that failed.
    pub fn compute_hash(&self, path: &Path) -> Result<String> {
        let result = self.compute_hash_inner(path);
        if let Err(e) = &result {
            error!("Failed to hash {}: {}", path.display(), e);
        }
        result
    }

    fn compute_hash_inner(&self, path: &Path) -> Result<String> {
        let file_size = fs::metadata(path)?.len();

        if file_size < HASH_THRESHOLD {
            self.full_hash(path)
        } else {
            self.partial_hash(path, file_size)
        }
    }

    /// Hash the entire byte stream in fixed-size chunks to bound memory
    fn full_hash(&self, path: &Path) -> Result<String> {
        let mut file = File::open(path)?;
        let mut hasher = blake3::Hasher::new();
        let mut buffer = vec![0u8; CHUNK_SIZE];

        loop {
            let bytes_read = file.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(hasher.finalize().to_hex().to_string())
    }

    /// Hash three windows plus the decimal file size, in a fixed order.
    ///
    /// The trailing newline after the size is part of the format.
    fn partial_hash(&self, path: &Path, file_size: u64) -> Result<String> {
        let chunk = CHUNK_SIZE as u64;
        let middle_offset = (file_size / 2) - (chunk / 2);
        let end_offset = file_size - chunk;

        let mut file = File::open(path)?;
        let mut hasher = blake3::Hasher::new();

        for offset in [0, middle_offset, end_offset] {
            let window = read_window(&mut file, offset, CHUNK_SIZE)?;
            hasher.update(&window);
        }

        hasher.update(format!("{}\n", file_size).as_bytes());

        Ok(hasher.finalize().to_hex().to_string())
    }
}

/// Seek to `offset` and read up to `size` bytes
fn read_window(file: &mut File, offset: u64, size: usize) -> Result<Vec<u8>> {
    file.seek(SeekFrom::Start(offset))?;
    let mut buffer = Vec::with_capacity(size);
    file.take(size as u64).read_to_end(&mut buffer)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_file(dir: &Path, name: &str, contents: &[u8]) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents).unwrap();
        path
    }

    #[test]
    fn test_small_file_hash_is_deterministic() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "a.bin", b"some file contents");

        let hasher = SmartHasher::new();
        let first = hasher.compute_hash(&path).unwrap();
        let second = hasher.compute_hash(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_different_content_yields_different_hash() {
        let dir = tempdir().unwrap();
        let a = write_file(dir.path(), "a.bin", b"contents one");
        let b = write_file(dir.path(), "b.bin", b"contents two");

        let hasher = SmartHasher::new();
        assert_ne!(
            hasher.compute_hash(&a).unwrap(),
            hasher.compute_hash(&b).unwrap()
        );
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let hasher = SmartHasher::new();
        assert!(hasher.compute_hash(Path::new("/no/such/file.bin")).is_err());
    }

    // The partial scheme is validated directly on a 4 MiB file: the sampled
    // windows are [0, 1M), [1.5M, 2.5M) and [3M, 4M).
    #[test]
    fn test_partial_hash_sensitive_to_sampled_windows_only() {
        let dir = tempdir().unwrap();
        let size = 4 * CHUNK_SIZE;
        let mut data = vec![0xABu8; size];
        let path = write_file(dir.path(), "big.bin", &data);

        let hasher = SmartHasher::new();
        let baseline = hasher.partial_hash(&path, size as u64).unwrap();

        // Altering a byte inside the middle window changes the fingerprint
        data[2 * CHUNK_SIZE] = 0xCD;
        let path2 = write_file(dir.path(), "big2.bin", &data);
        let changed = hasher.partial_hash(&path2, size as u64).unwrap();
        assert_ne!(baseline, changed);

        // Altering a byte strictly between the sampled windows does not
        data[2 * CHUNK_SIZE] = 0xAB;
        data[CHUNK_SIZE + CHUNK_SIZE / 4] = 0xEF;
        let path3 = write_file(dir.path(), "big3.bin", &data);
        let unchanged = hasher.partial_hash(&path3, size as u64).unwrap();
        assert_eq!(baseline, unchanged);
    }

    #[test]
    fn test_partial_hash_includes_file_size() {
        let dir = tempdir().unwrap();
        let size = 4 * CHUNK_SIZE;
        let data = vec![0u8; size];
        let path = write_file(dir.path(), "sized.bin", &data);

        let hasher = SmartHasher::new();
        let real = hasher.partial_hash(&path, size as u64).unwrap();
        // Same windows, different claimed size
        let lied = hasher.partial_hash(&path, size as u64 - 1).unwrap();
        assert_ne!(real, lied);
    }
}
