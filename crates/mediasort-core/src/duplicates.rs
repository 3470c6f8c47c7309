//! Duplicate detection within a folder and content comparison between two
//! folders, both keyed on [`SmartHasher`] digests.

use log::{info, warn};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::fsops::all_files_sorted;
use crate::hasher::SmartHasher;
use crate::metadata::MetadataExtractor;
use crate::observer::OrganizeObserver;
use crate::types::{get_file_extension, is_video_extension};

/// Progress cadence while hashing for duplicates
const DUPLICATE_PROGRESS_INTERVAL: usize = 50;
/// Progress cadence while comparing two folders
const COMPARE_PROGRESS_INTERVAL: usize = 100;

/// One set of files sharing a content hash.
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    pub hash: String,
    pub file_size: u64,
    pub file_paths: Vec<PathBuf>,
    /// Duration string per file, parallel to `file_paths`; empty for
    /// non-video files or when no tool could report one
    pub video_durations: Vec<String>,
}

impl DuplicateGroup {
    pub fn count(&self) -> usize {
        self.file_paths.len()
    }

    /// Bytes reclaimable by keeping a single copy
    pub fn wasted_space(&self) -> u64 {
        self.file_size * (self.count().saturating_sub(1) as u64)
    }
}

/// Result of a duplicate scan over one folder.
#[derive(Debug, Clone, Default)]
pub struct DuplicateScan {
    pub total_files: usize,
    pub groups: Vec<DuplicateGroup>,
    pub duplicate_files: usize,
    pub wasted_space_bytes: u64,
    pub errors: usize,
}

/// Hashes every file under a folder and groups files with equal digests.
pub struct DuplicateDetector {
    hasher: SmartHasher,
    extractor: Arc<MetadataExtractor>,
}

impl DuplicateDetector {
    pub fn new(extractor: Arc<MetadataExtractor>) -> Self {
        Self {
            hasher: SmartHasher::new(),
            extractor,
        }
    }

    /// Scan `folder` recursively. Groups are reported in order of first
    /// appearance, with files inside each group in scan order.
    pub fn find_duplicates(
        &self,
        folder: &Path,
        observer: &mut dyn OrganizeObserver,
        stop_flag: &Arc<AtomicBool>,
    ) -> Result<DuplicateScan> {
        if !folder.is_dir() {
            return Err(Error::FolderNotFound(folder.to_path_buf()));
        }

        let files = all_files_sorted(folder);
        let total = files.len();
        info!("Scanning {} files for duplicates", total);

        let mut scan = DuplicateScan {
            total_files: total,
            ..Default::default()
        };
        let mut group_index: HashMap<String, usize> = HashMap::new();
        let mut groups: Vec<DuplicateGroup> = Vec::new();

        for (i, file) in files.iter().enumerate() {
            let done = i + 1;
            if done % DUPLICATE_PROGRESS_INTERVAL == 0 || done == total {
                observer.progress(done, total);
                if stop_flag.load(Ordering::Relaxed) {
                    return Err(Error::Stopped);
                }
            }

            let hash = match self.hasher.compute_hash(file) {
                Ok(hash) => hash,
                Err(e) => {
                    warn!("Skipping unhashable file {}: {}", file.display(), e);
                    scan.errors += 1;
                    continue;
                }
            };
            let size = fs::metadata(file).map(|m| m.len()).unwrap_or(0);
            let duration = if is_video_extension(&get_file_extension(file)) {
                self.extractor.video_metadata(file).0
            } else {
                String::new()
            };

            match group_index.get(&hash) {
                Some(&idx) => {
                    groups[idx].file_paths.push(file.clone());
                    groups[idx].video_durations.push(duration);
                }
                None => {
                    group_index.insert(hash.clone(), groups.len());
                    groups.push(DuplicateGroup {
                        hash,
                        file_size: size,
                        file_paths: vec![file.clone()],
                        video_durations: vec![duration],
                    });
                }
            }
        }

        // Only groups with at least two members are duplicates
        scan.groups = groups.into_iter().filter(|g| g.count() > 1).collect();
        scan.duplicate_files = scan.groups.iter().map(|g| g.count()).sum();
        scan.wasted_space_bytes = scan.groups.iter().map(|g| g.wasted_space()).sum();
        info!(
            "Found {} duplicate groups ({} files)",
            scan.groups.len(),
            scan.duplicate_files
        );
        Ok(scan)
    }
}

/// A hash present in both compared folders.
#[derive(Debug, Clone)]
pub struct MatchedPair {
    pub hash: String,
    pub size: u64,
    pub path_a: PathBuf,
    pub path_b: PathBuf,
}

/// Result of comparing the contents of two folders.
#[derive(Debug, Clone, Default)]
pub struct ComparisonResult {
    pub count_a: usize,
    pub count_b: usize,
    pub size_a: u64,
    pub size_b: u64,
    pub match_count: usize,
    /// Total size of matched content, measured on the first folder's copies
    pub match_size_bytes: u64,
    pub unique_a_count: usize,
    pub unique_b_count: usize,
    pub errors: usize,
    pub matches: Vec<MatchedPair>,
}

/// Compares two folders by content hash.
pub struct FolderComparator {
    hasher: SmartHasher,
}

impl FolderComparator {
    pub fn new() -> Self {
        Self {
            hasher: SmartHasher::new(),
        }
    }

    /// Hash a folder into hash -> (first path, size). Later files with an
    /// already-seen hash are in-folder duplicates and do not add entries.
    fn hash_folder(
        &self,
        folder: &Path,
        counted: &mut usize,
        total_size: &mut u64,
        errors: &mut usize,
        observer: &mut dyn OrganizeObserver,
        stop_flag: &Arc<AtomicBool>,
    ) -> Result<BTreeMap<String, (PathBuf, u64)>> {
        let files = all_files_sorted(folder);
        let total = files.len();
        *counted = total;

        let mut map = BTreeMap::new();
        for (i, file) in files.iter().enumerate() {
            let done = i + 1;
            if done % COMPARE_PROGRESS_INTERVAL == 0 || done == total {
                observer.progress(done, total);
                if stop_flag.load(Ordering::Relaxed) {
                    return Err(Error::Stopped);
                }
            }

            let size = fs::metadata(file).map(|m| m.len()).unwrap_or(0);
            *total_size += size;
            match self.hasher.compute_hash(file) {
                Ok(hash) => {
                    map.entry(hash).or_insert_with(|| (file.clone(), size));
                }
                Err(e) => {
                    warn!("Skipping unhashable file {}: {}", file.display(), e);
                    *errors += 1;
                }
            }
        }
        Ok(map)
    }

    /// Compare the contents of `folder_a` and `folder_b`.
    pub fn compare(
        &self,
        folder_a: &Path,
        folder_b: &Path,
        observer: &mut dyn OrganizeObserver,
        stop_flag: &Arc<AtomicBool>,
    ) -> Result<ComparisonResult> {
        for folder in [folder_a, folder_b] {
            if !folder.is_dir() {
                return Err(Error::FolderNotFound(folder.to_path_buf()));
            }
        }

        let mut result = ComparisonResult::default();

        let map_a = self.hash_folder(
            folder_a,
            &mut result.count_a,
            &mut result.size_a,
            &mut result.errors,
            observer,
            stop_flag,
        )?;
        let map_b = self.hash_folder(
            folder_b,
            &mut result.count_b,
            &mut result.size_b,
            &mut result.errors,
            observer,
            stop_flag,
        )?;

        for (hash, (path_a, size)) in &map_a {
            if let Some((path_b, _)) = map_b.get(hash) {
                result.match_count += 1;
                result.match_size_bytes += size;
                result.matches.push(MatchedPair {
                    hash: hash.clone(),
                    size: *size,
                    path_a: path_a.clone(),
                    path_b: path_b.clone(),
                });
            }
        }

        result.unique_a_count = map_a.len() - result.match_count;
        result.unique_b_count = map_b.len() - result.match_count;
        info!(
            "Comparison complete: {} matches, {} unique to A, {} unique to B",
            result.match_count, result.unique_a_count, result.unique_b_count
        );
        Ok(result)
    }
}

impl Default for FolderComparator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::NullObserver;
    use tempfile::tempdir;

    fn stop_flag() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(false))
    }

    fn write(path: &Path, content: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_duplicates_grouped_by_content() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("a.jpg"), b"same-bytes");
        write(&dir.path().join("sub/b.jpg"), b"same-bytes");
        write(&dir.path().join("c.jpg"), b"different");

        let detector = DuplicateDetector::new(Arc::new(MetadataExtractor::disabled()));
        let scan = detector
            .find_duplicates(dir.path(), &mut NullObserver, &stop_flag())
            .unwrap();

        assert_eq!(scan.total_files, 3);
        assert_eq!(scan.groups.len(), 1);
        assert_eq!(scan.groups[0].count(), 2);
        assert_eq!(scan.duplicate_files, 2);
        assert_eq!(scan.wasted_space_bytes, "same-bytes".len() as u64);
        assert_eq!(scan.errors, 0);
    }

    #[test]
    fn test_no_duplicates_is_empty() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("a.jpg"), b"one");
        write(&dir.path().join("b.jpg"), b"two");

        let detector = DuplicateDetector::new(Arc::new(MetadataExtractor::disabled()));
        let scan = detector
            .find_duplicates(dir.path(), &mut NullObserver, &stop_flag())
            .unwrap();

        assert!(scan.groups.is_empty());
        assert_eq!(scan.wasted_space_bytes, 0);
    }

    #[test]
    fn test_missing_folder_is_error() {
        let dir = tempdir().unwrap();
        let detector = DuplicateDetector::new(Arc::new(MetadataExtractor::disabled()));
        let err = detector
            .find_duplicates(&dir.path().join("nope"), &mut NullObserver, &stop_flag())
            .unwrap_err();
        assert!(matches!(err, Error::FolderNotFound(_)));
    }

    #[test]
    fn test_group_durations_parallel_to_paths() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("a.mp4"), b"vid");
        write(&dir.path().join("b.mp4"), b"vid");

        let detector = DuplicateDetector::new(Arc::new(MetadataExtractor::disabled()));
        let scan = detector
            .find_duplicates(dir.path(), &mut NullObserver, &stop_flag())
            .unwrap();

        assert_eq!(scan.groups.len(), 1);
        assert_eq!(scan.groups[0].video_durations.len(), 2);
    }

    #[test]
    fn test_compare_counts_matches_and_uniques() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        write(&a.join("shared.jpg"), b"shared-content");
        write(&a.join("only_a.jpg"), b"alpha");
        write(&b.join("renamed.jpg"), b"shared-content");
        write(&b.join("only_b.jpg"), b"beta");
        write(&b.join("only_b2.jpg"), b"gamma");

        let result = FolderComparator::new()
            .compare(&a, &b, &mut NullObserver, &stop_flag())
            .unwrap();

        assert_eq!(result.count_a, 2);
        assert_eq!(result.count_b, 3);
        assert_eq!(result.match_count, 1);
        assert_eq!(result.match_size_bytes, "shared-content".len() as u64);
        assert_eq!(result.unique_a_count, 1);
        assert_eq!(result.unique_b_count, 2);
        assert_eq!(result.matches.len(), 1);
        assert!(result.matches[0].path_a.ends_with("shared.jpg"));
        assert!(result.matches[0].path_b.ends_with("renamed.jpg"));
    }

    #[test]
    fn test_compare_in_folder_duplicates_count_once() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        // Two copies in A of content also present in B: one match, first path wins
        write(&a.join("copy1.jpg"), b"dup");
        write(&a.join("copy2.jpg"), b"dup");
        write(&b.join("other.jpg"), b"dup");

        let result = FolderComparator::new()
            .compare(&a, &b, &mut NullObserver, &stop_flag())
            .unwrap();

        assert_eq!(result.count_a, 2);
        assert_eq!(result.match_count, 1);
        assert!(result.matches[0].path_a.ends_with("copy1.jpg"));
    }

    #[test]
    fn test_compare_stops_on_request() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        write(&a.join("x.jpg"), b"x");
        write(&b.join("y.jpg"), b"y");

        let flag = Arc::new(AtomicBool::new(true));
        let err = FolderComparator::new()
            .compare(&a, &b, &mut NullObserver, &flag)
            .unwrap_err();
        assert!(err.is_stop());
    }
}
