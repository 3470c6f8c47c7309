//! Folder inventory: one descriptive record per file, with content hash,
//! timestamps and tool-reported metadata.

use chrono::{DateTime, Local};
use log::{info, warn};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use crate::error::{Error, Result};
use crate::fsops::all_files_sorted;
use crate::hasher::SmartHasher;
use crate::metadata::MetadataExtractor;
use crate::observer::OrganizeObserver;
use crate::types::{format_file_size, get_file_extension, is_video_extension};

/// Progress cadence while building the inventory
const INVENTORY_PROGRESS_INTERVAL: usize = 10;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Everything the inventory records about one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileInventoryEntry {
    pub path: PathBuf,
    pub relative_path: PathBuf,
    pub filename: String,
    pub extension: String,
    pub size_bytes: u64,
    pub size_formatted: String,
    pub modified: String,
    /// Creation time, or the modification time where the filesystem does
    /// not report one
    pub created: String,
    /// Content hash, or the literal `ERROR` when hashing failed
    pub hash: String,
    pub is_video: bool,
    pub duration: String,
    pub dimensions: String,
    pub codec: String,
    pub make: String,
    pub model: String,
    pub has_gps: bool,
}

/// Result of an inventory run over one folder.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InventoryResult {
    pub total_files: usize,
    pub total_size_bytes: u64,
    pub directories_count: usize,
    pub errors: usize,
    pub entries: Vec<FileInventoryEntry>,
}

/// Walks a folder and builds a [`FileInventoryEntry`] per file.
pub struct InventoryGenerator {
    hasher: SmartHasher,
    extractor: Arc<MetadataExtractor>,
}

impl InventoryGenerator {
    pub fn new(extractor: Arc<MetadataExtractor>) -> Self {
        Self {
            hasher: SmartHasher::new(),
            extractor,
        }
    }

    fn format_time(time: std::io::Result<SystemTime>) -> Option<String> {
        time.ok()
            .map(|t| DateTime::<Local>::from(t).format(TIMESTAMP_FORMAT).to_string())
    }

    /// Inventory `folder` recursively, in deterministic path order.
    pub fn generate(
        &self,
        folder: &Path,
        observer: &mut dyn OrganizeObserver,
        stop_flag: &Arc<AtomicBool>,
    ) -> Result<InventoryResult> {
        if !folder.is_dir() {
            return Err(Error::FolderNotFound(folder.to_path_buf()));
        }

        let files = all_files_sorted(folder);
        let total = files.len();
        info!("Inventorying {} files in {}", total, folder.display());

        let mut result = InventoryResult {
            total_files: total,
            directories_count: crate::fsops::directories_deepest_first(folder).len(),
            ..Default::default()
        };

        for (i, file) in files.iter().enumerate() {
            let done = i + 1;
            if done % INVENTORY_PROGRESS_INTERVAL == 0 || done == total {
                observer.progress(done, total);
                if stop_flag.load(Ordering::Relaxed) {
                    return Err(Error::Stopped);
                }
            }

            let metadata = match fs::metadata(file) {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!("Skipping unreadable file {}: {}", file.display(), e);
                    result.errors += 1;
                    continue;
                }
            };
            let size = metadata.len();
            result.total_size_bytes += size;

            let hash = match self.hasher.compute_hash(file) {
                Ok(hash) => hash,
                Err(_) => {
                    result.errors += 1;
                    "ERROR".to_string()
                }
            };

            let extension = get_file_extension(file);
            let is_video = is_video_extension(&extension);
            let (duration, dimensions, codec) = if is_video {
                self.extractor.video_metadata(file)
            } else {
                (String::new(), String::new(), String::new())
            };
            let (make, model) = self.extractor.os_index_fields(file);

            let modified = Self::format_time(metadata.modified()).unwrap_or_default();
            let created = Self::format_time(metadata.created()).unwrap_or_else(|| modified.clone());

            result.entries.push(FileInventoryEntry {
                relative_path: file.strip_prefix(folder).unwrap_or(file).to_path_buf(),
                path: file.clone(),
                filename: file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                extension,
                size_bytes: size,
                size_formatted: format_file_size(size),
                modified,
                created,
                hash,
                is_video,
                duration,
                dimensions,
                codec,
                make,
                model,
                has_gps: self.extractor.gps_present(file),
            });
        }

        info!(
            "Inventory complete: {} files, {} errors",
            result.total_files, result.errors
        );
        Ok(result)
    }

    /// Write an inventory as pretty JSON.
    pub fn save_json(result: &InventoryResult, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(result)?;
        fs::write(path, contents)?;
        Ok(())
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

    fn generator() -> InventoryGenerator {
        InventoryGenerator::new(Arc::new(MetadataExtractor::disabled()))
    }

    #[test]
    fn test_inventory_covers_nested_files() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("a.jpg"), b"alpha");
        write(&dir.path().join("sub/b.mp4"), b"beta!");

        let result = generator()
            .generate(dir.path(), &mut NullObserver, &stop_flag())
            .unwrap();

        assert_eq!(result.total_files, 2);
        assert_eq!(result.total_size_bytes, 10);
        assert_eq!(result.directories_count, 1);
        assert_eq!(result.errors, 0);

        let video = result.entries.iter().find(|e| e.filename == "b.mp4").unwrap();
        assert!(video.is_video);
        assert_eq!(video.relative_path, PathBuf::from("sub/b.mp4"));
        assert_eq!(video.extension, "mp4");
        assert_eq!(video.size_formatted, "5 B");
        assert_ne!(video.hash, "ERROR");
        assert!(!video.modified.is_empty());
        assert!(!video.created.is_empty());
    }

    #[test]
    fn test_missing_folder_is_error() {
        let dir = tempdir().unwrap();
        let err = generator()
            .generate(&dir.path().join("nope"), &mut NullObserver, &stop_flag())
            .unwrap_err();
        assert!(matches!(err, Error::FolderNotFound(_)));
    }

    #[test]
    fn test_entries_are_in_path_order() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("z.jpg"), b"z");
        write(&dir.path().join("a.jpg"), b"a");
        write(&dir.path().join("m.jpg"), b"m");

        let result = generator()
            .generate(dir.path(), &mut NullObserver, &stop_flag())
            .unwrap();
        let names: Vec<_> = result.entries.iter().map(|e| e.filename.as_str()).collect();
        assert_eq!(names, vec!["a.jpg", "m.jpg", "z.jpg"]);
    }

    #[test]
    fn test_save_json_round_trip() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("a.jpg"), b"alpha");

        let result = generator()
            .generate(dir.path(), &mut NullObserver, &stop_flag())
            .unwrap();
        let out = dir.path().join("inventory.json");
        InventoryGenerator::save_json(&result, &out).unwrap();

        let text = fs::read_to_string(&out).unwrap();
        assert!(text.contains("\"total_files\": 1"));
        assert!(text.contains("a.jpg"));
    }
}
