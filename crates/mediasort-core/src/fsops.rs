//! Small filesystem helpers shared by the organizer and the undo engine.

use log::warn;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use sysinfo::Disks;

/// Move a file, falling back to copy-and-remove when a plain rename fails
/// (typically across filesystem boundaries).
pub fn move_path(source: &Path, dest: &Path) -> io::Result<()> {
    match fs::rename(source, dest) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(source, dest)?;
            fs::remove_file(source)?;
            Ok(())
        }
    }
}

/// Generate a collision-free filename in `dest_dir` by appending an
/// incrementing numeric suffix before the extension (`name_1.ext`,
/// `name_2.ext`, ...). Returns the input name unchanged when it is free.
pub fn generate_unique_filename(filename: &str, dest_dir: &Path) -> String {
    let (name, ext) = match filename.rsplit_once('.') {
        Some((name, ext)) => (name, Some(ext)),
        None => (filename, None),
    };

    let mut candidate = filename.to_string();
    let mut counter = 1;

    while dest_dir.join(&candidate).exists() {
        candidate = match ext {
            Some(ext) => format!("{}_{}.{}", name, counter, ext),
            None => format!("{}_{}", name, counter),
        };
        counter += 1;
    }

    candidate
}

/// Advisory free-space check for the disk holding `folder`.
///
/// Returns `(is_sufficient, available_mb)`. Low space is a warning, never a
/// blocker; the decision to abort belongs to the caller.
pub fn check_disk_space(folder: &Path, min_mb: u64) -> (bool, u64) {
    let canonical = folder.canonicalize().unwrap_or_else(|_| folder.to_path_buf());
    let disks = Disks::new_with_refreshed_list();

    // Longest mount-point prefix wins
    let available = disks
        .iter()
        .filter(|disk| canonical.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .map(|disk| disk.available_space());

    match available {
        Some(bytes) => {
            let available_mb = bytes / (1024 * 1024);
            let sufficient = available_mb >= min_mb;
            if !sufficient {
                warn!(
                    "Low disk space: {} MB available (minimum: {} MB)",
                    available_mb, min_mb
                );
            }
            (sufficient, available_mb)
        }
        None => {
            warn!("Failed to check disk space for {}", folder.display());
            (false, 0)
        }
    }
}

/// Deterministically ordered list of all files strictly below the top level
/// (depth >= 2) under `root`.
pub fn files_below_top_level(root: &Path) -> Vec<PathBuf> {
    walkdir::WalkDir::new(root)
        .sort_by_file_name()
        .min_depth(2)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect()
}

/// Deterministically ordered list of every file under `root`, recursively
pub fn all_files_sorted(root: &Path) -> Vec<PathBuf> {
    walkdir::WalkDir::new(root)
        .sort_by_file_name()
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect()
}

/// Deterministically ordered list of files directly at the top level of `root`
pub fn files_at_top_level(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(root)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|entry| entry.path())
        .collect();
    files.sort();
    Ok(files)
}

/// All directories under `root`, deepest first, so that emptied parents
/// become eligible for removal in the same pass
pub fn directories_deepest_first(root: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
        .collect();
    dirs.sort_by_key(|d| std::cmp::Reverse(d.components().count()));
    dirs
}

/// Whether a directory currently has no entries at all
pub fn is_empty_dir(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}
