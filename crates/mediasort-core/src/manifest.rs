//! Undo manifests: a per-run record of every completed move, and the
//! machinery to list, replay, and delete them.
//!
//! Format is one `source|destination` line per move, with `#` comment
//! lines for the header. Dry runs never produce a manifest.

use chrono::{Local, NaiveDateTime};
use log::{info, warn};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::error_log::ErrorLogger;
use crate::fsops::move_path;
use crate::observer::{LogLevel, OrganizeObserver};

const MANIFEST_PREFIX: &str = "mediasort_manifest_";
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Append-only record of moves performed during one run.
pub struct ManifestManager {
    path: PathBuf,
    initialized: bool,
}

impl ManifestManager {
    /// Create a manifest with a timestamped name inside `dir`.
    pub fn new(dir: &Path) -> Self {
        let name = format!(
            "{}{}.txt",
            MANIFEST_PREFIX,
            Local::now().format(TIMESTAMP_FORMAT)
        );
        Self {
            path: dir.join(name),
            initialized: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn initialize(&mut self) -> std::io::Result<()> {
        if self.initialized {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let header = format!(
            "# mediasort manifest - {}\n# Format: SOURCE|DESTINATION\n",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        fs::write(&self.path, header)?;
        self.initialized = true;
        Ok(())
    }

    /// Record a completed move. A manifest write failure is logged but
    /// never fails the move it records.
    pub fn record_move(&mut self, source: &Path, destination: &Path) {
        let line = format!("{}|{}\n", source.display(), destination.display());
        let result = self.initialize().and_then(|_| {
            OpenOptions::new()
                .append(true)
                .open(&self.path)
                .and_then(|mut f| f.write_all(line.as_bytes()))
        });
        if let Err(e) = result {
            warn!("Failed to record move in manifest: {}", e);
        }
    }
}

/// A manifest discovered on disk.
#[derive(Debug, Clone)]
pub struct ManifestInfo {
    pub path: PathBuf,
    pub timestamp: NaiveDateTime,
    pub formatted_date: String,
}

/// Outcome of replaying a manifest in reverse.
#[derive(Debug, Clone, Default)]
pub struct UndoResult {
    pub restored_count: usize,
    pub failed_count: usize,
    pub total_count: usize,
}

/// Lists and replays manifests from a state directory.
pub struct ManifestUndoer {
    dir: PathBuf,
}

impl ManifestUndoer {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// All manifests in the state directory, newest first. Files whose
    /// names do not carry a parsable timestamp are skipped.
    pub fn list_manifests(&self) -> Result<Vec<ManifestInfo>> {
        let mut manifests = Vec::new();
        if !self.dir.exists() {
            return Ok(manifests);
        }

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name,
                None => continue,
            };
            let stamp = match name
                .strip_prefix(MANIFEST_PREFIX)
                .and_then(|s| s.strip_suffix(".txt"))
            {
                Some(stamp) => stamp,
                None => continue,
            };
            let timestamp = match NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT) {
                Ok(timestamp) => timestamp,
                Err(_) => continue,
            };
            manifests.push(ManifestInfo {
                path,
                formatted_date: timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                timestamp,
            });
        }

        manifests.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(manifests)
    }

    /// Replay a manifest in reverse order, moving each destination back
    /// to its recorded source.
    pub fn undo_manifest(
        &self,
        manifest_path: &Path,
        observer: &mut dyn OrganizeObserver,
        stop_flag: &Arc<AtomicBool>,
        mut error_log: Option<&mut ErrorLogger>,
    ) -> Result<UndoResult> {
        let content = fs::read_to_string(manifest_path).map_err(|e| {
            Error::Unknown(format!(
                "Failed to read manifest {}: {}",
                manifest_path.display(),
                e
            ))
        })?;

        let moves: Vec<(PathBuf, PathBuf)> = content
            .lines()
            .filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once('|'))
            .map(|(src, dst)| (PathBuf::from(src), PathBuf::from(dst)))
            .collect();

        let mut result = UndoResult {
            total_count: moves.len(),
            ..Default::default()
        };

        // Reverse order so nested moves unwind cleanly
        for (i, (source, destination)) in moves.iter().rev().enumerate() {
            if stop_flag.load(Ordering::Relaxed) {
                return Err(Error::Stopped);
            }

            observer.progress(i + 1, moves.len());

            if !destination.exists() {
                result.failed_count += 1;
                observer.log(
                    &format!("Missing file, cannot restore: {}", destination.display()),
                    LogLevel::Warning,
                );
                if let Some(log) = error_log.as_deref_mut() {
                    log.log_error("UNDO_MISSING", destination, "file no longer exists");
                }
                continue;
            }

            let restore = source
                .parent()
                .map(fs::create_dir_all)
                .transpose()
                .and_then(|_| move_path(destination, source));

            match restore {
                Ok(()) => {
                    result.restored_count += 1;
                    info!("Restored {} -> {}", destination.display(), source.display());
                }
                Err(e) => {
                    result.failed_count += 1;
                    observer.log(
                        &format!("Failed to restore {}: {}", destination.display(), e),
                        LogLevel::Error,
                    );
                    if let Some(log) = error_log.as_deref_mut() {
                        log.log_error("UNDO_FAILED", destination, &e.to_string());
                    }
                }
            }
        }

        Ok(result)
    }

    /// Delete a manifest file. Returns whether anything was removed.
    pub fn delete_manifest(&self, manifest_path: &Path) -> bool {
        match fs::remove_file(manifest_path) {
            Ok(()) => {
                info!("Deleted manifest {}", manifest_path.display());
                true
            }
            Err(e) => {
                warn!("Failed to delete manifest {}: {}", manifest_path.display(), e);
                false
            }
        }
    }
}
