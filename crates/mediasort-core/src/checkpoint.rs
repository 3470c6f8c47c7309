//! Checkpoint persistence for resumable runs.
//!
//! A single pipe-delimited line, `phase|handled|folder_path`, written
//! atomically (temp file + rename). Absence means "no resume state". The
//! count records how many files the interrupted phase had handled; the
//! stored folder guards against resuming into a different tree.

use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Organization phase recorded in a checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No phase completed yet: start from the beginning
    None,
    Extract,
    Organize,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::None => "none",
            Phase::Extract => "extract",
            Phase::Organize => "organize",
        }
    }

    pub fn parse(s: &str) -> Option<Phase> {
        match s {
            "none" => Some(Phase::None),
            "extract" => Some(Phase::Extract),
            "organize" => Some(Phase::Organize),
            _ => None,
        }
    }
}

/// Where to pick up an interrupted run. `index` is the number of files
/// the interrupted phase had already handled, kept for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumeState {
    pub phase: Phase,
    pub index: usize,
}

impl ResumeState {
    /// Start from scratch
    pub fn start() -> Self {
        ResumeState {
            phase: Phase::None,
            index: 0,
        }
    }
}

/// Single-writer checkpoint file resource.
pub struct CheckpointManager {
    path: PathBuf,
}

impl CheckpointManager {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Persist the checkpoint atomically. Failure to save is logged but
    /// never interrupts the run.
    pub fn save(&self, phase: Phase, handled: usize, folder: &Path) {
        let line = format!("{}|{}|{}\n", phase.as_str(), handled, folder.display());
        let temp_path = self.path.with_extension("tmp");

        let result = self
            .path
            .parent()
            .map(fs::create_dir_all)
            .transpose()
            .and_then(|_| fs::write(&temp_path, line))
            .and_then(|_| fs::rename(&temp_path, &self.path));
        match result {
            Ok(()) => debug!(
                "Checkpoint saved: {}|{}|{}",
                phase.as_str(),
                handled,
                folder.display()
            ),
            Err(e) => warn!("Failed to save checkpoint: {}", e),
        }
    }

    /// Load the raw checkpoint, or `None` when the file is missing or
    /// unparsable (a corrupt checkpoint is discarded, never trusted).
    pub fn load(&self) -> Option<(Phase, usize, PathBuf)> {
        if !self.path.exists() {
            return None;
        }

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read checkpoint: {}", e);
                return None;
            }
        };

        let line = content.trim();
        let mut parts = line.splitn(3, '|');
        let phase = parts.next().and_then(Phase::parse);
        let index = parts.next().and_then(|s| s.parse::<usize>().ok());
        let folder = parts.next().map(PathBuf::from);

        match (phase, index, folder) {
            (Some(phase), Some(index), Some(folder)) => {
                info!("Loaded checkpoint: {}|{}|{}", phase.as_str(), index, folder.display());
                Some((phase, index, folder))
            }
            _ => {
                warn!("Invalid checkpoint format: {}", line);
                None
            }
        }
    }

    /// Resume position for a run over `folder`. A checkpoint recorded
    /// against a different folder is discarded: a stale phase from another
    /// tree must not suppress this run's extract pass.
    pub fn resume_state(&self, folder: &Path) -> ResumeState {
        match self.load() {
            Some((phase, index, saved_folder)) if saved_folder == folder => {
                ResumeState { phase, index }
            }
            Some((_, _, saved_folder)) => {
                warn!(
                    "Checkpoint folder mismatch ({} != {}), starting over",
                    saved_folder.display(),
                    folder.display()
                );
                ResumeState::start()
            }
            None => ResumeState::start(),
        }
    }

    /// Remove the checkpoint after a successful run
    pub fn clear(&self) {
        if self.path.exists() {
            match fs::remove_file(&self.path) {
                Ok(()) => info!("Checkpoint cleared"),
                Err(e) => warn!("Failed to clear checkpoint: {}", e),
            }
        }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn manager_in(dir: &Path) -> CheckpointManager {
        CheckpointManager::new(dir.join("test.checkpoint"))
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempdir().unwrap();
        let manager = manager_in(dir.path());
        let folder = dir.path().join("photos");

        manager.save(Phase::Organize, 42, &folder);

        let (phase, index, saved) = manager.load().unwrap();
        assert_eq!(phase, Phase::Organize);
        assert_eq!(index, 42);
        assert_eq!(saved, folder);
    }

    #[test]
    fn test_missing_checkpoint_means_fresh_start() {
        let dir = tempdir().unwrap();
        let manager = manager_in(dir.path());

        assert!(!manager.exists());
        assert!(manager.load().is_none());
        assert_eq!(manager.resume_state(dir.path()), ResumeState::start());
    }

    #[test]
    fn test_corrupt_checkpoint_is_discarded() {
        let dir = tempdir().unwrap();
        let manager = manager_in(dir.path());
        fs::write(dir.path().join("test.checkpoint"), "garbage with no pipes").unwrap();

        assert!(manager.load().is_none());
        assert_eq!(manager.resume_state(dir.path()), ResumeState::start());
    }

    #[test]
    fn test_non_numeric_index_is_discarded() {
        let dir = tempdir().unwrap();
        let manager = manager_in(dir.path());
        fs::write(dir.path().join("test.checkpoint"), "extract|abc|/tmp/x").unwrap();

        assert!(manager.load().is_none());
    }

    #[test]
    fn test_folder_mismatch_starts_over() {
        let dir = tempdir().unwrap();
        let manager = manager_in(dir.path());

        manager.save(Phase::Extract, 30, &dir.path().join("other"));
        assert_eq!(
            manager.resume_state(&dir.path().join("photos")),
            ResumeState::start()
        );
    }

    #[test]
    fn test_matching_folder_resumes() {
        let dir = tempdir().unwrap();
        let manager = manager_in(dir.path());
        let folder = dir.path().join("photos");

        manager.save(Phase::Extract, 30, &folder);
        let resume = manager.resume_state(&folder);
        assert_eq!(resume.phase, Phase::Extract);
        assert_eq!(resume.index, 30);
    }

    #[test]
    fn test_clear_removes_file() {
        let dir = tempdir().unwrap();
        let manager = manager_in(dir.path());

        manager.save(Phase::Extract, 10, dir.path());
        assert!(manager.exists());

        manager.clear();
        assert!(!manager.exists());
    }
}
