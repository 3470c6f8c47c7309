//! Three-phase file organization engine.
//!
//! Phase 1 extracts files from subdirectories to the top level, phase 2
//! removes emptied directories, phase 3 routes each top-level file into
//! its destination subfolder. A checkpoint is saved every
//! [`CHECKPOINT_INTERVAL`] files so an interrupted run resumes where it
//! stopped. Moved files vanish from a phase's enumeration, so a resumed
//! phase re-lists the folder and processes whatever is still present
//! rather than skipping by position.

use log::{error, info, warn};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::checkpoint::{CheckpointManager, Phase, ResumeState};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::error_log::ErrorLogger;
use crate::fsops::{
    check_disk_space, directories_deepest_first, files_at_top_level, files_below_top_level,
    generate_unique_filename, is_empty_dir, move_path,
};
use crate::hasher::SmartHasher;
use crate::logging::log_fs_modification;
use crate::manifest::ManifestManager;
use crate::metadata::MetadataExtractor;
use crate::observer::{LogLevel, MoveStatus, OrganizeObserver};
use crate::router::DestinationRouter;
use crate::types::Destination;

/// Checkpoint cadence during the extract and organize phases
pub const CHECKPOINT_INTERVAL: usize = 10;

/// Counters accumulated over one organization run.
#[derive(Debug, Clone, Default)]
pub struct OrganizeStats {
    pub moved: usize,
    pub renamed: usize,
    pub dirs_removed: usize,
    pub errors: usize,
    pub phase1_file_count: usize,
    pub phase3_file_count: usize,

    pub iphone_photos: usize,
    pub iphone_videos: usize,
    pub iphone_screenshots: usize,
    pub screenshots: usize,
    pub snapchat: usize,
    pub jpeg: usize,
    pub mp4: usize,
    pub non_apple: usize,
    pub no_metadata: usize,
}

impl OrganizeStats {
    pub fn record_destination(&mut self, destination: Destination) {
        match destination {
            Destination::IphonePhotos => self.iphone_photos += 1,
            Destination::IphoneVideos => self.iphone_videos += 1,
            Destination::IphoneScreenshots => self.iphone_screenshots += 1,
            Destination::Screenshots => self.screenshots += 1,
            Destination::Snapchat => self.snapchat += 1,
            Destination::Jpeg => self.jpeg += 1,
            Destination::Mp4 => self.mp4 += 1,
            Destination::NonApple => self.non_apple += 1,
            Destination::NoMetadata => self.no_metadata += 1,
        }
    }

    pub fn destination_counts(&self) -> [(Destination, usize); 9] {
        [
            (Destination::IphonePhotos, self.iphone_photos),
            (Destination::IphoneVideos, self.iphone_videos),
            (Destination::IphoneScreenshots, self.iphone_screenshots),
            (Destination::Screenshots, self.screenshots),
            (Destination::Snapchat, self.snapchat),
            (Destination::Jpeg, self.jpeg),
            (Destination::Mp4, self.mp4),
            (Destination::NonApple, self.non_apple),
            (Destination::NoMetadata, self.no_metadata),
        ]
    }
}

/// Drives the three organization phases over a single folder.
pub struct FileOrganizer {
    router: DestinationRouter,
    hasher: SmartHasher,
    stats: OrganizeStats,
    verify_hash: bool,
    dry_run: bool,
    skip_extract: bool,
    skip_cleanup: bool,
    min_disk_space_mb: u64,
    observer: Box<dyn OrganizeObserver>,
    checkpoint: CheckpointManager,
    manifest: Option<ManifestManager>,
    error_log: Option<ErrorLogger>,
    stop_flag: Arc<AtomicBool>,
    #[cfg(test)]
    post_move_hook: Option<Box<dyn Fn(&Path) + Send>>,
}

impl FileOrganizer {
    pub fn new(config: &Config, extractor: Arc<MetadataExtractor>) -> Self {
        let manifest = if config.dry_run {
            None
        } else {
            Some(ManifestManager::new(&config.manifest_dir))
        };

        Self {
            router: DestinationRouter::new(extractor),
            hasher: SmartHasher::new(),
            stats: OrganizeStats::default(),
            verify_hash: config.verify_hash,
            dry_run: config.dry_run,
            skip_extract: config.skip_extract,
            skip_cleanup: config.skip_cleanup,
            min_disk_space_mb: config.min_disk_space_mb,
            observer: Box::new(crate::observer::NullObserver),
            checkpoint: CheckpointManager::new(config.checkpoint_path.clone()),
            manifest,
            error_log: Some(ErrorLogger::new(
                &config.error_log_dir,
                config.keep_empty_error_log,
            )),
            stop_flag: Arc::new(AtomicBool::new(false)),
            #[cfg(test)]
            post_move_hook: None,
        }
    }

    pub fn with_observer(mut self, observer: Box<dyn OrganizeObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Handle other threads can use to request a cooperative stop
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop_flag.clone()
    }

    pub fn stats(&self) -> &OrganizeStats {
        &self.stats
    }

    fn log_info(&mut self, message: &str) {
        info!("{}", message);
        self.observer.log(message, LogLevel::Info);
    }

    /// Write an error-log entry without touching the error counter.
    /// Callers that treat the condition as a failed file use
    /// [`Self::report_error`] instead.
    fn log_error_entry(&mut self, context: &str, file: &Path, message: &str) {
        error!("{}: {} - {}", context, file.display(), message);
        self.observer.log(
            &format!("{}: {} - {}", context, file.display(), message),
            LogLevel::Error,
        );
        if let Some(log) = self.error_log.as_mut() {
            log.log_error(context, file, message);
        }
    }

    fn report_error(&mut self, context: &str, file: &Path, message: &str) {
        self.log_error_entry(context, file, message);
        self.stats.errors += 1;
    }

    /// Report progress, checkpoint on the interval boundary and poll the
    /// stop flag. `index` is zero-based; the checkpoint records how many
    /// files the phase has handled so far, which a resumed run reports
    /// but does not use to skip (handled files are gone from the listing).
    fn checkpoint_tick(
        &mut self,
        phase: Phase,
        index: usize,
        total: usize,
        folder: &Path,
    ) -> Result<()> {
        let done = index + 1;
        if done % CHECKPOINT_INTERVAL == 0 || done == total {
            self.observer.progress(done, total);
            self.checkpoint.save(phase, done, folder);
        }
        if self.stop_flag.load(Ordering::Relaxed) {
            // Persist the exact interruption point so resume repeats nothing
            self.checkpoint.save(phase, done, folder);
            return Err(Error::Stopped);
        }
        Ok(())
    }

    /// Move one file into `dest_dir`, renaming on collision and optionally
    /// verifying content by hash. Any failure is recorded against the file
    /// and counted exactly once.
    fn move_file(&mut self, source: &Path, dest_dir: &Path) {
        let filename = match source.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => {
                self.report_error("MOVE_FAILED", source, "file name is not valid UTF-8");
                return;
            }
        };

        let source_hash = if self.verify_hash && !self.dry_run {
            match self.hasher.compute_hash(source) {
                Ok(hash) => Some(hash),
                Err(e) => {
                    self.report_error("HASH_ERROR", source, &e.to_string());
                    return;
                }
            }
        } else {
            None
        };

        let unique_name = generate_unique_filename(&filename, dest_dir);
        let renamed = unique_name != filename;
        let dest = dest_dir.join(&unique_name);

        if self.dry_run {
            self.stats.moved += 1;
            if renamed {
                self.stats.renamed += 1;
            }
            self.observer.file_processed(
                &filename,
                &dest.display().to_string(),
                MoveStatus::Simulated,
            );
            return;
        }

        if let Err(e) = fs::create_dir_all(dest_dir) {
            self.report_error("MOVE_FAILED", source, &e.to_string());
            return;
        }

        if let Err(e) = move_path(source, &dest) {
            self.report_error("MOVE_FAILED", source, &e.to_string());
            return;
        }

        if !dest.exists() {
            self.report_error(
                "MOVE_VERIFY_FAILED",
                source,
                "destination missing after move",
            );
            return;
        }

        #[cfg(test)]
        if let Some(hook) = self.post_move_hook.as_ref() {
            hook(&dest);
        }

        if let Some(expected) = source_hash {
            match self.hasher.compute_hash(&dest) {
                Ok(actual) if actual == expected => {}
                outcome => {
                    let detail = match outcome {
                        Ok(_) => "content hash mismatch after move".to_string(),
                        Err(e) => e.to_string(),
                    };
                    self.log_error_entry("HASH_MISMATCH", source, &detail);
                    match move_path(&dest, source) {
                        Ok(()) => {
                            self.log_error_entry("ROLLBACK_SUCCESS", source, "file restored")
                        }
                        Err(e) => self.log_error_entry("ROLLBACK_FAILED", source, &e.to_string()),
                    }
                    // One failed file, one error, regardless of rollback outcome
                    self.stats.errors += 1;
                    return;
                }
            }
        }

        if let Some(manifest) = self.manifest.as_mut() {
            manifest.record_move(source, &dest);
        }
        log_fs_modification("MOVE", source, Some(&dest.display().to_string()));
        self.stats.moved += 1;
        if renamed {
            self.stats.renamed += 1;
        }
        self.observer
            .file_processed(&filename, &dest.display().to_string(), MoveStatus::Moved);
    }

    /// Phase 1: flatten the tree by moving every nested file to the top
    /// level of `folder`. On resume the already-extracted files are no
    /// longer nested, so the fresh listing holds exactly the remainder.
    fn extract_files_to_top(&mut self, folder: &Path) -> Result<()> {
        let files = files_below_top_level(folder);
        self.stats.phase1_file_count = files.len();

        if files.is_empty() {
            self.log_info("No nested files to extract");
            return Ok(());
        }
        self.log_info(&format!("Extracting {} nested files", files.len()));

        let total = files.len();
        for (i, file) in files.iter().enumerate() {
            self.move_file(file, folder);
            self.checkpoint_tick(Phase::Extract, i, total, folder)?;
        }
        Ok(())
    }

    /// Phase 3: route each top-level file into its destination subfolder.
    /// Organized files leave the top level, so a resumed run sees only
    /// the files the interrupted run never reached.
    fn organize_files(&mut self, folder: &Path) -> Result<()> {
        if !self.dry_run {
            for destination in Destination::ALL {
                fs::create_dir_all(folder.join(destination.folder_name()))?;
            }
        }

        let files = files_at_top_level(folder)?;
        self.stats.phase3_file_count = files.len();
        self.log_info(&format!("Organizing {} files", files.len()));

        let total = files.len();
        for (i, file) in files.iter().enumerate() {
            let (destination, reason) = self.router.determine_destination(file);
            info!(
                "{} -> {} ({})",
                file.display(),
                destination.folder_name(),
                reason
            );
            self.stats.record_destination(destination);
            let dest_dir = folder.join(destination.folder_name());
            self.move_file(file, &dest_dir);
            self.checkpoint_tick(Phase::Organize, i, total, folder)?;
        }
        Ok(())
    }

    /// Phase 2: remove directories emptied by extraction, deepest first so
    /// that emptied parents become eligible in the same pass.
    fn remove_empty_directories(&mut self, folder: &Path) {
        let mut removed = 0;
        for dir in directories_deepest_first(folder) {
            if !is_empty_dir(&dir) {
                continue;
            }
            if self.dry_run {
                removed += 1;
                continue;
            }
            match fs::remove_dir(&dir) {
                Ok(()) => {
                    log_fs_modification("RMDIR", &dir, None);
                    removed += 1;
                }
                Err(e) => self.report_error("DIR_REMOVE_FAILED", &dir, &e.to_string()),
            }
        }
        self.stats.dirs_removed = removed;
        self.log_info(&format!("Removed {} empty directories", removed));
    }

    /// Run the full pipeline over `folder`. With `resume` set, a matching
    /// checkpoint restarts mid-phase; otherwise any stale checkpoint is
    /// ignored and overwritten.
    pub fn organize(&mut self, folder: &Path, resume: bool) -> Result<OrganizeStats> {
        if !folder.exists() {
            return Err(Error::FolderNotFound(folder.to_path_buf()));
        }
        if !folder.is_dir() {
            return Err(Error::NotADirectory(folder.to_path_buf()));
        }

        self.stats = OrganizeStats::default();

        let (space_ok, available_mb) = check_disk_space(folder, self.min_disk_space_mb);
        if !space_ok {
            warn!(
                "Low disk space: {} MB available, {} MB advised",
                available_mb, self.min_disk_space_mb
            );
            self.observer.log(
                &format!("Low disk space: {} MB available", available_mb),
                LogLevel::Warning,
            );
        }

        let resume_state = if resume {
            self.checkpoint.resume_state(folder)
        } else {
            ResumeState::start()
        };
        if resume_state.phase != Phase::None {
            self.log_info(&format!(
                "Resuming from {} phase ({} files already handled)",
                resume_state.phase.as_str(),
                resume_state.index
            ));
        }

        let outcome = self.run_phases(folder, resume_state);
        match outcome {
            Ok(()) => {
                self.checkpoint.clear();
                if let Some(log) = self.error_log.as_mut() {
                    log.close();
                }
                self.log_info(&format!(
                    "Organization complete: {} moved, {} renamed, {} errors",
                    self.stats.moved, self.stats.renamed, self.stats.errors
                ));
                Ok(self.stats.clone())
            }
            Err(Error::Stopped) => {
                // Checkpoint stays on disk for a later resume
                self.log_info("Stopped by request, checkpoint saved");
                if let Some(log) = self.error_log.as_mut() {
                    log.close();
                }
                Err(Error::Stopped)
            }
            Err(e) => {
                self.report_error("FATAL_ERROR", folder, &e.to_string());
                if let Some(log) = self.error_log.as_mut() {
                    log.close();
                }
                Err(e)
            }
        }
    }

    /// Run order is extract, cleanup, organize. Resuming mid-organize skips
    /// the first two phases entirely; resuming mid-extract re-runs the
    /// extract pass over the files that are still nested.
    fn run_phases(&mut self, folder: &Path, resume: ResumeState) -> Result<()> {
        match resume.phase {
            Phase::None | Phase::Extract => {
                if !self.skip_extract {
                    self.extract_files_to_top(folder)?;
                }
                if !self.skip_cleanup {
                    self.remove_empty_directories(folder);
                }
                self.organize_files(folder)
            }
            Phase::Organize => self.organize_files(folder),
        }
    }
}
