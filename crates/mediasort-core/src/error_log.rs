//! Timestamped error log file, created lazily on first error.
//!
//! An error-free run leaves no log behind unless configured to keep
//! empty logs.

use chrono::Local;
use log::warn;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Collects per-file errors into a session log.
pub struct ErrorLogger {
    path: PathBuf,
    keep_empty: bool,
    initialized: bool,
    closed: bool,
    error_count: usize,
}

impl ErrorLogger {
    /// Create a logger writing into `dir` with a timestamped file name.
    pub fn new(dir: &Path, keep_empty: bool) -> Self {
        let name = format!(
            "mediasort_errors_{}.log",
            Local::now().format("%Y%m%d_%H%M%S")
        );
        Self {
            path: dir.join(name),
            keep_empty,
            initialized: false,
            closed: false,
            error_count: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    fn initialize(&mut self) -> std::io::Result<()> {
        if self.initialized {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let header = format!(
            "=== mediasort error log - {} ===\n\n",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        fs::write(&self.path, header)?;
        self.initialized = true;
        Ok(())
    }

    /// Append one error entry. Logging failures fall back to stderr so
    /// the original error is never silently lost.
    pub fn log_error(&mut self, context: &str, file: &Path, error: &str) {
        self.error_count += 1;
        let entry = format!(
            "[{}] {}: {} - {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            context,
            file.display(),
            error
        );

        let result = self.initialize().and_then(|_| {
            OpenOptions::new()
                .append(true)
                .open(&self.path)
                .and_then(|mut f| f.write_all(entry.as_bytes()))
        });
        if let Err(e) = result {
            warn!("Failed to write error log: {}", e);
            eprintln!("{}", entry.trim_end());
        }
    }

    /// Finalize the log: write the total footer, or remove the file when
    /// no errors were recorded.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if self.error_count == 0 {
            if self.initialized && !self.keep_empty {
                let _ = fs::remove_file(&self.path);
            }
            return;
        }

        let footer = format!("\n=== Total errors: {} ===\n", self.error_count);
        let result = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .and_then(|mut f| f.write_all(footer.as_bytes()));
        if let Err(e) = result {
            warn!("Failed to finalize error log: {}", e);
        }
    }
}

impl Drop for ErrorLogger {
    fn drop(&mut self) {
        self.close();
    }
}
