use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mediasort_core::duplicates::{DuplicateDetector, FolderComparator};
use mediasort_core::error_log::ErrorLogger;
use mediasort_core::inventory::InventoryGenerator;
use mediasort_core::manifest::ManifestUndoer;
use mediasort_core::metadata::MetadataExtractor;
use mediasort_core::observer::{LogLevel, MoveStatus, OrganizeObserver};
use mediasort_core::organizer::FileOrganizer;
use mediasort_core::{format_file_size, Config, Error};

#[derive(Parser)]
#[command(name = "mediasort")]
#[command(about = "Sort media files by device of origin")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Organize a folder of media files into destination subfolders
    Organize {
        /// Folder to organize
        folder: PathBuf,

        /// Run without making changes
        #[arg(long)]
        dry_run: bool,

        /// Verify each move with a content hash and roll back on mismatch
        #[arg(long)]
        verify: bool,

        /// Resume from the last checkpoint
        #[arg(long)]
        resume: bool,

        /// Skip the extraction phase
        #[arg(long)]
        skip_extract: bool,

        /// Skip the empty-directory cleanup phase
        #[arg(long)]
        skip_cleanup: bool,

        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Find files with identical content inside a folder
    Duplicates {
        /// Folder to scan
        folder: PathBuf,
    },

    /// Compare the contents of two folders by hash
    Compare {
        /// First folder
        folder_a: PathBuf,

        /// Second folder
        folder_b: PathBuf,
    },

    /// Build a detailed inventory of a folder
    Inventory {
        /// Folder to inventory
        folder: PathBuf,

        /// Write the inventory as JSON to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Undo moves recorded in a manifest
    Undo {
        /// Manifest to replay (defaults to the most recent)
        manifest: Option<PathBuf>,

        /// List available manifests instead of undoing
        #[arg(long)]
        list: bool,

        /// Delete the manifest after a fully successful undo
        #[arg(long)]
        delete: bool,
    },

    /// Generate default configuration file
    GenerateConfig {
        /// Path to save configuration file
        #[arg(default_value = "mediasort.json")]
        path: PathBuf,
    },
}

/// Terminal observer rendering progress through an indicatif bar.
struct ConsoleObserver {
    bar: ProgressBar,
}

impl ConsoleObserver {
    fn new() -> Self {
        let bar = ProgressBar::hidden();
        bar.set_style(
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl OrganizeObserver for ConsoleObserver {
    fn progress(&mut self, current: usize, total: usize) {
        if self.bar.is_hidden() && total > 0 {
            self.bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        }
        self.bar.set_length(total as u64);
        self.bar.set_position(current as u64);
    }

    fn log(&mut self, message: &str, level: LogLevel) {
        let prefix = match level {
            LogLevel::Info => "",
            LogLevel::Warning => "warning: ",
            LogLevel::Error => "error: ",
            LogLevel::Success => "ok: ",
        };
        self.bar.println(format!("{}{}", prefix, message));
    }

    fn file_processed(&mut self, filename: &str, destination: &str, status: MoveStatus) {
        self.bar
            .set_message(format!("{} {} -> {}", status.as_str(), filename, destination));
    }
}

fn install_stop_handler(flag: Arc<AtomicBool>) {
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("\nStop requested, finishing current file...");
        flag.store(true, Ordering::Relaxed);
    }) {
        warn!("Failed to install interrupt handler: {}", e);
    }
}

fn extractor_for(config: &Config) -> Arc<MetadataExtractor> {
    let extractor = MetadataExtractor::new(Duration::from_secs(config.tool_timeout_secs));
    let missing = extractor.missing_tools();
    if !missing.is_empty() {
        eprintln!(
            "warning: missing metadata tools: {} (detection quality degrades without them)",
            missing.join(", ")
        );
    }
    Arc::new(extractor)
}

fn main() -> Result<(), anyhow::Error> {
    if mediasort_core::logging::init_logger("logs").is_err() {
        env_logger::init();
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::Organize {
            folder,
            dry_run,
            verify,
            resume,
            skip_extract,
            skip_cleanup,
            config,
        } => {
            let mut config = match config {
                Some(path) => Config::from_file(&path)?,
                None => Config::default(),
            };
            config.dry_run = dry_run;
            config.verify_hash = verify;
            config.skip_extract = skip_extract;
            config.skip_cleanup = skip_cleanup;
            config.validate()?;

            let extractor = extractor_for(&config);
            let observer = ConsoleObserver::new();
            let mut organizer =
                FileOrganizer::new(&config, extractor).with_observer(Box::new(observer));
            install_stop_handler(organizer.stop_flag());

            info!("Starting organization of {}", folder.display());
            match organizer.organize(&folder, resume) {
                Ok(stats) => {
                    println!(
                        "Done: {} moved, {} renamed, {} errors",
                        stats.moved, stats.renamed, stats.errors
                    );
                    for (destination, count) in stats.destination_counts() {
                        if count > 0 {
                            println!("  {:20} {}", destination.folder_name(), count);
                        }
                    }
                    if stats.dirs_removed > 0 {
                        println!("  {} empty directories removed", stats.dirs_removed);
                    }
                    Ok(())
                }
                Err(Error::Stopped) => {
                    println!("Stopped. Run again with --resume to continue.");
                    Ok(())
                }
                Err(e) => Err(e.into()),
            }
        }

        Commands::Duplicates { folder } => {
            let config = Config::default();
            let extractor = extractor_for(&config);
            let stop_flag = Arc::new(AtomicBool::new(false));
            install_stop_handler(stop_flag.clone());

            let mut observer = ConsoleObserver::new();
            let detector = DuplicateDetector::new(extractor);
            let scan = detector.find_duplicates(&folder, &mut observer, &stop_flag)?;
            observer.finish();

            println!(
                "Scanned {} files: {} duplicate groups, {} files, {} wasted",
                scan.total_files,
                scan.groups.len(),
                scan.duplicate_files,
                format_file_size(scan.wasted_space_bytes)
            );
            for group in &scan.groups {
                println!(
                    "\n{} copies of {} ({}):",
                    group.count(),
                    format_file_size(group.file_size),
                    &group.hash[..16.min(group.hash.len())]
                );
                for (path, duration) in group.file_paths.iter().zip(&group.video_durations) {
                    if duration.is_empty() {
                        println!("  {}", path.display());
                    } else {
                        println!("  {} [{}]", path.display(), duration);
                    }
                }
            }
            if scan.errors > 0 {
                eprintln!("warning: {} files could not be hashed", scan.errors);
            }
            Ok(())
        }

        Commands::Compare { folder_a, folder_b } => {
            let stop_flag = Arc::new(AtomicBool::new(false));
            install_stop_handler(stop_flag.clone());

            let mut observer = ConsoleObserver::new();
            let result =
                FolderComparator::new().compare(&folder_a, &folder_b, &mut observer, &stop_flag)?;
            observer.finish();

            println!(
                "A: {} files ({}), B: {} files ({})",
                result.count_a,
                format_file_size(result.size_a),
                result.count_b,
                format_file_size(result.size_b)
            );
            println!(
                "Matches: {} ({}), unique to A: {}, unique to B: {}",
                result.match_count,
                format_file_size(result.match_size_bytes),
                result.unique_a_count,
                result.unique_b_count
            );
            for pair in &result.matches {
                println!(
                    "  {} == {} ({})",
                    pair.path_a.display(),
                    pair.path_b.display(),
                    format_file_size(pair.size)
                );
            }
            Ok(())
        }

        Commands::Inventory { folder, output } => {
            let config = Config::default();
            let extractor = extractor_for(&config);
            let stop_flag = Arc::new(AtomicBool::new(false));
            install_stop_handler(stop_flag.clone());

            let mut observer = ConsoleObserver::new();
            let generator = InventoryGenerator::new(extractor);
            let result = generator.generate(&folder, &mut observer, &stop_flag)?;
            observer.finish();

            println!(
                "{} files in {} directories, {} total",
                result.total_files,
                result.directories_count,
                format_file_size(result.total_size_bytes)
            );
            match output {
                Some(path) => {
                    InventoryGenerator::save_json(&result, &path)?;
                    println!("Inventory written to {}", path.display());
                }
                None => {
                    for entry in &result.entries {
                        println!(
                            "{:10}  {:16}  {}",
                            entry.size_formatted,
                            entry.modified,
                            entry.relative_path.display()
                        );
                    }
                }
            }
            if result.errors > 0 {
                eprintln!("warning: {} files had errors", result.errors);
            }
            Ok(())
        }

        Commands::Undo {
            manifest,
            list,
            delete,
        } => {
            let config = Config::default();
            let undoer = ManifestUndoer::new(config.manifest_dir.clone());

            if list {
                let manifests = undoer.list_manifests()?;
                if manifests.is_empty() {
                    println!("No manifests found in {}", config.manifest_dir.display());
                } else {
                    for info in manifests {
                        println!("{}  {}", info.formatted_date, info.path.display());
                    }
                }
                return Ok(());
            }

            let manifest_path = match manifest {
                Some(path) => path,
                None => undoer
                    .list_manifests()?
                    .into_iter()
                    .next()
                    .map(|info| info.path)
                    .ok_or_else(|| anyhow::anyhow!("no manifests to undo"))?,
            };

            let stop_flag = Arc::new(AtomicBool::new(false));
            install_stop_handler(stop_flag.clone());

            let mut observer = ConsoleObserver::new();
            let mut errors =
                ErrorLogger::new(&config.error_log_dir, config.keep_empty_error_log);
            let result =
                undoer.undo_manifest(&manifest_path, &mut observer, &stop_flag, Some(&mut errors))?;
            observer.finish();
            errors.close();

            println!(
                "Restored {} of {} files ({} failed)",
                result.restored_count, result.total_count, result.failed_count
            );
            if delete {
                if result.failed_count == 0 && undoer.delete_manifest(&manifest_path) {
                    println!("Manifest deleted");
                } else if result.failed_count > 0 {
                    println!("Manifest kept: some files were not restored");
                }
            }
            Ok(())
        }

        Commands::GenerateConfig { path } => {
            let config = Config::default();
            config.save_to_file(&path)?;
            println!("Configuration file generated at: {}", path.display());
            Ok(())
        }
    }
}
