use serde::{Deserialize, Serialize};
use std::path::Path;

/// Video file extensions (lowercase, no dot)
pub const VIDEO_EXTENSIONS: [&str; 6] = ["mov", "mp4", "m4v", "avi", "mkv", "webm"];

/// Returns true if the lowercase extension belongs to a video container
pub fn is_video_extension(ext: &str) -> bool {
    VIDEO_EXTENSIONS.contains(&ext)
}

/// Extract the lowercase file extension without the dot.
///
/// Shared by the metadata extractor, detector and router so that extension
/// handling stays consistent. Returns an empty string when there is none.
pub fn get_file_extension(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .unwrap_or_default()
}

/// Convert a byte count to a human-readable string (e.g. "1.5 MB")
pub fn format_file_size(bytes: u64) -> String {
    const GB: u64 = 1_073_741_824;
    const MB: u64 = 1_048_576;
    const KB: u64 = 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Target destinations for file routing.
///
/// Closed set: each variant maps 1:1 to a physical subfolder created under
/// the organized root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Destination {
    IphonePhotos,
    IphoneVideos,
    IphoneScreenshots,
    Screenshots,
    Snapchat,
    Jpeg,
    Mp4,
    NonApple,
    NoMetadata,
}

impl Destination {
    /// All destinations, used to pre-create the target folders
    pub const ALL: [Destination; 9] = [
        Destination::IphonePhotos,
        Destination::IphoneVideos,
        Destination::IphoneScreenshots,
        Destination::Screenshots,
        Destination::Snapchat,
        Destination::Jpeg,
        Destination::Mp4,
        Destination::NonApple,
        Destination::NoMetadata,
    ];

    /// Subfolder name for this destination, relative to the organized root
    pub fn folder_name(&self) -> &'static str {
        match self {
            Destination::IphonePhotos => "iPhone/Photos",
            Destination::IphoneVideos => "iPhone/Videos",
            Destination::IphoneScreenshots => "iPhone/Screenshots",
            Destination::Screenshots => "Screenshots",
            Destination::Snapchat => "Snapchat",
            Destination::Jpeg => "JPEG",
            Destination::Mp4 => "MP4",
            Destination::NonApple => "Non-Apple",
            Destination::NoMetadata => "No-Metadata",
        }
    }
}

/// Cached metadata from a single exiftool batch extraction.
///
/// Immutable snapshot: created fresh per file and never shared across files.
/// String fields that feed substring checks are lower-cased at extraction.
#[derive(Debug, Clone, Default)]
pub struct BatchMetadata {
    pub make: String,
    pub model: String,
    pub software: String,
    pub creator_tool: String,
    pub gps_latitude: String,
    pub gps_longitude: String,
    pub raw_output: String,
    pub duration: String,
    pub resolution: String,
    pub codec: String,
}

impl BatchMetadata {
    pub fn has_gps(&self) -> bool {
        !self.gps_latitude.is_empty() || !self.gps_longitude.is_empty()
    }

    /// Check if video properties exist
    pub fn has_video_metadata(&self) -> bool {
        !self.duration.is_empty() || !self.resolution.is_empty() || !self.codec.is_empty()
    }
}

/// Result of Apple device detection.
#[derive(Debug, Clone)]
pub struct DetectionResult {
    pub is_apple: bool,
    pub confidence_score: i32,
    /// Names of the scoring layers that fired, in evaluation order
    pub methods: Vec<&'static str>,
    pub destination: Destination,
    /// Comma-joined layer names, or "none" / "error"
    pub detection_method: String,
    pub video_duration: Option<String>,
    /// GPS presence as established during detection, exposed so the router
    /// does not need a second round trip to the external tools
    pub has_gps: bool,
}

impl DetectionResult {
    /// Zero-confidence non-match tagged with an "error" method, produced when
    /// detection itself fails unexpectedly
    pub fn error() -> Self {
        DetectionResult {
            is_apple: false,
            confidence_score: 0,
            methods: Vec::new(),
            destination: Destination::NoMetadata,
            detection_method: "error".to_string(),
            video_duration: None,
            has_gps: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_file_extension() {
        assert_eq!(get_file_extension(Path::new("IMG_0001.HEIC")), "heic");
        assert_eq!(get_file_extension(Path::new("/a/b/movie.MOV")), "mov");
        assert_eq!(get_file_extension(Path::new("archive.tar.gz")), "gz");
        assert_eq!(get_file_extension(Path::new("noext")), "");
    }

    #[test]
    fn test_is_video_extension() {
        assert!(is_video_extension("mov"));
        assert!(is_video_extension("webm"));
        assert!(!is_video_extension("heic"));
        assert!(!is_video_extension(""));
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1_572_864), "1.5 MB");
        assert_eq!(format_file_size(1_610_612_736), "1.5 GB");
    }

    #[test]
    fn test_destination_folder_names_are_unique() {
        let mut names: Vec<&str> = Destination::ALL.iter().map(|d| d.folder_name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Destination::ALL.len());
    }

    #[test]
    fn test_batch_metadata_gps() {
        let mut batch = BatchMetadata::default();
        assert!(!batch.has_gps());
        batch.gps_latitude = "51.5 N".to_string();
        assert!(batch.has_gps());
    }

    #[test]
    fn test_detection_error_result() {
        let result = DetectionResult::error();
        assert!(!result.is_apple);
        assert_eq!(result.confidence_score, 0);
        assert_eq!(result.detection_method, "error");
        assert_eq!(result.destination, Destination::NoMetadata);
    }
}
