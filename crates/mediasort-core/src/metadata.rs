//! Metadata extraction facade.
//!
//! The only module that talks to the external inspectors (exiftool, the
//! Spotlight index via mdls, mediainfo). Each call is best-effort with a
//! bounded wait: an unavailable or timed-out tool degrades to empty data and
//! never fails the run.

use log::{debug, warn};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::tools::{tool_available, CommandRunner, SystemRunner};
use crate::types::{get_file_extension, is_video_extension, BatchMetadata};

/// Facade over the external inspection tools.
pub struct MetadataExtractor {
    runner: Arc<dyn CommandRunner>,
    exiftool_available: bool,
    mdls_available: bool,
    mediainfo_available: bool,
}

impl MetadataExtractor {
    /// Probe the system for the external tools and build a real extractor
    pub fn new(tool_timeout: Duration) -> Self {
        let exiftool_available = tool_available("exiftool");
        let mdls_available = tool_available("mdls");
        let mediainfo_available = tool_available("mediainfo");

        if !exiftool_available {
            warn!("exiftool not available - metadata extraction will be limited");
        }
        if !mdls_available {
            warn!("mdls not available - Spotlight metadata unavailable");
        }
        if !mediainfo_available {
            warn!("mediainfo not available - video metadata extraction limited");
        }

        Self {
            runner: Arc::new(SystemRunner::new(tool_timeout)),
            exiftool_available,
            mdls_available,
            mediainfo_available,
        }
    }

    /// Build an extractor over a custom runner, with explicit availability
    /// flags. This is the seam integration tests use.
    pub fn with_runner(
        runner: Arc<dyn CommandRunner>,
        exiftool_available: bool,
        mdls_available: bool,
        mediainfo_available: bool,
    ) -> Self {
        Self {
            runner,
            exiftool_available,
            mdls_available,
            mediainfo_available,
        }
    }

    /// Extractor with every tool marked unavailable: all queries return
    /// empty data. Useful for tests and for metadata-free scans.
    pub fn disabled() -> Self {
        struct NeverRunner;
        impl CommandRunner for NeverRunner {
            fn run(&self, _program: &str, _args: &[&str]) -> Option<String> {
                None
            }
        }
        Self::with_runner(Arc::new(NeverRunner), false, false, false)
    }

    /// Names of the external tools that were not found
    pub fn missing_tools(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.exiftool_available {
            missing.push("exiftool");
        }
        if !self.mdls_available {
            missing.push("mdls");
        }
        if !self.mediainfo_available {
            missing.push("mediainfo");
        }
        missing
    }

    /// Run a command and return lowercase output (empty on failure)
    fn run_lower(&self, program: &str, args: &[&str]) -> String {
        self.runner
            .run(program, args)
            .map(|out| out.to_lowercase())
            .unwrap_or_default()
    }

    /// Run a command and return raw output (empty on failure)
    fn run_raw(&self, program: &str, args: &[&str]) -> String {
        self.runner.run(program, args).unwrap_or_default()
    }

    /// Single exiftool round trip collecting all fields the classifier needs.
    ///
    /// The raw `-s` output is kept (lower-cased) for substring checks on
    /// vendor-internal tag names; the `-json` output is parsed for the
    /// individual fields. Video files additionally get duration, resolution
    /// and codec.
    pub fn batch_metadata(&self, path: &Path) -> BatchMetadata {
        if !self.exiftool_available {
            return BatchMetadata::default();
        }

        let p = path.to_string_lossy();
        let raw_output = self.run_lower(
            "exiftool",
            &[
                "-s",
                "-Make",
                "-Model",
                "-Software",
                "-CreatorTool",
                "-GPSLatitude",
                "-GPSLongitude",
                "-GPSPosition",
                p.as_ref(),
            ],
        );

        let json_output = self.run_raw(
            "exiftool",
            &[
                "-json",
                "-Make",
                "-Model",
                "-Software",
                "-CreatorTool",
                "-GPSLatitude",
                "-GPSLongitude",
                p.as_ref(),
            ],
        );

        let mut batch = match parse_exiftool_json(&json_output) {
            Some(mut parsed) => {
                parsed.raw_output = raw_output;
                parsed
            }
            None => {
                debug!("Batch metadata parse failed for {}", path.display());
                BatchMetadata {
                    raw_output,
                    ..BatchMetadata::default()
                }
            }
        };

        if is_video_extension(&get_file_extension(path)) {
            let (duration, resolution, codec) = self.video_metadata(path);
            batch.duration = duration;
            batch.resolution = resolution;
            batch.codec = codec;
        }

        batch
    }

    /// Extract (duration, resolution, codec) for a video file
    pub fn video_metadata(&self, path: &Path) -> (String, String, String) {
        let p = path.to_string_lossy();
        let mut duration = String::new();
        let mut resolution = String::new();
        let mut codec = String::new();

        if self.exiftool_available {
            duration = self.run_raw("exiftool", &["-s", "-s", "-s", "-Duration", p.as_ref()]);

            let width = self.run_raw("exiftool", &["-s", "-s", "-s", "-ImageWidth", p.as_ref()]);
            let height = self.run_raw("exiftool", &["-s", "-s", "-s", "-ImageHeight", p.as_ref()]);
            if !width.is_empty() && !height.is_empty() {
                resolution = format!("{}x{}", width, height);
            }

            // CompressorID first, then VideoCodec
            codec = self.run_raw("exiftool", &["-s", "-s", "-s", "-CompressorID", p.as_ref()]);
            if codec.is_empty() {
                codec = self.run_raw("exiftool", &["-s", "-s", "-s", "-VideoCodec", p.as_ref()]);
            }
        }

        if codec.is_empty() && self.mediainfo_available {
            codec = self.run_lower("mediainfo", &["--Inform=Video;%Format%", p.as_ref()]);
        }

        (duration, resolution, codec)
    }

    /// Check for GPS data using exiftool with an mdls fallback.
    ///
    /// Literal "(null)" responses from mdls count as absent.
    pub fn gps_present(&self, path: &Path) -> bool {
        let p = path.to_string_lossy();

        if self.exiftool_available {
            let gps_data = self.run_raw(
                "exiftool",
                &[
                    "-s",
                    "-s",
                    "-s",
                    "-GPSLatitude",
                    "-GPSLongitude",
                    "-GPSPosition",
                    p.as_ref(),
                ],
            );
            if !gps_data.is_empty() {
                return true;
            }
        }

        if self.mdls_available {
            let lat = self.run_raw("mdls", &["-name", "kMDItemLatitude", "-raw", p.as_ref()]);
            let lon = self.run_raw("mdls", &["-name", "kMDItemLongitude", "-raw", p.as_ref()]);

            if !lat.is_empty() && lat != "(null)" && !lon.is_empty() && lon != "(null)" {
                return true;
            }
        }

        false
    }

    /// Spotlight acquisition make/model, lower-cased, "(null)" filtered
    pub fn os_index_fields(&self, path: &Path) -> (String, String) {
        if !self.mdls_available {
            return (String::new(), String::new());
        }

        let p = path.to_string_lossy();
        let mut make = self.run_lower("mdls", &["-name", "kMDItemAcquisitionMake", "-raw", p.as_ref()]);
        let mut model =
            self.run_lower("mdls", &["-name", "kMDItemAcquisitionModel", "-raw", p.as_ref()]);

        if make == "(null)" {
            make.clear();
        }
        if model == "(null)" {
            model.clear();
        }

        (make, model)
    }

    /// Media-container (encoded application, model, encoder) fields
    pub fn container_fields(&self, path: &Path) -> (String, String, String) {
        if !self.mediainfo_available {
            return (String::new(), String::new(), String::new());
        }

        let p = path.to_string_lossy();
        let encoded_app = self.run_lower(
            "mediainfo",
            &["--Inform=General;%Encoded_Application%", p.as_ref()],
        );
        let model = self.run_lower("mediainfo", &["--Inform=General;%Model%", p.as_ref()]);
        let encoder = self.run_lower(
            "mediainfo",
            &["--Inform=Video;%Encoded_Library_Name%", p.as_ref()],
        );

        (encoded_app, model, encoder)
    }

    /// Check whether the file carries the Snapchat marker.
    ///
    /// Substring search across two independent tool dumps; first match wins.
    pub fn third_party_marker(&self, path: &Path) -> (bool, &'static str) {
        let p = path.to_string_lossy();

        if self.exiftool_available {
            let output = self.run_lower("exiftool", &["-a", "-G1", p.as_ref()]);
            if output.contains("snapchat") {
                return (true, "exiftool-snapchat");
            }
        }

        if self.mediainfo_available {
            let output = self.run_lower("mediainfo", &[p.as_ref()]);
            if output.contains("snapchat") {
                return (true, "mediainfo-snapchat");
            }
        }

        (false, "none")
    }
}

/// Parse exiftool `-json` output into a metadata bundle.
///
/// exiftool emits an array with one object per file; fields may be strings
/// or numbers.
fn parse_exiftool_json(json_output: &str) -> Option<BatchMetadata> {
    if json_output.is_empty() {
        return None;
    }

    let parsed: Value = serde_json::from_str(json_output).ok()?;
    let entry = parsed.as_array()?.first()?;

    Some(BatchMetadata {
        make: field_string(entry, "Make").to_lowercase(),
        model: field_string(entry, "Model").to_lowercase(),
        software: field_string(entry, "Software").to_lowercase(),
        creator_tool: field_string(entry, "CreatorTool").to_lowercase(),
        gps_latitude: field_string(entry, "GPSLatitude"),
        gps_longitude: field_string(entry, "GPSLongitude"),
        ..BatchMetadata::default()
    })
}

fn field_string(entry: &Value, key: &str) -> String {
    match entry.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use std::path::PathBuf;

    fn apple_exif_json() -> String {
        r#"[{"Make": "Apple", "Model": "iPhone 13 Pro", "Software": "iOS 16.2",
            "CreatorTool": "", "GPSLatitude": "51.5 N", "GPSLongitude": "0.1 W"}]"#
            .to_string()
    }

    #[test]
    fn test_batch_metadata_parses_and_lowercases() {
        let json = apple_exif_json();
        let runner = ScriptedRunner::new(&[
            (EXIF_RAW, "make: apple\nmodel: iphone 13 pro"),
            (EXIF_JSON, json.as_str()),
        ]);
        let extractor = MetadataExtractor::with_runner(runner, true, false, false);

        let batch = extractor.batch_metadata(&PathBuf::from("photo.jpg"));
        assert_eq!(batch.make, "apple");
        assert_eq!(batch.model, "iphone 13 pro");
        assert_eq!(batch.software, "ios 16.2");
        assert_eq!(batch.gps_latitude, "51.5 N");
        assert!(batch.has_gps());
        assert!(batch.raw_output.contains("apple"));
    }

    #[test]
    fn test_batch_metadata_empty_when_tool_missing() {
        let extractor = MetadataExtractor::disabled();
        let batch = extractor.batch_metadata(&PathBuf::from("photo.jpg"));
        assert!(batch.raw_output.is_empty());
        assert!(!batch.has_gps());
    }

    #[test]
    fn test_batch_metadata_keeps_raw_on_json_failure() {
        let runner = ScriptedRunner::new(&[(EXIF_RAW, "make: apple"), (EXIF_JSON, "not json")]);
        let extractor = MetadataExtractor::with_runner(runner, true, false, false);

        let batch = extractor.batch_metadata(&PathBuf::from("photo.jpg"));
        assert_eq!(batch.raw_output, "make: apple");
        assert!(batch.make.is_empty());
    }

    #[test]
    fn test_gps_present_mdls_null_is_absent() {
        // exiftool returns nothing; mdls answers "(null)" for both axes
        let runner = ScriptedRunner::new(&[
            (EXIF_GPS, ""),
            (MDLS_LAT, "(null)"),
            (MDLS_LON, "(null)"),
        ]);
        let extractor = MetadataExtractor::with_runner(runner, true, true, false);
        assert!(!extractor.gps_present(&PathBuf::from("photo.jpg")));
    }

    #[test]
    fn test_gps_present_mdls_fallback_hit() {
        let runner = ScriptedRunner::new(&[
            (EXIF_GPS, ""),
            (MDLS_LAT, "51.5074"),
            (MDLS_LON, "-0.1278"),
        ]);
        let extractor = MetadataExtractor::with_runner(runner, true, true, false);
        assert!(extractor.gps_present(&PathBuf::from("photo.jpg")));
    }

    #[test]
    fn test_gps_present_exiftool_hit() {
        let runner = ScriptedRunner::new(&[(EXIF_GPS, "51.5 N")]);
        let extractor = MetadataExtractor::with_runner(runner, true, false, false);
        assert!(extractor.gps_present(&PathBuf::from("photo.jpg")));
    }

    #[test]
    fn test_third_party_marker_prefers_exiftool() {
        let runner = ScriptedRunner::new(&[
            (EXIF_DUMP, "xmp-snapchat stuff"),
            (MI_DUMP, "snapchat inc"),
        ]);
        let extractor = MetadataExtractor::with_runner(runner, true, false, true);
        assert_eq!(
            extractor.third_party_marker(&PathBuf::from("clip.mp4")),
            (true, "exiftool-snapchat")
        );
    }

    #[test]
    fn test_third_party_marker_mediainfo_fallback() {
        let runner = ScriptedRunner::new(&[
            (EXIF_DUMP, "nothing interesting"),
            (MI_DUMP, "encoded by snapchat"),
        ]);
        let extractor = MetadataExtractor::with_runner(runner, true, false, true);
        assert_eq!(
            extractor.third_party_marker(&PathBuf::from("clip.mp4")),
            (true, "mediainfo-snapchat")
        );
    }

    #[test]
    fn test_missing_tools_reported() {
        let extractor = MetadataExtractor::disabled();
        assert_eq!(
            extractor.missing_tools(),
            vec!["exiftool", "mdls", "mediainfo"]
        );
    }
}
