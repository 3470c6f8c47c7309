//! Apple device detection via layered confidence scoring.
//!
//! Eight layers are evaluated in a fixed order and their points accumulate;
//! later layers never short-circuit earlier ones. 80 points or more counts
//! as a confirmed Apple origin.
//!
//! - Layer 1: HEIC/HEIF extension, 100 points (instant win)
//! - Layer 2: Make contains "apple", 90 points
//! - Layer 3: Model iPhone/iPad/iPod, 85 points (first match wins)
//! - Layer 4: Software/CreatorTool mentions iOS, 70 points
//! - Layer 5: iOS version pattern 60 points, Apple-internal tags 50 points
//! - Layer 6: Spotlight make 75 points, model 70 points
//! - Layer 7: mediainfo app/model 65, device 60, encoder 55 points
//! - Layer 8: GPS 40 points, plus IMG_XXXX filename 30 points

use log::error;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::metadata::MetadataExtractor;
use crate::types::{get_file_extension, DetectionResult, Destination};

/// Confidence threshold for a confirmed Apple device
pub const APPLE_THRESHOLD: i32 = 80;

static VERSION_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+\.\d+)").unwrap());
static IMG_FILENAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^IMG_\d{4}\.").unwrap());

/// Layered confidence scorer for Apple device origin.
pub struct AppleDetector {
    extractor: Arc<MetadataExtractor>,
}

impl AppleDetector {
    pub fn new(extractor: Arc<MetadataExtractor>) -> Self {
        Self { extractor }
    }

    /// Detect whether the file originated from an Apple device.
    ///
    /// Never fails: an unexpected internal error is converted to a
    /// zero-confidence non-match tagged "error".
    pub fn detect(&self, path: &Path) -> DetectionResult {
        match self.detect_inner(path) {
            Ok(result) => result,
            Err(e) => {
                error!("Apple detection failed for {}: {}", path.display(), e);
                DetectionResult::error()
            }
        }
    }

    fn detect_inner(&self, path: &Path) -> Result<DetectionResult> {
        let filename = path
            .file_name()
            .ok_or_else(|| Error::Unknown(format!("path has no filename: {}", path.display())))?
            .to_string_lossy()
            .into_owned();
        let ext = get_file_extension(path);

        let mut score = 0i32;
        let mut methods: Vec<&'static str> = Vec::new();
        let mut add = |points: i32, method: &'static str| {
            score += points;
            methods.push(method);
        };

        // Layer 1: HEIC is an Apple-only format
        if ext == "heic" || ext == "heif" {
            add(100, "heic-extension");
        }

        // Layers 2-5: exiftool metadata, only meaningful when the tool
        // produced output for this file
        let batch = self.extractor.batch_metadata(path);

        if !batch.raw_output.is_empty() {
            // Layer 2: Make = Apple
            if batch.make.contains("apple") {
                add(90, "exiftool-make");
            }

            // Layer 3: Model, three mutually exclusive device classes
            if batch.model.contains("iphone") {
                add(85, "exiftool-iphone-model");
            } else if batch.model.contains("ipad") {
                add(85, "exiftool-ipad-model");
            } else if batch.model.contains("ipod") {
                add(85, "exiftool-ipod-model");
            }

            // Layer 4: Software mentions iOS
            if batch.software.contains("ios") || batch.creator_tool.contains("ios") {
                add(70, "exiftool-software-ios");
            }

            // Layer 5a: a version token in the plausible iOS range, first
            // hit across software then creator-tool, never double counted
            for field in [&batch.software, &batch.creator_tool] {
                if let Some(captures) = VERSION_TOKEN.captures(field) {
                    if let Ok(version) = captures[1].parse::<f32>() {
                        if (7.0..=20.0).contains(&version) {
                            add(60, "exiftool-ios-version");
                            break;
                        }
                    }
                }
            }

            // Layer 5b: Apple-internal tag names in the raw dump
            if batch.raw_output.contains("applemodelid") || batch.raw_output.contains("runtime") {
                add(50, "exiftool-apple-tags");
            }
        }

        // Layer 6: Spotlight index, independent of layers 2-3
        let (mdls_make, mdls_model) = self.extractor.os_index_fields(path);

        if mdls_make.contains("apple") {
            add(75, "mdls-make");
        }
        if ["iphone", "ipad", "ipod"]
            .iter()
            .any(|d| mdls_model.contains(d))
        {
            add(70, "mdls-model");
        }

        // Layer 7: media-container inspector, run on every file so scores
        // do not depend on the extension
        let (mi_app, mi_model, mi_encoder) = self.extractor.container_fields(path);

        if mi_app.contains("apple") || mi_model.contains("apple") {
            add(65, "mediainfo-make-model");
        }
        if ["iphone", "ipad"].iter().any(|d| mi_model.contains(d)) {
            add(60, "mediainfo-device");
        }
        if mi_encoder.contains("apple") {
            add(55, "mediainfo-encoder");
        }

        // Layer 8: GPS presence, correlated with the IMG_XXXX naming scheme
        let has_gps = self.extractor.gps_present(path);

        if has_gps {
            add(40, "gps-data");
            if IMG_FILENAME.is_match(&filename) {
                add(30, "gps-img-pattern");
            }
        }

        let detection_method = if methods.is_empty() {
            "none".to_string()
        } else {
            methods.join(",")
        };

        Ok(DetectionResult {
            is_apple: score >= APPLE_THRESHOLD,
            confidence_score: score,
            methods,
            destination: Destination::NoMetadata,
            detection_method,
            video_duration: if batch.duration.is_empty() {
                None
            } else {
                Some(batch.duration.clone())
            },
            has_gps,
        })
    }
}
