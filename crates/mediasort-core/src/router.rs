//! Priority-based destination routing.
//!
//! Four priorities, first match wins, no backtracking:
//! 1. Snapchat marker (overrides everything)
//! 2. PNG extension -> Screenshots
//! 3. Apple device match -> iPhone subfolders by extension
//! 4. Non-Apple fallback by extension

use std::path::Path;
use std::sync::Arc;

use crate::detector::AppleDetector;
use crate::metadata::MetadataExtractor;
use crate::types::{get_file_extension, Destination};

/// Stateless routing decision: a pure function of the extension, the
/// classifier result and the third-party marker.
pub struct DestinationRouter {
    extractor: Arc<MetadataExtractor>,
    detector: AppleDetector,
}

impl DestinationRouter {
    pub fn new(extractor: Arc<MetadataExtractor>) -> Self {
        let detector = AppleDetector::new(Arc::clone(&extractor));
        Self {
            extractor,
            detector,
        }
    }

    /// Determine the destination folder for a file, along with the
    /// detection method that decided it.
    pub fn determine_destination(&self, path: &Path) -> (Destination, String) {
        let ext = get_file_extension(path);

        // Priority 1: Snapchat origin overrides all other evidence
        let (is_snapchat, snap_method) = self.extractor.third_party_marker(path);
        if is_snapchat {
            return (Destination::Snapchat, snap_method.to_string());
        }

        // Priority 2: every PNG is treated as a screenshot
        if ext == "png" {
            return (Destination::Screenshots, "png-extension".to_string());
        }

        // Priority 3: Apple device detection
        let detection = self.detector.detect(path);

        if detection.is_apple {
            if ext == "heic" || ext == "heif" {
                // On-device screenshots never carry GPS; reuse the flag the
                // detector already established instead of re-querying
                if detection.has_gps {
                    return (Destination::IphonePhotos, detection.detection_method);
                }
                return (Destination::IphoneScreenshots, detection.detection_method);
            }

            if matches!(ext.as_str(), "mov" | "mp4" | "m4v") {
                return (Destination::IphoneVideos, detection.detection_method);
            }

            if ext == "jpg" || ext == "jpeg" {
                return (Destination::IphonePhotos, detection.detection_method);
            }

            return (Destination::IphonePhotos, detection.detection_method);
        }

        // Priority 4: non-Apple fallback by extension
        if ext == "jpg" || ext == "jpeg" {
            return (Destination::Jpeg, "non-apple-jpeg".to_string());
        }

        if matches!(ext.as_str(), "mp4" | "mov" | "m4v") {
            return (Destination::Mp4, "non-apple-video".to_string());
        }

        (Destination::NonApple, "no-apple-metadata".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use std::path::PathBuf;

    fn disabled_router() -> DestinationRouter {
        DestinationRouter::new(Arc::new(MetadataExtractor::disabled()))
    }

    fn router_with(entries: &[(&str, &str)]) -> DestinationRouter {
        let runner = ScriptedRunner::new(entries);
        DestinationRouter::new(Arc::new(MetadataExtractor::with_runner(
            runner, true, true, true,
        )))
    }

    #[test]
    fn test_snapchat_beats_full_apple_score() {
        // HEIC alone scores 100, but the marker has priority
        let router = router_with(&[(EXIF_DUMP, "xmp-snapchat")]);
        let (dest, method) = router.determine_destination(&PathBuf::from("IMG_0001.HEIC"));
        assert_eq!(dest, Destination::Snapchat);
        assert_eq!(method, "exiftool-snapchat");
    }

    #[test]
    fn test_png_always_screenshots() {
        let router = disabled_router();
        let (dest, method) = router.determine_destination(&PathBuf::from("photo.png"));
        assert_eq!(dest, Destination::Screenshots);
        assert_eq!(method, "png-extension");
    }

    #[test]
    fn test_heic_without_gps_is_screenshot() {
        let router = disabled_router();
        let (dest, _) = router.determine_destination(&PathBuf::from("IMG_0001.HEIC"));
        assert_eq!(dest, Destination::IphoneScreenshots);
    }

    #[test]
    fn test_heic_with_gps_is_photo() {
        let router = router_with(&[(EXIF_GPS, "51.5 N")]);
        let (dest, _) = router.determine_destination(&PathBuf::from("IMG_0001.HEIC"));
        assert_eq!(dest, Destination::IphonePhotos);
    }

    #[test]
    fn test_apple_video_routes_to_videos() {
        let runner_json = r#"[{"Make": "Apple", "Model": "iPhone 13"}]"#;
        let router = router_with(&[
            (EXIF_RAW, "make: apple\nmodel: iphone 13"),
            (EXIF_JSON, runner_json),
        ]);
        let (dest, _) = router.determine_destination(&PathBuf::from("clip.mov"));
        assert_eq!(dest, Destination::IphoneVideos);
    }

    #[test]
    fn test_non_apple_jpeg_fallback() {
        let router = disabled_router();
        let (dest, method) = router.determine_destination(&PathBuf::from("holiday.jpg"));
        assert_eq!(dest, Destination::Jpeg);
        assert_eq!(method, "non-apple-jpeg");
    }

    #[test]
    fn test_non_apple_video_fallback() {
        let router = disabled_router();
        let (dest, method) = router.determine_destination(&PathBuf::from("clip.mp4"));
        assert_eq!(dest, Destination::Mp4);
        assert_eq!(method, "non-apple-video");
    }

    #[test]
    fn test_unknown_extension_fallback() {
        let router = disabled_router();
        let (dest, method) = router.determine_destination(&PathBuf::from("document.dat"));
        assert_eq!(dest, Destination::NonApple);
        assert_eq!(method, "no-apple-metadata");
    }
}
