//! Shared test fixtures: a scripted command runner standing in for the
//! external inspection tools.

use std::collections::HashMap;
use std::sync::Arc;

use crate::tools::CommandRunner;

// Call-site keys as produced by ScriptedRunner::key_for
pub const EXIF_RAW: &str =
    "exiftool -s -Make -Model -Software -CreatorTool -GPSLatitude -GPSLongitude -GPSPosition";
pub const EXIF_JSON: &str =
    "exiftool -json -Make -Model -Software -CreatorTool -GPSLatitude -GPSLongitude";
pub const EXIF_GPS: &str = "exiftool -s -s -s -GPSLatitude -GPSLongitude -GPSPosition";
pub const EXIF_DUMP: &str = "exiftool -a -G1";
pub const EXIF_DURATION: &str = "exiftool -s -s -s -Duration";
pub const MDLS_LAT: &str = "mdls -name kMDItemLatitude -raw";
pub const MDLS_LON: &str = "mdls -name kMDItemLongitude -raw";
pub const MDLS_MAKE: &str = "mdls -name kMDItemAcquisitionMake -raw";
pub const MDLS_MODEL: &str = "mdls -name kMDItemAcquisitionModel -raw";
pub const MI_APP: &str = "mediainfo --Inform=General;%Encoded_Application%";
pub const MI_MODEL: &str = "mediainfo --Inform=General;%Model%";
pub const MI_ENCODER: &str = "mediainfo --Inform=Video;%Encoded_Library_Name%";
pub const MI_DUMP: &str = "mediainfo";

/// Deterministic fake tool runner, keyed on the call site (program plus all
/// arguments except the trailing path). Unscripted calls return `None`,
/// which the facade treats as tool failure.
pub struct ScriptedRunner {
    responses: HashMap<String, String>,
}

impl ScriptedRunner {
    pub fn new(entries: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(Self {
            responses: entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        })
    }

    fn key_for(program: &str, args: &[&str]) -> String {
        if args.len() <= 1 {
            program.to_string()
        } else {
            format!("{} {}", program, args[..args.len() - 1].join(" "))
        }
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[&str]) -> Option<String> {
        self.responses.get(&Self::key_for(program, args)).cloned()
    }
}
