//! Files and console text produced after a run.
//!
//! # Submodules
//!
//! - [`json`]: Writes the run manifest for machine consumption
//! - [`markdown`]: Renders show notes (sources plus script)
//! - [`report`]: Renders the console report
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── 2025-05-06_morning.mp3   # Audio
//! ├── 2025-05-06_morning.json  # Run manifest
//! └── 2025-05-06_morning.md    # Show notes
//! ```
//!
//! Regenerating the same edition overwrites all three.

pub mod json;
pub mod markdown;
pub mod report;

use std::path::{Path, PathBuf};

/// Where the files of one run go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub audio: PathBuf,
    pub manifest: PathBuf,
    pub notes: PathBuf,
}

impl OutputPaths {
    /// `{dir}/{date}_{edition}.mp3` and its siblings.
    pub fn for_edition(dir: &Path, date: &str, edition: &str) -> Self {
        Self::beside(dir.join(format!("{}_{}.mp3", date, edition)))
    }

    /// Manifest and notes next to an explicit audio path, sharing its stem.
    pub fn beside(audio: PathBuf) -> Self {
        Self {
            manifest: audio.with_extension("json"),
            notes: audio.with_extension("md"),
            audio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edition_paths() {
        let paths = OutputPaths::for_edition(Path::new("/tmp/out"), "2025-05-06", "morning");
        assert_eq!(paths.audio, PathBuf::from("/tmp/out/2025-05-06_morning.mp3"));
        assert_eq!(paths.manifest, PathBuf::from("/tmp/out/2025-05-06_morning.json"));
        assert_eq!(paths.notes, PathBuf::from("/tmp/out/2025-05-06_morning.md"));
    }

    #[test]
    fn test_paths_beside_custom_audio() {
        let paths = OutputPaths::beside(PathBuf::from("briefing.mp3"));
        assert_eq!(paths.manifest, PathBuf::from("briefing.json"));
        assert_eq!(paths.notes, PathBuf::from("briefing.md"));
    }
}
