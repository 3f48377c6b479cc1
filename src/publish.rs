//! Serialize and atomically publish a snapshot
//!
//! The document is written to a temporary file in the target directory,
//! flushed to disk, then renamed over the published file. Readers see
//! either the previous document or the new one, never a partial write.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};

use crate::Result;
use crate::error::CollectorError;
use crate::models::WeatherSnapshot;

/// Canonical JSON bytes for a snapshot: object keys sorted, two-space
/// indentation, trailing newline. Identical snapshots give identical bytes.
pub fn to_canonical_json(snapshot: &WeatherSnapshot) -> Result<Vec<u8>> {
    // Round-tripping through Value sorts every object's keys
    let value = serde_json::to_value(snapshot)?;
    let mut bytes = serde_json::to_vec_pretty(&value)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// A fully written, not yet visible snapshot
#[derive(Debug)]
pub struct StagedSnapshot {
    file: NamedTempFile,
    target: PathBuf,
}

impl StagedSnapshot {
    /// Where the snapshot becomes visible on commit
    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Atomically replace the target with the staged document
    pub fn commit(self) -> Result<PathBuf> {
        let Self { file, target } = self;
        file.persist(&target)
            .map_err(|e| CollectorError::write(&target, e.error))?;
        sync_parent(&target);
        Ok(target)
    }
}

/// Serialize `snapshot` and write it next to `target` without touching
/// `target` itself. Dropping the result discards the staged file.
#[instrument(skip(snapshot), fields(target = %target.display()))]
pub fn stage(snapshot: &WeatherSnapshot, target: &Path) -> Result<StagedSnapshot> {
    let bytes = to_canonical_json(snapshot)?;
    let dir = parent_dir(target);

    let mut file = NamedTempFile::new_in(dir).map_err(|e| CollectorError::write(target, e))?;
    file.write_all(&bytes)
        .and_then(|()| file.as_file().sync_all())
        .map_err(|e| CollectorError::write(target, e))?;

    debug!(bytes = bytes.len(), staged = %file.path().display(), "snapshot staged");

    Ok(StagedSnapshot {
        file,
        target: target.to_path_buf(),
    })
}

/// Serialize and atomically publish `snapshot` at `target`
pub fn publish(snapshot: &WeatherSnapshot, target: &Path) -> Result<PathBuf> {
    let published = stage(snapshot, target)?.commit()?;
    info!(path = %published.display(), "snapshot published");
    Ok(published)
}

fn parent_dir(target: &Path) -> &Path {
    match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Make the rename itself durable where the platform allows it
fn sync_parent(target: &Path) {
    if let Ok(dir) = fs::File::open(parent_dir(target)) {
        if let Err(e) = dir.sync_all() {
            debug!("could not sync {}: {e}", parent_dir(target).display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::{FragmentSet, merge};
    use crate::models::Location;
    use chrono::{TimeZone, Utc};

    fn snapshot() -> WeatherSnapshot {
        merge(
            &FragmentSet::default(),
            &Location::new(42.5014, -70.875, "Wyman Cove".to_string()),
            chrono_tz::America::New_York,
            Utc.with_ymd_and_hms(2024, 1, 15, 17, 45, 0).unwrap(),
        )
    }

    #[test]
    fn test_canonical_json_sorted_and_stable() {
        let bytes = to_canonical_json(&snapshot()).unwrap();
        assert_eq!(bytes, to_canonical_json(&snapshot()).unwrap());
        assert_eq!(bytes.last(), Some(&b'\n'));

        let text = String::from_utf8(bytes).unwrap();
        let alerts = text.find("\"alerts\"").unwrap();
        let astronomy = text.find("\"astronomy\"").unwrap();
        let tides = text.find("\"tides\"").unwrap();
        assert!(alerts < astronomy && astronomy < tides);
    }

    #[test]
    fn test_round_trip() {
        let original = snapshot();
        let bytes = to_canonical_json(&original).unwrap();
        let decoded: WeatherSnapshot = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_publish_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("weather_data.json");
        fs::write(&target, "{\"old\": true}\n").unwrap();

        let published = publish(&snapshot(), &target).unwrap();
        assert_eq!(published, target);

        let written: WeatherSnapshot =
            serde_json::from_str(&fs::read_to_string(&target).unwrap()).unwrap();
        assert_eq!(written, snapshot());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_interrupted_publish_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("weather_data.json");
        let previous = to_canonical_json(&snapshot()).unwrap();
        fs::write(&target, &previous).unwrap();

        let mut newer = snapshot();
        newer.generated_at = Utc.with_ymd_and_hms(2024, 1, 15, 18, 0, 0).unwrap();
        let staged = stage(&newer, &target).unwrap();
        assert_eq!(staged.target(), target.as_path());
        assert_eq!(fs::read(&target).unwrap(), previous);

        // Interrupted before the rename
        drop(staged);

        assert_eq!(fs::read(&target).unwrap(), previous);
        let still_valid: WeatherSnapshot = serde_json::from_slice(&previous).unwrap();
        assert_eq!(still_valid.generated_at, snapshot().generated_at);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_missing_directory_is_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("missing").join("weather_data.json");

        let error = publish(&snapshot(), &target).unwrap_err();
        assert!(matches!(error, CollectorError::Write { .. }));
        assert!(error.is_fatal());
        assert!(!target.exists());
    }

    #[test]
    fn test_parent_dir_of_bare_file_name() {
        assert_eq!(parent_dir(Path::new("weather_data.json")), Path::new("."));
        assert_eq!(parent_dir(Path::new("out/weather_data.json")), Path::new("out"));
    }
}
