//! File-based data source.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use sensorwatch_types::Snapshot;

use super::DataSource;

/// Reads snapshots from a JSON file, re-reading it whenever its
/// modification time advances.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    description: String,
    last_error: Option<String>,
    last_modified: Option<SystemTime>,
}

impl FileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let description = format!("file: {}", path.display());
        Self {
            path,
            description,
            last_error: None,
            last_modified: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the file regardless of its modification time.
    pub fn read(&mut self) -> Option<Snapshot> {
        let result = fs::read_to_string(&self.path)
            .map_err(|e| format!("Read error: {}", e))
            .and_then(|content| {
                serde_json::from_str::<Snapshot>(&content).map_err(|e| format!("Parse error: {}", e))
            });

        match result {
            Ok(snapshot) => {
                self.last_error = None;
                Some(snapshot)
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to load snapshot");
                self.last_error = Some(e);
                None
            }
        }
    }

    fn modified_time(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).ok()?.modified().ok()
    }
}

impl DataSource for FileSource {
    fn poll(&mut self) -> Option<Snapshot> {
        let current_modified = self.modified_time();

        let file_changed = match (&self.last_modified, &current_modified) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(last), Some(current)) => current > last,
        };

        if !file_changed {
            return None;
        }

        let snapshot = self.read()?;
        self.last_modified = current_modified;
        Some(snapshot)
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sample_json() -> &'static str {
        r#"{
            "now": "2024-05-01T12:00:00Z",
            "latestValues": { "1301": 0.0, "1302": 12.5 },
            "lastBySeries": {
                "1301": { "voltage": "2024-05-01T11:40:00Z", "co2": null }
            }
        }"#
    }

    #[test]
    fn test_file_source_new() {
        let source = FileSource::new("/tmp/snapshot.json");
        assert_eq!(source.path(), Path::new("/tmp/snapshot.json"));
        assert_eq!(source.description(), "file: /tmp/snapshot.json");
        assert!(source.error().is_none());
    }

    #[test]
    fn test_file_source_poll_reads_file_once() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", sample_json()).unwrap();

        let mut source = FileSource::new(file.path());

        let snapshot = source.poll().unwrap();
        assert_eq!(snapshot.latest("1301"), Some(0.0));
        assert_eq!(snapshot.latest("1302"), Some(12.5));
        assert_eq!(snapshot.series_count(), 2);

        // Unchanged file yields nothing new
        assert!(source.poll().is_none());

        // An explicit read ignores the mtime
        assert!(source.read().is_some());
    }

    #[test]
    fn test_file_source_missing_file() {
        let mut source = FileSource::new("/nonexistent/path/snapshot.json");

        assert!(source.poll().is_none());
        assert!(source.error().unwrap().contains("Read error"));
    }

    #[test]
    fn test_file_source_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid json").unwrap();

        let mut source = FileSource::new(file.path());

        assert!(source.poll().is_none());
        assert!(source.error().unwrap().contains("Parse error"));
    }

    #[test]
    fn test_file_source_recovers_after_fix() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{{ broken").unwrap();

        let mut source = FileSource::new(file.path());
        assert!(source.poll().is_none());
        assert!(source.error().is_some());

        std::fs::write(file.path(), sample_json()).unwrap();
        // A failed read never records the mtime, so the next poll retries.
        assert!(source.poll().is_some());
        assert!(source.error().is_none());
    }
}
