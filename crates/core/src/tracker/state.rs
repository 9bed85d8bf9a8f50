//! Filesystem-backed processing state: discovery and move-to-processed.

use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, BufReader};
use tracing::{debug, info};

use crate::naming::{is_candidate_filename, CandidateName};

use super::TrackerError;

/// Name of the subdirectory holding published images.
pub const PROCESSED_DIR: &str = "processed";

const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// An image eligible for publishing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub filename: String,
    /// Parsed name; `None` when the filename does not follow the convention.
    pub name: Option<CandidateName>,
}

impl Candidate {
    pub fn timestamp(&self) -> Option<u64> {
        self.name.as_ref().map(|n| n.timestamp)
    }
}

/// Chronological order by the filename timestamp. Names without a timestamp
/// go last; ties break on the filename.
fn chronological(a: &Candidate, b: &Candidate) -> Ordering {
    match (a.timestamp(), b.timestamp()) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.filename.cmp(&b.filename)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.filename.cmp(&b.filename),
    }
}

/// Tracks which images in a directory have been published.
#[derive(Debug, Clone)]
pub struct ProcessingTracker {
    dir: PathBuf,
    processed_dir: PathBuf,
    marker: String,
}

impl ProcessingTracker {
    pub fn new(dir: impl Into<PathBuf>, marker: impl Into<String>) -> Self {
        let dir = dir.into();
        let processed_dir = dir.join(PROCESSED_DIR);
        Self {
            dir,
            processed_dir,
            marker: marker.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn processed_dir(&self) -> &Path {
        &self.processed_dir
    }

    async fn ensure_processed_dir(&self) -> Result<(), TrackerError> {
        fs::create_dir_all(&self.processed_dir)
            .await
            .map_err(|source| TrackerError::DirectoryCreationFailed {
                path: self.processed_dir.clone(),
                source,
            })
    }

    /// Whether a same-named file already exists under processed/.
    pub async fn is_processed(&self, filename: &str) -> Result<bool, TrackerError> {
        let path = self.processed_dir.join(filename);
        fs::try_exists(&path)
            .await
            .map_err(|source| TrackerError::ReadFailed { path, source })
    }

    /// List unpublished images in chronological order.
    ///
    /// Creates processed/ if it is missing.
    pub async fn discover(&self) -> Result<Vec<Candidate>, TrackerError> {
        self.ensure_processed_dir().await?;

        let read_dir_err = |source| TrackerError::ReadDir {
            path: self.dir.clone(),
            source,
        };
        let mut entries = fs::read_dir(&self.dir).await.map_err(read_dir_err)?;

        let mut candidates = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(read_dir_err)? {
            let Ok(filename) = entry.file_name().into_string() else {
                continue;
            };
            if !is_candidate_filename(&filename, &self.marker) {
                continue;
            }
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }
            if self.is_processed(&filename).await? {
                debug!(filename = %filename, "Skipping already processed image");
                continue;
            }

            let name = CandidateName::parse(&filename, &self.marker).ok();
            candidates.push(Candidate {
                path: entry.path(),
                filename,
                name,
            });
        }

        candidates.sort_by(chronological);
        Ok(candidates)
    }

    /// Move an image into processed/. Must only run after publish succeeded.
    pub async fn mark_processed(&self, path: &Path) -> Result<PathBuf, TrackerError> {
        let filename = path
            .file_name()
            .filter(|_| path.parent() == Some(self.dir.as_path()))
            .ok_or_else(|| TrackerError::NotTracked {
                path: path.to_path_buf(),
            })?;

        self.ensure_processed_dir().await?;
        let destination = self.processed_dir.join(filename);

        fs::rename(path, &destination)
            .await
            .map_err(|error| TrackerError::MoveFailed {
                source_path: path.to_path_buf(),
                destination: destination.clone(),
                error,
            })?;

        info!(destination = %destination.display(), "Marked as processed");
        Ok(destination)
    }
}

/// sha256 of a file's bytes, hex encoded.
pub async fn file_sha256(path: &Path) -> Result<String, TrackerError> {
    let read_err = |source| TrackerError::ReadFailed {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).await.map_err(read_err)?;
    let mut reader = BufReader::with_capacity(HASH_BUFFER_SIZE, file);
    let mut buffer = vec![0u8; HASH_BUFFER_SIZE];
    let mut hasher = Sha256::new();

    loop {
        let bytes_read = reader.read(&mut buffer).await.map_err(read_err)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, name.as_bytes()).unwrap();
        path
    }

    #[tokio::test]
    async fn test_discover_filters_and_creates_processed_dir() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "dalle_a_lonely_robot_vivid_1700000000.png");
        touch(dir.path(), "dalle_notes.txt");
        touch(dir.path(), "holiday.jpg");
        std::fs::create_dir(dir.path().join("dalle_folder_vivid_1.png")).unwrap();

        let tracker = ProcessingTracker::new(dir.path(), "dalle");
        let candidates = tracker.discover().await.unwrap();

        assert!(dir.path().join(PROCESSED_DIR).is_dir());
        assert_eq!(candidates.len(), 1);
        assert_eq!(
            candidates[0].filename,
            "dalle_a_lonely_robot_vivid_1700000000.png"
        );
        assert_eq!(candidates[0].name.as_ref().unwrap().style, "vivid");
    }

    #[tokio::test]
    async fn test_discover_excludes_processed_names() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "dalle_a_lonely_robot_vivid_1700000000.png");
        std::fs::create_dir(dir.path().join(PROCESSED_DIR)).unwrap();
        touch(
            &dir.path().join(PROCESSED_DIR),
            "dalle_old_one_natural_1600000000.png",
        );
        // Same name in both places: already handled.
        touch(dir.path(), "dalle_dup_vivid_1650000000.png");
        touch(&dir.path().join(PROCESSED_DIR), "dalle_dup_vivid_1650000000.png");

        let tracker = ProcessingTracker::new(dir.path(), "dalle");
        let names: Vec<String> = tracker
            .discover()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.filename)
            .collect();

        assert_eq!(names, vec!["dalle_a_lonely_robot_vivid_1700000000.png"]);
    }

    #[tokio::test]
    async fn test_discover_orders_by_timestamp_not_name() {
        let dir = TempDir::new().unwrap();
        // Lexicographic order would put "a_much_longer" first.
        touch(dir.path(), "dalle_a_much_longer_prompt_vivid_1700000500.png");
        touch(dir.path(), "dalle_b_vivid_1700000100.png");
        touch(dir.path(), "dalle_broken.png");

        let tracker = ProcessingTracker::new(dir.path(), "dalle");
        let names: Vec<String> = tracker
            .discover()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.filename)
            .collect();

        assert_eq!(
            names,
            vec![
                "dalle_b_vivid_1700000100.png",
                "dalle_a_much_longer_prompt_vivid_1700000500.png",
                "dalle_broken.png",
            ]
        );
    }

    #[tokio::test]
    async fn test_discover_on_plain_file_fails() {
        let dir = TempDir::new().unwrap();
        let file = touch(dir.path(), "not-a-directory");

        let tracker = ProcessingTracker::new(&file, "dalle");
        assert!(tracker.discover().await.is_err());
    }

    #[tokio::test]
    async fn test_is_processed_reports_io_errors() {
        let dir = TempDir::new().unwrap();
        // processed/ exists as a plain file, so looking inside it fails.
        touch(dir.path(), PROCESSED_DIR);

        let tracker = ProcessingTracker::new(dir.path(), "dalle");
        let err = tracker
            .is_processed("dalle_a_b_vivid_1.png")
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::ReadFailed { .. }));
    }

    #[tokio::test]
    async fn test_mark_processed_moves_file() {
        let dir = TempDir::new().unwrap();
        let path = touch(dir.path(), "dalle_a_b_vivid_1.png");

        let tracker = ProcessingTracker::new(dir.path(), "dalle");
        let destination = tracker.mark_processed(&path).await.unwrap();

        assert!(!path.exists());
        assert_eq!(
            destination,
            dir.path().join(PROCESSED_DIR).join("dalle_a_b_vivid_1.png")
        );
        assert!(destination.exists());
        assert!(tracker.is_processed("dalle_a_b_vivid_1.png").await.unwrap());
    }

    #[tokio::test]
    async fn test_mark_processed_rejects_foreign_path() {
        let dir = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        let path = touch(other.path(), "dalle_a_b_vivid_1.png");

        let tracker = ProcessingTracker::new(dir.path(), "dalle");
        let err = tracker.mark_processed(&path).await.unwrap_err();
        assert!(matches!(err, TrackerError::NotTracked { .. }));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_mark_processed_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let tracker = ProcessingTracker::new(dir.path(), "dalle");
        let err = tracker
            .mark_processed(&dir.path().join("dalle_gone_vivid_1.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::MoveFailed { .. }));
    }

    #[tokio::test]
    async fn test_file_sha256() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("abc.png");
        std::fs::write(&path, b"abc").unwrap();

        assert_eq!(
            file_sha256(&path).await.unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
