//! Archive handling for shard snapshots
//!
//! Every shard snapshot travels as one gzip-compressed tar archive holding a
//! single top-level `snapshot.<name>` directory. Compression and extraction
//! run on the blocking thread pool.

pub mod transfer;

pub use transfer::{ArchiveTransferWorker, RestoreStage, ShardSnapshot, TransferRetry};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tar::{Archive, Builder};

/// Packs `<base_dir>/<dir_name>` into `archive_path`, keeping `dir_name` as
/// the only top-level entry.
pub async fn compress_directory(
    archive_path: &Path,
    base_dir: &Path,
    dir_name: &str,
) -> Result<(), String> {
    let archive_path = archive_path.to_path_buf();
    let source: PathBuf = base_dir.join(dir_name);
    let dir_name = dir_name.to_string();

    tokio::task::spawn_blocking(move || {
        if !source.is_dir() {
            return Err(format!("snapshot directory [{}] does not exist", source.display()));
        }

        let file = File::create(&archive_path)
            .map_err(|e| format!("create [{}] failed: {}", archive_path.display(), e))?;
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = Builder::new(encoder);
        builder
            .append_dir_all(&dir_name, &source)
            .map_err(|e| format!("tar append failed: {}", e))?;

        let encoder = builder
            .into_inner()
            .map_err(|e| format!("tar finalize failed: {}", e))?;
        let mut file = encoder
            .finish()
            .map_err(|e| format!("gzip finish failed: {}", e))?;
        file.flush().map_err(|e| format!("gzip flush failed: {}", e))
    })
    .await
    .map_err(|e| format!("compression task panicked: {}", e))?
}

/// Unpacks a gzip tar archive into `destination`.
pub async fn extract_archive(archive_path: &Path, destination: &Path) -> Result<(), String> {
    let archive_path = archive_path.to_path_buf();
    let destination = destination.to_path_buf();

    tokio::task::spawn_blocking(move || {
        let file = File::open(&archive_path)
            .map_err(|e| format!("open [{}] failed: {}", archive_path.display(), e))?;
        let mut archive = Archive::new(GzDecoder::new(file));
        archive
            .unpack(&destination)
            .map_err(|e| format!("unpack into [{}] failed: {}", destination.display(), e))
    })
    .await
    .map_err(|e| format!("extraction task panicked: {}", e))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_archive_contains_single_top_level_directory() {
        let work = TempDir::new().unwrap();
        let snapshot = work.path().join("snapshot.books_shard1");
        fs::create_dir_all(snapshot.join("index")).unwrap();
        fs::write(snapshot.join("index/segments_1"), b"segments").unwrap();

        let archive_path = work.path().join("backup_202401011200_books_shard1.tar.gz");
        compress_directory(&archive_path, work.path(), "snapshot.books_shard1")
            .await
            .unwrap();

        let restore = TempDir::new().unwrap();
        extract_archive(&archive_path, restore.path()).await.unwrap();

        let entries: Vec<_> = fs::read_dir(restore.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec!["snapshot.books_shard1"]);
        assert_eq!(
            fs::read(restore.path().join("snapshot.books_shard1/index/segments_1")).unwrap(),
            b"segments"
        );
    }

    #[tokio::test]
    async fn test_compress_fails_for_missing_directory() {
        let work = TempDir::new().unwrap();
        let archive_path = work.path().join("missing.tar.gz");
        let err = compress_directory(&archive_path, work.path(), "snapshot.missing")
            .await
            .unwrap_err();
        assert!(err.contains("does not exist"));
        assert!(!archive_path.exists());
    }
}
