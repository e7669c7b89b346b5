use crate::utils::error::ClassifierError;
use crate::Result;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;

/// Delete regular files in `dir` whose modification time is at least `max_age` ago.
///
/// Returns the number of files removed. Entries that cannot be inspected or
/// removed are logged and skipped; only an unreadable directory is an error.
pub async fn prune_uploads(dir: &Path, max_age: Duration) -> Result<usize> {
    let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
        ClassifierError::Internal(format!("Failed to read upload directory {}: {}", dir.display(), e))
    })?;

    let now = SystemTime::now();
    let mut removed = 0;

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Failed to read upload entry in {}: {}", dir.display(), e);
                break;
            }
        };

        let path = entry.path();
        let metadata = match entry.metadata().await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!("Failed to stat {}: {}", path.display(), e);
                continue;
            }
        };

        // a modification time in the future counts as brand new
        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or(Duration::ZERO);
        if age < max_age {
            continue;
        }

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!("Removed expired upload {}", path.display());
                removed += 1;
            }
            Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
        }
    }

    Ok(removed)
}

/// Periodically prune `dir` for the lifetime of the server.
pub fn spawn_upload_sweeper(dir: PathBuf, max_age: Duration, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match prune_uploads(&dir, max_age).await {
                Ok(0) => {}
                Ok(removed) => tracing::info!("Removed {} expired uploads from {}", removed, dir.display()),
                Err(e) => tracing::warn!("Upload sweep failed: {}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_prune_removes_expired_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a_cat.png"), b"x").unwrap();
        std::fs::write(dir.path().join("b_dog.jpg"), b"y").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let removed = prune_uploads(dir.path(), Duration::ZERO).await.unwrap();

        assert_eq!(removed, 2);
        let left: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(left.len(), 1);
        assert!(dir.path().join("nested").is_dir());
    }

    #[tokio::test]
    async fn test_prune_keeps_recent_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("fresh.png"), b"x").unwrap();

        let removed = prune_uploads(dir.path(), Duration::from_secs(3600)).await.unwrap();

        assert_eq!(removed, 0);
        assert!(dir.path().join("fresh.png").exists());
    }

    #[tokio::test]
    async fn test_prune_missing_directory() {
        let err = prune_uploads(Path::new("/nonexistent/uploads"), Duration::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, ClassifierError::Internal(_)));
    }

    #[tokio::test]
    async fn test_sweeper_prunes_on_first_tick() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("old.gif"), b"x").unwrap();

        let handle = spawn_upload_sweeper(
            dir.path().to_path_buf(),
            Duration::ZERO,
            Duration::from_secs(3600),
        );
        for _ in 0..50 {
            if !dir.path().join("old.gif").exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        handle.abort();

        assert!(!dir.path().join("old.gif").exists());
    }
}
