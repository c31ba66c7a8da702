//! Per-request temporary workspaces

use crate::error::Result;
use crate::upload::{secure_filename, UploadedFile};
use futures_util::future::BoxFuture;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A uniquely named directory owned by one request.
///
/// The directory is removed by [`Workspace::release`], or on drop if the
/// owner bails out early.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a fresh directory under `root`, creating `root` if needed
    pub fn acquire(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new().prefix("job-").tempdir_in(root)?;
        tracing::debug!(path = %dir.path().display(), "workspace acquired");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write an upload into the workspace under a sanitized name.
    ///
    /// `index` keeps uploads with the same name apart and preserves
    /// submission order in directory listings.
    pub async fn stage(&self, index: usize, file: &UploadedFile) -> Result<PathBuf> {
        let path = self
            .path()
            .join(format!("{:03}_{}", index, secure_filename(&file.file_name)));
        tokio::fs::write(&path, &file.data).await?;
        Ok(path)
    }

    /// Path for a generated file inside the workspace
    pub fn output_path(&self, name: &str) -> PathBuf {
        self.path().join(secure_filename(name))
    }

    /// Recursively delete the workspace
    pub fn release(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close()?;
        tracing::debug!(path = %path.display(), "workspace released");
        Ok(())
    }
}

/// Run `job` inside a freshly acquired workspace and release it afterwards,
/// whatever the job returned.
pub async fn in_workspace<T, F>(root: &Path, job: F) -> Result<T>
where
    F: for<'a> FnOnce(&'a Workspace) -> BoxFuture<'a, Result<T>>,
{
    let workspace = Workspace::acquire(root)?;
    let result = job(&workspace).await;

    if let Err(e) = workspace.release() {
        tracing::warn!(error = %e, "failed to release workspace");
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use axum::body::Bytes;
    use futures_util::FutureExt;

    fn entries(root: &Path) -> usize {
        std::fs::read_dir(root).map(|d| d.count()).unwrap_or(0)
    }

    #[test]
    fn test_acquire_is_unique_and_release_removes() {
        let root = tempfile::tempdir().unwrap();
        let a = Workspace::acquire(root.path()).unwrap();
        let b = Workspace::acquire(root.path()).unwrap();

        assert_ne!(a.path(), b.path());
        assert!(a.path().starts_with(root.path()));
        assert_eq!(entries(root.path()), 2);

        a.release().unwrap();
        assert_eq!(entries(root.path()), 1);
        drop(b);
        assert_eq!(entries(root.path()), 0);
    }

    #[test]
    fn test_acquire_creates_missing_root() {
        let base = tempfile::tempdir().unwrap();
        let root = base.path().join("nested").join("jobs");
        let ws = Workspace::acquire(&root).unwrap();
        assert!(ws.path().is_dir());
    }

    #[tokio::test]
    async fn test_stage_sanitizes_names() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::acquire(root.path()).unwrap();
        let upload = UploadedFile {
            field: "file".to_string(),
            file_name: "../../evil name.pdf".to_string(),
            data: Bytes::from_static(b"%PDF-1.7"),
        };

        let staged = ws.stage(2, &upload).await.unwrap();
        assert_eq!(staged, ws.path().join("002_evil_name.pdf"));
        assert_eq!(std::fs::read(&staged).unwrap(), b"%PDF-1.7");
    }

    #[tokio::test]
    async fn test_in_workspace_releases_on_success_and_failure() {
        let root = tempfile::tempdir().unwrap();

        let seen = in_workspace(root.path(), |ws| {
            async move {
                tokio::fs::write(ws.output_path("out.pdf"), b"x").await?;
                Ok(ws.path().to_path_buf())
            }
            .boxed()
        })
        .await
        .unwrap();
        assert!(!seen.exists());

        for _ in 0..5 {
            let result: Result<()> = in_workspace(root.path(), |_ws| {
                async move {
                    Err(Error::MissingFile {
                        field: "file".to_string(),
                    })
                }
                .boxed()
            })
            .await;
            assert!(result.is_err());
        }

        assert_eq!(entries(root.path()), 0);
    }
}
