//! Disposable copies of the project tree, one per case.

use std::io;
use std::path::{Path, PathBuf};

use skillcheck_core::obs;
use tempfile::TempDir;

use crate::fsutil::copy_tree;

/// A staged copy of the project root, removed on drop.
///
/// The temp dir is created next to the project root rather than under the
/// system temp dir: some agent sandboxes only allow writes below user or
/// project directories.
#[derive(Debug)]
pub struct StagedWorkspace {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl StagedWorkspace {
    pub fn stage(root: &Path) -> io::Result<Self> {
        let parent = root
            .canonicalize()?
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "project root has no parent"))?;
        let dir = tempfile::Builder::new()
            .prefix("skillcheck-workspace-")
            .tempdir_in(parent)?;
        let path = dir.path().join("workspace");
        let files = copy_tree(root, &path)?;
        tracing::debug!(path = %path.display(), files = files, "workspace staged");
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    /// Root of the staged copy.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedWorkspace {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            let at = dir.path().to_path_buf();
            match dir.close() {
                Ok(()) => obs::emit_workspace_released(&at),
                Err(err) => obs::emit_cleanup_error("workspace", &err),
            }
        }
    }
}
