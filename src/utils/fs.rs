use {
    anyhow::{Context, Result},
    std::{
        io::ErrorKind,
        path::{Path, PathBuf},
    },
};

/// Reads a UTF-8 file, mapping "not found" to `None`. Any other failure is
/// an error.
pub async fn read_optional(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
    }
}

/// Like [`read_optional`], but invalid UTF-8 is replaced instead of being an
/// error.
pub async fn read_optional_lossy(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
    }
}

/// Walks from `start` towards the filesystem root and returns the first
/// directory containing `file_name`.
pub fn find_in_ancestors(start: &Path, file_name: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(file_name).is_file())
        .map(Path::to_path_buf)
}
