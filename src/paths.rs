use std::{
    io,
    path::{Component, Path, PathBuf},
};

use tokio::fs;
use tracing::warn;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct MediaRoot {
    canonical: PathBuf,
}

impl MediaRoot {
    pub async fn open(path: &Path) -> Result<Self, AppError> {
        fs::create_dir_all(path).await?;
        let canonical = fs::canonicalize(path).await?;
        Ok(Self { canonical })
    }

    pub fn path(&self) -> &Path {
        &self.canonical
    }

    /// Segments are canonicalized one at a time so symlinks are followed
    /// before the containment check. Past a missing segment the path is
    /// lexical until `..` climbs back to something that exists.
    pub async fn resolve(&self, subpath: &str) -> Result<PathBuf, AppError> {
        let trimmed = subpath.trim_matches('/');
        let mut current = self.canonical.clone();
        let mut missing = false;

        for component in Path::new(trimmed).components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    current.pop();
                    if missing && let Some(resolved) = canonical_if_present(&current).await? {
                        current = resolved;
                        missing = false;
                    }
                }
                Component::Normal(segment) => {
                    current.push(segment);
                    if missing {
                        continue;
                    }
                    match canonical_if_present(&current).await? {
                        Some(resolved) => current = resolved,
                        None => missing = true,
                    }
                }
                Component::RootDir | Component::Prefix(_) => {
                    warn!(subpath, "rejected absolute path");
                    return Err(AppError::Forbidden);
                }
            }
        }

        if current.starts_with(&self.canonical) {
            Ok(current)
        } else {
            warn!(subpath, "rejected path outside media root");
            Err(AppError::Forbidden)
        }
    }

    pub fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.canonical)
            .map(|rel| {
                rel.components()
                    .filter_map(|component| match component {
                        Component::Normal(segment) => Some(segment.to_string_lossy().into_owned()),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .unwrap_or_default()
    }
}

async fn canonical_if_present(path: &Path) -> Result<Option<PathBuf>, AppError> {
    match fs::canonicalize(path).await {
        Ok(resolved) => Ok(Some(resolved)),
        Err(err) if matches!(err.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory) => {
            Ok(None)
        }
        Err(err) if err.kind() == io::ErrorKind::PermissionDenied => Err(AppError::PermissionDenied),
        Err(err) => Err(AppError::Io(err)),
    }
}
