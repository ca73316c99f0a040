use std::path::Path;

use tokio::fs;
use tracing::debug;

use crate::{
    error::AppError,
    mime::MimeRegistry,
    models::entries::{Entry, FileCategory},
    storage::format_size,
};

/// Junk that removable drives collect from desktop operating systems.
const HIDDEN_NAMES: &[&str] = &[
    "System Volume Information",
    "$RECYCLE.BIN",
    "Thumbs.db",
    ".Trashes",
    ".Spotlight-V100",
];

pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.') || HIDDEN_NAMES.contains(&name)
}

pub async fn list_directory(dir: &Path, registry: &MimeRegistry) -> Result<Vec<Entry>, AppError> {
    let mut reader = fs::read_dir(dir).await.map_err(AppError::from_fs)?;
    let mut entries = Vec::new();

    while let Some(child) = reader.next_entry().await.map_err(AppError::from_fs)? {
        let name = child.file_name().to_string_lossy().into_owned();
        if is_hidden(&name) {
            continue;
        }

        // follows symlinks so a link to a folder is listed as a folder
        let metadata = match fs::metadata(child.path()).await {
            Ok(metadata) => metadata,
            Err(err) => {
                debug!(name = %name, error = %err, "skipping unreadable entry");
                continue;
            }
        };

        if metadata.is_dir() {
            entries.push(Entry::directory(name));
        } else {
            let mime = registry.guess(&name);
            let size = metadata.len();
            entries.push(Entry {
                category: Some(FileCategory::from_mime(&mime)),
                mime: Some(mime),
                size: Some(size),
                size_human: Some(format_size(size)),
                is_dir: false,
                name,
            });
        }
    }

    entries.sort_by(|a, b| {
        b.is_dir
            .cmp(&a.is_dir)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            .then_with(|| a.name.cmp(&b.name))
    });

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names(entries: &[Entry]) -> Vec<&str> {
        entries.iter().map(|entry| entry.name.as_str()).collect()
    }

    #[actix_web::test]
    async fn folders_first_then_case_insensitive_names() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.txt"), b"b").unwrap();
        std::fs::create_dir(dir.path().join("A")).unwrap();
        std::fs::write(dir.path().join(".hidden"), b"h").unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
        std::fs::create_dir(dir.path().join("System Volume Information")).unwrap();

        let entries = list_directory(dir.path(), &MimeRegistry::new())
            .await
            .unwrap();

        assert_eq!(names(&entries), vec!["A", "a.txt", "b.txt"]);
    }

    #[actix_web::test]
    async fn folders_sort_before_files_regardless_of_name() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("aaa.mp3"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("zeta")).unwrap();
        std::fs::create_dir(dir.path().join("Beta")).unwrap();

        let entries = list_directory(dir.path(), &MimeRegistry::new())
            .await
            .unwrap();

        assert_eq!(names(&entries), vec!["Beta", "zeta", "aaa.mp3"]);
    }

    #[actix_web::test]
    async fn deny_list_entries_are_hidden() {
        let dir = TempDir::new().unwrap();
        for name in ["$RECYCLE.BIN", ".Trashes", ".Spotlight-V100"] {
            std::fs::create_dir(dir.path().join(name)).unwrap();
        }
        std::fs::write(dir.path().join("Thumbs.db"), b"x").unwrap();
        std::fs::write(dir.path().join("keep.mp4"), b"x").unwrap();

        let entries = list_directory(dir.path(), &MimeRegistry::new())
            .await
            .unwrap();

        assert_eq!(names(&entries), vec!["keep.mp4"]);
    }

    #[actix_web::test]
    async fn files_carry_size_and_media_type() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("movie.mkv"), vec![0u8; 1536]).unwrap();
        std::fs::create_dir(dir.path().join("Shows")).unwrap();

        let entries = list_directory(dir.path(), &MimeRegistry::new())
            .await
            .unwrap();

        let folder = &entries[0];
        assert!(folder.is_dir);
        assert_eq!(folder.size, None);
        assert_eq!(folder.mime, None);

        let movie = &entries[1];
        assert_eq!(movie.size, Some(1536));
        assert_eq!(movie.size_human.as_deref(), Some("1.5 KB"));
        assert_eq!(movie.mime.as_deref(), Some("video/x-matroska"));
        assert_eq!(movie.category, Some(FileCategory::Video));
    }

    #[actix_web::test]
    async fn missing_directory_is_not_found() {
        let dir = TempDir::new().unwrap();

        let result = list_directory(&dir.path().join("missing"), &MimeRegistry::new()).await;
        assert!(matches!(result, Err(AppError::NotFound)));
    }

    #[cfg(unix)]
    #[actix_web::test]
    async fn dangling_symlinks_are_skipped() {
        let dir = TempDir::new().unwrap();
        std::os::unix::fs::symlink(dir.path().join("nowhere"), dir.path().join("broken")).unwrap();
        std::fs::write(dir.path().join("ok.txt"), b"ok").unwrap();

        let entries = list_directory(dir.path(), &MimeRegistry::new())
            .await
            .unwrap();

        assert_eq!(names(&entries), vec!["ok.txt"]);
    }
}
