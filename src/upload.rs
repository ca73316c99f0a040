use std::{
    fmt::Display,
    io,
    path::{Path, PathBuf},
};

use actix_web::web::Bytes;
use futures_util::{Stream, TryStreamExt};
use tokio::{
    fs::{self, File, OpenOptions},
    io::AsyncWriteExt,
};
use tracing::{info, warn};

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub filename: String,
    pub size: u64,
}

pub fn sanitize_upload_name(raw: &str) -> Result<String, AppError> {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or_default();

    if name.is_empty() || name.contains('\0') {
        return Err(AppError::BadRequest("No file selected".into()));
    }
    if name.starts_with('.') {
        return Err(AppError::BadRequest("Hidden files not allowed".into()));
    }
    Ok(name.to_string())
}

/// `photo.jpg` becomes `photo_1.jpg`, `notes` becomes `notes_1`.
fn numbered_name(name: &str, counter: u32) -> String {
    match name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() && !extension.is_empty() => {
            format!("{stem}_{counter}.{extension}")
        }
        _ => format!("{name}_{counter}"),
    }
}

pub async fn save_upload<S, E>(
    dir: &Path,
    raw_name: &str,
    content: S,
    max_bytes: Option<u64>,
) -> Result<UploadOutcome, AppError>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Display,
{
    ensure_folder(dir).await?;

    let name = sanitize_upload_name(raw_name)?;
    let (mut file, filename) = claim_name(dir, &name).await?;
    let mut partial = PartialUpload {
        path: dir.join(&filename),
        committed: false,
    };

    let size = write_content(&mut file, content, max_bytes).await?;
    partial.committed = true;
    info!(filename = %filename, size, "stored upload");
    Ok(UploadOutcome { filename, size })
}

pub async fn ensure_folder(dir: &Path) -> Result<(), AppError> {
    let is_dir = fs::metadata(dir)
        .await
        .map(|metadata| metadata.is_dir())
        .unwrap_or(false);
    if is_dir {
        Ok(())
    } else {
        Err(AppError::BadRequest("Invalid folder".into()))
    }
}

/// Removes a claimed upload file unless the transfer finished, including when
/// the request future is dropped mid-stream.
struct PartialUpload {
    path: PathBuf,
    committed: bool,
}

impl Drop for PartialUpload {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Err(err) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %err, "failed to remove partial upload");
        }
    }
}

async fn claim_name(dir: &Path, name: &str) -> Result<(File, String), AppError> {
    let mut candidate = name.to_string();
    let mut counter = 0u32;
    loop {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(dir.join(&candidate))
            .await
        {
            Ok(file) => return Ok((file, candidate)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                counter = counter
                    .checked_add(1)
                    .ok_or_else(|| AppError::BadRequest("No free file name".into()))?;
                candidate = numbered_name(name, counter);
            }
            Err(err) => return Err(AppError::Io(err)),
        }
    }
}

async fn write_content<S, E>(
    file: &mut File,
    mut content: S,
    max_bytes: Option<u64>,
) -> Result<u64, AppError>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Display,
{
    let mut written = 0u64;
    while let Some(chunk) = content
        .try_next()
        .await
        .map_err(|err| AppError::BadRequest(format!("failed to read upload: {err}")))?
    {
        written += chunk.len() as u64;
        if let Some(limit) = max_bytes
            && written > limit
        {
            return Err(AppError::BadRequest(format!(
                "upload exceeds the {limit} byte limit"
            )));
        }
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::{
        StreamExt,
        future::{Either, join_all, select},
        stream,
    };
    use std::pin::pin;
    use tempfile::TempDir;

    fn body(data: &'static [u8]) -> impl Stream<Item = Result<Bytes, io::Error>> + Unpin {
        stream::iter(vec![Ok(Bytes::from_static(data))])
    }

    #[test]
    fn strips_directory_components() {
        assert_eq!(sanitize_upload_name("photo.jpg").unwrap(), "photo.jpg");
        assert_eq!(
            sanitize_upload_name("../../etc/passwd").unwrap(),
            "passwd"
        );
        assert_eq!(
            sanitize_upload_name("C:\\Users\\me\\clip.mp4").unwrap(),
            "clip.mp4"
        );
    }

    #[test]
    fn rejects_empty_and_hidden_names() {
        for raw in ["", "dir/", ".bashrc", "uploads/.env", "..", "."] {
            assert!(
                matches!(sanitize_upload_name(raw), Err(AppError::BadRequest(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn numbering_goes_before_the_extension() {
        assert_eq!(numbered_name("photo.jpg", 1), "photo_1.jpg");
        assert_eq!(numbered_name("backup.tar.gz", 2), "backup.tar_2.gz");
        assert_eq!(numbered_name("notes", 3), "notes_3");
        assert_eq!(numbered_name("odd.", 1), "odd._1");
    }

    #[actix_web::test]
    async fn repeated_uploads_get_numbered_names() {
        let dir = TempDir::new().unwrap();

        let first = save_upload(dir.path(), "photo.jpg", body(b"one"), None)
            .await
            .unwrap();
        let second = save_upload(dir.path(), "photo.jpg", body(b"two"), None)
            .await
            .unwrap();
        let third = save_upload(dir.path(), "photo.jpg", body(b"three"), None)
            .await
            .unwrap();

        assert_eq!(first.filename, "photo.jpg");
        assert_eq!(second.filename, "photo_1.jpg");
        assert_eq!(third.filename, "photo_2.jpg");
        assert_eq!(third.size, 5);
        assert_eq!(std::fs::read(dir.path().join("photo.jpg")).unwrap(), b"one");
        assert_eq!(std::fs::read(dir.path().join("photo_2.jpg")).unwrap(), b"three");
    }

    #[actix_web::test]
    async fn chunks_are_written_in_order() {
        let dir = TempDir::new().unwrap();
        let chunks = stream::iter(vec![
            Ok::<_, io::Error>(Bytes::from_static(b"hello ")),
            Ok(Bytes::from_static(b"world")),
        ]);

        let outcome = save_upload(dir.path(), "greeting.txt", chunks, None)
            .await
            .unwrap();

        assert_eq!(outcome.size, 11);
        assert_eq!(
            std::fs::read(dir.path().join("greeting.txt")).unwrap(),
            b"hello world"
        );
    }

    #[actix_web::test]
    async fn broken_stream_leaves_no_file() {
        let dir = TempDir::new().unwrap();
        let chunks = stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        ]);

        let result = save_upload(dir.path(), "movie.mp4", chunks, None).await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert!(!dir.path().join("movie.mp4").exists());
    }

    #[actix_web::test]
    async fn abandoned_transfer_removes_claimed_file() {
        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("movie.mkv");
        let stalled = stream::iter(vec![Ok::<_, io::Error>(Bytes::from_static(b"part"))])
            .chain(stream::pending());

        {
            let upload = pin!(save_upload(dir.path(), "movie.mkv", stalled, None));
            let claimed = pin!(async {
                while !destination.exists() {
                    tokio::task::yield_now().await;
                }
            });
            if let Either::Left(_) = select(upload, claimed).await {
                panic!("stalled upload should not finish");
            }
        }

        assert!(!destination.exists());
    }

    #[actix_web::test]
    async fn oversized_upload_is_rejected_and_removed() {
        let dir = TempDir::new().unwrap();

        let result = save_upload(dir.path(), "big.bin", body(b"0123456789"), Some(4)).await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert!(!dir.path().join("big.bin").exists());
    }

    #[actix_web::test]
    async fn target_must_be_a_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("file.txt"), b"x").unwrap();

        let result = save_upload(&dir.path().join("file.txt"), "a.txt", body(b"a"), None).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[actix_web::test]
    async fn concurrent_uploads_never_share_a_name() {
        let dir = TempDir::new().unwrap();

        let uploads = (0..8).map(|_| save_upload(dir.path(), "clip.mp4", body(b"data"), None));
        let mut names: Vec<String> = join_all(uploads)
            .await
            .into_iter()
            .map(|outcome| outcome.unwrap().filename)
            .collect();
        names.sort();
        names.dedup();

        assert_eq!(names.len(), 8);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 8);
    }
}
