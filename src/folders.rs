use std::{io, path::Path};

use tokio::fs;
use tracing::info;

use crate::error::AppError;

pub fn sanitize_folder_name(raw: &str) -> Result<String, AppError> {
    let kept: String = raw
        .chars()
        .filter(|ch| ch.is_alphanumeric() || matches!(ch, ' ' | '-' | '_'))
        .collect();
    let name = kept.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Invalid folder name".into()));
    }
    Ok(name.to_string())
}

pub async fn create_folder(parent: &Path, raw: &str) -> Result<String, AppError> {
    let is_dir = fs::metadata(parent)
        .await
        .map(|metadata| metadata.is_dir())
        .unwrap_or(false);
    if !is_dir {
        return Err(AppError::BadRequest("Invalid parent folder".into()));
    }

    let name = sanitize_folder_name(raw)?;
    match fs::create_dir(parent.join(&name)).await {
        Ok(()) => {
            info!(folder = %name, "created folder");
            Ok(name)
        }
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            Err(AppError::BadRequest("Folder already exists".into()))
        }
        Err(err) => Err(AppError::Io(err)),
    }
}
