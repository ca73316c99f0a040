use std::{env, path::PathBuf};

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub media_root: PathBuf,
    pub log_dir: PathBuf,
    pub max_upload_bytes: Option<u64>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "5000".into())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid SERVER_PORT: {err}")))?;

        let media_root =
            PathBuf::from(env::var("MEDIA_ROOT").unwrap_or_else(|_| "/media/usb".into()));

        let log_dir = PathBuf::from(env::var("MEDIA_LOG_DIR").unwrap_or_else(|_| "./log".into()));

        let max_upload_bytes = match env::var("MAX_UPLOAD_BYTES") {
            Ok(value) if !value.trim().is_empty() => Some(
                value
                    .trim()
                    .parse::<u64>()
                    .map_err(|err| AppError::Config(format!("invalid MAX_UPLOAD_BYTES: {err}")))?,
            ),
            _ => None,
        };

        Ok(Self {
            host,
            port,
            media_root,
            log_dir,
            max_upload_bytes,
        })
    }
}
