use std::{collections::HashMap, path::Path};

pub const OCTET_STREAM: &str = "application/octet-stream";

/// Media types the system table gets wrong or lacks on common installs.
const OVERRIDES: &[(&str, &str)] = &[
    ("mp4", "video/mp4"),
    ("webm", "video/webm"),
    ("mkv", "video/x-matroska"),
    ("mp3", "audio/mpeg"),
    ("ogg", "audio/ogg"),
    ("flac", "audio/flac"),
    ("apk", "application/vnd.android.package-archive"),
];

#[derive(Debug, Clone)]
pub struct MimeRegistry {
    overrides: HashMap<String, String>,
}

impl Default for MimeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MimeRegistry {
    pub fn new() -> Self {
        let overrides = OVERRIDES
            .iter()
            .map(|(ext, mime)| (ext.to_string(), mime.to_string()))
            .collect();
        Self { overrides }
    }

    pub fn guess(&self, name: &str) -> String {
        let extension = Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        let Some(extension) = extension else {
            return OCTET_STREAM.into();
        };

        if let Some(mime) = self.overrides.get(&extension) {
            return mime.clone();
        }

        mime_guess::from_ext(&extension)
            .first()
            .map(|mime| mime.essence_str().to_string())
            .unwrap_or_else(|| OCTET_STREAM.into())
    }
}
