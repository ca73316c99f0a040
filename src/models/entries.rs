use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Video,
    Audio,
    Image,
    Document,
    File,
}

impl FileCategory {
    pub fn from_mime(mime: &str) -> Self {
        if mime.starts_with("video/") {
            FileCategory::Video
        } else if mime.starts_with("audio/") {
            FileCategory::Audio
        } else if mime.starts_with("image/") {
            FileCategory::Image
        } else if mime == "application/pdf" {
            FileCategory::Document
        } else {
            FileCategory::File
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileCategory::Video => "video",
            FileCategory::Audio => "audio",
            FileCategory::Image => "image",
            FileCategory::Document => "document",
            FileCategory::File => "file",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub name: String,
    pub is_dir: bool,
    pub size: Option<u64>,
    pub size_human: Option<String>,
    pub mime: Option<String>,
    pub category: Option<FileCategory>,
}

impl Entry {
    pub fn directory(name: String) -> Self {
        Self {
            name,
            is_dir: true,
            size: None,
            size_human: None,
            mime: None,
            category: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breadcrumb {
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageUsage {
    pub total: String,
    pub used: String,
    pub free: String,
    pub percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingResponse {
    pub path: String,
    pub entries: Vec<Entry>,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub storage: Option<StorageUsage>,
}
