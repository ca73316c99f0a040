use std::{io::SeekFrom, path::Path};

use actix_web::{
    HttpResponse,
    body::SizedStream,
    http::{
        StatusCode,
        header::{
            self, Charset, ContentDisposition, DispositionParam, DispositionType, ExtendedValue,
        },
    },
};
use tokio::{
    fs::{self, File},
    io::{AsyncReadExt, AsyncSeekExt},
};
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::{error::AppError, mime::MimeRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn length(&self) -> u64 {
        self.end - self.start + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeRequest {
    Full,
    Partial(ByteRange),
    Unsatisfiable,
}

/// Malformed, multi-range and inverted headers fall back to [`RangeRequest::Full`].
pub fn parse_range(header: Option<&str>, total: u64) -> RangeRequest {
    let Some(value) = header else {
        return RangeRequest::Full;
    };
    let Some(spec) = value.trim().strip_prefix("bytes=") else {
        return RangeRequest::Full;
    };
    if spec.contains(',') {
        return RangeRequest::Full;
    }
    let Some((start_part, end_part)) = spec.split_once('-') else {
        return RangeRequest::Full;
    };
    let (start_part, end_part) = (start_part.trim(), end_part.trim());

    if start_part.is_empty() {
        let Ok(suffix) = end_part.parse::<u64>() else {
            return RangeRequest::Full;
        };
        if suffix == 0 || total == 0 {
            return RangeRequest::Unsatisfiable;
        }
        return RangeRequest::Partial(ByteRange {
            start: total.saturating_sub(suffix),
            end: total - 1,
        });
    }

    let Ok(start) = start_part.parse::<u64>() else {
        return RangeRequest::Full;
    };
    let end = if end_part.is_empty() {
        None
    } else {
        match end_part.parse::<u64>() {
            Ok(end) => Some(end),
            Err(_) => return RangeRequest::Full,
        }
    };
    if let Some(end) = end
        && end < start
    {
        return RangeRequest::Full;
    }
    if start >= total {
        return RangeRequest::Unsatisfiable;
    }

    let last = total - 1;
    RangeRequest::Partial(ByteRange {
        start,
        end: end.map_or(last, |end| end.min(last)),
    })
}

pub async fn stream_file(
    path: &Path,
    range: Option<&str>,
    registry: &MimeRegistry,
) -> Result<HttpResponse, AppError> {
    file_response(path, range, registry, None).await
}

pub async fn download_file(
    path: &Path,
    range: Option<&str>,
    registry: &MimeRegistry,
) -> Result<HttpResponse, AppError> {
    let name = file_name(path);
    let disposition = attachment(&name);
    file_response(path, range, registry, Some(disposition)).await
}

async fn file_response(
    path: &Path,
    range: Option<&str>,
    registry: &MimeRegistry,
    disposition: Option<ContentDisposition>,
) -> Result<HttpResponse, AppError> {
    let metadata = fs::metadata(path).await.map_err(AppError::from_fs)?;
    if !metadata.is_file() {
        return Err(AppError::NotFound);
    }
    let total = metadata.len();
    let name = file_name(path);
    let mime = registry.guess(&name);

    let request = parse_range(range, total);
    if request == RangeRequest::Unsatisfiable {
        debug!(file = %name, total, "range not satisfiable");
        return Err(AppError::RangeNotSatisfiable(total));
    }

    // the stream owns the handle, so it closes when the body finishes or the client goes away
    let mut file = File::open(path).await.map_err(AppError::from_fs)?;

    let mut builder = match request {
        RangeRequest::Partial(_) => HttpResponse::build(StatusCode::PARTIAL_CONTENT),
        _ => HttpResponse::build(StatusCode::OK),
    };
    builder
        .content_type(mime)
        .insert_header((header::ACCEPT_RANGES, "bytes"));
    if let Some(disposition) = disposition {
        builder.insert_header(disposition);
    }

    match request {
        RangeRequest::Partial(range) => {
            let length = range.length();
            debug!(file = %name, start = range.start, end = range.end, length, "partial content");
            file.seek(SeekFrom::Start(range.start)).await?;
            builder.insert_header((
                header::CONTENT_RANGE,
                format!("bytes {}-{}/{}", range.start, range.end, total),
            ));
            Ok(builder.body(SizedStream::new(
                length,
                ReaderStream::new(file.take(length)),
            )))
        }
        _ => Ok(builder.body(SizedStream::new(total, ReaderStream::new(file)))),
    }
}

fn attachment(name: &str) -> ContentDisposition {
    let mut parameters = Vec::new();
    if name.is_ascii() {
        parameters.push(DispositionParam::Filename(name.to_string()));
    } else {
        let fallback: String = name
            .chars()
            .map(|ch| if ch.is_ascii() { ch } else { '_' })
            .collect();
        parameters.push(DispositionParam::Filename(fallback));
        parameters.push(DispositionParam::FilenameExt(ExtendedValue {
            charset: Charset::Ext("UTF-8".into()),
            language_tag: None,
            value: name.as_bytes().to_vec(),
        }));
    }
    ContentDisposition {
        disposition: DispositionType::Attachment,
        parameters,
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
