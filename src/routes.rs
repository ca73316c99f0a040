use std::path::Path;

use actix_multipart::Multipart;
use actix_web::{HttpRequest, HttpResponse, get, http::header, post, route, web};
use futures_util::TryStreamExt;
use serde_json::json;
use tokio::fs;
use tracing::info;
use uuid::Uuid;

use crate::{
    AppState,
    error::AppError,
    folders::create_folder,
    listing::list_directory,
    models::{
        entries::ListingResponse,
        transfers::{MkdirRequest, MkdirResponse, UploadResponse},
    },
    serve::{download_file, stream_file},
    storage::{format_size, storage_usage},
    upload::{ensure_folder, save_upload},
    views,
};

pub fn register(cfg: &mut web::ServiceConfig) {
    cfg.service(index)
        .service(health)
        .service(browse)
        .service(browse_json)
        .service(stream)
        .service(download)
        .service(upload)
        .service(mkdir)
        .service(browse_bare)
        .service(transfer_bare)
        .default_service(web::to(not_found));
}

async fn not_found() -> Result<HttpResponse, AppError> {
    Err(AppError::NotFound)
}

#[get("/browse")]
async fn browse_bare() -> HttpResponse {
    add_slash("/browse/")
}

#[post("/{action:upload|mkdir}")]
async fn transfer_bare(action: web::Path<String>) -> HttpResponse {
    add_slash(&format!("/{action}/"))
}

#[get("/")]
async fn index() -> HttpResponse {
    redirect("/browse/")
}

#[get("/healthz")]
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "service": "media-hub",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[get("/browse/{tail:.*}")]
async fn browse(
    tail: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let path = state.root.resolve(&tail).await?;
    let metadata = fs::metadata(&path).await.map_err(AppError::from_fs)?;

    if metadata.is_file() {
        let relative = state.root.relative(&path);
        return Ok(redirect(&format!("/stream/{}", views::encode_path(&relative))));
    }

    let listing = build_listing(&state, &path).await?;
    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(views::listing_page(&listing).into_string()))
}

#[get("/api/browse/{tail:.*}")]
async fn browse_json(
    tail: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let path = state.root.resolve(&tail).await?;
    let metadata = fs::metadata(&path).await.map_err(AppError::from_fs)?;
    if !metadata.is_dir() {
        return Err(AppError::BadRequest("Not a folder".into()));
    }

    let listing = build_listing(&state, &path).await?;
    Ok(HttpResponse::Ok().json(listing))
}

#[route("/stream/{tail:.*}", method = "GET", method = "HEAD")]
async fn stream(
    req: HttpRequest,
    tail: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let path = state.root.resolve(&tail).await?;
    stream_file(&path, range_header(&req), &state.mime).await
}

#[route("/download/{tail:.*}", method = "GET", method = "HEAD")]
async fn download(
    req: HttpRequest,
    tail: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let path = state.root.resolve(&tail).await?;
    info!(file = %tail, "download");
    download_file(&path, range_header(&req), &state.mime).await
}

#[post("/upload/{tail:.*}")]
async fn upload(
    tail: web::Path<String>,
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let dir = state.root.resolve(&tail).await?;
    ensure_folder(&dir).await?;
    let upload_id = Uuid::new_v4().simple().to_string();

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|err| AppError::BadRequest(format!("multipart error: {err}")))?
    {
        let content_disposition = field.content_disposition().clone();
        let field_name = content_disposition.get_name().unwrap_or("");

        if field_name != "file" {
            // unrelated form fields are drained so the next part can be read
            while field
                .try_next()
                .await
                .map_err(|err| AppError::BadRequest(format!("failed to read field: {err}")))?
                .is_some()
            {}
            continue;
        }

        let filename = content_disposition.get_filename().unwrap_or("").to_string();
        info!(upload_id = %upload_id, folder = %tail, filename = %filename, "receiving upload");

        let outcome = save_upload(&dir, &filename, field, state.max_upload_bytes).await?;
        info!(upload_id = %upload_id, stored_as = %outcome.filename, size = outcome.size, "upload complete");

        return Ok(HttpResponse::Ok().json(UploadResponse {
            success: true,
            size_human: format_size(outcome.size),
            filename: outcome.filename,
            size: outcome.size,
        }));
    }

    Err(AppError::BadRequest("No file provided".into()))
}

#[post("/mkdir/{tail:.*}")]
async fn mkdir(
    tail: web::Path<String>,
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let parent = state.root.resolve(&tail).await?;

    let requested = serde_json::from_slice::<MkdirRequest>(&body)
        .ok()
        .and_then(|request| request.name)
        .ok_or_else(|| AppError::BadRequest("Folder name required".into()))?;

    let name = create_folder(&parent, &requested).await?;
    info!(parent = %tail, folder = %name, "mkdir");

    Ok(HttpResponse::Ok().json(MkdirResponse {
        success: true,
        name,
    }))
}

async fn build_listing(state: &AppState, dir: &Path) -> Result<ListingResponse, AppError> {
    let entries = list_directory(dir, &state.mime).await?;
    let relative = state.root.relative(dir);
    Ok(ListingResponse {
        breadcrumbs: views::breadcrumbs(&relative),
        storage: storage_usage(state.root.path()).await,
        path: relative,
        entries,
    })
}

fn range_header(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok())
}

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish()
}

// 308 keeps the method and body of POSTs to the bare upload and mkdir paths
fn add_slash(location: &str) -> HttpResponse {
    HttpResponse::PermanentRedirect()
        .insert_header((header::LOCATION, location))
        .finish()
}
