mod config;
mod error;
mod folders;
mod listing;
mod mime;
mod models;
mod paths;
mod routes;
mod serve;
mod storage;
mod upload;
mod views;

use std::fs;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware::Logger, web};
use config::AppConfig;
use mime::MimeRegistry;
use paths::MediaRoot;
use routes::register;
use tracing::info;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub struct AppState {
    pub root: MediaRoot,
    pub mime: MimeRegistry,
    pub max_upload_bytes: Option<u64>,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env().expect("failed to load config");

    fs::create_dir_all(&config.log_dir).expect("failed to create log directory");
    let file_appender = rolling::never(&config.log_dir, "media-hub.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let _guard = guard;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .expect("failed to init logging filter");

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .init();

    let root = MediaRoot::open(&config.media_root)
        .await
        .expect("failed to prepare media root");

    info!(
        media_root = %root.path().display(),
        host = %config.host,
        port = config.port,
        "starting media hub"
    );

    let bind_addr = format!("{}:{}", config.host, config.port);
    let shared_state = web::Data::new(AppState {
        root,
        mime: MimeRegistry::new(),
        max_upload_bytes: config.max_upload_bytes,
    });

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .app_data(shared_state.clone())
            .configure(register)
    })
    .bind(bind_addr)?
    .run()
    .await
}
