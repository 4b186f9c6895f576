use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, bail};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::info;

use interior_restyle::{
    designer::DesignService,
    openai::OpenAiClient,
    routes::{self, AppState},
    store::{LocalFileStorage, RecordStore},
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "interior_restyle=info,tower_http=warn".into()),
        )
        .init();

    let api_key = match env::var("OPENAI_API_KEY") {
        Ok(value) if !value.trim().is_empty() => value,
        _ => bail!("OPENAI_API_KEY not found in environment variables"),
    };

    let port = env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(5000);
    let bind_address = format!("0.0.0.0:{port}");

    let data_dir = resolve_data_dir();
    let images_dir = data_dir.join("stored_images");
    let records_dir = data_dir.join("records");
    let base_url = resolve_public_base_url(&bind_address);
    info!(path = %images_dir.display(), "storage directory");

    let storage = Arc::new(LocalFileStorage::new(images_dir.clone(), base_url));
    let records = Arc::new(RecordStore::new(records_dir, storage.clone()));
    let editor = Arc::new(OpenAiClient::new(api_key));
    let service = DesignService::new(storage.clone(), records.clone(), editor);
    let state = Arc::new(AppState {
        service,
        storage,
        records,
    });

    let router = axum::Router::new()
        .route(
            "/api/generate-designs",
            post(routes::generate_designs).layer(DefaultBodyLimit::max(50 * 1024 * 1024)),
        )
        .route("/api/generations", get(routes::list_generations))
        .nest_service("/api/stored-image", ServeDir::new(images_dir))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let tcp_listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("interior restyle server started at http://{bind_address}");

    axum::serve(tcp_listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

fn resolve_data_dir() -> PathBuf {
    let data_dir = env::var("DATA_DIR")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from);
    if let Some(dir) = data_dir {
        return dir;
    }
    let mut base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    base.push("interior-restyle");
    base
}

fn resolve_public_base_url(bind_address: &str) -> String {
    let raw = env::var("PUBLIC_URL")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| bind_address.to_string());
    let trimmed = raw.trim().trim_end_matches('/');
    let base = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };
    format!("{base}/api/stored-image")
}
