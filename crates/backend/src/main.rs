use axum::http::{header, Method};
use axum::middleware;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use backend::routes::configure_routes;
use backend::shared::{config, data::dataset};
use backend::system;
use backend::system::middleware::request_logger::request_logger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    system::tracing::initialize()?;

    let cfg = config::load_config()?;
    let dataset_path = config::get_dataset_path(&cfg);
    dataset::initialize_dataset(dataset_path, (&cfg.dashboard).into())?;

    // Загружаем данные заранее, чтобы первый запрос не ждал чтения CSV.
    // Ошибка не фатальна: файл может появиться позже.
    match dataset::current() {
        Ok(data) => tracing::info!("Dataset ready: {} rows", data.table.len()),
        Err(e) => tracing::warn!("Dataset is not available yet: {}", e),
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    let app = configure_routes()
        .layer(middleware::from_fn(request_logger))
        .layer(cors);

    let port = cfg.server.port;
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();

    tracing::info!("Attempting to bind server to http://{}", addr);
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => {
            tracing::info!("Server successfully bound to {}", addr);
            listener
        }
        Err(e) => {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                tracing::error!(
                    "Error: Port {} is already in use. Please ensure no other process is using this port.",
                    port
                );
            } else {
                tracing::error!("Failed to bind to port {}. Error: {}", port, e);
            }
            return Err(e.into());
        }
    };

    axum::serve(listener, app).await?;

    Ok(())
}
