use axum::{
    routing::{get, post},
    Router,
};

use crate::api::handlers;

/// Конфигурация всех роутов приложения
pub fn configure_routes() -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        // ========================================
        // D402 SALES ANALYTICS
        // ========================================
        .route(
            "/api/d402/filter_options",
            get(handlers::d402_sales_analytics::get_filter_options),
        )
        .route(
            "/api/d402/dashboard",
            post(handlers::d402_sales_analytics::get_dashboard),
        )
        .route(
            "/api/d402/export",
            post(handlers::d402_sales_analytics::export_csv),
        )
}
