use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use contracts::dashboards::d402_sales_analytics::{
    FilterOptionsDto, SalesDashboardResponse, SalesFilterRequest, EXPORT_FILE_NAME,
};

use crate::dashboards::d402_sales_analytics::{engine, export, service, SalesError};
use crate::shared::data::dataset::{self, DatasetSource};
use crate::shared::format::{format_amount, format_number};

/// GET /api/d402/filter_options
pub async fn get_filter_options() -> Result<Json<FilterOptionsDto>, StatusCode> {
    let data = run_blocking("get filter options", dataset::current).await?;

    tracing::info!(
        "D402 Dashboard: Returning options for {} categories, {} regions, {} segments",
        data.options.categories.len(),
        data.options.regions.len(),
        data.options.segments.len()
    );
    Ok(Json(FilterOptionsDto::from(&data.options)))
}

/// POST /api/d402/dashboard
pub async fn get_dashboard(
    Json(request): Json<SalesFilterRequest>,
) -> Result<Json<SalesDashboardResponse>, StatusCode> {
    let response = run_blocking("build dashboard", move || {
        dashboard_for(dataset::get_source()?, &request)
    })
    .await?;

    tracing::info!(
        "D402 Dashboard: {} orders, revenue {}",
        format_number(response.total_rows),
        format_amount(response.metrics.total_revenue)
    );
    Ok(Json(response))
}

/// POST /api/d402/export
pub async fn export_csv(Json(request): Json<SalesFilterRequest>) -> Result<Response, StatusCode> {
    let bytes = run_blocking("export CSV", move || {
        export_for(dataset::get_source()?, &request)
    })
    .await?;

    tracing::info!("D402 Dashboard: Exported {} bytes", format_number(bytes.len()));
    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME),
        ),
    ];
    Ok((headers, bytes).into_response())
}

/// Runs dataset work on the blocking pool: it stats the CSV and may re-read it
async fn run_blocking<T, F>(action: &str, work: F) -> Result<T, StatusCode>
where
    F: FnOnce() -> Result<T, SalesError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => result.map_err(|e| error_status(action, &e)),
        Err(e) => {
            tracing::error!("D402 Dashboard: Task to {} did not finish: {}", action, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

fn dashboard_for(
    source: &DatasetSource,
    request: &SalesFilterRequest,
) -> Result<SalesDashboardResponse, SalesError> {
    let data = source.dataset()?;
    let criteria = service::resolve_criteria(request, &data.options)?;
    service::build_dashboard(&data.table, &criteria, source.settings())
}

fn export_for(source: &DatasetSource, request: &SalesFilterRequest) -> Result<Vec<u8>, SalesError> {
    let data = source.dataset()?;
    let criteria = service::resolve_criteria(request, &data.options)?;
    let filtered = engine::filter(&data.table, &criteria)?;
    export::export_csv(&filtered)
}

/// Bad criteria are the caller's problem (400), everything else is ours (500)
fn error_status(action: &str, e: &SalesError) -> StatusCode {
    if e.is_client_error() {
        tracing::warn!("D402 Dashboard: Rejected request to {}: {}", action, e);
        StatusCode::BAD_REQUEST
    } else {
        tracing::error!("D402 Dashboard: Failed to {}: {}", action, e);
        StatusCode::INTERNAL_SERVER_ERROR
    }
}
