use chrono::NaiveDate;
use contracts::dashboards::d402_sales_analytics::{
    AppliedFilter, CountValue, FilterOptionsDto, GroupValue, MonthlyPoint, SaleRowDto,
    SalesDashboardResponse, SalesFilterRequest, SummaryMetrics,
};
use std::collections::BTreeSet;

use super::engine::{self, FilterCriteria, GroupOrder};
use super::error::SalesError;
use super::model::{Dimension, FilterOptions, GroupKey, Measure, SaleRecord, SalesTable};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Sizes of the bounded dashboard sections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardSettings {
    pub top_products: usize,
    pub preview_rows: usize,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            top_products: 10,
            preview_rows: 100,
        }
    }
}

impl From<&FilterOptions> for FilterOptionsDto {
    fn from(options: &FilterOptions) -> Self {
        Self {
            categories: options.categories.clone(),
            regions: options.regions.clone(),
            segments: options.segments.clone(),
            min_date: options.min_date.map(format_date),
            max_date: options.max_date.map(format_date),
        }
    }
}

/// Turn the wire request into engine criteria.
///
/// `options` must describe the unfiltered dataset: absent lists fall back to
/// its full option lists. An absent date leaves that side of the range open.
pub fn resolve_criteria(
    request: &SalesFilterRequest,
    options: &FilterOptions,
) -> Result<FilterCriteria, SalesError> {
    let date_start = request
        .date_from
        .as_deref()
        .map(|value| parse_date("date_from", value))
        .transpose()?;
    let date_end = request
        .date_to
        .as_deref()
        .map(|value| parse_date("date_to", value))
        .transpose()?;

    Ok(FilterCriteria {
        date_start,
        date_end,
        categories: selection(request.categories.as_ref(), &options.categories),
        regions: selection(request.regions.as_ref(), &options.regions),
        segments: selection(request.segments.as_ref(), &options.segments),
    })
}

/// Filter the table and compute every dashboard section from the result
pub fn build_dashboard(
    table: &SalesTable,
    criteria: &FilterCriteria,
    settings: &DashboardSettings,
) -> Result<SalesDashboardResponse, SalesError> {
    let filtered = engine::filter(table, criteria)?;

    let metrics = SummaryMetrics {
        total_revenue: engine::aggregate_total(&filtered, Measure::FinalPrice),
        avg_order_value: engine::aggregate_mean(&filtered, Measure::FinalPrice),
        order_count: engine::aggregate_count(&filtered),
        total_quantity: filtered.rows().iter().map(|r| u64::from(r.quantity)).sum(),
        segment_count: engine::distinct_count(&filtered, Dimension::CustomerSegment),
        total_discount: engine::aggregate_total(&filtered, Measure::DiscountAmount),
        discounted_orders: engine::count_where(&filtered, |r| r.discount_percent > 0.0),
    };

    let revenue_by = |dimension, order| {
        group_values(
            engine::aggregate_sum_by(&filtered, dimension, Measure::FinalPrice, order)
                .into_entries(),
        )
    };

    let monthly_trend = engine::aggregate_sum_by(
        &filtered,
        Dimension::Month,
        Measure::FinalPrice,
        GroupOrder::KeyAscending,
    )
    .into_entries()
    .into_iter()
    .filter_map(|(key, revenue)| {
        let month = u32::try_from(key.as_integer()?).ok()?;
        Some(MonthlyPoint { month, revenue })
    })
    .collect();

    let payment_methods = engine::aggregate_value_counts(&filtered, Dimension::PaymentMethod)
        .into_iter()
        .map(|(key, count)| CountValue {
            label: key.to_string(),
            count,
        })
        .collect();

    let top_products = group_values(engine::top_n_by_sum(
        &filtered,
        Dimension::Product,
        Measure::FinalPrice,
        settings.top_products,
    ));

    let rows = filtered
        .rows()
        .iter()
        .take(settings.preview_rows)
        .map(sale_row)
        .collect();

    tracing::debug!(
        "D402: dashboard built for {} of {} rows",
        filtered.len(),
        table.len()
    );

    Ok(SalesDashboardResponse {
        filter: applied_filter(criteria),
        metrics,
        revenue_by_category: revenue_by(Dimension::Category, GroupOrder::ValueAscending),
        monthly_trend,
        revenue_by_region: revenue_by(Dimension::Region, GroupOrder::KeyAscending),
        revenue_by_segment: revenue_by(Dimension::CustomerSegment, GroupOrder::ValueDescending),
        payment_methods,
        top_products,
        rows,
        total_rows: filtered.len(),
    })
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, SalesError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        SalesError::InvalidRequest(format!("{} '{}' is not a YYYY-MM-DD date", field, value))
    })
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Absent list selects every option, a present one is taken as is
fn selection(requested: Option<&Vec<String>>, all: &[String]) -> BTreeSet<String> {
    match requested {
        Some(values) => values.iter().cloned().collect(),
        None => all.iter().cloned().collect(),
    }
}

fn group_values(entries: Vec<(GroupKey, f64)>) -> Vec<GroupValue> {
    entries
        .into_iter()
        .map(|(key, value)| GroupValue {
            label: key.to_string(),
            value,
        })
        .collect()
}

fn sale_row(record: &SaleRecord) -> SaleRowDto {
    SaleRowDto {
        order_date: format_date(record.order_date),
        category: record.category.clone(),
        product: record.product.clone(),
        final_price: record.final_price,
        quantity: record.quantity,
        customer_segment: record.customer_segment.clone(),
        region: record.region.clone(),
        payment_method: record.payment_method.clone(),
    }
}

fn applied_filter(criteria: &FilterCriteria) -> AppliedFilter {
    AppliedFilter {
        date_from: criteria.date_start.map(format_date),
        date_to: criteria.date_end.map(format_date),
        categories: criteria.categories.iter().cloned().collect(),
        regions: criteria.regions.iter().cloned().collect(),
        segments: criteria.segments.iter().cloned().collect(),
    }
}
