use serde::{Deserialize, Serialize};

/// Suggested file name for the filtered CSV download
pub const EXPORT_FILE_NAME: &str = "filtered_sales_data.csv";

/// Filter selection sent by the dashboard sidebar
///
/// A list that is absent selects every value of that dimension.
/// An explicitly empty list selects nothing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SalesFilterRequest {
    /// Inclusive start date in format "YYYY-MM-DD", absent means no lower bound
    #[serde(default)]
    pub date_from: Option<String>,
    /// Inclusive end date in format "YYYY-MM-DD", absent means no upper bound
    #[serde(default)]
    pub date_to: Option<String>,
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    #[serde(default)]
    pub regions: Option<Vec<String>>,
    #[serde(default)]
    pub segments: Option<Vec<String>>,
}

/// Complete option lists for the filter widgets.
/// Always computed from the unfiltered dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterOptionsDto {
    pub categories: Vec<String>,
    pub regions: Vec<String>,
    pub segments: Vec<String>,
    /// Earliest order date, None for an empty dataset
    pub min_date: Option<String>,
    /// Latest order date, None for an empty dataset
    pub max_date: Option<String>,
}

/// Criteria actually applied after defaults were resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedFilter {
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub categories: Vec<String>,
    pub regions: Vec<String>,
    pub segments: Vec<String>,
}

/// Values behind the four metric cards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetrics {
    /// Sum of Final_Price
    pub total_revenue: f64,
    /// Mean of Final_Price, 0 when nothing matches
    pub avg_order_value: f64,
    pub order_count: usize,
    /// Sum of Quantity
    pub total_quantity: u64,
    /// Distinct customer segments among the matching orders
    pub segment_count: usize,
    /// Sum of Discount_Amount
    pub total_discount: f64,
    /// Orders with Discount_Percent above zero
    pub discounted_orders: usize,
}

/// One bar/slice of a revenue chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupValue {
    pub label: String,
    pub value: f64,
}

/// One point of the monthly trend line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyPoint {
    /// Month number (1-12)
    pub month: u32,
    pub revenue: f64,
}

/// Number of orders for one categorical value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountValue {
    pub label: String,
    pub count: usize,
}

/// Row of the detailed sales table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleRowDto {
    /// Order date in format "YYYY-MM-DD"
    pub order_date: String,
    pub category: String,
    pub product: String,
    pub final_price: f64,
    pub quantity: u32,
    pub customer_segment: String,
    pub region: String,
    pub payment_method: String,
}

/// Response for the sales analytics dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesDashboardResponse {
    pub filter: AppliedFilter,
    pub metrics: SummaryMetrics,
    /// Ascending by revenue
    pub revenue_by_category: Vec<GroupValue>,
    /// Ascending by month number
    pub monthly_trend: Vec<MonthlyPoint>,
    /// Ascending by region name
    pub revenue_by_region: Vec<GroupValue>,
    /// Descending by revenue
    pub revenue_by_segment: Vec<GroupValue>,
    /// Descending by order count
    pub payment_methods: Vec<CountValue>,
    /// Best selling products, descending by revenue
    pub top_products: Vec<GroupValue>,
    /// Leading rows of the filtered table
    pub rows: Vec<SaleRowDto>,
    /// Number of rows matching the filter
    pub total_rows: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_request_selects_everything() {
        let request: SalesFilterRequest = serde_json::from_str("{}").unwrap();
        assert!(request.date_from.is_none());
        assert!(request.categories.is_none());
        assert!(request.regions.is_none());
        assert!(request.segments.is_none());
    }

    #[test]
    fn test_explicit_empty_list_is_kept() {
        let request: SalesFilterRequest =
            serde_json::from_str(r#"{"categories": [], "date_from": "2024-01-01"}"#).unwrap();
        assert_eq!(request.categories, Some(vec![]));
        assert_eq!(request.date_from.as_deref(), Some("2024-01-01"));
    }
}
