use chrono::NaiveDate;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Source columns every dataset must provide
pub const REQUIRED_COLUMNS: [&str; 10] = [
    "Order_Date",
    "Category",
    "Product",
    "Region",
    "Customer_Segment",
    "Payment_Method",
    "Quantity",
    "Final_Price",
    "Discount_Amount",
    "Discount_Percent",
];

/// Columns derived from Order_Date at load time, appended after the source columns
pub const DERIVED_COLUMNS: [&str; 3] = ["Month", "Month_Name", "Year"];

/// One validated row of the sales dataset
#[derive(Debug, Clone, PartialEq)]
pub struct SaleRecord {
    pub order_date: NaiveDate,
    pub category: String,
    pub product: String,
    pub region: String,
    pub customer_segment: String,
    pub payment_method: String,
    pub quantity: u32,
    /// Post-discount revenue of the row
    pub final_price: f64,
    pub discount_amount: f64,
    /// 0..=100
    pub discount_percent: f64,
    /// 1..=12
    pub month: u32,
    /// English full month name ("January")
    pub month_name: String,
    pub year: i32,
    /// Raw text of every source column, in header order
    pub source: Vec<String>,
}

/// Ordered, immutable collection of sale records.
///
/// A filtered table shares the header list of the table it came from and
/// owns its own copies of the matching rows, so the source is never touched.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesTable {
    headers: Arc<[String]>,
    rows: Vec<SaleRecord>,
}

impl SalesTable {
    pub fn new(headers: Vec<String>, rows: Vec<SaleRecord>) -> Self {
        Self {
            headers: headers.into(),
            rows,
        }
    }

    /// Build a table with the same columns holding `rows`
    pub(crate) fn derive(&self, rows: Vec<SaleRecord>) -> Self {
        Self {
            headers: Arc::clone(&self.headers),
            rows,
        }
    }

    /// Source column names in file order
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[SaleRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Earliest and latest order date, None for an empty table
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.rows.first()?.order_date;
        Some(self.rows.iter().fold((first, first), |(lo, hi), r| {
            (lo.min(r.order_date), hi.max(r.order_date))
        }))
    }
}

/// Option lists for the filter widgets
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOptions {
    pub categories: Vec<String>,
    pub regions: Vec<String>,
    pub segments: Vec<String>,
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
}

impl FilterOptions {
    /// Must be called on the unfiltered table. Options computed from a
    /// filtered view would hide values the user deselected elsewhere.
    pub fn from_table(table: &SalesTable) -> Self {
        let range = table.date_range();
        Self {
            categories: distinct(table.rows(), |r| &r.category),
            regions: distinct(table.rows(), |r| &r.region),
            segments: distinct(table.rows(), |r| &r.customer_segment),
            min_date: range.map(|(lo, _)| lo),
            max_date: range.map(|(_, hi)| hi),
        }
    }
}

/// Distinct values in first-seen order
fn distinct<F>(rows: &[SaleRecord], field: F) -> Vec<String>
where
    F: Fn(&SaleRecord) -> &String,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for row in rows {
        let value = field(row);
        if seen.insert(value.as_str()) {
            out.push(value.clone());
        }
    }
    out
}

/// Value a row is grouped under
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupKey {
    Integer(i64),
    Text(String),
}

impl GroupKey {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            GroupKey::Integer(i) => Some(*i),
            GroupKey::Text(_) => None,
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Integer(i) => write!(f, "{}", i),
            GroupKey::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for GroupKey {
    fn from(value: &str) -> Self {
        GroupKey::Text(value.to_string())
    }
}

impl From<i64> for GroupKey {
    fn from(value: i64) -> Self {
        GroupKey::Integer(value)
    }
}

/// Columns usable as a group-by / value-count key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Category,
    Product,
    Region,
    CustomerSegment,
    PaymentMethod,
    Month,
    MonthName,
    Year,
}

impl Dimension {
    pub fn column_name(&self) -> &'static str {
        match self {
            Dimension::Category => "Category",
            Dimension::Product => "Product",
            Dimension::Region => "Region",
            Dimension::CustomerSegment => "Customer_Segment",
            Dimension::PaymentMethod => "Payment_Method",
            Dimension::Month => "Month",
            Dimension::MonthName => "Month_Name",
            Dimension::Year => "Year",
        }
    }

    pub fn key(&self, record: &SaleRecord) -> GroupKey {
        match self {
            Dimension::Category => GroupKey::Text(record.category.clone()),
            Dimension::Product => GroupKey::Text(record.product.clone()),
            Dimension::Region => GroupKey::Text(record.region.clone()),
            Dimension::CustomerSegment => GroupKey::Text(record.customer_segment.clone()),
            Dimension::PaymentMethod => GroupKey::Text(record.payment_method.clone()),
            Dimension::Month => GroupKey::Integer(i64::from(record.month)),
            Dimension::MonthName => GroupKey::Text(record.month_name.clone()),
            Dimension::Year => GroupKey::Integer(i64::from(record.year)),
        }
    }
}

/// Numeric columns that can be summed or averaged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Measure {
    FinalPrice,
    DiscountAmount,
    DiscountPercent,
    Quantity,
}

impl Measure {
    pub fn column_name(&self) -> &'static str {
        match self {
            Measure::FinalPrice => "Final_Price",
            Measure::DiscountAmount => "Discount_Amount",
            Measure::DiscountPercent => "Discount_Percent",
            Measure::Quantity => "Quantity",
        }
    }

    pub fn value(&self, record: &SaleRecord) -> f64 {
        match self {
            Measure::FinalPrice => record.final_price,
            Measure::DiscountAmount => record.discount_amount,
            Measure::DiscountPercent => record.discount_percent,
            Measure::Quantity => f64::from(record.quantity),
        }
    }
}
