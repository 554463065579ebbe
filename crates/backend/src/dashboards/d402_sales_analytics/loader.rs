use chrono::{Datelike, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use std::path::Path;
use std::time::Instant;

use super::error::DataFormatError;
use super::model::{SaleRecord, SalesTable, DERIVED_COLUMNS, REQUIRED_COLUMNS};

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Load the sales dataset from a CSV file.
///
/// Reads the file once; the result is independent of any earlier call.
pub fn load(path: &Path) -> Result<SalesTable, DataFormatError> {
    let started = Instant::now();
    let text = std::fs::read_to_string(path).map_err(|source| DataFormatError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let table = load_from_str(&text)?;

    tracing::info!(
        "D402: loaded {} rows from {} in {}ms",
        table.len(),
        path.display(),
        started.elapsed().as_millis()
    );
    Ok(table)
}

/// Parse CSV text into a sales table
pub fn load_from_str(csv_text: &str) -> Result<SalesTable, DataFormatError> {
    // Strip UTF-8 BOM if present
    let text = csv_text.trim_start_matches('\u{FEFF}');

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let raw_headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let columns = ColumnIndex::resolve(&raw_headers)?;

    // Derived columns already present in the source (e.g. a re-imported export)
    // are recomputed from Order_Date instead of being carried along.
    let kept: Vec<usize> = (0..raw_headers.len())
        .filter(|&i| !DERIVED_COLUMNS.contains(&raw_headers[i].as_str()))
        .collect();
    let headers: Vec<String> = kept.iter().map(|&i| raw_headers[i].clone()).collect();

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result?;
        let line = record
            .position()
            .map(|p| p.line())
            .unwrap_or(idx as u64 + 2);
        rows.push(columns.parse_record(&record, &kept, line)?);
    }

    Ok(SalesTable::new(headers, rows))
}

/// Parse the textual Order_Date into a calendar date
pub fn parse_order_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Positions of the required columns in the source header
struct ColumnIndex {
    order_date: usize,
    category: usize,
    product: usize,
    region: usize,
    customer_segment: usize,
    payment_method: usize,
    quantity: usize,
    final_price: usize,
    discount_amount: usize,
    discount_percent: usize,
}

impl ColumnIndex {
    fn resolve(headers: &[String]) -> Result<Self, DataFormatError> {
        let mut positions = [0usize; REQUIRED_COLUMNS.len()];
        for (slot, name) in positions.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| DataFormatError::MissingColumn(name.to_string()))?;
        }

        let [order_date, category, product, region, customer_segment, payment_method, quantity, final_price, discount_amount, discount_percent] =
            positions;

        Ok(Self {
            order_date,
            category,
            product,
            region,
            customer_segment,
            payment_method,
            quantity,
            final_price,
            discount_amount,
            discount_percent,
        })
    }

    fn parse_record(
        &self,
        record: &StringRecord,
        kept: &[usize],
        line: u64,
    ) -> Result<SaleRecord, DataFormatError> {
        let field = |idx: usize| record.get(idx).unwrap_or_default();

        let raw_date = field(self.order_date);
        let order_date = parse_order_date(raw_date).ok_or_else(|| DataFormatError::InvalidDate {
            row: line,
            value: raw_date.to_string(),
        })?;

        let quantity = field(self.quantity)
            .parse::<u32>()
            .map_err(|_| invalid_value(line, "Quantity", field(self.quantity)))?;
        let final_price = parse_amount(field(self.final_price), line, "Final_Price")?;
        let discount_amount = parse_amount(field(self.discount_amount), line, "Discount_Amount")?;
        let discount_percent =
            parse_amount(field(self.discount_percent), line, "Discount_Percent")?;
        if discount_percent > 100.0 {
            return Err(invalid_value(
                line,
                "Discount_Percent",
                field(self.discount_percent),
            ));
        }

        Ok(SaleRecord {
            order_date,
            category: field(self.category).to_string(),
            product: field(self.product).to_string(),
            region: field(self.region).to_string(),
            customer_segment: field(self.customer_segment).to_string(),
            payment_method: field(self.payment_method).to_string(),
            quantity,
            final_price,
            discount_amount,
            discount_percent,
            month: order_date.month(),
            month_name: order_date.format("%B").to_string(),
            year: order_date.year(),
            source: kept.iter().map(|&i| field(i).to_string()).collect(),
        })
    }
}

/// Non-negative finite decimal
fn parse_amount(value: &str, line: u64, column: &'static str) -> Result<f64, DataFormatError> {
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(invalid_value(line, column, value)),
    }
}

fn invalid_value(line: u64, column: &'static str, value: &str) -> DataFormatError {
    DataFormatError::InvalidValue {
        row: line,
        column,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Order_ID,Order_Date,Category,Product,Region,Customer_Segment,Payment_Method,Quantity,Unit_Price,Discount_Percent,Discount_Amount,Final_Price";

    fn csv(rows: &[&str]) -> String {
        let mut text = String::from(HEADER);
        for row in rows {
            text.push('\n');
            text.push_str(row);
        }
        text.push('\n');
        text
    }

    #[test]
    fn test_loads_rows_with_derived_fields() {
        let text = csv(&[
            "ORD-1,2024-01-05,Electronics,Laptop,West,Consumer,Credit Card,2,60.00,10,12.00,108.00",
            "ORD-2,2024-02-10,Books,Novel,East,Corporate,PayPal,1,50.00,0,0,50.00",
        ]);
        let table = load_from_str(&text).unwrap();

        assert_eq!(table.len(), 2);
        let first = &table.rows()[0];
        assert_eq!(first.order_date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(first.month, 1);
        assert_eq!(first.month_name, "January");
        assert_eq!(first.year, 2024);
        assert_eq!(first.quantity, 2);
        assert_eq!(first.final_price, 108.0);
        assert_eq!(first.discount_amount, 12.0);
        assert_eq!(first.discount_percent, 10.0);

        let second = &table.rows()[1];
        assert_eq!(second.month, 2);
        assert_eq!(second.month_name, "February");
        assert_eq!(second.category, "Books");
    }

    #[test]
    fn test_extra_columns_are_kept_in_source() {
        let text = csv(&[
            "ORD-77,2024-03-01,Toys,Robot,North,Consumer,Cash,3,10.00,0,0,30.00",
        ]);
        let table = load_from_str(&text).unwrap();

        assert_eq!(table.headers()[0], "Order_ID");
        assert_eq!(table.headers().len(), 12);
        assert_eq!(table.rows()[0].source[0], "ORD-77");
        assert_eq!(table.rows()[0].source[8], "10.00");
    }

    #[test]
    fn test_derived_columns_in_source_are_recomputed() {
        let text = "Order_Date,Category,Product,Region,Customer_Segment,Payment_Method,Quantity,Final_Price,Discount_Amount,Discount_Percent,Month,Month_Name,Year\n\
                    2024-05-02,Books,Novel,East,Consumer,Cash,1,5,0,0,99,Nope,1900\n";
        let table = load_from_str(text).unwrap();

        assert_eq!(table.headers().len(), 10);
        assert!(!table.headers().iter().any(|h| h == "Month"));
        let row = &table.rows()[0];
        assert_eq!(row.month, 5);
        assert_eq!(row.month_name, "May");
        assert_eq!(row.year, 2024);
        assert_eq!(row.source.len(), 10);
    }

    #[test]
    fn test_header_only_gives_empty_table() {
        let table = load_from_str(&csv(&[])).unwrap();
        assert!(table.is_empty());
        assert!(table.date_range().is_none());
    }

    #[test]
    fn test_missing_column_is_reported() {
        let text = "Order_Date,Category,Product,Region,Payment_Method,Quantity,Final_Price,Discount_Amount,Discount_Percent\n";
        match load_from_str(text) {
            Err(DataFormatError::MissingColumn(name)) => assert_eq!(name, "Customer_Segment"),
            other => panic!("Expected MissingColumn, got {:?}", other),
        }
    }

    #[test]
    fn test_unparseable_date_fails_whole_load() {
        let text = csv(&[
            "ORD-1,2024-01-05,Books,Novel,East,Consumer,Cash,1,5,0,0,5",
            "ORD-2,not-a-date,Books,Novel,East,Consumer,Cash,1,5,0,0,5",
        ]);
        match load_from_str(&text) {
            Err(DataFormatError::InvalidDate { row, value }) => {
                assert_eq!(row, 3);
                assert_eq!(value, "not-a-date");
            }
            other => panic!("Expected InvalidDate, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_quantity_is_rejected() {
        let text = csv(&["ORD-1,2024-01-05,Books,Novel,East,Consumer,Cash,-1,5,0,0,5"]);
        assert!(matches!(
            load_from_str(&text),
            Err(DataFormatError::InvalidValue { column: "Quantity", .. })
        ));
    }

    #[test]
    fn test_discount_percent_above_hundred_is_rejected() {
        let text = csv(&["ORD-1,2024-01-05,Books,Novel,East,Consumer,Cash,1,5,150,0,5"]);
        assert!(matches!(
            load_from_str(&text),
            Err(DataFormatError::InvalidValue { column: "Discount_Percent", .. })
        ));
    }

    #[test]
    fn test_ragged_row_is_malformed() {
        let text = csv(&["ORD-1,2024-01-05,Books"]);
        assert!(matches!(load_from_str(&text), Err(DataFormatError::Malformed(_))));
    }

    #[test]
    fn test_bom_is_stripped() {
        let text = format!(
            "\u{FEFF}{}",
            csv(&["ORD-1,2024-01-05,Books,Novel,East,Consumer,Cash,1,5,0,0,5"])
        );
        let table = load_from_str(&text).unwrap();
        assert_eq!(table.headers()[0], "Order_ID");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_parse_order_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 7, 9).unwrap();
        assert_eq!(parse_order_date("2024-07-09"), Some(expected));
        assert_eq!(parse_order_date("2024/07/09"), Some(expected));
        assert_eq!(parse_order_date("07/09/2024"), Some(expected));
        assert_eq!(parse_order_date("2024-07-09 13:45:00"), Some(expected));
        assert_eq!(parse_order_date("2024-07-09T13:45:00"), Some(expected));
        assert_eq!(parse_order_date("2024-13-40"), None);
        assert_eq!(parse_order_date(""), None);
    }

    #[test]
    fn test_load_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut tmp = NamedTempFile::new().unwrap();
        write!(
            tmp,
            "{}",
            csv(&["ORD-1,2023-12-31,Books,Novel,East,Consumer,Cash,1,5,0,0,5"])
        )
        .unwrap();

        let table = load(tmp.path()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].month_name, "December");
        assert_eq!(table.rows()[0].year, 2023);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = load(Path::new("/definitely/not/here/sales_data.csv"));
        assert!(matches!(result, Err(DataFormatError::Io { .. })));
    }
}
