use super::error::SalesError;
use super::model::{SalesTable, DERIVED_COLUMNS};

/// Serialize a (typically filtered) table to CSV bytes.
///
/// Columns are the source header followed by Month, Month_Name and Year.
/// Source fields are written as they were read, so re-loading the output
/// yields the same records.
pub fn export_csv(table: &SalesTable) -> Result<Vec<u8>, SalesError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(
            table
                .headers()
                .iter()
                .map(String::as_str)
                .chain(DERIVED_COLUMNS),
        )
        .map_err(|e| SalesError::Export(e.to_string()))?;

    for row in table.rows() {
        let month = row.month.to_string();
        let year = row.year.to_string();
        writer
            .write_record(
                row.source
                    .iter()
                    .map(String::as_str)
                    .chain([month.as_str(), row.month_name.as_str(), year.as_str()]),
            )
            .map_err(|e| SalesError::Export(e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| SalesError::Export(e.to_string()))?;

    tracing::debug!("D402: exported {} rows ({} bytes)", table.len(), bytes.len());
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboards::d402_sales_analytics::engine::{filter, FilterCriteria};
    use crate::dashboards::d402_sales_analytics::loader::load_from_str;
    use crate::dashboards::d402_sales_analytics::model::FilterOptions;

    const SAMPLE_CSV: &str = "\
Order_ID,Order_Date,Category,Product,Region,Customer_Segment,Payment_Method,Quantity,Final_Price,Discount_Amount,Discount_Percent
ORD-1,2024-01-05,Books,\"Novel, Hardcover\",West,Consumer,Credit Card,1,100.50,0,0
ORD-2,2024-02-10,Toys,Puzzle,East,Corporate,PayPal,2,50,5,10
ORD-3,2024-03-01,Books,Atlas,East,Consumer,Cash,1,30,0,0
";

    #[test]
    fn test_export_appends_derived_columns() {
        let table = load_from_str(SAMPLE_CSV).unwrap();
        let text = String::from_utf8(export_csv(&table).unwrap()).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next().unwrap(),
            "Order_ID,Order_Date,Category,Product,Region,Customer_Segment,Payment_Method,Quantity,Final_Price,Discount_Amount,Discount_Percent,Month,Month_Name,Year"
        );
        assert_eq!(
            lines.next().unwrap(),
            "ORD-1,2024-01-05,Books,\"Novel, Hardcover\",West,Consumer,Credit Card,1,100.50,0,0,1,January,2024"
        );
        assert_eq!(lines.count(), 2);
    }

    #[test]
    fn test_reloaded_export_matches_filtered_table() {
        let table = load_from_str(SAMPLE_CSV).unwrap();
        let mut criteria = FilterCriteria::all(&FilterOptions::from_table(&table));
        criteria.categories.remove("Toys");
        let filtered = filter(&table, &criteria).unwrap();

        let bytes = export_csv(&filtered).unwrap();
        let reloaded = load_from_str(std::str::from_utf8(&bytes).unwrap()).unwrap();

        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.headers(), filtered.headers());
        assert_eq!(reloaded.rows(), filtered.rows());
    }

    #[test]
    fn test_empty_table_exports_header_only() {
        let table = load_from_str(SAMPLE_CSV).unwrap();
        let mut criteria = FilterCriteria::all(&FilterOptions::from_table(&table));
        criteria.regions.clear();
        let empty = filter(&table, &criteria).unwrap();

        let text = String::from_utf8(export_csv(&empty).unwrap()).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.ends_with("Month,Month_Name,Year\n"));
    }
}
