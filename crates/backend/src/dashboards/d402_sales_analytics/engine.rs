use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap, HashSet};

use super::error::InvalidRangeError;
use super::model::{Dimension, FilterOptions, GroupKey, Measure, SaleRecord, SalesTable};

/// User selection applied to the sales table.
///
/// Date bounds are inclusive; a missing bound leaves that side open.
/// Categorical sets are exclusive: an empty set matches no row, so callers
/// wanting "everything" pass the full option list (see [`FilterCriteria::all`]).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterCriteria {
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
    pub categories: BTreeSet<String>,
    pub regions: BTreeSet<String>,
    pub segments: BTreeSet<String>,
}

impl FilterCriteria {
    /// Every option selected over the full date range
    pub fn all(options: &FilterOptions) -> Self {
        Self {
            date_start: options.min_date,
            date_end: options.max_date,
            categories: options.categories.iter().cloned().collect(),
            regions: options.regions.iter().cloned().collect(),
            segments: options.segments.iter().cloned().collect(),
        }
    }

    pub fn validate(&self) -> Result<(), InvalidRangeError> {
        match (self.date_start, self.date_end) {
            (Some(start), Some(end)) if start > end => Err(InvalidRangeError { start, end }),
            _ => Ok(()),
        }
    }

    pub fn matches(&self, record: &SaleRecord) -> bool {
        self.date_start.map_or(true, |start| record.order_date >= start)
            && self.date_end.map_or(true, |end| record.order_date <= end)
            && self.categories.contains(&record.category)
            && self.regions.contains(&record.region)
            && self.segments.contains(&record.customer_segment)
    }
}

/// Rows matching all criteria, in source order.
/// The input table is left as is; an empty result is not an error.
pub fn filter(table: &SalesTable, criteria: &FilterCriteria) -> Result<SalesTable, InvalidRangeError> {
    criteria.validate()?;

    let rows: Vec<SaleRecord> = table
        .rows()
        .iter()
        .filter(|&r| criteria.matches(r))
        .cloned()
        .collect();

    tracing::debug!("D402: filter kept {} of {} rows", rows.len(), table.len());
    Ok(table.derive(rows))
}

/// Ordering applied to grouped results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupOrder {
    /// Order in which groups first appear in the table
    FirstSeen,
    KeyAscending,
    ValueAscending,
    ValueDescending,
}

/// Ordered mapping from group value to summed measure
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AggregateView {
    entries: Vec<(GroupKey, f64)>,
}

impl AggregateView {
    pub fn entries(&self) -> &[(GroupKey, f64)] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<(GroupKey, f64)> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &GroupKey) -> Option<f64> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| *v)
    }

    /// Sum over all groups
    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, v)| v).sum()
    }
}

/// Sum of `measure` per distinct value of `dimension`.
///
/// Value orders are stable sorts, so groups with equal sums keep the order
/// in which they first appear in the table.
pub fn aggregate_sum_by(
    table: &SalesTable,
    dimension: Dimension,
    measure: Measure,
    order: GroupOrder,
) -> AggregateView {
    let mut entries = group_fold(table.rows(), dimension, 0.0, |acc, r| {
        *acc += measure.value(r)
    });

    match order {
        GroupOrder::FirstSeen => {}
        GroupOrder::KeyAscending => entries.sort_by(|a, b| a.0.cmp(&b.0)),
        GroupOrder::ValueAscending => entries.sort_by(|a, b| a.1.total_cmp(&b.1)),
        GroupOrder::ValueDescending => entries.sort_by(|a, b| b.1.total_cmp(&a.1)),
    }

    tracing::trace!(
        "D402: {} by {}: {} groups",
        measure.column_name(),
        dimension.column_name(),
        entries.len()
    );
    AggregateView { entries }
}

/// Sum of `measure` over the whole table, 0 for an empty table
pub fn aggregate_total(table: &SalesTable, measure: Measure) -> f64 {
    table.rows().iter().map(|r| measure.value(r)).sum()
}

/// Mean of `measure`. The mean of an empty table is defined as 0.
pub fn aggregate_mean(table: &SalesTable, measure: Measure) -> f64 {
    if table.is_empty() {
        return 0.0;
    }
    aggregate_total(table, measure) / table.len() as f64
}

pub fn aggregate_count(table: &SalesTable) -> usize {
    table.len()
}

/// Row count per group value
pub type CountView = Vec<(GroupKey, usize)>;

/// Number of rows per distinct value, most frequent first.
/// Equal counts keep first-seen order.
pub fn aggregate_value_counts(table: &SalesTable, dimension: Dimension) -> CountView {
    let mut counts = group_fold(table.rows(), dimension, 0usize, |acc, _| *acc += 1);
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// The `n` groups with the largest sums, descending.
/// Returns `min(n, distinct groups)` entries.
pub fn top_n_by_sum(
    table: &SalesTable,
    dimension: Dimension,
    measure: Measure,
    n: usize,
) -> Vec<(GroupKey, f64)> {
    let mut entries =
        aggregate_sum_by(table, dimension, measure, GroupOrder::ValueDescending).into_entries();
    entries.truncate(n);
    entries
}

pub fn count_where<P>(table: &SalesTable, predicate: P) -> usize
where
    P: Fn(&SaleRecord) -> bool,
{
    table.rows().iter().filter(|&r| predicate(r)).count()
}

pub fn distinct_count(table: &SalesTable, dimension: Dimension) -> usize {
    table
        .rows()
        .iter()
        .map(|r| dimension.key(r))
        .collect::<HashSet<_>>()
        .len()
}

/// Fold rows into one accumulator per group, groups in first-seen order
fn group_fold<T, F>(rows: &[SaleRecord], dimension: Dimension, init: T, step: F) -> Vec<(GroupKey, T)>
where
    T: Clone,
    F: Fn(&mut T, &SaleRecord),
{
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<(GroupKey, T)> = Vec::new();

    for row in rows {
        let key = dimension.key(row);
        let slot = match index.get(&key) {
            Some(&slot) => slot,
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, init.clone()));
                groups.len() - 1
            }
        };
        step(&mut groups[slot].1, row);
    }

    groups
}
