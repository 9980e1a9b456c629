use crate::calendar::{month_from_name, month_index};
use crate::coercion::coerce_numeric;
use crate::error::{Result, SalesEngineError};
use crate::schema::{Aggregation, Dataset, EmptyCell, MeasureSpec};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// One key part per grouping column, taken verbatim from the cells.
pub type GroupKey = Vec<String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    pub key: GroupKey,
    /// Number of source rows that fell into this group.
    pub rows: usize,
    /// Aggregated value per measure column. `None` is an undefined mean (no numeric values).
    pub values: BTreeMap<String, Option<f64>>,
}

impl AggregateRow {
    pub fn value(&self, measure: &str) -> Option<f64> {
        self.values.get(measure).copied().flatten()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateTable {
    pub group_columns: Vec<String>,
    pub measures: Vec<MeasureSpec>,
    /// Requested measures whose column is not in the dataset.
    pub skipped_measures: Vec<String>,
    pub groups: Vec<AggregateRow>,
}

#[derive(Default, Clone, Copy)]
struct Accumulator {
    sum: f64,
    count: usize,
}

impl Accumulator {
    fn finish(&self, aggregation: Aggregation) -> Option<f64> {
        match aggregation {
            Aggregation::Sum => Some(self.sum),
            Aggregation::Mean if self.count == 0 => None,
            Aggregation::Mean => Some(self.sum / self.count as f64),
        }
    }
}

/// Drops repeated specs. A column asked for with two different aggregations is an error,
/// since each aggregate row holds one value per column.
pub fn distinct_measures(measures: &[MeasureSpec]) -> Result<Vec<MeasureSpec>> {
    let mut out: Vec<MeasureSpec> = Vec::with_capacity(measures.len());
    for measure in measures {
        match out.iter().find(|m| m.column == measure.column) {
            Some(existing) if existing.aggregation != measure.aggregation => {
                return Err(SalesEngineError::ConflictingMeasure(measure.column.clone()));
            }
            Some(_) => {}
            None => out.push(measure.clone()),
        }
    }
    Ok(out)
}

/// Groups `dataset` by one or two columns and aggregates each measure per group.
///
/// Rows with a missing grouping value are dropped. Keys are compared exactly as they
/// appear, so "GE", "GE " and "ge" are three different groups. Measures whose column is
/// absent are listed in `skipped_measures`; an absent grouping column yields an empty table.
/// Repeated specs are collapsed into one. Groups come back in key order.
pub fn aggregate(
    dataset: &Dataset,
    group_by: &[&str],
    measures: &[MeasureSpec],
) -> Result<AggregateTable> {
    if group_by.is_empty() || group_by.len() > 2 {
        return Err(SalesEngineError::InvalidGrouping(format!(
            "expected one or two grouping columns, got {}",
            group_by.len()
        )));
    }

    let measures = distinct_measures(measures)?;
    let (present, skipped): (Vec<MeasureSpec>, Vec<MeasureSpec>) = measures
        .into_iter()
        .partition(|m| dataset.has_column(&m.column));

    for measure in &skipped {
        warn!(
            "Measure column '{}' is not in the dataset; skipping it",
            measure.column
        );
    }

    let mut table = AggregateTable {
        group_columns: group_by.iter().map(|c| c.to_string()).collect(),
        measures: present,
        skipped_measures: skipped.into_iter().map(|m| m.column).collect(),
        groups: Vec::new(),
    };

    let key_indices: Option<Vec<usize>> =
        group_by.iter().map(|c| dataset.column_index(c)).collect();
    let Some(key_indices) = key_indices else {
        warn!("Grouping columns {:?} are not all in the dataset", group_by);
        return Ok(table);
    };

    let measure_columns: Vec<&str> = table.measures.iter().map(|m| m.column.as_str()).collect();
    let coerced = coerce_numeric(dataset, &measure_columns);
    let measure_indices: Vec<usize> = measure_columns
        .iter()
        .filter_map(|c| coerced.column_index(c))
        .collect();

    let mut groups: BTreeMap<GroupKey, (usize, Vec<Accumulator>)> = BTreeMap::new();
    let mut dropped = 0usize;

    for row in &coerced.rows {
        let key: Option<GroupKey> = key_indices
            .iter()
            .map(|&i| row.get(i).and_then(|v| v.as_key()))
            .collect();
        let Some(key) = key else {
            dropped += 1;
            continue;
        };

        let (count, accumulators) = groups
            .entry(key)
            .or_insert_with(|| (0, vec![Accumulator::default(); measure_indices.len()]));
        *count += 1;

        for (acc, &idx) in accumulators.iter_mut().zip(&measure_indices) {
            if let Some(n) = row.get(idx).and_then(|v| v.as_number()) {
                acc.sum += n;
                acc.count += 1;
            }
        }
    }

    if dropped > 0 {
        debug!(
            "Dropped {} rows with a missing value in {:?}",
            dropped, group_by
        );
    }

    table.groups = groups
        .into_iter()
        .map(|(key, (rows, accumulators))| AggregateRow {
            key,
            rows,
            values: table
                .measures
                .iter()
                .zip(&accumulators)
                .map(|(m, acc)| (m.column.clone(), acc.finish(m.aggregation)))
                .collect(),
        })
        .collect();

    Ok(table)
}

/// Orders defined values before undefined ones.
fn compare_defined(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Sort key placing calendar months in calendar order and anything else after them.
fn calendar_sort_key(value: &str) -> (usize, &str) {
    match month_from_name(value) {
        Some(month) => (month_index(month), ""),
        None => (12, value),
    }
}

impl AggregateTable {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, key: &[&str]) -> Option<&AggregateRow> {
        self.groups
            .iter()
            .find(|g| g.key.iter().map(String::as_str).eq(key.iter().copied()))
    }

    pub fn value(&self, key: &[&str], measure: &str) -> Option<f64> {
        self.get(key).and_then(|g| g.value(measure))
    }

    pub fn has_measure(&self, measure: &str) -> bool {
        self.measures.iter().any(|m| m.column == measure)
    }

    /// Sum of the defined values of a measure over all groups.
    pub fn total(&self, measure: &str) -> f64 {
        self.groups.iter().filter_map(|g| g.value(measure)).sum()
    }

    pub fn sort_by_key(&mut self) {
        self.groups.sort_by(|a, b| a.key.cmp(&b.key));
    }

    /// Sorts groups by a measure. Undefined values always sort last.
    pub fn sort_by_measure(&mut self, measure: &str, descending: bool) {
        self.groups.sort_by(|a, b| {
            let (x, y) = (a.value(measure), b.value(measure));
            match (x, y) {
                (Some(_), Some(_)) if descending => compare_defined(y, x),
                _ => compare_defined(x, y),
            }
        });
    }

    /// Keeps the `n` groups with the largest values of `measure`, largest first.
    pub fn top_n(mut self, measure: &str, n: usize) -> Self {
        self.sort_by_measure(measure, true);
        self.groups.truncate(n);
        self
    }

    /// Orders groups by the calendar position of key part `part`; unrecognized names follow
    /// in lexicographic order.
    pub fn sort_by_calendar_month(&mut self, part: usize) {
        self.groups.sort_by(|a, b| {
            let x = a.key.get(part).map(|s| calendar_sort_key(s));
            let y = b.key.get(part).map(|s| calendar_sort_key(s));
            x.cmp(&y)
        });
    }
}

/// A two-dimensional category × category table of one measure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotTable {
    pub row_column: String,
    pub column_column: String,
    pub measure: MeasureSpec,
    pub empty_cell: EmptyCell,
    pub row_keys: Vec<String>,
    pub column_keys: Vec<String>,
    /// `cells[r][c]` for `row_keys[r]` × `column_keys[c]`.
    pub cells: Vec<Vec<Option<f64>>>,
}

/// Pivots `measure` with `row_key` values as rows and `column_key` values as columns.
///
/// Combinations with no rows are `Some(0.0)` under `EmptyCell::Zero` and `None` under
/// `EmptyCell::Absent`. A combination whose mean is undefined is `None` under either policy.
/// Returns `Ok(None)` when the measure column is not in the dataset.
pub fn pivot(
    dataset: &Dataset,
    row_key: &str,
    column_key: &str,
    measure: &MeasureSpec,
    empty_cell: EmptyCell,
) -> Result<Option<PivotTable>> {
    if !dataset.has_column(&measure.column) {
        warn!(
            "Measure column '{}' is not in the dataset; no pivot produced",
            measure.column
        );
        return Ok(None);
    }

    let table = aggregate(dataset, &[row_key, column_key], std::slice::from_ref(measure))?;

    let row_keys: Vec<String> = table
        .groups
        .iter()
        .map(|g| g.key[0].clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let column_keys: Vec<String> = table
        .groups
        .iter()
        .map(|g| g.key[1].clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let filler = match empty_cell {
        EmptyCell::Zero => Some(0.0),
        EmptyCell::Absent => None,
    };
    let mut cells = vec![vec![filler; column_keys.len()]; row_keys.len()];

    for group in &table.groups {
        let r = row_keys.binary_search(&group.key[0]);
        let c = column_keys.binary_search(&group.key[1]);
        if let (Ok(r), Ok(c)) = (r, c) {
            cells[r][c] = group.value(&measure.column);
        }
    }

    Ok(Some(PivotTable {
        row_column: row_key.to_string(),
        column_column: column_key.to_string(),
        measure: measure.clone(),
        empty_cell,
        row_keys,
        column_keys,
        cells,
    }))
}

impl PivotTable {
    pub fn cell(&self, row: &str, column: &str) -> Option<f64> {
        let r = self.row_keys.iter().position(|k| k == row)?;
        let c = self.column_keys.iter().position(|k| k == column)?;
        self.cells[r][c]
    }

    /// Sum of the defined cells in a row, or `None` for an unknown row.
    pub fn row_total(&self, row: &str) -> Option<f64> {
        let r = self.row_keys.iter().position(|k| k == row)?;
        Some(self.cells[r].iter().flatten().sum())
    }

    pub fn column_total(&self, column: &str) -> Option<f64> {
        let c = self.column_keys.iter().position(|k| k == column)?;
        Some(self.cells.iter().filter_map(|row| row[c]).sum())
    }

    /// Reorders the columns so calendar month names come in calendar order.
    pub fn sort_columns_by_calendar(&mut self) {
        let mut order: Vec<usize> = (0..self.column_keys.len()).collect();
        order.sort_by(|&a, &b| {
            calendar_sort_key(&self.column_keys[a]).cmp(&calendar_sort_key(&self.column_keys[b]))
        });

        self.column_keys = order.iter().map(|&i| self.column_keys[i].clone()).collect();
        for row in &mut self.cells {
            *row = order.iter().map(|&i| row[i]).collect();
        }
    }
}
