use crate::coercion::coerce_numeric;
use crate::schema::{Dataset, Value};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Descriptive statistics of one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub missing: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation (n - 1); undefined below two values.
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub median: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissingReport {
    pub rows: usize,
    pub missing_by_column: BTreeMap<String, usize>,
}

impl MissingReport {
    pub fn has_missing(&self) -> bool {
        self.missing_by_column.values().any(|&n| n > 0)
    }

    pub fn total_missing(&self) -> usize {
        self.missing_by_column.values().sum()
    }
}

/// Linear interpolation between closest ranks, on sorted input.
fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

fn summarize(column: &str, values: &[Option<f64>]) -> ColumnSummary {
    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    present.sort_by(|a, b| a.total_cmp(b));

    let count = present.len();
    let mean = (count > 0).then(|| present.iter().sum::<f64>() / count as f64);
    let std = match (mean, count) {
        (Some(m), n) if n >= 2 => {
            let var = present.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n - 1) as f64;
            Some(var.sqrt())
        }
        _ => None,
    };

    ColumnSummary {
        column: column.to_string(),
        count,
        missing: values.len() - count,
        mean,
        std,
        min: present.first().copied(),
        q25: quantile(&present, 0.25),
        median: quantile(&present, 0.5),
        q75: quantile(&present, 0.75),
        max: present.last().copied(),
    }
}

/// Summarizes every column whose non-missing cells are all numbers, in column order.
/// Text columns are left out; coerce them first to include them.
pub fn describe(dataset: &Dataset) -> Vec<ColumnSummary> {
    dataset
        .columns
        .iter()
        .filter(|column| {
            dataset
                .column_values(column)
                .all(|v| matches!(v, Value::Number(_) | Value::Missing))
        })
        .map(|column| summarize(column, &measure_series(dataset, column)))
        .collect()
}

pub fn missing_report(dataset: &Dataset) -> MissingReport {
    let missing_by_column = dataset
        .columns
        .iter()
        .map(|column| {
            let missing = dataset
                .column_values(column)
                .filter(|v| v.as_key().is_none())
                .count();
            (column.clone(), missing)
        })
        .collect();

    MissingReport {
        rows: dataset.len(),
        missing_by_column,
    }
}

/// Rows whose `column` cell equals `value` exactly. An absent column matches nothing.
pub fn filter_rows(dataset: &Dataset, column: &str, value: &str) -> Dataset {
    let mut out = Dataset::new(dataset.columns.clone());
    if let Some(idx) = dataset.column_index(column) {
        out.rows = dataset
            .rows
            .iter()
            .filter(|row| row.get(idx).and_then(|v| v.as_key()).as_deref() == Some(value))
            .cloned()
            .collect();
    }
    out
}

/// Numeric values of one column in row order; unparseable cells are `None`.
pub fn measure_series(dataset: &Dataset, column: &str) -> Vec<Option<f64>> {
    coerce_numeric(dataset, &[column])
        .column_values(column)
        .map(|v| v.as_number())
        .collect()
}

/// Distinct non-missing values of a column in order of first appearance.
pub fn distinct_values(dataset: &Dataset, column: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    dataset
        .column_values(column)
        .filter_map(|v| v.as_key())
        .filter(|k| seen.insert(k.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        let mut ds = Dataset::new(vec![
            "Product".to_string(),
            "Sales".to_string(),
            "Units".to_string(),
        ]);
        ds.push_row(vec![Value::text("Tea"), Value::Number(1.0), Value::Number(3.0)]);
        ds.push_row(vec![Value::text("Wine"), Value::Number(2.0), Value::Missing]);
        ds.push_row(vec![Value::text("Tea"), Value::Number(3.0), Value::Number(5.0)]);
        ds.push_row(vec![Value::text("Wine"), Value::Number(4.0), Value::text("x")]);
        ds
    }

    #[test]
    fn test_describe_numeric_columns() {
        let summaries = describe(&sample());
        assert_eq!(summaries.len(), 1);

        let sales = &summaries[0];
        assert_eq!(sales.column, "Sales");
        assert_eq!(sales.count, 4);
        assert_eq!(sales.mean, Some(2.5));
        assert!((sales.std.unwrap() - 1.2909944487358056).abs() < 1e-12);
        assert_eq!(sales.min, Some(1.0));
        assert_eq!(sales.q25, Some(1.75));
        assert_eq!(sales.median, Some(2.5));
        assert_eq!(sales.q75, Some(3.25));
        assert_eq!(sales.max, Some(4.0));
    }

    #[test]
    fn test_summary_of_sparse_column() {
        let summary = summarize("Units", &measure_series(&sample(), "Units"));
        assert_eq!(summary.count, 2);
        assert_eq!(summary.missing, 2);
        assert_eq!(summary.mean, Some(4.0));

        let single = summarize("One", &[Some(7.0), None]);
        assert_eq!(single.std, None);
        assert_eq!(single.median, Some(7.0));

        let empty = summarize("None", &[]);
        assert_eq!(empty.mean, None);
        assert_eq!(empty.q25, None);
    }

    #[test]
    fn test_missing_report() {
        let report = missing_report(&sample());
        assert!(report.has_missing());
        assert_eq!(report.missing_by_column.get("Units"), Some(&1));
        assert_eq!(report.missing_by_column.get("Sales"), Some(&0));
        assert_eq!(report.total_missing(), 1);
    }

    #[test]
    fn test_filter_and_series() {
        let tea = filter_rows(&sample(), "Product", "Tea");
        assert_eq!(tea.len(), 2);
        assert_eq!(measure_series(&tea, "Sales"), vec![Some(1.0), Some(3.0)]);
        assert!(filter_rows(&sample(), "Region", "Tea").is_empty());
    }

    #[test]
    fn test_distinct_values_first_appearance() {
        assert_eq!(distinct_values(&sample(), "Product"), vec!["Tea", "Wine"]);
    }
}
