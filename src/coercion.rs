use crate::schema::{Dataset, Value};
use log::debug;
use std::collections::BTreeMap;

/// Per-column outcome of a coercion pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnCoercion {
    pub parsed: usize,
    pub set_missing: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoercionReport {
    pub columns: BTreeMap<String, ColumnCoercion>,
    pub absent_columns: Vec<String>,
}

/// Parses a cell as a number. Surrounding whitespace is ignored; NaN counts as unparseable.
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| !n.is_nan())
}

fn coerce_value(value: &Value) -> Value {
    match value {
        Value::Number(n) if n.is_nan() => Value::Missing,
        Value::Number(n) => Value::Number(*n),
        Value::Text(s) => parse_number(s).map(Value::Number).unwrap_or(Value::Missing),
        Value::Missing => Value::Missing,
    }
}

/// Returns a copy of `dataset` where every cell of `columns` is a number or `Missing`.
/// Columns not present in the dataset are ignored. Applying it twice is the same as once.
pub fn coerce_numeric(dataset: &Dataset, columns: &[&str]) -> Dataset {
    coerce_numeric_with_report(dataset, columns).0
}

pub fn coerce_numeric_with_report(dataset: &Dataset, columns: &[&str]) -> (Dataset, CoercionReport) {
    let mut out = dataset.clone();
    let mut report = CoercionReport::default();

    for column in columns {
        let Some(idx) = dataset.column_index(column) else {
            report.absent_columns.push(column.to_string());
            continue;
        };

        let stats = report.columns.entry(column.to_string()).or_default();
        for row in &mut out.rows {
            if let Some(cell) = row.get_mut(idx) {
                let coerced = coerce_value(cell);
                if !cell.is_missing() {
                    if coerced.is_missing() {
                        stats.set_missing += 1;
                    } else {
                        stats.parsed += 1;
                    }
                }
                *cell = coerced;
            }
        }
    }

    for (column, stats) in &report.columns {
        if stats.set_missing > 0 {
            debug!(
                "Column '{}': {} cells could not be parsed as numbers and were set missing",
                column, stats.set_missing
            );
        }
    }

    (out, report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset {
            columns: vec!["Country".to_string(), "Profit".to_string()],
            rows: vec![
                vec![Value::text("GE"), Value::text("100")],
                vec![Value::text("GE"), Value::text(" 2.5e2 ")],
                vec![Value::text("AM"), Value::text("n/a")],
                vec![Value::text("AM"), Value::Missing],
                vec![Value::text("AM"), Value::Number(f64::NAN)],
                vec![Value::text("AM"), Value::Number(-7.0)],
            ],
        }
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("42"), Some(42.0));
        assert_eq!(parse_number(" -3.5 "), Some(-3.5));
        assert_eq!(parse_number("1,200"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn test_coerce_numeric_tolerates_text() {
        let (coerced, report) = coerce_numeric_with_report(&sample(), &["Profit"]);
        let profits: Vec<Value> = coerced.column_values("Profit").cloned().collect();
        assert_eq!(
            profits,
            vec![
                Value::Number(100.0),
                Value::Number(250.0),
                Value::Missing,
                Value::Missing,
                Value::Missing,
                Value::Number(-7.0),
            ]
        );

        let stats = report.columns.get("Profit").unwrap();
        assert_eq!(stats.parsed, 3);
        assert_eq!(stats.set_missing, 2);
    }

    #[test]
    fn test_coerce_leaves_other_columns() {
        let coerced = coerce_numeric(&sample(), &["Profit"]);
        let countries: Vec<&Value> = coerced.column_values("Country").collect();
        assert_eq!(countries[0], &Value::text("GE"));
    }

    #[test]
    fn test_coerce_is_idempotent() {
        let once = coerce_numeric(&sample(), &["Profit", "Country"]);
        let twice = coerce_numeric(&once, &["Profit", "Country"]);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_absent_column_is_ignored() {
        let mut original = sample();
        original.rows.truncate(4);
        let (coerced, report) = coerce_numeric_with_report(&original, &["Weight"]);
        assert_eq!(coerced, original);
        assert_eq!(report.absent_columns, vec!["Weight".to_string()]);
    }
}
