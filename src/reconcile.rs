use crate::aggregation::{AggregateTable, PivotTable};
use crate::error::{Result, SalesEngineError};
use crate::schema::Aggregation;

/// Checks that each pivot row adds up to the single-key sum for the same category.
///
/// Only meaningful for summed measures; mean pivots are accepted as-is.
pub fn verify_pivot_margins(pivot: &PivotTable, table: &AggregateTable, tolerance: f64) -> Result<()> {
    if pivot.measure.aggregation != Aggregation::Sum {
        return Ok(());
    }

    let measure = &pivot.measure.column;
    for row in &pivot.row_keys {
        let pivot_total = pivot.row_total(row).unwrap_or(0.0);
        let table_total = table.value(&[row.as_str()], measure).unwrap_or(0.0);

        if (pivot_total - table_total).abs() > tolerance {
            return Err(SalesEngineError::MarginMismatch {
                row: row.clone(),
                pivot_total,
                table_total,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::{aggregate, pivot};
    use crate::schema::{Dataset, EmptyCell, MeasureSpec, Value};

    fn dataset() -> Dataset {
        let mut ds = Dataset::new(vec![
            "Country".to_string(),
            "Month".to_string(),
            "Amount".to_string(),
        ]);
        ds.push_row(vec![Value::text("GE"), Value::text("January"), Value::Number(10.0)]);
        ds.push_row(vec![Value::text("GE"), Value::text("March"), Value::Number(5.0)]);
        ds.push_row(vec![Value::text("TR"), Value::Missing, Value::Number(7.0)]);
        ds.push_row(vec![Value::text("TR"), Value::text("May"), Value::Number(1.0)]);
        ds
    }

    #[test]
    fn test_margins_reconcile() {
        let measure = MeasureSpec::sum("Amount");
        let ds = dataset();
        let pivot = pivot(&ds, "Country", "Month", &measure, EmptyCell::Zero)
            .unwrap()
            .unwrap();

        let mut clean = ds.clone();
        clean.rows.retain(|r| !r[1].is_missing());
        let table = aggregate(&clean, &["Country"], std::slice::from_ref(&measure)).unwrap();

        assert!(verify_pivot_margins(&pivot, &table, 1e-9).is_ok());
    }

    #[test]
    fn test_margin_mismatch_is_reported() {
        let measure = MeasureSpec::sum("Amount");
        let ds = dataset();
        let pivot = pivot(&ds, "Country", "Month", &measure, EmptyCell::Zero)
            .unwrap()
            .unwrap();
        // The single-key table still counts the TR row with no month.
        let table = aggregate(&ds, &["Country"], std::slice::from_ref(&measure)).unwrap();

        let err = verify_pivot_margins(&pivot, &table, 1e-9).unwrap_err();
        match err {
            SalesEngineError::MarginMismatch {
                row,
                pivot_total,
                table_total,
            } => {
                assert_eq!(row, "TR");
                assert_eq!(pivot_total, 1.0);
                assert_eq!(table_total, 8.0);
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
