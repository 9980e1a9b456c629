use crate::error::{Result, SalesEngineError};
use crate::schema::{Dataset, Value};
use log::debug;

/// Builds a dataset from already-split text records, e.g. the output of a CSV reader.
///
/// Blank cells become `Missing`; everything else is kept as text until coerced. A row whose
/// width differs from the header is rejected, since that means the upstream parse went wrong.
pub fn dataset_from_records<S, R>(headers: &[S], rows: &[R]) -> Result<Dataset>
where
    S: AsRef<str>,
    R: AsRef<[String]>,
{
    let columns: Vec<String> = headers.iter().map(|h| h.as_ref().to_string()).collect();
    let mut dataset = Dataset::new(columns);

    for (i, row) in rows.iter().enumerate() {
        let cells = row.as_ref();
        if cells.len() != dataset.columns.len() {
            return Err(SalesEngineError::RaggedRow {
                row: i + 1,
                expected: dataset.columns.len(),
                found: cells.len(),
            });
        }
        dataset.rows.push(cells.iter().map(|c| parse_cell(c)).collect());
    }

    debug!(
        "Ingested {} rows across {} columns",
        dataset.len(),
        dataset.columns.len()
    );

    Ok(dataset)
}

fn parse_cell(raw: &str) -> Value {
    if raw.trim().is_empty() {
        Value::Missing
    } else {
        Value::Text(raw.to_string())
    }
}
