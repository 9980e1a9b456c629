use crate::calendar::{month_from_name, month_index, month_name, preceding_months, CALENDAR};
use crate::coercion::coerce_numeric;
use crate::forecast::growth_multiplier;
use crate::schema::{Dataset, DonorPolicy, Value};
use chrono::Month;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesizedMonth {
    pub month: String,
    pub donor: String,
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResult {
    /// Source rows scaled in their original order, followed by synthetic rows
    /// for each missing month in calendar order.
    pub dataset: Dataset,
    pub growth_rate: f64,
    /// Calendar months found in the source, in calendar order.
    pub present_months: Vec<String>,
    pub synthesized: Vec<SynthesizedMonth>,
    /// Source rows whose month cell is not a calendar month name. They are carried
    /// through and scaled like every other row but take no part in donor selection.
    pub unrecognized_rows: usize,
}

impl CompletionResult {
    pub fn is_degenerate(&self) -> bool {
        self.present_months.is_empty()
    }
}

fn select_donor(missing: Month, present: &[bool; 12], policy: DonorPolicy) -> Option<Month> {
    match policy {
        DonorPolicy::FirstPresent => CALENDAR.iter().copied().find(|m| present[month_index(*m)]),
        DonorPolicy::NearestPreceding => {
            preceding_months(missing).find(|m| present[month_index(*m)])
        }
    }
}

fn scale_row(row: &mut [Value], measure_indices: &[usize], multiplier: f64) {
    for &idx in measure_indices {
        if let Some(Value::Number(n)) = row.get_mut(idx) {
            *n *= multiplier;
        }
    }
}

/// Projects a dataset forward by `growth_rate` and fills in every calendar month it lacks.
///
/// Every source row is copied with its measures multiplied by `1 + g/100`. Each missing
/// month then receives a copy of the donor month's rows (chosen by `policy`), relabelled
/// and scaled the same way. With no calendar month present there is no donor, so no rows
/// are synthesized. Measure columns not in the dataset are ignored.
pub fn complete_calendar(
    dataset: &Dataset,
    month_column: &str,
    measures: &[&str],
    growth_rate: f64,
    policy: DonorPolicy,
) -> CompletionResult {
    let multiplier = growth_multiplier(growth_rate);
    let coerced = coerce_numeric(dataset, measures);
    // A column bound to several measures is still scaled once.
    let mut measure_indices: Vec<usize> = measures
        .iter()
        .filter_map(|m| coerced.column_index(m))
        .collect();
    measure_indices.sort_unstable();
    measure_indices.dedup();
    let month_idx = coerced.column_index(month_column);

    if month_idx.is_none() {
        warn!(
            "Month column '{}' is not in the dataset; no months can be completed",
            month_column
        );
    }

    let mut by_month: [Vec<usize>; 12] = Default::default();
    let mut unrecognized_rows = 0;

    for (i, row) in coerced.rows.iter().enumerate() {
        let month = month_idx
            .and_then(|idx| row.get(idx))
            .and_then(|v| match v {
                Value::Text(s) => month_from_name(s),
                _ => None,
            });
        match month {
            Some(m) => by_month[month_index(m)].push(i),
            None => unrecognized_rows += 1,
        }
    }

    if unrecognized_rows > 0 {
        warn!(
            "{} rows have no recognizable month in '{}'; they are scaled but not used as donors",
            unrecognized_rows, month_column
        );
    }

    let present: [bool; 12] = std::array::from_fn(|i| !by_month[i].is_empty());

    let mut out = Dataset::new(coerced.columns.clone());
    for row in &coerced.rows {
        let mut scaled = row.clone();
        scale_row(&mut scaled, &measure_indices, multiplier);
        out.rows.push(scaled);
    }

    let mut synthesized = Vec::new();
    if let Some(month_idx) = month_idx {
        for missing in CALENDAR.iter().copied().filter(|m| !present[month_index(*m)]) {
            let Some(donor) = select_donor(missing, &present, policy) else {
                continue;
            };

            let donor_rows = &by_month[month_index(donor)];
            for &i in donor_rows {
                let mut row = coerced.rows[i].clone();
                row[month_idx] = Value::text(month_name(missing));
                scale_row(&mut row, &measure_indices, multiplier);
                out.rows.push(row);
            }

            debug!(
                "Synthesized {} rows for {} from {}",
                donor_rows.len(),
                month_name(missing),
                month_name(donor)
            );
            synthesized.push(SynthesizedMonth {
                month: month_name(missing).to_string(),
                donor: month_name(donor).to_string(),
                rows: donor_rows.len(),
            });
        }
    }

    CompletionResult {
        dataset: out,
        growth_rate,
        present_months: CALENDAR
            .iter()
            .filter(|m| present[month_index(**m)])
            .map(|m| month_name(*m).to_string())
            .collect(),
        synthesized,
        unrecognized_rows,
    }
}
