//! # Sales Forecast Engine
//!
//! A library that turns an uploaded table of sales records into the derived views a sales
//! dashboard displays: grouped breakdowns, category pivots and a flat growth-rate forecast.
//!
//! ## Core Concepts
//!
//! - **Dataset**: Rows of text, number or missing cells under named columns
//! - **Column Roles**: Which physical column is the country, the month and each measure
//! - **Aggregation**: Sums and means of measures grouped by one or two categories
//! - **Forecast**: Historical values multiplied by `1 + growth_rate / 100`
//! - **Calendar Completion**: Missing calendar months cloned from a donor month and projected forward
//!
//! ## Example
//!
//! ```rust,ignore
//! use sales_forecast_engine::*;
//!
//! let mut dataset = Dataset::new(vec!["Country".into(), "Month".into(), "Profit".into()]);
//! dataset.push_row(vec![Value::text("GE"), Value::text("January"), Value::Number(100.0)]);
//! dataset.push_row(vec![Value::text("GE"), Value::text("February"), Value::Number(200.0)]);
//!
//! let roles = ColumnRoles::new("Country", "Month").with_measure(MeasureRole::Profit, "Profit");
//! let config = DashboardConfig::new(roles, 10.0);
//!
//! let report = process_dashboard(&dataset, &config).unwrap();
//! assert_eq!(report.totals[0].forecast.unwrap().forecast_rounded(), 330.0);
//! ```

pub mod aggregation;
pub mod calendar;
pub mod coercion;
pub mod completion;
pub mod error;
pub mod forecast;
pub mod ingestion;
pub mod reconcile;
pub mod schema;
pub mod summary;

pub use aggregation::{
    aggregate, distinct_measures, pivot, AggregateRow, AggregateTable, GroupKey, PivotTable,
};
pub use calendar::{month_from_name, month_index, CALENDAR};
pub use coercion::{coerce_numeric, coerce_numeric_with_report, parse_number, CoercionReport};
pub use completion::{complete_calendar, CompletionResult, SynthesizedMonth};
pub use error::{Result, SalesEngineError};
pub use forecast::{
    forecast_table, forecast_value, growth_multiplier, Forecast, ForecastEntry, ForecastTable,
};
pub use ingestion::dataset_from_records;
pub use reconcile::verify_pivot_margins;
pub use schema::*;
pub use summary::{
    describe, distinct_values, filter_rows, measure_series, missing_report, ColumnSummary,
    MissingReport,
};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// Dataset-wide value of one bound measure and its projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureTotal {
    pub role: MeasureRole,
    pub column: String,
    pub aggregation: Aggregation,
    /// `None` when the measure is a mean over no numeric values.
    pub forecast: Option<Forecast>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardReport {
    pub rows: usize,
    pub growth_rate: f64,
    pub missing: MissingReport,
    pub summaries: Vec<ColumnSummary>,
    /// Bound measure columns that are not in the dataset.
    pub skipped_measures: Vec<String>,
    pub totals: Vec<MeasureTotal>,
    pub by_category_a: AggregateTable,
    pub by_category_b: AggregateTable,
    pub pivots: Vec<PivotTable>,
    pub forecasts_by_category_b: Vec<ForecastTable>,
    pub completion: CompletionResult,
}

pub struct SalesDashboard;

impl SalesDashboard {
    pub fn process(dataset: &Dataset, config: &DashboardConfig) -> Result<DashboardReport> {
        config.validate()?;

        let roles = &config.roles;
        info!(
            "Processing {} rows grouped by '{}' and '{}' at {}% growth",
            dataset.len(),
            roles.category_a,
            roles.category_b,
            config.growth_rate
        );

        let (bound, skipped): (Vec<_>, Vec<_>) = roles
            .measures()
            .into_iter()
            .partition(|(_, column)| dataset.has_column(column));
        let skipped_measures: Vec<String> = skipped.iter().map(|(_, c)| c.to_string()).collect();
        for column in &skipped_measures {
            warn!("Measure column '{}' is not in the dataset; skipping it", column);
        }

        let role_specs: Vec<(MeasureRole, MeasureSpec)> = bound
            .iter()
            .map(|(role, column)| {
                (
                    *role,
                    MeasureSpec {
                        column: column.to_string(),
                        aggregation: role.default_aggregation(),
                    },
                )
            })
            .collect();
        // Roles sharing a column share its breakdowns.
        let specs = distinct_measures(
            &role_specs.iter().map(|(_, s)| s.clone()).collect::<Vec<_>>(),
        )?;
        let measure_columns: Vec<&str> = specs.iter().map(|s| s.column.as_str()).collect();

        let (coerced, coercion) = coerce_numeric_with_report(dataset, &measure_columns);
        debug!("Coerced measure columns: {:?}", coercion.columns);

        let totals = role_specs
            .iter()
            .map(|(role, spec)| MeasureTotal {
                role: *role,
                column: spec.column.clone(),
                aggregation: spec.aggregation,
                forecast: overall_value(&coerced, spec).map(|v| Forecast::new(v, config.growth_rate)),
            })
            .collect();

        let mut by_category_a = aggregate(&coerced, &[roles.category_a.as_str()], &specs)?;
        if let Some(primary) = specs.first() {
            by_category_a.sort_by_measure(&primary.column, true);
            if let Some(n) = config.top_n {
                by_category_a = by_category_a.top_n(&primary.column, n);
            }
        }

        let mut by_category_b = aggregate(&coerced, &[roles.category_b.as_str()], &specs)?;
        by_category_b.sort_by_calendar_month(0);
        debug!(
            "{} groups by '{}', {} groups by '{}'",
            by_category_a.len(),
            roles.category_a,
            by_category_b.len(),
            roles.category_b
        );

        let mut pivots = Vec::new();
        for spec in specs.iter().filter(|s| s.aggregation == Aggregation::Sum) {
            if let Some(mut table) = pivot(
                &coerced,
                &roles.category_a,
                &roles.category_b,
                spec,
                config.empty_cell,
            )? {
                table.sort_columns_by_calendar();
                pivots.push(table);
            }
        }

        let forecasts_by_category_b = specs
            .iter()
            .filter_map(|s| forecast_table(&by_category_b, &s.column, config.growth_rate))
            .collect();

        let completion = complete_calendar(
            &coerced,
            &roles.category_b,
            &measure_columns,
            config.growth_rate,
            config.donor_policy,
        );
        if completion.is_degenerate() && !dataset.is_empty() {
            warn!(
                "No calendar months found in '{}'; nothing to complete",
                roles.category_b
            );
        }

        Ok(DashboardReport {
            rows: dataset.len(),
            growth_rate: config.growth_rate,
            missing: missing_report(dataset),
            summaries: describe(&coerced),
            skipped_measures,
            totals,
            by_category_a,
            by_category_b,
            pivots,
            forecasts_by_category_b,
            completion,
        })
    }

    /// Processes the dataset, then checks every pivot against per-category sums over the
    /// rows that have both categories.
    pub fn process_with_verification(
        dataset: &Dataset,
        config: &DashboardConfig,
        tolerance: f64,
    ) -> Result<DashboardReport> {
        let report = Self::process(dataset, config)?;

        let roles = &config.roles;
        let mut keyed = Dataset::new(dataset.columns.clone());
        if let Some(idx) = dataset.column_index(&roles.category_b) {
            keyed.rows = dataset
                .rows
                .iter()
                .filter(|row| row.get(idx).and_then(|v| v.as_key()).is_some())
                .cloned()
                .collect();
        }

        for table in &report.pivots {
            let margins = aggregate(
                &keyed,
                &[roles.category_a.as_str()],
                std::slice::from_ref(&table.measure),
            )?;
            verify_pivot_margins(table, &margins, tolerance)?;
        }

        Ok(report)
    }
}

fn overall_value(dataset: &Dataset, spec: &MeasureSpec) -> Option<f64> {
    let values: Vec<f64> = measure_series(dataset, &spec.column)
        .into_iter()
        .flatten()
        .collect();
    let sum: f64 = values.iter().sum();
    match spec.aggregation {
        Aggregation::Sum => Some(sum),
        Aggregation::Mean if values.is_empty() => None,
        Aggregation::Mean => Some(sum / values.len() as f64),
    }
}

pub fn process_dashboard(dataset: &Dataset, config: &DashboardConfig) -> Result<DashboardReport> {
    SalesDashboard::process(dataset, config)
}

pub fn process_with_verification(
    dataset: &Dataset,
    config: &DashboardConfig,
    tolerance: f64,
) -> Result<DashboardReport> {
    SalesDashboard::process_with_verification(dataset, config, tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn georgia() -> Dataset {
        let mut ds = Dataset::new(vec![
            "country".to_string(),
            "month".to_string(),
            "profit".to_string(),
        ]);
        ds.push_row(vec![Value::text("GE"), Value::text("January"), Value::Number(100.0)]);
        ds.push_row(vec![Value::text("GE"), Value::text("February"), Value::Number(200.0)]);
        ds
    }

    fn config(growth_rate: f64) -> DashboardConfig {
        let roles = ColumnRoles::new("country", "month").with_measure(MeasureRole::Profit, "profit");
        DashboardConfig::new(roles, growth_rate)
    }

    #[test]
    fn test_end_to_end_scenario() {
        let report = process_dashboard(&georgia(), &config(10.0)).unwrap();

        let total = report.totals[0].forecast.unwrap();
        assert!((total.forecast - 330.0).abs() < 1e-9);
        assert_eq!(total.forecast_rounded(), 330.0);

        let by_month = &report.forecasts_by_category_b[0];
        assert!((by_month.get(&["January"]).unwrap().forecast - 110.0).abs() < 1e-9);
        assert!((by_month.get(&["February"]).unwrap().forecast - 220.0).abs() < 1e-9);
        assert_eq!(by_month.entries[0].key, vec!["January".to_string()]);
    }

    #[test]
    fn test_minus_hundred_growth_zeroes_everything() {
        let report = process_dashboard(&georgia(), &config(-100.0)).unwrap();
        assert_eq!(report.totals[0].forecast.unwrap().forecast, 0.0);
        for entry in &report.forecasts_by_category_b[0].entries {
            assert_eq!(entry.forecast.unwrap().forecast, 0.0);
        }
        for value in report.completion.dataset.column_values("profit") {
            assert_eq!(value.as_number(), Some(0.0));
        }
    }

    #[test]
    fn test_empty_dataset() {
        let empty = Dataset::new(vec!["country".to_string(), "month".to_string()]);
        let report = process_dashboard(&empty, &config(10.0)).unwrap();
        assert!(report.by_category_a.is_empty());
        assert!(report.by_category_b.is_empty());
        assert!(report.totals.is_empty());
        assert_eq!(report.skipped_measures, vec!["profit".to_string()]);
        assert!(report.completion.dataset.is_empty());
    }

    #[test]
    fn test_invalid_growth_rate_is_rejected() {
        let result = process_dashboard(&georgia(), &config(f64::INFINITY));
        assert!(matches!(result, Err(SalesEngineError::InvalidGrowthRate(_))));
    }

    #[test]
    fn test_roles_sharing_a_column() {
        let roles = ColumnRoles::new("country", "month")
            .with_measure(MeasureRole::Amount, "profit")
            .with_measure(MeasureRole::Profit, "profit");
        let report = process_dashboard(&georgia(), &DashboardConfig::new(roles, 10.0)).unwrap();

        assert_eq!(report.totals.len(), 2);
        for total in &report.totals {
            assert!((total.forecast.unwrap().forecast - 330.0).abs() < 1e-9);
        }
        assert_eq!(report.by_category_a.measures.len(), 1);
        assert_eq!(report.pivots.len(), 1);
        assert_eq!(report.forecasts_by_category_b.len(), 1);

        let completed: Vec<f64> = report
            .completion
            .dataset
            .column_values("profit")
            .take(2)
            .filter_map(|v| v.as_number())
            .collect();
        assert!((completed[0] - 110.0).abs() < 1e-9);
        assert!((completed[1] - 220.0).abs() < 1e-9);
    }

    #[test]
    fn test_conflicting_roles_rejected() {
        let roles = ColumnRoles::new("country", "month")
            .with_measure(MeasureRole::Profit, "profit")
            .with_measure(MeasureRole::ProfitPercent, "profit");
        let result = process_dashboard(&georgia(), &DashboardConfig::new(roles, 10.0));
        assert!(matches!(result, Err(SalesEngineError::ConflictingMeasure(_))));
    }

    #[test]
    fn test_verification_passes() {
        let report = process_with_verification(&georgia(), &config(5.0), 1e-9).unwrap();
        assert_eq!(report.pivots.len(), 1);
        assert_eq!(report.pivots[0].row_total("GE"), Some(300.0));
    }
}
