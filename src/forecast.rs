use crate::aggregation::{AggregateTable, GroupKey};
use serde::{Deserialize, Serialize};

/// `1 + g/100`. No range is enforced: -100 gives 0, below -100 flips the sign.
pub fn growth_multiplier(growth_rate: f64) -> f64 {
    1.0 + growth_rate / 100.0
}

pub fn forecast_value(value: f64, growth_rate: f64) -> f64 {
    value * growth_multiplier(growth_rate)
}

/// A historical value projected forward by a flat growth rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub historical: f64,
    pub growth_rate: f64,
    pub forecast: f64,
    pub delta: f64,
}

impl Forecast {
    pub fn new(historical: f64, growth_rate: f64) -> Self {
        let forecast = forecast_value(historical, growth_rate);
        Self {
            historical,
            growth_rate,
            forecast,
            delta: forecast - historical,
        }
    }

    /// Forecast rounded to whole units, halves away from zero.
    pub fn forecast_rounded(&self) -> f64 {
        self.forecast.round()
    }

    pub fn delta_rounded(&self) -> f64 {
        self.delta.round()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub key: GroupKey,
    /// `None` when the historical aggregate is undefined (a mean over no values).
    pub forecast: Option<Forecast>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastTable {
    pub group_columns: Vec<String>,
    pub measure: String,
    pub growth_rate: f64,
    pub entries: Vec<ForecastEntry>,
}

/// Projects every group of `table` for one measure. Returns `None` when the table does
/// not carry that measure.
pub fn forecast_table(table: &AggregateTable, measure: &str, growth_rate: f64) -> Option<ForecastTable> {
    if !table.has_measure(measure) {
        return None;
    }

    let entries = table
        .groups
        .iter()
        .map(|group| ForecastEntry {
            key: group.key.clone(),
            forecast: group.value(measure).map(|v| Forecast::new(v, growth_rate)),
        })
        .collect();

    Some(ForecastTable {
        group_columns: table.group_columns.clone(),
        measure: measure.to_string(),
        growth_rate,
        entries,
    })
}

impl ForecastTable {
    pub fn get(&self, key: &[&str]) -> Option<&Forecast> {
        self.entries
            .iter()
            .find(|e| e.key.iter().map(String::as_str).eq(key.iter().copied()))
            .and_then(|e| e.forecast.as_ref())
    }

    /// Forecast of the sum of all defined historical values.
    pub fn total(&self) -> Forecast {
        let historical = self
            .entries
            .iter()
            .filter_map(|e| e.forecast.map(|f| f.historical))
            .sum();
        Forecast::new(historical, self.growth_rate)
    }
}
