use crate::error::{Result, SalesEngineError};
use log::warn;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single cell of an uploaded table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
    Missing,
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) if !n.is_nan() => Some(*n),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Group key for this cell. Text is used verbatim (no trimming or case folding),
    /// numbers use their display form with `-0` folded into `0`, missing cells have no key.
    pub fn as_key(&self) -> Option<String> {
        match self {
            Value::Text(s) => Some(s.clone()),
            Value::Number(n) if *n == 0.0 => Some("0".to_string()),
            Value::Number(n) if !n.is_nan() => Some(n.to_string()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
            Value::Missing => Ok(()),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<Option<f64>> for Value {
    fn from(n: Option<f64>) -> Self {
        n.map(Value::Number).unwrap_or(Value::Missing)
    }
}

/// An uploaded table: named columns in display order and rows of cells aligned to them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Dataset {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends a row, padding short rows with `Missing` and truncating long ones.
    /// Use [`crate::ingestion::dataset_from_records`] to reject ragged rows instead.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        if row.len() > self.columns.len() {
            warn!(
                "Row {} has {} cells for {} columns; dropping the extra cells",
                self.rows.len(),
                row.len(),
                self.columns.len()
            );
        }
        row.resize(self.columns.len(), Value::Missing);
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    pub fn column_values<'a>(&'a self, column: &str) -> impl Iterator<Item = &'a Value> + 'a {
        let idx = self.column_index(column);
        self.rows
            .iter()
            .filter_map(move |r| idx.and_then(|i| r.get(i)))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    #[schemars(description = "Sum of non-missing values; an empty group sums to 0.")]
    Sum,

    #[schemars(description = "Arithmetic mean of non-missing values; an empty group is undefined.")]
    Mean,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MeasureRole {
    Weight,
    Amount,
    Profit,
    ProfitPercent,
}

impl MeasureRole {
    pub fn default_aggregation(&self) -> Aggregation {
        match self {
            MeasureRole::ProfitPercent => Aggregation::Mean,
            _ => Aggregation::Sum,
        }
    }
}

/// A measure column paired with the aggregation applied to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureSpec {
    pub column: String,
    pub aggregation: Aggregation,
}

impl MeasureSpec {
    pub fn sum(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            aggregation: Aggregation::Sum,
        }
    }

    pub fn mean(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            aggregation: Aggregation::Mean,
        }
    }
}

/// Which physical column plays which logical role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ColumnRoles {
    #[schemars(description = "Primary category column, e.g. 'Country'.")]
    pub category_a: String,

    #[schemars(description = "Secondary category column holding calendar month names, e.g. 'Month'.")]
    pub category_b: String,

    #[serde(default)]
    #[schemars(description = "Column holding shipped weight (summed).")]
    pub weight: Option<String>,

    #[serde(default)]
    #[schemars(description = "Column holding sales amount (summed).")]
    pub amount: Option<String>,

    #[serde(default)]
    #[schemars(description = "Column holding profit (summed).")]
    pub profit: Option<String>,

    #[serde(default)]
    #[schemars(description = "Column holding profit percentage (averaged).")]
    pub profit_percent: Option<String>,
}

impl ColumnRoles {
    pub fn new(category_a: impl Into<String>, category_b: impl Into<String>) -> Self {
        Self {
            category_a: category_a.into(),
            category_b: category_b.into(),
            weight: None,
            amount: None,
            profit: None,
            profit_percent: None,
        }
    }

    pub fn with_measure(mut self, role: MeasureRole, column: impl Into<String>) -> Self {
        let column = Some(column.into());
        match role {
            MeasureRole::Weight => self.weight = column,
            MeasureRole::Amount => self.amount = column,
            MeasureRole::Profit => self.profit = column,
            MeasureRole::ProfitPercent => self.profit_percent = column,
        }
        self
    }

    /// Bound measures in role order.
    pub fn measures(&self) -> Vec<(MeasureRole, &str)> {
        [
            (MeasureRole::Weight, &self.weight),
            (MeasureRole::Amount, &self.amount),
            (MeasureRole::Profit, &self.profit),
            (MeasureRole::ProfitPercent, &self.profit_percent),
        ]
        .into_iter()
        .filter_map(|(role, col)| col.as_deref().map(|c| (role, c)))
        .collect()
    }

    pub fn measure_specs(&self) -> Vec<MeasureSpec> {
        self.measures()
            .into_iter()
            .map(|(role, column)| MeasureSpec {
                column: column.to_string(),
                aggregation: role.default_aggregation(),
            })
            .collect()
    }

    pub fn measure_columns(&self) -> Vec<&str> {
        self.measures().into_iter().map(|(_, c)| c).collect()
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DonorPolicy {
    #[default]
    #[schemars(description = "Every missing month copies the earliest month present in the calendar.")]
    FirstPresent,

    #[schemars(
        description = "Every missing month copies the closest present month before it, wrapping from January back to December."
    )]
    NearestPreceding,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EmptyCell {
    #[default]
    #[schemars(description = "Category combinations with no rows render as 0.")]
    Zero,

    #[schemars(description = "Category combinations with no rows render as absent (null).")]
    Absent,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct DashboardConfig {
    #[schemars(description = "Mapping of logical roles to physical column names")]
    pub roles: ColumnRoles,

    #[serde(default)]
    #[schemars(
        description = "Growth rate in percent applied to historical values. Conventionally between -100 and 300, not enforced."
    )]
    pub growth_rate: f64,

    #[serde(default)]
    #[schemars(description = "Keep only the N largest primary categories by the first bound measure.")]
    pub top_n: Option<usize>,

    #[serde(default)]
    pub donor_policy: DonorPolicy,

    #[serde(default)]
    pub empty_cell: EmptyCell,
}

impl DashboardConfig {
    pub fn new(roles: ColumnRoles, growth_rate: f64) -> Self {
        Self {
            roles,
            growth_rate,
            top_n: None,
            donor_policy: DonorPolicy::default(),
            empty_cell: EmptyCell::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.growth_rate.is_finite() {
            return Err(SalesEngineError::InvalidGrowthRate(self.growth_rate));
        }
        if self.top_n == Some(0) {
            return Err(SalesEngineError::InvalidTopN);
        }
        let measures = self.roles.measures();
        for (i, (role, column)) in measures.iter().enumerate() {
            let clash = measures[..i].iter().any(|(other, c)| {
                c == column && other.default_aggregation() != role.default_aggregation()
            });
            if clash {
                return Err(SalesEngineError::ConflictingMeasure(column.to_string()));
            }
        }
        if self.roles.category_a.is_empty() || self.roles.category_b.is_empty() {
            return Err(SalesEngineError::ConfigError(
                "category columns must be named".to_string(),
            ));
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(DashboardConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
