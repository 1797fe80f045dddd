//! Column layouts for the raw record files.
//!
//! Raw files carry no header, so every semantic field is addressed by its
//! zero-based column position. The default layouts follow the public
//! single-family loan-level dataset.

use crate::error::{DataError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Semantic field names shared by the loader and the panel builder.
pub mod fields {
    /// Loan identifier
    pub const LOAN_ID: &str = "loan_id";
    /// Credit score at origination
    pub const CREDIT_SCORE: &str = "credit_score";
    /// Occupancy status (P, S or I)
    pub const OCCUPANCY: &str = "occupancy";
    /// Debt-to-income ratio
    pub const DTI: &str = "dti";
    /// Original loan-to-value
    pub const LTV: &str = "ltv";
    /// Original interest rate
    pub const ORIG_RATE: &str = "orig_rate";
    /// Property state
    pub const STATE: &str = "state";
    /// Property type
    pub const PROPERTY_TYPE: &str = "property_type";
    /// Original loan term in months
    pub const ORIG_TERM: &str = "orig_term";
    /// Monthly reporting period (`YYYYMM`)
    pub const PERIOD: &str = "period";
    /// Current actual unpaid balance
    pub const CURRENT_UPB: &str = "current_upb";
    /// Loan age in months
    pub const LOAN_AGE: &str = "loan_age";
    /// Zero-balance code
    pub const ZERO_BALANCE_CODE: &str = "zero_balance_code";
    /// Current interest rate
    pub const CURRENT_RATE: &str = "current_rate";
    /// Monthly average market mortgage rate
    pub const MARKET_RATE: &str = "market_rate";
}

/// Type a raw text cell is coerced to after selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coercion {
    /// Keep the cell as text
    Text,
    /// Parse as a 64-bit integer; unparseable cells become null
    Integer,
    /// Parse as a 64-bit float; unparseable cells become null
    Float,
}

/// One selected column of a raw file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Semantic field name in the loaded table
    pub name: String,
    /// Zero-based column position in the raw file
    pub position: usize,
    /// Post-selection type coercion
    pub coercion: Coercion,
    /// Value that encodes "missing" for this field
    #[serde(default)]
    pub missing_sentinel: Option<i64>,
}

impl FieldSpec {
    /// Create a field without a missing-value sentinel.
    pub fn new(name: &str, position: usize, coercion: Coercion) -> Self {
        Self {
            name: name.to_string(),
            position,
            coercion,
            missing_sentinel: None,
        }
    }

    /// Attach a sentinel that is converted to null after coercion.
    pub const fn with_sentinel(mut self, sentinel: i64) -> Self {
        self.missing_sentinel = Some(sentinel);
        self
    }
}

/// Ordered mapping of semantic field name to column position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Fields in the order they should appear in the loaded table
    pub fields: Vec<FieldSpec>,
}

impl ColumnSpec {
    /// Create a layout from fields in request order.
    pub const fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    /// Default origination layout.
    pub fn origination() -> Self {
        use fields::*;
        Self::new(vec![
            FieldSpec::new(LOAN_ID, 19, Coercion::Text),
            FieldSpec::new(CREDIT_SCORE, 0, Coercion::Integer).with_sentinel(9999),
            FieldSpec::new(ORIG_RATE, 12, Coercion::Float),
            FieldSpec::new(ORIG_TERM, 21, Coercion::Integer),
            FieldSpec::new(LTV, 11, Coercion::Integer).with_sentinel(999),
            FieldSpec::new(DTI, 9, Coercion::Integer).with_sentinel(999),
            FieldSpec::new(OCCUPANCY, 7, Coercion::Text),
            FieldSpec::new(STATE, 16, Coercion::Text),
            FieldSpec::new(PROPERTY_TYPE, 17, Coercion::Text),
        ])
    }

    /// Default performance layout.
    pub fn performance() -> Self {
        use fields::*;
        Self::new(vec![
            FieldSpec::new(LOAN_ID, 0, Coercion::Text),
            FieldSpec::new(PERIOD, 1, Coercion::Integer),
            FieldSpec::new(CURRENT_UPB, 2, Coercion::Float),
            FieldSpec::new(LOAN_AGE, 4, Coercion::Integer),
            // Kept as text so "01" and "1" remain distinguishable at the source.
            FieldSpec::new(ZERO_BALANCE_CODE, 8, Coercion::Text),
            FieldSpec::new(CURRENT_RATE, 10, Coercion::Float),
        ])
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Field names in request order.
    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Fields sorted by their position in the file.
    ///
    /// Columnar readers return a projection in file order, so this is the
    /// order in which selected columns come back.
    pub fn in_file_order(&self) -> Vec<&FieldSpec> {
        let mut sorted: Vec<&FieldSpec> = self.fields.iter().collect();
        sorted.sort_by_key(|f| f.position);
        sorted
    }

    /// Ensure names and positions are unique and the layout is non-empty.
    pub fn validate(&self) -> Result<()> {
        if self.fields.is_empty() {
            return Err(DataError::InvalidConfig(
                "column layout selects no fields".to_string(),
            ));
        }

        let mut names = HashSet::new();
        let mut positions = HashSet::new();
        for field in &self.fields {
            if !names.insert(field.name.as_str()) {
                return Err(DataError::InvalidConfig(format!(
                    "field `{}` selected twice",
                    field.name
                )));
            }
            if !positions.insert(field.position) {
                return Err(DataError::InvalidConfig(format!(
                    "column position {} selected twice",
                    field.position
                )));
            }
        }

        Ok(())
    }
}
