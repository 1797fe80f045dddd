//! Study configuration.
//!
//! All temporal and path dependencies of the pipeline live in one immutable
//! [`StudyConfig`] that is passed by reference into each stage.

use crate::error::{DataError, Result};
use crate::layout::Layout;
use crate::schema::ColumnSpec;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Inclusive pandemic window in `YYYYMM` periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CovidWindow {
    /// First pandemic month (inclusive)
    pub start: i64,
    /// Last pandemic month (inclusive)
    pub end: i64,
}

impl Default for CovidWindow {
    fn default() -> Self {
        Self {
            start: 202003,
            end: 202112,
        }
    }
}

impl CovidWindow {
    /// Whether a period falls inside the window, bounds included.
    pub const fn contains(&self, period: i64) -> bool {
        self.start <= period && period <= self.end
    }
}

/// Temporal split cutoffs in `YYYYMM` periods.
///
/// Train is `period <= train_end`, validation is
/// `train_end < period <= validation_end` and test is everything after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Last training month (inclusive)
    pub train_end: i64,
    /// Last validation month (inclusive)
    pub validation_end: i64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            train_end: 201912,
            validation_end: 202112,
        }
    }
}

/// Options for the logistic regression solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitConfig {
    /// Maximum number of Newton iterations (default: 50)
    pub max_iterations: usize,
    /// Convergence tolerance on the largest coefficient step (default: 1e-8)
    pub tolerance: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            tolerance: 1e-8,
        }
    }
}

/// Complete configuration for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    /// Pandemic window used for the `covid` indicator
    pub covid: CovidWindow,
    /// Train/validation/test cutoffs
    pub splits: SplitConfig,
    /// Original loan term (months) of the studied cohort
    pub target_term: i64,
    /// Directory layout of inputs and artifacts
    pub layout: Layout,
    /// Solver options
    pub fit: FitConfig,
    /// Column layout of origination files
    pub origination_columns: ColumnSpec,
    /// Column layout of performance files
    pub performance_columns: ColumnSpec,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            covid: CovidWindow::default(),
            splits: SplitConfig::default(),
            target_term: 360,
            layout: Layout::default(),
            fit: FitConfig::default(),
            origination_columns: ColumnSpec::origination(),
            performance_columns: ColumnSpec::performance(),
        }
    }
}

impl StudyConfig {
    /// Read a configuration from a JSON file. Missing keys take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that periods are well formed and ordered and that the parse
    /// cache has a directory of its own.
    pub fn validate(&self) -> Result<()> {
        for (name, period) in [
            ("covid.start", self.covid.start),
            ("covid.end", self.covid.end),
            ("splits.train_end", self.splits.train_end),
            ("splits.validation_end", self.splits.validation_end),
        ] {
            if !is_valid_period(period) {
                return Err(DataError::InvalidConfig(format!(
                    "{name} = {period} is not a YYYYMM period"
                )));
            }
        }

        if self.covid.start > self.covid.end {
            return Err(DataError::InvalidConfig(format!(
                "covid window starts at {} after it ends at {}",
                self.covid.start, self.covid.end
            )));
        }

        if self.splits.train_end >= self.splits.validation_end {
            return Err(DataError::InvalidConfig(format!(
                "train_end {} must precede validation_end {}",
                self.splits.train_end, self.splits.validation_end
            )));
        }

        if self.target_term <= 0 {
            return Err(DataError::InvalidConfig(format!(
                "target_term must be positive, got {}",
                self.target_term
            )));
        }

        let layout = &self.layout;
        for (role, dir) in [
            ("raw_dir", &layout.raw_dir),
            ("processed_dir", &layout.processed_dir),
            ("results_dir", &layout.results_dir),
        ] {
            if *dir == layout.interim_dir {
                return Err(DataError::InvalidConfig(format!(
                    "interim_dir {} is also the {role}",
                    dir.display()
                )));
            }
        }

        Ok(())
    }
}

/// Whether an integer is a `YYYYMM` period with a month in 1..=12.
pub const fn is_valid_period(period: i64) -> bool {
    let month = period % 100;
    period >= 100_001 && month >= 1 && month <= 12
}
