//! Run report for a panel build.

use crate::export::{ExportError, ExportFormat, Exporter};
use chrono::{DateTime, Utc};
use prepay_data::StudyConfig;
use prepay_panel::{AggregateSeriesRow, PanelBuildReport, PerformanceAudit};
use serde::{Deserialize, Serialize};

/// Row counts, audit results and settings of one panel build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelReport {
    /// Report generation timestamp.
    pub timestamp: DateTime<Utc>,

    /// Crate version that produced the artifacts.
    pub version: String,

    /// Settings used for the build.
    pub config: StudyConfig,

    /// Counts per build step.
    pub build: PanelBuildReport,

    /// Post-exit performance anomalies.
    pub audit: PerformanceAudit,

    /// First and last reporting month of the panel.
    pub period_range: Option<(i64, i64)>,

    /// Number of months in the aggregate series.
    pub months: usize,
}

impl PanelReport {
    /// Report for a finished build.
    pub fn new(
        config: &StudyConfig,
        build: PanelBuildReport,
        audit: PerformanceAudit,
        series: &[AggregateSeriesRow],
    ) -> Self {
        let period_range = series
            .first()
            .zip(series.last())
            .map(|(first, last)| (first.period, last.period));
        Self {
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            config: config.clone(),
            build,
            audit,
            period_range,
            months: series.len(),
        }
    }
}

impl Exporter for PanelReport {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => Err(ExportError::InvalidFormat(
                "panel report is nested; export it as JSON".to_string(),
            )),
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(period: i64) -> AggregateSeriesRow {
        AggregateSeriesRow {
            period,
            prepay_count: 1,
            alive_count: 10,
            market_rate: Some(3.5),
            avg_incentive: None,
            prepay_rate: 0.1,
        }
    }

    #[test]
    fn test_report_round_trips_as_json() {
        let report = PanelReport::new(
            &StudyConfig::default(),
            PanelBuildReport::default(),
            PerformanceAudit::default(),
            &[row(201901), row(201902), row(201903)],
        );
        assert_eq!(report.period_range, Some((201901, 201903)));
        assert_eq!(report.months, 3);

        let json = report.export_to_string(ExportFormat::PrettyJson).unwrap();
        let back: PanelReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn test_csv_is_rejected() {
        let report = PanelReport::new(
            &StudyConfig::default(),
            PanelBuildReport::default(),
            PerformanceAudit::default(),
            &[],
        );
        assert_eq!(report.period_range, None);
        assert!(matches!(
            report.export_to_string(ExportFormat::Csv),
            Err(ExportError::InvalidFormat(_))
        ));
    }
}
