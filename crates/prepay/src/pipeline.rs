//! End-to-end study pipeline.
//!
//! The panel stage turns raw files into `panel.parquet`, the aggregate series
//! and a build report. The fit stage reads the panel back through an
//! [`ArtifactReader`] and writes every results table. Stages only talk
//! through artifacts, so either can be rerun on its own.

use polars::prelude::*;
use prepay_data::layout::write_parquet;
use prepay_data::macro_rate::load_monthly_rates;
use prepay_data::{
    ArtifactReader, DataError, Manifest, RawTables, RecordLoader, SnapshotCache, StudyConfig,
};
use prepay_model::{
    BEHAVIORAL_TERMS, CalibrationRow, Counterfactual, Decomposition, Evaluation, ExcessTable,
    GroupKey, ModelError, NestedFit, baseline_excess, counterfactual, fit_nested,
    weighted_decomposition,
};
use prepay_output::records::{
    CALIBRATION_FILE, COEFFICIENTS_FILE, COUNTERFACTUAL_FILE, LR_TESTS_FILE, METRICS_FILE,
    PANEL_REPORT_FILE, decomposition_file, excess_file,
};
use prepay_output::{
    CoefficientRecord, CounterfactualRecord, DecompositionRecord, ExportError, ExportFormat,
    Exporter, MetricRecord, PanelReport,
};
use prepay_panel::columns::PERIOD;
use prepay_panel::{
    AggregateSeriesRow, Panel, PanelError, PerformanceAudit, aggregate, audit_performance,
    build_panel,
};
use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors raised by any stage of the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Loading, configuration or artifact error
    #[error(transparent)]
    Data(#[from] DataError),

    /// Panel construction error
    #[error(transparent)]
    Panel(#[from] PanelError),

    /// Estimation or decomposition error
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Results table could not be written
    #[error(transparent)]
    Export(#[from] ExportError),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
}

/// Outputs of the panel stage.
#[derive(Debug, Clone)]
pub struct PanelStage {
    /// The loan-month panel
    pub panel: Panel,
    /// Load-time checks on the performance records
    pub audit: PerformanceAudit,
    /// Monthly aggregate series
    pub series: Vec<AggregateSeriesRow>,
    /// Build summary written next to the results
    pub report: PanelReport,
}

/// Outputs of the fit stage.
#[derive(Debug, Clone)]
pub struct FitStage {
    /// Fitted specifications and their likelihood-ratio tests
    pub nested: NestedFit,
    /// Log loss of each specification on each split
    pub evaluations: Vec<Evaluation>,
    /// Per-period calibration rows
    pub calibration: Vec<CalibrationRow>,
    /// M2 with and without the behavioral terms over the pandemic window
    pub counterfactual: Counterfactual,
    /// Baseline excess per grouping, in [`GroupKey::ALL`] order
    pub excess: Vec<ExcessTable>,
    /// Weighted decomposition of each excess table
    pub decompositions: Vec<Decomposition>,
}

/// Outputs of a full run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Panel stage
    pub panel: PanelStage,
    /// Fit stage
    pub fit: FitStage,
}

/// Runs the study stages against one configuration.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: StudyConfig,
    cache: SnapshotCache,
}

impl Pipeline {
    /// Pipeline with a parse cache under the interim directory.
    pub fn new(config: StudyConfig) -> Self {
        let cache = SnapshotCache::new(&config.layout.interim_dir);
        Self { config, cache }
    }

    /// Replace the parse cache.
    pub fn with_cache(mut self, cache: SnapshotCache) -> Self {
        self.cache = cache;
        self
    }

    /// Study configuration.
    pub const fn config(&self) -> &StudyConfig {
        &self.config
    }

    /// Find raw inputs in the raw directory by naming convention.
    pub fn discover(&self) -> Result<Manifest> {
        Ok(Manifest::discover(&[self.config.layout.raw_dir.clone()])?)
    }

    /// Drop every parse snapshot so the next load re-reads the raw files.
    pub fn refresh_cache(&self) -> Result<()> {
        self.cache.clear()?;
        tracing::info!(dir = %self.config.layout.interim_dir.display(), "Cleared parse cache");
        Ok(())
    }

    /// Load the raw tables listed in `manifest`.
    pub fn load(&self, manifest: &Manifest) -> Result<RawTables> {
        let tables = RecordLoader::new(self.cache.clone()).load(manifest, &self.config)?;
        tracing::info!(
            origination_rows = tables.origination.height(),
            performance_rows = tables.performance.height(),
            "Loaded raw records"
        );
        Ok(tables)
    }

    /// Build the panel from raw files and write the panel artifacts.
    pub fn panel_stage(&self, manifest: &Manifest) -> Result<PanelStage> {
        self.config.validate()?;
        let layout = &self.config.layout;

        let tables = self.load(manifest)?;
        let audit = audit_performance(&tables.performance)?;
        let rates = load_monthly_rates(&layout.rate_file)?;
        let panel = build_panel(&tables.origination, &tables.performance, &rates, &self.config)?;
        let series = aggregate(&panel.frame)?;
        let report = PanelReport::new(&self.config, panel.report, audit, &series);

        write_parquet(&panel.frame, &layout.panel_path())?;
        series.export_to_file(&layout.aggregate_path(), ExportFormat::Csv)?;
        report.export_to_file(&layout.results_path(PANEL_REPORT_FILE), ExportFormat::PrettyJson)?;

        tracing::info!(
            rows = panel.frame.height(),
            months = series.len(),
            path = %layout.panel_path().display(),
            "Panel stage complete"
        );

        Ok(PanelStage {
            panel,
            audit,
            series,
            report,
        })
    }

    /// Fit and quantify from the panel artifact and write the results tables.
    pub fn fit_stage(&self) -> Result<FitStage> {
        self.config.validate()?;
        let panel = ArtifactReader::new(self.config.layout.clone()).panel()?;
        tracing::info!(rows = panel.height(), "Read panel artifact");

        let nested = fit_nested(&panel, &self.config)?;
        let evaluations = nested.evaluate(&panel, &self.config)?;
        let calibration = nested.calibrate(&panel, &self.config)?;

        let window = self.covid_window(&panel)?;
        tracing::info!(rows = window.height(), "Scoring pandemic window");
        let counterfactual = counterfactual(&nested.m2, &window, &BEHAVIORAL_TERMS)?;

        let mut excess = Vec::with_capacity(GroupKey::ALL.len());
        let mut decompositions = Vec::with_capacity(GroupKey::ALL.len());
        for key in GroupKey::ALL {
            let table = baseline_excess(&nested.m2, &window, key)?;
            decompositions.push(weighted_decomposition(&table));
            excess.push(table);
        }

        let stage = FitStage {
            nested,
            evaluations,
            calibration,
            counterfactual,
            excess,
            decompositions,
        };
        self.write_results(&stage)?;
        Ok(stage)
    }

    /// Both stages in order.
    pub fn run(&self, manifest: &Manifest) -> Result<RunOutput> {
        let panel = self.panel_stage(manifest)?;
        let fit = self.fit_stage()?;
        Ok(RunOutput { panel, fit })
    }

    fn covid_window(&self, panel: &DataFrame) -> Result<DataFrame> {
        let covid = self.config.covid;
        Ok(panel
            .clone()
            .lazy()
            .filter(
                col(PERIOD)
                    .gt_eq(lit(covid.start))
                    .and(col(PERIOD).lt_eq(lit(covid.end))),
            )
            .collect()?)
    }

    fn write_results(&self, stage: &FitStage) -> Result<()> {
        let layout = &self.config.layout;

        let coefficients: Vec<CoefficientRecord> = stage
            .nested
            .models()
            .into_iter()
            .flat_map(CoefficientRecord::from_model)
            .collect();
        coefficients.export_to_file(&layout.results_path(COEFFICIENTS_FILE), ExportFormat::Csv)?;

        MetricRecord::from_nested(&stage.nested, &stage.evaluations)
            .export_to_file(&layout.results_path(METRICS_FILE), ExportFormat::Csv)?;
        stage
            .nested
            .lr_tests
            .export_to_file(&layout.results_path(LR_TESTS_FILE), ExportFormat::Csv)?;
        stage
            .calibration
            .export_to_file(&layout.results_path(CALIBRATION_FILE), ExportFormat::Csv)?;
        CounterfactualRecord::from_counterfactual(&stage.counterfactual)
            .export_to_file(&layout.results_path(COUNTERFACTUAL_FILE), ExportFormat::Csv)?;

        for (table, decomposition) in stage.excess.iter().zip(&stage.decompositions) {
            let group = table.key.to_string();
            table
                .rows
                .export_to_file(&layout.results_path(&excess_file(&group)), ExportFormat::Csv)?;
            DecompositionRecord::from_decomposition(decomposition).export_to_file(
                &layout.results_path(&decomposition_file(&group)),
                ExportFormat::Csv,
            )?;
        }

        tracing::info!(dir = %layout.results_dir.display(), "Wrote results tables");
        Ok(())
    }
}
