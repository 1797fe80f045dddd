//! End-to-end run over a simulated cohort written as raw files.

use approx::assert_relative_eq;
use prepay::data::{ArtifactReader, Layout, StudyConfig};
use prepay::model::GroupKey;
use prepay::output::records::{
    COEFFICIENTS_FILE, CoefficientRecord, LR_TESTS_FILE, decomposition_file, excess_file,
};
use prepay::panel::AggregateSeriesRow;
use prepay::{Pipeline, PipelineError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

const FIRST_PERIOD: i64 = 201901;
const LAST_PERIOD: i64 = 202206;
const LATE_START: i64 = 202007;
const STATES: [&str; 4] = ["CA", "TX", "FL", "NY"];
const OCCUPANCY: [&str; 3] = ["P", "S", "I"];

fn next_period(period: i64) -> i64 {
    if period % 100 == 12 { (period / 100 + 1) * 100 + 1 } else { period + 1 }
}

fn market_rate(period: i64) -> f64 {
    match period {
        ..=201912 => 4.2,
        ..=202012 => 3.2,
        ..=202112 => 3.0,
        _ => 4.8,
    }
}

fn study_root(name: &str) -> PathBuf {
    let root =
        std::env::temp_dir().join(format!("prepay-pipeline-{}-{}", name, std::process::id()));
    std::fs::remove_dir_all(&root).ok();
    root
}

fn write(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

struct Simulated {
    /// Loans on the studied term that exit inside the horizon
    exits: usize,
}

fn origination_line(
    loan_id: &str,
    score: i64,
    occupancy: &str,
    ltv: i64,
    rate: f64,
    state: &str,
    term: i64,
) -> String {
    let mut cells = vec![String::new(); 32];
    cells[0] = score.to_string();
    cells[7] = occupancy.to_string();
    cells[9] = "36".to_string();
    cells[11] = ltv.to_string();
    cells[12] = format!("{rate:.3}");
    cells[16] = state.to_string();
    cells[17] = "SF".to_string();
    cells[19] = loan_id.to_string();
    cells[21] = term.to_string();
    cells.join("|")
}

fn write_rates(path: &Path) {
    let mut csv = String::from("DATE,MORTGAGE30US\n");
    let mut period = FIRST_PERIOD;
    while period <= LAST_PERIOD {
        let (year, month) = (period / 100, period % 100);
        for day in [1, 8, 15, 22] {
            writeln!(csv, "{year}-{month:02}-{day:02},{:.2}", market_rate(period)).unwrap();
        }
        writeln!(csv, "{year}-{month:02}-28,.").unwrap();
        period = next_period(period);
    }
    write(path, &csv);
}

fn simulate(layout: &Layout, loans: usize, seed: u64) -> Simulated {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut origination = String::new();
    let mut performance = String::new();
    let mut exits = 0;

    for i in 0..loans {
        let id = format!("L{i:04}");
        let score = if i % 50 == 7 { 9999 } else { rng.gen_range(620..820) };
        let ltv = rng.gen_range(60..96);
        let rate: f64 = rng.gen_range(3.0..5.5);
        let occupancy = OCCUPANCY[rng.gen_range(0..OCCUPANCY.len())];
        let state = STATES[rng.gen_range(0..STATES.len())];
        let term = if i % 40 == 3 { 180 } else { 360 };
        let line = origination_line(&id, score, occupancy, ltv, rate, state, term);
        writeln!(origination, "{line}").unwrap();

        let mut period = if i % 2 == 0 { FIRST_PERIOD } else { LATE_START };
        let mut age: i64 = rng.gen_range(0..24);
        while period <= LAST_PERIOD {
            let covid = (202003..=202112).contains(&period);
            let eta = -3.6 + 0.8 * (rate - market_rate(period)) + if covid { 0.5 } else { 0.0 };
            let exited = rng.r#gen::<f64>() < 1.0 / (1.0 + (-eta).exp());
            let code = if exited { "01" } else { "" };
            writeln!(
                performance,
                "{id}|{period}|150000.0|0|{age}|{}||N|{code}||{rate:.3}",
                term - age
            )
            .unwrap();
            if exited {
                if term == 360 {
                    exits += 1;
                }
                break;
            }
            period = next_period(period);
            age += 1;
        }
    }

    // Performance-only loan
    writeln!(performance, "ORPHAN|201905|1000.0|0|3|357||N|01||4.000").unwrap();

    write(&layout.raw_dir.join("sample_orig_2019.txt"), &origination);
    write(&layout.raw_dir.join("sample_svcg_2019.txt"), &performance);
    write_rates(&layout.rate_file);
    Simulated { exits }
}

fn config(root: &Path) -> StudyConfig {
    StudyConfig {
        layout: Layout::under(root),
        ..Default::default()
    }
}

#[test]
fn test_full_run_writes_every_artifact() {
    let root = study_root("full");
    let config = config(&root);
    let simulated = simulate(&config.layout, 400, 11);

    let pipeline = Pipeline::new(config.clone());
    let manifest = pipeline.discover().unwrap();
    let output = pipeline.run(&manifest).unwrap();

    // Panel stage
    let panel = &output.panel;
    assert!(panel.audit.is_clean());
    assert_eq!(panel.panel.report.panel_rows, panel.panel.frame.height());
    let prepaid: i64 = panel.series.iter().map(|row| row.prepay_count).sum();
    assert_eq!(prepaid as usize, simulated.exits);
    for row in &panel.series {
        assert_relative_eq!(
            row.prepay_rate,
            row.prepay_count as f64 / row.alive_count as f64,
            epsilon = 1e-12
        );
    }

    let layout = &config.layout;
    assert!(layout.panel_path().is_file());
    assert!(layout.results_path("panel_report.json").is_file());
    let reader = ArtifactReader::new(layout.clone());
    let series: Vec<AggregateSeriesRow> = reader.aggregate().unwrap();
    assert_eq!(series, panel.series);

    // Fit stage
    let fit = &output.fit;
    assert_eq!(fit.evaluations.len(), 9);
    assert!(fit.nested.m0_refit.log_likelihood <= fit.nested.m1.log_likelihood + 1e-9);
    assert!(fit.nested.m1.log_likelihood <= fit.nested.m2.log_likelihood + 1e-9);

    let coefficients: Vec<CoefficientRecord> = reader.results_table(COEFFICIENTS_FILE).unwrap();
    assert_eq!(coefficients.len(), 5 + 5 + 7 + 9);

    let lr_tests: Vec<prepay::model::LrTest> = reader.results_table(LR_TESTS_FILE).unwrap();
    assert_eq!(lr_tests.len(), 2);
    assert!(lr_tests.iter().all(|t| t.statistic >= 0.0 && (0.0..=1.0).contains(&t.p_value)));

    // 22 pandemic months plus the overall row
    assert_eq!(fit.counterfactual.periods.len(), 22);
    assert_eq!(fit.counterfactual.rows().len(), 23);

    for (key, decomposition) in GroupKey::ALL.iter().zip(&fit.decompositions) {
        assert_eq!(decomposition.key, *key);
        assert_relative_eq!(
            decomposition.total_contribution,
            decomposition.aggregate_excess,
            epsilon = 1e-9
        );
        let group = key.to_string();
        assert!(layout.results_path(&excess_file(&group)).is_file());
        assert!(layout.results_path(&decomposition_file(&group)).is_file());
    }
    for file in ["metrics.csv", "calibration.csv", "counterfactual.csv"] {
        assert!(layout.results_path(file).is_file(), "{file} missing");
    }
}

#[test]
fn test_fit_stage_reruns_from_artifacts() {
    let root = study_root("rerun");
    let config = config(&root);
    simulate(&config.layout, 400, 23);

    let pipeline = Pipeline::new(config.clone());
    let manifest = pipeline.discover().unwrap();
    let first = pipeline.run(&manifest).unwrap();

    // Raw inputs are not needed once the panel exists.
    std::fs::remove_dir_all(&config.layout.raw_dir).unwrap();
    let second = pipeline.fit_stage().unwrap();
    assert_eq!(first.fit.nested, second.nested);
}

#[test]
fn test_missing_raw_inputs_are_fatal() {
    let root = study_root("empty");
    let config = config(&root);
    std::fs::create_dir_all(&config.layout.raw_dir).unwrap();

    let pipeline = Pipeline::new(config);
    let result = pipeline.discover().and_then(|manifest| pipeline.run(&manifest));
    assert!(matches!(result, Err(PipelineError::Data(_))));
}
