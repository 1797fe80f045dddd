//! Prepay CLI binary.
//!
//! Builds the loan-month panel, fits the hazard specifications and writes the
//! pandemic quantification tables.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use prepay::{FitStage, PanelStage, Pipeline};
use prepay_data::{Layout, SnapshotCache, StudyConfig};
use prepay_model::nested::Specification;
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "prepay")]
#[command(about = "Prepay: mortgage prepayment hazard panel", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Study root holding `data/` and `results/`
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// JSON study configuration; missing keys take their defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Disable the parse cache
    #[arg(long, global = true)]
    no_cache: bool,

    /// Clear the parse cache before loading
    #[arg(long, global = true)]
    refresh: bool,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the loan-month panel and aggregate series from raw files
    Panel,

    /// Fit the nested models and quantify the pandemic effect from the panel
    Fit,

    /// Run both stages
    Run,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => StudyConfig::from_json_file(path)?,
        None => StudyConfig::default(),
    };
    if let Some(root) = &cli.root {
        config.layout = Layout::under(root);
    }
    config.validate()?;

    let mut pipeline = Pipeline::new(config);
    if cli.no_cache {
        pipeline = pipeline.with_cache(SnapshotCache::disabled());
    } else if cli.refresh {
        pipeline.refresh_cache()?;
    }

    match cli.command {
        Commands::Panel => {
            let stage = panel_stage(&pipeline)?;
            print_panel(&stage);
        }
        Commands::Fit => {
            let stage = pipeline.fit_stage()?;
            print_fit(&stage);
        }
        Commands::Run => {
            let panel = panel_stage(&pipeline)?;
            print_panel(&panel);
            let fit = pipeline.fit_stage()?;
            print_fit(&fit);
        }
    }

    println!(
        "\nResults written to {}",
        pipeline.config().layout.results_dir.display()
    );
    Ok(())
}

fn panel_stage(pipeline: &Pipeline) -> Result<PanelStage, Box<dyn std::error::Error>> {
    let manifest = pipeline.discover()?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(format!(
        "Loading {} raw files and building panel...",
        manifest.entries().len()
    ));

    match pipeline.panel_stage(&manifest) {
        Ok(stage) => {
            pb.finish_with_message(format!(
                "Built panel ({} rows)",
                stage.panel.report.panel_rows
            ));
            Ok(stage)
        }
        Err(e) => {
            pb.finish_with_message("Failed!");
            Err(e.into())
        }
    }
}

fn print_header(title: &str) {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║{:^62}║", title);
    println!("╚══════════════════════════════════════════════════════════════╝\n");
}

fn print_panel(stage: &PanelStage) {
    let report = &stage.panel.report;
    print_header("LOAN-MONTH PANEL");

    println!("Origination rows:     {:>10}", report.origination_rows);
    println!("Cohort loans:         {:>10}", report.cohort_loans);
    println!("Performance rows:     {:>10}", report.performance_rows);
    println!("Joined rows:          {:>10}", report.joined_rows);
    println!("Rows without a rate:  {:>10}", report.unmatched_rate_rows);
    println!("Dropped rows:         {:>10}", report.dropped_rows);
    println!("Panel rows:           {:>10}", report.panel_rows);

    if let Some((first, last)) = stage.report.period_range {
        println!("Periods:              {first} to {last} ({} months)", stage.series.len());
    }
    let prepaid: i64 = stage.series.iter().map(|row| row.prepay_count).sum();
    println!("Prepayments:          {:>10}", prepaid);

    if !stage.audit.is_clean() {
        println!(
            "\n⚠ {} loans report activity after exiting ({} rows)",
            stage.audit.post_exit_loans, stage.audit.post_exit_rows
        );
    }
}

fn print_fit(stage: &FitStage) {
    print_header("NESTED HAZARD MODELS");

    let m2 = stage.nested.model(Specification::M2);
    println!("{} coefficients (n = {})", m2.name, m2.n_obs);
    println!("{:-<64}", "");
    println!(
        "{:<20} {:>10} {:>10} {:>10} {:>10}",
        "Term", "Estimate", "Std Err", "CI Low", "CI High"
    );
    println!("{:-<64}", "");
    for c in &m2.coefficients {
        println!(
            "{:<20} {:>10.4} {:>10.4} {:>10.4} {:>10.4}",
            c.term.name(),
            c.estimate,
            c.std_error,
            c.ci_lower,
            c.ci_upper
        );
    }

    println!("\nLikelihood-ratio tests");
    println!("{:-<64}", "");
    for test in &stage.nested.lr_tests {
        println!(
            "{:>8} vs {:<8} LR = {:>10.3}  df = {}  p = {:.4e}",
            test.restricted, test.full, test.statistic, test.df, test.p_value
        );
    }

    println!("\nLog loss");
    println!("{:-<64}", "");
    for evaluation in &stage.evaluations {
        println!(
            "{:<4} {:<18} {:>10.5}  (n = {})",
            evaluation.model, evaluation.sample.label(), evaluation.log_loss, evaluation.n_obs
        );
    }

    print_header("PANDEMIC QUANTIFICATION");

    let overall = &stage.counterfactual.overall;
    println!("With behavioral shifts:    {:>8.4}%", overall.with_bias * 100.0);
    println!("Without behavioral shifts: {:>8.4}%", overall.without_bias * 100.0);
    match overall.relative_pct {
        Some(pct) => println!(
            "Difference:                {:>8.4}% ({pct:+.1}%)",
            overall.difference * 100.0
        ),
        None => println!("Difference:                {:>8.4}%", overall.difference * 100.0),
    }

    if let Some(table) = stage.excess.first() {
        println!(
            "\nObserved {:.4}% vs baseline {:.4}% over {} loan-months",
            table.observed_rate * 100.0,
            table.expected_rate * 100.0,
            table.n_obs
        );
    }
    for decomposition in &stage.decompositions {
        println!(
            "Excess by {:<10} aggregate = {:>9.5}  residual = {:.1e}",
            decomposition.key.to_string(),
            decomposition.aggregate_excess,
            decomposition.residual
        );
    }
}
