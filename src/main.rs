use anyhow::Result;
use clap::Parser;
use pardep::architecture::ArchitectureModel;
use pardep::cli::Cli;
use pardep::config::EstimationConfig;
use pardep::estimation::SeffParameterEstimation;
use pardep::monitoring::MonitoringDataSet;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; `--debug` raises everything to TRACE
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.debug);

    let base = match &args.config {
        Some(path) => EstimationConfig::from_toml_file(path)?,
        None => EstimationConfig::default(),
    };
    let config = args.apply_overrides(base);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    let dataset = MonitoringDataSet::from_json_file(&args.monitoring)?;
    let mut architecture = ArchitectureModel::from_json_file(&args.model)?;

    let mut estimation = SeffParameterEstimation::new(config);
    let summary = estimation.update(&dataset, &mut architecture);

    match &args.output {
        Some(path) => architecture.save_json_file(path)?,
        None => println!("{}", architecture.to_json_pretty()?),
    }

    eprint!("{}", summary);
    let skipped = summary.total().skipped;
    if !skipped.is_empty() {
        eprintln!("skipped: {}", skipped.join(", "));
    }

    Ok(())
}
