//! Balanced-Weights Emulation Runner
//!
//! Compares the `candidate` formula contract against the `reference` one over
//! the configured sample grid:
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌──────────┐    ┌──────────────┐
//! │  Config  │───▶│   Grid   │───▶│  init()  │───▶│ Compare loop │───▶ exit code
//! │  (YAML)  │    │ (ranges) │    │ (× 2)    │    │  (stdout)    │
//! └──────────┘    └──────────┘    └──────────┘    └──────────────┘
//! ```
//!
//! Exit status: `0` all cases match, `1` diverged, `2` setup or config error.

use std::io;
use std::process::ExitCode;

use anyhow::Context;

use weights_emulation::config::EmulationConfig;
use weights_emulation::contract::ContractDeployment;
use weights_emulation::harness::emulate;
use weights_emulation::logging::init_logging;

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

fn run() -> anyhow::Result<bool> {
    let env = get_env();
    let config = EmulationConfig::load(&env)
        .with_context(|| format!("Failed to load configuration for env {}", env))?;
    let _log_guard = init_logging(&config);

    tracing::info!(
        git = env!("GIT_HASH"),
        %env,
        candidate = %config.candidate.name,
        reference = %config.reference.name,
        "Starting balanced-weights emulation"
    );

    let grid = config.grid.build().context("Failed to build sample grid")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let report = emulate(
        &grid,
        ContractDeployment::new(config.candidate),
        ContractDeployment::new(config.reference),
        config.failure_match,
        &mut out,
    )
    .context("Emulation aborted")?;

    tracing::info!(
        total = report.total,
        executed = report.executed,
        both_failed = report.both_failed,
        equivalent = report.is_equivalent(),
        "Emulation report"
    );

    Ok(report.is_equivalent())
}

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}
