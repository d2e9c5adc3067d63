//! blogmover - migrate blog archives into Markdown posts

mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use blogmover_engine::{
    migrate_archive, migrate_site, Fetcher, LogProgressSink, ReqwestFetcher, RunReport,
};
use blogmover_logging::{migrate_error, migrate_info, migrate_warn};
use clap::Parser;

use crate::cli::{Cli, Command};

fn main() -> ExitCode {
    let cli = Cli::parse();
    blogmover_logging::initialize(cli.log_destination(), cli.log_level());
    migrate_info!("blogmover version {}", env!("CARGO_PKG_VERSION"));

    match run(&cli) {
        Ok(report) => summarize(&report),
        Err(err) => {
            migrate_error!("{err:#}");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<RunReport> {
    let config = cli.config();
    let runtime = tokio::runtime::Runtime::new().context("failed to start the async runtime")?;

    let report = match &cli.command {
        Command::Microblog { .. } => {
            let fetcher: Arc<dyn Fetcher> = Arc::new(
                ReqwestFetcher::new(config.fetch.clone()).with_repair(config.website.clone()),
            );
            runtime
                .block_on(migrate_site(&config, fetcher, Arc::new(LogProgressSink)))
                .with_context(|| format!("could not migrate {}", config.website))?
        }
        Command::Diary { input } | Command::Journal { input } | Command::Social { input } => {
            let fetcher = ReqwestFetcher::new(config.fetch.clone());
            runtime
                .block_on(migrate_archive(
                    cli.command.platform(),
                    input,
                    &config,
                    &fetcher,
                    &LogProgressSink,
                ))
                .with_context(|| format!("could not migrate {}", input.display()))?
        }
    };
    Ok(report)
}

fn summarize(report: &RunReport) -> ExitCode {
    migrate_info!(
        "{} posts written, {} documents skipped",
        report.written.len(),
        report.skipped.len()
    );
    let assets_failed = report.assets_failed();
    if assets_failed > 0 {
        migrate_warn!("{assets_failed} assets could not be downloaded");
    }
    if report.is_clean() {
        println!("all done!");
        return ExitCode::SUCCESS;
    }

    println!("the following {} errors occurred:", report.failures.len());
    for failure in &report.failures {
        println!("{failure}");
    }
    ExitCode::FAILURE
}
