use anyhow::{Context, Result};
use clap::Parser;
use signal_hook::consts::SIGINT;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use li_profile_scraper::output::LOG_FILE;
use li_profile_scraper::{
    logger, orchestrator, prompt, Config, InputSource, LobstrClient, RunLog, RunOptions,
    RunOutcome, SquidCache,
};

/// LinkedIn profile scraper driving the Lobstr.io API.
#[derive(Parser)]
#[command(name = "scraper")]
struct Cli {
    /// Single LinkedIn profile URL to scrape
    #[arg(short, long, conflicts_with = "list")]
    url: Option<String>,

    /// File containing one profile URL per line
    #[arg(short, long, default_value = "urls.txt")]
    list: PathBuf,

    /// Enable email enrichment
    #[arg(short, long)]
    email: bool,

    /// Squid id to use, skipping the cached one
    #[arg(long)]
    squid: Option<String>,

    /// Connected account id to scrape with
    #[arg(long)]
    account: Option<String>,

    /// Delete the cached squid remotely and create a fresh one
    #[arg(long)]
    reset: bool,

    /// Seconds between run status polls
    #[arg(long, default_value_t = 10)]
    poll_interval: u64,

    /// Never prompt; fail when a selection is ambiguous
    #[arg(short = 'y', long)]
    yes: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logger::init();

    let cli = Cli::parse();
    let run_log = RunLog::open(LOG_FILE);

    match execute(&cli, &run_log) {
        Ok(()) => Ok(()),
        Err(e) => {
            log::error!("Scraper execution failed: {:#}", e);
            run_log.append(&format!("Scraper execution failed: {:#}", e));
            Err(e)
        }
    }
}

fn execute(cli: &Cli, run_log: &RunLog) -> Result<()> {
    let config = Config::from_env()?;

    let source = match &cli.url {
        Some(url) => InputSource::Url(url.clone()),
        None => InputSource::File(cli.list.clone()),
    };
    let urls = li_profile_scraper::load_urls(&source)?;
    log::info!("Loaded {} target URL(s).", urls.len());

    let client = LobstrClient::new(&config)?;
    let cache = SquidCache::default_location();

    let interrupted = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(SIGINT, Arc::clone(&interrupted))
        .context("Failed to install SIGINT handler")?;

    let opts = RunOptions {
        enrich_email: cli.email,
        interactive: !cli.yes,
        reset_squid: cli.reset,
        requested_squid: cli.squid.clone(),
        requested_account: cli.account.clone(),
        poll_interval: Duration::from_secs(cli.poll_interval),
        output_dir: PathBuf::from("."),
    };

    let mut confirm_abort = || prompt::confirm("Abort the remote run as well? (y/N): ");
    let outcome = orchestrator::run(
        &client,
        &cache,
        &urls,
        &opts,
        run_log,
        &interrupted,
        &mut confirm_abort,
    )?;

    match outcome {
        RunOutcome::Completed { paths, records } => {
            println!(
                "\nSaved {} profiles to {} and {}",
                records,
                paths.json.display(),
                paths.csv.display()
            );
        }
        RunOutcome::Cancelled => {
            println!("\nRun cancelled; no result files were written.");
        }
    }
    Ok(())
}
