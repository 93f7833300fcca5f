use anyhow::{bail, Result};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crate::api::{RunStatus, SquidApi};
use crate::cache::SquidCache;
use crate::output::{self, OutputPaths, RunLog};
use crate::prompt;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub enrich_email: bool,
    /// Prompt at each selection step; when false, ambiguous selections fail
    /// fast instead.
    pub interactive: bool,
    /// Delete the cached squid remotely and start from a fresh one.
    pub reset_squid: bool,
    pub requested_squid: Option<String>,
    pub requested_account: Option<String>,
    pub poll_interval: Duration,
    pub output_dir: PathBuf,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            enrich_email: false,
            interactive: true,
            reset_squid: false,
            requested_squid: None,
            requested_account: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            output_dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    Completed { paths: OutputPaths, records: usize },
    Cancelled,
}

/// Drive one full scrape: resolve squid and account, submit the URLs, poll
/// the run to completion and export the results.
///
/// `interrupted` is set by the SIGINT handler; it is only observed between
/// polling iterations. `confirm_abort` decides whether a caught interrupt
/// also aborts the remote run.
pub fn run(
    api: &dyn SquidApi,
    cache: &SquidCache,
    urls: &[String],
    opts: &RunOptions,
    run_log: &RunLog,
    interrupted: &AtomicBool,
    confirm_abort: &mut dyn FnMut() -> bool,
) -> Result<RunOutcome> {
    let (squid_id, is_new) = resolve_squid(api, cache, opts)?;
    let account_id = resolve_account(api, opts)?;

    info!(
        "Updating squid {} with account {} (email enrichment: {})",
        squid_id, account_id, opts.enrich_email
    );
    api.update_squid(&squid_id, &account_id, opts.enrich_email)?;

    // A reused squid may still hold tasks from an earlier run.
    if !is_new
        && opts.interactive
        && prompt::confirm("Empty existing tasks from this Squid? (y/N): ")
    {
        api.empty_squid(&squid_id)?;
        run_log.append(&format!("Emptied squid {}", squid_id));
    }

    let count = api.add_tasks(&squid_id, urls)?;
    info!("Added {} tasks to squid {}", count, squid_id);
    run_log.append(&format!("Added {} tasks to squid {}", count, squid_id));

    let run_id = api.start_run(&squid_id)?;
    info!("Run started: {}", run_id);
    run_log.append(&format!("Run {} started for squid {}", run_id, squid_id));

    let status = poll_run(api, &run_id, opts, run_log, interrupted, confirm_abort)?;
    match status {
        RunStatus::Done => {
            let records = api.fetch_results(&run_id)?;
            info!("Fetched {} results.", records.len());
            let paths = output::write_results(&records, &opts.output_dir)?;
            info!(
                "Saved {} profiles to {} and {}",
                records.len(),
                paths.json.display(),
                paths.csv.display()
            );
            run_log.append(&format!(
                "Run {} completed: {} records written to {} and {}",
                run_id,
                records.len(),
                paths.json.display(),
                paths.csv.display()
            ));
            Ok(RunOutcome::Completed {
                paths,
                records: records.len(),
            })
        }
        RunStatus::Failed => {
            run_log.append(&format!("Run {} ended in failed state", run_id));
            bail!("Run {} ended in failed state", run_id)
        }
        RunStatus::Cancelled => {
            run_log.append(&format!("Run {} cancelled", run_id));
            Ok(RunOutcome::Cancelled)
        }
        RunStatus::Queued | RunStatus::Running => {
            bail!("Polling stopped on a non-terminal status")
        }
    }
}

/// Pick the squid to use: an explicit id, then the verified cached id, then
/// an interactive choice, and finally a freshly created squid.
fn resolve_squid(
    api: &dyn SquidApi,
    cache: &SquidCache,
    opts: &RunOptions,
) -> Result<(String, bool)> {
    if opts.reset_squid {
        if let Some(old) = cache.load() {
            if api.get_squid(&old)?.is_some() {
                api.delete_squid(&old)?;
                info!("Deleted squid {}", old);
            }
            cache.clear();
        }
    }

    if let Some(id) = &opts.requested_squid {
        match api.get_squid(id)? {
            Some(squid) => {
                remember(cache, &squid.id);
                return Ok((squid.id, false));
            }
            None => bail!("Squid {} does not exist on the platform", id),
        }
    }

    if opts.interactive {
        let squids = api.list_profile_squids()?;
        if let Some(id) = prompt::select_squid(&squids)? {
            info!("Selected existing squid: {}", id);
            remember(cache, &id);
            return Ok((id, false));
        }
    } else if let Some(id) = cache.load() {
        if api.get_squid(&id)?.is_some() {
            info!("Reusing cached squid {}", id);
            return Ok((id, false));
        }
        warn!("Cached squid {} no longer exists, creating a new one.", id);
        cache.clear();
    }

    info!(
        "Creating new squid for crawler {}...",
        crate::api::LINKEDIN_PROFILE_CRAWLER_ID
    );
    let id = api.create_squid()?;
    info!("Squid created successfully: {}", id);
    remember(cache, &id);
    Ok((id, true))
}

/// Pick the connected LinkedIn account: an explicit id, the sole available
/// account, or an interactive choice. Ambiguity fails fast when prompting
/// is off.
fn resolve_account(api: &dyn SquidApi, opts: &RunOptions) -> Result<String> {
    let accounts = api.list_linkedin_accounts()?;

    if let Some(id) = &opts.requested_account {
        if accounts.iter().any(|a| a.id == *id) {
            return Ok(id.clone());
        }
        bail!("Account {} is not a connected LinkedIn account", id);
    }

    if accounts.is_empty() {
        bail!("No LinkedIn accounts found. Please connect a LinkedIn account first.");
    }

    if accounts.len() == 1 {
        let account = &accounts[0];
        info!(
            "Auto-selecting only available LinkedIn account: {}",
            account.username.as_deref().unwrap_or(&account.id)
        );
        return Ok(account.id.clone());
    }

    if opts.interactive {
        let id = prompt::select_account(&accounts)?;
        info!("Selected account: {}", id);
        Ok(id)
    } else {
        bail!("Several LinkedIn accounts are available; pass --account to choose one")
    }
}

/// Poll the run at a fixed interval until its status leaves queued/running.
///
/// An interrupt observed between iterations asks whether to abort the
/// remote run too; declining clears the flag and resumes polling.
fn poll_run(
    api: &dyn SquidApi,
    run_id: &str,
    opts: &RunOptions,
    run_log: &RunLog,
    interrupted: &AtomicBool,
    confirm_abort: &mut dyn FnMut() -> bool,
) -> Result<RunStatus> {
    loop {
        if interrupted.swap(false, Ordering::SeqCst) {
            println!("\n[!] Execution interrupted by user.");
            if confirm_abort() {
                api.abort_run(run_id)?;
                info!("Run {} aborted successfully.", run_id);
                return Ok(RunStatus::Cancelled);
            }
            info!("Continuing without aborting run {}.", run_id);
            run_log.append(&format!("Interrupt ignored, still polling run {}", run_id));
        }

        let stats = api.run_stats(run_id)?;
        info!("Progress: {}% done...", stats.percent_done);

        let status = stats.status();
        if status.is_terminal() {
            info!("Run completed with status {:?}.", status);
            return Ok(status);
        }
        thread::sleep(opts.poll_interval);
    }
}

fn remember(cache: &SquidCache, id: &str) {
    if let Err(e) = cache.store(id) {
        warn!("Failed to write squid cache: {:#}", e);
    }
}
