use std::fs;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use tempfile::TempDir;

use super::fake_api::{linkedin_account, FakeApi};
use super::fixtures;
use crate::api::RunStatus;
use crate::cache::SquidCache;
use crate::orchestrator::{run, RunOptions, RunOutcome};
use crate::output::RunLog;

fn test_options(dir: &TempDir) -> RunOptions {
    RunOptions {
        interactive: false,
        poll_interval: Duration::ZERO,
        output_dir: dir.path().to_path_buf(),
        ..RunOptions::default()
    }
}

fn urls(count: usize) -> Vec<String> {
    (1..=count)
        .map(|i| format!("https://www.linkedin.com/in/profile-{}", i))
        .collect()
}

fn run_quietly(
    api: &FakeApi,
    cache: &SquidCache,
    targets: &[String],
    opts: &RunOptions,
    dir: &TempDir,
) -> anyhow::Result<RunOutcome> {
    let interrupted = AtomicBool::new(false);
    let run_log = RunLog::open(dir.path().join("scraper.log"));
    run(api, cache, targets, opts, &run_log, &interrupted, &mut || {
        panic!("abort confirmation prompted without an interrupt")
    })
}

fn result_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("results_"))
        .collect();
    names.sort();
    names
}

#[test]
fn submits_all_urls_in_file_order() {
    let dir = TempDir::new().unwrap();
    let cache = SquidCache::new(dir.path().join(".squid_id"));
    cache.store("squid-1").unwrap();

    let api = FakeApi::new()
        .with_squid("squid-1")
        .with_statuses(&[RunStatus::Queued, RunStatus::Running, RunStatus::Done]);
    let targets = urls(3);

    let outcome = run_quietly(&api, &cache, &targets, &test_options(&dir), &dir).unwrap();

    assert!(matches!(outcome, RunOutcome::Completed { .. }));
    assert_eq!(*api.submitted.borrow(), targets);
    // The verified cached squid was reused, not recreated
    assert!(api.created.borrow().is_empty());
}

#[test]
fn single_url_job_has_exactly_one_task() {
    let dir = TempDir::new().unwrap();
    let cache = SquidCache::new(dir.path().join(".squid_id"));

    let api = FakeApi::new();
    let targets = vec!["https://www.linkedin.com/in/only-one".to_string()];

    run_quietly(&api, &cache, &targets, &test_options(&dir), &dir).unwrap();

    assert_eq!(
        *api.submitted.borrow(),
        vec!["https://www.linkedin.com/in/only-one".to_string()]
    );
}

#[test]
fn stale_cached_squid_falls_back_to_creating_one() {
    let dir = TempDir::new().unwrap();
    let cache = SquidCache::new(dir.path().join(".squid_id"));
    cache.store("ghost-squid").unwrap();

    let api = FakeApi::new();
    let outcome = run_quietly(&api, &cache, &urls(1), &test_options(&dir), &dir).unwrap();

    assert!(matches!(outcome, RunOutcome::Completed { .. }));
    assert_eq!(api.created.borrow().len(), 1);
    // The fresh id replaced the stale one in the cache
    assert_eq!(cache.load().as_deref(), Some("squid-new-1"));
}

#[test]
fn explicit_squid_id_must_exist_remotely() {
    let dir = TempDir::new().unwrap();
    let cache = SquidCache::new(dir.path().join(".squid_id"));

    let api = FakeApi::new();
    let opts = RunOptions {
        requested_squid: Some("nope".to_string()),
        ..test_options(&dir)
    };

    let err = run_quietly(&api, &cache, &urls(1), &opts, &dir).unwrap_err();
    assert!(err.to_string().contains("does not exist"));
    assert!(api.submitted.borrow().is_empty());
}

#[test]
fn ambiguous_accounts_fail_fast_when_not_interactive() {
    let dir = TempDir::new().unwrap();
    let cache = SquidCache::new(dir.path().join(".squid_id"));

    let mut api = FakeApi::new();
    api.accounts = vec![linkedin_account("acct-1"), linkedin_account("acct-2")];

    let err = run_quietly(&api, &cache, &urls(1), &test_options(&dir), &dir).unwrap_err();
    assert!(err.to_string().contains("--account"));
}

#[test]
fn explicit_account_skips_ambiguity() {
    let dir = TempDir::new().unwrap();
    let cache = SquidCache::new(dir.path().join(".squid_id"));

    let mut api = FakeApi::new();
    api.accounts = vec![linkedin_account("acct-1"), linkedin_account("acct-2")];

    let opts = RunOptions {
        requested_account: Some("acct-2".to_string()),
        ..test_options(&dir)
    };
    run_quietly(&api, &cache, &urls(1), &opts, &dir).unwrap();

    let updates = api.updates.borrow();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].1, "acct-2");
}

#[test]
fn missing_accounts_abort_before_submission() {
    let dir = TempDir::new().unwrap();
    let cache = SquidCache::new(dir.path().join(".squid_id"));

    let mut api = FakeApi::new();
    api.accounts.clear();

    let err = run_quietly(&api, &cache, &urls(1), &test_options(&dir), &dir).unwrap_err();
    assert!(err.to_string().contains("No LinkedIn accounts"));
    assert!(api.submitted.borrow().is_empty());
}

#[test]
fn email_enrichment_flag_reaches_the_squid_update() {
    let dir = TempDir::new().unwrap();
    let cache = SquidCache::new(dir.path().join(".squid_id"));

    let api = FakeApi::new();
    let opts = RunOptions {
        enrich_email: true,
        ..test_options(&dir)
    };
    run_quietly(&api, &cache, &urls(1), &opts, &dir).unwrap();

    let updates = api.updates.borrow();
    assert_eq!(updates.len(), 1);
    assert!(updates[0].2, "email enrichment was not requested");
}

#[test]
fn done_run_writes_both_output_files() {
    let dir = TempDir::new().unwrap();
    let cache = SquidCache::new(dir.path().join(".squid_id"));

    let mut api = FakeApi::new().with_statuses(&[RunStatus::Running, RunStatus::Done]);
    api.results = fixtures::load_results_fixture("sample_results");

    let outcome = run_quietly(&api, &cache, &urls(2), &test_options(&dir), &dir).unwrap();

    let (paths, records) = match outcome {
        RunOutcome::Completed { paths, records } => (paths, records),
        other => panic!("expected a completed run, got {:?}", other),
    };
    assert_eq!(records, 3);

    let json = fs::read_to_string(&paths.json).unwrap();
    let parsed: Vec<crate::api::Record> = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.len(), 3);

    let csv = fs::read_to_string(&paths.csv).unwrap();
    // Header plus one row per record
    assert_eq!(csv.lines().count(), 4);
}

#[test]
fn failed_run_is_an_error_and_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let cache = SquidCache::new(dir.path().join(".squid_id"));

    let api = FakeApi::new().with_statuses(&[RunStatus::Running, RunStatus::Failed]);

    let err = run_quietly(&api, &cache, &urls(1), &test_options(&dir), &dir).unwrap_err();
    assert!(err.to_string().contains("failed state"));
    assert!(result_files(dir.path()).is_empty());
}

#[test]
fn remotely_cancelled_run_ends_without_outputs() {
    let dir = TempDir::new().unwrap();
    let cache = SquidCache::new(dir.path().join(".squid_id"));

    let api = FakeApi::new().with_statuses(&[RunStatus::Cancelled]);

    let outcome = run_quietly(&api, &cache, &urls(1), &test_options(&dir), &dir).unwrap();
    assert!(matches!(outcome, RunOutcome::Cancelled));
    assert!(result_files(dir.path()).is_empty());
}

#[test]
fn confirmed_interrupt_aborts_the_remote_run() {
    let dir = TempDir::new().unwrap();
    let cache = SquidCache::new(dir.path().join(".squid_id"));

    let api = FakeApi::new().with_statuses(&[RunStatus::Running, RunStatus::Running]);
    let opts = test_options(&dir);
    let run_log = RunLog::open(dir.path().join("scraper.log"));
    let interrupted = AtomicBool::new(true);

    let outcome = run(
        &api,
        &cache,
        &urls(1),
        &opts,
        &run_log,
        &interrupted,
        &mut || true,
    )
    .unwrap();

    assert!(matches!(outcome, RunOutcome::Cancelled));
    assert_eq!(*api.aborted.borrow(), vec!["run-1".to_string()]);
    assert!(result_files(dir.path()).is_empty());
}

#[test]
fn declined_interrupt_resumes_polling() {
    let dir = TempDir::new().unwrap();
    let cache = SquidCache::new(dir.path().join(".squid_id"));

    let mut api = FakeApi::new().with_statuses(&[RunStatus::Running, RunStatus::Done]);
    api.results = fixtures::load_results_fixture("sample_results");
    let opts = test_options(&dir);
    let run_log = RunLog::open(dir.path().join("scraper.log"));
    let interrupted = AtomicBool::new(true);

    let mut prompts = 0;
    let outcome = run(
        &api,
        &cache,
        &urls(1),
        &opts,
        &run_log,
        &interrupted,
        &mut || {
            prompts += 1;
            false
        },
    )
    .unwrap();

    assert!(matches!(outcome, RunOutcome::Completed { .. }));
    assert_eq!(prompts, 1);
    assert!(api.aborted.borrow().is_empty());
}

#[test]
fn reset_deletes_the_cached_squid_before_creating_a_fresh_one() {
    let dir = TempDir::new().unwrap();
    let cache = SquidCache::new(dir.path().join(".squid_id"));
    cache.store("squid-old").unwrap();

    let api = FakeApi::new().with_squid("squid-old");
    let opts = RunOptions {
        reset_squid: true,
        ..test_options(&dir)
    };
    run_quietly(&api, &cache, &urls(1), &opts, &dir).unwrap();

    assert_eq!(*api.deleted.borrow(), vec!["squid-old".to_string()]);
    assert_eq!(api.created.borrow().len(), 1);
    assert_eq!(cache.load().as_deref(), Some("squid-new-1"));
}
