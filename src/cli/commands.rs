//! CLI command implementations
//!
//! Each command loads the config, opens the tracker, does one thing and
//! closes the tracker again. Commands return the `data` payload; `run_command`
//! wraps it in the response envelope.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::config::Config;
use crate::item::ScrapeBatch;
use crate::snapshot::SNAPSHOTS_FILE;
use crate::tracker::Tracker;
use crate::transition::TRANSITIONS_FILE;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{read_request, write_error, write_response};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command. Failures are
/// reported on stdout as an error envelope and returned to the caller.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    match run_command(cli.command) {
        Ok(data) => write_response(data),
        Err(e) => {
            write_error(e.code_str(), e.message())?;
            Err(e)
        }
    }
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<Value> {
    match cmd {
        Command::Init { config } => init(&config),
        Command::Observe { config, patron, at } => {
            let batch: ScrapeBatch = read_request()?;
            observe(&config, &patron, at.as_deref(), batch)
        }
        Command::Unexpected { config, days } => unexpected(&config, days),
        Command::Missing { config, days } => missing(&config, days),
        Command::RecentItems { config, days } => recent_items(&config, days),
        Command::Prune { config } => prune(&config),
    }
}

/// Create the data directory and both empty store files.
pub fn init(config_path: &Path) -> CliResult<Value> {
    let config = load_config(config_path)?;
    let data_dir = config.data_path();

    if is_initialized(data_dir) {
        return Err(CliError::already_initialized());
    }

    Tracker::open(&config)?.close()?;

    Ok(json!({
        "initialized": true,
        "data_dir": data_dir.to_string_lossy(),
    }))
}

/// Record one cycle for `patron` and return the cycle outcome.
pub fn observe(
    config_path: &Path,
    patron: &str,
    at: Option<&str>,
    batch: ScrapeBatch,
) -> CliResult<Value> {
    let scraped_at = parse_timestamp(at)?;
    let tracker = open_tracker(config_path)?;

    let outcome = tracker.observe_cycle(patron, &batch.into_items(), scraped_at)?;
    tracker.close()?;

    to_value(&outcome)
}

pub fn unexpected(config_path: &Path, days: Option<u32>) -> CliResult<Value> {
    let (config, tracker) = open_with_config(config_path)?;
    let days = window_days(days, config.report_days_back)?;

    let rows = tracker.reports().get_unexpected_transitions(days)?;
    tracker.close()?;

    Ok(json!({ "days_back": days, "transitions": to_value(&rows)? }))
}

pub fn missing(config_path: &Path, days: Option<u32>) -> CliResult<Value> {
    let (config, tracker) = open_with_config(config_path)?;
    let days = window_days(days, config.report_days_back)?;

    let events = tracker.reports().get_missing_items_report(days)?;
    tracker.close()?;

    Ok(json!({ "days_back": days, "events": to_value(&events)? }))
}

pub fn recent_items(config_path: &Path, days: Option<u32>) -> CliResult<Value> {
    let (config, tracker) = open_with_config(config_path)?;
    let days = window_days(days, config.recent_items_days_back)?;

    let item_ids = tracker.reports().get_recent_item_ids(days)?;
    tracker.close()?;

    Ok(json!({ "days_back": days, "item_ids": item_ids }))
}

/// Apply the configured retention policy now.
pub fn prune(config_path: &Path) -> CliResult<Value> {
    let (config, tracker) = open_with_config(config_path)?;

    let outcome = tracker.apply_retention(&config.retention, Utc::now())?;
    let metrics = tracker.metrics();
    tracker.close()?;

    Ok(json!({
        "policy": to_value(&config.retention)?,
        "outcome": to_value(&outcome)?,
        "rows_pruned": metrics.rows_pruned,
    }))
}

fn load_config(config_path: &Path) -> CliResult<Config> {
    let config = Config::load(config_path)?;
    config.apply_log_level();
    Ok(config)
}

fn open_with_config(config_path: &Path) -> CliResult<(Config, Tracker)> {
    let config = load_config(config_path)?;
    if !is_initialized(config.data_path()) {
        return Err(CliError::not_initialized());
    }
    let tracker = Tracker::open(&config)?;
    Ok((config, tracker))
}

fn open_tracker(config_path: &Path) -> CliResult<Tracker> {
    open_with_config(config_path).map(|(_, tracker)| tracker)
}

/// Check if a data directory is initialized
fn is_initialized(data_dir: &Path) -> bool {
    data_dir.join(SNAPSHOTS_FILE).exists() && data_dir.join(TRANSITIONS_FILE).exists()
}

fn parse_timestamp(at: Option<&str>) -> CliResult<DateTime<Utc>> {
    match at {
        None => Ok(Utc::now()),
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(|e| CliError::invalid_input(format!("Invalid --at '{}': {}", raw, e))),
    }
}

fn window_days(requested: Option<u32>, default: u32) -> CliResult<u32> {
    match requested {
        Some(0) => Err(CliError::invalid_input("--days must be > 0")),
        Some(days) => Ok(days),
        None => Ok(default),
    }
}

fn to_value<T: Serialize>(value: &T) -> CliResult<Value> {
    Ok(serde_json::to_value(value)?)
}
