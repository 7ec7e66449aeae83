//! `switchyard usage`: per-backend ledger report

use crate::console::CliConsole;
use anyhow::Result;
use chrono::Local;
use colored::*;
use std::collections::BTreeSet;
use switchyard_core::config::{BackendLimits, SwitchyardConfig};
use switchyard_core::{UsageLedger, UsageReport, UsageWindow};

/// Print usage for one backend, or for every configured and recorded backend
pub async fn usage(
    console: &CliConsole,
    ledger: &UsageLedger,
    config: &SwitchyardConfig,
    backend: Option<&str>,
) -> Result<()> {
    console.print_header("Backend Usage");

    let known = ledger.known_backends().await?;
    let ids = backends_to_report(config, &known, backend);
    if ids.is_empty() {
        console.warn("No backends configured and no usage recorded yet");
        return Ok(());
    }

    for id in ids {
        let report = ledger.report(&id).await?;
        let limits = config
            .router
            .backend(&id)
            .and_then(|b| b.limits.clone())
            .unwrap_or_default();
        print_report(&report, &limits, config.router.backend(&id).is_some());
    }
    Ok(())
}

/// Backends to show, configured ones first in priority order
pub fn backends_to_report(
    config: &SwitchyardConfig,
    known: &BTreeSet<String>,
    filter: Option<&str>,
) -> Vec<String> {
    if let Some(id) = filter {
        return vec![id.to_string()];
    }
    let mut ids: Vec<String> = config
        .router
        .backends
        .iter()
        .map(|b| b.backend_id.clone())
        .collect();
    for id in known {
        if !ids.contains(id) {
            ids.push(id.clone());
        }
    }
    ids
}

fn print_report(report: &UsageReport, limits: &BackendLimits, configured: bool) {
    println!();
    let mut title = report.backend_id.bold().to_string();
    if !configured {
        title.push_str(&format!(" {}", "(not in config)".dimmed()));
    }
    println!("{}", title);

    for window in UsageWindow::ALL {
        let line = window_line(report, limits, window);
        if limits.exceeded_by(window, &report.snapshot(window)) {
            println!("  {}  {}", line, "limit reached".red().bold());
        } else {
            println!("  {}", line);
        }
    }

    match report.cooldown_until {
        Some(until) => println!(
            "  {} until {}",
            "cooling down".yellow().bold(),
            until.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
        ),
        None => println!("  {}", "available".green()),
    }
}

/// `minute  requests 3/5  tokens 120` with limits where configured
pub fn window_line(report: &UsageReport, limits: &BackendLimits, window: UsageWindow) -> String {
    let usage = report.snapshot(window);
    format!(
        "{:<6}  requests {}  tokens {}",
        window.as_str(),
        with_limit(usage.requests, limits.request_limit(window)),
        with_limit(usage.tokens, limits.token_limit(window)),
    )
}

fn with_limit(used: u64, limit: Option<u64>) -> String {
    match limit {
        Some(limit) => format!("{}/{}", used, limit),
        None => used.to_string(),
    }
}
