//! `switchyard check`: configuration validation and backend listing

use crate::console::CliConsole;
use colored::*;
use std::path::Path;
use switchyard_core::config::{BackendLimits, SwitchyardConfig};

/// Print the validated configuration
///
/// Loading already validated the file, so reaching this point means it is
/// usable; an absent file is reported as running on defaults.
pub fn check(console: &CliConsole, config_path: &Path, config: &SwitchyardConfig) {
    console.print_header("Configuration");

    if config_path.exists() {
        console.success(&format!("Loaded configuration from: {}", config_path.display()));
    } else {
        console.warn(&format!(
            "Configuration file not found: {}",
            config_path.display()
        ));
        console.info("Using default configuration");
    }

    let router = &config.router;
    println!(
        "  Cooldown:     {}",
        humanize_secs(router.cooldown.as_secs()).cyan()
    );
    let attempts = match router.max_attempts {
        Some(n) => n.to_string(),
        None => format!("{} (backend count)", router.backends.len()),
    };
    println!("  Max attempts: {}", attempts.cyan());
    println!("  Log level:    {}", config.logging.level.cyan());

    console.print_header("Backends (priority order)");
    if router.backends.is_empty() {
        console.warn("No backends configured; every request will fail");
        return;
    }
    for (index, backend) in router.backends.iter().enumerate() {
        let limits = backend
            .limits
            .as_ref()
            .map(describe_limits)
            .unwrap_or_else(|| "unlimited".to_string());
        println!(
            "  {}. {}  {}",
            index + 1,
            backend.backend_id.bold(),
            limits.dimmed()
        );
    }
}

/// One-line summary of the configured thresholds
pub fn describe_limits(limits: &BackendLimits) -> String {
    let parts: Vec<String> = limits
        .iter_thresholds()
        .filter_map(|(name, value)| value.map(|v| format!("{}={}", name, v)))
        .collect();
    if parts.is_empty() {
        "unlimited".to_string()
    } else {
        parts.join(", ")
    }
}

fn humanize_secs(secs: u64) -> String {
    match secs {
        s if s >= 3600 && s % 3600 == 0 => format!("{}h", s / 3600),
        s if s >= 60 && s % 60 == 0 => format!("{}m", s / 60),
        s => format!("{}s", s),
    }
}
