//! Terminal output for the FerroMirror CLI

use console::style;
use ferromirror_config::{ConfigFormat, SyncConfig};
use ferromirror_sync::{ChangeSet, ChangeType, CycleReport, SchedulerState};
use ferromirror_types::SyncStats;
use std::time::Duration;

/// Print the values a long-running sync starts with
pub fn print_banner(config: &SyncConfig) {
    println!(
        "{} {}",
        style("⟲").blue().bold(),
        style("Sync started with following values").bold()
    );
    println!("  Sync interval: {}", style(format!("{}s", config.interval_secs())).cyan());
    println!("  Source folder path: {}", style(config.source().display()).cyan());
    println!("  Replica folder path: {}", style(config.replica().display()).cyan());
    println!("  Log file path: {}", style(config.log_file().display()).cyan());
    println!("Now logging changes:");
    println!();
}

/// Print the control command list
pub fn print_help() {
    println!("This is a simple synchronization tool that keeps a replica folder identical to a source folder");
    println!("List of available commands:");
    println!("\texit or quit: to exit the application");
    println!("\thelp or -h: to display this message");
    println!("\tshow folders or -sh f: to display source and replica folder paths");
    println!("\tshow log or -sh l: to display the log file path");
    println!("\tshow interval or -sh i: to show the interval value");
    println!("\tshow config: to show the effective configuration");
    println!("\tset interval N or -set i N: to set the interval to N seconds");
    println!("\tsync or sync now: to run a sync pass immediately");
    println!("\tstatus: to show the result of the last sync pass");
}

/// Print the source and replica paths
pub fn print_folders(config: &SyncConfig) {
    println!("Source: {}", config.source().display());
    println!("Replica: {}", config.replica().display());
}

/// Print the configuration as TOML
pub fn print_config(config: &SyncConfig) {
    match config.render(ConfigFormat::Toml) {
        Ok(rendered) => print!("{}", rendered),
        Err(e) => print_error(&e.to_string()),
    }
}

/// Print the scheduler state with the last cycle, if any
pub fn print_status(state: SchedulerState, interval_secs: u64, report: Option<&CycleReport>) {
    println!("  State: {}", style(state).cyan());
    println!("  Interval: {}", style(format!("{}s", interval_secs)).cyan());
    match report {
        Some(report) => print_cycle_report(report),
        None => println!("  No sync pass has completed yet"),
    }
}

/// Print the summary of one cycle
pub fn print_cycle_report(report: &CycleReport) {
    println!();
    println!(
        "{}",
        style(format!(
            "Sync pass {} at {}",
            report.cycle,
            report.finished_at.format("%Y-%m-%d %H:%M:%S")
        ))
        .bold()
        .underlined()
    );
    println!(
        "  Detected: {} modified, {} new, {} deleted",
        report.modified, report.added, report.deleted
    );
    if report.unreadable > 0 {
        println!("  Unreadable files: {}", style(report.unreadable).yellow());
    }
    print_stats(&report.stats);
}

fn print_stats(stats: &SyncStats) {
    println!("  Files modified: {}", style(stats.files_modified).green());
    println!("  Files created: {}", style(stats.files_created).green());
    println!("  Files deleted: {}", style(stats.files_deleted).green());
    println!(
        "  Directories created: {}",
        style(stats.directories_created).green()
    );
    println!(
        "  Directories pruned: {}",
        style(stats.directories_pruned).green()
    );
    println!(
        "  Bytes copied: {}",
        style(format_bytes(stats.bytes_copied)).green()
    );
    if stats.bytes_copied > 0 {
        println!(
            "  Transfer rate: {}/s",
            style(format_bytes(stats.transfer_rate() as u64)).green()
        );
    }
    println!("  Files skipped: {}", style(stats.files_skipped).yellow());
    println!(
        "  Errors: {}",
        if stats.errors > 0 {
            style(stats.errors).red()
        } else {
            style(stats.errors).green()
        }
    );
    println!(
        "  Duration: {}",
        style(format_duration(stats.duration)).blue()
    );
}

/// Print the changes the next cycle would apply
pub fn print_plan(changes: &ChangeSet) {
    if changes.is_empty() {
        print_success("Replica is up to date");
        return;
    }

    println!("{}", style("Pending changes:").bold().underlined());
    for (change, identity) in changes.iter() {
        let marker = match change {
            ChangeType::Modified => style("~").yellow(),
            ChangeType::Added => style("+").green(),
            ChangeType::Deleted => style("-").red(),
        };
        println!("  {} {}", marker, identity);
    }
    println!(
        "{} modified, {} new, {} deleted",
        changes.modified.len(),
        changes.added.len(),
        changes.deleted.len()
    );
}

/// Format bytes in human-readable format
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

/// Format duration in human-readable format
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{:.2}s", duration.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

/// Display an error message with proper formatting
pub fn print_error(message: &str) {
    println!("{} {}", style("✗").red().bold(), style(message).red());
}

/// Display a success message with proper formatting
pub fn print_success(message: &str) {
    println!("{} {}", style("✓").green().bold(), style(message).green());
}
