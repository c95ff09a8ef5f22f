use crate::apply::{ApplyOutcome, ApplyReport, PlannedStep};
use crate::detect::SystemFacts;
use crate::editor::{MutationStatus, SectionState};
use crate::profile::{Catalog, ProfileName};
use crate::status::StatusReport;
use crate::txlog::LogEntry;
use colored::Colorize;
use serde::Serialize;

const LABEL_W: usize = 14;

pub fn print_facts(facts: &SystemFacts, issues: &[String]) {
    let storage = if facts.storage.is_empty() {
        "none".to_string()
    } else {
        facts
            .storage
            .iter()
            .map(|d| {
                if d.is_primary_candidate {
                    format!("{}*", d.name)
                } else {
                    d.name.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    };

    let rows: Vec<(&str, String)> = vec![
        (
            "Model",
            if facts.hardware_model.is_empty() {
                "Unknown".to_string()
            } else {
                facts.hardware_model.clone()
            },
        ),
        (
            "OS marker",
            if facts.os_marker_present {
                "Armbian environment found".to_string()
            } else {
                "not found".to_string()
            },
        ),
        ("Storage", storage),
        ("Memory", format!("{} GiB", facts.memory_gib)),
        (
            "Cooling",
            if facts.cooling_present {
                "active".to_string()
            } else {
                "none".to_string()
            },
        ),
    ];

    let inner_w = rows
        .iter()
        .map(|(l, v)| l.len().max(LABEL_W) + 2 + v.len())
        .max()
        .unwrap_or(40);

    let title = "System";
    let fill = inner_w.saturating_sub(1 + title.len());
    println!("╭─ {} {}╮", title.bold(), "─".repeat(fill));
    for (label, value) in &rows {
        let padded = format!("{:<w$}", label, w = LABEL_W);
        let pad = inner_w.saturating_sub(LABEL_W + 2 + value.len());
        println!("│ {}  {}{} │", padded.dimmed(), value, " ".repeat(pad));
    }
    println!("╰{}╯", "─".repeat(inner_w + 2));

    if issues.is_empty() {
        println!("  {}", "Meets the appliance baseline.".green());
    } else {
        println!("  {} Requirement issues:", "!!".yellow());
        for issue in issues {
            println!("     {}", issue);
        }
    }
    println!();
}

pub fn print_profiles(catalog: &Catalog, recommended: ProfileName) {
    println!("{}", "Profiles".bold().underline());
    println!();
    for config in catalog.iter() {
        let marker = if config.profile == recommended {
            " (recommended)".green().to_string()
        } else {
            String::new()
        };
        let name = format!("{:<12}", config.profile);
        println!(
            "  {} {}MHz/{}MHz over_voltage={}{}",
            name.bold(),
            config.cpu_freq_mhz,
            config.gpu_freq_mhz,
            config.over_voltage,
            marker
        );
        if !config.description.is_empty() {
            println!("               {}", config.description.dimmed());
        }
    }
    println!();
}

pub fn print_plan(steps: &[PlannedStep]) {
    println!("{}", "Apply Plan".bold().underline());
    println!();
    for step in steps {
        let action = match step.state {
            SectionState::Missing => "write".cyan(),
            SectionState::Differs => "update".yellow(),
            SectionState::UpToDate => "keep".green(),
        };
        println!(
            "  {} {:<12} {}",
            ">>".cyan(),
            action,
            step.path.display().to_string().dimmed()
        );
    }
    println!();
}

pub fn print_report(report: &ApplyReport) {
    println!();
    match report.outcome {
        ApplyOutcome::FullyApplied => {
            println!("{}", "Applied successfully!".green().bold());
        }
        ApplyOutcome::PartiallyApplied => {
            println!("{}", "Partially applied.".yellow().bold());
        }
        ApplyOutcome::FailedBeforeMutation => {
            println!("{}", "Failed before any mutation.".red().bold());
        }
    }

    for record in &report.records {
        let tag = match record.status {
            MutationStatus::Applied => format!("{:>8}", "changed").green(),
            MutationStatus::SkippedAlreadyPresent => format!("{:>8}", "current").dimmed(),
            MutationStatus::Failed => format!("{:>8}", "failed").red(),
            MutationStatus::Pending => format!("{:>8}", "pending").yellow(),
        };
        println!("  {}  {}", tag, record.file_path.display());
    }

    println!(
        "  {} changed, {} already current, {} failed",
        report.changed(),
        report.skipped(),
        report.failed()
    );

    if let Some(error) = &report.error {
        println!("  {} {}", "error:".red(), error);
    }
}

pub fn print_status(report: &StatusReport) {
    println!(
        "{} (profile {}, applied {})",
        "Status".bold().underline(),
        report.profile,
        report.applied_at
    );
    println!();
    for section in &report.sections {
        let state = if section.current {
            format!("{:>8}", "current").green()
        } else if section.present {
            format!("{:>8}", "drifted").yellow()
        } else {
            format!("{:>8}", "missing").red()
        };
        println!("  {}  {}", state, section.path);
    }
    println!();
    if report.drifted_count() == 0 {
        println!("{}", "All managed sections are intact.".green());
    } else {
        println!(
            "{} {} of {} sections drifted. Re-apply to repair.",
            "!!".yellow(),
            report.drifted_count(),
            report.sections.len()
        );
    }
}

pub fn print_log(entries: &[LogEntry]) {
    if entries.is_empty() {
        println!("{}", "Transaction log is empty.".yellow());
        return;
    }
    for entry in entries {
        let status = match entry.status {
            MutationStatus::Applied => entry.status.to_string().green(),
            MutationStatus::SkippedAlreadyPresent => entry.status.to_string().dimmed(),
            MutationStatus::Failed => entry.status.to_string().red(),
            MutationStatus::Pending => entry.status.to_string().yellow(),
        };
        println!(
            "{}  {}  {}  {}",
            entry.timestamp.dimmed(),
            entry.file_path,
            entry.section_marker.dimmed(),
            status
        );
    }
}

pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("error: failed to serialize output: {}", e),
    }
}
