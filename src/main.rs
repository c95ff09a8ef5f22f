use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use overkill::apply::{ApplyOutcome, Applier};
use overkill::backup::BackupStore;
use overkill::cli::{Cli, Command};
use overkill::detect::SystemFacts;
use overkill::layout::Layout;
use overkill::profile::{Catalog, ProfileName};
use overkill::sysfs::SysfsRoot;
use overkill::txlog::TransactionLog;
use std::path::PathBuf;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let root = cli.root.clone().unwrap_or_else(|| PathBuf::from("/"));
    let sysfs = SysfsRoot::new(&root);
    let layout = Layout::new(&root);

    match cli.command {
        Command::Detect => cmd_detect(&sysfs, cli.json)?,
        Command::Profiles => cmd_profiles(&sysfs, &layout, cli.json)?,
        Command::Apply {
            profile,
            dry_run,
            yes,
        } => cmd_apply(&sysfs, &layout, profile, dry_run, yes, cli.json)?,
        Command::Status => cmd_status(&layout, cli.json)?,
        Command::Rollback { file, yes } => cmd_rollback(&layout, file, yes)?,
        Command::Log => cmd_log(&layout, cli.json)?,
        Command::Completions { shell } => overkill::cli::print_completions(shell),
    }

    Ok(())
}

fn cmd_detect(sysfs: &SysfsRoot, json: bool) -> Result<()> {
    let facts = SystemFacts::detect(sysfs)?;
    let issues = overkill::detect::check_requirements(&facts);

    if json {
        overkill::output::print_json(&serde_json::json!({
            "facts": facts,
            "issues": issues,
        }));
        return Ok(());
    }

    overkill::output::print_facts(&facts, &issues);

    let candidates: Vec<_> = facts.primary_candidates().collect();
    if candidates.len() > 1 {
        println!(
            "  {} Multiple NVMe devices found; pick one when partitioning.",
            "Note:".yellow()
        );
    }

    Ok(())
}

fn cmd_profiles(sysfs: &SysfsRoot, layout: &Layout, json: bool) -> Result<()> {
    let catalog = Catalog::load(layout)?;
    let facts = SystemFacts::detect(sysfs)?;
    let recommended = overkill::profile::recommended_for(&facts);

    if json {
        let profiles: Vec<_> = catalog.iter().collect();
        overkill::output::print_json(&serde_json::json!({
            "profiles": profiles,
            "recommended": recommended,
        }));
        return Ok(());
    }

    overkill::output::print_profiles(&catalog, recommended);
    Ok(())
}

fn cmd_apply(
    sysfs: &SysfsRoot,
    layout: &Layout,
    profile: ProfileName,
    dry_run: bool,
    yes: bool,
    json: bool,
) -> Result<()> {
    let catalog = Catalog::load(layout)?;
    let config = catalog.lookup(profile)?;
    let facts = SystemFacts::detect(sysfs)?;

    let planned = overkill::apply::plan(config, &facts, layout)?;
    if !json {
        overkill::output::print_plan(&planned);
    }

    if dry_run {
        if json {
            overkill::output::print_json(&planned);
        } else {
            println!("{}", "Dry run complete. No changes applied.".yellow());
        }
        return Ok(());
    }

    if layout.is_system() && !nix::unistd::geteuid().is_root() {
        anyhow::bail!("must run as root: sudo overkill apply {}", profile);
    }

    if !yes {
        if !facts.cooling_present && profile >= ProfileName::Performance {
            println!(
                "{}",
                "Warning: no active cooling detected. This profile will throttle or worse."
                    .red()
                    .bold()
            );
        }
        println!(
            "{}",
            "Overclocking can damage hardware and void warranties.".bold()
        );
        if !confirm(&format!("Apply the '{}' profile?", profile))? {
            println!("Aborted.");
            return Ok(());
        }
        println!();
    }

    let mut applier = Applier::new(layout)?;
    let report = applier.apply(config, &facts)?;

    if json {
        overkill::output::print_json(&report);
    } else {
        overkill::output::print_report(&report);
        if report.outcome == ApplyOutcome::FullyApplied {
            println!();
            println!(
                "  Reboot required. Run {} to undo.",
                "sudo overkill rollback".cyan()
            );
        }
    }

    if report.outcome != ApplyOutcome::FullyApplied {
        anyhow::bail!("apply did not complete: {}", report.outcome);
    }

    Ok(())
}

fn cmd_status(layout: &Layout, json: bool) -> Result<()> {
    let report = match overkill::status::check(layout)? {
        Some(r) => r,
        None => {
            println!(
                "{}",
                "No profile applied yet. Run `sudo overkill apply <profile>` to start.".yellow()
            );
            return Ok(());
        }
    };

    if json {
        overkill::output::print_json(&report);
    } else {
        overkill::output::print_status(&report);
    }

    Ok(())
}

fn cmd_rollback(layout: &Layout, file: Option<PathBuf>, yes: bool) -> Result<()> {
    if layout.is_system() && !nix::unistd::geteuid().is_root() {
        anyhow::bail!("must run as root: sudo overkill rollback");
    }

    let store = BackupStore::open(layout)?;
    if store.is_empty() {
        println!("{}", "No backups recorded. Nothing to roll back.".yellow());
        return Ok(());
    }

    if !yes && !confirm("Restore pristine configuration?")? {
        println!("Aborted.");
        return Ok(());
    }

    match file {
        Some(path) => {
            store.restore(&path)?;
            println!("  {} {}", "restored".green(), path.display());
        }
        None => {
            let mut failures = 0;
            for (path, result) in store.restore_all() {
                match result {
                    Ok(()) => println!("  {} {}", "restored".green(), path.display()),
                    Err(e) => {
                        failures += 1;
                        eprintln!("  {} {}: {}", "!".red(), path.display(), e);
                    }
                }
            }
            if failures > 0 {
                anyhow::bail!("{} file(s) could not be restored", failures);
            }
        }
    }

    println!();
    println!("{}", "Rollback complete. Reboot to take effect.".green().bold());
    Ok(())
}

fn cmd_log(layout: &Layout, json: bool) -> Result<()> {
    let log = TransactionLog::open(layout)?;
    let entries = log.read_log()?;

    if json {
        overkill::output::print_json(&entries);
    } else {
        overkill::output::print_log(&entries);
    }

    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    std::io::Write::flush(&mut std::io::stdout())?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}
