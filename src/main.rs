use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use std::path::{Path, PathBuf};
use style_patcher::rules::{self, RuleReport, RuleResult, RuleSet, DEFAULT_STYLESHEET};
use style_patcher::{FileReport, PatchOptions, StylePatcher};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "style-patcher")]
#[command(about = "Scoped CSS declaration patching", long_about = None)]
#[command(version)]
struct Cli {
    /// Defaults to `apply` with no options
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply rules to a stylesheet and write it back
    Apply {
        #[command(flatten)]
        target: TargetArgs,

        /// Dry run - show what would be changed without modifying the file
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,

        /// Print a JSON report instead of human-readable output
        #[arg(long)]
        json: bool,
    },

    /// Check which rules would still change the stylesheet (never writes)
    Check {
        #[command(flatten)]
        target: TargetArgs,

        /// Print a JSON report instead of human-readable output
        #[arg(long)]
        json: bool,
    },

    /// List the rules that would be applied
    Rules {
        /// Rule file or directory of rule files (default: built-in navbar rules)
        #[arg(short, long)]
        rules: Option<PathBuf>,
    },
}

#[derive(Args, Clone, Default)]
struct TargetArgs {
    /// Stylesheet to patch (default: the rule set's target, then src/styles/index.css)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Rule file or directory of rule files (default: built-in navbar rules)
    #[arg(short, long)]
    rules: Option<PathBuf>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    file: String,
    changed: bool,
    written: bool,
    replacements: usize,
    rules: &'a [RuleReport],
}

impl<'a> JsonReport<'a> {
    fn from_report(report: &'a FileReport) -> Self {
        Self {
            file: report.path.display().to_string(),
            changed: report.changed(),
            written: report.written,
            replacements: report.outcome.replacements(),
            rules: &report.outcome.reports,
        }
    }
}

fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        None => cmd_apply(TargetArgs::default(), false, false, false),

        Some(Commands::Apply {
            target,
            dry_run,
            diff,
            json,
        }) => cmd_apply(target, dry_run, diff, json),

        Some(Commands::Check { target, json }) => cmd_check(target, json),

        Some(Commands::Rules { rules }) => cmd_rules(rules),
    }
}

/// Logs go to stderr so stdout carries only the report.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Helper: Load the rule set from `--rules`, or fall back to the built-in table.
fn load_rule_set(path: Option<&Path>) -> Result<RuleSet> {
    match path {
        Some(path) => {
            rules::load(path).with_context(|| format!("failed to load rules from {}", path.display()))
        }
        None => Ok(rules::nav_links_rules()),
    }
}

/// Resolve the stylesheet path
///
/// Priority order:
/// 1. Explicit --file flag
/// 2. `meta.target` of the rule set
/// 3. The built-in default path
fn resolve_target(file: Option<PathBuf>, rules: &RuleSet) -> PathBuf {
    file.or_else(|| rules.meta.target.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STYLESHEET))
}

/// Helper: Show unified diff between original and modified content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

fn print_rule_line(report: &RuleReport) {
    match &report.result {
        RuleResult::Applied { .. } => {
            println!("{} {}: {}", "✓".green(), report.id, report.result)
        }
        RuleResult::AlreadyApplied => {
            println!("{} {}: {}", "⊙".yellow(), report.id, report.result)
        }
        RuleResult::NoMatch { .. } => {
            println!("{} {}: {}", "⊘".cyan(), report.id, report.result)
        }
    }
}

fn cmd_apply(target: TargetArgs, dry_run: bool, show_diff: bool, json: bool) -> Result<()> {
    let rules = load_rule_set(target.rules.as_deref())?;
    let path = resolve_target(target.file, &rules);

    let report = StylePatcher::new(rules)
        .patch_file(&path, PatchOptions { dry_run })
        .with_context(|| format!("failed to patch {}", path.display()))?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&JsonReport::from_report(&report))?
        );
        return Ok(());
    }

    if dry_run || show_diff {
        for rule in &report.outcome.reports {
            print_rule_line(rule);
        }
    }

    if show_diff && report.changed() {
        display_diff(&report.path, &report.original, &report.outcome.text);
    }

    if dry_run {
        println!("CSS check complete (dry run), file not modified.");
    } else {
        println!("CSS updated successfully!");
    }

    Ok(())
}

fn cmd_check(target: TargetArgs, json: bool) -> Result<()> {
    let rules = load_rule_set(target.rules.as_deref())?;
    let path = resolve_target(target.file, &rules);

    let report = StylePatcher::new(rules)
        .patch_file(&path, PatchOptions { dry_run: true })
        .with_context(|| format!("failed to check {}", path.display()))?;

    let pending = report.outcome.has_pending();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&JsonReport::from_report(&report))?
        );
    } else {
        println!("{}", "Rule Status Report".bold());
        println!("Stylesheet: {}", path.display());
        println!();

        for rule in &report.outcome.reports {
            print_rule_line(rule);
        }

        let count = |f: fn(&RuleResult) -> bool| {
            report
                .outcome
                .reports
                .iter()
                .filter(|r| f(&r.result))
                .count()
        };

        println!();
        println!("{}", "Summary:".bold());
        println!(
            "  {} pending",
            format!("{}", count(|r| matches!(r, RuleResult::Applied { .. }))).green()
        );
        println!(
            "  {} already applied",
            format!("{}", count(|r| matches!(r, RuleResult::AlreadyApplied))).yellow()
        );
        println!(
            "  {} no match",
            format!("{}", count(|r| matches!(r, RuleResult::NoMatch { .. }))).cyan()
        );
    }

    if pending {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_rules(path: Option<PathBuf>) -> Result<()> {
    let rules = load_rule_set(path.as_deref())?;

    println!("{}", rules.meta.name.bold());
    if let Some(description) = &rules.meta.description {
        println!("{}", description.dimmed());
    }
    println!(
        "Target: {}",
        resolve_target(None, &rules).display()
    );
    println!();

    for rule in &rules.rules {
        println!("  {} {}", format!("{}:", rule.id).cyan(), rule);
    }

    Ok(())
}
