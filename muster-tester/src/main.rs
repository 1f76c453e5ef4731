mod logic;
mod scenario;
mod util;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use logic::reports::{ReportFormat, write_report};
use logic::{LogicTester, ScenarioResult, TesterAssets};
use scenario::{get_scenario, list_scenarios};
use util::{parse_seeds, split_csv};

#[derive(Debug, Parser)]
#[command(name = "muster-tester", version = "0.1.0")]
#[command(about = "Seeded QA sweeps for the Muster promotion engine")]
struct Args {
    /// Scenarios to run (comma-separated, or "all")
    #[arg(long, default_value = "smoke")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run (comma-separated)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Iterations per scenario and seed
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Report format
    #[arg(long, value_enum, default_value_t)]
    report: ReportFormat,

    /// Print every iteration
    #[arg(short, long)]
    verbose: bool,

    /// Write the report here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Unit catalog JSON to use instead of the bundled one
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Upgrade configuration JSON to use instead of the defaults
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut out = open_output(args.output.as_deref())?;

    if args.list_scenarios {
        write_scenario_list(&mut out)?;
        return Ok(());
    }

    println!("{}", "⚔️  Muster Promotion Tester".bright_cyan().bold());
    println!("{}", "===========================".cyan());

    let started = Instant::now();
    let seeds = parse_seeds(&split_csv(&args.seeds))?;
    let assets = Arc::new(TesterAssets::load(
        args.catalog.as_deref(),
        args.config.as_deref(),
    )?);
    let results = run_logic_scenarios(&args, &expand_scenarios(&args.scenarios), &seeds, assets);

    write_report(&mut out, args.report, &results, started.elapsed())?;
    out.flush()?;
    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }
    Ok(())
}

/// Buffered report sink: the given file, or stdout.
fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(BufWriter::new(stdout())),
    })
}

fn write_scenario_list<W: Write + ?Sized>(out: &mut W) -> Result<()> {
    writeln!(out, "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(out, "  {key:15} - {description}")?;
    }
    out.flush()?;
    Ok(())
}

/// Split the `--scenarios` list; "all" appends every scenario not already named.
fn expand_scenarios(scenarios_arg: &str) -> Vec<String> {
    let mut scenarios = split_csv(scenarios_arg);
    if scenarios.iter().any(|s| s == "all") {
        scenarios.retain(|s| s != "all");
        for (key, _) in list_scenarios() {
            if !scenarios.iter().any(|s| s == key) {
                scenarios.push(key.to_string());
            }
        }
    }
    scenarios
}

fn run_logic_scenarios(
    args: &Args,
    scenarios: &[String],
    seeds: &[u64],
    assets: Arc<TesterAssets>,
) -> Vec<ScenarioResult> {
    println!("{}", "🧠 Running Logic Tests".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());

    let tester = LogicTester::new(assets, args.verbose);
    scenarios
        .iter()
        .filter_map(|key| {
            let found = get_scenario(key);
            if found.is_none() {
                eprintln!("⚠️  Unknown scenario: {}", key.yellow());
            }
            found
        })
        .flat_map(|scenario| tester.run_scenario(&scenario, seeds, args.iterations))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args::parse_from(["muster-tester", "--iterations", "1"])
    }

    fn temp_path(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!("muster-tester-{label}-{}", std::process::id()))
    }

    #[test]
    fn report_flag_parses_into_format() {
        assert_eq!(base_args().report, ReportFormat::Console);
        let args = Args::parse_from(["muster-tester", "--report", "markdown"]);
        assert_eq!(args.report, ReportFormat::Markdown);
        assert!(Args::try_parse_from(["muster-tester", "--report", "yaml"]).is_err());
    }

    #[test]
    fn expands_all_scenarios_keyword() {
        let expanded = expand_scenarios("all,smoke");
        assert_eq!(expanded[0], "smoke");
        assert!(expanded.contains(&"determinism".to_string()));
        assert_eq!(expanded.len(), list_scenarios().len());
    }

    #[test]
    fn expand_scenarios_without_all_preserves_order() {
        let expanded = expand_scenarios("terminality,smoke");
        assert_eq!(expanded, vec!["terminality".to_string(), "smoke".to_string()]);
    }

    #[test]
    fn run_logic_scenarios_skips_unknown_names() {
        let assets = Arc::new(TesterAssets::load_default());
        let results = run_logic_scenarios(
            &base_args(),
            &["smoke".to_string(), "nonexistent".to_string()],
            &[42],
            assets,
        );
        assert_eq!(results.len(), 1);
        assert!(results[0].passed);
    }

    #[test]
    fn scenario_list_goes_to_output_file() {
        let temp = temp_path("scenarios.txt");
        let mut out = open_output(Some(temp.as_path())).unwrap();
        write_scenario_list(&mut out).unwrap();
        drop(out);
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("Available scenarios"));
        assert!(content.contains("locked-roles"));
    }

    #[test]
    fn unwritable_output_path_is_reported() {
        let err = open_output(Some(Path::new("/nonexistent/dir/report.txt")))
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("failed to create"));
    }
}
