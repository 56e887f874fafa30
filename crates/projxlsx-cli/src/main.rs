//! projxlsx CLI - task-list XML / xlsx converter
//!
//! Converts task-list XML to an xlsx worksheet and back, and prints the
//! tasks stored in a workbook.

mod inspect;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use projxlsx_engine::CalendarEngine;
use projxlsx_xlsx::XlsxPackage;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "projxlsx")]
#[command(author, version, about = "Task-list XML <-> xlsx converter", long_about = None)]
struct Cli {
    /// Verbose output (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert task-list XML to xlsx, or xlsx to task-list XML
    Convert {
        /// Source file; `.xlsx` is read as a workbook, anything else as XML
        #[arg(value_name = "SOURCE")]
        source: PathBuf,

        /// Target file (defaults to the source with the other extension)
        #[arg(value_name = "TARGET")]
        target: Option<PathBuf>,

        /// Workbook whose layout is reused on export
        #[arg(long, env = "PROJXLSX_TEMPLATE", value_name = "FILE")]
        template: Option<PathBuf>,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Print the tasks stored in a workbook
    Inspect {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        engine: EngineArgs,
    },
}

#[derive(clap::Args)]
struct EngineArgs {
    /// Working hours per day
    #[arg(long, env = "PROJXLSX_HOURS_PER_DAY", default_value_t = 8.0)]
    hours_per_day: f64,

    /// Hourly rate of a resource, e.g. `--rate Ana=45` (repeatable)
    #[arg(long = "rate", value_name = "NAME=AMOUNT", value_parser = parse_rate)]
    rates: Vec<(String, f64)>,
}

impl EngineArgs {
    fn engine(&self) -> CalendarEngine {
        self.rates.iter().fold(
            CalendarEngine::new().hours_per_day(self.hours_per_day),
            |engine, (name, rate)| engine.rate(name.clone(), *rate),
        )
    }
}

fn load_template(path: Option<&Path>) -> Result<XlsxPackage> {
    match path {
        Some(path) => {
            let bytes = fs::read(path)
                .with_context(|| format!("Failed to read template {}", path.display()))?;
            XlsxPackage::from_bytes(&bytes)
                .with_context(|| format!("Invalid template {}", path.display()))
        }
        None => Ok(XlsxPackage::template()?),
    }
}

fn parse_rate(s: &str) -> Result<(String, f64), String> {
    let (name, amount) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=AMOUNT, got '{s}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing resource name in '{s}'"));
    }
    let amount: f64 = amount
        .trim()
        .parse()
        .map_err(|_| format!("invalid amount in '{s}'"))?;
    Ok((name.to_string(), amount))
}

fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xlsx"))
}

fn format_name(is_workbook: bool) -> &'static str {
    if is_workbook {
        "Excel"
    } else {
        "Project XML"
    }
}

fn convert(
    source: &Path,
    target: Option<PathBuf>,
    template: Option<&Path>,
    args: &EngineArgs,
) -> Result<()> {
    let from_workbook = is_workbook(source);
    let target = target.unwrap_or_else(|| {
        source.with_extension(if from_workbook { "xml" } else { "xlsx" })
    });

    println!(
        "Converting {} to {} (from {} to {})...",
        source.display(),
        target.display(),
        format_name(from_workbook),
        format_name(!from_workbook)
    );

    let engine = args.engine();
    if from_workbook {
        let bytes =
            fs::read(source).with_context(|| format!("Failed to read {}", source.display()))?;
        let list = projxlsx_xlsx::import_workbook(&bytes, &engine)
            .with_context(|| format!("Failed to import {}", source.display()))?;
        let xml = projxlsx_parser::write_task_list(&list)?;
        fs::write(&target, xml)
            .with_context(|| format!("Failed to write {}", target.display()))?;
    } else {
        let list = projxlsx_parser::parse_file(source)
            .with_context(|| format!("Failed to parse {}", source.display()))?;
        debug!(tasks = list.len(), "parsed task list");
        let bytes = projxlsx_xlsx::export_workbook(&list, &engine, &load_template(template)?)
            .with_context(|| format!("Failed to export {}", source.display()))?;
        fs::write(&target, bytes)
            .with_context(|| format!("Failed to write {}", target.display()))?;
    }

    println!("Done.");
    Ok(())
}

fn run_inspect(file: &Path, json: bool, args: &EngineArgs) -> Result<()> {
    let bytes = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let engine = args.engine();
    let list = projxlsx_xlsx::import_workbook(&bytes, &engine)
        .with_context(|| format!("Failed to import {}", file.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&list)?);
    } else {
        print!("{}", inspect::render_table(&list, &engine));
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    match cli.command {
        Some(Commands::Convert {
            source,
            target,
            template,
            engine,
        }) => convert(&source, target, template.as_deref(), &engine)?,
        Some(Commands::Inspect { file, json, engine }) => run_inspect(&file, json, &engine)?,
        None => {
            println!("Converts task-list XML files to Excel, or Excel (this layout) to task-list XML.");
            println!();
            println!("Usage:");
            println!("  projxlsx convert source.xml [target.xlsx]");
            println!("  projxlsx convert source.xlsx [target.xml]");
            println!("  projxlsx inspect workbook.xlsx [--json]");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_arguments() {
        assert_eq!(parse_rate("Ana=45").unwrap(), ("Ana".to_string(), 45.0));
        assert_eq!(parse_rate(" Ben = 12.5 ").unwrap(), ("Ben".to_string(), 12.5));
        assert!(parse_rate("Ana").is_err());
        assert!(parse_rate("=4").is_err());
        assert!(parse_rate("Ana=lots").is_err());
    }

    #[test]
    fn workbook_detection() {
        assert!(is_workbook(Path::new("plan.xlsx")));
        assert!(is_workbook(Path::new("PLAN.XLSX")));
        assert!(!is_workbook(Path::new("plan.xml")));
        assert!(!is_workbook(Path::new("plan")));
    }

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
