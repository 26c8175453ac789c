use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgGroup, Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod export;
mod filter;
mod models;
mod record;
mod remote;
mod store;
mod sync;

use models::{FilterCriterion, Period, Status};
use remote::{FileRemote, RemoteSource};
use store::RosterStore;
use sync::{FetchReport, Resolution, SyncController};

#[derive(Parser)]
#[command(name = "roster-tracker")]
#[command(about = "Track and update student attendance rosters", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display the roster for a class period or an attendance status
    #[command(group(
        ArgGroup::new("scope")
            .args(["period", "status"])
            .multiple(false)
    ))]
    Show {
        /// Class period, 1 through 7
        #[arg(long, value_parser = parse_period)]
        period: Option<Period>,
        /// Show this status across all periods
        #[arg(long, value_enum)]
        status: Option<Status>,
    },
    /// Change one student's attendance status and save it back
    Set {
        /// Row index as printed by `show`
        #[arg(long)]
        index: usize,
        #[arg(long, value_enum)]
        status: Status,
        /// Commit without asking for confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Export the online students to a CSV file
    Export {
        #[arg(long, default_value = "online_students.csv")]
        out: PathBuf,
    },
}

fn parse_period(raw: &str) -> Result<Period, String> {
    raw.parse::<u8>()
        .ok()
        .and_then(Period::new)
        .ok_or_else(|| format!("period must be a digit between 1 and 7, got {raw:?}"))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .without_time()
        .init();

    let cli = Cli::parse();
    let roster_path = std::env::var("ROSTER_FILE")
        .context("ROSTER_FILE must be set to the path of the shared roster file")?;
    let mut controller = SyncController::new(FileRemote::new(roster_path));

    match cli.command {
        Commands::Show { period, status } => {
            let report = controller.fetch()?;
            print_skipped(&report);
            let store = loaded_store(&controller)?;

            let criterion = match (period, status) {
                (_, Some(status)) => FilterCriterion::ByStatus(status),
                (Some(period), None) => FilterCriterion::ByPeriod(period),
                (None, None) => FilterCriterion::All(Period::FIRST),
            };

            println!("{}", view_heading(criterion));
            let view = filter::apply(store, criterion);
            if view.is_empty() {
                println!("No students match this view.");
            }
            for (index, entry) in view {
                let line = format!(
                    "{index:>3}  {}, {}  [{}]",
                    entry.last_name, entry.first_name, entry.status
                );
                if entry.status == Status::Online {
                    println!("{}", line.as_str().blue());
                } else {
                    println!("{line}");
                }
            }
        }
        Commands::Set { index, status, yes } => {
            let report = controller.fetch()?;
            print_skipped(&report);
            controller.set_status(index, status)?;

            let resolution =
                controller.resolve_dirty(|| yes || prompt_confirm("Save changes?").unwrap_or(false))?;
            match resolution {
                Resolution::Clean => {
                    println!("No change: the student is already marked {status}.");
                }
                Resolution::Committed => {
                    let count = controller.store().map_or(0, RosterStore::len);
                    println!("Changes saved; roster now holds {count} students.");
                }
                Resolution::Discarded => {
                    println!("Changes discarded.");
                }
            }
        }
        Commands::Export { out } => {
            let report = controller.fetch()?;
            print_skipped(&report);
            let store = loaded_store(&controller)?;
            let csv = export::online_roster_csv(store.entries())?;
            std::fs::write(&out, csv)
                .with_context(|| format!("could not write {}", out.display()))?;
            println!("Online students exported to {}.", out.display());
        }
    }

    Ok(())
}

fn loaded_store<R: RemoteSource>(
    controller: &SyncController<R>,
) -> anyhow::Result<&RosterStore> {
    controller
        .store()
        .context("fetch succeeded but no roster is loaded")
}

fn print_skipped(report: &FetchReport) {
    for line in &report.skipped {
        println!(
            "Skipped line {} ({}): {}",
            line.line_number, line.reason, line.raw
        );
    }
}

fn view_heading(criterion: FilterCriterion) -> String {
    match criterion {
        FilterCriterion::ByStatus(status) => format!("{} Students", status.label()),
        FilterCriterion::ByPeriod(period) | FilterCriterion::All(period) => {
            format!("{} Period", ordinal(period.digit()))
        }
    }
}

fn ordinal(digit: u8) -> String {
    let suffix = match digit {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    };
    format!("{digit}{suffix}")
}

fn prompt_confirm(prompt: &str) -> io::Result<bool> {
    let mut input = String::new();
    loop {
        input.clear();
        print!("{prompt} (y/N): ");
        io::stdout().flush()?;
        io::stdin().read_line(&mut input)?;
        match input.trim().to_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" | "" => return Ok(false),
            _ => continue,
        }
    }
}
