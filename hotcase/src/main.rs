mod bridge;
mod bundler;
mod case;
mod cli;
mod outcome;
mod process;
mod report;
mod results;
mod run;
mod workspace;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "hotcase", version, about = "Hot-update verification harness")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    List,
    Run {
        case_id: String,
        #[arg(long)]
        verbose: bool,
    },
    Report {
        case_id: String,
    },
    Clean {
        case_id: String,
    },
}

fn main() -> Result<()> {
    harness::logging::init();
    let cli = Cli::parse();
    let root = std::env::current_dir()?;
    match cli.command {
        Command::List => cli::list_cases(&root),
        Command::Run { case_id, verbose } => cli::run_case_by_id(&root, &case_id, verbose),
        Command::Report { case_id } => cli::report_case(&root, &case_id),
        Command::Clean { case_id } => cli::clean_case(&root, &case_id),
    }
}
