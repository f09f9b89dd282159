//! Tally CLI - recalculates the reference reports and prints cell states

mod reports;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tally::prelude::*;
use tally::NotSlottedCell;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tally")]
#[command(author, version, about = "Report recalculation tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Also print the full event history of each cell
    #[arg(long, global = true)]
    history: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Recalculate the staffing report
    Fte {
        /// Sales full-time equivalents
        #[arg(long, allow_hyphen_values = true)]
        sales: Option<Decimal>,

        /// Warehouse full-time equivalents
        #[arg(long, allow_hyphen_values = true)]
        warehouse: Option<Decimal>,
    },

    /// Recalculate the cash report
    Cash {
        /// Whether the organization is for profit
        #[arg(long)]
        for_profit: Option<bool>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let agent = match cli.command {
        Commands::Fte { sales, warehouse } => run_fte(sales, warehouse)?,
        Commands::Cash { for_profit } => run_cash(for_profit)?,
    };
    print_report(&agent, cli.history);
    Ok(())
}

fn run_fte(sales: Option<Decimal>, warehouse: Option<Decimal>) -> Result<ReportAgent> {
    let (mut agent, sales_cell, warehouse_cell) = reports::fte()?;
    let now = Utc::now();

    for (cell, value) in [(sales_cell, sales), (warehouse_cell, warehouse)] {
        if let Some(value) = value {
            agent
                .set_input_value(cell, now, value)
                .context("Failed to set input")?;
        }
    }
    recalc(&mut agent)?;
    Ok(agent)
}

fn run_cash(for_profit: Option<bool>) -> Result<ReportAgent> {
    let (mut agent, for_profit_cell) = reports::cash()?;

    if let Some(for_profit) = for_profit {
        agent
            .set_input_value(for_profit_cell, Utc::now(), for_profit)
            .context("Failed to set IsForProfit")?;
    }
    recalc(&mut agent)?;
    Ok(agent)
}

fn recalc(agent: &mut ReportAgent) -> Result<()> {
    let stats = agent
        .recalc(&Utc::now(), &[])
        .context("Failed to recalculate the report")?;

    eprintln!(
        "Recalculated {} events ({} aborted, {} not applicable, {} failed)",
        stats.events(),
        stats.aborted,
        stats.not_applicable,
        stats.failed
    );
    Ok(())
}

fn print_report(agent: &ReportAgent, history: bool) {
    let report = agent.report();
    println!("Report: {}", report.title().unwrap_or(report.id()));

    for section in report.sections() {
        println!();
        println!("  Section \"{}\"", section.title().unwrap_or(section.id()));

        for row in section.table().all_rows() {
            for &handle in row.cells() {
                print_cell(agent, handle, history);
            }
        }
    }
}

fn print_cell(agent: &ReportAgent, handle: CellHandle, history: bool) {
    let name = agent.cache().describe(handle);
    let Some(cell) = agent.cache().not_slotted(handle) else {
        println!("    {name}: slotted");
        return;
    };

    let value = match agent.get_cell_value(handle) {
        Ok(value) => value.to_string(),
        Err(e) => format!("<{e}>"),
    };
    println!("    {name} ({}): {value}", cell.kind_name());

    if cell.availability_check().is_some() {
        let message = cell.availability_message().unwrap_or("");
        println!(
            "      availability: {} [{}] {message}",
            cell.availability(),
            cell.availability_check_status()
        );
    }
    if cell.validation().is_some() {
        let message = cell.validation_message().unwrap_or("");
        println!("      validation: {} {message}", cell.validation_status());
    }
    if let Some(op) = cell.as_operation() {
        println!("      operation: {}", op.op_execution_status());
    }

    if history {
        print_history(cell);
    }
}

fn print_history(cell: &NotSlottedCell) {
    if let Some(input) = cell.as_input() {
        for event in input.events() {
            println!("      {} input {:?}", event.timestamp_utc, event.outcome);
        }
    }
    if let Some(check) = cell.availability_check() {
        for event in check.events() {
            println!("      {} availability {:?}", event.timestamp_utc, event.outcome);
        }
    }
    if let Some(validation) = cell.validation() {
        for event in validation.events() {
            println!("      {} validation {:?}", event.timestamp_utc, event.outcome);
        }
    }
    if let Some(op) = cell.as_operation() {
        for event in op.op_events() {
            println!("      {} operation {:?}", event.timestamp_utc, event.outcome);
        }
    }
}
