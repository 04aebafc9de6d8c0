use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use ulid::Ulid;

use rentcal::clock::{Clock, SystemClock};
use rentcal::config::Config;
use rentcal::engine::{
    BookingRequest, Candidate, Engine, EngineError, MonthWindow, ProjectOptions, Rejection,
    month_grid, partition, price_with_tax, project, summarize,
};
use rentcal::limits::DEFAULT_PALETTE;
use rentcal::model::{DateRange, Day};
use rentcal::notify::NotifyHub;

/// Rental car reservations: book, cancel and inspect per-car calendars.
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    /// Directory holding the reservation log.
    #[arg(long, env = "RENTCAL_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate and commit a reservation.
    Book {
        #[arg(long)]
        resource: Ulid,
        #[arg(long)]
        owner: String,
        #[arg(long)]
        start: Day,
        #[arg(long)]
        end: Day,
        /// Daily rate from the resource catalog.
        #[arg(long)]
        rate: f64,
    },
    Cancel { id: Ulid },
    Complete { id: Ulid },
    /// Reservation with its current status.
    Show { id: Ulid },
    /// All reservations of a car, in commit order.
    List {
        #[arg(long)]
        resource: Ulid,
    },
    /// Reservations touching one day.
    Day {
        #[arg(long)]
        resource: Ulid,
        #[arg(long)]
        date: Day,
        #[arg(long)]
        include_cancelled: bool,
    },
    /// Month legend: reservations clipped to the month.
    Month {
        #[arg(long)]
        resource: Ulid,
        /// `YYYY-MM`; defaults to the current month.
        #[arg(long)]
        month: Option<MonthWindow>,
        #[arg(long)]
        include_cancelled: bool,
    },
    /// Month grid: one cell per day.
    Grid {
        #[arg(long)]
        resource: Ulid,
        #[arg(long)]
        month: Option<MonthWindow>,
        #[arg(long)]
        include_cancelled: bool,
    },
    /// An owner's reservations split into active and archived.
    Dashboard {
        #[arg(long)]
        owner: String,
    },
    /// Price a date range without booking it.
    Quote {
        #[arg(long)]
        start: Day,
        #[arg(long)]
        end: Day,
        #[arg(long)]
        rate: f64,
    },
    /// Fold the reservation log down to current state.
    Compact,
}

fn print_json(value: &impl Serialize) -> Result<(), Box<dyn std::error::Error>> {
    let stdout = std::io::stdout();
    serde_json::to_writer_pretty(stdout.lock(), value)?;
    println!();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    rentcal::observability::init_tracing();
    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    std::fs::create_dir_all(&config.data_dir)?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let engine = Engine::new(
        config.wal_path(),
        Arc::new(NotifyHub::new()),
        config.policy,
        clock,
        config.compact_threshold,
    )?;
    info!("data_dir: {}", config.data_dir.display());

    let today = engine.today();
    let this_month = MonthWindow::containing(today);
    let options = |include_cancelled| ProjectOptions { include_cancelled };

    match cli.command {
        Command::Book {
            resource,
            owner,
            start,
            end,
            rate,
        } => {
            let request = BookingRequest {
                resource_id: resource,
                owner_id: owner,
                candidate: Candidate::new(start, end),
                daily_rate: rate,
            };
            match engine.book(request).await {
                Ok(booking) => print_json(&booking)?,
                Err(EngineError::Rejected(rejection)) => {
                    print_json(&serde_json::json!({
                        "rejected": rejection,
                        "message": rejection.to_string(),
                    }))?;
                    return Ok(ExitCode::from(2));
                }
                Err(e) => return Err(e.into()),
            }
        }
        Command::Cancel { id } => print_json(&engine.cancel(id).await?)?,
        Command::Complete { id } => print_json(&engine.complete(id).await?)?,
        Command::Show { id } => {
            let (reservation, status) = engine.status(id).await?;
            print_json(&serde_json::json!({ "reservation": reservation, "status": status }))?;
        }
        Command::List { resource } => print_json(&engine.list_for_resource(resource).await)?,
        Command::Day {
            resource,
            date,
            include_cancelled,
        } => {
            let snapshot = engine.list_for_resource(resource).await;
            let hits = project(date, &snapshot, DEFAULT_PALETTE, options(include_cancelled));
            print_json(&hits)?;
        }
        Command::Month {
            resource,
            month,
            include_cancelled,
        } => {
            let snapshot = engine.list_for_resource(resource).await;
            let month = month.unwrap_or(this_month);
            print_json(&summarize(month, &snapshot, options(include_cancelled)))?;
        }
        Command::Grid {
            resource,
            month,
            include_cancelled,
        } => {
            let snapshot = engine.list_for_resource(resource).await;
            let month = month.unwrap_or(this_month);
            let grid = month_grid(month, &snapshot, DEFAULT_PALETTE, options(include_cancelled));
            print_json(&grid)?;
        }
        Command::Dashboard { owner } => {
            let mine = engine.list_for_owner(&owner).await;
            print_json(&partition(&mine, today))?;
        }
        Command::Quote { start, end, rate } => {
            let Some(range) = DateRange::try_new(start, end) else {
                return Err(EngineError::Rejected(Rejection::InvalidRange).into());
            };
            print_json(&price_with_tax(&range, rate, engine.policy().tax_rate))?;
        }
        Command::Compact => {
            let count = engine.compact().await?;
            print_json(&serde_json::json!({ "events": count }))?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
