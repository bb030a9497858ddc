//! sopha: attendance confirmation and CIZ point CLI
//!
//! Operates directly on the configured store.
//!
//! ## Configuration
//! ```yaml
//! storage:
//!   type: sqlite
//!   sqlite:
//!     path: data/sopha.db
//! confirmation:
//!   points_per_attendance: 1000
//!   window_hours: 24
//!   utc_offset_hours: 9
//! ```
//!
//! Every key can be overridden with `SOPHA__SECTION__KEY` environment
//! variables, e.g. `SOPHA__STORAGE__TYPE=memory`.

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{error, info};

use sopha::attendance::{attendance_summary, register_attendance, AttendanceIntent};
use sopha::config::Config;
use sopha::confirmation::{AttendanceConfirmation, ConfirmationWindow};
use sopha::model::{Event, Genre};
use sopha::points::{balance, transfer_points, TransferRequest};
use sopha::storage::init_storage;
use sopha::utils::bootstrap::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "sopha")]
#[command(about = "Attendance confirmation and CIZ point accounting")]
struct Args {
    /// Configuration file (YAML), loaded before SOPHA_CONFIG
    #[arg(long, short)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the schema in the configured store
    InitDb,

    /// Create or replace an event
    AddEvent {
        event_id: String,
        title: String,
        #[arg(long, value_enum, default_value_t = GenreArg::Unofficial)]
        genre: GenreArg,
        /// Start time, RFC 3339 or deployment-local "YYYY-MM-DD HH:MM"
        #[arg(long, default_value = "")]
        start: String,
    },

    /// Record an employee's provisional answer
    Register {
        event_id: String,
        employee_id: String,
        #[arg(value_enum)]
        intent: IntentArg,
    },

    /// Show entry counts per status for an event
    Summary { event_id: String },

    /// Check whether confirmation is open for a start time
    CheckWindow { start: String },

    /// Confirm attendance for an event
    Confirm {
        event_id: String,
        /// Employee performing the confirmation
        #[arg(long)]
        actor: Option<String>,
    },

    /// Show an employee's point balance
    Balance { employee_id: String },

    /// Move points between two employees
    Transfer {
        from: String,
        to: String,
        amount: i64,
        #[arg(long, default_value = "")]
        note: String,
        #[arg(long)]
        actor: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum GenreArg {
    Official,
    Unofficial,
}

impl From<GenreArg> for Genre {
    fn from(arg: GenreArg) -> Self {
        match arg {
            GenreArg::Official => Genre::Official,
            GenreArg::Unofficial => Genre::Unofficial,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum IntentArg {
    Attend,
    Absent,
}

impl From<IntentArg> for AttendanceIntent {
    fn from(arg: IntentArg) -> Self {
        match arg {
            IntentArg::Attend => AttendanceIntent::Attend,
            IntentArg::Absent => AttendanceIntent::Absent,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args = Args::parse();
    let config = Config::load(args.config.as_deref()).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    let store = init_storage(&config.storage).await?;
    let offset = config.confirmation.offset()?;

    match args.command {
        Command::InitDb => {
            info!(storage = %config.storage.storage_type, "Schema ready");
        }
        Command::AddEvent {
            event_id,
            title,
            genre,
            start,
        } => {
            let event = Event::new(event_id, title, genre.into(), start);
            store.put_event(&event).await?;
            print_json(&event)?;
        }
        Command::Register {
            event_id,
            employee_id,
            intent,
        } => {
            let status =
                register_attendance(store.as_ref(), &event_id, &employee_id, intent.into())
                    .await?;
            println!("{} {} {}", event_id, employee_id, status);
        }
        Command::Summary { event_id } => {
            print_json(&attendance_summary(store.as_ref(), &event_id).await?)?;
        }
        Command::CheckWindow { start } => {
            let window = ConfirmationWindow::from_config(&config.confirmation)?;
            print_json(&window.check(&start, Utc::now()))?;
        }
        Command::Confirm { event_id, actor } => {
            let event = store
                .get_event(&event_id)
                .await?
                .ok_or_else(|| format!("Event not found: {}", event_id))?;
            let confirmation = AttendanceConfirmation::new(store, config.confirmation)?;
            let outcome = confirmation
                .confirm_attendance(&event_id, &event, actor.as_deref())
                .await;
            print_json(&outcome)?;
        }
        Command::Balance { employee_id } => {
            let total = balance(store.as_ref(), &employee_id).await?;
            println!("{} {}", employee_id, total);
        }
        Command::Transfer {
            from,
            to,
            amount,
            note,
            actor,
        } => {
            let request = TransferRequest::new(from, to, amount, note);
            let at = Utc::now().with_timezone(&offset);
            let receipt =
                transfer_points(store.as_ref(), &request, actor.as_deref(), at).await?;
            print_json(&receipt)?;
        }
    }

    Ok(())
}
