//! AdAudit CLI - Main entry point

mod commands;
mod filters;
mod render;

use adaudit_foundation::AuditConfig;
use clap::{Parser, Subcommand};
use commands::App;
use filters::FilterArgs;
use render::ExportFormat;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// AdAudit - audit log for ads account operations
#[derive(Parser, Debug)]
#[command(name = "adaudit")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Audit database path (overrides config and ADAUDIT_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// User ID to attribute operations to
    #[arg(long = "as-user", global = true)]
    as_user: Option<String>,

    /// Current customer ID
    #[arg(long = "customer-id", global = true)]
    customer_id: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the resolved user, customer and session
    Whoami,
    /// Show dashboard statistics
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// List recent audit entries
    Logs {
        #[command(flatten)]
        filters: FilterArgs,

        /// Maximum number of entries (default from config)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a single audit entry
    Show {
        /// Entry ID
        id: i64,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export audit entries
    Export {
        /// Output format
        #[arg(short, long, value_enum, default_value = "csv")]
        format: ExportFormat,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,

        #[command(flatten)]
        filters: FilterArgs,

        /// Maximum number of entries (all if omitted)
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Delete every audit entry
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", commands::exit_message(&e));
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    // Initialize logging (stderr so exports on stdout stay clean)
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();

    // Load configuration
    let mut config = AuditConfig::load().unwrap_or_else(|e| {
        eprintln!("Warning: Failed to load config: {}", e);
        AuditConfig::default()
    });
    if let Some(db) = args.db {
        config = config.db_path(db);
    }
    if let Some(user) = args.as_user {
        config = config.user_id(user);
    }
    if let Some(customer_id) = args.customer_id {
        config = config.customer_id(customer_id);
    }

    let app = App::open(config)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match args.command {
        Command::Whoami => app.whoami(&mut out)?,
        Command::Stats { json } => app.stats(&mut out, json)?,
        Command::Logs {
            filters,
            limit,
            json,
        } => app.logs(&mut out, &filters, limit, json)?,
        Command::Show { id, json } => app.show(&mut out, id, json)?,
        Command::Export {
            format,
            out: out_path,
            filters,
            limit,
        } => {
            if let Some(path) = &out_path {
                commands::check_export_path(path, format)?;
            }
            let count = app.export(&mut out, &filters, format, limit, out_path.as_deref())?;
            if let Some(path) = &out_path {
                eprintln!("✓ Exported {} entries to {}", count, path.display());
            }
        }
        Command::Clear { yes } => {
            let mut input = io::stdin().lock();
            app.clear(&mut out, &mut input, yes)?;
        }
    }

    out.flush()?;
    Ok(())
}
