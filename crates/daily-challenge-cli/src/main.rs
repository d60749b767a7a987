use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "daily-challenge", version, about = "Daily coding challenge bot")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the Telegram bot daemon
    Run,
    /// Post the challenge for a date (idempotent)
    Post(commands::challenge::PostArgs),
    /// Record a submission for a user
    Submit(commands::challenge::SubmitArgs),
    /// Show (or send) the reminder for a date
    Remind(commands::challenge::RemindArgs),
    /// Show the leaderboard
    Leaderboard {
        /// Number of entries (defaults to leaderboard.limit)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show counter, challenge and pool status
    Status {
        /// Date as YYYY-MM-DD (defaults to today in schedule.utc_offset)
        #[arg(long)]
        date: Option<String>,
    },
    /// Reset the day counter
    Reset,
    /// Import a YAML problem catalog
    Import(commands::problems::ImportArgs),
    /// Problem pool inspection
    Problems {
        #[command(subcommand)]
        action: commands::problems::ProblemsAction,
    },
    /// Participant management
    User {
        #[command(subcommand)]
        action: commands::user::UserAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run => commands::run::run(),
        Commands::Post(args) => commands::challenge::post(args),
        Commands::Submit(args) => commands::challenge::submit(args),
        Commands::Remind(args) => commands::challenge::remind(args),
        Commands::Leaderboard { limit } => commands::challenge::leaderboard(limit),
        Commands::Status { date } => commands::challenge::status(date),
        Commands::Reset => commands::challenge::reset(),
        Commands::Import(args) => commands::problems::import(args),
        Commands::Problems { action } => commands::problems::run(action),
        Commands::User { action } => commands::user::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
