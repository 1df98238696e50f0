use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod enrich;

#[derive(Debug, Parser)]
#[command(name = "oppdb")]
#[command(about = "Opportunity enrichment pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch, filter, analyze and store submissions
    Enrich {
        #[command(subcommand)]
        command: EnrichCommands,
    },
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum EnrichCommands {
    /// Run one enrichment batch and print the run report as JSON
    Run(RunArgs),
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check that the database is reachable
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[derive(Debug, Clone, Default, Args)]
#[allow(clippy::struct_excessive_bools)]
struct RunArgs {
    /// Maximum submissions to fetch
    #[arg(long)]
    limit: Option<usize>,

    /// Subreddit to read; repeat for several. Overrides OPPDB_SUBREDDITS
    #[arg(long = "subreddit")]
    subreddits: Vec<String>,

    /// Skip storage but keep all statistics
    #[arg(long)]
    dry_run: bool,

    /// Submissions processed at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// Read submissions from a JSON array instead of Reddit
    #[arg(long, value_name = "PATH")]
    from_file: Option<PathBuf>,

    /// Include merged records in the report
    #[arg(long)]
    return_data: bool,

    /// Stop the run after this many seconds
    #[arg(long)]
    deadline_secs: Option<u64>,

    /// Use in-memory concept store and sink; no database needed
    #[arg(long)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let config = oppdb_core::load_app_config_from_env()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Some(Commands::Enrich {
            command: EnrichCommands::Run(args),
        }) => {
            let report = enrich::run_enrich(&config, &args).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.success {
                return Ok(ExitCode::FAILURE);
            }
        }
        Some(Commands::Db {
            command: DbCommands::Ping,
        }) => {
            let pool = oppdb_db::connect_pool_from_config(&config).await?;
            oppdb_db::ping(&pool).await?;
            println!("database reachable");
        }
        Some(Commands::Db {
            command: DbCommands::Migrate,
        }) => {
            let pool = oppdb_db::connect_pool_from_config(&config).await?;
            let applied = oppdb_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        None => Cli::command().print_help()?,
    }

    Ok(ExitCode::SUCCESS)
}
