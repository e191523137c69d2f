use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::application::AccountService;
use crate::storage::SqliteStore;

/// Crowdfund - account ledger over a versioned key-value world state
#[derive(Parser)]
#[command(name = "crowdfund")]
#[command(about = "Initialize, credit and query crowd-funding accounts")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "crowdfund.db", env = "CROWDFUND_DATABASE")]
    pub database: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database and initialize the first account
    Deploy {
        /// Account key to create
        #[arg(long, default_value = "account")]
        key: String,

        /// Starting balance
        #[arg(long, default_value = "0")]
        value: String,
    },

    /// Call the init entry point: <KEY> <VALUE>
    Init {
        /// Function name passed to the entry point
        #[arg(long, default_value = "init")]
        function: String,

        #[arg(allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Call the invoke entry point: <KEY> <AMOUNT>
    Invoke {
        /// Function name passed to the entry point
        #[arg(long, default_value = "invoke")]
        function: String,

        #[arg(allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Call the query entry point: <KEY>
    Query {
        /// Function name passed to the entry point (must be "query")
        #[arg(long, default_value = "query")]
        function: String,

        #[arg(allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Export world state to CSV or JSON
    Export {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `--verbose`.
pub fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "crowdfund=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    // Only fails if a subscriber is already installed
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let service = AccountService::new();

        match self.command {
            Commands::Deploy { key, value } => {
                let store = SqliteStore::create(&self.database).await?;
                service
                    .init(&store, "init", &[key.clone(), value])
                    .await
                    .context("Deployment failed")?;
                println!("Deployed ledger {} with account {}", self.database, key);
            }

            Commands::Init { function, args } => {
                let store = SqliteStore::open(&self.database).await?;
                service.init(&store, &function, &args).await?;
                if self.verbose {
                    eprintln!("Initialized account {}", args[0]);
                }
            }

            Commands::Invoke { function, args } => {
                let store = SqliteStore::open(&self.database).await?;
                service.invoke(&store, &function, &args).await?;
                if self.verbose {
                    eprintln!("Credited {} to {}", args[1], args[0]);
                }
            }

            Commands::Query { function, args } => {
                let store = SqliteStore::open(&self.database).await?;
                match service.query_entry(&store, &function, &args).await {
                    Ok(view) => println!("{}", serde_json::to_string(&view)?),
                    Err(err) => {
                        println!("{}", err.payload().to_json());
                        return Err(err.into());
                    }
                }
            }

            Commands::Export { format, output } => {
                let store = SqliteStore::open(&self.database).await?;
                run_export_command(&store, format, output.as_deref()).await?;
            }
        }

        Ok(())
    }
}

async fn run_export_command(
    store: &SqliteStore,
    format: ExportFormat,
    output: Option<&str>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{Write, stdout};

    let exporter = Exporter::new(store);

    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    let count = match format {
        ExportFormat::Csv => exporter.export_csv(writer).await?,
        ExportFormat::Json => exporter.export_json(writer).await?.accounts.len(),
    };

    if output.is_some() {
        eprintln!("Exported {} accounts", count);
    }
    Ok(())
}
