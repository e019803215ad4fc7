use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

pub const DEFAULT_DATA_DIR: &str = ".wsr";

#[derive(Parser)]
#[command(
    name = "wsr",
    about = "World State Records: contract records on a journaled world state",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Directory holding the ledger journal [default: .wsr]
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
}

impl Cli {
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Seed every contract with its initial records
    Init(InitArgs),
    /// Submit a transaction function and commit its writes
    Invoke(CallArgs),
    /// Evaluate a transaction function without committing
    Query(CallArgs),
    /// Show the revision history of one key
    History(HistoryArgs),
    /// Replay the journal and check the block hash chain
    Verify(VerifyArgs),
    /// List contracts and their functions
    Contracts,
    /// Start the HTTP gateway
    Serve(ServeArgs),
}

#[derive(Args)]
pub struct InitArgs {}

#[derive(Args)]
pub struct CallArgs {
    /// Contract name (loan, pokemon, identity, bank)
    pub contract: String,
    /// Function name, e.g. CreateLoanApplication
    pub function: String,
    /// Positional string arguments
    #[arg(allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[derive(Args)]
pub struct HistoryArgs {
    pub contract: String,
    pub key: String,
}

#[derive(Args)]
pub struct VerifyArgs {}

#[derive(Args)]
pub struct ServeArgs {
    /// Listen address [default: 127.0.0.1:7051]
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    /// TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Seed an empty ledger on start
    #[arg(long)]
    pub seed: Option<bool>,
    /// Keep state in memory instead of the data directory
    #[arg(long)]
    pub in_memory: bool,
}
