use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use wsr_contract::Ledger;
use wsr_server::{ServerConfig, WsrServer};
use wsr_state::{CommitReceipt, FileStateConfig, FileWorldState, Transaction};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let data_dir = cli.data_dir();
    let explicit_dir = cli.data_dir.clone();
    let format = cli.format;
    match cli.command {
        Command::Init(_) => {
            let report = init(&data_dir)?;
            emit(format, &report, print_init)
        }
        Command::Invoke(args) => {
            let report = invoke(&data_dir, &args)?;
            emit(format, &report, print_invoke)
        }
        Command::Query(args) => {
            let value = query(&data_dir, &args)?;
            emit(format, &value, |v| println!("{}", render_value(v)))
        }
        Command::History(args) => {
            let entries = history(&data_dir, &args)?;
            emit(format, &entries, |e| print_history(&args, e))
        }
        Command::Verify(_) => {
            let report = verify(&data_dir)?;
            emit(format, &report, print_verify)
        }
        Command::Contracts => emit(format, &contracts(), |c| print_contracts(c)),
        Command::Serve(args) => cmd_serve(explicit_dir, args),
    }
}

fn emit<T: Serialize>(
    format: OutputFormat,
    report: &T,
    text: impl FnOnce(&T),
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => text(report),
    }
    Ok(())
}

fn open_state(dir: &Path) -> anyhow::Result<FileWorldState> {
    FileWorldState::open(dir, FileStateConfig::default())
        .with_context(|| format!("opening ledger in {}", dir.display()))
}

fn open_ledger(dir: &Path) -> anyhow::Result<Ledger> {
    Ok(Ledger::with_default_contracts(Arc::new(open_state(dir)?)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub tx_id: String,
    pub block: Option<u64>,
    pub keys_written: usize,
}

impl From<&CommitReceipt> for Receipt {
    fn from(receipt: &CommitReceipt) -> Self {
        Self {
            tx_id: receipt.tx_id.to_string(),
            block: receipt.block_number(),
            keys_written: receipt.keys_written,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InitReport {
    pub height: u64,
    pub contracts: Vec<(String, Receipt)>,
}

pub fn init(dir: &Path) -> anyhow::Result<InitReport> {
    let ledger = open_ledger(dir)?;
    let contracts = ledger
        .init_ledger()?
        .iter()
        .map(|(name, receipt)| (name.to_string(), Receipt::from(receipt)))
        .collect();
    Ok(InitReport {
        height: ledger.height()?,
        contracts,
    })
}

fn print_init(report: &InitReport) {
    println!("{} Ledger seeded", "✓".green().bold());
    for (name, receipt) in &report.contracts {
        let block = match receipt.block {
            Some(n) => format!("block {n}"),
            None => "no writes".dimmed().to_string(),
        };
        println!("  {:<10} {}", name.cyan(), block);
    }
    println!("  Height: {}", report.height.to_string().bold());
}

#[derive(Debug, Serialize)]
pub struct InvokeReport {
    pub result: Value,
    pub receipt: Receipt,
}

pub fn invoke(dir: &Path, args: &CallArgs) -> anyhow::Result<InvokeReport> {
    let ledger = open_ledger(dir)?;
    debug!(contract = %args.contract, function = %args.function, "invoking");
    let committed = ledger.invoke(&args.contract, &args.function, &args.args)?;
    Ok(InvokeReport {
        receipt: Receipt::from(&committed.receipt),
        result: committed.value,
    })
}

fn print_invoke(report: &InvokeReport) {
    println!("{} Transaction committed", "✓".green().bold());
    println!("  TxID: {}", report.receipt.tx_id.yellow());
    match report.receipt.block {
        Some(n) => println!("  Block: {n} ({} keys)", report.receipt.keys_written),
        None => println!("  Block: {}", "none (read-only)".dimmed()),
    }
    if !report.result.is_null() {
        println!("{}", render_value(&report.result));
    }
}

pub fn query(dir: &Path, args: &CallArgs) -> anyhow::Result<Value> {
    let ledger = open_ledger(dir)?;
    Ok(ledger.query(&args.contract, &args.function, &args.args)?)
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryLine {
    pub tx_id: String,
    pub block: u64,
    pub timestamp: String,
    pub is_delete: bool,
    pub value: Option<Value>,
}

/// Raw revision log of one key in a contract's namespace.
pub fn history(dir: &Path, args: &HistoryArgs) -> anyhow::Result<Vec<HistoryLine>> {
    let ledger = open_ledger(dir)?;
    let contract = ledger.contract(&args.contract)?;
    let tx = Transaction::begin(&**ledger.backend(), contract.name())?;
    let lines = tx
        .history_for_key(&args.key)?
        .map(|revision| HistoryLine {
            tx_id: revision.tx_id.to_string(),
            block: revision.block,
            timestamp: revision.timestamp.to_string(),
            is_delete: revision.is_delete(),
            value: revision.value.as_deref().map(|bytes| {
                serde_json::from_slice(bytes)
                    .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
            }),
        })
        .collect();
    tx.discard();
    Ok(lines)
}

fn print_history(args: &HistoryArgs, lines: &[HistoryLine]) {
    if lines.is_empty() {
        println!("No history for {}/{}.", args.contract, args.key.yellow());
        return;
    }
    for line in lines {
        let label = format!("#{}", line.block).yellow().bold();
        match &line.value {
            Some(value) => println!("{label}  {}  {}", line.tx_id.dimmed(), value),
            None => println!("{label}  {}  {}", line.tx_id.dimmed(), "deleted".red()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyReport {
    pub journal: PathBuf,
    pub height: u64,
    pub last_block_hash: String,
    pub torn_bytes: u64,
}

/// Replay the journal read-only. Replay refuses a broken hash chain, so
/// reaching the report means every block linked to its predecessor. A torn
/// tail is reported, not repaired; the next writable open cuts it off.
pub fn verify(dir: &Path) -> anyhow::Result<VerifyReport> {
    let journal = dir.join(FileWorldState::JOURNAL_FILE);
    if !journal.exists() {
        bail!("no ledger journal at {}", journal.display());
    }
    let inspection = FileWorldState::inspect(dir)
        .with_context(|| format!("verifying ledger in {}", dir.display()))?;
    Ok(VerifyReport {
        journal: inspection.journal,
        height: inspection.height,
        last_block_hash: hex::encode(inspection.last_block_hash),
        torn_bytes: inspection.torn_bytes,
    })
}

fn print_verify(report: &VerifyReport) {
    println!("{} Block chain verified", "✓".green().bold());
    println!("  Journal: {}", report.journal.display());
    println!("  Height: {}", report.height.to_string().bold());
    println!("  Last hash: {}", report.last_block_hash.cyan());
    if report.torn_bytes > 0 {
        println!(
            "  {} {} bytes of torn tail; the next open will cut them off",
            "!".yellow().bold(),
            report.torn_bytes
        );
    }
}

#[derive(Debug, Serialize)]
pub struct ContractInfo {
    pub name: String,
    pub functions: Vec<String>,
}

pub fn contracts() -> Vec<ContractInfo> {
    Ledger::in_memory()
        .contracts()
        .map(|c| ContractInfo {
            name: c.name().to_string(),
            functions: c.functions().iter().map(|f| f.to_string()).collect(),
        })
        .collect()
}

fn print_contracts(contracts: &[ContractInfo]) {
    for contract in contracts {
        println!("{}", contract.name.cyan().bold());
        for function in &contract.functions {
            println!("  {function}");
        }
    }
}

/// Merge the config file (if any) with command-line overrides.
pub fn serve_config(
    explicit_dir: Option<PathBuf>,
    args: &ServeArgs,
) -> anyhow::Result<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig {
            data_dir: Some(PathBuf::from(DEFAULT_DATA_DIR)),
            ..ServerConfig::default()
        },
    };
    match (explicit_dir, args.in_memory) {
        (Some(_), true) => bail!("--in-memory cannot be combined with --data-dir"),
        (Some(dir), false) => config.data_dir = Some(dir),
        (None, true) => config.data_dir = None,
        (None, false) => {}
    }
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(seed) = args.seed {
        config.seed_on_start = seed;
    }
    Ok(config)
}

fn cmd_serve(explicit_dir: Option<PathBuf>, args: ServeArgs) -> anyhow::Result<()> {
    let config = serve_config(explicit_dir, &args)?;
    println!(
        "WSR server on {} ({})",
        config.bind_addr.to_string().bold(),
        match &config.data_dir {
            Some(dir) => dir.display().to_string(),
            None => "in-memory".to_string(),
        }
    );
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(WsrServer::new(config).serve())?;
    Ok(())
}
