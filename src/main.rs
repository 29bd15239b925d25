use clap::{Args, Parser, Subcommand};
use creditline::application::fees::FeeSchedule;
use creditline::application::ledger::WalletLedger;
use creditline::application::transactions::TransactionLog;
use creditline::application::underwriting::UnderwritingEngine;
use creditline::application::webhooks::WebhookProcessor;
use creditline::config::{FinancialDataArgs, LedgerArgs, TelemetryArgs};
use creditline::domain::company::{Company, CompanyProfile};
use creditline::domain::ports::{
    CardStore, LockPolicy, TransactionStoreRef, WalletStoreRef, WebhookInboxRef,
};
use creditline::infrastructure::in_memory::{
    InMemoryCardStore, InMemoryDirectory, InMemoryFeeCatalog, InMemoryTransactionStore,
    InMemoryWalletStore, InMemoryWebhookInbox,
};
use creditline::infrastructure::partner_http::HttpFinancialDataClient;
#[cfg(feature = "storage-rocksdb")]
use creditline::infrastructure::rocksdb::RocksDBStore;
use creditline::interfaces::csv::card_reader::CardReader;
use creditline::interfaces::csv::fee_reader::FeeReader;
use creditline::interfaces::csv::wallet_reader::WalletReader;
use creditline::interfaces::csv::wallet_writer::WalletWriter;
use creditline::interfaces::webhook_reader::WebhookReader;
use creditline::telemetry;
use miette::{IntoDiagnostic, Result, miette};
use rust_decimal::Decimal;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    telemetry: TelemetryArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay partner webhook events against seeded wallets and print final wallet state.
    Replay(ReplayArgs),
    /// Score a company against the financial-data partner and print the resulting limit.
    Underwrite(UnderwriteArgs),
}

#[derive(Args)]
struct ReplayArgs {
    /// Webhook deliveries, one JSON object per line
    events: PathBuf,

    /// Fee catalog CSV
    #[arg(long)]
    fees: PathBuf,

    /// Wallets CSV
    #[arg(long)]
    wallets: PathBuf,

    /// Issued cards CSV
    #[arg(long)]
    cards: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    #[command(flatten)]
    ledger: LedgerArgs,
}

#[derive(Args)]
struct UnderwriteArgs {
    #[arg(long)]
    company_id: Uuid,

    #[arg(long)]
    company_name: String,

    #[arg(long)]
    rc_number: String,

    /// Year of incorporation
    #[arg(long)]
    incorporated: i32,

    /// Settlement account id at the financial-data partner
    #[arg(long)]
    account_id: String,

    /// Customer id at the financial-data partner
    #[arg(long)]
    customer_id: String,

    #[command(flatten)]
    financial: FinancialDataArgs,
}

struct Backends {
    wallets: WalletStoreRef,
    transactions: TransactionStoreRef,
    inbox: WebhookInboxRef,
}

fn in_memory_backends(policy: LockPolicy) -> Backends {
    let transactions: TransactionStoreRef = Arc::new(InMemoryTransactionStore::new());
    Backends {
        wallets: Arc::new(InMemoryWalletStore::with_journal(policy, transactions.clone())),
        transactions,
        inbox: Arc::new(InMemoryWebhookInbox::new()),
    }
}

#[cfg(feature = "storage-rocksdb")]
fn open_backends(args: &ReplayArgs, policy: LockPolicy) -> Result<Backends> {
    match &args.db_path {
        Some(path) => {
            let store = RocksDBStore::open(path, policy).into_diagnostic()?;
            Ok(Backends {
                wallets: Arc::new(store.clone()),
                transactions: Arc::new(store.clone()),
                inbox: Arc::new(store),
            })
        }
        None => Ok(in_memory_backends(policy)),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_backends(args: &ReplayArgs, policy: LockPolicy) -> Result<Backends> {
    if args.db_path.is_some() {
        return Err(miette!(
            "--db-path needs a build with the storage-rocksdb feature"
        ));
    }
    Ok(in_memory_backends(policy))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.telemetry.log_format);

    match cli.command {
        Command::Replay(args) => replay(args).await,
        Command::Underwrite(args) => underwrite(args).await,
    }
}

async fn replay(args: ReplayArgs) -> Result<()> {
    let backends = open_backends(&args, args.ledger.lock_policy())?;
    let ledger = WalletLedger::new(backends.wallets);

    let catalog = InMemoryFeeCatalog::new();
    for fee in FeeReader::new(File::open(&args.fees).into_diagnostic()?).fees() {
        catalog.insert(fee.into_diagnostic()?).await;
    }

    for record in WalletReader::new(File::open(&args.wallets).into_diagnostic()?).wallets() {
        let record = record.into_diagnostic()?;
        if ledger
            .wallet_for_company(record.company_id)
            .await
            .into_diagnostic()?
            .is_some()
        {
            debug!(company_id = %record.company_id, "wallet already present");
            continue;
        }
        let wallet = ledger
            .open_wallet(record.company_id, &record.account_id, &record.customer_id)
            .await
            .into_diagnostic()?;
        if record.credit_limit > Decimal::ZERO {
            ledger
                .set_credit_limit(wallet.id, record.credit_limit)
                .await
                .into_diagnostic()?;
        }
    }

    let cards = InMemoryCardStore::new();
    if let Some(path) = &args.cards {
        for record in CardReader::new(File::open(path).into_diagnostic()?).cards() {
            let record = record.into_diagnostic()?;
            let wallet = ledger
                .wallet_for_company(record.company_id)
                .await
                .into_diagnostic()?
                .ok_or_else(|| {
                    miette!(
                        "card {} belongs to company {} which has no wallet",
                        record.partner_card_id,
                        record.company_id
                    )
                })?;
            cards
                .store(record.into_card(&wallet))
                .await
                .into_diagnostic()?;
        }
    }

    let processor = WebhookProcessor::new(
        ledger.clone(),
        FeeSchedule::new(Arc::new(catalog)),
        TransactionLog::new(backends.transactions),
        Arc::new(cards),
        backends.inbox,
    );

    let events = File::open(&args.events).into_diagnostic()?;
    let mut processed = 0usize;
    for (index, event) in WebhookReader::new(BufReader::new(events))
        .events()
        .enumerate()
    {
        match event {
            Ok(event) => {
                // declines and failures are logged by the processor
                if processor.process(event).await.is_ok() {
                    processed += 1;
                }
            }
            Err(err) => warn!(line = index + 1, %err, "skipping event"),
        }
    }
    info!(processed, "replay finished");

    let wallets = ledger.wallets().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = WalletWriter::new(stdout.lock());
    writer.write_wallets(wallets).into_diagnostic()?;

    Ok(())
}

async fn underwrite(args: UnderwriteArgs) -> Result<()> {
    let directory = InMemoryDirectory::new();
    directory
        .insert_company(Company {
            id: args.company_id,
            name: args.company_name.clone(),
            owner: String::new(),
        })
        .await;
    directory
        .insert_profile(CompanyProfile {
            company_id: args.company_id,
            rc_number: args.rc_number.clone(),
            incorporation_year: args.incorporated,
        })
        .await;

    let ledger = WalletLedger::new(Arc::new(InMemoryWalletStore::new()));
    ledger
        .open_wallet(args.company_id, &args.account_id, &args.customer_id)
        .await
        .into_diagnostic()?;

    let partner = HttpFinancialDataClient::new(args.financial.into()).into_diagnostic()?;
    let engine = UnderwritingEngine::new(Arc::new(directory), Arc::new(partner), ledger);
    let result = engine
        .run_underwriting(args.company_id)
        .await
        .into_diagnostic()?;

    println!("{}", serde_json::to_string(&result).into_diagnostic()?);
    Ok(())
}
