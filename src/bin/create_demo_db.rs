use std::error::Error;
use std::fs::OpenOptions;
use std::path::Path;
use std::process::exit;
use std::sync::Arc;

use clap::Parser;
use rusqlite::Connection;
use rust_decimal::Decimal;
use time::{Duration, OffsetDateTime};
use tracing_subscriber::{Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use centavo::{
    AccountKind, SubRequest, TagName, TransactionKind, TransactionRequest, TypeCache,
    create_account, create_category, create_sub_category, create_tag, create_transaction,
    create_user, initialize_db,
};

/// A utility for creating a seeded demo database for the transaction ledger.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Create and populate a database for manual poking.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'demo.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'demo.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    setup_logging();

    tracing::info!("Creating database at {:#?}", output_path);
    let connection = Connection::open(output_path)?;

    initialize_db(&connection)?;
    seed_demo_data(&connection)?;

    tracing::info!("Success!");

    Ok(())
}

/// Seed a month of plausible activity through the public ledger API, so the
/// demo database exercises the same write path as real callers.
fn seed_demo_data(connection: &Connection) -> Result<(), Box<dyn Error>> {
    let types = TypeCache::new();
    let today = OffsetDateTime::now_utc().date();

    tracing::info!("Creating demo user...");
    let user = create_user("demo", connection)?;

    tracing::info!("Creating accounts...");
    let everyday = create_account(
        user.id,
        "Everyday",
        AccountKind::Checking,
        Decimal::new(1250_00, 2),
        connection,
    )?;
    let savings = create_account(
        user.id,
        "Savings",
        AccountKind::Savings,
        Decimal::new(5000_00, 2),
        connection,
    )?;

    tracing::info!("Creating categories and tags...");
    let salary = create_category("Salary", connection)?;
    let groceries = create_category("Groceries", connection)?;
    let transport = create_category("Transport", connection)?;
    let utilities = create_category("Utilities", connection)?;
    let supermarket = create_sub_category("Supermarket", Some(groceries.id), connection)?;
    let fuel = create_sub_category("Fuel", Some(transport.id), connection)?;
    let recurring = create_tag(TagName::new("recurring")?, connection)?;
    let family = create_tag(TagName::new("family")?, connection)?;

    tracing::info!("Recording transactions...");
    create_transaction(
        TransactionRequest {
            transaction_type: TransactionKind::Income,
            value: Decimal::new(4200_00, 2),
            date: today - Duration::days(21),
            account_id: everyday.id,
            account_out_id: None,
            notes: "Monthly salary".to_string(),
            category_id: Some(salary.id),
            sub_category_id: None,
            tags: vec![recurring.id],
            subs: Vec::new(),
            installments_count: 1,
        },
        user.id,
        &types,
        connection,
    )?;

    create_transaction(
        TransactionRequest {
            transaction_type: TransactionKind::Expense,
            value: Decimal::new(180_50, 2),
            date: today - Duration::days(14),
            account_id: everyday.id,
            account_out_id: None,
            notes: "Weekly shop and petrol".to_string(),
            category_id: None,
            sub_category_id: None,
            tags: vec![family.id],
            subs: vec![
                SubRequest {
                    value: Decimal::new(120_50, 2),
                    category_id: Some(groceries.id),
                    sub_category_id: Some(supermarket.id),
                },
                SubRequest {
                    value: Decimal::new(60_00, 2),
                    category_id: Some(transport.id),
                    sub_category_id: Some(fuel.id),
                },
            ],
            installments_count: 1,
        },
        user.id,
        &types,
        connection,
    )?;

    create_transaction(
        TransactionRequest {
            transaction_type: TransactionKind::Expense,
            value: Decimal::new(285_00, 2),
            date: today - Duration::days(10),
            account_id: everyday.id,
            account_out_id: None,
            notes: "Annual insurance, paid quarterly".to_string(),
            category_id: Some(utilities.id),
            sub_category_id: None,
            tags: vec![recurring.id],
            subs: Vec::new(),
            installments_count: 3,
        },
        user.id,
        &types,
        connection,
    )?;

    create_transaction(
        TransactionRequest {
            transaction_type: TransactionKind::Transfer,
            value: Decimal::new(500_00, 2),
            date: today - Duration::days(7),
            account_id: savings.id,
            account_out_id: Some(everyday.id),
            notes: "Monthly savings".to_string(),
            category_id: None,
            sub_category_id: None,
            tags: Vec::new(),
            subs: Vec::new(),
            installments_count: 1,
        },
        user.id,
        &types,
        connection,
    )?;

    Ok(())
}

fn setup_logging() {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")
        .expect("Could not create log file");

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(
            stdout_log
                .with_filter(filter::LevelFilter::INFO)
                .and_then(debug_log)
                .with_filter(filter::LevelFilter::DEBUG),
        )
        .init();
}
