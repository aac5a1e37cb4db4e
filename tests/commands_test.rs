//! Integration tests for milestat CLI commands
//!
//! These tests follow the path main.rs takes for each command: parse the
//! arguments, resolve settings, run the ledger operation, and format the
//! result.

mod common;

use clap::Parser;
use milestat::cli::{Cli, Command, CompanyCommand};
use milestat::config::{Settings, StoreBackend};
use milestat::Ledger;
use milestat_core::{Namespace, NewEvent};
use milestat_store_sqlite::SqliteStore;
use milestat_terminal::get_formatter;
use tempfile::TempDir;

fn parse(dir: &TempDir, args: &[&str]) -> (Settings, Command) {
    let db = dir.path().join("cli.db");
    let mut argv = vec![
        "milestat".to_string(),
        "--utc".to_string(),
        "--db".to_string(),
        db.display().to_string(),
    ];
    argv.extend(args.iter().map(|a| a.to_string()));

    let cli = Cli::parse_from(argv);
    let settings = Settings::from_cli(&cli).unwrap();
    (settings, cli.command)
}

async fn open(settings: &Settings) -> Ledger<SqliteStore> {
    let StoreBackend::Sqlite(path) = &settings.backend else {
        panic!("expected a sqlite backend");
    };
    Ledger::open(SqliteStore::open(path).unwrap(), settings.week_start)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_add_then_summary_table() {
    let dir = TempDir::new().unwrap();

    let (settings, command) = parse(
        &dir,
        &[
            "add", "--start", "100", "--end", "150", "--pay", "50", "--date", "2024-03-01",
        ],
    );
    let Command::Add(args) = command else {
        panic!("expected add");
    };
    let ledger = open(&settings).await;
    let recorded = ledger
        .record_event(NewEvent {
            start_odometer: args.start,
            end_odometer: args.end,
            pay: args.pay,
            company: args.company,
            occurred_at: args.date.unwrap_or_else(|| settings.timezone.today()),
        })
        .await
        .unwrap();
    assert!(recorded.is_complete());

    let (settings, command) = parse(&dir, &["summary"]);
    let Command::Summary { company } = command else {
        panic!("expected summary");
    };
    let ledger = open(&settings).await;
    let latest = ledger.summary(company.as_ref()).await.unwrap();
    let output = get_formatter(settings.json)
        .format_summary(&Namespace::for_company(company), &latest);

    assert!(output.contains("Latest totals"));
    assert!(output.contains("2024-03-01"));
    assert!(output.contains("2024-03"));
    assert!(output.contains("$50.00"));
    assert!(output.contains("$1.00"));
}

#[tokio::test]
async fn test_add_defaults_to_today() {
    let dir = TempDir::new().unwrap();
    let (settings, command) = parse(&dir, &["add", "--start", "0", "--end", "5", "--pay", "2"]);
    let Command::Add(args) = command else {
        panic!("expected add");
    };
    assert!(args.date.is_none());

    let ledger = open(&settings).await;
    let recorded = ledger
        .record_event(NewEvent {
            start_odometer: args.start,
            end_odometer: args.end,
            pay: args.pay,
            company: args.company,
            occurred_at: args.date.unwrap_or_else(|| settings.timezone.today()),
        })
        .await
        .unwrap();
    assert_eq!(recorded.event.occurred_at, chrono::Utc::now().date_naive());
}

#[tokio::test]
async fn test_company_commands_and_json_output() {
    let dir = TempDir::new().unwrap();

    let (settings, command) = parse(&dir, &["company", "add", "acme"]);
    let Command::Company(CompanyCommand::Add { name }) = command else {
        panic!("expected company add");
    };
    let ledger = open(&settings).await;
    assert!(ledger.add_company(&name).await.unwrap().newly_registered);

    let (settings, command) = parse(&dir, &["--json", "company", "list"]);
    assert!(matches!(command, Command::Company(CompanyCommand::List)));
    let ledger = open(&settings).await;
    let output = get_formatter(settings.json).format_companies(&ledger.companies().await.unwrap());
    let json: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(json["companies"][0], "acme");

    let (settings, command) = parse(&dir, &["company", "remove", "acme"]);
    let Command::Company(CompanyCommand::Remove { name }) = command else {
        panic!("expected company remove");
    };
    let ledger = open(&settings).await;
    assert_eq!(ledger.remove_company(&name).await.unwrap(), 0);
    assert!(ledger.companies().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_command_and_event_listing() {
    let dir = TempDir::new().unwrap();
    let (settings, _) = parse(&dir, &["events"]);
    let ledger = open(&settings).await;
    let event = ledger
        .record_event(common::EventBuilder::new().build())
        .await
        .unwrap()
        .event;

    let (_, command) = parse(&dir, &["delete", &event.id.get().to_string()]);
    let Command::Delete { id } = command else {
        panic!("expected delete");
    };
    let report = ledger
        .delete_event(milestat_core::EventId::new(id))
        .await
        .unwrap();
    assert_eq!(report.purged_exact.len(), 4);

    let output = get_formatter(false).format_events(&ledger.events(None).await.unwrap());
    assert_eq!(output, "No events recorded.\n");
}
