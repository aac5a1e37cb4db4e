//! milestat - Track mileage and pay events with rolling period aggregates

use anyhow::{Context, bail};
use clap::Parser;
use colored::Colorize;
use milestat::{
    Ledger, ReconcileReport, RecomputeOutcome, RecomputeReport,
    cli::{AddArgs, Cli, Command, CompanyCommand},
    config::{Settings, StoreBackend},
};
use milestat_core::{EventId, LedgerStore, Namespace, NewEvent};
use milestat_store_memory::MemoryStore;
use milestat_store_sqlite::SqliteStore;
use milestat_terminal::get_formatter;
use serde_json::json;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::from_cli(&cli)?;

    // --verbose overrides RUST_LOG
    let filter = if settings.verbose {
        tracing_subscriber::EnvFilter::new(settings.log_directive())
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(settings.log_directive()))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if settings.json || !is_terminal::is_terminal(std::io::stdout()) {
        colored::control::set_override(false);
    }

    info!("Using timezone: {}", settings.timezone.display_name());

    match &settings.backend {
        StoreBackend::Memory => {
            info!("Using in-memory store");
            let ledger = Ledger::open(MemoryStore::new(), settings.week_start).await?;
            run(&ledger, cli.command, &settings).await
        }
        StoreBackend::Sqlite(path) => {
            info!("Using database {}", path.display());
            let store = SqliteStore::open(path)
                .with_context(|| format!("failed to open database {}", path.display()))?;
            let ledger = Ledger::open(store, settings.week_start)
                .await
                .with_context(|| format!("database {} cannot be used", path.display()))?;
            run(&ledger, cli.command, &settings).await
        }
    }
}

async fn run<S: LedgerStore>(
    ledger: &Ledger<S>,
    command: Command,
    settings: &Settings,
) -> anyhow::Result<()> {
    let formatter = get_formatter(settings.json);

    match command {
        Command::Add(AddArgs {
            start,
            end,
            pay,
            company,
            date,
        }) => {
            let new_event = NewEvent {
                start_odometer: start,
                end_odometer: end,
                pay,
                company,
                occurred_at: date.unwrap_or_else(|| settings.timezone.today()),
            };
            let recorded = ledger.record_event(new_event).await?;
            let event = &recorded.event;

            if settings.json {
                println!(
                    "{:#}",
                    json!({
                        "event": event,
                        "recomputed": recorded.reports.iter().map(recompute_json).collect::<Vec<_>>(),
                    })
                );
            } else {
                println!(
                    "{} event {} on {}: {} miles, ${}",
                    "Recorded".green().bold(),
                    event.id,
                    event.occurred_at,
                    event.total_distance(),
                    event.pay
                );
                for report in &recorded.reports {
                    print_recompute_failures(report);
                }
            }

            if !recorded.is_complete() {
                bail!(
                    "event {} was recorded but some aggregates were not updated; \
                     run `milestat recompute --date {}` to retry",
                    event.id,
                    event.occurred_at
                );
            }
        }
        Command::Delete { id } => {
            let report = ledger.delete_event(EventId::new(id)).await?;
            if settings.json {
                println!("{:#}", reconcile_json(&report));
            } else {
                println!(
                    "{} event {}: {} buckets removed, {} decremented",
                    "Deleted".green().bold(),
                    report.event,
                    report.purged_exact.len() + report.purged_exhausted.len(),
                    report.decremented.len() - report.purged_exhausted.len(),
                );
                for finding in &report.findings {
                    eprintln!("{} {finding}", "warning:".yellow().bold());
                }
            }
        }
        Command::Events { company } => {
            let events = ledger.events(company.as_ref()).await?;
            print!("{}", formatter.format_events(&events));
        }
        Command::Summary { company } => {
            let latest = ledger.summary(company.as_ref()).await?;
            let namespace = Namespace::for_company(company);
            print!("{}", formatter.format_summary(&namespace, &latest));
        }
        Command::Buckets {
            granularity,
            company,
        } => {
            let buckets = ledger.buckets(company.as_ref(), granularity).await?;
            print!("{}", formatter.format_buckets(&buckets));
        }
        Command::Recompute { date, company } => {
            match ledger.recompute(company.as_ref(), date).await? {
                None => {
                    if settings.json {
                        println!("{:#}", json!({ "recomputed": null }));
                    } else {
                        println!("No events recorded, nothing to recompute.");
                    }
                }
                Some(report) => {
                    if settings.json {
                        println!("{:#}", json!({ "recomputed": recompute_json(&report) }));
                    } else {
                        print_recompute(&report);
                    }
                    if !report.is_complete() {
                        bail!("some aggregates could not be recomputed");
                    }
                }
            }
        }
        Command::Company(CompanyCommand::Add { name }) => {
            let registration = ledger.add_company(&name).await?;
            if settings.json {
                println!(
                    "{:#}",
                    json!({
                        "company": name.as_str(),
                        "newly_registered": registration.newly_registered,
                        "backfilled_dates": registration.backfilled_dates,
                    })
                );
            } else if registration.newly_registered {
                println!(
                    "{} company {name} ({} event dates aggregated)",
                    "Registered".green().bold(),
                    registration.backfilled_dates
                );
            } else {
                println!("Company {name} is already registered.");
            }
        }
        Command::Company(CompanyCommand::List) => {
            let companies = ledger.companies().await?;
            print!("{}", formatter.format_companies(&companies));
        }
        Command::Company(CompanyCommand::Remove { name }) => {
            let dropped = ledger.remove_company(&name).await?;
            if settings.json {
                println!(
                    "{:#}",
                    json!({ "company": name.as_str(), "buckets_removed": dropped })
                );
            } else {
                println!(
                    "{} company {name} ({dropped} buckets removed)",
                    "Removed".green().bold()
                );
            }
        }
    }

    Ok(())
}

fn recompute_json(report: &RecomputeReport) -> serde_json::Value {
    let results: serde_json::Map<String, serde_json::Value> = report
        .results
        .iter()
        .map(|(granularity, result)| {
            let value = match result {
                Ok(RecomputeOutcome::Skipped { .. }) => json!({ "status": "skipped" }),
                Ok(RecomputeOutcome::Created(bucket)) => json!({
                    "status": "created",
                    "bucket": bucket,
                    "avg_per_distance": bucket.avg_per_distance(),
                }),
                Ok(RecomputeOutcome::Updated { bucket, .. }) => json!({
                    "status": "updated",
                    "bucket": bucket,
                    "avg_per_distance": bucket.avg_per_distance(),
                }),
                Err(e) => json!({ "status": "failed", "error": e.to_string() }),
            };
            (granularity.to_string(), value)
        })
        .collect();

    json!({
        "namespace": report.namespace.storage_key(),
        "reference_date": report.reference_date,
        "results": results,
    })
}

fn reconcile_json(report: &ReconcileReport) -> serde_json::Value {
    let keys = |keys: &[milestat_core::BucketKey]| {
        keys.iter().map(ToString::to_string).collect::<Vec<_>>()
    };
    json!({
        "event": report.event.get(),
        "purged_exact": keys(&report.purged_exact),
        "decremented": keys(&report.decremented),
        "purged_exhausted": keys(&report.purged_exhausted),
        "findings": report.findings.iter().map(ToString::to_string).collect::<Vec<_>>(),
    })
}

fn print_recompute(report: &RecomputeReport) {
    println!(
        "{} {} for {}",
        "Recomputed".green().bold(),
        report.namespace,
        report.reference_date
    );
    for (granularity, result) in &report.results {
        match result {
            Ok(RecomputeOutcome::Skipped { period }) => {
                println!("  {granularity:<8} {:<24} no events", period.label());
            }
            Ok(outcome) => {
                if let Some(bucket) = outcome.bucket() {
                    println!(
                        "  {granularity:<8} {:<24} {} miles, ${}, ${:.2}/mile",
                        bucket.period().label(),
                        bucket.total_distance,
                        bucket.total_pay,
                        bucket.avg_per_distance()
                    );
                }
            }
            Err(e) => println!("  {granularity:<8} {}", format!("failed: {e}").red()),
        }
    }
}

fn print_recompute_failures(report: &RecomputeReport) {
    for (granularity, e) in report.failures() {
        eprintln!(
            "{} {granularity} aggregate of {} not updated: {e}",
            "warning:".yellow().bold(),
            report.namespace
        );
    }
}
