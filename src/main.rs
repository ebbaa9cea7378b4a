//! pitystat - track gacha pull history and pity statistics

use clap::Parser;
use pitystat::{
    cli::{Cli, Command},
    client::{GachaLogClient, RetrievalParams},
    error::Result,
    histogram::PityHistogram,
    progress::{BarProgress, NullProgress, ProgressSink},
    report::OverallReport,
    service::HistoryService,
    storage::Storage,
    types::AccountId,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging. The --quiet flag should override RUST_LOG.
    let filter = if cli.quiet {
        tracing_subscriber::EnvFilter::new("warn")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("pitystat=info"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let storage = Storage::new(
        cli.data_dir
            .clone()
            .unwrap_or_else(Storage::default_dir),
    );
    info!("Using data directory {}", storage.root().display());

    let (service, load_errors) = HistoryService::load(storage, cli.game);
    for error in &load_errors {
        warn!("Load error: {error}");
    }
    let service = Arc::new(service);

    // a progress bar only makes sense on an interactive terminal
    let interactive = is_terminal::is_terminal(std::io::stderr());

    match cli.command {
        Command::Sync { url } => {
            let params = RetrievalParams::from_player_url(&url, cli.game)?;
            let client = GachaLogClient::new(params);

            // stop at the next page or backoff tick on ctrl-c
            let ctrl_c_service = service.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, stopping after the current page");
                    ctrl_c_service.cancel();
                }
            });

            let bar = interactive.then(BarProgress::new);
            let progress: &dyn ProgressSink = match &bar {
                Some(bar) => bar,
                None => &NullProgress,
            };
            let summary = service.synchronize(&client, progress).await?;
            if let Some(bar) = &bar {
                bar.finish();
            }

            for (kind, added) in &summary.added {
                println!("{kind}: {added} new pulls");
            }
            if let Some((kind, error)) = &summary.failure {
                println!("{kind}: failed ({error})");
            }
            for error in &summary.persistence_errors {
                warn!("Save error: {error}");
            }
            println!("Total: {} new pulls", summary.total_added());
        }
        Command::Report {
            json,
            bucket,
            exclude,
        } => {
            let excluded: HashSet<AccountId> =
                exclude.into_iter().map(AccountId::new).collect();
            if !excluded.is_empty() {
                for error in service.set_exclusions(excluded).await {
                    warn!("Save error: {error}");
                }
            }

            let report = service.recount(&NullProgress).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report, bucket);
            }
        }
    }

    Ok(())
}

fn print_report(report: &OverallReport, bucket: u32) {
    println!("Accounts: {}", report.accounts.len());
    println!("Total pulls: {}", report.total);
    println!();

    for banner in [&report.standard, &report.character, &report.weapon] {
        println!(
            "[{}] {} pulls, 5-star ceiling {}",
            banner.kind,
            banner.total,
            banner.kind.max_pity_five()
        );
        let mut accounts: Vec<_> = banner.accounts.iter().copied().collect();
        accounts.sort();
        for account in accounts {
            let since5 = banner.draws_since_five.get(&account).copied().unwrap_or(0);
            let since4 = banner.draws_since_four.get(&account).copied().unwrap_or(0);
            let next_guaranteed = !banner
                .last_five_promoted
                .get(&account)
                .copied()
                .unwrap_or(true);
            println!(
                "  {account}: {since5} since last 5-star, {since4} since last 4-star{}",
                if next_guaranteed {
                    " (next 5-star guaranteed rate-up)"
                } else {
                    ""
                }
            );
        }
    }

    println!();
    print_histogram("5-star pity (standard + character)", report.pity_five_standard.condense(bucket));
    print_histogram("5-star pity (weapon)", report.pity_five_weapon.condense(bucket));
    print_histogram("4-star pity", report.pity_four.condense(bucket.min(2)));
}

fn print_histogram(title: &str, histogram: PityHistogram) {
    let combined = histogram.combine_all();
    if combined.is_empty() {
        return;
    }
    println!("{title}:");
    let mut buckets: Vec<(u32, u32)> = combined.iter().collect();
    buckets.sort();
    let largest = combined.largest().max(1);
    for (value, count) in buckets {
        let width = (count * 40).div_ceil(largest) as usize;
        println!("  <={value:>3} {:<40} {count}", "#".repeat(width));
    }
    println!();
}
