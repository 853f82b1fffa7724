use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::Result;
use colored::*;
use tracing::{error, warn};

use lanscope_common::CancelFlag;
use lanscope_common::config::Config;
use lanscope_core::discovery::{BroadcastProvider, DiscoveryProvider, SystemArpTable, TableScanProvider};
use lanscope_core::{DiscoveryReport, Enrichment, SessionOptions, report};

use crate::commands::{DiscoverArgs, open_session};
use crate::terminal::{print, spinner};

/// Exit status of a run stopped with CTRL-C.
const INTERRUPTED: u8 = 1;

pub async fn discover(args: DiscoverArgs, cfg: &Config) -> Result<ExitCode> {
    let start_time = Instant::now();

    let mut options = SessionOptions::from(&cfg.discovery);
    if args.no_cache {
        options.cache_results = false;
    }

    let (session, enrichment) = open_session(cfg, options)?;
    let mut session = session.with_progress(Box::new(spinner::report_progress));

    let cancel = session.cancel_flag();
    let interrupt = tokio::spawn(watch_interrupt(cancel.clone()));

    let provider = select_provider(&args, cfg, enrichment, cancel);

    spinner::start(format!(
        "Searching for clients via {}",
        provider.strategy().label().italic()
    ));
    let mut report = session.run_discovery(provider.as_ref()).await;
    spinner::finish();
    interrupt.abort();

    discovery_ends(&mut report);

    if let Some(path) = &args.output {
        if let Err(e) = report::write_dump(path, &report.clients) {
            error!("{e:#}");
        }
    }

    print::fat_separator();
    print::print(&format!(
        "Total elapsed time {} seconds.",
        print::highlight(format!("{:.2}", start_time.elapsed().as_secs_f64()))
    ));

    if report.is_cancelled() {
        return Ok(ExitCode::from(INTERRUPTED));
    }
    Ok(ExitCode::SUCCESS)
}

fn select_provider(
    args: &DiscoverArgs,
    cfg: &Config,
    enrichment: Enrichment,
    cancel: CancelFlag,
) -> Box<dyn DiscoveryProvider> {
    if args.broadcast {
        let interface = args
            .interface
            .clone()
            .or_else(|| cfg.discovery.interface.clone());
        Box::new(
            BroadcastProvider::new(interface, cfg.discovery.broadcast_window(), enrichment)
                .with_cancel(cancel),
        )
    } else {
        Box::new(TableScanProvider::new(SystemArpTable::new(), enrichment))
    }
}

async fn watch_interrupt(cancel: CancelFlag) {
    if tokio::signal::ctrl_c().await.is_ok() {
        print::print("CTRL-C: Waiting for workers to stop...");
        cancel.cancel();
    }
}

fn discovery_ends(report: &mut DiscoveryReport) {
    print::print(&format!(
        "{} clients identified via ({}) in {}.",
        print::highlight(report.discovered),
        print::highlight(report.strategy.label()),
        format_secs(report.discovery_time)
    ));

    if report.discovered == 0 {
        print::blank();
        print::no_results();
        return;
    }

    print::blank();
    print::header("lan clients");
    print::table_header();

    report.clients.sort_by_key(|client| client.ip);
    for client in &report.clients {
        print::client_row(client);
    }

    print::blank();
    print::print(&format!(
        "{} entries resolved in {} seconds using {} threads.",
        print::highlight(report.clients.len()),
        print::highlight(format!("{:.2}", report.resolution_time.as_secs_f64())),
        report.workers
    ));

    if report.is_cancelled() && report.still_queued > 0 {
        warn!("{} clients were not resolved before the run was stopped", report.still_queued);
    }
}

fn format_secs(duration: Duration) -> String {
    format!("{:.2}s", duration.as_secs_f64())
}
