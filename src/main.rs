use chrono::Utc;
use tracing_subscriber::fmt::writer::MakeWriterExt;

use reply_tracker::config::Config;
use reply_tracker::enrich::EnrichmentClient;
use reply_tracker::mail::session::ImapSession;
use reply_tracker::pipeline::{self, RunOptions};
use reply_tracker::report::JsonlSink;
use reply_tracker::retry::RetryPolicy;
use reply_tracker::stats::RunStats;

fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Console + daily rolling file logging
    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(file_writer.and(std::io::stderr))
        .init();

    let config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  required: IMAP_HOST, IMAP_USERNAME, IMAP_PASSWORD, ENRICH_BASE_URL");
        std::process::exit(1);
    });

    eprintln!("📬 reply-tracker v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   IMAP: {}:{}", config.imap.host, config.imap.port);
    eprintln!("   Window: {} days", config.window_days);
    eprintln!("   Enrichment: {}", config.enrich.base_url);
    eprintln!("   Report: {}\n", config.report_path);

    let enricher = EnrichmentClient::new(config.enrich.clone())?;
    if !enricher.health_check() {
        eprintln!("   Warning: enrichment endpoint health check failed; continuing");
    }

    let retry = RetryPolicy::from(&config.retry);
    let mut session = retry.run("imap connect", || ImapSession::connect(&config.imap))?;

    let mut sink = JsonlSink::create(&config.report_path)?;
    let options = RunOptions::from_config(&config, Utc::now());
    let mut stats = RunStats::default();

    let outcome = pipeline::run(&mut session, &options, &enricher, &mut sink, &mut stats);
    stats.log_summary();
    session.logout();

    match outcome {
        Ok(()) => {
            tracing::info!("Processing completed successfully");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Run aborted: {e}");
            std::process::exit(1);
        }
    }
}
