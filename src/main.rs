use std::{fs::OpenOptions, sync::Arc};

use anyhow::{bail, Context, Result};
use aws_sso_auditor::{
    auditor::Auditor,
    cli::CommandLineArgs,
    config::Config,
    reporter::{format_summary, ReportWriter},
    session::SsoSession,
    sink::{ConsoleSink, OutputSink},
    util,
};
use tokio::runtime::Builder;
use tracing::{error, info};
use tracing_subscriber::{
    filter::{LevelFilter, Targets},
    fmt,
    prelude::*,
    registry,
};

const LOG_FILE: &str = "aws_sso_auditor.log";

fn main() {
    let args = CommandLineArgs::parse_args();

    let config = match args.to_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("❌ Error: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = setup_logging(&config) {
        eprintln!("⚠️  Failed to initialize logging: {err:#}");
    }

    let exit_code = match run(&args, &config) {
        Ok(()) => 0,
        Err(err) => {
            error!("Audit run failed: {err:#}");
            eprintln!("❌ Error: {err:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(args: &CommandLineArgs, config: &Config) -> Result<()> {
    // One request in flight at a time; a single-threaded runtime is enough.
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")?;
    runtime.block_on(run_audit(args, config))
}

fn setup_logging(config: &Config) -> Result<()> {
    let level = if config.quiet {
        LevelFilter::ERROR
    } else if config.debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = Targets::new()
        .with_default(LevelFilter::ERROR)
        .with_target("aws_sso_auditor", level);

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(LOG_FILE)
        .with_context(|| format!("opening log file {LOG_FILE}"))?;

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_ansi(false)
        .without_time();
    let file_layer = fmt::layer().with_writer(Arc::new(log_file)).with_target(true).with_ansi(false);

    registry().with(console_layer).with(file_layer).with(filter).init();
    Ok(())
}

async fn run_audit(args: &CommandLineArgs, config: &Config) -> Result<()> {
    if !util::validate_account_id(&args.account_id) {
        bail!("invalid AWS account id `{}` (expected 12 digits)", args.account_id);
    }

    let sink = ConsoleSink::new(config.quiet, config.debug);

    sink.progress("Initializing AWS clients...");
    let session = SsoSession::connect(config).await?;
    info!("Connected to Identity Center instance: {}", session.instance_arn());

    if config.debug {
        match session.caller_identity().await {
            Ok(identity) => sink.debug_info(&format!(
                "Caller identity: {} (account {})",
                identity.arn, identity.account
            )),
            Err(err) => sink.warning(&format!("Could not resolve caller identity: {err}")),
        }
        sink.debug_info(&format!("Connected to SSO instance: {}", session.instance_arn()));
    }

    let auditor =
        Auditor::new(&session, config, session.instance_arn(), session.identity_store_id())
            .with_sink(&sink);
    info!("Starting audit for account: {}", args.account_id);
    let report = auditor.audit_account(&args.account_id).await?;

    let writer = ReportWriter::new(config);
    let saved = writer.save(&report, &args.account_id)?;
    let saved_list =
        saved.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ");
    info!("Results saved to: {saved_list}");

    writer.display(&report)?;
    sink.info(&format_summary(&report));
    sink.success(&format!("Results saved to: {saved_list}"));

    info!("Audit completed successfully");
    Ok(())
}
