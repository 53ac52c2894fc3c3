use std::io;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use time::OffsetDateTime;

use crate::api::HttpScanApi;
use crate::config::EffectiveConfig;
use crate::controller::{
    ControllerOptions, RunOutcome, ScanController, ScanError, ThreadSleeper, should_pull_report,
};
use crate::core::{RunSummary, ScanRequest};
use crate::ui::UiConfig;

#[derive(Debug, Parser)]
#[command(
    name = "crashtest",
    version,
    about = "Start a Crashtest Security scan through its webhook, wait for it to finish and download the JUnit report"
)]
pub struct Cli {
    /// Webhook identifier (action input `crashtest-webhook`).
    #[arg(long)]
    pub webhook: Option<String>,
    /// Anything other than the exact string `false` waits for and downloads the report.
    #[arg(long = "pull-report", value_name = "FLAG")]
    pub pull_report: Option<String>,
    #[arg(long)]
    pub endpoint: Option<String>,
    #[arg(long = "poll-interval", value_name = "SECONDS")]
    pub poll_interval: Option<u64>,
    /// Give up once the scan is still running after this many seconds.
    #[arg(long = "max-wait", value_name = "SECONDS")]
    pub max_wait: Option<u64>,
    /// Per-request timeout; 0 disables it.
    #[arg(long = "request-timeout", value_name = "SECONDS")]
    pub request_timeout: Option<u64>,
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,
    #[arg(long = "log-dir", value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long = "show-config")]
    pub show_config: bool,
    #[arg(long)]
    pub json: bool,
    #[arg(long)]
    pub verbose: bool,
    #[arg(long)]
    pub quiet: bool,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let env_config_path = std::env::var_os("CRASHTEST_CONFIG").map(PathBuf::from);
    let mut cfg = crate::config::load(cli.config.as_deref().or(env_config_path.as_deref()))
        .map_err(crate::exit::invalid_args_err)?;
    apply_cli_overrides(&mut cfg, &cli);

    let ui_cfg = UiConfig {
        stderr_is_tty: io::stderr().is_terminal(),
        quiet: cli.quiet,
        verbose: cli.verbose,
        json: cli.json,
    };

    if cli.show_config {
        if cli.json {
            serde_json::to_writer_pretty(io::stdout().lock(), &cfg)?;
            println!();
        } else {
            println!("{}", toml::to_string_pretty(&cfg)?);
        }
        return Ok(());
    }

    let req = ScanRequest::new(cfg.webhook.clone().unwrap_or_default()).ok_or_else(|| {
        crate::exit::invalid_args(
            "crashtest-webhook is required (use --webhook, CRASHTEST_WEBHOOK or the `crashtest-webhook` action input)",
        )
    })?;

    let request_timeout = (cfg.api.request_timeout_secs > 0)
        .then(|| Duration::from_secs(cfg.api.request_timeout_secs));
    let api = HttpScanApi::new(&cfg.api.endpoint, request_timeout)
        .context("failed to build the HTTP client")
        .map_err(crate::exit::invalid_args_err)?
        .verbose(ui_cfg.verbose);

    let opts = ControllerOptions {
        poll_interval: Duration::from_secs(cfg.scan.poll_interval_secs),
        max_wait: cfg.scan.max_wait_secs.map(Duration::from_secs),
        show_progress: ui_cfg.stderr_is_tty && !ui_cfg.quiet && !ui_cfg.json,
    };
    let mut controller = ScanController::new(api, ThreadSleeper, opts, ui_cfg.clone());

    let report_path = PathBuf::from(&cfg.scan.report_path);
    let started_at = OffsetDateTime::now_utc();
    let result = controller.run(&req, &cfg.scan.pull_report, &report_path);
    let finished_at = OffsetDateTime::now_utc();

    let summary = build_summary(&cfg, &req, &result, started_at, finished_at);
    if let Some(dir) = cfg.log.dir.as_deref() {
        let error = result
            .as_ref()
            .err()
            .map(|err| log_error_message(&cfg, &req, err));
        match crate::logs::write_run_log(
            std::path::Path::new(dir),
            finished_at,
            &summary,
            error.as_deref(),
        ) {
            Ok(path) => {
                if ui_cfg.verbose {
                    crate::ui::trace(&format!("run log: {}", path.display()));
                }
            }
            Err(err) => crate::ui::warn(&ui_cfg, &format!("{err:#}")),
        }
    }

    result?;

    if cli.json {
        write_json(&summary)?;
    }
    Ok(())
}

fn apply_cli_overrides(cfg: &mut EffectiveConfig, cli: &Cli) {
    if let Some(webhook) = &cli.webhook {
        cfg.webhook = Some(webhook.trim().to_string());
    }
    if let Some(pull_report) = &cli.pull_report {
        cfg.scan.pull_report = pull_report.clone();
    }
    if let Some(endpoint) = &cli.endpoint {
        cfg.api.endpoint = endpoint.clone();
    }
    if let Some(secs) = cli.poll_interval {
        cfg.scan.poll_interval_secs = secs;
    }
    if let Some(secs) = cli.max_wait {
        cfg.scan.max_wait_secs = Some(secs);
    }
    if let Some(secs) = cli.request_timeout {
        cfg.api.request_timeout_secs = secs;
    }
    if let Some(output) = &cli.output {
        cfg.scan.report_path = output.display().to_string();
    }
    if let Some(dir) = &cli.log_dir {
        cfg.log.dir = Some(dir.display().to_string());
    }
}

fn build_summary(
    cfg: &EffectiveConfig,
    req: &ScanRequest,
    result: &Result<RunOutcome, ScanError>,
    started_at: OffsetDateTime,
    finished_at: OffsetDateTime,
) -> RunSummary {
    let webhook = if cfg.privacy.mask_webhook {
        crate::logs::mask_webhook(req.webhook())
    } else {
        req.webhook().to_string()
    };

    let (scan_id, final_status, report) = match result {
        Ok(outcome) => (
            Some(outcome.handle.scan_id().to_string()),
            outcome.final_status.map(|s| s.code()),
            outcome.report.as_ref(),
        ),
        Err(err) => (err.scan_id().map(ToString::to_string), None, None),
    };

    RunSummary {
        schema_version: "1.0".to_string(),
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        webhook,
        scan_id,
        pulled_report: should_pull_report(&cfg.scan.pull_report),
        final_status,
        report_path: report.map(|r| r.path.display().to_string()),
        report_bytes: report.map(|r| r.bytes),
        started_at: crate::logs::format_timestamp(started_at),
        finished_at: crate::logs::format_timestamp(finished_at),
    }
}

fn log_error_message(cfg: &EffectiveConfig, req: &ScanRequest, err: &ScanError) -> String {
    let message = err.to_string();
    if cfg.privacy.mask_webhook {
        crate::logs::redact_webhook(&message, req.webhook())
    } else {
        message
    }
}

fn write_json(summary: &RunSummary) -> Result<()> {
    use std::io::Write;

    let buf = serde_json::to_vec_pretty(summary)?;

    let mut stdout = std::io::stdout().lock();
    match stdout.write_all(&buf) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => return Ok(()),
        Err(err) => return Err(err.into()),
    }
    match stdout.write_all(b"\n") {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
        Err(err) => Err(err.into()),
    }
}
