use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::api::{ApiError, ScanApi};
use crate::core::{ScanHandle, ScanReport, ScanRequest, ScanStatus};
use crate::ui::UiConfig;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_REPORT_PATH: &str = "report.xml";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("Could not start Scan for Webhook {webhook}. Reason: {reason}.")]
    StartFailed { webhook: String, reason: String },

    #[error("Could not start Scan for Webhook {webhook}.")]
    MissingScanId { webhook: String },

    #[error("Retrieving Scan Status failed for Webhook {webhook}. Reason: {reason}.")]
    PollFailed {
        webhook: String,
        scan_id: String,
        reason: String,
    },

    #[error(
        "Scan {scan_id} for Webhook {webhook} did not finish within {}s.",
        .max_wait.as_secs()
    )]
    PollTimedOut {
        webhook: String,
        scan_id: String,
        max_wait: Duration,
    },

    #[error("Downloading Report failed for Webhook {webhook}. Reason: {reason}.")]
    FetchFailed {
        webhook: String,
        scan_id: String,
        reason: String,
    },

    #[error("Writing the Report failed for Webhook {webhook}. Reason: {reason}")]
    WriteFailed {
        webhook: String,
        scan_id: String,
        path: PathBuf,
        reason: String,
    },
}

impl ScanError {
    pub fn scan_id(&self) -> Option<&str> {
        match self {
            ScanError::StartFailed { .. } | ScanError::MissingScanId { .. } => None,
            ScanError::PollFailed { scan_id, .. }
            | ScanError::PollTimedOut { scan_id, .. }
            | ScanError::FetchFailed { scan_id, .. }
            | ScanError::WriteFailed { scan_id, .. } => Some(scan_id),
        }
    }
}

/// Blocks the flow between status polls.
pub trait Sleeper {
    fn sleep(&mut self, interval: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, interval: Duration) {
        std::thread::sleep(interval);
    }
}

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub poll_interval: Duration,
    /// `None` polls until the service reports a terminal status.
    pub max_wait: Option<Duration>,
    pub show_progress: bool,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_wait: None,
            show_progress: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub handle: ScanHandle,
    pub final_status: Option<ScanStatus>,
    pub report: Option<PersistedReport>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedReport {
    pub path: PathBuf,
    pub bytes: u64,
}

/// `pull-report` is permissive: only the exact string `"false"` disables the
/// poll and download, so typos and other casings still pull the report.
pub fn should_pull_report(flag: &str) -> bool {
    flag != "false"
}

pub struct ScanController<A, S> {
    api: A,
    sleeper: S,
    opts: ControllerOptions,
    ui: UiConfig,
}

impl<A: ScanApi, S: Sleeper> ScanController<A, S> {
    pub fn new(api: A, sleeper: S, opts: ControllerOptions, ui: UiConfig) -> Self {
        Self {
            api,
            sleeper,
            opts,
            ui,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    pub fn start_scan(&self, req: &ScanRequest) -> Result<ScanHandle, ScanError> {
        let webhook = req.webhook();
        crate::ui::info(&self.ui, &format!("Sending Webhook for {webhook}"));

        let scan_id = self
            .api
            .start_scan(webhook)
            .map_err(|err| ScanError::StartFailed {
                webhook: webhook.to_string(),
                reason: err.to_string(),
            })?
            .ok_or_else(|| ScanError::MissingScanId {
                webhook: webhook.to_string(),
            })?;

        crate::ui::info(
            &self.ui,
            &format!("Started Scan for Webhook {webhook}. Scan ID is {scan_id}."),
        );
        Ok(ScanHandle::new(scan_id))
    }

    pub fn poll_until_terminal(
        &mut self,
        req: &ScanRequest,
        handle: &ScanHandle,
    ) -> Result<ScanStatus, ScanError> {
        let started = Instant::now();
        let mut status = ScanStatus::QUEUED;

        while status.is_in_progress() {
            crate::ui::info(
                &self.ui,
                &format!("Scan Status currently is {status} (101 = Running)"),
            );

            let spinner = if self.opts.show_progress {
                crate::ui::poll_spinner(status, self.opts.poll_interval)
            } else {
                None
            };
            self.sleeper.sleep(self.opts.poll_interval);
            if let Some(pb) = spinner {
                pb.finish_and_clear();
            }

            status = self
                .api
                .scan_status(req.webhook(), handle.scan_id())
                .map(ScanStatus::new)
                .map_err(|err| ScanError::PollFailed {
                    webhook: req.webhook().to_string(),
                    scan_id: handle.scan_id().to_string(),
                    reason: err.to_string(),
                })?;

            if let Some(max_wait) = self.opts.max_wait {
                if status.is_in_progress() && started.elapsed() >= max_wait {
                    return Err(ScanError::PollTimedOut {
                        webhook: req.webhook().to_string(),
                        scan_id: handle.scan_id().to_string(),
                        max_wait,
                    });
                }
            }
        }

        crate::ui::info(&self.ui, &format!("Scan finished with status {status}."));
        Ok(status)
    }

    pub fn fetch_report(
        &self,
        req: &ScanRequest,
        handle: &ScanHandle,
    ) -> Result<ScanReport, ScanError> {
        self.api
            .junit_report(req.webhook(), handle.scan_id())
            .map(ScanReport::new)
            .map_err(|err: ApiError| ScanError::FetchFailed {
                webhook: req.webhook().to_string(),
                scan_id: handle.scan_id().to_string(),
                reason: err.to_string(),
            })
    }

    pub fn run(
        &mut self,
        req: &ScanRequest,
        pull_report: &str,
        report_path: &Path,
    ) -> Result<RunOutcome, ScanError> {
        let handle = self.start_scan(req)?;

        if !should_pull_report(pull_report) {
            crate::ui::info(
                &self.ui,
                &format!(
                    "Skipping the download of the scan report as pull-report='{pull_report}'."
                ),
            );
            return Ok(RunOutcome {
                handle,
                final_status: None,
                report: None,
            });
        }

        let final_status = self.poll_until_terminal(req, &handle)?;
        let report = self.fetch_report(req, &handle)?;
        persist_report(req, &handle, &report, report_path)?;
        crate::ui::info(
            &self.ui,
            &format!("Downloaded Report to {}", report_path.display()),
        );

        Ok(RunOutcome {
            handle,
            final_status: Some(final_status),
            report: Some(PersistedReport {
                path: report_path.to_path_buf(),
                bytes: report.len() as u64,
            }),
        })
    }
}

/// Overwrites `path` with the report bytes. The handle is closed before returning
/// on both the success and the error path.
pub fn persist_report(
    req: &ScanRequest,
    handle: &ScanHandle,
    report: &ScanReport,
    path: &Path,
) -> Result<(), ScanError> {
    std::fs::write(path, report.as_bytes()).map_err(|err| ScanError::WriteFailed {
        webhook: req.webhook().to_string(),
        scan_id: handle.scan_id().to_string(),
        path: path.to_path_buf(),
        reason: err.to_string(),
    })
}
