use anyhow::Error;
use std::io::{self, Write};
use std::time::Duration;

use crate::core::ScanStatus;

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub stderr_is_tty: bool,
    pub quiet: bool,
    pub verbose: bool,
    /// stdout carries the JSON summary, so progress lines move to stderr.
    pub json: bool,
}

impl UiConfig {
    pub fn silent() -> Self {
        Self {
            stderr_is_tty: false,
            quiet: true,
            verbose: false,
            json: false,
        }
    }
}

pub fn info(cfg: &UiConfig, message: &str) {
    if cfg.quiet {
        return;
    }
    if cfg.json {
        let _ = writeln!(io::stderr().lock(), "{message}");
    } else {
        let _ = writeln!(io::stdout().lock(), "{message}");
    }
}

pub fn warn(cfg: &UiConfig, message: &str) {
    if cfg.quiet {
        return;
    }
    let _ = writeln!(io::stderr().lock(), "warning: {message}");
}

pub fn trace(message: &str) {
    let _ = writeln!(io::stderr().lock(), "  {message}");
}

pub fn poll_spinner(status: ScanStatus, interval: Duration) -> Option<indicatif::ProgressBar> {
    use std::io::IsTerminal;
    if !io::stderr().is_terminal() {
        return None;
    }
    let pb = indicatif::ProgressBar::new_spinner();
    pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
    pb.set_message(format!(
        "scan {} ({status}), next check in {}s",
        status.label(),
        interval.as_secs()
    ));
    pb.enable_steady_tick(Duration::from_millis(120));
    Some(pb)
}

pub fn eprintln_error(err: &Error) {
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "error:");
    let _ = writeln!(stderr, "  {err}");

    let mut causes = err.chain().skip(1).peekable();
    if causes.peek().is_some() {
        let _ = writeln!(stderr, "caused by:");
        for cause in causes {
            let _ = writeln!(stderr, "  - {cause}");
        }
    }

    let _ = writeln!(stderr, "next:");
    let _ = writeln!(stderr, "  - re-run with `--verbose` to see each request");
    let _ = writeln!(
        stderr,
        "  - see `crashtest --help` for the available options"
    );
}

pub fn running_in_github_actions() -> bool {
    std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true")
}

/// Workflow command that marks the step as failed in the GitHub Actions UI.
pub fn github_error_annotation(message: &str) -> String {
    let escaped = message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A");
    format!("::error::{escaped}")
}

pub fn emit_github_error(err: &Error) {
    let _ = writeln!(
        io::stdout().lock(),
        "{}",
        github_error_annotation(&err.to_string())
    );
}
