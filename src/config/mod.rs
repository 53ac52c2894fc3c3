use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_ENDPOINT;
use crate::controller::{DEFAULT_POLL_INTERVAL, DEFAULT_REPORT_PATH};

pub const DEFAULT_CONFIG_FILE: &str = "crashtest.toml";

#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_path: Option<String>,
    #[serde(skip)]
    pub webhook: Option<String>,
    pub api: ApiConfig,
    pub scan: ScanConfig,
    pub privacy: PrivacyConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiConfig {
    pub endpoint: String,
    /// 0 disables the per-request timeout.
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanConfig {
    pub pull_report: String,
    pub poll_interval_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_wait_secs: Option<u64>,
    pub report_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrivacyConfig {
    pub mask_webhook: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self {
            config_path: None,
            webhook: None,
            api: ApiConfig {
                endpoint: DEFAULT_ENDPOINT.to_string(),
                request_timeout_secs: 30,
            },
            scan: ScanConfig {
                pull_report: "true".to_string(),
                poll_interval_secs: DEFAULT_POLL_INTERVAL.as_secs(),
                max_wait_secs: None,
                report_path: DEFAULT_REPORT_PATH.to_string(),
            },
            privacy: PrivacyConfig { mask_webhook: true },
            log: LogConfig { dir: None },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    api: Option<RawApiConfig>,
    scan: Option<RawScanConfig>,
    privacy: Option<RawPrivacyConfig>,
    log: Option<RawLogConfig>,
}

#[derive(Debug, Deserialize)]
struct RawApiConfig {
    endpoint: Option<String>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawScanConfig {
    pull_report: Option<FlagValue>,
    poll_interval_secs: Option<u64>,
    max_wait_secs: Option<u64>,
    report_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPrivacyConfig {
    mask_webhook: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawLogConfig {
    dir: Option<String>,
}

/// `pull_report` may be written as a TOML bool or as the raw action string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FlagValue {
    Bool(bool),
    Text(String),
}

impl FlagValue {
    fn into_flag(self) -> String {
        match self {
            FlagValue::Bool(b) => b.to_string(),
            FlagValue::Text(s) => s,
        }
    }
}

pub fn load(config_path: Option<&Path>) -> Result<EffectiveConfig> {
    load_with_env(config_path, &|key| std::env::var(key).ok())
}

pub fn load_with_env(
    config_path: Option<&Path>,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<EffectiveConfig> {
    let mut cfg = EffectiveConfig::default();

    let path = match config_path {
        Some(p) => {
            if !p.exists() {
                anyhow::bail!("config file not found: {}", p.display());
            }
            Some(p.to_path_buf())
        }
        None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.exists()),
    };

    if let Some(path) = path {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let raw = parse_raw(&s)?;
        apply_raw_config(&mut cfg, raw);
        cfg.config_path = Some(path.display().to_string());
    }

    apply_env_overrides(&mut cfg, env)?;
    apply_action_inputs(&mut cfg, env);

    Ok(cfg)
}

fn parse_raw(s: &str) -> Result<RawConfig> {
    toml::from_str(s).context("failed to parse config file (TOML)")
}

fn apply_raw_config(cfg: &mut EffectiveConfig, raw: RawConfig) {
    if let Some(api) = raw.api {
        if let Some(endpoint) = api.endpoint {
            cfg.api.endpoint = endpoint;
        }
        if let Some(request_timeout_secs) = api.request_timeout_secs {
            cfg.api.request_timeout_secs = request_timeout_secs;
        }
    }

    if let Some(scan) = raw.scan {
        if let Some(pull_report) = scan.pull_report {
            cfg.scan.pull_report = pull_report.into_flag();
        }
        if let Some(poll_interval_secs) = scan.poll_interval_secs {
            cfg.scan.poll_interval_secs = poll_interval_secs;
        }
        if let Some(max_wait_secs) = scan.max_wait_secs {
            cfg.scan.max_wait_secs = Some(max_wait_secs);
        }
        if let Some(report_path) = scan.report_path {
            cfg.scan.report_path = report_path;
        }
    }

    if let Some(privacy) = raw.privacy {
        if let Some(mask_webhook) = privacy.mask_webhook {
            cfg.privacy.mask_webhook = mask_webhook;
        }
    }

    if let Some(log) = raw.log {
        if let Some(dir) = log.dir {
            cfg.log.dir = Some(dir);
        }
    }
}

fn apply_env_overrides(
    cfg: &mut EffectiveConfig,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(v) = non_empty(env("CRASHTEST_WEBHOOK")) {
        cfg.webhook = Some(v);
    }
    // Passed through verbatim: the permissive check compares the raw string.
    if let Some(v) = env("CRASHTEST_PULL_REPORT") {
        cfg.scan.pull_report = v;
    }
    if let Some(v) = non_empty(env("CRASHTEST_API_ENDPOINT")) {
        cfg.api.endpoint = v;
    }
    if let Some(v) = env("CRASHTEST_REQUEST_TIMEOUT_SECS") {
        cfg.api.request_timeout_secs = parse_secs(&v, "CRASHTEST_REQUEST_TIMEOUT_SECS")?;
    }
    if let Some(v) = env("CRASHTEST_POLL_INTERVAL_SECS") {
        cfg.scan.poll_interval_secs = parse_secs(&v, "CRASHTEST_POLL_INTERVAL_SECS")?;
    }
    if let Some(v) = non_empty(env("CRASHTEST_MAX_WAIT_SECS")) {
        cfg.scan.max_wait_secs = Some(parse_secs(&v, "CRASHTEST_MAX_WAIT_SECS")?);
    }
    if let Some(v) = non_empty(env("CRASHTEST_REPORT_PATH")) {
        cfg.scan.report_path = v;
    }
    if let Some(v) = env("CRASHTEST_PRIVACY_MASK_WEBHOOK") {
        cfg.privacy.mask_webhook =
            parse_bool(&v).with_context(|| "CRASHTEST_PRIVACY_MASK_WEBHOOK")?;
    }
    if let Some(v) = non_empty(env("CRASHTEST_LOG_DIR")) {
        cfg.log.dir = Some(v);
    }

    Ok(())
}

/// GitHub Actions exposes `with:` inputs as `INPUT_<NAME>` with the name
/// upper-cased and hyphens kept. Unset inputs arrive as empty strings; values are
/// trimmed the way the runner's own input reader trims them.
fn apply_action_inputs(cfg: &mut EffectiveConfig, env: &dyn Fn(&str) -> Option<String>) {
    if let Some(v) = non_empty(env("INPUT_CRASHTEST-WEBHOOK")) {
        cfg.webhook = Some(v);
    }
    if let Some(v) = non_empty(env("INPUT_PULL-REPORT")) {
        cfg.scan.pull_report = v;
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

pub fn parse_secs(s: &str, what: &str) -> Result<u64> {
    s.trim()
        .parse::<u64>()
        .with_context(|| format!("{what}: expected a whole number of seconds, got {s:?}"))
}

fn parse_bool(s: &str) -> Result<bool> {
    let s = s.trim().to_ascii_lowercase();
    match s.as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow::anyhow!(
            "invalid boolean: {s} (use true|false|1|0|yes|no|on|off)"
        )),
    }
}
