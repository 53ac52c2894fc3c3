use std::fmt;

/// Webhook-keyed request that selects which remote scan configuration to trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    webhook: String,
}

impl ScanRequest {
    /// Returns `None` when the webhook is empty after trimming.
    pub fn new(webhook: impl Into<String>) -> Option<Self> {
        let webhook = webhook.into().trim().to_string();
        if webhook.is_empty() {
            return None;
        }
        Some(Self { webhook })
    }

    pub fn webhook(&self) -> &str {
        &self.webhook
    }
}

/// Server-assigned scan identifier. Only produced by a successful start call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanHandle {
    scan_id: String,
}

impl ScanHandle {
    pub(crate) fn new(scan_id: String) -> Self {
        Self { scan_id }
    }

    pub fn scan_id(&self) -> &str {
        &self.scan_id
    }
}

impl fmt::Display for ScanHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.scan_id)
    }
}
