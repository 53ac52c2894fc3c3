use serde::Serialize;

/// Raw report body exactly as returned by the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    bytes: Vec<u8>,
}

impl ScanReport {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub schema_version: String,
    pub tool_version: String,
    pub webhook: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_id: Option<String>,
    pub pulled_report: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_status: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_bytes: Option<u64>,
    pub started_at: String,
    pub finished_at: String,
}
