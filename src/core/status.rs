use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ScanStatus(i64);

impl ScanStatus {
    pub const QUEUED: ScanStatus = ScanStatus(100);

    pub const fn new(code: i64) -> Self {
        Self(code)
    }

    pub const fn code(self) -> i64 {
        self.0
    }

    /// Only queued and running keep the poll loop alive; every other code is terminal.
    pub const fn is_in_progress(self) -> bool {
        matches!(self.0, 100 | 101)
    }

    pub const fn label(self) -> &'static str {
        match self.0 {
            100 => "queued",
            101 => "running",
            _ => "finished",
        }
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
