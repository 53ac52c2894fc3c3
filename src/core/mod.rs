mod report;
mod scan;
mod status;

pub use report::{RunSummary, ScanReport};
pub use scan::{ScanHandle, ScanRequest};
pub use status::ScanStatus;
