/// Scan progress reporting: lightweight messages sent from the scan
/// workers to whoever holds the receiving end of a crossbeam channel.
use std::time::Duration;

/// Progress updates emitted during a scan.
///
/// These messages carry only counters and status; the tree itself is
/// returned from [`Scanner::scan`](super::Scanner::scan) when the walk ends.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanProgress {
    /// Periodic update with running totals.
    Update {
        files_found: u64,
        dirs_found: u64,
        total_size: u64,
        current_path: String,
    },
    /// A recovered failure (e.g. permission denied on one directory).
    Error { path: String, message: String },
    /// Scanning finished and the tree is complete.
    Complete { duration: Duration, error_count: u64 },
    /// Scanning stopped early on request; the tree holds what was gathered.
    Cancelled,
}

impl ScanProgress {
    /// `true` for the last message a scan sends.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Cancelled)
    }
}
