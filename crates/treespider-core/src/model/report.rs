/// Scan-run metadata stored alongside the tree in every archive.
use super::node::{Attribute, Timestamps};
use crate::error::{FailureCause, FailureKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One failure the scan recovered from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub path: String,
    pub kind: FailureKind,
    pub cause: FailureCause,
    pub description: String,
}

impl ErrorRecord {
    pub fn new(
        path: impl Into<String>,
        kind: FailureKind,
        cause: FailureCause,
        description: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            kind,
            cause,
            description: description.into(),
        }
    }
}

/// Classification and execution settings the scan ran with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSettings {
    /// Largest file size (bytes) eligible for deep content sniffing.
    pub threshold: u64,
    pub force_deep: bool,
    /// Name of the deep engine actually used.
    pub engine: String,
    pub parallel: bool,
    pub workers: usize,
    pub collect_attributes: bool,
}

/// Machine the scan ran on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInfo {
    pub computer_name: Option<String>,
    pub system_name: Option<String>,
    pub system_version: Option<String>,
    pub machine_arch: String,
    pub cpu_count: usize,
    pub total_memory: u64,
}

/// Volume containing the scan root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeInfo {
    pub mount_point: String,
    pub file_system: String,
    pub total_space: u64,
    pub available_space: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Free text added by the user after the scan.
    #[serde(default)]
    pub user_note: String,
    /// Absolute path of the scan root.
    pub original_path: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_size: u64,
    pub scanned_files: u64,
    pub scanned_folders: u64,
    pub denied_folders: u64,
    /// Files whose type came from the deep content sniffer.
    pub deep_scanned: u64,
    /// `true` if the scan was interrupted; the tree holds what was gathered.
    #[serde(default)]
    pub cancelled: bool,
    #[serde(flatten)]
    pub settings: ReportSettings,
    #[serde(flatten)]
    pub host: HostInfo,
    pub volume: Option<VolumeInfo>,
    pub root_times: Timestamps,
    #[serde(default)]
    pub root_attrs: Option<Vec<Attribute>>,
    pub errors: Vec<ErrorRecord>,
}

impl Report {
    /// Append a line of free text to the user note.
    pub fn append_note(&mut self, note: &str) {
        let note = note.trim();
        if note.is_empty() {
            return;
        }
        if !self.user_note.is_empty() {
            self.user_note.push('\n');
        }
        self.user_note.push_str(note);
    }

    pub fn duration(&self) -> chrono::Duration {
        self.end_time - self.start_time
    }

    /// Recovered errors of a single kind.
    pub fn errors_of(&self, kind: FailureKind) -> impl Iterator<Item = &ErrorRecord> {
        self.errors.iter().filter(move |e| e.kind == kind)
    }
}
