/// Data model for the scanned tree and its report.
pub mod node;
pub mod report;
pub mod size;

pub use node::{Attribute, DirectoryNode, FileNode, LinkNode, Node, TimeField, Timestamps};
pub use report::{ErrorRecord, HostInfo, Report, ReportSettings, VolumeInfo};
