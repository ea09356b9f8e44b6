/// Recursive directory walk shared by both execution strategies.
///
/// Each call to [`Walker::scan_dir`] returns an explicit [`DirOutcome`]
/// holding the finished subtree, its denied-folder count and the failures it
/// recovered from. The parent merges its children's outcomes; no accumulator
/// is shared between recursions except the atomic progress counters.
///
/// # Parallel fan-out
///
/// A directory is enumerated in full before any of its subdirectories is
/// visited. In parallel mode the subdirectories are then handed to rayon as
/// one task each (`par_iter`) and joined before the parent is finalised.
/// Rayon's join is work-stealing, so a worker waiting on its children keeps
/// executing queued tasks and a fixed-size pool never deadlocks on deep trees.
///
/// Children are written into pre-allocated slots, so the final `children`
/// order is always the enumeration order regardless of which task finished
/// first.
use super::progress::ScanProgress;
use super::{ScanMode, ScanOptions};
use crate::classify::{guess_mime, Classifier, SPECIAL_FILE};
use crate::error::{FailureCause, FailureKind};
use crate::model::{
    Attribute, DirectoryNode, ErrorRecord, FileNode, LinkNode, Node, Timestamps,
};
use crate::platform::{attributes, timestamps};
use compact_str::CompactString;
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use rayon::prelude::*;
use std::any::Any;
use std::fs::{self, FileType, Metadata};
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, warn};

/// Emit a progress update every this many files.
const UPDATE_INTERVAL: u64 = 1_000;

/// Running totals shared by every worker of one scan.
#[derive(Debug, Default)]
pub(crate) struct ScanCounters {
    files: AtomicU64,
    dirs: AtomicU64,
    bytes: AtomicU64,
    current_path: Mutex<String>,
}

impl ScanCounters {
    /// Count one file; returns the new file total.
    fn add_file(&self, size: u64) -> u64 {
        self.bytes.fetch_add(size, Ordering::Relaxed);
        self.files.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn enter_dir(&self, path: &str) {
        self.dirs.fetch_add(1, Ordering::Relaxed);
        let mut current = self.current_path.lock();
        current.clear();
        current.push_str(path);
    }

    fn snapshot(&self) -> ScanProgress {
        ScanProgress::Update {
            files_found: self.files.load(Ordering::Relaxed),
            dirs_found: self.dirs.load(Ordering::Relaxed),
            total_size: self.bytes.load(Ordering::Relaxed),
            current_path: self.current_path.lock().clone(),
        }
    }
}

/// Result of scanning one directory, merged into its parent.
#[derive(Debug)]
pub(crate) struct DirOutcome {
    pub node: DirectoryNode,
    /// Directories in this subtree (itself included) that could not be enumerated.
    pub denied: u64,
    pub errors: Vec<ErrorRecord>,
}

/// A subdirectory found during enumeration, waiting to be visited.
struct PendingDir {
    path: PathBuf,
    name: CompactString,
    path_str: String,
}

enum Slot {
    Ready(Node),
    /// Index into the subdirectory results.
    Dir(usize),
}

pub(crate) struct Walker<'a> {
    pub options: &'a ScanOptions,
    pub classifier: &'a Classifier,
    pub counters: &'a ScanCounters,
    pub cancel: &'a AtomicBool,
    pub progress: Option<&'a Sender<ScanProgress>>,
}

impl Walker<'_> {
    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Scan one directory and everything below it.
    ///
    /// Returns `None` only when cancellation was requested before the
    /// directory was enumerated; the caller then omits it from the tree.
    pub fn scan_dir(
        &self,
        path: &Path,
        name: CompactString,
        path_str: String,
    ) -> Option<DirOutcome> {
        if self.is_cancelled() {
            return None;
        }
        self.counters.enter_dir(&path_str);

        let mut errors = Vec::new();
        let meta = self.stat(fs::metadata(path), &path_str, &mut errors);
        let times = meta.as_ref().map(timestamps).unwrap_or_default();
        let attrs = self.attrs_for(&name, meta.as_ref());

        let entries = match fs::read_dir(path) {
            Ok(entries) => entries,
            Err(err) => return Some(self.denied(name, path_str, times, attrs, &err, errors)),
        };

        let mut node = DirectoryNode {
            times,
            attrs,
            ..DirectoryNode::new(name, path_str)
        };
        let mut slots = Vec::new();
        let mut pending = Vec::new();

        for entry in entries {
            if self.is_cancelled() {
                break;
            }
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let cause = FailureCause::from(&err);
                    debug!(path = %node.path, error = %err, "Directory entry could not be read");
                    self.record(
                        &mut errors,
                        ErrorRecord::new(
                            node.path.clone(),
                            FailureKind::EnumerationFailure,
                            cause,
                            err.to_string(),
                        ),
                    );
                    continue;
                }
            };

            let child_path = entry.path();
            let child_name = CompactString::new(entry.file_name().to_string_lossy());
            let child_str = child_path.to_string_lossy().into_owned();

            match entry.file_type() {
                Ok(ft) if ft.is_symlink() => {
                    let link = self.scan_link(&child_path, child_name, child_str, &mut errors);
                    slots.push(Slot::Ready(Node::Link(link)));
                }
                Ok(ft) if ft.is_dir() => {
                    slots.push(Slot::Dir(pending.len()));
                    pending.push(PendingDir {
                        path: child_path,
                        name: child_name,
                        path_str: child_str,
                    });
                }
                file_type => {
                    let file =
                        self.scan_file(&child_path, child_name, child_str, file_type, &mut errors);
                    slots.push(Slot::Ready(Node::File(file)));
                }
            }
        }

        let mut results: Vec<Option<DirOutcome>> = match self.options.mode {
            ScanMode::Sequential => pending.iter().map(|d| self.scan_child(d)).collect(),
            ScanMode::Parallel => pending.par_iter().map(|d| self.scan_child(d)).collect(),
        };

        let mut denied = 0;
        for slot in slots {
            match slot {
                Slot::Ready(child) => push_child(&mut node, child),
                Slot::Dir(i) => {
                    if let Some(mut outcome) = results[i].take() {
                        denied += outcome.denied;
                        errors.append(&mut outcome.errors);
                        push_child(&mut node, Node::Directory(outcome.node));
                    }
                }
            }
        }

        Some(DirOutcome {
            node,
            denied,
            errors,
        })
    }

    /// Visit a subdirectory, turning a panic anywhere in its subtree into a
    /// placeholder so the rest of the scan carries on.
    fn scan_child(&self, dir: &PendingDir) -> Option<DirOutcome> {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.scan_dir(&dir.path, dir.name.clone(), dir.path_str.clone())
        }));
        match result {
            Ok(outcome) => outcome,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(path = %dir.path_str, %message, "Subdirectory scan panicked");
                let record = ErrorRecord::new(
                    dir.path_str.clone(),
                    FailureKind::EnumerationFailure,
                    FailureCause::Panicked,
                    message,
                );
                self.notify_error(&record);
                let node = DirectoryNode::placeholder(
                    dir.name.clone(),
                    dir.path_str.clone(),
                    Timestamps::default(),
                    self.options.collect_attributes.then(Vec::new),
                    FailureCause::Panicked,
                );
                Some(DirOutcome {
                    node,
                    denied: 1,
                    errors: vec![record],
                })
            }
        }
    }

    fn denied(
        &self,
        name: CompactString,
        path_str: String,
        times: Timestamps,
        attrs: Option<Vec<Attribute>>,
        err: &io::Error,
        mut errors: Vec<ErrorRecord>,
    ) -> DirOutcome {
        let cause = FailureCause::from(err);
        warn!(path = %path_str, %cause, "Directory could not be enumerated");
        let record = ErrorRecord::new(
            path_str.clone(),
            FailureKind::EnumerationFailure,
            cause,
            err.to_string(),
        );
        self.record(&mut errors, record);
        DirOutcome {
            node: DirectoryNode::placeholder(name, path_str, times, attrs, cause),
            denied: 1,
            errors,
        }
    }

    fn scan_file(
        &self,
        path: &Path,
        name: CompactString,
        path_str: String,
        file_type: io::Result<FileType>,
        errors: &mut Vec<ErrorRecord>,
    ) -> FileNode {
        let meta = match file_type.and_then(|_| fs::symlink_metadata(path)) {
            Ok(meta) => meta,
            Err(err) => {
                let cause = FailureCause::from(&err);
                debug!(path = %path_str, error = %err, "Could not stat file");
                self.record(
                    errors,
                    ErrorRecord::new(
                        path_str.clone(),
                        FailureKind::StatFailure,
                        cause,
                        err.to_string(),
                    ),
                );
                self.count_file(0);
                return FileNode {
                    name,
                    path: path_str,
                    content_type: cause.label().to_string(),
                    size: 0,
                    attrs: self.options.collect_attributes.then(Vec::new),
                    times: Timestamps::default(),
                };
            }
        };

        let size = meta.len();
        let content_type = if meta.is_file() {
            let classification = self.classifier.classify(
                path,
                size,
                self.options.threshold,
                self.options.force_deep,
            );
            if let Some((cause, message)) = classification.failure {
                self.record(
                    errors,
                    ErrorRecord::new(
                        path_str.clone(),
                        FailureKind::ClassificationFailure,
                        cause,
                        message,
                    ),
                );
            }
            classification.content_type
        } else {
            // Fifos and devices can block or never end; never open them.
            guess_mime(path).unwrap_or(SPECIAL_FILE).to_string()
        };

        self.count_file(size);
        FileNode {
            attrs: self.attrs_for(&name, Some(&meta)),
            times: timestamps(&meta),
            name,
            path: path_str,
            content_type,
            size,
        }
    }

    fn scan_link(
        &self,
        path: &Path,
        name: CompactString,
        path_str: String,
        errors: &mut Vec<ErrorRecord>,
    ) -> LinkNode {
        let target = match fs::read_link(path) {
            Ok(target) => target.to_string_lossy().into_owned(),
            Err(err) => {
                debug!(path = %path_str, error = %err, "Could not read link target");
                self.record(
                    errors,
                    ErrorRecord::new(
                        path_str.clone(),
                        FailureKind::StatFailure,
                        FailureCause::from(&err),
                        err.to_string(),
                    ),
                );
                String::new()
            }
        };
        let meta = self.stat(fs::symlink_metadata(path), &path_str, errors);
        LinkNode {
            attrs: self.attrs_for(&name, meta.as_ref()),
            times: meta.as_ref().map(timestamps).unwrap_or_default(),
            name,
            path: path_str,
            target,
            size: 0,
        }
    }

    /// Keep `meta` if the stat succeeded, otherwise record a `StatFailure`.
    fn stat(
        &self,
        meta: io::Result<Metadata>,
        path_str: &str,
        errors: &mut Vec<ErrorRecord>,
    ) -> Option<Metadata> {
        match meta {
            Ok(meta) => Some(meta),
            Err(err) => {
                debug!(path = %path_str, error = %err, "Could not stat entry");
                self.record(
                    errors,
                    ErrorRecord::new(
                        path_str,
                        FailureKind::StatFailure,
                        FailureCause::from(&err),
                        err.to_string(),
                    ),
                );
                None
            }
        }
    }

    fn attrs_for(&self, name: &str, meta: Option<&Metadata>) -> Option<Vec<Attribute>> {
        if !self.options.collect_attributes {
            return None;
        }
        Some(meta.map(|m| attributes(name, m)).unwrap_or_default())
    }

    fn count_file(&self, size: u64) {
        let files = self.counters.add_file(size);
        if files % UPDATE_INTERVAL == 0 {
            if let Some(tx) = self.progress {
                // Never block the walk on a slow consumer.
                let _ = tx.try_send(self.counters.snapshot());
            }
        }
    }

    fn record(&self, errors: &mut Vec<ErrorRecord>, record: ErrorRecord) {
        self.notify_error(&record);
        errors.push(record);
    }

    fn notify_error(&self, record: &ErrorRecord) {
        if let Some(tx) = self.progress {
            let _ = tx.try_send(ScanProgress::Error {
                path: record.path.clone(),
                message: format!("{}: {}", record.kind.label(), record.description),
            });
        }
    }
}

/// Add a finished child and fold its contribution into the parent's aggregates.
fn push_child(parent: &mut DirectoryNode, child: Node) {
    match &child {
        Node::File(f) => {
            parent.size += f.size;
            parent.file_count += 1;
        }
        Node::Directory(d) => {
            parent.size += d.size;
            parent.file_count += d.file_count;
            parent.dir_count += d.dir_count + 1;
        }
        Node::Link(_) => {}
    }
    parent.children.push(child);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic while scanning subdirectory".to_string()
    }
}
