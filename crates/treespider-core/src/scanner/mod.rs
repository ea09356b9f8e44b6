/// Scanner module: orchestrates filesystem scanning.
///
/// Two interchangeable strategies walk the tree with the same per-directory
/// logic (see [`walk`]):
/// - **Sequential:** depth-first on the calling thread.
/// - **Parallel:** fork-join on a fixed-size rayon pool, one task per
///   subdirectory.
///
/// [`Scanner::scan`] blocks and returns the finished tree plus its
/// [`Report`]. [`start_scan`] runs the same scan on a background thread and
/// hands back a [`ScanHandle`] for progress and cancellation.
pub mod progress;
mod walk;

pub use progress::ScanProgress;

use crate::classify::{Classifier, DeepEngine};
use crate::error::{Result, SpiderError};
use crate::model::{DirectoryNode, Report, ReportSettings};
use crate::platform::{default_workers, host_info, volume_for};
use chrono::Utc;
use compact_str::CompactString;
use crossbeam_channel::{Receiver, Sender};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::info;
use walk::{ScanCounters, Walker};

/// Shared flag used to request that a running scan stop early.
pub type CancelFlag = Arc<AtomicBool>;

/// Default size threshold for deep classification (1 MiB).
pub const DEFAULT_THRESHOLD: u64 = 1024 * 1024;

/// Maximum number of progress messages that may queue up in the channel.
///
/// Updates are sent with `try_send`, so a consumer that falls behind only
/// loses intermediate updates; the walk itself never blocks on the channel.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 4_096;

/// Stack size for scan threads. The walk recurses once per directory level.
const SCAN_STACK_SIZE: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScanMode {
    #[default]
    Sequential,
    Parallel,
}

/// Settings for one scan.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Files larger than this are never opened for deep classification.
    pub threshold: u64,
    /// Deep-classify every non-empty file regardless of size or guess.
    pub force_deep: bool,
    pub engine: DeepEngine,
    /// When `false`, nodes carry no attribute list at all.
    pub collect_attributes: bool,
    pub mode: ScanMode,
    /// Worker-pool size. Only used in parallel mode.
    pub workers: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            force_deep: false,
            engine: DeepEngine::default(),
            collect_attributes: true,
            mode: ScanMode::Sequential,
            workers: default_workers(),
        }
    }
}

/// A finished scan: the root directory and its report.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanOutput {
    pub root: DirectoryNode,
    pub report: Report,
}

pub struct Scanner {
    options: ScanOptions,
    classifier: Classifier,
    cancel: CancelFlag,
    progress: Option<Sender<ScanProgress>>,
}

impl Scanner {
    /// Build a scanner. The deep-classification engine is selected here, once.
    pub fn new(options: ScanOptions) -> Self {
        let classifier = Classifier::new(options.engine.select());
        Self {
            options,
            classifier,
            cancel: Arc::new(AtomicBool::new(false)),
            progress: None,
        }
    }

    /// Share an externally owned cancellation flag.
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Send progress messages to `tx` while scanning.
    ///
    /// Every send is non-blocking: messages that do not fit a full channel,
    /// the final `Complete`/`Cancelled` included, are dropped.
    pub fn with_progress(mut self, tx: Sender<ScanProgress>) -> Self {
        self.progress = Some(tx);
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Scan the tree rooted at `root`.
    ///
    /// Fails only if `root` is not an existing directory or the worker pool
    /// cannot be created. Every failure below the root is recovered into a
    /// placeholder node plus an entry in [`Report::errors`].
    pub fn scan(&self, root: &Path) -> Result<ScanOutput> {
        let root = std::path::absolute(root)?;
        match fs::metadata(&root) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(SpiderError::NotADirectory(root)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(SpiderError::PathNotFound(root))
            }
            Err(err) => return Err(err.into()),
        }

        let parallel = self.options.mode == ScanMode::Parallel;
        let workers = if parallel {
            self.options.workers.max(1)
        } else {
            1
        };
        let root_str = root.to_string_lossy().into_owned();
        info!(
            root = %root_str,
            engine = self.classifier.engine_name(),
            parallel,
            workers,
            "Starting scan"
        );

        let start_time = Utc::now();
        let started = Instant::now();
        let deep_before = self.classifier.deep_scanned();
        let counters = ScanCounters::default();
        let walker = Walker {
            options: &self.options,
            classifier: &self.classifier,
            counters: &counters,
            cancel: &self.cancel,
            progress: self.progress.as_ref(),
        };
        let name = root_display_name(&root);

        let outcome = if parallel {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("treespider-scan-{i}"))
                .stack_size(SCAN_STACK_SIZE)
                .build()
                .map_err(|e| SpiderError::ThreadPool(e.to_string()))?;
            pool.install(|| walker.scan_dir(&root, name.clone(), root_str.clone()))
        } else {
            walker.scan_dir(&root, name.clone(), root_str.clone())
        };

        let (root_node, denied, errors) = match outcome {
            Some(outcome) => (outcome.node, outcome.denied, outcome.errors),
            // Cancelled before the root was even listed.
            None => (DirectoryNode::new(name, root_str.clone()), 0, Vec::new()),
        };

        let cancelled = self.cancel.load(Ordering::Relaxed);
        let report = Report {
            user_note: String::new(),
            original_path: root_str,
            start_time,
            end_time: Utc::now(),
            total_size: root_node.size,
            scanned_files: root_node.file_count,
            scanned_folders: root_node.dir_count,
            denied_folders: denied,
            deep_scanned: self.classifier.deep_scanned() - deep_before,
            cancelled,
            settings: ReportSettings {
                threshold: self.options.threshold,
                force_deep: self.options.force_deep,
                engine: self.classifier.engine_name().to_string(),
                parallel,
                workers,
                collect_attributes: self.options.collect_attributes,
            },
            host: host_info(),
            volume: volume_for(&root),
            root_times: root_node.times,
            root_attrs: root_node.attrs.clone(),
            errors,
        };

        let duration = started.elapsed();
        info!(
            files = report.scanned_files,
            folders = report.scanned_folders,
            bytes = report.total_size,
            errors = report.errors.len(),
            cancelled,
            "Scan finished in {:.2?}",
            duration
        );
        if let Some(tx) = &self.progress {
            let done = if cancelled {
                ScanProgress::Cancelled
            } else {
                ScanProgress::Complete {
                    duration,
                    error_count: report.errors.len() as u64,
                }
            };
            // A consumer that stopped draining must not hang the scan; it
            // still sees the channel disconnect once the scanner is dropped.
            let _ = tx.try_send(done);
        }

        Ok(ScanOutput {
            root: root_node,
            report,
        })
    }
}

/// Name shown for the root: the last path component, or the whole path for
/// filesystem roots such as `/` or `C:\`.
fn root_display_name(root: &Path) -> CompactString {
    match root.file_name() {
        Some(name) => CompactString::new(name.to_string_lossy()),
        None => CompactString::new(root.to_string_lossy()),
    }
}

/// Handle to a scan running on a background thread.
pub struct ScanHandle {
    /// Receiver for progress updates from the scan thread.
    pub progress_rx: Receiver<ScanProgress>,
    cancel_flag: CancelFlag,
    thread: thread::JoinHandle<Result<ScanOutput>>,
}

impl ScanHandle {
    /// Request the scan to stop as soon as possible.
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::Relaxed)
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel_flag.clone()
    }

    /// Block until the scan ends and return its result.
    ///
    /// Drops this handle's progress receiver first so the final message can
    /// never block the scan thread on a full channel.
    pub fn wait(self) -> Result<ScanOutput> {
        let Self {
            progress_rx,
            thread,
            ..
        } = self;
        drop(progress_rx);
        thread.join().unwrap_or(Err(SpiderError::ScanThread))
    }
}

/// Start a scan on a background thread.
pub fn start_scan(root: PathBuf, options: ScanOptions) -> Result<ScanHandle> {
    let (progress_tx, progress_rx) =
        crossbeam_channel::bounded::<ScanProgress>(PROGRESS_CHANNEL_CAPACITY);
    let scanner = Scanner::new(options).with_progress(progress_tx);
    let cancel_flag = scanner.cancel_flag();

    let thread = thread::Builder::new()
        .name("treespider-scanner".into())
        .stack_size(SCAN_STACK_SIZE)
        .spawn(move || scanner.scan(&root))?;

    Ok(ScanHandle {
        progress_rx,
        cancel_flag,
        thread,
    })
}
