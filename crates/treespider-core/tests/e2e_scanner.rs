/// End-to-end scanner integration tests.
///
/// These run the real sequential and fork-join walks against a temporary
/// filesystem and follow the result through the archive and the queries,
/// the same path the `treespider` binary takes.
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use treespider_core::analysis::{find_empty_dirs, top_largest, TopMode};
use treespider_core::archive::{read_archive, write_archive};
use treespider_core::model::{DirectoryNode, Node};
use treespider_core::scanner::{start_scan, ScanHandle, ScanMode, ScanOptions, ScanProgress, Scanner};

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Create a reproducible directory tree:
///
/// ```text
/// root/
///   alpha/
///     a.txt   (100 bytes)
///     b.rs    (200 bytes)
///   beta/
///     c.png   (300 bytes, real PNG header)
///     gamma/  (empty)
///   d.zip     (400 bytes)
/// ```
///
/// Total file bytes: 1 000.
fn build_test_tree(root: &Path) {
    let alpha = root.join("alpha");
    let beta = root.join("beta");
    fs::create_dir_all(&alpha).unwrap();
    fs::create_dir_all(beta.join("gamma")).unwrap();

    write_bytes(&alpha.join("a.txt"), b"", 100);
    write_bytes(&alpha.join("b.rs"), b"", 200);
    write_bytes(&beta.join("c.png"), b"\x89PNG\r\n\x1a\n", 300);
    write_bytes(&root.join("d.zip"), b"PK\x03\x04", 400);
}

/// Write `n` bytes starting with `header`, padded with ASCII text.
fn write_bytes(path: &Path, header: &[u8], n: usize) {
    let mut data = vec![b'a'; n];
    data[..header.len()].copy_from_slice(header);
    let mut f = fs::File::create(path).unwrap();
    f.write_all(&data).unwrap();
}

fn options(mode: ScanMode) -> ScanOptions {
    ScanOptions {
        mode,
        workers: 4,
        ..ScanOptions::default()
    }
}

/// `(kind, path relative to root, size, content type)` for every node, in
/// pre-order after sorting by name.
fn flatten(root: &DirectoryNode) -> Vec<(&'static str, String, u64, String)> {
    root.descendants()
        .map(|n| {
            let rel = n.path()[root.path.len()..].to_string();
            let content_type = n.as_file().map(|f| f.content_type.clone()).unwrap_or_default();
            (n.kind_label(), rel, n.size(), content_type)
        })
        .collect()
}

/// Drain progress messages until the terminal one, with a generous timeout so
/// a stuck scan fails the test instead of hanging the suite.
fn drain_to_terminal(handle: &ScanHandle) -> ScanProgress {
    let deadline = std::time::Instant::now() + Duration::from_secs(30);
    loop {
        assert!(
            std::time::Instant::now() < deadline,
            "scanner did not finish within 30 seconds"
        );
        match handle.progress_rx.try_recv() {
            Ok(msg) if msg.is_terminal() => return msg,
            Ok(_) => continue,
            Err(crossbeam_channel::TryRecvError::Empty) => {
                std::thread::sleep(Duration::from_millis(10));
            }
            Err(crossbeam_channel::TryRecvError::Disconnected) => {
                panic!("scanner channel disconnected before the final message");
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn scan_discovers_all_files() {
    let tmp = TempDir::new().unwrap();
    build_test_tree(tmp.path());

    let out = Scanner::new(options(ScanMode::Sequential))
        .scan(tmp.path())
        .unwrap();

    assert_eq!(out.root.size, 1_000);
    assert_eq!(out.root.file_count, 4);
    assert_eq!(out.root.dir_count, 3);
    assert_eq!(out.report.total_size, 1_000);
    assert_eq!(out.report.scanned_files, 4);
    assert_eq!(out.report.scanned_folders, 3);
    assert_eq!(out.report.denied_folders, 0);
    assert!(out.report.errors.is_empty());
    assert!(!out.report.cancelled);

    let beta = out.root.find_dir("beta").unwrap();
    assert_eq!(beta.size, 300);
    assert_eq!(beta.file_count, 1);
    assert_eq!(beta.dir_count, 1);
}

#[test]
fn parallel_scan_matches_sequential() {
    let tmp = TempDir::new().unwrap();
    build_test_tree(tmp.path());
    for i in 0..12 {
        let dir = tmp.path().join(format!("wide{i:02}")).join("deeper");
        fs::create_dir_all(&dir).unwrap();
        write_bytes(&dir.join(format!("f{i}.txt")), b"", i * 10 + 1);
    }

    let mut seq = Scanner::new(options(ScanMode::Sequential))
        .scan(tmp.path())
        .unwrap();
    let mut par = Scanner::new(options(ScanMode::Parallel))
        .scan(tmp.path())
        .unwrap();
    seq.root.sort_by_name();
    par.root.sort_by_name();

    assert_eq!(flatten(&seq.root), flatten(&par.root));
    assert_eq!(seq.report.total_size, par.report.total_size);
    assert_eq!(seq.report.scanned_files, par.report.scanned_files);
    assert_eq!(seq.report.scanned_folders, par.report.scanned_folders);
    assert!(par.report.settings.parallel);
    assert_eq!(par.report.settings.workers, 4);
}

#[test]
fn scan_classifies_by_extension_then_signature() {
    let tmp = TempDir::new().unwrap();
    build_test_tree(tmp.path());
    write_bytes(&tmp.path().join("mystery"), b"%PDF-1.7", 64);

    let out = Scanner::new(options(ScanMode::Sequential))
        .scan(tmp.path())
        .unwrap();
    let type_of = |name: &str| {
        out.root
            .descendants()
            .filter_map(Node::as_file)
            .find(|f| f.name == name)
            .map(|f| f.content_type.clone())
            .unwrap()
    };

    assert_eq!(type_of("a.txt"), "text/plain");
    assert_eq!(type_of("c.png"), "image/png");
    assert_eq!(type_of("mystery"), "application/pdf");
    assert!(out.report.deep_scanned >= 1);
}

#[test]
fn background_scan_reports_progress_and_completes() {
    let tmp = TempDir::new().unwrap();
    build_test_tree(tmp.path());

    let handle = start_scan(tmp.path().to_path_buf(), options(ScanMode::Parallel)).unwrap();
    let last = drain_to_terminal(&handle);
    assert!(
        matches!(last, ScanProgress::Complete { error_count: 0, .. }),
        "{last:?}"
    );

    let out = handle.wait().unwrap();
    assert_eq!(out.report.scanned_files, 4);
}

#[test]
fn background_scan_of_missing_root_fails() {
    let tmp = TempDir::new().unwrap();
    let handle = start_scan(tmp.path().join("nope"), ScanOptions::default()).unwrap();
    assert!(handle.wait().is_err());
}

#[test]
fn cancelled_scan_yields_partial_report() {
    let tmp = TempDir::new().unwrap();
    build_test_tree(tmp.path());

    let out = Scanner::new(options(ScanMode::Sequential))
        .with_cancel(Arc::new(AtomicBool::new(true)))
        .scan(tmp.path())
        .unwrap();

    assert!(out.report.cancelled);
    assert!(out.root.children.is_empty());
    assert_eq!(out.report.total_size, 0);
}

#[test]
fn archive_round_trip_preserves_tree_and_report() {
    let tmp = TempDir::new().unwrap();
    let data = tmp.path().join("data");
    fs::create_dir(&data).unwrap();
    build_test_tree(&data);

    let mut out = Scanner::new(options(ScanMode::Sequential))
        .scan(&data)
        .unwrap();
    out.report.append_note("nightly snapshot");

    let dest = tmp.path().join("data.tsp");
    let stats = write_archive(&dest, &out.root, &out.report).unwrap();
    assert!(stats.compressed_size > 0);
    assert!(stats.original_size > stats.compressed_size);

    let archive = read_archive(&dest).unwrap();
    assert_eq!(archive.structure, out.root);
    assert_eq!(archive.report, out.report);
    assert_eq!(archive.report.user_note, "nightly snapshot");

    // Queries run unchanged on the loaded tree.
    let largest = top_largest(&archive.structure, 1, TopMode::Files);
    assert_eq!(largest[0].name(), "d.zip");
    let empty: Vec<&str> = find_empty_dirs(&archive.structure)
        .into_iter()
        .map(|d| d.name.as_str())
        .collect();
    assert_eq!(empty, ["gamma"]);
}

#[cfg(unix)]
#[test]
fn unreadable_directory_becomes_placeholder() {
    use std::os::unix::fs::PermissionsExt;
    use treespider_core::error::{FailureCause, FailureKind};

    let tmp = TempDir::new().unwrap();
    build_test_tree(tmp.path());
    let locked = tmp.path().join("locked");
    fs::create_dir(&locked).unwrap();
    write_bytes(&locked.join("secret.bin"), b"", 50);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users can list the directory anyway; nothing to test then.
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let seq = Scanner::new(options(ScanMode::Sequential)).scan(tmp.path());
    let par = Scanner::new(options(ScanMode::Parallel)).scan(tmp.path());
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    for out in [seq.unwrap(), par.unwrap()] {
        let node = out.root.find_dir("locked").unwrap();
        assert!(node.is_placeholder());
        assert_eq!(node.access_denied, Some(FailureCause::PermissionDenied));
        assert_eq!(node.size, 0);

        // Siblings are unaffected.
        assert_eq!(out.root.size, 1_000);
        assert_eq!(out.report.denied_folders, 1);
        let errors: Vec<_> = out.report.errors_of(FailureKind::EnumerationFailure).collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].path.ends_with("locked"));

        // A listing we could not read has no children, so it is reported as
        // empty and flagged.
        let empty = find_empty_dirs(&out.root);
        let locked_hit = empty.iter().find(|d| d.name == "locked").unwrap();
        assert_eq!(locked_hit.access_denied, Some(FailureCause::PermissionDenied));
    }
}

#[cfg(unix)]
#[test]
fn denied_directory_scenario_totals() {
    use std::os::unix::fs::PermissionsExt;
    use treespider_core::error::FailureKind;

    let tmp = TempDir::new().unwrap();
    write_bytes(&tmp.path().join("a.txt"), b"", 10);
    fs::create_dir(tmp.path().join("sub")).unwrap();
    write_bytes(&tmp.path().join("sub").join("b.bin"), b"", 5);
    let denied = tmp.path().join("denied");
    fs::create_dir(&denied).unwrap();
    fs::set_permissions(&denied, fs::Permissions::from_mode(0o000)).unwrap();
    if fs::read_dir(&denied).is_ok() {
        fs::set_permissions(&denied, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let out = Scanner::new(options(ScanMode::Sequential)).scan(tmp.path());
    fs::set_permissions(&denied, fs::Permissions::from_mode(0o755)).unwrap();
    let out = out.unwrap();

    assert_eq!(out.root.size, 15);
    assert_eq!(out.root.file_count, 2);
    assert_eq!(out.root.dir_count, 2);
    let node = out.root.find_dir("denied").unwrap();
    assert!(node.access_denied.is_some());
    assert!(node.children.is_empty());
    assert_eq!(out.report.errors_of(FailureKind::EnumerationFailure).count(), 1);
}

#[cfg(unix)]
#[test]
fn symlinks_are_recorded_not_followed() {
    let tmp = TempDir::new().unwrap();
    build_test_tree(tmp.path());
    std::os::unix::fs::symlink(tmp.path().join("alpha"), tmp.path().join("to_alpha")).unwrap();
    std::os::unix::fs::symlink(tmp.path().join("d.zip"), tmp.path().join("to_zip")).unwrap();

    let out = Scanner::new(options(ScanMode::Sequential))
        .scan(tmp.path())
        .unwrap();

    let links: Vec<&Node> = out
        .root
        .children
        .iter()
        .filter(|n| matches!(n, Node::Link(_)))
        .collect();
    assert_eq!(links.len(), 2);
    assert!(out.root.find_dir("to_alpha").is_none());
    // The two files under alpha/ are counted once, through the real directory.
    assert_eq!(out.root.find_dir("alpha").unwrap().file_count, 2);
}
