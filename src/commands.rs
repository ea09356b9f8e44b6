//! Subcommand implementations. Each one loads what it needs from the core
//! crate, prints a plain-text listing to stdout and optionally a CSV copy.

use crate::{Cli, Command, QueryArgs, ScanArgs};
use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::atomic::Ordering;
use tracing::{debug, info, warn};
use treespider_core::analysis::{self, export};
use treespider_core::archive::{self, Archive};
use treespider_core::config::SpiderConfig;
use treespider_core::model::size::{format_count, format_size};
use treespider_core::model::{DirectoryNode, FileNode, Node};
use treespider_core::scanner::{self, ScanMode, ScanProgress};

pub fn run(cli: Cli) -> Result<()> {
    let config = SpiderConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Command::Scan(args) => scan(&config, args),
        Command::Info { archive, errors } => show_info(&archive, errors),
        Command::Note { archive, text } => add_note(&archive, &text),
        Command::Largest { query, n, mode } => query_scope(&query, |dir| {
            let nodes = analysis::top_largest(dir, n, mode);
            print_nodes(&nodes);
            export_csv(&query, |w| export::write_nodes(w, &nodes))
        }),
        Command::Recent { query, n, field } => query_scope(&query, |dir| {
            let nodes = analysis::top_recent(dir, n, field);
            for node in &nodes {
                let when = node
                    .times()
                    .get(field)
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "-".into());
                println!("{when:<19}  {:>10}  {}", format_size(node.size()), node.path());
            }
            export_csv(&query, |w| export::write_nodes(w, &nodes))
        }),
        Command::Duplicates { query, grouped } => query_scope(&query, |dir| {
            if grouped {
                let groups = analysis::group_duplicates(dir);
                for group in &groups {
                    println!(
                        "{} x{} ({} each, {} reclaimable)",
                        group.name,
                        group.files.len(),
                        format_size(group.size),
                        format_size(group.wasted_bytes())
                    );
                    for file in &group.files {
                        println!("    {}", file.path);
                    }
                }
                export_csv(&query, |w| export::write_duplicate_groups(w, &groups))
            } else {
                let files = analysis::find_duplicates(dir);
                print_files(&files);
                export_csv(&query, |w| export::write_files(w, &files))
            }
        }),
        Command::Empty { query } => query_scope(&query, |dir| {
            let dirs = analysis::find_empty_dirs(dir);
            for d in &dirs {
                match d.access_denied {
                    Some(cause) => println!("{}  [{}]", d.path, cause.label()),
                    None => println!("{}", d.path),
                }
            }
            export_csv(&query, |w| export::write_dirs(w, &dirs))
        }),
        Command::Search {
            query,
            pattern,
            regex,
        } => query_scope(&query, |dir| {
            let nodes = analysis::search_by_name(dir, &pattern, regex)?;
            print_nodes(&nodes);
            export_csv(&query, |w| export::write_nodes(w, &nodes))
        }),
        Command::Types {
            query,
            sort,
            by,
            top,
        } => query_scope(&query, |dir| {
            let mut stats = analysis::common_types(dir, sort, by);
            if let Some(top) = top {
                stats.truncate(top);
            }
            for s in &stats {
                println!(
                    "{:<40} {:>10} {:>6.2}%  {:>10} {:>6.2}%",
                    s.key,
                    format_count(s.count),
                    s.count_share,
                    format_size(s.total_size),
                    s.size_share
                );
            }
            export_csv(&query, |w| export::write_type_stats(w, &stats))
        }),
        Command::Garbage { query } => {
            let matcher = config.garbage_matcher()?;
            query_scope(&query, |dir| {
                let files = analysis::find_garbage(dir, &matcher);
                let total: u64 = files.iter().map(|f| f.size).sum();
                print_files(&files);
                println!(
                    "{} files, {} reclaimable",
                    format_count(files.len() as u64),
                    format_size(total)
                );
                export_csv(&query, |w| export::write_files(w, &files))
            })
        }
    }
}

fn scan(config: &SpiderConfig, args: ScanArgs) -> Result<()> {
    let mut options = config.scan.to_options()?;
    if let Some(threshold) = args.threshold {
        options.threshold = threshold;
    }
    if let Some(engine) = args.engine {
        options.engine = engine;
    }
    if let Some(workers) = args.workers {
        if workers == 0 {
            return Err(anyhow!("--workers must be at least 1"));
        }
        options.workers = workers;
    }
    options.force_deep |= args.force_deep;
    if args.parallel {
        options.mode = ScanMode::Parallel;
    }
    if args.skip_attributes {
        options.collect_attributes = false;
    }
    debug!(?options, "Scan options resolved");

    let handle = scanner::start_scan(args.root.clone(), options)
        .with_context(|| format!("starting scan of {}", args.root.display()))?;

    let cancel = handle.cancel_flag();
    ctrlc::set_handler(move || {
        info!("Interrupt received, stopping scan");
        cancel.store(true, Ordering::SeqCst);
    })
    .context("installing Ctrl-C handler")?;

    for msg in handle.progress_rx.iter() {
        match msg {
            ScanProgress::Update {
                files_found,
                dirs_found,
                total_size,
                current_path,
            } => info!(
                files = files_found,
                dirs = dirs_found,
                size = %format_size(total_size),
                at = %current_path,
                "Scanning"
            ),
            ScanProgress::Error { path, message } => warn!(%path, "{message}"),
            ScanProgress::Complete { .. } | ScanProgress::Cancelled => break,
        }
    }

    let mut output = handle
        .wait()
        .with_context(|| format!("scanning {}", args.root.display()))?;
    if let Some(note) = &args.note {
        output.report.append_note(note);
    }

    let stats = archive::write_archive(&args.output, &output.root, &output.report)
        .with_context(|| format!("writing {}", args.output.display()))?;

    let report = &output.report;
    if report.cancelled {
        warn!("Scan was interrupted; the archive holds a partial tree");
    }
    println!(
        "{}: {} in {} files, {} folders ({} denied) in {:.1}s",
        report.original_path,
        format_size(report.total_size),
        format_count(report.scanned_files),
        format_count(report.scanned_folders),
        format_count(report.denied_folders),
        report.duration().num_milliseconds() as f64 / 1000.0
    );
    println!(
        "Wrote {} ({} compressed, ratio {:.1})",
        args.output.display(),
        format_size(stats.compressed_size),
        stats.ratio()
    );
    Ok(())
}

fn show_info(path: &Path, list_errors: bool) -> Result<()> {
    let (archive, stats) = archive::read_archive_with_stats(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let r = &archive.report;

    println!("Root:        {}", r.original_path);
    println!(
        "Scanned:     {} .. {} ({:.1}s){}",
        r.start_time.format("%Y-%m-%d %H:%M:%S"),
        r.end_time.format("%Y-%m-%d %H:%M:%S"),
        r.duration().num_milliseconds() as f64 / 1000.0,
        if r.cancelled { " [interrupted]" } else { "" }
    );
    println!("Total size:  {}", format_size(r.total_size));
    println!(
        "Entries:     {} files, {} folders, {} denied",
        format_count(r.scanned_files),
        format_count(r.scanned_folders),
        format_count(r.denied_folders)
    );
    println!(
        "Classifier:  {} (threshold {}, deep-scanned {}{})",
        r.settings.engine,
        format_size(r.settings.threshold),
        format_count(r.deep_scanned),
        if r.settings.force_deep { ", forced" } else { "" }
    );
    println!(
        "Execution:   {}",
        if r.settings.parallel {
            format!("parallel, {} workers", r.settings.workers)
        } else {
            "sequential".to_string()
        }
    );
    println!(
        "Host:        {} ({} {}, {}, {} CPUs, {} RAM)",
        r.host.computer_name.as_deref().unwrap_or("?"),
        r.host.system_name.as_deref().unwrap_or("?"),
        r.host.system_version.as_deref().unwrap_or(""),
        r.host.machine_arch,
        r.host.cpu_count,
        format_size(r.host.total_memory)
    );
    if let Some(vol) = &r.volume {
        println!(
            "Volume:      {} ({}, {} free of {})",
            vol.mount_point,
            vol.file_system,
            format_size(vol.available_space),
            format_size(vol.total_space)
        );
    }
    println!(
        "Archive:     {} -> {} (ratio {:.1})",
        format_size(stats.original_size),
        format_size(stats.compressed_size),
        stats.ratio()
    );
    println!("Errors:      {}", format_count(r.errors.len() as u64));
    if !r.user_note.is_empty() {
        println!("Note:");
        for line in r.user_note.lines() {
            println!("    {line}");
        }
    }

    if list_errors {
        for e in &r.errors {
            println!(
                "{:<22} {:<16} {}: {}",
                e.kind.label(),
                e.cause.label(),
                e.path,
                e.description
            );
        }
    }
    Ok(())
}

fn add_note(path: &Path, text: &str) -> Result<()> {
    let Archive {
        mut report,
        structure,
    } = archive::read_archive(path).with_context(|| format!("reading {}", path.display()))?;
    report.append_note(text);
    archive::write_archive(path, &structure, &report)
        .with_context(|| format!("writing {}", path.display()))?;
    info!(archive = %path.display(), "Note saved");
    Ok(())
}

/// Load the archive and run `f` on the directory selected by `--at`.
fn query_scope<F>(query: &QueryArgs, f: F) -> Result<()>
where
    F: FnOnce(&DirectoryNode) -> Result<()>,
{
    let archive = archive::read_archive(&query.archive)
        .with_context(|| format!("reading {}", query.archive.display()))?;
    let scope = match &query.at {
        Some(rel) => archive
            .structure
            .find_dir(rel)
            .ok_or_else(|| anyhow!("no directory {rel:?} in {}", query.archive.display()))?,
        None => &archive.structure,
    };
    debug!(scope = %scope.path, "Running query");
    f(scope)
}

fn export_csv<F>(query: &QueryArgs, write: F) -> Result<()>
where
    F: FnOnce(BufWriter<File>) -> treespider_core::Result<()>,
{
    let Some(path) = &query.csv else {
        return Ok(());
    };
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write(BufWriter::new(file)).with_context(|| format!("writing {}", path.display()))?;
    info!(csv = %path.display(), "Exported");
    Ok(())
}

fn print_nodes(nodes: &[&Node]) {
    for node in nodes {
        println!(
            "{:>10}  {:<9} {}",
            format_size(node.size()),
            node.kind_label(),
            node.path()
        );
    }
}

fn print_files(files: &[&FileNode]) {
    for file in files {
        println!(
            "{:>10}  {:<32} {}",
            format_size(file.size),
            file.content_type,
            file.path
        );
    }
}
