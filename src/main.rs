//! TreeSpider: directory-tree snapshots you can query later.
//!
//! Thin binary entry point. All logic lives in the `treespider-core` crate;
//! this file only parses arguments and dispatches to [`commands`].

mod commands;

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use treespider_core::analysis::{GroupBy, TopMode, TypeSort};
use treespider_core::classify::DeepEngine;
use treespider_core::model::size::parse_size;
use treespider_core::model::TimeField;

#[derive(Debug, Parser)]
#[command(
    name = "treespider",
    version,
    about = "Snapshot a directory tree into a compressed archive and query it",
    arg_required_else_help = true
)]
struct Cli {
    /// TOML config file with scan defaults and garbage rules.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// More log output (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Scan a directory and write the archive.
    Scan(ScanArgs),
    /// Show the report stored in an archive.
    Info {
        archive: PathBuf,
        /// List every recovered error.
        #[arg(long)]
        errors: bool,
    },
    /// Append a line to the archive's user note.
    Note { archive: PathBuf, text: String },
    /// Largest files or folders.
    Largest {
        #[command(flatten)]
        query: QueryArgs,
        #[arg(short, default_value_t = 20)]
        n: usize,
        /// files | folders
        #[arg(long, default_value = "files")]
        mode: TopMode,
    },
    /// Most recently modified, changed or accessed files.
    Recent {
        #[command(flatten)]
        query: QueryArgs,
        #[arg(short, default_value_t = 20)]
        n: usize,
        /// mtime | ctime | atime
        #[arg(long, default_value = "mtime")]
        field: TimeField,
    },
    /// Files sharing a name and a size.
    Duplicates {
        #[command(flatten)]
        query: QueryArgs,
        /// Group by (name, size) with reclaimable space.
        #[arg(long)]
        grouped: bool,
    },
    /// Directories with no entries at all.
    Empty {
        #[command(flatten)]
        query: QueryArgs,
    },
    /// Case-insensitive name search.
    Search {
        #[command(flatten)]
        query: QueryArgs,
        pattern: String,
        /// Treat the pattern as a regular expression.
        #[arg(long)]
        regex: bool,
    },
    /// Frequency and size per extension or MIME type.
    Types {
        #[command(flatten)]
        query: QueryArgs,
        /// name | freq | size
        #[arg(long, default_value = "freq")]
        sort: TypeSort,
        /// ext | mime
        #[arg(long, default_value = "ext")]
        by: GroupBy,
        /// Show only the first N rows.
        #[arg(long)]
        top: Option<usize>,
    },
    /// Temp files, logs, backups and other likely junk.
    Garbage {
        #[command(flatten)]
        query: QueryArgs,
    },
}

#[derive(Debug, Args)]
struct ScanArgs {
    /// Directory to scan.
    root: PathBuf,
    /// Archive to write.
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,
    /// Deep-classification size limit, e.g. 512k or 10Mi.
    #[arg(long, value_parser = parse_size)]
    threshold: Option<u64>,
    /// Deep-classify every non-empty file.
    #[arg(long)]
    force_deep: bool,
    /// none | signature | auto
    #[arg(long)]
    engine: Option<DeepEngine>,
    /// Scan subdirectories in parallel.
    #[arg(short, long)]
    parallel: bool,
    /// Worker threads for a parallel scan.
    #[arg(short, long, requires = "parallel")]
    workers: Option<usize>,
    /// Do not record attribute flags.
    #[arg(long)]
    skip_attributes: bool,
    /// Free-text note stored in the report.
    #[arg(long)]
    note: Option<String>,
}

#[derive(Debug, Args)]
struct QueryArgs {
    /// Archive written by `treespider scan`.
    archive: PathBuf,
    /// Limit the query to this directory, relative to the scan root.
    #[arg(long, value_name = "DIR")]
    at: Option<String>,
    /// Also write the results to a CSV file.
    #[arg(long, value_name = "FILE")]
    csv: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    commands::run(cli)
}
