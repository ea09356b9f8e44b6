/// Archive persistence: the scanned tree and its report as one
/// zstd-compressed JSON document.
///
/// Layout: `{"version": 1, "report": {..}, "structure": {..}}`.
///
/// Writing streams the JSON straight through the compressor into a temp
/// file next to the destination, then renames it into place, so the
/// serialised text is never held in memory and a failed write never leaves
/// a truncated archive behind. Reading decompresses into one buffer and
/// parses it once; the whole tree has to be resident afterwards anyway.
///
/// Encoding and decoding recurse once per directory level, so both run on a
/// dedicated thread with a large stack instead of the caller's.
use crate::error::{Result, SpiderError};
use crate::model::{DirectoryNode, Report};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::{panic, thread};
use tracing::{debug, info};

/// Format version written into every archive.
pub const ARCHIVE_VERSION: u32 = 1;

/// zstd level used for writing. Archives are written once and read many
/// times, so ratio wins over speed.
pub const COMPRESSION_LEVEL: i32 = 19;

/// Buffer between the JSON serialiser and the compressor.
const WRITE_CHUNK: usize = 64 * 1024;
/// Decompression read size.
const READ_CHUNK: usize = 1024 * 1024;
/// Stack for the encode/decode thread. Decoding buffers each internally
/// tagged node before dispatching on its `type`, which costs several frames
/// per tree level.
const CODEC_STACK_SIZE: usize = 128 * 1024 * 1024;

/// A decoded archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Archive {
    pub report: Report,
    pub structure: DirectoryNode,
}

/// Sizes observed while writing or reading an archive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveStats {
    /// Uncompressed JSON bytes.
    pub original_size: u64,
    /// Bytes on disk.
    pub compressed_size: u64,
}

impl ArchiveStats {
    /// Compressed size as a fraction of the original (lower is better).
    pub fn ratio(&self) -> f64 {
        if self.original_size == 0 {
            0.0
        } else {
            self.compressed_size as f64 / self.original_size as f64
        }
    }
}

#[derive(Serialize)]
struct ArchiveRef<'a> {
    version: u32,
    report: &'a Report,
    structure: &'a DirectoryNode,
}

#[derive(Deserialize)]
struct ArchiveDoc {
    version: u32,
    report: Report,
    structure: DirectoryNode,
}

/// Just the version field; everything else is skipped.
#[derive(Deserialize)]
struct ArchiveHeader {
    version: u32,
}

/// Counts the bytes that pass through to `inner`.
struct CountingWriter<W> {
    inner: W,
    count: u64,
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Write `root` and `report` to `dest`, replacing any existing file.
pub fn write_archive(dest: &Path, root: &DirectoryNode, report: &Report) -> Result<ArchiveStats> {
    let write_err = |source: io::Error| SpiderError::ArchiveWrite {
        path: dest.to_path_buf(),
        source,
    };

    let tmp = temp_path(dest).ok_or_else(|| {
        write_err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "archive path has no file name",
        ))
    })?;

    let streamed = on_codec_stack("treespider-archive-write", || stream_to(&tmp, root, report))
        .map_err(StreamError::Io)
        .and_then(|r| r);
    let original_size = match streamed {
        Ok(n) => n,
        Err(err) => {
            let _ = fs::remove_file(&tmp);
            return Err(match err {
                StreamError::Io(source) => write_err(source),
                StreamError::Json(source) => SpiderError::ArchiveFormat {
                    path: dest.to_path_buf(),
                    source,
                },
            });
        }
    };

    if let Err(source) = fs::rename(&tmp, dest) {
        let _ = fs::remove_file(&tmp);
        return Err(write_err(source));
    }
    let compressed_size = fs::metadata(dest).map_err(write_err)?.len();

    let stats = ArchiveStats {
        original_size,
        compressed_size,
    };
    info!(
        path = %dest.display(),
        original = stats.original_size,
        compressed = stats.compressed_size,
        "Archive written"
    );
    Ok(stats)
}

/// Sibling temp file in the destination's directory, so the final rename
/// never crosses filesystems.
fn temp_path(dest: &Path) -> Option<PathBuf> {
    let name = dest.file_name()?.to_string_lossy();
    Some(dest.with_file_name(format!(".{name}.{}.tmp", std::process::id())))
}

enum StreamError {
    Io(io::Error),
    Json(serde_json::Error),
}

impl From<io::Error> for StreamError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

/// JSON → 64 KiB buffer → zstd → `path`. Returns the uncompressed size.
fn stream_to(
    path: &Path,
    root: &DirectoryNode,
    report: &Report,
) -> std::result::Result<u64, StreamError> {
    let file = File::create(path)?;
    let encoder = zstd::Encoder::new(file, COMPRESSION_LEVEL)?;
    let mut out = CountingWriter {
        inner: BufWriter::with_capacity(WRITE_CHUNK, encoder),
        count: 0,
    };

    let doc = ArchiveRef {
        version: ARCHIVE_VERSION,
        report,
        structure: root,
    };
    serde_json::to_writer(&mut out, &doc).map_err(|err| {
        if err.is_io() {
            StreamError::Io(err.into())
        } else {
            StreamError::Json(err)
        }
    })?;

    let CountingWriter { inner, count } = out;
    let encoder = inner.into_inner().map_err(|err| err.into_error())?;
    let file = encoder.finish()?;
    file.sync_all()?;
    Ok(count)
}

/// Read an archive written by [`write_archive`].
pub fn read_archive(src: &Path) -> Result<Archive> {
    read_archive_with_stats(src).map(|(archive, _)| archive)
}

/// Read an archive and report its compressed and uncompressed sizes.
pub fn read_archive_with_stats(src: &Path) -> Result<(Archive, ArchiveStats)> {
    let read_err = |source: io::Error| SpiderError::ArchiveRead {
        path: src.to_path_buf(),
        source,
    };

    let file = File::open(src).map_err(read_err)?;
    let compressed_size = file.metadata().map_err(read_err)?.len();
    let json = decompress(file).map_err(read_err)?;
    debug!(path = %src.display(), bytes = json.len(), "Archive decompressed");

    let decoded = on_codec_stack("treespider-archive-read", || decode(&json)).map_err(read_err)?;
    let doc = match decoded {
        Ok(doc) => doc,
        Err(DecodeError { source, version }) => {
            // A document from another format version may not fit the
            // current schema; report the version rather than the field.
            if let Some(found) = version {
                check_version(found)?;
            }
            return Err(SpiderError::ArchiveFormat {
                path: src.to_path_buf(),
                source,
            });
        }
    };
    check_version(doc.version)?;

    let stats = ArchiveStats {
        original_size: json.len() as u64,
        compressed_size,
    };
    info!(
        path = %src.display(),
        files = doc.report.scanned_files,
        "Archive loaded"
    );
    Ok((
        Archive {
            report: doc.report,
            structure: doc.structure,
        },
        stats,
    ))
}

fn decompress(file: File) -> io::Result<Vec<u8>> {
    let mut decoder = zstd::Decoder::new(file)?;
    let mut json = Vec::new();
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        match decoder.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => json.extend_from_slice(&chunk[..n]),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(json)
}

struct DecodeError {
    source: serde_json::Error,
    /// Version field, if at least the header parsed.
    version: Option<u32>,
}

fn decode(json: &[u8]) -> std::result::Result<ArchiveDoc, DecodeError> {
    parse::<ArchiveDoc>(json).map_err(|source| DecodeError {
        source,
        version: parse::<ArchiveHeader>(json).ok().map(|h| h.version),
    })
}

/// Run `f` on a scoped thread with [`CODEC_STACK_SIZE`] of stack.
/// A panic inside `f` is resumed on the calling thread.
fn on_codec_stack<T, F>(name: &str, f: F) -> io::Result<T>
where
    T: Send,
    F: FnOnce() -> T + Send,
{
    thread::scope(|scope| {
        let handle = thread::Builder::new()
            .name(name.to_string())
            .stack_size(CODEC_STACK_SIZE)
            .spawn_scoped(scope, f)?;
        Ok(handle
            .join()
            .unwrap_or_else(|payload| panic::resume_unwind(payload)))
    })
}

/// Parse without serde_json's nesting limit: directory trees can be deeper
/// than its default of 128 levels.
fn parse<T: DeserializeOwned>(json: &[u8]) -> serde_json::Result<T> {
    let mut de = serde_json::Deserializer::from_slice(json);
    de.disable_recursion_limit();
    let value = T::deserialize(&mut de)?;
    de.end()?;
    Ok(value)
}

fn check_version(found: u32) -> Result<()> {
    if found == ARCHIVE_VERSION {
        Ok(())
    } else {
        Err(SpiderError::ArchiveVersion {
            expected: ARCHIVE_VERSION,
            found,
        })
    }
}
