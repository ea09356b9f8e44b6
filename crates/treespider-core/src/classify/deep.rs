/// Deep content classification: byte-signature sniffing of a file prefix.
///
/// Engines implement [`DeepClassifier`]. The classifier only ever talks to
/// the trait; which engine backs it is decided once at startup via
/// [`DeepEngine::select`].
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;

/// Maximum number of bytes read from a file for sniffing.
pub const SNIFF_LEN: usize = 8 * 1024;

pub trait DeepClassifier: Send + Sync {
    /// Engine name recorded in the report.
    fn name(&self) -> &'static str;

    /// Whether the engine can run in this environment.
    fn is_available(&self) -> bool {
        true
    }

    /// Identify the content type of `path`.
    ///
    /// `Ok(None)` means the engine has no opinion and the caller should keep
    /// its extension guess. An `Err` is a failed attempt (e.g. unreadable file).
    fn identify(&self, path: &Path) -> io::Result<Option<String>>;
}

/// Extension-only fallback: never inspects content.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDeepClassifier;

impl DeepClassifier for NoDeepClassifier {
    fn name(&self) -> &'static str {
        "none"
    }

    fn identify(&self, _path: &Path) -> io::Result<Option<String>> {
        Ok(None)
    }
}

/// Built-in magic-number sniffer with a UTF-8 text heuristic.
#[derive(Debug, Default, Clone, Copy)]
pub struct SignatureSniffer;

impl DeepClassifier for SignatureSniffer {
    fn name(&self) -> &'static str {
        "signature"
    }

    fn identify(&self, path: &Path) -> io::Result<Option<String>> {
        let mut buf = Vec::with_capacity(SNIFF_LEN);
        File::open(path)?
            .take(SNIFF_LEN as u64)
            .read_to_end(&mut buf)?;
        Ok(Some(sniff(&buf).to_string()))
    }
}

/// Which deep engine to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeepEngine {
    /// Extension guesses only.
    None,
    /// The built-in signature sniffer.
    Signature,
    /// Richest engine available at runtime.
    #[default]
    Auto,
}

impl DeepEngine {
    /// Instantiate the engine, falling back to extension-only when the
    /// requested one is unavailable.
    pub fn select(self) -> Box<dyn DeepClassifier> {
        let candidates: Vec<Box<dyn DeepClassifier>> = match self {
            Self::None => Vec::new(),
            Self::Signature | Self::Auto => vec![Box::new(SignatureSniffer)],
        };
        for engine in candidates {
            if engine.is_available() {
                return engine;
            }
            tracing::warn!(engine = engine.name(), "Deep engine unavailable");
        }
        Box::new(NoDeepClassifier)
    }
}

impl FromStr for DeepEngine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(Self::None),
            "signature" | "magic" => Ok(Self::Signature),
            "auto" => Ok(Self::Auto),
            other => Err(format!("unknown deep engine {other:?}")),
        }
    }
}

/// Classify a byte prefix by signature.
pub fn sniff(bytes: &[u8]) -> &'static str {
    const SIGNATURES: &[(&[u8], &str)] = &[
        (b"\x89PNG\r\n\x1a\n", "image/png"),
        (b"\xFF\xD8\xFF", "image/jpeg"),
        (b"GIF87a", "image/gif"),
        (b"GIF89a", "image/gif"),
        (b"II*\x00", "image/tiff"),
        (b"MM\x00*", "image/tiff"),
        (b"\x00\x00\x01\x00", "image/vnd.microsoft.icon"),
        (b"%PDF-", "application/pdf"),
        (b"PK\x03\x04", "application/zip"),
        (b"PK\x05\x06", "application/zip"),
        (b"\x1F\x8B", "application/gzip"),
        (b"BZh", "application/x-bzip2"),
        (b"\xFD7zXZ\x00", "application/x-xz"),
        (b"\x28\xB5\x2F\xFD", "application/zstd"),
        (b"7z\xBC\xAF\x27\x1C", "application/x-7z-compressed"),
        (b"Rar!\x1A\x07", "application/vnd.rar"),
        (b"\x7FELF", "application/x-executable"),
        (b"\xFE\xED\xFA\xCE", "application/x-mach-binary"),
        (b"\xFE\xED\xFA\xCF", "application/x-mach-binary"),
        (b"\xCE\xFA\xED\xFE", "application/x-mach-binary"),
        (b"\xCF\xFA\xED\xFE", "application/x-mach-binary"),
        (b"\xCA\xFE\xBA\xBE", "application/java-vm"),
        (b"\x00asm", "application/wasm"),
        (b"SQLite format 3\x00", "application/vnd.sqlite3"),
        (b"ID3", "audio/mpeg"),
        (b"OggS", "audio/ogg"),
        (b"fLaC", "audio/flac"),
        (b"\x1A\x45\xDF\xA3", "video/x-matroska"),
        (b"MZ", "application/x-msdownload"),
        (b"#!", "text/x-shellscript"),
    ];

    if bytes.is_empty() {
        return "application/x-empty";
    }
    if let Some((_, mime)) = SIGNATURES.iter().find(|(sig, _)| bytes.starts_with(sig)) {
        return mime;
    }
    if bytes.len() >= 12 && &bytes[..4] == b"RIFF" {
        match &bytes[8..12] {
            b"WAVE" => return "audio/x-wav",
            b"AVI " => return "video/x-msvideo",
            b"WEBP" => return "image/webp",
            _ => {}
        }
    }
    if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
        return "video/mp4";
    }
    if bytes.len() >= 14 && bytes.starts_with(b"BM") && bytes[6..10] == [0, 0, 0, 0] {
        return "image/bmp";
    }
    if bytes.len() >= 262 && &bytes[257..262] == b"ustar" {
        return "application/x-tar";
    }
    if looks_like_text(bytes) {
        return text_subtype(bytes);
    }
    "application/octet-stream"
}

/// No NUL bytes and valid UTF-8, tolerating a multi-byte sequence cut off by
/// the prefix limit.
fn looks_like_text(bytes: &[u8]) -> bool {
    if bytes.contains(&0) {
        return false;
    }
    match std::str::from_utf8(bytes) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none(),
    }
}

fn text_subtype(bytes: &[u8]) -> &'static str {
    let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let start = body
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(body.len());
    let head: Vec<u8> = body[start..]
        .iter()
        .take(16)
        .map(u8::to_ascii_lowercase)
        .collect();
    if head.starts_with(b"<?xml") {
        "application/xml"
    } else if head.starts_with(b"<!doctype html") || head.starts_with(b"<html") {
        "text/html"
    } else {
        "text/plain"
    }
}
