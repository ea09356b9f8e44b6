/// Extension-based MIME guessing: the cheap first tier of classification.
use std::path::Path;

/// Guess a MIME type from the file extension. `None` if the extension is unknown.
///
/// Zero-heap-allocation hot path: extensions are lowercased into a fixed-size
/// stack buffer. Extensions longer than 16 bytes are never known.
pub fn guess_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?;
    let bytes = ext.as_bytes();
    if bytes.is_empty() || bytes.len() > 16 {
        return None;
    }
    let mut lower = [0u8; 16];
    for (dest, &src) in lower.iter_mut().zip(bytes) {
        *dest = src.to_ascii_lowercase();
    }
    let ext = std::str::from_utf8(&lower[..bytes.len()]).ok()?;

    let mime = match ext {
        // Text and documents
        "txt" | "text" | "log" | "conf" | "cfg" | "ini" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "csv" => "text/csv",
        "tsv" => "text/tab-separated-values",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "xml" => "application/xml",
        "json" => "application/json",
        "yaml" | "yml" => "application/yaml",
        "toml" => "application/toml",
        "rtf" => "application/rtf",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "odt" => "application/vnd.oasis.opendocument.text",
        "epub" => "application/epub+zip",
        // Code
        "rs" => "text/x-rust",
        "py" => "text/x-python",
        "js" | "mjs" => "text/javascript",
        "ts" => "application/typescript",
        "c" | "h" => "text/x-c",
        "cpp" | "cc" | "hpp" => "text/x-c++",
        "java" => "text/x-java",
        "go" => "text/x-go",
        "sh" => "application/x-sh",
        "bat" => "application/x-msdownload",
        "ps1" => "text/x-powershell",
        "sql" => "application/sql",
        // Images
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "ico" => "image/vnd.microsoft.icon",
        "tif" | "tiff" => "image/tiff",
        "heic" => "image/heic",
        "psd" => "image/vnd.adobe.photoshop",
        // Audio / video
        "mp3" => "audio/mpeg",
        "wav" => "audio/x-wav",
        "flac" => "audio/flac",
        "ogg" => "audio/ogg",
        "m4a" => "audio/mp4",
        "aac" => "audio/aac",
        "opus" => "audio/opus",
        "mp4" | "m4v" => "video/mp4",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "wmv" => "video/x-ms-wmv",
        "mpg" | "mpeg" => "video/mpeg",
        // Archives
        "zip" => "application/zip",
        "gz" | "tgz" => "application/gzip",
        "bz2" => "application/x-bzip2",
        "xz" => "application/x-xz",
        "zst" => "application/zstd",
        "7z" => "application/x-7z-compressed",
        "rar" => "application/vnd.rar",
        "tar" => "application/x-tar",
        "iso" => "application/x-iso9660-image",
        "dmg" => "application/x-apple-diskimage",
        "jar" => "application/java-archive",
        // Executables and binaries
        "exe" | "dll" | "msi" => "application/x-msdownload",
        "so" => "application/x-sharedlib",
        "wasm" => "application/wasm",
        "class" => "application/java-vm",
        "bin" | "dat" => "application/octet-stream",
        "sqlite" | "db" => "application/vnd.sqlite3",
        // Fonts
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => return None,
    };
    Some(mime)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions_are_case_insensitive() {
        assert_eq!(guess_mime(Path::new("a/photo.JPG")), Some("image/jpeg"));
        assert_eq!(guess_mime(Path::new("lib.rs")), Some("text/x-rust"));
        assert_eq!(guess_mime(Path::new("x.tar.gz")), Some("application/gzip"));
    }

    #[test]
    fn unknown_or_missing_extensions() {
        assert_eq!(guess_mime(Path::new("README")), None);
        assert_eq!(guess_mime(Path::new(".bashrc")), None);
        assert_eq!(guess_mime(Path::new("data.qwertyuiopasdfghjkl")), None);
        assert_eq!(guess_mime(Path::new("thing.xyz")), None);
    }
}
