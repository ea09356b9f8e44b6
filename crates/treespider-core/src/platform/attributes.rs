/// Per-entry attribute flags and timestamps, read from `std::fs::Metadata`.
use crate::model::{Attribute, Timestamps};
use chrono::{DateTime, Utc};
use std::fs::Metadata;

/// Build the timestamp triple for an entry.
pub fn timestamps(meta: &Metadata) -> Timestamps {
    Timestamps {
        mtime: meta.modified().ok().map(DateTime::<Utc>::from),
        ctime: change_time(meta),
        atime: meta.accessed().ok().map(DateTime::<Utc>::from),
    }
}

/// Inode change time on Unix.
#[cfg(unix)]
fn change_time(meta: &Metadata) -> Option<DateTime<Utc>> {
    use std::os::unix::fs::MetadataExt;
    let nanos = u32::try_from(meta.ctime_nsec()).unwrap_or(0);
    DateTime::from_timestamp(meta.ctime(), nanos)
}

/// Creation time elsewhere.
#[cfg(not(unix))]
fn change_time(meta: &Metadata) -> Option<DateTime<Utc>> {
    meta.created().ok().map(DateTime::<Utc>::from)
}

#[cfg(windows)]
pub fn attributes(_name: &str, meta: &Metadata) -> Vec<Attribute> {
    use std::os::windows::fs::MetadataExt;

    const READONLY: u32 = 0x0001;
    const HIDDEN: u32 = 0x0002;
    const SYSTEM: u32 = 0x0004;
    const ARCHIVE: u32 = 0x0020;
    const COMPRESSED: u32 = 0x0800;
    const ENCRYPTED: u32 = 0x4000;

    let bits = meta.file_attributes();
    [
        (ARCHIVE, Attribute::Archive),
        (HIDDEN, Attribute::Hidden),
        (READONLY, Attribute::ReadOnly),
        (SYSTEM, Attribute::System),
        (COMPRESSED, Attribute::Compressed),
        (ENCRYPTED, Attribute::Encrypted),
    ]
    .into_iter()
    .filter(|(mask, _)| bits & mask != 0)
    .map(|(_, attr)| attr)
    .collect()
}

#[cfg(unix)]
pub fn attributes(name: &str, meta: &Metadata) -> Vec<Attribute> {
    use std::os::unix::fs::PermissionsExt;

    let mut attrs = Vec::new();
    if name.starts_with('.') {
        attrs.push(Attribute::Hidden);
    }
    if meta.permissions().readonly() {
        attrs.push(Attribute::ReadOnly);
    }
    if meta.is_file() && meta.permissions().mode() & 0o111 != 0 {
        attrs.push(Attribute::Executable);
    }
    attrs
}

#[cfg(not(any(unix, windows)))]
pub fn attributes(_name: &str, meta: &Metadata) -> Vec<Attribute> {
    if meta.permissions().readonly() {
        vec![Attribute::ReadOnly]
    } else {
        Vec::new()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    #[test]
    fn dotfiles_are_hidden_and_mode_bits_are_read() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(".env");
        fs::write(&path, b"x").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o555)).unwrap();

        let meta = fs::symlink_metadata(&path).unwrap();
        let attrs = attributes(".env", &meta);
        assert!(attrs.contains(&Attribute::Hidden));
        assert!(attrs.contains(&Attribute::ReadOnly));
        assert!(attrs.contains(&Attribute::Executable));
    }

    #[test]
    fn timestamps_are_populated() {
        let tmp = TempDir::new().unwrap();
        let meta = fs::metadata(tmp.path()).unwrap();
        let times = timestamps(&meta);
        assert!(times.mtime.is_some());
        assert!(times.ctime.is_some());
    }
}
