/// Content-type frequency: how many files of each extension or MIME type a
/// subtree holds, and how much space they take.
use crate::error::SpiderError;
use crate::model::size::percent;
use crate::model::{DirectoryNode, FileNode, Node};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

/// Bucket key used for files without an extension.
pub const NO_EXTENSION: &str = "(none)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    /// Lower-cased extension including the dot, e.g. `.jpg`.
    Extension,
    MimeType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeSort {
    /// Alphabetical by key.
    Name,
    /// Most files first.
    Frequency,
    /// Most bytes first.
    Size,
}

impl FromStr for GroupBy {
    type Err = SpiderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ext" | "extension" => Ok(Self::Extension),
            "mime" | "type" | "mimetype" => Ok(Self::MimeType),
            other => Err(SpiderError::InvalidQuery(format!(
                "unknown grouping {other:?} (expected ext or mime)"
            ))),
        }
    }
}

impl FromStr for TypeSort {
    type Err = SpiderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "freq" | "frequency" | "count" => Ok(Self::Frequency),
            "size" => Ok(Self::Size),
            other => Err(SpiderError::InvalidQuery(format!(
                "unknown sort key {other:?} (expected name, freq or size)"
            ))),
        }
    }
}

/// Totals for one extension or MIME type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeStats {
    pub key: String,
    pub count: u64,
    pub total_size: u64,
    /// Percentage of the subtree's file count.
    pub count_share: f64,
    /// Percentage of the subtree's file bytes.
    pub size_share: f64,
}

fn bucket_key(file: &FileNode, group_by: GroupBy) -> String {
    match group_by {
        GroupBy::Extension => match Path::new(file.name.as_str()).extension() {
            Some(ext) => format!(".{}", ext.to_string_lossy().to_lowercase()),
            None => NO_EXTENSION.to_string(),
        },
        GroupBy::MimeType => file.content_type.clone(),
    }
}

/// Bucket every file below `dir` and compute each bucket's share.
pub fn common_types(dir: &DirectoryNode, sort: TypeSort, group_by: GroupBy) -> Vec<TypeStats> {
    let mut buckets: HashMap<String, (u64, u64)> = HashMap::new();
    let mut total_files = 0u64;
    let mut total_size = 0u64;

    for file in dir.descendants().filter_map(Node::as_file) {
        let entry = buckets.entry(bucket_key(file, group_by)).or_default();
        entry.0 += 1;
        entry.1 += file.size;
        total_files += 1;
        total_size += file.size;
    }

    let mut stats: Vec<TypeStats> = buckets
        .into_iter()
        .map(|(key, (count, size))| TypeStats {
            key,
            count,
            total_size: size,
            count_share: percent(count, total_files),
            size_share: percent(size, total_size),
        })
        .collect();

    // Ties fall back to the key so the order never depends on hashing.
    match sort {
        TypeSort::Name => stats.sort_by(|a, b| a.key.cmp(&b.key)),
        TypeSort::Frequency => {
            stats.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)))
        }
        TypeSort::Size => stats.sort_by(|a, b| {
            b.total_size
                .cmp(&a.total_size)
                .then_with(|| a.key.cmp(&b.key))
        }),
    }
    stats
}
