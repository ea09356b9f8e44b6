/// Top-N selection: the N largest or most recent nodes of a subtree.
///
/// Uses a bounded min-heap of size N rather than sorting every candidate,
/// so memory stays O(N) however large the tree is.
use crate::error::SpiderError;
use crate::model::{DirectoryNode, Node, TimeField};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::str::FromStr;

/// Which node kind a size ranking considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopMode {
    Files,
    Folders,
}

impl FromStr for TopMode {
    type Err = SpiderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "files" | "file" | "f" => Ok(Self::Files),
            "folders" | "folder" | "dirs" | "d" => Ok(Self::Folders),
            other => Err(SpiderError::InvalidQuery(format!(
                "unknown ranking mode {other:?} (expected files or folders)"
            ))),
        }
    }
}

impl FromStr for TimeField {
    type Err = SpiderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mtime" | "modified" | "m" => Ok(Self::Modified),
            "ctime" | "changed" | "created" | "c" => Ok(Self::Changed),
            "atime" | "accessed" | "a" => Ok(Self::Accessed),
            other => Err(SpiderError::InvalidQuery(format!(
                "unknown time field {other:?} (expected mtime, ctime or atime)"
            ))),
        }
    }
}

/// Heap entry ordered by `(key, path, seq)`.
///
/// `seq` is the traversal position, so two entries never compare equal and
/// the result is deterministic for a given tree.
struct Ranked<'a, K> {
    key: K,
    path: &'a str,
    seq: usize,
    node: &'a Node,
}

impl<K: Ord> Ord for Ranked<'_, K> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .cmp(&other.key)
            .then_with(|| self.path.cmp(other.path))
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl<K: Ord> PartialOrd for Ranked<'_, K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: Ord> PartialEq for Ranked<'_, K> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<K: Ord> Eq for Ranked<'_, K> {}

/// Keep the `n` greatest candidates, returned in descending key order.
fn select_top<'a, K, I>(candidates: I, n: usize) -> Vec<&'a Node>
where
    K: Ord,
    I: Iterator<Item = (K, &'a Node)>,
{
    if n == 0 {
        return Vec::new();
    }
    let mut heap = BinaryHeap::with_capacity(n + 1);
    for (seq, (key, node)) in candidates.enumerate() {
        heap.push(Reverse(Ranked {
            key,
            path: node.path(),
            seq,
            node,
        }));
        if heap.len() > n {
            heap.pop();
        }
    }
    // Ascending in `Reverse` is descending in the key.
    heap.into_sorted_vec()
        .into_iter()
        .map(|Reverse(ranked)| ranked.node)
        .collect()
}

/// The `n` largest files or folders below `dir`, largest first.
pub fn top_largest(dir: &DirectoryNode, n: usize, mode: TopMode) -> Vec<&Node> {
    let candidates = dir
        .descendants()
        .filter(move |node| match mode {
            TopMode::Files => matches!(node, Node::File(_)),
            TopMode::Folders => node.is_dir(),
        })
        .map(|node| (node.size(), node));
    select_top(candidates, n)
}

/// The `n` most recent files and links below `dir` by `field`, newest first.
///
/// Entries without that timestamp (failed stats) are not eligible.
pub fn top_recent(dir: &DirectoryNode, n: usize, field: TimeField) -> Vec<&Node> {
    let candidates = dir
        .descendants()
        .filter(|node| !node.is_dir())
        .filter_map(|node| node.times().get(field).map(|t| (t, node)));
    select_top(candidates, n)
}
