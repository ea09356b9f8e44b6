/// The scanned tree: a recursive tagged union of files, directories and links.
///
/// Unlike an arena, every directory owns its children directly. The scanner
/// builds each subtree on whichever worker scanned it and hands it back up to
/// the parent by value, so no cross-thread index bookkeeping is needed, and
/// the whole tree serialises as one nested document.
use crate::error::FailureCause;
use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// A filesystem attribute flag recorded for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Attribute {
    Archive,
    Hidden,
    ReadOnly,
    System,
    Compressed,
    Encrypted,
    Executable,
}

impl Attribute {
    pub fn label(self) -> &'static str {
        match self {
            Self::Archive => "Archive",
            Self::Hidden => "Hidden",
            Self::ReadOnly => "Read-only",
            Self::System => "System",
            Self::Compressed => "Compressed",
            Self::Encrypted => "Encrypted",
            Self::Executable => "Executable",
        }
    }
}

/// Modification, change and access times. `None` when the entry could not be stat'ed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    pub mtime: Option<DateTime<Utc>>,
    pub ctime: Option<DateTime<Utc>>,
    pub atime: Option<DateTime<Utc>>,
}

/// Which timestamp a recency query sorts by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeField {
    Modified,
    Changed,
    Accessed,
}

impl Timestamps {
    #[inline]
    pub fn get(&self, field: TimeField) -> Option<DateTime<Utc>> {
        match field {
            TimeField::Modified => self.mtime,
            TimeField::Changed => self.ctime,
            TimeField::Accessed => self.atime,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileNode {
    pub name: CompactString,
    pub path: String,
    /// MIME type, or the failure cause label for a stat-failure placeholder.
    pub content_type: String,
    pub size: u64,
    /// `None` when attribute collection was switched off for the scan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Vec<Attribute>>,
    pub times: Timestamps,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryNode {
    pub name: CompactString,
    pub path: String,
    /// Sum of every descendant file size.
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Vec<Attribute>>,
    pub times: Timestamps,
    /// Number of descendant files (placeholders included).
    pub file_count: u64,
    /// Number of descendant directories (placeholders included).
    pub dir_count: u64,
    /// Set when this directory could not be enumerated. Such a node has no children.
    pub access_denied: Option<FailureCause>,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkNode {
    pub name: CompactString,
    pub path: String,
    /// Link target as stored in the link, not resolved. Empty if unreadable.
    pub target: String,
    /// Always zero; links never contribute to directory sizes.
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Vec<Attribute>>,
    pub times: Timestamps,
}

/// One entry in the scanned tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    File(FileNode),
    Directory(DirectoryNode),
    Link(LinkNode),
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Self::File(f) => f.name.as_str(),
            Self::Directory(d) => d.name.as_str(),
            Self::Link(l) => l.name.as_str(),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Self::File(f) => &f.path,
            Self::Directory(d) => &d.path,
            Self::Link(l) => &l.path,
        }
    }

    pub fn size(&self) -> u64 {
        match self {
            Self::File(f) => f.size,
            Self::Directory(d) => d.size,
            Self::Link(l) => l.size,
        }
    }

    pub fn times(&self) -> &Timestamps {
        match self {
            Self::File(f) => &f.times,
            Self::Directory(d) => &d.times,
            Self::Link(l) => &l.times,
        }
    }

    pub fn attrs(&self) -> Option<&[Attribute]> {
        match self {
            Self::File(f) => f.attrs.as_deref(),
            Self::Directory(d) => d.attrs.as_deref(),
            Self::Link(l) => l.attrs.as_deref(),
        }
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Directory(_))
    }

    pub fn as_dir(&self) -> Option<&DirectoryNode> {
        match self {
            Self::Directory(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileNode> {
        match self {
            Self::File(f) => Some(f),
            _ => None,
        }
    }

    /// Short type label for listings.
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Directory(_) => "folder",
            Self::Link(_) => "symlink",
        }
    }
}

impl DirectoryNode {
    /// An empty, not-yet-aggregated directory.
    pub fn new(name: CompactString, path: String) -> Self {
        Self {
            name,
            path,
            size: 0,
            attrs: None,
            times: Timestamps::default(),
            file_count: 0,
            dir_count: 0,
            access_denied: None,
            children: Vec::new(),
        }
    }

    /// A zero-aggregate placeholder for a directory that could not be scanned.
    pub fn placeholder(
        name: CompactString,
        path: String,
        times: Timestamps,
        attrs: Option<Vec<Attribute>>,
        cause: FailureCause,
    ) -> Self {
        Self {
            attrs,
            times,
            access_denied: Some(cause),
            ..Self::new(name, path)
        }
    }

    #[inline]
    pub fn is_placeholder(&self) -> bool {
        self.access_denied.is_some()
    }

    /// Pre-order iterator over every node below this directory (itself excluded).
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: vec![self.children.iter()],
        }
    }

    /// Look up a descendant directory by a `/`- or `\`-separated relative path.
    ///
    /// An empty path (or `.`) returns `self`.
    pub fn find_dir(&self, relative: &str) -> Option<&DirectoryNode> {
        let mut current = self;
        for segment in relative
            .split(['/', '\\'])
            .filter(|s| !s.is_empty() && *s != ".")
        {
            current = current
                .children
                .iter()
                .filter_map(Node::as_dir)
                .find(|d| d.name == segment)?;
        }
        Some(current)
    }

    /// Sort every `children` list in the subtree by name.
    ///
    /// Scan order is enumeration order; this gives a canonical order for
    /// display or for comparing two scans of the same tree.
    pub fn sort_by_name(&mut self) {
        self.children
            .sort_by(|a, b| a.name().cmp(b.name()).then(a.path().cmp(b.path())));
        for child in &mut self.children {
            if let Node::Directory(dir) = child {
                dir.sort_by_name();
            }
        }
    }
}

/// Depth-first, pre-order walk driven by an explicit stack (no recursion).
pub struct Descendants<'a> {
    stack: Vec<std::slice::Iter<'a, Node>>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<&'a Node> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                Some(node) => {
                    if let Node::Directory(dir) = node {
                        self.stack.push(dir.children.iter());
                    }
                    return Some(node);
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, parent: &str, size: u64) -> Node {
        Node::File(FileNode {
            name: CompactString::new(name),
            path: format!("{parent}/{name}"),
            content_type: "text/plain".into(),
            size,
            attrs: None,
            times: Timestamps::default(),
        })
    }

    fn sample() -> DirectoryNode {
        let mut docs = DirectoryNode::new("docs".into(), "/r/docs".into());
        docs.children.push(file("b.txt", "/r/docs", 2));
        docs.children.push(file("a.txt", "/r/docs", 1));

        let mut root = DirectoryNode::new("r".into(), "/r".into());
        root.children.push(file("z.bin", "/r", 9));
        root.children.push(Node::Directory(docs));
        root
    }

    #[test]
    fn descendants_is_preorder() {
        let root = sample();
        let names: Vec<&str> = root.descendants().map(Node::name).collect();
        assert_eq!(names, ["z.bin", "docs", "b.txt", "a.txt"]);
    }

    #[test]
    fn find_dir_walks_relative_segments() {
        let root = sample();
        assert_eq!(root.find_dir("").map(|d| d.name.as_str()), Some("r"));
        assert_eq!(root.find_dir("docs/").map(|d| d.name.as_str()), Some("docs"));
        assert!(root.find_dir("missing").is_none());
        // Files are not directories.
        assert!(root.find_dir("z.bin").is_none());
    }

    #[test]
    fn sort_by_name_is_recursive() {
        let mut root = sample();
        root.sort_by_name();
        let names: Vec<&str> = root.descendants().map(Node::name).collect();
        assert_eq!(names, ["docs", "a.txt", "b.txt", "z.bin"]);
    }

    #[test]
    fn placeholder_has_zero_aggregates() {
        let p = DirectoryNode::placeholder(
            "locked".into(),
            "/r/locked".into(),
            Timestamps::default(),
            None,
            FailureCause::PermissionDenied,
        );
        assert!(p.is_placeholder());
        assert_eq!((p.size, p.file_count, p.dir_count), (0, 0, 0));
        assert!(p.children.is_empty());
    }

    #[test]
    fn node_serialises_with_type_tag() {
        let json = serde_json::to_string(&file("a.txt", "/r", 3)).unwrap();
        assert!(json.contains(r#""type":"file""#), "{json}");
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name(), "a.txt");
        assert_eq!(back.size(), 3);
    }
}
