/// Garbage-file candidates: temp files, logs, backups, OS droppings and
/// empty files that are usually safe to clean up.
///
/// The pattern tables are data ([`GarbageRules`]), loaded from the
/// `[garbage]` section of the config file; the defaults below only seed it.
use crate::error::Result;
use crate::model::{DirectoryNode, FileNode, Node};
use regex::{RegexSet, RegexSetBuilder};
use serde::{Deserialize, Serialize};

const DEFAULT_GARBAGE: &[&str] = &[
    r"\.(te?mp|log|bak|old|chk|dmp)$",
    r"^~",
    r"^Thumbs\.db$",
    r"^\.DS_Store$",
];

const DEFAULT_PROTECTED: &[&str] = &[r"\.(sys|dll|ini|dat|cfg|lnk|ocx|drv)$"];

const DEFAULT_SKIP_FOLDERS: &[&str] = &["$recycle.bin"];

/// Pattern tables for garbage detection. All patterns match file names
/// case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GarbageRules {
    /// A file matching any of these is a candidate.
    pub garbage_patterns: Vec<String>,
    /// A file matching any of these is never a candidate.
    pub protected_patterns: Vec<String>,
    /// Folder names (case-insensitive) whose contents are not searched.
    pub skip_folders: Vec<String>,
    /// Treat every zero-byte file as a candidate.
    pub include_empty_files: bool,
}

impl Default for GarbageRules {
    fn default() -> Self {
        let owned = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
        Self {
            garbage_patterns: owned(DEFAULT_GARBAGE),
            protected_patterns: owned(DEFAULT_PROTECTED),
            skip_folders: owned(DEFAULT_SKIP_FOLDERS),
            include_empty_files: true,
        }
    }
}

/// Compiled form of [`GarbageRules`].
#[derive(Debug, Clone)]
pub struct GarbageMatcher {
    garbage: RegexSet,
    protected: RegexSet,
    skip_folders: Vec<String>,
    include_empty_files: bool,
}

impl GarbageMatcher {
    /// Compile the rule tables. Fails with `InvalidPattern` on a bad regex.
    pub fn new(rules: &GarbageRules) -> Result<Self> {
        let compile = |patterns: &[String]| {
            RegexSetBuilder::new(patterns)
                .case_insensitive(true)
                .build()
        };
        Ok(Self {
            garbage: compile(&rules.garbage_patterns[..])?,
            protected: compile(&rules.protected_patterns[..])?,
            skip_folders: rules.skip_folders.iter().map(|f| f.to_lowercase()).collect(),
            include_empty_files: rules.include_empty_files,
        })
    }

    pub fn is_garbage(&self, file: &FileNode) -> bool {
        let candidate =
            (self.include_empty_files && file.size == 0) || self.garbage.is_match(&file.name);
        candidate && !self.protected.is_match(&file.name)
    }

    pub fn skips_folder(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.skip_folders.iter().any(|f| *f == name)
    }
}

/// Garbage candidates below `dir`, in traversal order.
pub fn find_garbage<'a>(dir: &'a DirectoryNode, matcher: &GarbageMatcher) -> Vec<&'a FileNode> {
    let mut found = Vec::new();
    let mut stack = vec![dir];
    while let Some(current) = stack.pop() {
        // Push in reverse so siblings come off the stack in order.
        for child in current.children.iter().rev() {
            if let Node::Directory(sub) = child {
                if !matcher.skips_folder(&sub.name) {
                    stack.push(sub);
                }
            }
        }
        found.extend(
            current
                .children
                .iter()
                .filter_map(Node::as_file)
                .filter(|f| matcher.is_garbage(f)),
        );
    }
    found
}
