/// Duplicate file detection by `(name, size)`.
///
/// This is a syntactic match only: two files are duplicates when they share
/// a file name and a byte size. Contents are never read or hashed, so
/// same-named files of equal size but different content are reported, and
/// renamed copies are not.
use crate::model::{DirectoryNode, FileNode, Node};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// A set of two or more files sharing a name and a size.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateGroup<'a> {
    pub name: &'a str,
    /// Size of each file in the group.
    pub size: u64,
    /// Members in traversal order.
    pub files: Vec<&'a FileNode>,
}

impl DuplicateGroup<'_> {
    /// Bytes that could be reclaimed by keeping a single copy.
    pub fn wasted_bytes(&self) -> u64 {
        self.size * (self.files.len() as u64).saturating_sub(1)
    }
}

fn files(dir: &DirectoryNode) -> impl Iterator<Item = &FileNode> {
    dir.descendants().filter_map(Node::as_file)
}

/// Every file below `dir` whose `(name, size)` pair occurs more than once.
///
/// The first file seen with a given pair is emitted only once a second one
/// turns up, so files with a unique pair never appear.
pub fn find_duplicates(dir: &DirectoryNode) -> Vec<&FileNode> {
    // `Some(first)` while only one file with the key has been seen.
    let mut seen: HashMap<(&str, u64), Option<&FileNode>> = HashMap::new();
    let mut duplicates = Vec::new();

    for file in files(dir) {
        match seen.entry((file.name.as_str(), file.size)) {
            Entry::Vacant(slot) => {
                slot.insert(Some(file));
            }
            Entry::Occupied(mut slot) => {
                if let Some(first) = slot.get_mut().take() {
                    duplicates.push(first);
                }
                duplicates.push(file);
            }
        }
    }
    duplicates
}

/// Duplicates grouped by `(name, size)`, largest reclaimable space first.
pub fn group_duplicates(dir: &DirectoryNode) -> Vec<DuplicateGroup<'_>> {
    let mut index: HashMap<(&str, u64), usize> = HashMap::new();
    let mut groups: Vec<DuplicateGroup<'_>> = Vec::new();

    for file in files(dir) {
        let key = (file.name.as_str(), file.size);
        match index.get(&key) {
            Some(&i) => groups[i].files.push(file),
            None => {
                index.insert(key, groups.len());
                groups.push(DuplicateGroup {
                    name: file.name.as_str(),
                    size: file.size,
                    files: vec![file],
                });
            }
        }
    }

    groups.retain(|g| g.files.len() >= 2);
    // Stable sort keeps first-seen order among equal groups.
    groups.sort_by(|a, b| b.wasted_bytes().cmp(&a.wasted_bytes()));
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Timestamps;

    fn file(dir: &str, name: &str, size: u64) -> Node {
        Node::File(FileNode {
            name: name.into(),
            path: format!("{dir}/{name}"),
            content_type: "application/octet-stream".into(),
            size,
            attrs: None,
            times: Timestamps::default(),
        })
    }

    fn tree() -> DirectoryNode {
        let mut a = DirectoryNode::new("a".into(), "/r/a".into());
        a.children.push(file("/r/a", "report.pdf", 100));
        a.children.push(file("/r/a", "notes.txt", 7));

        let mut b = DirectoryNode::new("b".into(), "/r/b".into());
        b.children.push(file("/r/b", "report.pdf", 100));
        b.children.push(file("/r/b", "notes.txt", 8));
        b.children.push(file("/r/b", "logo.png", 3));

        let mut root = DirectoryNode::new("r".into(), "/r".into());
        root.children.push(Node::Directory(a));
        root.children.push(Node::Directory(b));
        root.children.push(file("/r", "logo.png", 3));
        root.children.push(file("/r", "report.pdf", 100));
        root
    }

    fn paths<'a>(files: &[&'a FileNode]) -> Vec<&'a str> {
        files.iter().map(|f| f.path.as_str()).collect()
    }

    #[test]
    fn first_member_appears_once_a_second_is_found() {
        let root = tree();
        assert_eq!(
            paths(&find_duplicates(&root)),
            [
                "/r/a/report.pdf",
                "/r/b/report.pdf",
                "/r/b/logo.png",
                "/r/logo.png",
                "/r/report.pdf",
            ]
        );
    }

    #[test]
    fn unique_name_size_pairs_are_never_reported() {
        let root = tree();
        let dups = find_duplicates(&root);
        // Same name, different size.
        assert!(dups.iter().all(|f| f.name != "notes.txt"));
    }

    #[test]
    fn groups_are_ordered_by_reclaimable_space() {
        let root = tree();
        let groups = group_duplicates(&root);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "report.pdf");
        assert_eq!(groups[0].files.len(), 3);
        assert_eq!(groups[0].wasted_bytes(), 200);
        assert_eq!(groups[1].name, "logo.png");
        assert_eq!(groups[1].wasted_bytes(), 3);
    }

    #[test]
    fn empty_tree_has_no_duplicates() {
        let root = DirectoryNode::new("r".into(), "/r".into());
        assert!(find_duplicates(&root).is_empty());
        assert!(group_duplicates(&root).is_empty());
    }
}
