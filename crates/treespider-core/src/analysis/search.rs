/// Name search and empty-directory search over a scanned subtree.
use crate::error::{Result, SpiderError};
use crate::model::{DirectoryNode, Node};
use regex::RegexBuilder;

/// Directories below `dir` with no children at all.
///
/// A directory holding only an empty subdirectory is not itself empty.
/// Placeholders for directories that could not be listed have no children
/// and are reported too; `access_denied` tells them apart.
pub fn find_empty_dirs(dir: &DirectoryNode) -> Vec<&DirectoryNode> {
    dir.descendants()
        .filter_map(Node::as_dir)
        .filter(|d| d.children.is_empty())
        .collect()
}

/// Nodes below `dir` whose name matches `query`, case-insensitively.
///
/// With `use_regex` the query is a regular expression searched anywhere in
/// the name; otherwise it is a plain substring.
pub fn search_by_name<'a>(
    dir: &'a DirectoryNode,
    query: &str,
    use_regex: bool,
) -> Result<Vec<&'a Node>> {
    if query.is_empty() {
        return Err(SpiderError::InvalidQuery("empty search query".into()));
    }

    if use_regex {
        let re = RegexBuilder::new(query).case_insensitive(true).build()?;
        return Ok(dir.descendants().filter(|n| re.is_match(n.name())).collect());
    }

    let needle = query.to_lowercase();
    Ok(dir
        .descendants()
        .filter(|n| n.name().to_lowercase().contains(&needle))
        .collect())
}
