/// Analysis modules: read-only queries over a scanned subtree.
///
/// Every query takes the [`DirectoryNode`](crate::model::DirectoryNode) to
/// search, so results can be scoped to any directory of the tree, and never
/// includes that directory itself.
pub mod duplicates;
pub mod export;
pub mod file_types;
pub mod garbage;
pub mod search;
pub mod top_n;

pub use duplicates::{find_duplicates, group_duplicates, DuplicateGroup};
pub use file_types::{common_types, GroupBy, TypeSort, TypeStats};
pub use garbage::{find_garbage, GarbageMatcher, GarbageRules};
pub use search::{find_empty_dirs, search_by_name};
pub use top_n::{top_largest, top_recent, TopMode};
