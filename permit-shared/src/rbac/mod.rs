/// Permission resolution and menu tree construction
///
/// - [`resolver`]: user → roles → deduplicated menu set
/// - [`tree`]: flat menus → ordered forest
/// - [`order`]: the sibling ordering both of them rely on

pub mod order;
pub mod resolver;
pub mod tree;

pub use resolver::PermissionResolver;
pub use tree::{build_tree, flatten, node_count, MenuTreeNode};
