/// Menu tree builder
///
/// Turns a flat collection of menus into a forest for client navigation.
///
/// # Algorithm
///
/// 1. Sort the menus into display order (see [`super::order`])
/// 2. Index each menu's position by id and bucket children under their
///    parent's position, in sorted order
/// 3. Menus with no parent, a parent outside the collection, or themselves as
///    parent become roots
/// 4. Assemble each root depth-first, moving every menu out of its slot as it
///    is placed
///
/// Step 4 places each menu at most once. Menus still unplaced afterwards sit
/// on a `parent_id` cycle; they are logged and appended as extra roots so no
/// menu is dropped and construction always terminates.
///
/// # Wire shape
///
/// A node serializes as the menu's own fields plus `children`, which is always
/// present and empty for leaves:
///
/// ```json
/// { "id": 1, "name": "System", "parent_id": null, ..., "children": [ ... ] }
/// ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::order::sort_menus;
use crate::models::menu::Menu;

/// A menu with its ordered children
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuTreeNode {
    #[serde(flatten)]
    pub menu: Menu,

    pub children: Vec<MenuTreeNode>,
}

impl MenuTreeNode {
    pub fn new(menu: Menu) -> Self {
        Self {
            menu,
            children: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Builds an ordered forest from `menus`
///
/// The output holds exactly one node per input menu. The input order is
/// irrelevant: equal collections always produce equal forests.
pub fn build_tree(mut menus: Vec<Menu>) -> Vec<MenuTreeNode> {
    sort_menus(&mut menus);

    let mut position: HashMap<i64, usize> = HashMap::with_capacity(menus.len());
    for (i, menu) in menus.iter().enumerate() {
        position.entry(menu.id).or_insert(i);
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); menus.len()];
    let mut roots = Vec::new();

    for (i, menu) in menus.iter().enumerate() {
        match menu
            .parent()
            .filter(|parent| *parent != menu.id)
            .and_then(|parent| position.get(&parent))
        {
            Some(&parent) => children[parent].push(i),
            None => roots.push(i),
        }
    }

    let mut slots: Vec<Option<Menu>> = menus.into_iter().map(Some).collect();

    let mut forest: Vec<MenuTreeNode> = roots
        .into_iter()
        .filter_map(|i| assemble(i, &mut slots, &children))
        .collect();

    for i in 0..slots.len() {
        if let Some(menu) = &slots[i] {
            warn!(
                menu_id = menu.id,
                parent_id = ?menu.parent_id,
                "Menu is part of a parent cycle; promoting to root"
            );
            if let Some(node) = assemble(i, &mut slots, &children) {
                forest.push(node);
            }
        }
    }

    forest
}

fn assemble(
    i: usize,
    slots: &mut [Option<Menu>],
    children: &[Vec<usize>],
) -> Option<MenuTreeNode> {
    let menu = slots[i].take()?;
    let mut node = MenuTreeNode::new(menu);

    node.children = children[i]
        .iter()
        .filter_map(|&child| assemble(child, slots, children))
        .collect();

    Some(node)
}

/// Walks the forest depth-first, parents before children
pub fn flatten(forest: &[MenuTreeNode]) -> Vec<&Menu> {
    fn walk<'a>(nodes: &'a [MenuTreeNode], out: &mut Vec<&'a Menu>) {
        for node in nodes {
            out.push(&node.menu);
            walk(&node.children, out);
        }
    }

    let mut out = Vec::new();
    walk(forest, &mut out);
    out
}

/// Total number of nodes in the forest
pub fn node_count(forest: &[MenuTreeNode]) -> usize {
    forest
        .iter()
        .map(|node| 1 + node_count(&node.children))
        .sum()
}
