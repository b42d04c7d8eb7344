//! Thread tree - parent/child reconstruction of flat comment/reply lists
//!
//! Stored as an arena plus an adjacency index: a flat vector of owned nodes
//! and a `parent index -> child indices` map rebuilt from every snapshot.
//! Nodes never hold references to each other.
//!
//! Root level keeps arrival (storage) order; child levels are ordered by
//! timestamp ascending. A node whose parent is missing (the parent was
//! deleted; children are not cascade-deleted) stays addressable and falls
//! back to the root bucket.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::model::{Comment, ForumReply};

/// Anything that can be threaded: comments and forum replies
pub trait ThreadNode {
    fn node_id(&self) -> &str;
    fn node_parent_id(&self) -> Option<&str>;
    fn node_timestamp(&self) -> DateTime<Utc>;
}

impl ThreadNode for Comment {
    fn node_id(&self) -> &str {
        &self.id
    }
    fn node_parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }
    fn node_timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl ThreadNode for ForumReply {
    fn node_id(&self) -> &str {
        &self.id
    }
    fn node_parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }
    fn node_timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Arena + adjacency index over one flat node list
pub struct ThreadTree<T> {
    nodes: Vec<T>,
    roots: Vec<usize>,
    children: HashMap<usize, Vec<usize>>,
}

impl<T: ThreadNode> ThreadTree<T> {
    /// Rebuild the tree from a snapshot's flat list
    pub fn build(nodes: Vec<T>) -> Self {
        let mut index_of: HashMap<&str, usize> = HashMap::new();
        for (i, node) in nodes.iter().enumerate() {
            // First occurrence wins on duplicate IDs
            index_of.entry(node.node_id()).or_insert(i);
        }

        let mut roots = Vec::new();
        let mut children: HashMap<usize, Vec<usize>> = HashMap::new();
        for (i, node) in nodes.iter().enumerate() {
            let parent = node
                .node_parent_id()
                .filter(|p| *p != node.node_id())
                .and_then(|p| index_of.get(p).copied());
            match parent {
                Some(p) => children.entry(p).or_default().push(i),
                // Root, orphan, or self-parent: root bucket, arrival order
                None => roots.push(i),
            }
        }

        for bucket in children.values_mut() {
            bucket.sort_by_key(|&i| nodes[i].node_timestamp());
        }

        // Nodes caught in a parent cycle are unreachable from the roots;
        // promote them so every node renders exactly once.
        let mut tree = Self { nodes, roots, children };
        let mut visited = vec![false; tree.nodes.len()];
        for (_, idx) in tree.depth_first_indices() {
            visited[idx] = true;
        }
        for (i, seen) in visited.iter().enumerate() {
            if !seen {
                tree.children.values_mut().for_each(|b| b.retain(|&c| c != i));
                tree.roots.push(i);
            }
        }
        tree
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, idx: usize) -> &T {
        &self.nodes[idx]
    }

    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn children_of(&self, idx: usize) -> &[usize] {
        self.children.get(&idx).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Depth-first traversal from the root bucket as `(depth, node)` pairs,
    /// the order a renderer walks the thread
    pub fn depth_first(&self) -> Vec<(usize, &T)> {
        self.depth_first_indices()
            .into_iter()
            .map(|(depth, idx)| (depth, &self.nodes[idx]))
            .collect()
    }

    fn depth_first_indices(&self) -> Vec<(usize, usize)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(usize, usize)> =
            self.roots.iter().rev().map(|&i| (0, i)).collect();
        while let Some((depth, idx)) = stack.pop() {
            out.push((depth, idx));
            for &child in self.children_of(idx).iter().rev() {
                stack.push((depth + 1, child));
            }
        }
        out
    }

    /// Whether the node with `ancestor_id` is an ancestor of `node_id`
    pub fn is_ancestor(&self, ancestor_id: &str, node_id: &str) -> bool {
        let Some(mut current) = self.nodes.iter().position(|n| n.node_id() == node_id) else {
            return false;
        };
        let parent_of = |idx: usize| {
            self.children
                .iter()
                .find(|(_, kids)| kids.contains(&idx))
                .map(|(&p, _)| p)
        };
        while let Some(parent) = parent_of(current) {
            if self.nodes[parent].node_id() == ancestor_id {
                return true;
            }
            current = parent;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn comment(id: &str, parent: Option<&str>, minute: u32) -> Comment {
        Comment {
            id: id.into(),
            author_id: "u1".into(),
            author_name: "Ada".into(),
            text: format!("comment {id}"),
            parent_id: parent.map(String::from),
            upvotes: 0,
            upvoted_by: Default::default(),
            created_at: Utc.with_ymd_and_hms(2026, 1, 10, 10, minute, 0).unwrap(),
        }
    }

    #[test]
    fn test_every_node_appears_exactly_once() {
        let tree = ThreadTree::build(vec![
            comment("a", None, 0),
            comment("b", Some("a"), 2),
            comment("c", Some("a"), 1),
            comment("d", Some("b"), 3),
            comment("e", None, 4),
        ]);

        let walk = tree.depth_first();
        assert_eq!(walk.len(), 5);
        let mut ids: Vec<&str> = walk.iter().map(|(_, n)| n.node_id()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn test_children_sorted_by_timestamp_roots_by_arrival() {
        let tree = ThreadTree::build(vec![
            comment("late-root", None, 30),
            comment("a", None, 0),
            comment("b", Some("a"), 20),
            comment("c", Some("a"), 10),
        ]);

        // Roots keep arrival order even though "late-root" is newest
        let root_ids: Vec<&str> = tree.roots().iter().map(|&i| tree.node(i).node_id()).collect();
        assert_eq!(root_ids, vec!["late-root", "a"]);

        // Children of "a" are timestamp-ascending: c (10) before b (20)
        let a = tree.roots()[1];
        let child_ids: Vec<&str> = tree.children_of(a).iter().map(|&i| tree.node(i).node_id()).collect();
        assert_eq!(child_ids, vec!["c", "b"]);
    }

    #[test]
    fn test_orphans_fall_back_to_root_bucket() {
        // Parent "gone" was deleted; its child must stay addressable
        let tree = ThreadTree::build(vec![
            comment("a", None, 0),
            comment("orphan", Some("gone"), 1),
        ]);
        assert_eq!(tree.roots().len(), 2);
        assert_eq!(tree.depth_first().len(), 2);
    }

    #[test]
    fn test_no_node_is_its_own_ancestor() {
        let tree = ThreadTree::build(vec![
            comment("a", None, 0),
            comment("b", Some("a"), 1),
            comment("self", Some("self"), 2),
        ]);
        assert!(!tree.is_ancestor("b", "b"));
        assert!(!tree.is_ancestor("self", "self"));
        assert!(tree.is_ancestor("a", "b"));
        // Self-parent is treated as a root
        assert_eq!(tree.depth_first().len(), 3);
    }

    #[test]
    fn test_mutual_cycle_nodes_still_render_once() {
        // Cannot be created through the gateway; defensive for bad data
        let tree = ThreadTree::build(vec![
            comment("a", Some("b"), 0),
            comment("b", Some("a"), 1),
        ]);
        let walk = tree.depth_first();
        assert_eq!(walk.len(), 2);
    }

    #[test]
    fn test_forum_replies_thread_too() {
        let reply = ForumReply::new("u2".into(), "Grace".into(), "answer".into(), None);
        let tree = ThreadTree::build(vec![reply]);
        assert_eq!(tree.roots().len(), 1);
    }
}
