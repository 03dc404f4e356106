//! Human-readable tree dump for debugging and tests.

use std::collections::{HashMap, VecDeque};
use std::fmt::Write as _;

use crate::common::{Error, Result};
use crate::index::btree::node::Node;
use crate::index::btree::tree::BTreeIndex;

impl BTreeIndex {
    /// Render the tree as a bracketed adjacency listing, one line per
    /// node.
    ///
    /// Nodes are numbered in breadth-first order from the root,
    /// independent of their physical page numbers. A leaf line lists
    /// `rid,key` pairs and ends with the number of the next leaf; an
    /// internal line lists `child,key` pairs and ends with the number
    /// of the rightmost child:
    ///
    /// ```text
    /// (0)[1,12,2]
    /// (1)[5.0,5,6.0,6,10.0,10,2]
    /// (2)[12.0,12,20.0,20]
    /// ```
    ///
    /// A trailing pointer that does not resolve to a live node (a
    /// retired page in the sibling chain) is omitted.
    pub fn dump(&self) -> Result<String> {
        let mut out = String::new();
        if self.node_count() == 0 {
            return Ok(out);
        }

        // Number every reachable node in breadth-first order.
        let root = self.root_page();
        let mut numbered: HashMap<_, usize> = HashMap::new();
        let mut bfs = vec![root];
        let mut queue = VecDeque::from([root]);
        numbered.insert(root, 0);

        while let Some(pn) = queue.pop_front() {
            if let Node::Internal(int) = self.read_node(pn)? {
                for child in int.child_pages() {
                    if !numbered.contains_key(&child) {
                        numbered.insert(child, bfs.len());
                        bfs.push(child);
                        queue.push_back(child);
                    }
                }
            }
        }

        for (number, pn) in bfs.iter().enumerate() {
            let _ = write!(out, "({})[", number);
            match self.read_node(*pn)? {
                Node::Leaf(leaf) => {
                    for (i, entry) in leaf.entries.iter().enumerate() {
                        if i > 0 {
                            out.push(',');
                        }
                        let _ = write!(out, "{},{}", entry.rid, entry.key);
                    }
                    if let Some(next) = leaf.next_leaf.and_then(|np| numbered.get(&np)) {
                        let _ = write!(out, ",{}", next);
                    }
                }
                Node::Internal(int) => {
                    for (i, entry) in int.entries.iter().enumerate() {
                        if i > 0 {
                            out.push(',');
                        }
                        let child = numbered
                            .get(&entry.child)
                            .ok_or(Error::Corrupted("dump reached an unnumbered child"))?;
                        let _ = write!(out, "{},{}", child, entry.key);
                    }
                    if let Some(rm) = int.rightmost_child.and_then(|rm| numbered.get(&rm)) {
                        let _ = write!(out, ",{}", rm);
                    }
                }
            }
            out.push_str("]\n");
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Key, KeyType, Rid};
    use tempfile::tempdir;

    fn create_tree(order: u32) -> (BTreeIndex, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");
        BTreeIndex::create(&path, KeyType::Int, order).unwrap();
        (BTreeIndex::open(&path).unwrap(), dir)
    }

    #[test]
    fn test_dump_empty_tree() {
        let (tree, _dir) = create_tree(4);
        assert_eq!(tree.dump().unwrap(), "");
    }

    #[test]
    fn test_dump_single_leaf() {
        let (mut tree, _dir) = create_tree(4);
        for k in [2, 1, 3] {
            tree.insert(Key::Int(k), Rid::new(k as u32, 0)).unwrap();
        }

        assert_eq!(tree.dump().unwrap(), "(0)[1.0,1,2.0,2,3.0,3]\n");
    }

    #[test]
    fn test_dump_two_level_tree() {
        let (mut tree, _dir) = create_tree(4);
        for k in [10, 20, 5, 6, 12] {
            tree.insert(Key::Int(k), Rid::new(k as u32, 0)).unwrap();
        }

        // Root separates at 12; the left leaf chains to the right one.
        assert_eq!(
            tree.dump().unwrap(),
            "(0)[1,12,2]\n(1)[5.0,5,6.0,6,10.0,10,2]\n(2)[12.0,12,20.0,20]\n"
        );
    }

    #[test]
    fn test_dump_numbers_are_breadth_first() {
        let (mut tree, _dir) = create_tree(4);
        for k in 0..40 {
            tree.insert(Key::Int(k), Rid::new(k as u32, 0)).unwrap();
        }

        let dump = tree.dump().unwrap();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), tree.node_count() as usize);
        for (i, line) in lines.iter().enumerate() {
            assert!(line.starts_with(&format!("({})[", i)));
        }
    }
}
