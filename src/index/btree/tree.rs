//! The B+tree index handle and its mutation algorithms.
//!
//! All mutating operations start at the root, descend via [`locate`],
//! mutate a node through a decode → modify → encode cycle, and may
//! propagate structural changes back toward the root: splits propagate
//! through [`insert_in_parent`], merges and redistributions through a
//! recursive [`delete_element`]. Cascades terminate at the root and are
//! bounded by [`MAX_TREE_DEPTH`].
//!
//! [`locate`]: BTreeIndex::locate
//! [`insert_in_parent`]: BTreeIndex::insert_in_parent
//! [`delete_element`]: BTreeIndex::delete_element

use std::path::Path;

use crate::buffer::BufferPool;
use crate::common::config::{DEFAULT_POOL_SIZE, MAX_TREE_DEPTH};
use crate::common::{Error, Key, KeyType, PageId, Result, Rid};
use crate::index::btree::meta::TreeMeta;
use crate::index::btree::node::{
    max_order, split_point, InternalEntry, InternalNode, LeafNode, Node,
};
use crate::index::btree::scan::TreeScan;
use crate::storage::{Page, PageFile};

/// How [`BTreeIndex::locate`] treats a key that is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchMode {
    /// Only an exact match counts; a miss returns `None`.
    Exact,
    /// A miss returns the first position at or above the key — the slot
    /// an insert would use.
    InsertionPoint,
}

/// A sibling adjacent to an underflowing node, with its direction.
///
/// The left sibling is preferred; a parent's first child has none, so it
/// rebalances with its right sibling instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Neighbor {
    Left(PageId),
    Right(PageId),
}

impl Neighbor {
    fn page(self) -> PageId {
        match self {
            Neighbor::Left(pn) | Neighbor::Right(pn) => pn,
        }
    }
}

/// A disk-backed B+tree index mapping typed keys to record identifiers.
///
/// One handle owns one index file and a buffer pool caching its pages.
/// Lookups and scans take `&self`; inserts and deletes take `&mut self`,
/// so a handle is single-writer and cannot be mutated while a scan
/// borrows it.
///
/// # Usage
/// ```no_run
/// use arbordb::{BTreeIndex, Key, KeyType, Rid};
///
/// BTreeIndex::create("orders.idx", KeyType::Int, 64)?;
/// let mut index = BTreeIndex::open("orders.idx")?;
/// index.insert(Key::Int(42), Rid::new(7, 0))?;
/// assert_eq!(index.find(&Key::Int(42))?, Rid::new(7, 0));
/// index.close()?;
/// # Ok::<(), arbordb::Error>(())
/// ```
pub struct BTreeIndex {
    pool: BufferPool,
    meta: TreeMeta,
}

impl BTreeIndex {
    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Create a new, empty index file.
    ///
    /// Writes the header page and nothing else; the first node is
    /// allocated by the first insert. `order` must be at least 2.
    ///
    /// # Errors
    /// - `Error::OrderTooHigh` if `order` entries cannot fit a page
    /// - I/O errors if the file exists or cannot be created
    pub fn create<P: AsRef<Path>>(path: P, key_type: KeyType, order: u32) -> Result<()> {
        assert!(order >= 2, "tree order must be at least 2");

        let max = max_order(key_type);
        if order > max {
            return Err(Error::OrderTooHigh { order, max });
        }

        let mut file = PageFile::create(path)?;
        file.append_page()?;

        let meta = TreeMeta {
            root_page: PageId::new(1),
            node_count: 0,
            entry_count: 0,
            key_type,
            order,
        };
        let mut page = Page::new();
        meta.encode(&mut page);
        file.write_page(PageId::HEADER, &page)?;

        Ok(())
    }

    /// Open an existing index.
    ///
    /// # Errors
    /// - I/O errors if the file is missing
    /// - `Error::Corrupted` if the header page fails its checksum
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_pool_size(path, DEFAULT_POOL_SIZE)
    }

    /// Open an existing index with a caller-chosen buffer pool size.
    pub fn open_with_pool_size<P: AsRef<Path>>(path: P, pool_size: usize) -> Result<Self> {
        let file = PageFile::open(path)?;
        let pool = BufferPool::new(pool_size, file);

        let meta = {
            let guard = pool.pin_read(PageId::HEADER)?;
            TreeMeta::decode(&guard)?
        };

        Ok(Self { pool, meta })
    }

    /// Persist the header and flush every dirty page, consuming the
    /// handle.
    pub fn close(self) -> Result<()> {
        {
            let mut guard = self.pool.pin_write(PageId::HEADER)?;
            self.meta.encode(&mut guard);
        }
        self.pool.flush_all()
    }

    /// Remove an index file from disk.
    pub fn destroy<P: AsRef<Path>>(path: P) -> Result<()> {
        PageFile::destroy(path)
    }

    // ========================================================================
    // Tree information
    // ========================================================================

    /// Number of allocated, non-retired nodes.
    pub fn node_count(&self) -> u32 {
        self.meta.node_count
    }

    /// Number of entries held in leaves tree-wide.
    pub fn entry_count(&self) -> u32 {
        self.meta.entry_count
    }

    /// The key type this index was created with.
    pub fn key_type(&self) -> KeyType {
        self.meta.key_type
    }

    /// The tree order: maximum child pointers per node.
    pub fn order(&self) -> u32 {
        self.meta.order
    }

    /// The buffer pool backing this handle.
    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    /// The page currently holding the root node.
    pub(crate) fn root_page(&self) -> PageId {
        self.meta.root_page
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Look up the record identifier stored under `key`.
    ///
    /// # Errors
    /// - `Error::KeyNotFound` if the key is absent
    /// - `Error::KeyTypeMismatch` for a key of the wrong type
    pub fn find(&self, key: &Key) -> Result<Rid> {
        key.check_type(self.meta.key_type)?;

        if self.meta.entry_count == 0 {
            return Err(Error::KeyNotFound);
        }

        match self.locate(self.meta.root_page, key, SearchMode::Exact, 0)? {
            Some((_, leaf, pos)) => Ok(leaf.entries[pos].rid),
            None => Err(Error::KeyNotFound),
        }
    }

    /// Open a forward scan over all entries in ascending key order.
    pub fn scan(&self) -> TreeScan<'_> {
        TreeScan::new(self)
    }

    /// Recursive descent to the leaf holding (or bounding) `key`.
    ///
    /// Returns the leaf's page, the decoded leaf, and the position of
    /// the match — or, in [`SearchMode::InsertionPoint`], the first
    /// position at or above the key (possibly one past the last entry).
    /// Pins are scoped to each node visit, so the descent never holds
    /// more than one page at a time.
    fn locate(
        &self,
        pn: PageId,
        key: &Key,
        mode: SearchMode,
        depth: usize,
    ) -> Result<Option<(PageId, LeafNode, usize)>> {
        if depth > MAX_TREE_DEPTH {
            return Err(Error::Corrupted("descent exceeded the tree depth ceiling"));
        }

        match self.read_node(pn)? {
            Node::Leaf(leaf) => {
                let pos = leaf
                    .entries
                    .iter()
                    .position(|e| e.key >= *key)
                    .unwrap_or(leaf.entries.len());
                let matched = pos < leaf.entries.len() && leaf.entries[pos].key == *key;

                match mode {
                    SearchMode::Exact if !matched => Ok(None),
                    _ => Ok(Some((pn, leaf, pos))),
                }
            }
            Node::Internal(int) => {
                // The first separator above the key bounds the subtree
                // holding it; past the last separator, descend right.
                // A separator-less internal node (an underflow this
                // engine declines to repair) owns only its rightmost
                // subtree, so the descent falls through to it.
                for entry in &int.entries {
                    if entry.key > *key {
                        return self.locate(entry.child, key, mode, depth + 1);
                    }
                }
                let rightmost = int
                    .rightmost_child
                    .ok_or(Error::Corrupted("internal node missing rightmost child"))?;
                self.locate(rightmost, key, mode, depth + 1)
            }
        }
    }

    // ========================================================================
    // Insertion
    // ========================================================================

    /// Insert `key → rid`.
    ///
    /// # Errors
    /// - `Error::KeyAlreadyExists` if the key is present (no mutation)
    /// - `Error::KeyTypeMismatch` for a key of the wrong type
    pub fn insert(&mut self, key: Key, rid: Rid) -> Result<()> {
        key.check_type(self.meta.key_type)?;

        // Fresh tree: the first entry gets a new leaf as root.
        if self.meta.entry_count == 0 {
            let mut root = LeafNode {
                parent: None,
                next_leaf: None,
                entries: Vec::new(),
            };
            root.insert_sorted(key, rid);

            let pn = self.alloc_node(&Node::Leaf(root))?;
            self.meta.root_page = pn;
            self.meta.entry_count = 1;
            return Ok(());
        }

        let (pn, mut leaf, pos) = self
            .locate(self.meta.root_page, &key, SearchMode::InsertionPoint, 0)?
            .ok_or(Error::Corrupted("no leaf accepts the insertion"))?;

        if pos < leaf.entries.len() && leaf.entries[pos].key == key {
            return Err(Error::KeyAlreadyExists);
        }

        leaf.insert_sorted(key, rid);
        self.meta.entry_count += 1;

        let overflow = leaf.entries.len() > self.capacity();
        self.write_node(pn, &Node::Leaf(leaf))?;

        if overflow {
            self.split_insert(pn)?;
        }
        Ok(())
    }

    /// Split an overflowing node into itself plus a new right sibling,
    /// then push the separator into the parent.
    ///
    /// The upper `split_point(order)` entries move to the right node.
    /// A leaf keeps its copy of the promoted key (the parent indexes by
    /// the right leaf's minimum); an internal node instead promotes the
    /// entry just below the moved block — its key goes up, its child
    /// becomes the left node's new rightmost.
    fn split_insert(&mut self, left_pn: PageId) -> Result<()> {
        let copy_cnt = split_point(self.meta.order);

        match self.read_node(left_pn)? {
            Node::Leaf(mut left) => {
                let moved = left.entries.split_off(left.entries.len() - copy_cnt);
                let right = LeafNode {
                    parent: left.parent,
                    next_leaf: left.next_leaf,
                    entries: moved,
                };
                let separator = right.entries[0].key.clone();

                let right_pn = self.alloc_node(&Node::Leaf(right))?;
                left.next_leaf = Some(right_pn);
                self.write_node(left_pn, &Node::Leaf(left))?;

                self.insert_in_parent(left_pn, right_pn, separator)
            }
            Node::Internal(mut left) => {
                let moved = left.entries.split_off(left.entries.len() - copy_cnt);
                let promoted = left
                    .entries
                    .pop()
                    .ok_or(Error::Corrupted("split of an underfull internal node"))?;

                let right = InternalNode {
                    parent: left.parent,
                    rightmost_child: left.rightmost_child,
                    entries: moved,
                };
                left.rightmost_child = Some(promoted.child);

                let right_pn = self.alloc_node(&Node::Internal(right))?;
                self.write_node(left_pn, &Node::Internal(left))?;

                // The children handed to the right node still name the
                // left node as parent; fix them before anything else
                // walks upward from one of them.
                self.reparent_children(right_pn)?;

                self.insert_in_parent(left_pn, right_pn, promoted.key)
            }
        }
    }

    /// Install the separator for a freshly split pair into the parent,
    /// creating a new root when the left node was the root.
    fn insert_in_parent(&mut self, left_pn: PageId, right_pn: PageId, separator: Key) -> Result<()> {
        let mut left = self.read_node(left_pn)?;
        let mut right = self.read_node(right_pn)?;

        let (parent_pn, mut parent) = match left.parent() {
            Some(pn) => {
                let Node::Internal(int) = self.read_node(pn)? else {
                    return Err(Error::Corrupted("parent page is not an internal node"));
                };
                (pn, int)
            }
            None => {
                // The root split: a brand-new root sits above the pair.
                let fresh = InternalNode {
                    parent: None,
                    rightmost_child: None,
                    entries: Vec::new(),
                };
                let pn = self.alloc_node(&Node::Internal(fresh.clone()))?;
                self.meta.root_page = pn;
                (pn, fresh)
            }
        };

        // For leaves the parent always indexes by the right child's
        // actual minimum key, not the promoted value.
        let separator = if left.is_leaf() {
            right
                .first_key()
                .ok_or(Error::Corrupted("right split half is empty"))?
                .clone()
        } else {
            separator
        };

        let pos = parent.insert_sorted(separator, left_pn);
        if pos + 1 == parent.entries.len() {
            parent.rightmost_child = Some(right_pn);
        } else {
            parent.entries[pos + 1].child = right_pn;
        }

        left.set_parent(Some(parent_pn));
        right.set_parent(Some(parent_pn));

        let overflow = parent.entries.len() > self.capacity();

        self.write_node(left_pn, &left)?;
        self.write_node(right_pn, &right)?;
        self.write_node(parent_pn, &Node::Internal(parent))?;

        if overflow {
            self.split_insert(parent_pn)?;
        }
        Ok(())
    }

    // ========================================================================
    // Deletion
    // ========================================================================

    /// Delete `key` and rebalance as needed.
    ///
    /// # Errors
    /// - `Error::KeyNotFound` if the key is absent (no mutation)
    /// - `Error::KeyTypeMismatch` for a key of the wrong type
    pub fn delete(&mut self, key: &Key) -> Result<()> {
        key.check_type(self.meta.key_type)?;

        if self.meta.entry_count == 0 {
            return Err(Error::KeyNotFound);
        }

        let (pn, _, _) = self
            .locate(self.meta.root_page, key, SearchMode::Exact, 0)?
            .ok_or(Error::KeyNotFound)?;

        self.delete_element(pn, key, 0)
    }

    /// Remove `key` from the node at `from_pn` and restore the balance
    /// invariants, cascading into the parent as far as necessary.
    fn delete_element(&mut self, from_pn: PageId, key: &Key, depth: usize) -> Result<()> {
        if depth > MAX_TREE_DEPTH {
            return Err(Error::Corrupted("rebalance exceeded the tree depth ceiling"));
        }

        let mut node = self.read_node(from_pn)?;
        let parent_pn = node.parent();

        let removed = remove_key_or_child(&mut node, from_pn, key);
        if removed.is_some() && node.is_leaf() {
            self.meta.entry_count -= 1;
        }
        let remaining = node.entry_count();
        self.write_node(from_pn, &node)?;

        if let Some(ppn) = parent_pn {
            if remaining > 0 && removed == Some(0) {
                // The node lost its minimum; the parent separator that
                // carried it must follow the new first key.
                let Node::Internal(mut parent) = self.read_node(ppn)? else {
                    return Err(Error::Corrupted("parent page is not an internal node"));
                };
                if let Some(entry) = parent.entries.iter_mut().find(|e| e.key == *key) {
                    entry.key = node
                        .first_key()
                        .ok_or(Error::Corrupted("non-empty node has no first key"))?
                        .clone();
                    self.write_node(ppn, &Node::Internal(parent))?;
                }
                // A first-child minimum appears in no parent entry; then
                // there is nothing to refresh.
            }
        }

        let ppn = match parent_pn {
            Some(ppn) if self.meta.root_page != from_pn => ppn,
            _ => return self.settle_root(from_pn, &node),
        };

        // Still within occupancy: the delete was simple.
        if remaining > self.min_keys() {
            return Ok(());
        }

        // An emptied node falls through here too: merging it into a
        // sibling removes the separator above it and cascades, which
        // also covers a parent left with a single separator.
        let neighbor = self.neighbor_of(from_pn, ppn)?;
        let neighbor_count = self.read_node(neighbor.page())?.entry_count();

        if neighbor_count + remaining <= self.capacity() {
            self.merge_nodes(neighbor, from_pn, depth)
        } else if remaining < self.min_keys() {
            self.distribute_entries(neighbor, from_pn)
        } else {
            Ok(())
        }
    }

    /// Root bookkeeping after a deletion that ended at the root.
    ///
    /// An emptied tree resets to the canonical state (root page 1, zero
    /// counts). An internal root with no separators left hands the tree
    /// to its rightmost child; one with a single separator whose child
    /// emptied hands it to the surviving child.
    fn settle_root(&mut self, root_pn: PageId, node: &Node) -> Result<()> {
        if self.meta.entry_count == 0 {
            self.meta.root_page = PageId::new(1);
            self.meta.node_count = 0;
            return Ok(());
        }

        let Node::Internal(int) = node else {
            return Ok(());
        };

        if int.entries.is_empty() {
            let survivor = int
                .rightmost_child
                .ok_or(Error::Corrupted("empty root has no child to promote"))?;
            self.promote_to_root(survivor)?;
            self.meta.node_count = self.meta.node_count.saturating_sub(1);
            return Ok(());
        }

        if int.entries.len() == 1 {
            let first = int.entries[0].child;
            let rightmost = int
                .rightmost_child
                .ok_or(Error::Corrupted("internal root missing rightmost child"))?;

            // Only leaves can be dropped outright when empty; an empty
            // internal node still owns its rightmost subtree.
            let (Node::Leaf(first_leaf), Node::Leaf(rightmost_leaf)) =
                (self.read_node(first)?, self.read_node(rightmost)?)
            else {
                return Ok(());
            };
            let first_empty = first_leaf.entries.is_empty();
            let rightmost_empty = rightmost_leaf.entries.is_empty();

            if first_empty != rightmost_empty {
                let (survivor, emptied) = if first_empty {
                    (rightmost, first)
                } else {
                    (first, rightmost)
                };

                self.promote_to_root(survivor)?;

                let mut ghost = self.read_node(emptied)?;
                ghost.set_parent(None);
                if let Node::Leaf(leaf) = &mut ghost {
                    leaf.next_leaf = None;
                }
                self.write_node(emptied, &ghost)?;

                // Old root and the emptied child both retire.
                self.meta.node_count = self.meta.node_count.saturating_sub(2);

                // The old root page keeps its bytes; nothing references
                // it anymore and its page is never reclaimed.
                let mut old_root = self.read_node(root_pn)?;
                if let Node::Internal(i) = &mut old_root {
                    i.entries.clear();
                    i.rightmost_child = None;
                }
                self.write_node(root_pn, &old_root)?;
            }
        }

        Ok(())
    }

    /// Make `pn` the new root: clear its parent link and point the
    /// handle at it.
    fn promote_to_root(&mut self, pn: PageId) -> Result<()> {
        let mut survivor = self.read_node(pn)?;
        survivor.set_parent(None);
        self.write_node(pn, &survivor)?;
        self.meta.root_page = pn;
        Ok(())
    }

    /// Locate the sibling an underflowing node rebalances with.
    fn neighbor_of(&self, pn: PageId, parent_pn: PageId) -> Result<Neighbor> {
        let Node::Internal(parent) = self.read_node(parent_pn)? else {
            return Err(Error::Corrupted("parent page is not an internal node"));
        };

        let children = parent.child_pages();
        let idx = children
            .iter()
            .position(|&c| c == pn)
            .ok_or(Error::Corrupted("node is not referenced by its parent"))?;

        if idx == 0 {
            let right = children
                .get(1)
                .copied()
                .ok_or(Error::Corrupted("first child has no sibling"))?;
            Ok(Neighbor::Right(right))
        } else {
            Ok(Neighbor::Left(children[idx - 1]))
        }
    }

    /// Merge an underflowing node into its neighbor.
    ///
    /// The neighbor page survives with the combined entries; `from_pn`
    /// is retired. The parent's references to the retired page are
    /// rewritten to the survivor, then the separator between the two
    /// siblings is removed from the parent by a recursive
    /// `delete_element`, cascading the rebalance upward.
    ///
    /// Internal nodes additionally pull the separator down between the
    /// two entry runs; if the combined node would not fit, the merge is
    /// skipped and the underflow left in place.
    fn merge_nodes(&mut self, neighbor: Neighbor, from_pn: PageId, depth: usize) -> Result<()> {
        let survivor_pn = neighbor.page();
        let (left_pn, right_pn) = match neighbor {
            Neighbor::Left(pn) => (pn, from_pn),
            Neighbor::Right(pn) => (from_pn, pn),
        };

        let ppn = self
            .read_node(from_pn)?
            .parent()
            .ok_or(Error::Corrupted("merge of a parentless node"))?;
        let Node::Internal(mut parent) = self.read_node(ppn)? else {
            return Err(Error::Corrupted("parent page is not an internal node"));
        };

        // The separator between the siblings is the parent entry
        // addressing the physically-left node.
        let separator = parent
            .entries
            .iter()
            .find(|e| e.child == left_pn)
            .ok_or(Error::Corrupted("merging siblings share no separator"))?
            .key
            .clone();

        let left = self.read_node(left_pn)?;
        let right = self.read_node(right_pn)?;

        match (left, right) {
            (Node::Leaf(left), Node::Leaf(right)) => {
                let mut entries = left.entries;
                entries.extend(right.entries);
                let merged = LeafNode {
                    parent: Some(ppn),
                    next_leaf: right.next_leaf,
                    entries,
                };
                self.write_node(survivor_pn, &Node::Leaf(merged))?;
            }
            (Node::Internal(left), Node::Internal(right)) => {
                // The pulled-down separator needs a slot of its own.
                if left.entries.len() + right.entries.len() >= self.capacity() {
                    return Ok(());
                }

                let left_rightmost = left
                    .rightmost_child
                    .ok_or(Error::Corrupted("internal node missing rightmost child"))?;
                let mut entries = left.entries;
                entries.push(InternalEntry {
                    key: separator.clone(),
                    child: left_rightmost,
                });
                entries.extend(right.entries);

                let merged = InternalNode {
                    parent: Some(ppn),
                    rightmost_child: right.rightmost_child,
                    entries,
                };
                self.write_node(survivor_pn, &Node::Internal(merged))?;
                self.reparent_children(survivor_pn)?;
            }
            _ => return Err(Error::Corrupted("merge of mismatched node kinds")),
        }

        self.retire_node(from_pn)?;

        parent.replace_child(from_pn, survivor_pn);
        self.write_node(ppn, &Node::Internal(parent))?;

        self.delete_element(ppn, &separator, depth + 1)
    }

    /// Move one entry from the neighbor into the underflowing leaf and
    /// refresh the parent separator between the two siblings.
    ///
    /// Redistribution between internal nodes is not implemented; an
    /// internal underflow that cannot merge stays as it is.
    fn distribute_entries(&mut self, neighbor: Neighbor, from_pn: PageId) -> Result<()> {
        let node = self.read_node(from_pn)?;
        let ppn = node
            .parent()
            .ok_or(Error::Corrupted("redistribution of a parentless node"))?;
        let Node::Leaf(mut poor) = node else {
            return Ok(());
        };

        let nb_pn = neighbor.page();
        let Node::Leaf(mut rich) = self.read_node(nb_pn)? else {
            return Err(Error::Corrupted("leaf sibling is not a leaf"));
        };

        // The boundary between the siblings moves by one entry; the
        // parent entry addressing the physically-left node carries it.
        let (left_pn, new_separator) = match neighbor {
            Neighbor::Left(_) => {
                let moved = rich
                    .entries
                    .pop()
                    .ok_or(Error::Corrupted("redistribution from an empty neighbor"))?;
                let separator = moved.key.clone();
                poor.entries.insert(0, moved);
                (nb_pn, separator)
            }
            Neighbor::Right(_) => {
                if rich.entries.len() < 2 {
                    return Err(Error::Corrupted("redistribution from an empty neighbor"));
                }
                let moved = rich.entries.remove(0);
                poor.entries.push(moved);
                (from_pn, rich.entries[0].key.clone())
            }
        };

        self.write_node(nb_pn, &Node::Leaf(rich))?;
        self.write_node(from_pn, &Node::Leaf(poor))?;

        let Node::Internal(mut parent) = self.read_node(ppn)? else {
            return Err(Error::Corrupted("parent page is not an internal node"));
        };
        let entry = parent
            .entries
            .iter_mut()
            .find(|e| e.child == left_pn)
            .ok_or(Error::Corrupted("redistributing siblings share no separator"))?;
        entry.key = new_separator;
        self.write_node(ppn, &Node::Internal(parent))
    }

    // ========================================================================
    // Node I/O helpers
    // ========================================================================

    /// Decode the node at `pn` under a read pin.
    pub(crate) fn read_node(&self, pn: PageId) -> Result<Node> {
        let guard = self.pool.pin_read(pn)?;
        Node::decode(&guard, self.meta.key_type)
    }

    /// Decode the node at `pn`, requiring it to be a leaf.
    pub(crate) fn read_leaf(&self, pn: PageId) -> Result<LeafNode> {
        match self.read_node(pn)? {
            Node::Leaf(leaf) => Ok(leaf),
            Node::Internal(_) => Err(Error::Corrupted("expected a leaf page")),
        }
    }

    /// Encode `node` into the page at `pn` under a write pin.
    pub(crate) fn write_node(&self, pn: PageId, node: &Node) -> Result<()> {
        let mut guard = self.pool.pin_write(pn)?;
        node.encode(&mut guard);
        Ok(())
    }

    /// Append a page holding `node` and count it.
    fn alloc_node(&mut self, node: &Node) -> Result<PageId> {
        let pn = {
            let mut guard = self.pool.append_page()?;
            node.encode(&mut guard);
            guard.page_id()
        };
        self.meta.node_count += 1;
        Ok(pn)
    }

    /// Retire a merged-away node: entries cleared, count decremented.
    ///
    /// The page itself is never reclaimed, and a retired leaf keeps its
    /// next pointer so stale sibling-chain references pass through it.
    fn retire_node(&mut self, pn: PageId) -> Result<()> {
        let mut node = self.read_node(pn)?;
        match &mut node {
            Node::Leaf(leaf) => leaf.entries.clear(),
            Node::Internal(int) => {
                int.entries.clear();
                int.rightmost_child = None;
            }
        }
        self.write_node(pn, &node)?;
        self.meta.node_count -= 1;
        Ok(())
    }

    /// Point the parent link of every child of the node at `pn` back at
    /// `pn`.
    fn reparent_children(&self, pn: PageId) -> Result<()> {
        if let Node::Internal(int) = self.read_node(pn)? {
            for child in int.child_pages() {
                let mut node = self.read_node(child)?;
                node.set_parent(Some(pn));
                self.write_node(child, &node)?;
            }
        }
        Ok(())
    }

    /// The leftmost leaf of the tree, for scans.
    pub(crate) fn leftmost_leaf(&self) -> Result<(PageId, LeafNode)> {
        let mut pn = self.meta.root_page;
        for _ in 0..=MAX_TREE_DEPTH {
            match self.read_node(pn)? {
                Node::Leaf(leaf) => return Ok((pn, leaf)),
                Node::Internal(int) => {
                    pn = int
                        .entries
                        .first()
                        .map(|e| e.child)
                        .or(int.rightmost_child)
                        .ok_or(Error::Corrupted("internal node with no children"))?;
                }
            }
        }
        Err(Error::Corrupted("descent exceeded the tree depth ceiling"))
    }

    fn capacity(&self) -> usize {
        self.meta.order as usize
    }

    fn min_keys(&self) -> usize {
        split_point(self.meta.order)
    }
}

/// Remove an entry from a node, by key or — for internal nodes — by
/// child identity.
///
/// Returns the removed slot, or `None` when an internal node held
/// neither the key nor the child.
///
/// For internal nodes a position-0 key-match removal keeps the leading
/// child pointer: slot 0 addresses the leftmost subtree regardless of
/// which separator bounds it. Removing the rightmost child drops the
/// last separator and makes its child the new rightmost.
///
/// # Panics
/// A leaf miss panics: the search engine located this key in this leaf,
/// so the two engines disagreeing is a logic error, not a recoverable
/// condition.
fn remove_key_or_child(node: &mut Node, child: PageId, key: &Key) -> Option<usize> {
    match node {
        Node::Leaf(leaf) => {
            let pos = leaf
                .entries
                .iter()
                .position(|e| e.key == *key)
                .unwrap_or_else(|| panic!("leaf delete missed a key the search located"));
            leaf.entries.remove(pos);
            Some(pos)
        }
        Node::Internal(int) => {
            if let Some(pos) = int
                .entries
                .iter()
                .position(|e| e.key == *key || e.child == child)
            {
                let matched_key = int.entries[pos].key == *key;
                if pos == 0 && matched_key && int.entries.len() > 1 {
                    let keep = int.entries[0].child;
                    int.entries.remove(0);
                    int.entries[0].child = keep;
                } else {
                    int.entries.remove(pos);
                }
                return Some(pos);
            }

            if int.rightmost_child == Some(child) {
                if let Some(last) = int.entries.pop() {
                    int.rightmost_child = Some(last.child);
                    return Some(int.entries.len() + 1);
                }
            }

            None
        }
    }
}
