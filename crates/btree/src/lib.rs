//! Disk-backed B+-tree: an ordered map from byte keys to u64 values.
//!
//! Nodes live in pager pages. Inserts split proactively on the way down, so
//! the parent of any splitting node is already on the descent path and never
//! full itself. Leaves are doubly linked in key order for range scans.

mod node;


pub use node::{Node, MAX_KEYS, MIN_KEYS};

use buffer::Pager;
use common::{DbResult, PageId};
use log::trace;
use storage::PageType;

/// Bounds behavior for [`BTree::scan_range`] and [`BTree::range_iter`].
#[derive(Clone, Copy, Debug)]
pub struct RangeOptions {
    pub start_inclusive: bool,
    pub end_inclusive: bool,
    /// Maximum results; 0 means unbounded.
    pub limit: usize,
}

impl Default for RangeOptions {
    fn default() -> Self {
        Self {
            start_inclusive: true,
            end_inclusive: true,
            limit: 0,
        }
    }
}

/// Handle to one tree. The root moves when the root splits, so owners must
/// re-read [`BTree::root`] when persisting tree metadata.
#[derive(Debug)]
pub struct BTree {
    root: PageId,
}

impl BTree {
    /// Allocate an empty tree: a single leaf root.
    pub fn create(pager: &mut Pager) -> DbResult<Self> {
        let root = pager.allocate_page(PageType::BTreeLeaf)?;
        let node = Node::new_leaf(root);
        node.write_to(pager.get_page_mut(root)?)?;
        Ok(Self { root })
    }

    /// Reattach to a tree whose root page is known from the catalog.
    pub fn open(root: PageId) -> Self {
        Self { root }
    }

    pub fn root(&self) -> PageId {
        self.root
    }

    /// Point lookup. Returns the value of the last insert for `key`.
    pub fn search(&self, pager: &mut Pager, key: &[u8]) -> DbResult<Option<u64>> {
        let leaf = self.find_leaf(pager, Some(key))?;
        match leaf.keys.binary_search_by(|k| k.as_slice().cmp(key)) {
            Ok(idx) => Ok(Some(leaf.values[idx])),
            Err(_) => Ok(None),
        }
    }

    /// Insert or overwrite. Splits every full node met on the descent.
    pub fn insert(&mut self, pager: &mut Pager, key: &[u8], value: u64) -> DbResult<()> {
        let mut current = self.read_node(pager, self.root)?;

        if current.is_full() {
            // Grow a new root above the old one, then split the old root
            // as its only child.
            let new_root_id = pager.allocate_page(PageType::BTreeInternal)?;
            let mut new_root = Node::new_internal(new_root_id);
            new_root.children.push(current.page_id);
            self.split_child(pager, &mut new_root, 0, current)?;
            trace!("root split, new root page {}", new_root_id.0);
            self.root = new_root_id;
            current = new_root;
        }

        loop {
            if current.is_leaf {
                match current.keys.binary_search_by(|k| k.as_slice().cmp(key)) {
                    Ok(idx) => current.values[idx] = value,
                    Err(idx) => {
                        current.keys.insert(idx, key.to_vec());
                        current.values.insert(idx, value);
                    }
                }
                let page_id = current.page_id;
                current.write_to(pager.get_page_mut(page_id)?)?;
                return Ok(());
            }

            let mut idx = Self::child_index(&current, key);
            let child = self.read_node(pager, current.children[idx])?;
            if child.is_full() {
                self.split_child(pager, &mut current, idx, child)?;
                // The new separator may shift which side the key belongs to.
                idx = Self::child_index(&current, key);
            }
            current = self.read_node(pager, current.children[idx])?;
        }
    }

    /// All pairs in ascending key order.
    pub fn scan(&self, pager: &mut Pager) -> DbResult<Vec<(Vec<u8>, u64)>> {
        self.scan_range(pager, None, None, RangeOptions::default())
    }

    /// Pairs within `[start, end]` honoring the inclusiveness flags, in
    /// ascending order, at most `limit` of them (0 = all).
    pub fn scan_range(
        &self,
        pager: &mut Pager,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        opts: RangeOptions,
    ) -> DbResult<Vec<(Vec<u8>, u64)>> {
        let mut out = Vec::new();
        let mut iter = self.range_iter(pager, start, end, opts)?;
        while let Some(entry) = iter.next_entry()? {
            out.push(entry);
        }
        Ok(out)
    }

    /// Lazy cursor over a key range. Key bytes are copied out on each
    /// advance, so the cursor never aliases cached page memory.
    pub fn range_iter<'p>(
        &self,
        pager: &'p mut Pager,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        opts: RangeOptions,
    ) -> DbResult<RangeIter<'p>> {
        // An inverted range is empty before any page is touched.
        if let (Some(lo), Some(hi)) = (start, end) {
            if lo > hi {
                return Ok(RangeIter::empty(pager, opts));
            }
        }

        let leaf = self.find_leaf(pager, start)?;
        let mut idx = match start {
            Some(key) => {
                if opts.start_inclusive {
                    leaf.keys.partition_point(|k| k.as_slice() < key)
                } else {
                    leaf.keys.partition_point(|k| k.as_slice() <= key)
                }
            }
            None => 0,
        };

        // The first qualifying position may sit in the next leaf. Every key
        // there is strictly past `start` (equal keys would have descended
        // into that leaf), so no further bound check is needed.
        let mut position = Some(leaf);
        if let Some(node) = position.take() {
            if idx < node.keys.len() {
                position = Some(node);
            } else if let Some(next) = node.next_leaf {
                position = Some(self.read_node(pager, next)?);
                idx = 0;
            }
        }

        Ok(RangeIter {
            pager,
            node: position,
            idx,
            end: end.map(|e| e.to_vec()),
            end_inclusive: opts.end_inclusive,
            limit: opts.limit,
            yielded: 0,
        })
    }

    /// Separator rule: `keys[i]` is the smallest key reachable from
    /// `children[i + 1]`, so a key equal to the separator descends right.
    fn child_index(node: &Node, key: &[u8]) -> usize {
        let idx = node.keys.partition_point(|k| k.as_slice() <= key);
        idx.min(node.children.len() - 1)
    }

    /// Walk to the leaf that would contain `key` (leftmost leaf for `None`).
    fn find_leaf(&self, pager: &mut Pager, key: Option<&[u8]>) -> DbResult<Node> {
        let mut current = self.read_node(pager, self.root)?;
        while !current.is_leaf {
            let idx = match key {
                Some(key) => Self::child_index(&current, key),
                None => 0,
            };
            current = self.read_node(pager, current.children[idx])?;
        }
        Ok(current)
    }

    /// Split the full `child` (already read) at `parent.children[idx]`.
    ///
    /// Leaf split copies the median key up (it stays as the right sibling's
    /// first key); internal split moves the median up.
    fn split_child(
        &self,
        pager: &mut Pager,
        parent: &mut Node,
        idx: usize,
        mut child: Node,
    ) -> DbResult<()> {
        let mid = child.num_keys() / 2;

        let (separator, sibling) = if child.is_leaf {
            let sibling_id = pager.allocate_page(PageType::BTreeLeaf)?;
            let mut sibling = Node::new_leaf(sibling_id);
            sibling.keys = child.keys.split_off(mid);
            sibling.values = child.values.split_off(mid);
            let separator = sibling.keys[0].clone();

            // Rewire the doubly linked leaf chain around the new sibling.
            sibling.next_leaf = child.next_leaf;
            sibling.prev_leaf = Some(child.page_id);
            if let Some(next_id) = child.next_leaf {
                let mut next = self.read_node(pager, next_id)?;
                next.prev_leaf = Some(sibling_id);
                next.write_to(pager.get_page_mut(next_id)?)?;
            }
            child.next_leaf = Some(sibling_id);

            (separator, sibling)
        } else {
            let sibling_id = pager.allocate_page(PageType::BTreeInternal)?;
            let mut sibling = Node::new_internal(sibling_id);
            let separator = child.keys[mid].clone();
            sibling.keys = child.keys.split_off(mid + 1);
            sibling.children = child.children.split_off(mid + 1);
            // Drop the separator from the left half: it moves up.
            child.keys.truncate(mid);

            (separator, sibling)
        };

        trace!(
            "split {} page {} into page {}",
            if child.is_leaf { "leaf" } else { "internal" },
            child.page_id.0,
            sibling.page_id.0
        );

        parent.keys.insert(idx, separator);
        parent.children.insert(idx + 1, sibling.page_id);

        child.write_to(pager.get_page_mut(child.page_id)?)?;
        sibling.write_to(pager.get_page_mut(sibling.page_id)?)?;
        parent.write_to(pager.get_page_mut(parent.page_id)?)?;
        Ok(())
    }

    fn read_node(&self, pager: &mut Pager, id: PageId) -> DbResult<Node> {
        Node::read_from(pager.get_page(id)?)
    }
}

/// Lazy single-advance cursor produced by [`BTree::range_iter`].
pub struct RangeIter<'p> {
    pager: &'p mut Pager,
    /// Current leaf, or `None` once exhausted or closed. Carrying the
    /// decoded node (not a raw next pointer) as the walk state keeps "no
    /// more leaves" distinct from every page id value.
    node: Option<Node>,
    idx: usize,
    end: Option<Vec<u8>>,
    end_inclusive: bool,
    limit: usize,
    yielded: usize,
}

impl<'p> RangeIter<'p> {
    fn empty(pager: &'p mut Pager, opts: RangeOptions) -> Self {
        Self {
            pager,
            node: None,
            idx: 0,
            end: None,
            end_inclusive: opts.end_inclusive,
            limit: opts.limit,
            yielded: 0,
        }
    }

    /// Advance one entry, copying the key bytes out.
    pub fn next_entry(&mut self) -> DbResult<Option<(Vec<u8>, u64)>> {
        loop {
            if self.limit != 0 && self.yielded >= self.limit {
                self.node = None;
                return Ok(None);
            }

            // "More to read?" is the link option itself: `None` ends the
            // walk, so no page id ever doubles as a stop sentinel.
            let step = match &self.node {
                None => return Ok(None),
                Some(node) if self.idx >= node.keys.len() => Some(node.next_leaf),
                Some(_) => None,
            };
            match step {
                Some(None) => {
                    self.node = None;
                    return Ok(None);
                }
                Some(Some(next)) => {
                    let node = Node::read_from(self.pager.get_page(next)?)?;
                    self.node = Some(node);
                    self.idx = 0;
                    continue;
                }
                None => {}
            }

            let entry = match &self.node {
                Some(node) => {
                    let key = &node.keys[self.idx];
                    let past_end = match &self.end {
                        Some(end) => {
                            if self.end_inclusive {
                                key.as_slice() > end.as_slice()
                            } else {
                                key.as_slice() >= end.as_slice()
                            }
                        }
                        None => false,
                    };
                    if past_end {
                        None
                    } else {
                        Some((key.clone(), node.values[self.idx]))
                    }
                }
                None => None,
            };

            return match entry {
                Some(entry) => {
                    self.idx += 1;
                    self.yielded += 1;
                    Ok(Some(entry))
                }
                None => {
                    self.node = None;
                    Ok(None)
                }
            };
        }
    }

    /// Drop the cursor state; every later `next_entry` returns `None`.
    pub fn close(&mut self) {
        self.node = None;
    }
}
