//! On-page B+-tree node image.

use bytes::{Buf, BufMut};
use common::{DbError, DbResult, PageId};
use storage::{Page, PageType, PAGE_PAYLOAD_SIZE};

/// A node is full (and must split before descent) at this many keys.
pub const MAX_KEYS: usize = 100;
/// Post-split lower bound; splits at the median never go below it.
pub const MIN_KEYS: usize = 50;

/// Fixed part of the node image: is_leaf, num_keys, num_children,
/// next_leaf, prev_leaf.
const NODE_HEADER_SIZE: usize = 1 + 2 + 2 + 4 + 4;

/// Decoded B+-tree node.
///
/// Leaves keep `keys` and `values` aligned (`children` empty); internal
/// nodes keep `keys.len() + 1` entries in `children` (`values` empty).
///
/// `next_leaf`/`prev_leaf` carry the leaf chain as explicit options, so
/// walks test "is there a neighbour?" on the type, never on a sentinel
/// page id. On disk each link is a raw `u32` with 0 meaning "none", which
/// cannot name page 0; [`Node::write_to`] therefore rejects a `next_leaf`
/// of page 0 outright (splits only ever link to freshly allocated pages,
/// so a leaf stored at page 0 stays the leftmost leaf). A `prev_leaf` of
/// page 0 does arise when that leftmost leaf splits; it collapses to the
/// sentinel on disk and decodes as `None`. Forward walks never read
/// `prev_leaf`, so the collapse is not observable through any scan.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub page_id: PageId,
    pub is_leaf: bool,
    pub keys: Vec<Vec<u8>>,
    pub values: Vec<u64>,
    pub children: Vec<PageId>,
    pub next_leaf: Option<PageId>,
    pub prev_leaf: Option<PageId>,
}

impl Node {
    pub fn new_leaf(page_id: PageId) -> Self {
        Self {
            page_id,
            is_leaf: true,
            keys: Vec::new(),
            values: Vec::new(),
            children: Vec::new(),
            next_leaf: None,
            prev_leaf: None,
        }
    }

    pub fn new_internal(page_id: PageId) -> Self {
        Self {
            page_id,
            is_leaf: false,
            keys: Vec::new(),
            values: Vec::new(),
            children: Vec::new(),
            next_leaf: None,
            prev_leaf: None,
        }
    }

    pub fn num_keys(&self) -> usize {
        self.keys.len()
    }

    pub fn is_full(&self) -> bool {
        self.keys.len() >= MAX_KEYS
    }

    /// Exact size of the serialized image.
    pub fn serialized_size(&self) -> usize {
        let keys: usize = self.keys.iter().map(|k| 2 + k.len()).sum();
        let tail = if self.is_leaf {
            8 * self.values.len()
        } else {
            4 * self.children.len()
        };
        NODE_HEADER_SIZE + keys + tail
    }

    /// Serialize into the page payload, setting the page type to match the
    /// node shape. Rejects images that do not fit.
    pub fn write_to(&self, page: &mut Page) -> DbResult<()> {
        let size = self.serialized_size();
        if size > PAGE_PAYLOAD_SIZE {
            return Err(DbError::NodeOverflow { size });
        }
        // The on-disk link encoding reserves 0 for "none", so page 0 is
        // unnameable as a successor.
        if self.next_leaf == Some(PageId(0)) {
            return Err(DbError::CorruptPage {
                page: self.page_id.0,
                reason: "page 0 cannot be a leaf successor".into(),
            });
        }

        page.set_page_type(if self.is_leaf {
            PageType::BTreeLeaf
        } else {
            PageType::BTreeInternal
        });

        let payload = page.payload_mut();
        payload.fill(0);
        let mut buf = &mut payload[..];
        buf.put_u8(u8::from(self.is_leaf));
        buf.put_u16_le(self.keys.len() as u16);
        buf.put_u16_le(self.children.len() as u16);
        buf.put_u32_le(link_to_raw(self.next_leaf));
        buf.put_u32_le(link_to_raw(self.prev_leaf));
        for key in &self.keys {
            buf.put_u16_le(key.len() as u16);
            buf.put_slice(key);
        }
        if self.is_leaf {
            for value in &self.values {
                buf.put_u64_le(*value);
            }
        } else {
            for child in &self.children {
                buf.put_u32_le(child.0);
            }
        }
        Ok(())
    }

    /// Decode a node from a B+-tree page.
    pub fn read_from(page: &Page) -> DbResult<Self> {
        let corrupt = |reason: String| DbError::CorruptPage {
            page: page.id().0,
            reason,
        };
        if !matches!(
            page.page_type(),
            PageType::BTreeLeaf | PageType::BTreeInternal
        ) {
            return Err(corrupt(format!(
                "expected a b+tree page, found {:?}",
                page.page_type()
            )));
        }

        let mut buf = page.payload();
        if buf.remaining() < NODE_HEADER_SIZE {
            return Err(corrupt("truncated node header".into()));
        }
        let is_leaf = buf.get_u8() != 0;
        let num_keys = buf.get_u16_le() as usize;
        let num_children = buf.get_u16_le() as usize;
        let next_leaf = link_from_raw(buf.get_u32_le());
        let prev_leaf = link_from_raw(buf.get_u32_le());

        if !is_leaf && num_children != num_keys + 1 {
            return Err(corrupt(format!(
                "internal node has {num_keys} keys but {num_children} children"
            )));
        }

        let mut keys = Vec::with_capacity(num_keys);
        for _ in 0..num_keys {
            if buf.remaining() < 2 {
                return Err(corrupt("truncated key length".into()));
            }
            let len = buf.get_u16_le() as usize;
            if buf.remaining() < len {
                return Err(corrupt("truncated key bytes".into()));
            }
            keys.push(buf[..len].to_vec());
            buf.advance(len);
        }

        let mut values = Vec::new();
        let mut children = Vec::new();
        if is_leaf {
            if buf.remaining() < 8 * num_keys {
                return Err(corrupt("truncated leaf values".into()));
            }
            values.reserve(num_keys);
            for _ in 0..num_keys {
                values.push(buf.get_u64_le());
            }
        } else {
            if buf.remaining() < 4 * num_children {
                return Err(corrupt("truncated child pointers".into()));
            }
            children.reserve(num_children);
            for _ in 0..num_children {
                children.push(PageId(buf.get_u32_le()));
            }
        }

        Ok(Self {
            page_id: page.id(),
            is_leaf,
            keys,
            values,
            children,
            next_leaf,
            prev_leaf,
        })
    }
}

fn link_to_raw(link: Option<PageId>) -> u32 {
    link.map_or(0, |page| page.0)
}

fn link_from_raw(raw: u32) -> Option<PageId> {
    if raw == 0 {
        None
    } else {
        Some(PageId(raw))
    }
}
