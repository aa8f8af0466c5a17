use bytes::{Buf, BufMut};
use common::{DbError, DbResult, PageId, PAGE_SIZE};

/// Bytes reserved for the page header: id, type, slot count, free offset,
/// plus 7 reserved bytes (zero on write, ignored on read).
pub const PAGE_HEADER_SIZE: usize = 16;

/// Bytes available to page content after the header.
pub const PAGE_PAYLOAD_SIZE: usize = PAGE_SIZE - PAGE_HEADER_SIZE;

/// What a page holds. The discriminants are the on-disk `page_type` byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageType {
    Free = 0,
    Data = 1,
    BTreeInternal = 2,
    BTreeLeaf = 3,
}

impl PageType {
    fn from_u8(raw: u8, page: u32) -> DbResult<Self> {
        match raw {
            0 => Ok(PageType::Free),
            1 => Ok(PageType::Data),
            2 => Ok(PageType::BTreeInternal),
            3 => Ok(PageType::BTreeLeaf),
            other => Err(DbError::CorruptPage {
                page,
                reason: format!("unknown page type {other}"),
            }),
        }
    }
}

/// A fixed-size block: 16-byte header plus a payload region.
///
/// Data pages treat the payload as an append-only sequence of
/// length-prefixed records; `num_slots` counts appends and `free_offset` is
/// where the next record starts. B+-tree pages lay their node image over the
/// payload directly and leave both header counters at zero.
#[derive(Clone, Debug)]
pub struct Page {
    id: PageId,
    page_type: PageType,
    num_slots: u16,
    free_offset: u16,
    payload: Box<[u8]>,
    dirty: bool,
}

impl Page {
    /// A fresh, empty page. New pages start dirty: they exist only in memory
    /// until the pager flushes them.
    pub fn new(id: PageId, page_type: PageType) -> Self {
        Self {
            id,
            page_type,
            num_slots: 0,
            free_offset: 0,
            payload: vec![0u8; PAGE_PAYLOAD_SIZE].into_boxed_slice(),
            dirty: true,
        }
    }

    /// Decode a page from its exact 4096-byte on-disk image.
    pub fn from_bytes(expected_id: PageId, bytes: &[u8]) -> DbResult<Self> {
        if bytes.len() != PAGE_SIZE {
            return Err(DbError::CorruptPage {
                page: expected_id.0,
                reason: format!("page image is {} bytes, want {}", bytes.len(), PAGE_SIZE),
            });
        }

        let mut header = &bytes[..PAGE_HEADER_SIZE];
        let id = header.get_u32_le();
        let page_type = PageType::from_u8(header.get_u8(), expected_id.0)?;
        let num_slots = header.get_u16_le();
        let free_offset = header.get_u16_le();

        if id != expected_id.0 {
            return Err(DbError::CorruptPage {
                page: expected_id.0,
                reason: format!("header claims page id {id}"),
            });
        }
        if free_offset as usize > PAGE_PAYLOAD_SIZE {
            return Err(DbError::CorruptPage {
                page: id,
                reason: format!("free offset {free_offset} past payload end"),
            });
        }

        let mut payload = vec![0u8; PAGE_PAYLOAD_SIZE].into_boxed_slice();
        payload.copy_from_slice(&bytes[PAGE_HEADER_SIZE..]);

        Ok(Self {
            id: PageId(id),
            page_type,
            num_slots,
            free_offset,
            payload,
            dirty: false,
        })
    }

    /// Serialize to the exact 4096-byte on-disk image.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(PAGE_SIZE);
        buf.put_u32_le(self.id.0);
        buf.put_u8(self.page_type as u8);
        buf.put_u16_le(self.num_slots);
        buf.put_u16_le(self.free_offset);
        buf.put_bytes(0, 7);
        buf.extend_from_slice(&self.payload);
        debug_assert_eq!(buf.len(), PAGE_SIZE);
        buf
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    pub fn page_type(&self) -> PageType {
        self.page_type
    }

    pub fn set_page_type(&mut self, page_type: PageType) {
        self.page_type = page_type;
        self.dirty = true;
    }

    pub fn num_slots(&self) -> u16 {
        self.num_slots
    }

    pub fn free_offset(&self) -> u16 {
        self.free_offset
    }

    /// Payload bytes still available for appends.
    pub fn free_space(&self) -> usize {
        PAGE_PAYLOAD_SIZE - self.free_offset as usize
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Read-only view of the payload region (B+-tree node image).
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Mutable payload view; the page is assumed modified.
    pub fn payload_mut(&mut self) -> &mut [u8] {
        self.dirty = true;
        &mut self.payload
    }

    /// Drop all content and start over as `page_type`. Used when a fixed
    /// region (the catalog) rewrites itself in place.
    pub fn reset(&mut self, page_type: PageType) {
        self.page_type = page_type;
        self.num_slots = 0;
        self.free_offset = 0;
        self.payload.fill(0);
        self.dirty = true;
    }

    /// Append a length-prefixed record, returning the payload offset of its
    /// 2-byte length prefix.
    pub fn append_record(&mut self, record: &[u8]) -> DbResult<u16> {
        if record.len() > u16::MAX as usize {
            return Err(DbError::CorruptPage {
                page: self.id.0,
                reason: format!("record of {} bytes exceeds u16 length prefix", record.len()),
            });
        }
        if self.free_space() < record.len() + 2 {
            return Err(DbError::CorruptPage {
                page: self.id.0,
                reason: "append past page capacity".into(),
            });
        }

        let offset = self.free_offset;
        let start = offset as usize;
        self.payload[start..start + 2].copy_from_slice(&(record.len() as u16).to_le_bytes());
        self.payload[start + 2..start + 2 + record.len()].copy_from_slice(record);

        self.num_slots += 1;
        self.free_offset += 2 + record.len() as u16;
        self.dirty = true;
        Ok(offset)
    }

    /// Fetch the record whose length prefix sits at `offset`.
    pub fn record_at(&self, offset: u32) -> DbResult<&[u8]> {
        let start = offset as usize;
        if start + 2 > self.free_offset as usize {
            return Err(DbError::CorruptPage {
                page: self.id.0,
                reason: format!("record offset {offset} past free offset"),
            });
        }
        let len = u16::from_le_bytes([self.payload[start], self.payload[start + 1]]) as usize;
        let end = start + 2 + len;
        if end > self.free_offset as usize {
            return Err(DbError::CorruptPage {
                page: self.id.0,
                reason: format!("record at {offset} runs past free offset"),
            });
        }
        Ok(&self.payload[start + 2..end])
    }

    /// Iterate the records of a data page in physical order.
    pub fn records(&self) -> RecordIter<'_> {
        RecordIter {
            page: self,
            offset: 0,
            remaining: self.num_slots,
        }
    }
}

/// Walks a data page's records front to back.
pub struct RecordIter<'a> {
    page: &'a Page,
    offset: u32,
    remaining: u16,
}

impl<'a> Iterator for RecordIter<'a> {
    /// `(offset_of_length_prefix, record_bytes)`
    type Item = DbResult<(u32, &'a [u8])>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let offset = self.offset;
        match self.page.record_at(offset) {
            Ok(record) => {
                self.offset += 2 + record.len() as u32;
                Some(Ok((offset, record)))
            }
            Err(e) => {
                self.remaining = 0;
                Some(Err(e))
            }
        }
    }
}
