//! Buffer pool manager for page-level caching and I/O.
//!
//! The pager owns the database file handle and is the only component that
//! reads or writes it. Pages are cached in an LRU map; dirty pages are
//! written back (and synced) before eviction and on explicit flush.
//!
//! # Example
//!
//! ```no_run
//! use buffer::Pager;
//! use common::Config;
//! use storage::PageType;
//!
//! let mut pager = Pager::open("/tmp/demo.db".as_ref(), &Config::default()).unwrap();
//! let pid = pager.allocate_page(PageType::Data).unwrap();
//! pager.get_page_mut(pid).unwrap().append_record(b"hello").unwrap();
//! pager.flush_all().unwrap();
//! ```

#[cfg(test)]
mod tests;

use common::{Config, DbError, DbResult, PageId, PAGE_SIZE};
use log::debug;
use lru::LruCache;
use std::{
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    num::NonZeroUsize,
    path::Path,
};
use storage::{Page, PageType};

/// Single-file buffer pool with LRU eviction.
///
/// `page_count` tracks how many pages the file logically holds, including
/// freshly allocated pages that have not been flushed yet; fetching past it
/// is a `PageOutOfRange` error rather than silent file growth.
#[derive(Debug)]
pub struct Pager {
    file: File,
    page_count: u32,
    cache: LruCache<PageId, Page>,
    max_pages: usize,
}

impl Pager {
    /// Open (or create) the database file.
    ///
    /// # Panics
    ///
    /// Panics if `config.cache_pages` is 0.
    pub fn open(path: &Path, config: &Config) -> DbResult<Self> {
        assert!(config.cache_pages > 0, "cache_pages must be > 0");

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let file_len = file.metadata()?.len();
        if file_len % PAGE_SIZE as u64 != 0 {
            return Err(DbError::CorruptPage {
                page: (file_len / PAGE_SIZE as u64) as u32,
                reason: format!("file length {file_len} is not page aligned"),
            });
        }
        let page_count = (file_len / PAGE_SIZE as u64) as u32;

        Ok(Self {
            file,
            page_count,
            cache: LruCache::new(NonZeroUsize::new(config.cache_pages).unwrap()),
            max_pages: config.cache_pages,
        })
    }

    /// Number of pages the file logically holds.
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Number of pages currently resident in the cache.
    pub fn cached_pages(&self) -> usize {
        self.cache.len()
    }

    /// True if the page is resident (does not disturb LRU order).
    pub fn is_cached(&self, id: PageId) -> bool {
        self.cache.contains(&id)
    }

    /// Fetch a page for reading. Promotes it to the LRU front.
    pub fn get_page(&mut self, id: PageId) -> DbResult<&Page> {
        self.admit(id)?;
        // Just admitted or already resident; either way it is in the cache.
        self.cache
            .get(&id)
            .ok_or_else(|| DbError::CorruptPage {
                page: id.0,
                reason: "page vanished from cache".into(),
            })
    }

    /// Fetch a page for writing. Promotes it and marks it dirty.
    pub fn get_page_mut(&mut self, id: PageId) -> DbResult<&mut Page> {
        self.admit(id)?;
        let page = self
            .cache
            .get_mut(&id)
            .ok_or_else(|| DbError::CorruptPage {
                page: id.0,
                reason: "page vanished from cache".into(),
            })?;
        page.mark_dirty();
        Ok(page)
    }

    /// Allocate a fresh page at the end of the file. The page exists only in
    /// the cache (dirty) until flushed.
    pub fn allocate_page(&mut self, page_type: PageType) -> DbResult<PageId> {
        let id = PageId(self.page_count);
        self.page_count += 1;

        let page = Page::new(id, page_type);
        self.evict_if_needed()?;
        self.cache.push(id, page);
        Ok(id)
    }

    /// Write one page back if it is resident and dirty.
    pub fn flush_page(&mut self, id: PageId) -> DbResult<()> {
        let image = match self.cache.peek_mut(&id) {
            Some(page) if page.is_dirty() => {
                let image = page.to_bytes();
                page.clear_dirty();
                image
            }
            _ => return Ok(()),
        };
        self.write_image(id, &image)?;
        self.file.sync_all()?;
        Ok(())
    }

    /// Write every dirty cached page at its natural offset, then sync.
    pub fn flush_all(&mut self) -> DbResult<()> {
        let mut flushed = 0usize;
        let dirty_ids: Vec<PageId> = self
            .cache
            .iter()
            .filter(|(_, page)| page.is_dirty())
            .map(|(id, _)| *id)
            .collect();

        for id in dirty_ids {
            let image = match self.cache.peek_mut(&id) {
                Some(page) => {
                    let image = page.to_bytes();
                    page.clear_dirty();
                    image
                }
                None => continue,
            };
            self.write_image(id, &image)?;
            flushed += 1;
        }

        if flushed > 0 {
            self.file.sync_all()?;
        }
        debug!("flushed {flushed} dirty pages");
        Ok(())
    }

    /// Flush everything and release the file handle.
    pub fn close(mut self) -> DbResult<()> {
        self.flush_all()
    }

    /// Load `id` into the cache if it is not already resident.
    fn admit(&mut self, id: PageId) -> DbResult<()> {
        if self.cache.contains(&id) {
            return Ok(());
        }
        if id.0 >= self.page_count {
            return Err(DbError::PageOutOfRange {
                page: id.0,
                page_count: self.page_count,
            });
        }

        let page = self.read_page(id)?;
        self.evict_if_needed()?;
        self.cache.push(id, page);
        Ok(())
    }

    fn read_page(&mut self, id: PageId) -> DbResult<Page> {
        let offset = u64::from(id.0) * PAGE_SIZE as u64;
        self.file.seek(SeekFrom::Start(offset))?;

        let mut buf = vec![0u8; PAGE_SIZE];
        self.file.read_exact(&mut buf)?;
        Page::from_bytes(id, &buf)
    }

    /// Make room for one admission, writing and syncing a dirty victim
    /// before it leaves the cache.
    fn evict_if_needed(&mut self) -> DbResult<()> {
        if self.cache.len() < self.max_pages {
            return Ok(());
        }

        if let Some((id, page)) = self.cache.pop_lru() {
            if page.is_dirty() {
                debug!("evicting dirty page {}", id.0);
                let image = page.to_bytes();
                self.write_image(id, &image)?;
                self.file.sync_all()?;
            }
        }
        Ok(())
    }

    fn write_image(&mut self, id: PageId, image: &[u8]) -> DbResult<()> {
        let offset = u64::from(id.0) * PAGE_SIZE as u64;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(image)?;
        Ok(())
    }
}
