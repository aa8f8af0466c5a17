use super::*;
use common::Config;
use std::fs;
use tempfile::tempdir;

fn small_config(cache_pages: usize) -> Config {
    Config::builder().cache_pages(cache_pages).build()
}

#[test]
fn allocate_extends_page_count() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.db");
    let mut pager = Pager::open(&path, &Config::default()).unwrap();

    assert_eq!(pager.page_count(), 0);
    let a = pager.allocate_page(PageType::Data).unwrap();
    let b = pager.allocate_page(PageType::BTreeLeaf).unwrap();
    assert_eq!(a, PageId(0));
    assert_eq!(b, PageId(1));
    assert_eq!(pager.page_count(), 2);
}

#[test]
fn get_page_out_of_range() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.db");
    let mut pager = Pager::open(&path, &Config::default()).unwrap();

    let err = pager.get_page(PageId(0)).unwrap_err();
    assert!(matches!(
        err,
        DbError::PageOutOfRange {
            page: 0,
            page_count: 0
        }
    ));
}

#[test]
fn flush_and_reopen_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.db");

    {
        let mut pager = Pager::open(&path, &Config::default()).unwrap();
        let pid = pager.allocate_page(PageType::Data).unwrap();
        pager
            .get_page_mut(pid)
            .unwrap()
            .append_record(b"durable")
            .unwrap();
        pager.flush_all().unwrap();
    }

    let mut pager = Pager::open(&path, &Config::default()).unwrap();
    assert_eq!(pager.page_count(), 1);
    let page = pager.get_page(PageId(0)).unwrap();
    assert_eq!(page.record_at(0).unwrap(), b"durable");
    assert!(!page.is_dirty());
}

#[test]
fn cache_never_exceeds_capacity() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.db");
    let mut pager = Pager::open(&path, &small_config(4)).unwrap();

    for _ in 0..10 {
        pager.allocate_page(PageType::Data).unwrap();
    }
    assert_eq!(pager.cached_pages(), 4);
    assert_eq!(pager.page_count(), 10);
}

#[test]
fn eviction_picks_least_recently_used() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.db");
    let mut pager = Pager::open(&path, &small_config(2)).unwrap();

    let a = pager.allocate_page(PageType::Data).unwrap();
    let b = pager.allocate_page(PageType::Data).unwrap();

    // Touch `a` so `b` becomes the LRU victim.
    pager.get_page(a).unwrap();
    let c = pager.allocate_page(PageType::Data).unwrap();

    assert!(pager.is_cached(a));
    assert!(!pager.is_cached(b));
    assert!(pager.is_cached(c));
}

#[test]
fn dirty_eviction_writes_through() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.db");
    let mut pager = Pager::open(&path, &small_config(1)).unwrap();

    let a = pager.allocate_page(PageType::Data).unwrap();
    pager
        .get_page_mut(a)
        .unwrap()
        .append_record(b"evicted but safe")
        .unwrap();

    // Admitting a second page evicts (and writes) the first.
    pager.allocate_page(PageType::Data).unwrap();
    assert!(!pager.is_cached(a));

    let bytes = fs::read(&path).unwrap();
    let page = Page::from_bytes(a, &bytes[..PAGE_SIZE]).unwrap();
    assert_eq!(page.record_at(0).unwrap(), b"evicted but safe");
}

#[test]
fn evicted_page_can_be_fetched_again() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.db");
    let mut pager = Pager::open(&path, &small_config(2)).unwrap();

    let first = pager.allocate_page(PageType::Data).unwrap();
    pager
        .get_page_mut(first)
        .unwrap()
        .append_record(b"round trip")
        .unwrap();

    for _ in 0..5 {
        pager.allocate_page(PageType::Data).unwrap();
    }
    assert!(!pager.is_cached(first));

    let page = pager.get_page(first).unwrap();
    assert_eq!(page.record_at(0).unwrap(), b"round trip");
}

#[test]
fn open_rejects_unaligned_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.db");
    fs::write(&path, vec![0u8; PAGE_SIZE + 1]).unwrap();

    let err = Pager::open(&path, &Config::default()).unwrap_err();
    assert!(matches!(err, DbError::CorruptPage { .. }));
}
