//! Tests for PageAllocator
//!
//! These tests verify:
//! - Sizes are rounded up to the block size
//! - Fresh pages are appended contiguously at the end of the store
//! - Freed pages are reused first-fit with their recorded size
//! - Freed neighbours are never merged
//! - Live pages never overlap, including under concurrent use

use std::sync::Arc;
use std::thread;

use strata::error::StrataError;
use strata::storage::{Page, PageAllocator};

const BLOCK: u64 = 4096;

// =============================================================================
// Alignment Tests
// =============================================================================

#[test]
fn test_allocate_rounds_up_to_block_size() {
    let allocator = PageAllocator::new(0, BLOCK);

    let page = allocator.allocate(100).unwrap();

    assert_eq!(page, Page::new(0, BLOCK));
}

#[test]
fn test_allocate_exact_multiple_is_not_padded() {
    let allocator = PageAllocator::new(0, BLOCK);

    let page = allocator.allocate(2 * BLOCK).unwrap();

    assert_eq!(page.size, 2 * BLOCK);
}

#[test]
fn test_allocate_zero_gets_one_block() {
    let allocator = PageAllocator::new(0, BLOCK);

    let page = allocator.allocate(0).unwrap();

    assert_eq!(page.size, BLOCK);
}

#[test]
fn test_allocate_appends_contiguously() {
    let allocator = PageAllocator::new(0, BLOCK);

    let a = allocator.allocate(1).unwrap();
    let b = allocator.allocate(BLOCK + 1).unwrap();
    let c = allocator.allocate(1).unwrap();

    assert_eq!(a.offset, 0);
    assert_eq!(b.offset, BLOCK);
    assert_eq!(b.size, 2 * BLOCK);
    assert_eq!(c.offset, 3 * BLOCK);
    assert_eq!(allocator.end_of_store(), 4 * BLOCK);
}

#[test]
fn test_allocate_starts_at_given_end() {
    let allocator = PageAllocator::new(8 * BLOCK, BLOCK);

    let page = allocator.allocate(1).unwrap();

    assert_eq!(page.offset, 8 * BLOCK);
}

#[test]
fn test_allocate_overflow_is_capacity_error() {
    let allocator = PageAllocator::new(0, BLOCK);

    let result = allocator.allocate(u64::MAX);

    assert!(matches!(result, Err(StrataError::Capacity(_))));
    assert_eq!(allocator.end_of_store(), 0);
}

// =============================================================================
// Free List Tests
// =============================================================================

#[test]
fn test_freed_page_is_reused() {
    let allocator = PageAllocator::new(0, BLOCK);

    let a = allocator.allocate(BLOCK).unwrap();
    let _b = allocator.allocate(BLOCK).unwrap();
    allocator.free(a);

    let c = allocator.allocate(BLOCK).unwrap();

    assert_eq!(c, a);
    assert_eq!(allocator.end_of_store(), 2 * BLOCK);
    assert_eq!(allocator.free_pages(), 0);
}

#[test]
fn test_reuse_keeps_recorded_size() {
    let allocator = PageAllocator::new(0, BLOCK);

    let big = allocator.allocate(4 * BLOCK).unwrap();
    allocator.free(big);

    let page = allocator.allocate(1).unwrap();

    // Pages are handed back whole, never split
    assert_eq!(page, big);
    assert_eq!(page.size, 4 * BLOCK);
}

#[test]
fn test_reuse_is_first_fit_in_free_order() {
    let allocator = PageAllocator::new(0, BLOCK);

    let small = allocator.allocate(BLOCK).unwrap();
    let large = allocator.allocate(3 * BLOCK).unwrap();
    let medium = allocator.allocate(2 * BLOCK).unwrap();

    allocator.free(small);
    allocator.free(large);
    allocator.free(medium);

    // First entry with room wins, even if a tighter one follows
    assert_eq!(allocator.reuse(2 * BLOCK), Some(large));
    assert_eq!(allocator.reuse(2 * BLOCK), Some(medium));
    assert_eq!(allocator.reuse(2 * BLOCK), None);
    assert_eq!(allocator.reuse(BLOCK), Some(small));
}

#[test]
fn test_reuse_on_empty_free_list() {
    let allocator = PageAllocator::new(0, BLOCK);

    assert_eq!(allocator.reuse(1), None);
}

#[test]
fn test_adjacent_free_pages_are_not_coalesced() {
    let allocator = PageAllocator::new(0, BLOCK);

    let a = allocator.allocate(BLOCK).unwrap();
    let b = allocator.allocate(BLOCK).unwrap();
    allocator.free(a);
    allocator.free(b);

    assert_eq!(allocator.free_pages(), 2);
    assert_eq!(allocator.free_bytes(), 2 * BLOCK);

    // Two adjacent free blocks cannot satisfy a two-block request
    let c = allocator.allocate(2 * BLOCK).unwrap();
    assert_eq!(c.offset, 2 * BLOCK);
    assert_eq!(allocator.free_pages(), 2);
}

// =============================================================================
// Overlap Tests
// =============================================================================

fn assert_disjoint(pages: &[Page]) {
    for (i, a) in pages.iter().enumerate() {
        for b in &pages[i + 1..] {
            assert!(!a.overlaps(b), "{:?} overlaps {:?}", a, b);
        }
    }
}

#[test]
fn test_live_pages_never_overlap() {
    let allocator = PageAllocator::new(0, BLOCK);
    let mut live = Vec::new();

    for round in 0..50u64 {
        live.push(allocator.allocate((round % 5) * 1000 + 1).unwrap());
        if round % 3 == 0 {
            let victim = live.remove((round as usize * 7) % live.len());
            allocator.free(victim);
        }
    }

    assert_disjoint(&live);
    for page in &live {
        assert_eq!(page.offset % BLOCK, 0);
        assert_eq!(page.size % BLOCK, 0);
        assert!(page.end() <= allocator.end_of_store());
    }
}

#[test]
fn test_concurrent_allocations_do_not_overlap() {
    let allocator = Arc::new(PageAllocator::new(0, BLOCK));

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let allocator = Arc::clone(&allocator);
            thread::spawn(move || {
                let mut kept = Vec::new();
                for i in 0..100u64 {
                    let page = allocator.allocate((t * 100 + i) % 9000 + 1).unwrap();
                    if i % 2 == 0 {
                        allocator.free(page);
                    } else {
                        kept.push(page);
                    }
                }
                kept
            })
        })
        .collect();

    let live: Vec<Page> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();

    assert_eq!(live.len(), 8 * 50);
    assert_disjoint(&live);
}
