//! IRT Segment Tests - Cookie Stacking and Bulk Discard
//!
//! Segments mirror native call frames. These tests verify:
//! - LIFO discard on pop
//! - hole accounting across nested segments
//! - removal bounded by the segment bottom

mod common;

use common::{assert_consistent, local_table, obj};
use irt::{Cookie, LocalScope};

/// Inner segment handles die with the segment; outer ones survive
#[test]
fn test_lifo_bulk_discard() {
    let mut table = local_table(4, 64);
    let c1 = table.push_segment();
    let outer: Vec<_> = (0..5).map(|i| table.add(c1, obj(i))).collect();
    let before = table.entry_count();

    let c2 = table.push_segment();
    let inner: Vec<_> = (10..17).map(|i| table.add(c2, obj(i))).collect();
    table.pop_segment(c2);

    assert_eq!(table.entry_count(), before);
    for h in inner {
        assert!(table.get(h).is_err());
    }
    for (i, h) in outer.into_iter().enumerate() {
        assert_eq!(table.get(h).unwrap(), obj(i));
    }
}

#[test]
fn test_three_deep_nesting() {
    let mut table = local_table(2, 64);
    let mut issued = Vec::new();

    let c1 = table.push_segment();
    let a: Vec<_> = (0..2).map(|i| table.add(c1, obj(i))).collect();
    issued.extend(&a);

    let c2 = table.push_segment();
    let b: Vec<_> = (10..13).map(|i| table.add(c2, obj(i))).collect();
    issued.extend(&b);
    assert!(table.remove(c2, b[1]));

    let c3 = table.push_segment();
    assert_eq!(c3.top_index(), 5);
    assert_eq!(c3.hole_count(), 1);
    let c = [table.append_fast(c3, obj(20)), table.add(c3, obj(21))];
    issued.extend(&c);
    assert_eq!(c[1].index(), 6, "outer hole must not be reused");

    table.pop_segment(c3);
    assert!(c.iter().all(|h| table.get(*h).is_err()));
    assert_eq!(table.get(b[0]).unwrap(), obj(10));
    assert_eq!(table.get(b[2]).unwrap(), obj(12));
    assert_eq!(table.entry_count(), 5);
    assert_eq!(table.hole_count(), 1);

    table.pop_segment(c2);
    assert!(b.iter().all(|h| table.get(*h).is_err()));
    assert_eq!(table.get(a[1]).unwrap(), obj(1));
    assert_eq!(table.entry_count(), 2);
    assert_eq!(table.hole_count(), 0);

    table.pop_segment(c1);
    assert_eq!(table.entry_count(), 0);
    for h in issued {
        assert!(table.get(h).is_err(), "{:?} outlived its segment", h);
    }
    assert_consistent(&table);
}

/// Holes in an enclosing segment are never filled from an inner one
#[test]
fn test_inner_segment_ignores_outer_holes() {
    let mut table = local_table(16, 16);
    let outer = table.push_segment();
    let handles: Vec<_> = (0..4).map(|i| table.add(outer, obj(i))).collect();
    assert!(table.remove(outer, handles[0]));
    assert!(table.remove(outer, handles[2]));

    let inner = table.push_segment();
    let a = table.add(inner, obj(10));
    let b = table.add(inner, obj(11));
    assert_eq!(a.index(), 4);
    assert_eq!(b.index(), 5);
    assert_eq!(table.hole_count(), 2);

    table.pop_segment(inner);
    let c = table.add(outer, obj(12));
    assert_eq!(c.index(), 2);
    assert_consistent(&table);
}

/// Compaction stops at the bottom of the current segment
#[test]
fn test_top_removal_does_not_cross_segment_bottom() {
    let mut table = local_table(16, 16);
    let outer = table.push_segment();
    table.add(outer, obj(0));
    let x = table.add(outer, obj(1));
    table.add(outer, obj(2));
    assert!(table.remove(outer, x));

    let inner = table.push_segment();
    let h = table.add(inner, obj(3));
    assert!(table.remove(inner, h));

    assert_eq!(table.entry_count(), 3);
    assert_eq!(table.hole_count(), 1);
    assert_consistent(&table);
}

#[test]
fn test_remove_rejects_outer_segment_handle() {
    let mut table = local_table(8, 8);
    let outer = table.push_segment();
    let a = table.add(outer, obj(1));

    let inner = table.push_segment();
    table.add(inner, obj(2));
    assert!(!table.remove(inner, a));
    assert_eq!(table.get(a).unwrap(), obj(1));

    table.pop_segment(inner);
    assert!(table.remove(outer, a));
}

#[test]
fn test_cookie_raw_round_trip() {
    let mut table = local_table(8, 8);
    let c = table.push_segment();
    table.add(c, obj(1));
    let inner = table.push_segment();

    let restored = Cookie::from_raw(inner.raw());
    assert_eq!(restored, inner);
    table.add(inner, obj(2));
    table.pop_segment(restored);
    assert_eq!(table.entry_count(), 1);
}

/// Repeated native calls reuse the same slots
#[test]
fn test_call_loop_does_not_grow() {
    let mut table = local_table(4, 8);
    let base = table.push_segment();
    table.add(base, obj(0));

    for round in 0..1000 {
        let cookie = table.push_segment();
        let a = table.append_fast(cookie, obj(round));
        let b = table.append_fast(cookie, obj(round + 1));
        assert_eq!(table.get(a).unwrap(), obj(round));
        assert_eq!(table.get(b).unwrap(), obj(round + 1));
        table.pop_segment(cookie);
    }

    assert_eq!(table.entry_count(), 1);
    assert_eq!(table.capacity(), 4);
}

#[test]
fn test_scope_guard_pops_on_panic() {
    let mut table = local_table(4, 8);
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let mut scope = LocalScope::new(&mut table);
        scope.add(obj(1));
        panic!("native call failed");
    }));

    assert!(result.is_err());
    assert_eq!(table.entry_count(), 0);
}
