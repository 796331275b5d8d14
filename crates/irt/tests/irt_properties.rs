//! IRT Property Tests - Random Operation Sequences Against a Model
//!
//! A model keeps the segment stack and the live handles of each segment.
//! After every operation the table must agree with the model:
//! - every live handle resolves to its object
//! - every removed or discarded handle is rejected
//! - `hole_count` never drops below any active cookie's hole count

mod common;

use common::{local_table, obj};
use irt::{Cookie, IndirectRef, IndirectReferenceTable, ObjectRef};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Add,
    Append,
    Remove(usize),
    RemoveOuter(usize),
    Push,
    Pop,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => Just(Op::Add),
        2 => Just(Op::Append),
        4 => any::<usize>().prop_map(Op::Remove),
        1 => any::<usize>().prop_map(Op::RemoveOuter),
        1 => Just(Op::Push),
        1 => Just(Op::Pop),
    ]
}

struct Segment {
    cookie: Cookie,
    live: Vec<(IndirectRef, ObjectRef)>,
}

struct Model {
    segments: Vec<Segment>,
    dead: Vec<IndirectRef>,
    next_object: usize,
}

impl Model {
    fn new(table: &IndirectReferenceTable) -> Self {
        Self {
            segments: vec![Segment {
                cookie: table.push_segment(),
                live: Vec::new(),
            }],
            dead: Vec::new(),
            next_object: 0,
        }
    }

    fn current(&mut self) -> &mut Segment {
        self.segments.last_mut().expect("base segment is never popped")
    }

    fn fresh_object(&mut self) -> ObjectRef {
        self.next_object += 1;
        obj(self.next_object)
    }

    fn apply(&mut self, table: &mut IndirectReferenceTable, op: &Op) {
        match *op {
            Op::Add | Op::Append => {
                let o = self.fresh_object();
                let cookie = self.current().cookie;
                let h = match op {
                    Op::Add => table.add(cookie, o),
                    _ => table.append_fast(cookie, o),
                };
                self.current().live.push((h, o));
            },
            Op::Remove(pick) => {
                let cookie = self.current().cookie;
                let live = &mut self.current().live;
                if live.is_empty() {
                    return;
                }
                let (h, _) = live.swap_remove(pick % live.len());
                assert!(table.remove(cookie, h), "live handle {:?} not removed", h);
                self.dead.push(h);
            },
            Op::RemoveOuter(pick) => {
                if self.segments.len() < 2 {
                    return;
                }
                let cookie = self.current().cookie;
                let outer = &self.segments[pick % (self.segments.len() - 1)];
                if let Some(&(h, _)) = outer.live.first() {
                    assert!(!table.remove(cookie, h), "outer handle {:?} removed", h);
                }
            },
            Op::Push => {
                let cookie = table.push_segment();
                self.segments.push(Segment {
                    cookie,
                    live: Vec::new(),
                });
            },
            Op::Pop => {
                if self.segments.len() < 2 {
                    return;
                }
                if let Some(segment) = self.segments.pop() {
                    table.pop_segment(segment.cookie);
                    self.dead.extend(segment.live.into_iter().map(|(h, _)| h));
                }
            },
        }
    }

    fn check(&self, table: &IndirectReferenceTable) -> Result<(), TestCaseError> {
        let live: usize = self.segments.iter().map(|s| s.live.len()).sum();
        prop_assert_eq!(live, table.entry_count() - table.hole_count());
        prop_assert_eq!(table.roots().count(), live);

        for segment in &self.segments {
            prop_assert!(table.hole_count() >= segment.cookie.hole_count());
            prop_assert!(table.entry_count() >= segment.cookie.top_index());
            for &(h, o) in &segment.live {
                prop_assert_eq!(table.get(h).ok(), Some(o));
            }
        }
        for &h in &self.dead {
            prop_assert!(!table.is_valid_reference(h));
        }
        Ok(())
    }
}

proptest! {
    #[test]
    fn prop_table_matches_model(ops in prop::collection::vec(op_strategy(), 1..200)) {
        let mut table = local_table(2, 256);
        let mut model = Model::new(&table);

        for op in &ops {
            model.apply(&mut table, op);
            model.check(&table)?;
        }
    }

    /// Interior removals followed by top removals never underflow hole accounting
    #[test]
    fn prop_interior_then_top_removals(
        count in 2usize..64,
        interior in prop::collection::vec(any::<prop::sample::Index>(), 0..64),
    ) {
        let mut table = local_table(4, 64);
        let outer = table.push_segment();
        table.add(outer, obj(0));
        let cookie = table.push_segment();

        let mut handles: Vec<_> = (1..=count).map(|i| table.add(cookie, obj(i))).collect();
        for pick in interior {
            if handles.len() < 2 {
                break;
            }
            let i = pick.index(handles.len() - 1);
            let h = handles.remove(i);
            prop_assert!(table.remove(cookie, h));
        }
        while let Some(h) = handles.pop() {
            prop_assert!(table.remove(cookie, h));
            prop_assert!(table.hole_count() >= cookie.hole_count());
        }

        prop_assert_eq!(table.entry_count(), cookie.top_index());
        prop_assert_eq!(table.hole_count(), cookie.hole_count());
    }

    /// Every handle ever issued by a slot is distinct
    #[test]
    fn prop_reused_slot_never_aliases(rounds in 1usize..100) {
        let mut table = local_table(2, 2);
        let cookie = table.push_segment();
        table.add(cookie, obj(0));

        let mut issued = std::collections::HashSet::new();
        for i in 0..rounds {
            let h = table.add(cookie, obj(i));
            prop_assert!(issued.insert(h.raw()));
            prop_assert!(table.remove(cookie, h));
        }
    }
}
