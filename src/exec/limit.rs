//! Skip and limit operators. Skip executes below Limit in the tree, so
//! pagination composes as skip-then-limit.

use crate::relation::Relation;

pub fn skip(input: Relation, count: usize) -> Relation {
    let tables = input.tables().clone();
    let mut entries = input.into_entries();
    let boundary = count.min(entries.len());
    let kept = entries.split_off(boundary);
    Relation::new(kept, tables)
}

pub fn limit(input: Relation, count: usize) -> Relation {
    let tables = input.tables().clone();
    let mut entries = input.into_entries();
    entries.truncate(count);
    Relation::new(entries, tables)
}
