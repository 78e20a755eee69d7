//! Filter operator.

use crate::predicate::Predicate;
use crate::relation::Relation;

pub fn filter(input: Relation, predicate: &Predicate) -> Relation {
    let tables = input.tables().clone();
    let entries = input
        .into_entries()
        .into_iter()
        .filter(|entry| predicate.evaluate(entry))
        .collect();
    Relation::new(entries, tables)
}
