//! Set operations over child relations.
//!
//! Thin dispatch onto the relation calculus. The planner prunes `Empty`
//! children, but a child may still *execute* to the empty singleton
//! (empty table set); those are dropped here before the compatibility
//! check so they behave as the zero-input identity.

use crate::query::SetOpKind;
use crate::relation::Relation;
use eyre::Result;

pub fn set_op(kind: SetOpKind, children: Vec<Relation>) -> Result<Relation> {
    let is_singleton = |r: &Relation| r.tables().is_empty() && r.is_empty();

    match kind {
        SetOpKind::Union => {
            let kept: Vec<Relation> = children.into_iter().filter(|r| !is_singleton(r)).collect();
            Relation::union(&kept)
        }
        SetOpKind::Intersect => {
            // The empty singleton annihilates an intersection.
            if children.iter().any(is_singleton) {
                return Ok(Relation::empty());
            }
            Relation::intersect(&children)
        }
        SetOpKind::Except => {
            let mut iter = children.into_iter();
            let Some(first) = iter.next() else {
                return Ok(Relation::empty());
            };
            if is_singleton(&first) {
                return Ok(Relation::empty());
            }
            iter.filter(|r| !is_singleton(r))
                .try_fold(first, |acc, next| acc.except(&next))
        }
    }
}
