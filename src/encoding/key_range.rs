//! # Key Ranges
//!
//! A `KeyRange` is a pair of optional bounds over encoded keys with
//! independent open/closed flags. `None` bounds are the "unbounded below"
//! and "unbounded above" sentinels. Ranges compose by intersection and
//! convert directly into the `std::ops::Bound` pair the ordered index
//! feeds to its backing map.

use super::key::Key;
use std::ops::Bound;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange {
    lower: Option<Key>,
    upper: Option<Key>,
    lower_open: bool,
    upper_open: bool,
}

impl KeyRange {
    pub fn new(lower: Option<Key>, upper: Option<Key>, lower_open: bool, upper_open: bool) -> Self {
        Self {
            lower,
            upper,
            lower_open,
            upper_open,
        }
    }

    /// Both bounds unbounded.
    pub fn all() -> Self {
        Self::new(None, None, false, false)
    }

    /// The degenerate range `[k, k]`.
    pub fn only(key: Key) -> Self {
        Self::new(Some(key.clone()), Some(key), false, false)
    }

    pub fn lower_bound(key: Key, open: bool) -> Self {
        Self::new(Some(key), None, open, false)
    }

    pub fn upper_bound(key: Key, open: bool) -> Self {
        Self::new(None, Some(key), false, open)
    }

    pub fn lower(&self) -> Option<&Key> {
        self.lower.as_ref()
    }

    pub fn upper(&self) -> Option<&Key> {
        self.upper.as_ref()
    }

    pub fn is_lower_open(&self) -> bool {
        self.lower_open
    }

    pub fn is_upper_open(&self) -> bool {
        self.upper_open
    }

    pub fn is_all(&self) -> bool {
        self.lower.is_none() && self.upper.is_none()
    }

    /// A range is empty when its bounds admit no key: lower > upper, or
    /// lower == upper with either side open.
    pub fn is_empty(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Some(lo), Some(hi)) => lo > hi || (lo == hi && (self.lower_open || self.upper_open)),
            _ => false,
        }
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        if let Some(lo) = &self.lower {
            let ord = key.cmp(lo.as_slice());
            if ord == std::cmp::Ordering::Less
                || (self.lower_open && ord == std::cmp::Ordering::Equal)
            {
                return false;
            }
        }
        if let Some(hi) = &self.upper {
            let ord = key.cmp(hi.as_slice());
            if ord == std::cmp::Ordering::Greater
                || (self.upper_open && ord == std::cmp::Ordering::Equal)
            {
                return false;
            }
        }
        true
    }

    /// Intersection of two ranges: the tighter bound wins on each side; on
    /// equal bounds the open flag wins.
    pub fn intersect(&self, other: &KeyRange) -> KeyRange {
        let (lower, lower_open) = tighter(
            (&self.lower, self.lower_open),
            (&other.lower, other.lower_open),
            true,
        );
        let (upper, upper_open) = tighter(
            (&self.upper, self.upper_open),
            (&other.upper, other.upper_open),
            false,
        );
        KeyRange::new(lower, upper, lower_open, upper_open)
    }

    /// Bounds in the form `BTreeMap::range` consumes.
    pub fn to_bounds(&self) -> (Bound<Key>, Bound<Key>) {
        let lower = match (&self.lower, self.lower_open) {
            (None, _) => Bound::Unbounded,
            (Some(k), false) => Bound::Included(k.clone()),
            (Some(k), true) => Bound::Excluded(k.clone()),
        };
        let upper = match (&self.upper, self.upper_open) {
            (None, _) => Bound::Unbounded,
            (Some(k), false) => Bound::Included(k.clone()),
            (Some(k), true) => Bound::Excluded(k.clone()),
        };
        (lower, upper)
    }
}

fn tighter(
    a: (&Option<Key>, bool),
    b: (&Option<Key>, bool),
    is_lower: bool,
) -> (Option<Key>, bool) {
    match (a.0, b.0) {
        (None, None) => (None, false),
        (Some(k), None) => (Some(k.clone()), a.1),
        (None, Some(k)) => (Some(k.clone()), b.1),
        (Some(ka), Some(kb)) => {
            use std::cmp::Ordering::*;
            match ka.cmp(kb) {
                Equal => (Some(ka.clone()), a.1 || b.1),
                Less => {
                    if is_lower {
                        (Some(kb.clone()), b.1)
                    } else {
                        (Some(ka.clone()), a.1)
                    }
                }
                Greater => {
                    if is_lower {
                        (Some(ka.clone()), a.1)
                    } else {
                        (Some(kb.clone()), b.1)
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::encode_value;
    use crate::types::Value;

    fn k(s: &str) -> Key {
        encode_value(&Value::Text(s.into()))
    }

    #[test]
    fn all_contains_everything() {
        let range = KeyRange::all();
        assert!(range.contains(&k("a")));
        assert!(range.contains(&[]));
        assert!(range.is_all());
        assert!(!range.is_empty());
    }

    #[test]
    fn only_matches_single_key() {
        let range = KeyRange::only(k("m"));
        assert!(range.contains(&k("m")));
        assert!(!range.contains(&k("l")));
        assert!(!range.contains(&k("n")));
    }

    #[test]
    fn open_bounds_exclude_endpoints() {
        let range = KeyRange::new(Some(k("b")), Some(k("d")), true, true);
        assert!(!range.contains(&k("b")));
        assert!(range.contains(&k("c")));
        assert!(!range.contains(&k("d")));
    }

    #[test]
    fn half_bounded_ranges() {
        let lo = KeyRange::lower_bound(k("m"), false);
        assert!(lo.contains(&k("m")));
        assert!(lo.contains(&k("z")));
        assert!(!lo.contains(&k("a")));

        let hi = KeyRange::upper_bound(k("m"), true);
        assert!(!hi.contains(&k("m")));
        assert!(hi.contains(&k("a")));
    }

    #[test]
    fn intersection_takes_tighter_bounds() {
        let a = KeyRange::new(Some(k("b")), Some(k("x")), false, false);
        let b = KeyRange::new(Some(k("d")), Some(k("t")), true, false);
        let i = a.intersect(&b);
        assert_eq!(i.lower(), Some(&k("d")));
        assert!(i.is_lower_open());
        assert_eq!(i.upper(), Some(&k("t")));
        assert!(!i.is_upper_open());
    }

    #[test]
    fn intersection_on_equal_bound_prefers_open() {
        let a = KeyRange::lower_bound(k("d"), false);
        let b = KeyRange::lower_bound(k("d"), true);
        let i = a.intersect(&b);
        assert!(i.is_lower_open());
    }

    #[test]
    fn disjoint_intersection_is_empty() {
        let a = KeyRange::upper_bound(k("c"), false);
        let b = KeyRange::lower_bound(k("f"), false);
        assert!(a.intersect(&b).is_empty());
    }

    #[test]
    fn only_with_open_flag_is_empty() {
        let r = KeyRange::new(Some(k("c")), Some(k("c")), true, false);
        assert!(r.is_empty());
    }
}
