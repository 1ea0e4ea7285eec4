// SPDX-License-Identifier: MPL-2.0

//! A canonicalized union of half-open (and possibly unbounded) version
//! intervals, closed under complement, union and intersection.
//!
//! The algorithms here are the textbook sweep-line merges over sorted,
//! non-overlapping, non-adjacent interval lists: every constructor and
//! every boolean operation re-establishes that canonical form, so that two
//! [`VersionSet`]s describing the same versions are `==` to each other
//! (structural, byte-identical equality).

use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};
use std::ops::Bound::{self, Excluded, Included, Unbounded};

use smallvec::{smallvec, SmallVec};

use crate::version::Version;

type Interval = (Bound<Version>, Bound<Version>);

/// A canonical union of disjoint, non-adjacent `[lo, hi)`-style intervals
/// over [`Version`].
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct VersionSet {
    segments: SmallVec<[Interval; 1]>,
}

impl VersionSet {
    /// The set containing no version.
    pub fn empty() -> Self {
        Self {
            segments: SmallVec::new(),
        }
    }

    /// The set containing every version.
    pub fn full() -> Self {
        Self {
            segments: smallvec![(Unbounded, Unbounded)],
        }
    }

    /// The set containing exactly `v`.
    pub fn singleton(v: Version) -> Self {
        Self {
            segments: smallvec![(Included(v.clone()), Included(v))],
        }
    }

    /// All versions `>= v`.
    pub fn higher_than(v: Version) -> Self {
        Self {
            segments: smallvec![(Included(v), Unbounded)],
        }
    }

    /// All versions `> v`.
    pub fn strictly_higher_than(v: Version) -> Self {
        Self {
            segments: smallvec![(Excluded(v), Unbounded)],
        }
    }

    /// All versions `<= v`.
    pub fn lower_than(v: Version) -> Self {
        Self {
            segments: smallvec![(Unbounded, Included(v))],
        }
    }

    /// All versions `< v`.
    pub fn strictly_lower_than(v: Version) -> Self {
        Self {
            segments: smallvec![(Unbounded, Excluded(v))],
        }
    }

    /// All versions `>= lo` and `< hi`.
    pub fn between(lo: Version, hi: Version) -> Self {
        let segments = if valid_segment(&Included(lo.clone()), &Excluded(hi.clone())) {
            smallvec![(Included(lo), Excluded(hi))]
        } else {
            SmallVec::new()
        };
        Self { segments }
    }

    /// Whether this set has no versions.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether this set contains every version.
    pub fn is_full(&self) -> bool {
        matches!(self.segments.as_slice(), [(Unbounded, Unbounded)])
    }

    /// If this set contains exactly one version, returns it.
    pub fn as_singleton(&self) -> Option<&Version> {
        match self.segments.as_slice() {
            [(Included(a), Included(b))] if a == b => Some(a),
            _ => None,
        }
    }

    /// Whether `version` lies in this set.
    pub fn contains(&self, version: &Version) -> bool {
        self.segments
            .binary_search_by(|segment| within_bounds(version, segment).reverse())
            .is_ok()
    }

    /// The complement: every version not in `self`.
    pub fn complement(&self) -> Self {
        match self.segments.first() {
            None => Self::full(),
            Some((Unbounded, Unbounded)) => Self::empty(),
            Some((Included(v), Unbounded)) => Self::strictly_lower_than(v.clone()),
            Some((Excluded(v), Unbounded)) => Self::lower_than(v.clone()),
            Some((Unbounded, Included(v))) => {
                negate_segments(Excluded(v.clone()), &self.segments[1..])
            }
            Some((Unbounded, Excluded(v))) => {
                negate_segments(Included(v.clone()), &self.segments[1..])
            }
            Some(_) => negate_segments(Unbounded, &self.segments),
        }
    }

    /// The union of `self` and `other`.
    pub fn union(&self, other: &Self) -> Self {
        let mut output: SmallVec<[Interval; 1]> = SmallVec::new();
        let mut accumulator: Option<(&Bound<Version>, &Bound<Version>)> = None;
        let mut left = self.segments.iter().peekable();
        let mut right = other.segments.iter().peekable();
        loop {
            let next = match (left.peek(), right.peek()) {
                (Some((ls, le)), Some((rs, re))) => {
                    if left_start_is_smaller(ls.as_ref(), rs.as_ref()) {
                        left.next();
                        (ls, le)
                    } else {
                        right.next();
                        (rs, re)
                    }
                }
                (Some((ls, le)), None) => {
                    left.next();
                    (ls, le)
                }
                (None, Some((rs, re))) => {
                    right.next();
                    (rs, re)
                }
                (None, None) => break,
            };

            accumulator = Some(match accumulator {
                None => next,
                Some(acc) => {
                    if end_before_start_with_gap(acc.1, next.0) {
                        output.push((acc.0.clone(), acc.1.clone()));
                        next
                    } else {
                        let end = match (acc.1, next.1) {
                            (_, Unbounded) | (Unbounded, _) => &Unbounded,
                            (Included(l), Excluded(r) | Included(r)) if l == r => acc.1,
                            (Included(l) | Excluded(l), Included(r) | Excluded(r)) => {
                                if l > r {
                                    acc.1
                                } else {
                                    next.1
                                }
                            }
                        };
                        (acc.0, end)
                    }
                }
            });
        }
        if let Some(acc) = accumulator {
            output.push((acc.0.clone(), acc.1.clone()));
        }
        Self { segments: output }.check_invariants()
    }

    /// The intersection of `self` and `other`.
    pub fn intersection(&self, other: &Self) -> Self {
        let mut output: SmallVec<[Interval; 1]> = SmallVec::new();
        let mut left = self.segments.iter().peekable();
        let mut right = other.segments.iter().peekable();
        while let Some(((ls, le), (rs, re))) = left.peek().zip(right.peek()) {
            let left_end_smaller = left_end_is_smaller(le.as_ref(), re.as_ref());
            let (other_start, end) = if left_end_smaller {
                left.next();
                (rs, le)
            } else {
                right.next();
                (ls, re)
            };
            if !valid_segment(other_start, end) {
                continue;
            }
            let start = match (ls, rs) {
                (Included(l), Included(r)) => Included(std::cmp::max(l, r)),
                (Excluded(l), Excluded(r)) => Excluded(std::cmp::max(l, r)),
                (Included(i), Excluded(e)) | (Excluded(e), Included(i)) => {
                    if i <= e {
                        Excluded(e)
                    } else {
                        Included(i)
                    }
                }
                (s, Unbounded) | (Unbounded, s) => s.as_ref(),
            };
            output.push((start.cloned(), end.clone()));
        }
        Self { segments: output }.check_invariants()
    }

    /// `self \ other`, i.e. `self.intersection(&other.complement())`.
    pub fn difference(&self, other: &Self) -> Self {
        self.intersection(&other.complement())
    }

    /// Whether `self` and `other` share no version.
    pub fn is_disjoint(&self, other: &Self) -> bool {
        self.intersection(other).is_empty()
    }

    /// Whether every version in `self` is also in `other`.
    pub fn subset_of(&self, other: &Self) -> bool {
        self.difference(other).is_empty()
    }

    fn check_invariants(self) -> Self {
        if cfg!(debug_assertions) {
            for pair in self.segments.as_slice().windows(2) {
                debug_assert!(end_before_start_with_gap(&pair[0].1, &pair[1].0));
            }
            for (s, e) in self.segments.iter() {
                debug_assert!(valid_segment(s, e));
            }
        }
        self
    }
}

fn negate_segments(start: Bound<Version>, segments: &[Interval]) -> VersionSet {
    let mut out: SmallVec<[Interval; 1]> = SmallVec::new();
    let mut start = start;
    for (v1, v2) in segments {
        out.push((
            start,
            match v1 {
                Included(v) => Excluded(v.clone()),
                Excluded(v) => Included(v.clone()),
                Unbounded => unreachable!(),
            },
        ));
        start = match v2 {
            Included(v) => Excluded(v.clone()),
            Excluded(v) => Included(v.clone()),
            Unbounded => Unbounded,
        };
    }
    if !matches!(start, Unbounded) {
        out.push((start, Unbounded));
    }
    VersionSet { segments: out }
}

fn within_bounds(version: &Version, segment: &Interval) -> Ordering {
    let below_lower = match segment {
        (Excluded(start), _) => version <= start,
        (Included(start), _) => version < start,
        (Unbounded, _) => false,
    };
    if below_lower {
        return Ordering::Less;
    }
    let below_upper = match segment {
        (_, Unbounded) => true,
        (_, Included(end)) => version <= end,
        (_, Excluded(end)) => version < end,
    };
    if below_upper {
        return Ordering::Equal;
    }
    Ordering::Greater
}

fn valid_segment(start: &Bound<Version>, end: &Bound<Version>) -> bool {
    match (start, end) {
        (Included(s), Included(e)) => s <= e,
        (Included(s), Excluded(e)) => s < e,
        (Excluded(s), Included(e)) => s < e,
        (Excluded(s), Excluded(e)) => s < e,
        (Unbounded, _) | (_, Unbounded) => true,
    }
}

fn end_before_start_with_gap(end: &Bound<Version>, start: &Bound<Version>) -> bool {
    match (end, start) {
        (_, Unbounded) => false,
        (Unbounded, _) => false,
        (Included(l), Included(r)) => l < r,
        (Included(l), Excluded(r)) => l < r,
        (Excluded(l), Included(r)) => l < r,
        (Excluded(l), Excluded(r)) => l <= r,
    }
}

fn left_start_is_smaller(left: Bound<&Version>, right: Bound<&Version>) -> bool {
    match (left, right) {
        (Unbounded, _) => true,
        (_, Unbounded) => false,
        (Included(l), Included(r)) => l <= r,
        (Excluded(l), Excluded(r)) => l <= r,
        (Included(l), Excluded(r)) => l <= r,
        (Excluded(l), Included(r)) => l < r,
    }
}

fn left_end_is_smaller(left: Bound<&Version>, right: Bound<&Version>) -> bool {
    match (left, right) {
        (_, Unbounded) => true,
        (Unbounded, _) => false,
        (Included(l), Included(r)) => l <= r,
        (Excluded(l), Excluded(r)) => l <= r,
        (Excluded(l), Included(r)) => l <= r,
        (Included(l), Excluded(r)) => l < r,
    }
}

impl Display for VersionSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "∅");
        }
        if self.is_full() {
            return write!(f, "*");
        }
        let mut first = true;
        for (lo, hi) in &self.segments {
            if !first {
                write!(f, " || ")?;
            }
            first = false;
            match (lo, hi) {
                (Included(a), Included(b)) if a == b => write!(f, "{a}")?,
                (lo, hi) => {
                    match lo {
                        Unbounded => write!(f, ">0")?,
                        Included(v) => write!(f, ">={v}")?,
                        Excluded(v) => write!(f, ">{v}")?,
                    }
                    write!(f, ", ")?;
                    match hi {
                        Unbounded => write!(f, "*")?,
                        Included(v) => write!(f, "<={v}")?,
                        Excluded(v) => write!(f, "<{v}")?,
                    }
                }
            }
        }
        Ok(())
    }
}


/// Set-algebra properties, generated over randomly built sets rather than
/// the handful of literal examples above. Properties mirror
/// `version-ranges/src/lib.rs`'s own inline proptest module; the generator
/// differs (unions of random basic ranges rather than a single
/// delta-accumulation pass) because `VersionSet`'s segment list is private,
/// so a test outside this module can only build sets through the public
/// constructors and combinators.
#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn version_strat() -> impl Strategy<Value = Version> {
        (0u32..30).prop_map(|n| Version::from_components([n]))
    }

    fn basic_set_strat() -> impl Strategy<Value = VersionSet> {
        prop_oneof![
            Just(VersionSet::empty()),
            Just(VersionSet::full()),
            version_strat().prop_map(VersionSet::singleton),
            version_strat().prop_map(VersionSet::higher_than),
            version_strat().prop_map(VersionSet::strictly_higher_than),
            version_strat().prop_map(VersionSet::lower_than),
            version_strat().prop_map(VersionSet::strictly_lower_than),
            (version_strat(), version_strat()).prop_map(|(a, b)| {
                let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                VersionSet::between(lo, hi)
            }),
        ]
    }

    fn version_set_strat() -> impl Strategy<Value = VersionSet> {
        prop::collection::vec(basic_set_strat(), 1..5)
            .prop_map(|sets| sets.into_iter().fold(VersionSet::empty(), |acc, s| acc.union(&s)))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn negate_is_different(s in version_set_strat()) {
            prop_assert_ne!(s.complement(), s);
        }

        #[test]
        fn double_negate_is_identity(s in version_set_strat()) {
            prop_assert_eq!(s.complement().complement(), s);
        }

        #[test]
        fn negate_contains_opposite(s in version_set_strat(), v in version_strat()) {
            prop_assert_ne!(s.contains(&v), s.complement().contains(&v));
        }

        #[test]
        fn intersection_is_symmetric(r1 in version_set_strat(), r2 in version_set_strat()) {
            prop_assert_eq!(r1.intersection(&r2), r2.intersection(&r1));
        }

        #[test]
        fn intersection_with_full_is_identity(s in version_set_strat()) {
            prop_assert_eq!(VersionSet::full().intersection(&s), s);
        }

        #[test]
        fn intersection_with_empty_is_empty(s in version_set_strat()) {
            prop_assert_eq!(VersionSet::empty().intersection(&s), VersionSet::empty());
        }

        #[test]
        fn intersection_is_idempotent(r1 in version_set_strat(), r2 in version_set_strat()) {
            prop_assert_eq!(r1.intersection(&r2).intersection(&r2), r1.intersection(&r2));
        }

        #[test]
        fn intersection_is_associative(r1 in version_set_strat(), r2 in version_set_strat(), r3 in version_set_strat()) {
            prop_assert_eq!(
                r1.intersection(&r2).intersection(&r3),
                r1.intersection(&r2.intersection(&r3)),
            );
        }

        #[test]
        fn intersection_of_complements_is_empty(s in version_set_strat()) {
            prop_assert!(s.complement().intersection(&s).is_empty());
        }

        #[test]
        fn intersection_contains_both(r1 in version_set_strat(), r2 in version_set_strat(), v in version_strat()) {
            prop_assert_eq!(r1.intersection(&r2).contains(&v), r1.contains(&v) && r2.contains(&v));
        }

        #[test]
        fn union_of_complements_is_full(s in version_set_strat()) {
            prop_assert!(s.complement().union(&s).is_full());
        }

        #[test]
        fn union_contains_either(r1 in version_set_strat(), r2 in version_set_strat(), v in version_strat()) {
            prop_assert_eq!(r1.union(&r2).contains(&v), r1.contains(&v) || r2.contains(&v));
        }

        #[test]
        fn is_disjoint_through_intersection(r1 in version_set_strat(), r2 in version_set_strat()) {
            prop_assert_eq!(r1.is_disjoint(&r2), r1.intersection(&r2).is_empty());
        }

        #[test]
        fn subset_of_through_intersection(r1 in version_set_strat(), r2 in version_set_strat()) {
            prop_assert_eq!(r1.subset_of(&r2), r1.intersection(&r2) == r1);
        }

        #[test]
        fn union_through_de_morgan(r1 in version_set_strat(), r2 in version_set_strat()) {
            let via_de_morgan = r1.complement().intersection(&r2.complement()).complement();
            prop_assert_eq!(r1.union(&r2), via_de_morgan);
        }

        #[test]
        fn always_contains_its_own_singleton(v in version_strat()) {
            prop_assert!(VersionSet::singleton(v.clone()).contains(&v));
        }

        #[test]
        fn contains_matches_intersection_with_singleton(s in version_set_strat(), v in version_strat()) {
            let via_intersection = !s.intersection(&VersionSet::singleton(v.clone())).is_empty();
            prop_assert_eq!(s.contains(&v), via_intersection);
        }
    }
}
