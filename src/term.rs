// SPDX-License-Identifier: MPL-2.0

//! A term is the fundamental unit of operation of the PubGrub algorithm.
//! It is a positive or negative assertion about the version set a
//! package's chosen version lies in.

use std::fmt;

use crate::version_set::VersionSet;

/// A positive or negative assertion about which versions of a package are
/// acceptable.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Term {
    /// True if the chosen version lies in the given set.
    Positive(VersionSet),
    /// True if the chosen version does not lie in the given set (or no
    /// version is chosen at all).
    Negative(VersionSet),
}

impl Term {
    /// A term that is always true.
    pub fn any() -> Self {
        Self::Negative(VersionSet::empty())
    }

    /// A term that is never true.
    pub fn empty() -> Self {
        Self::Positive(VersionSet::empty())
    }

    /// A positive term containing exactly one version.
    pub fn exact(version: crate::version::Version) -> Self {
        Self::Positive(VersionSet::singleton(version))
    }

    /// Whether this term is positive.
    pub fn is_positive(&self) -> bool {
        matches!(self, Self::Positive(_))
    }

    /// Negate a term.
    pub fn negate(&self) -> Self {
        match self {
            Self::Positive(set) => Self::Negative(set.clone()),
            Self::Negative(set) => Self::Positive(set.clone()),
        }
    }

    /// Whether `version` makes this term true.
    pub fn contains(&self, version: &crate::version::Version) -> bool {
        match self {
            Self::Positive(set) => set.contains(version),
            Self::Negative(set) => !set.contains(version),
        }
    }

    /// Whether two terms can never both hold: `self ∩ other == empty`.
    pub fn is_disjoint(&self, other: &Term) -> bool {
        self.intersection(other) == Self::empty()
    }

    /// Unwrap the set contained in a positive term.
    ///
    /// Panics if called on a negative term; only ever used where the
    /// caller has already established positivity.
    pub fn unwrap_positive(&self) -> &VersionSet {
        match self {
            Self::Positive(set) => set,
            Self::Negative(_) => panic!("negative term has no positive version set"),
        }
    }

    /// The intersection of two terms. Positive if either operand is
    /// positive.
    pub fn intersection(&self, other: &Term) -> Term {
        match (self, other) {
            (Self::Positive(a), Self::Positive(b)) => Self::Positive(a.intersection(b)),
            (Self::Positive(a), Self::Negative(b)) => Self::Positive(a.difference(b)),
            (Self::Negative(a), Self::Positive(b)) => Self::Positive(b.difference(a)),
            (Self::Negative(a), Self::Negative(b)) => Self::Negative(a.union(b)),
        }
    }

    /// The union of two terms. Negative if either operand is negative.
    pub fn union(&self, other: &Term) -> Term {
        self.negate().intersection(&other.negate()).negate()
    }

    /// `self` is a subset of `other` iff `self ∩ other == self`.
    pub fn subset_of(&self, other: &Term) -> bool {
        self == &self.intersection(other)
    }

    /// Classify the relation between this term and the intersection of a
    /// set of assignments for the same package.
    pub fn relation_with(&self, assignments_intersection: &Term) -> Relation {
        let full = self.intersection(assignments_intersection);
        if &full == assignments_intersection {
            Relation::Satisfied
        } else if full == Self::empty() {
            Relation::Contradicted
        } else {
            Relation::Inconclusive
        }
    }
}

/// The relation of a conjunction of assignments to a term.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Relation {
    /// The term must be true whenever the assignments hold.
    Satisfied,
    /// The term must be false whenever the assignments hold.
    Contradicted,
    /// Neither satisfied nor contradicted.
    Inconclusive,
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Positive(set) => write!(f, "{set}"),
            Self::Negative(set) => write!(f, "not ( {set} )"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::Version;

    fn v(major: u32) -> Version {
        Version::from_components([major])
    }

    fn satisfied_by(term: &Term, intersection: &Term) -> bool {
        intersection.subset_of(term)
    }

    fn contradicted_by(term: &Term, intersection: &Term) -> bool {
        intersection.intersection(term) == Term::empty()
    }

    #[test]
    fn relation_with_matches_satisfied_and_contradicted_helpers() {
        let cases = [
            (Term::exact(v(1)), Term::exact(v(1))),
            (Term::exact(v(1)), Term::exact(v(2))),
            (
                Term::Positive(VersionSet::higher_than(v(1))),
                Term::exact(v(5)),
            ),
            (
                Term::Negative(VersionSet::higher_than(v(1))),
                Term::exact(v(5)),
            ),
        ];
        for (term, intersection) in cases {
            match term.relation_with(&intersection) {
                Relation::Satisfied => assert!(satisfied_by(&term, &intersection)),
                Relation::Contradicted => assert!(contradicted_by(&term, &intersection)),
                Relation::Inconclusive => {
                    assert!(!satisfied_by(&term, &intersection));
                    assert!(!contradicted_by(&term, &intersection));
                }
            }
        }
    }

    #[test]
    fn negate_is_involutive() {
        let t = Term::Positive(VersionSet::higher_than(v(1)));
        assert_eq!(t.negate().negate(), t);
    }

    #[test]
    fn any_is_identity_for_intersection() {
        let t = Term::exact(v(3));
        assert_eq!(t.intersection(&Term::any()), t);
    }
}
