// SPDX-License-Identifier: MPL-2.0

//! An incompatibility is a set of terms, at most one per package, that
//! must never all hold at once in any valid solution.

use std::fmt;

use indexmap::IndexMap;
use rustc_hash::FxHashSet;

use crate::internal::arena::{Arena, Id};
use crate::package::{PackageArena, PackageId};
use crate::report::{Derived, DerivationTree, External};
use crate::term::{self, Term};
use crate::version::Version;
use crate::version_set::VersionSet;

/// A handle into the incompatibility arena.
pub type IncompId = Id<Incompatibility>;

/// A clause over terms, interpreted as "these terms can never all hold".
///
/// Incompatibilities are never mutated or removed once allocated; learned
/// incompatibilities accumulate in the store for the rest of the
/// resolution and may fire repeatedly.
#[derive(Debug, Clone)]
pub struct Incompatibility {
    package_terms: IndexMap<PackageId, Term>,
    cause: Cause,
}

/// Why an incompatibility exists, for error reporting.
#[derive(Debug, Clone)]
pub enum Cause {
    /// Expresses the caller's root requirements.
    Root,
    /// No available version of a package falls in the required set.
    NoVersions(PackageId, VersionSet),
    /// A package at some version depends on a version set of another
    /// package.
    FromDependency(PackageId, Version, PackageId, VersionSet),
    /// Derived by resolution of two earlier incompatibilities.
    DerivedFrom(IncompId, IncompId),
}

/// A `(package, term)` pair, used to report which term contradicted a set
/// of assignments.
pub type PackageTerm = (PackageId, Term);

/// How a conjunction of assignments compares to an incompatibility.
#[derive(Debug, Eq, PartialEq)]
pub enum Relation {
    /// Every term in the incompatibility is satisfied: a conflict.
    Satisfied,
    /// At least one term is contradicted.
    Contradicted(PackageTerm),
    /// All but one term are satisfied; the remaining package's term is
    /// inconclusive.
    AlmostSatisfied(PackageId),
    /// Neither satisfied, contradicted, nor almost-satisfied.
    Inconclusive,
}

impl Incompatibility {
    /// The incompatibility `{ not root = root_version }`, which forces the
    /// first decision to be the root package.
    pub fn not_root(root: PackageId, root_version: Version) -> Self {
        let mut package_terms = IndexMap::new();
        package_terms.insert(root, Term::Negative(VersionSet::singleton(root_version)));
        Self {
            package_terms,
            cause: Cause::Root,
        }
    }

    /// `{ positive(set) on package }`, recording that no catalog version of
    /// `package` falls in `set`.
    pub fn no_versions(package: PackageId, term: Term) -> Self {
        let set = match &term {
            Term::Positive(set) => set.clone(),
            Term::Negative(_) => panic!("no_versions incompatibility must be positive"),
        };
        let mut package_terms = IndexMap::new();
        package_terms.insert(package, term);
        Self {
            package_terms,
            cause: Cause::NoVersions(package, set),
        }
    }

    /// `{ positive({version}) on package, negative(dep_set) on dependency }`.
    pub fn from_dependency(
        package: PackageId,
        version: Version,
        dependency: PackageId,
        dep_set: VersionSet,
    ) -> Self {
        let mut package_terms = IndexMap::new();
        package_terms.insert(
            package,
            Term::Positive(VersionSet::singleton(version.clone())),
        );
        package_terms.insert(dependency, Term::Negative(dep_set.clone()));
        Self {
            package_terms,
            cause: Cause::FromDependency(package, version, dependency, dep_set),
        }
    }

    /// The "prior cause" construction of spec §4.3: resolve `incompat` and
    /// `satisfier_cause` on `pivot`, merging same-package terms by
    /// intersection and unioning the pivot's own term across both parents.
    pub fn prior_cause(
        self_id: IncompId,
        incompat: &Self,
        satisfier_cause_id: IncompId,
        satisfier_cause: &Self,
        pivot: PackageId,
    ) -> Self {
        let mut package_terms = incompat.package_terms.clone();
        let t1 = package_terms
            .shift_remove(&pivot)
            .expect("pivot package must have a term in `incompat`");
        for (package, term) in satisfier_cause.package_terms.iter() {
            if *package == pivot {
                continue;
            }
            package_terms
                .entry(*package)
                .and_modify(|existing| *existing = existing.intersection(term))
                .or_insert_with(|| term.clone());
        }
        let t2 = satisfier_cause
            .package_terms
            .get(&pivot)
            .expect("pivot package must have a term in `satisfier_cause`");
        let union = t1.union(t2);
        if union != Term::any() {
            package_terms.insert(pivot, union);
        }
        Self {
            package_terms,
            cause: Cause::DerivedFrom(self_id, satisfier_cause_id),
        }
    }

    /// Classifies this incompatibility against `terms`, a lookup from
    /// package to the intersection of its current assignments.
    pub fn relation(&self, mut terms: impl FnMut(PackageId) -> Option<Term>) -> Relation {
        let mut relation = Relation::Satisfied;
        for (&package, incompat_term) in self.package_terms.iter() {
            match terms(package).map(|t| incompat_term.relation_with(&t)) {
                Some(term::Relation::Satisfied) => {}
                Some(term::Relation::Contradicted) => {
                    return Relation::Contradicted((package, incompat_term.clone()));
                }
                None | Some(term::Relation::Inconclusive) => {
                    if relation == Relation::Satisfied {
                        relation = Relation::AlmostSatisfied(package);
                    } else {
                        relation = Relation::Inconclusive;
                    }
                }
            }
        }
        relation
    }

    /// True once this incompatibility alone rules out the root package,
    /// meaning resolution has failed terminally.
    pub fn is_terminal(&self, root: PackageId, root_version: &Version) -> bool {
        match self.package_terms.len() {
            0 => true,
            1 => {
                let (&package, term) = self.package_terms.iter().next().unwrap();
                package == root && term.contains(root_version)
            }
            _ => false,
        }
    }

    /// The term this incompatibility asserts about `package`, if any.
    pub fn get(&self, package: PackageId) -> Option<&Term> {
        self.package_terms.get(&package)
    }

    /// Iterates over `(package, term)` pairs, insertion-ordered.
    pub fn iter(&self) -> impl Iterator<Item = (PackageId, &Term)> {
        self.package_terms.iter().map(|(&p, t)| (p, t))
    }

    /// The two parent incompatibilities, if this one was derived.
    pub fn causes(&self) -> Option<(IncompId, IncompId)> {
        match self.cause {
            Cause::DerivedFrom(a, b) => Some((a, b)),
            _ => None,
        }
    }

    /// Computes which incompatibility ids recur more than once in the
    /// derivation DAG rooted at `root`, then renders the full tree. The
    /// one entry point [`crate::catalog`] needs after a failed resolution.
    pub fn build_tree(
        root: IncompId,
        store: &Arena<Incompatibility>,
        packages: &PackageArena,
    ) -> DerivationTree {
        let mut seen: FxHashSet<IncompId> = FxHashSet::default();
        let mut shared: FxHashSet<IncompId> = FxHashSet::default();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if let Some((id1, id2)) = store[id].causes() {
                if seen.contains(&id) {
                    shared.insert(id);
                } else {
                    stack.push(id1);
                    stack.push(id2);
                }
            }
            seen.insert(id);
        }
        Self::build_derivation_tree(root, &shared, store, packages)
    }

    /// Walks the derivation DAG rooted at this incompatibility, producing
    /// the tree the reporter renders.
    pub fn build_derivation_tree(
        self_id: IncompId,
        shared_ids: &FxHashSet<IncompId>,
        store: &Arena<Incompatibility>,
        packages: &PackageArena,
    ) -> DerivationTree {
        let this = &store[self_id];
        match &this.cause {
            Cause::DerivedFrom(id1, id2) => {
                let cause1 = Self::build_derivation_tree(*id1, shared_ids, store, packages);
                let cause2 = Self::build_derivation_tree(*id2, shared_ids, store, packages);
                DerivationTree::Derived(Derived {
                    terms: this.package_terms.clone(),
                    shared_id: shared_ids.contains(&self_id).then_some(self_id),
                    cause1: Box::new(cause1),
                    cause2: Box::new(cause2),
                })
            }
            Cause::Root => DerivationTree::External(External::Root),
            Cause::NoVersions(package, set) => {
                DerivationTree::External(External::NoVersions(*package, set.clone()))
            }
            Cause::FromDependency(package, version, dep, dep_set) => {
                DerivationTree::External(External::FromDependency(
                    *package,
                    version.clone(),
                    *dep,
                    dep_set.clone(),
                ))
            }
        }
    }
}

/// Debug-oriented rendering used by the engine's own trace logging; the
/// human-facing explanation goes through [`crate::report::DefaultStringReporter`]
/// instead, which has access to a [`PackageArena`] to print real names.
impl fmt::Display for Incompatibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (package, term) in self.package_terms.iter() {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{term} on {package:?}")?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::PackageArena;
    use crate::version::Version;

    #[test]
    fn rule_of_resolution_merges_other_terms_and_unions_pivot() {
        let mut packages = PackageArena::new();
        let p1 = packages.intern("p1");
        let p2 = packages.intern("p2");
        let p3 = packages.intern("p3");
        let t1 = Term::exact(Version::from_components([1]));
        let t2 = Term::exact(Version::from_components([2]));
        let t3 = Term::exact(Version::from_components([3]));

        let mut terms_i1 = IndexMap::new();
        terms_i1.insert(p1, t1.clone());
        terms_i1.insert(p2, t2.negate());
        let i1 = Incompatibility {
            package_terms: terms_i1,
            cause: Cause::Root,
        };

        let mut terms_i2 = IndexMap::new();
        terms_i2.insert(p2, t2.clone());
        terms_i2.insert(p3, t3.clone());
        let i2 = Incompatibility {
            package_terms: terms_i2,
            cause: Cause::Root,
        };

        let mut arena: Arena<Incompatibility> = Arena::new();
        let id1 = arena.alloc(i1.clone());
        let id2 = arena.alloc(i2.clone());

        let resolved = Incompatibility::prior_cause(id1, &i1, id2, &i2, p2);
        let mut expected = IndexMap::new();
        expected.insert(p1, t1);
        expected.insert(p3, t3);
        assert_eq!(resolved.package_terms, expected);
    }

    #[test]
    fn single_term_is_terminal_only_when_it_names_root() {
        let mut packages = PackageArena::new();
        let root = PackageId::ROOT;
        let other = packages.intern("other");
        let v = Version::from_components([1]);
        let terminal = Incompatibility::not_root(root, v.clone());
        assert!(terminal.is_terminal(root, &v));

        let non_terminal = Incompatibility::no_versions(other, Term::exact(v.clone()));
        assert!(!non_terminal.is_terminal(root, &v));
    }
}
