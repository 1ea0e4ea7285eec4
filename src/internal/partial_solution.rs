// SPDX-License-Identifier: MPL-2.0

//! The partial solution: an ordered log of decisions and derivations at
//! increasing decision levels, with the satisfier search conflict
//! resolution needs and the priority queue the decision heuristic needs.

use std::cmp::Reverse;
use std::hash::BuildHasherDefault;
use std::ops::Range;

use indexmap::IndexMap;
use priority_queue::PriorityQueue;
use rustc_hash::FxHasher;
use smallvec::{smallvec, SmallVec};

use crate::internal::arena::Arena;
use crate::internal::incompatibility::{IncompId, Incompatibility, Relation};
use crate::package::PackageId;
use crate::term::Term;
use crate::version::Version;
use crate::version_set::VersionSet;

type FnvIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// Priority handed to the decision heuristic: lower candidate counts win,
/// ties broken by first-mention order, so callers push
/// `Reverse((candidate_count, package.index()))` (the queue is a max-heap,
/// so the smallest tuple must come out on top).
pub type Priority = Reverse<(usize, u32)>;

/// A decision level: decisions strictly increase it, derivations inherit
/// the level of the most recent decision.
#[derive(Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq)]
pub struct DecisionLevel(pub u32);

impl DecisionLevel {
    fn increment(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Ordered decisions and derivations, organized per-package for fast
/// lookup but remembering global arrival order for satisfier search.
#[derive(Clone, Debug)]
pub struct PartialSolution {
    next_global_index: u32,
    current_decision_level: DecisionLevel,
    package_assignments: FnvIndexMap<PackageId, PackageAssignments>,
    prioritized_potential_packages: PriorityQueue<PackageId, Priority, BuildHasherDefault<FxHasher>>,
    changed_this_decision_level: usize,
}

#[derive(Clone, Debug)]
struct PackageAssignments {
    smallest_decision_level: DecisionLevel,
    highest_decision_level: DecisionLevel,
    dated_derivations: SmallVec<[DatedDerivation; 1]>,
    assignments_intersection: AssignmentsIntersection,
}

#[derive(Clone, Debug)]
struct DatedDerivation {
    global_index: u32,
    decision_level: DecisionLevel,
    cause: IncompId,
    accumulated_intersection: Term,
}

#[derive(Clone, Debug)]
enum AssignmentsIntersection {
    Decision((u32, Version, Term)),
    Derivations(Term),
}

impl AssignmentsIntersection {
    fn term(&self) -> &Term {
        match self {
            Self::Decision((_, _, term)) => term,
            Self::Derivations(term) => term,
        }
    }

    /// A package is a candidate for the next decision iff it has no
    /// decision yet and its derived term is positive.
    fn potential_package_filter(&self, package: PackageId) -> Option<(PackageId, &VersionSet)> {
        match self {
            Self::Decision(_) => None,
            Self::Derivations(term) => {
                if term.is_positive() {
                    Some((package, term.unwrap_positive()))
                } else {
                    None
                }
            }
        }
    }
}

/// Whether the satisfier of an incompatibility's pivot term was found at
/// the same decision level as the incompatibility's other terms, or an
/// earlier one.
#[derive(Debug, Clone)]
pub enum SatisfierSearch {
    DifferentDecisionLevels {
        previous_satisfier_level: DecisionLevel,
    },
    SameDecisionLevels { satisfier_cause: IncompId },
}

type SatisfiedMap = IndexMap<PackageId, (Option<IncompId>, u32, DecisionLevel)>;

impl Default for PartialSolution {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialSolution {
    /// An empty partial solution, with no assignments made yet.
    pub fn empty() -> Self {
        Self {
            next_global_index: 0,
            current_decision_level: DecisionLevel(0),
            package_assignments: FnvIndexMap::default(),
            prioritized_potential_packages: PriorityQueue::default(),
            changed_this_decision_level: 0,
        }
    }

    /// Records a decision, opening a new decision level.
    pub fn add_decision(&mut self, package: PackageId, version: Version) {
        if cfg!(debug_assertions) {
            match self.package_assignments.get(&package) {
                None => panic!("a decision requires prior derivations for {package:?}"),
                Some(pa) => match &pa.assignments_intersection {
                    AssignmentsIntersection::Decision(_) => {
                        panic!("a decision has already been made for {package:?}")
                    }
                    AssignmentsIntersection::Derivations(term) => {
                        debug_assert!(term.contains(&version));
                    }
                },
            }
        }
        let new_idx = self.current_decision_level.0 as usize;
        self.current_decision_level = self.current_decision_level.increment();
        let (old_idx, _, pa) = self
            .package_assignments
            .get_full_mut(&package)
            .expect("derivations must already exist");
        pa.highest_decision_level = self.current_decision_level;
        pa.assignments_intersection = AssignmentsIntersection::Decision((
            self.next_global_index,
            version.clone(),
            Term::exact(version),
        ));
        if new_idx != old_idx {
            self.package_assignments.swap_indices(new_idx, old_idx);
        }
        self.next_global_index += 1;
    }

    /// Records a derivation caused by an almost-satisfied incompatibility.
    pub fn add_derivation(
        &mut self,
        package: PackageId,
        cause: IncompId,
        store: &Arena<Incompatibility>,
    ) {
        use indexmap::map::Entry;
        let mut dated_derivation = DatedDerivation {
            global_index: self.next_global_index,
            decision_level: self.current_decision_level,
            cause,
            accumulated_intersection: store[cause]
                .get(package)
                .expect("cause must mention package")
                .negate(),
        };
        self.next_global_index += 1;
        let pa_last_index = self.package_assignments.len().saturating_sub(1);
        match self.package_assignments.entry(package) {
            Entry::Occupied(mut occupied) => {
                let idx = occupied.index();
                let pa = occupied.get_mut();
                pa.highest_decision_level = self.current_decision_level;
                match &mut pa.assignments_intersection {
                    AssignmentsIntersection::Decision(_) => {
                        panic!("add_derivation should not be called after a decision")
                    }
                    AssignmentsIntersection::Derivations(t) => {
                        *t = t.intersection(&dated_derivation.accumulated_intersection);
                        dated_derivation.accumulated_intersection = t.clone();
                        if t.is_positive() {
                            self.changed_this_decision_level =
                                std::cmp::min(self.changed_this_decision_level, idx);
                        }
                    }
                }
                pa.dated_derivations.push(dated_derivation);
            }
            Entry::Vacant(v) => {
                let term = dated_derivation.accumulated_intersection.clone();
                if term.is_positive() {
                    self.changed_this_decision_level =
                        std::cmp::min(self.changed_this_decision_level, pa_last_index);
                }
                v.insert(PackageAssignments {
                    smallest_decision_level: self.current_decision_level,
                    highest_decision_level: self.current_decision_level,
                    dated_derivations: smallvec![dated_derivation],
                    assignments_intersection: AssignmentsIntersection::Derivations(term),
                });
            }
        }
    }

    /// Picks the package with the highest heuristic priority among those
    /// with a positive term but no decision yet, per spec §4.7.
    pub fn pick_highest_priority_pkg(
        &mut self,
        prioritizer: impl Fn(PackageId, &VersionSet) -> Priority,
    ) -> Option<PackageId> {
        let check_all = self.changed_this_decision_level
            == self.current_decision_level.0.saturating_sub(1) as usize;
        let current_decision_level = self.current_decision_level;
        let queue = &mut self.prioritized_potential_packages;
        self.package_assignments
            .get_range(self.changed_this_decision_level..)
            .expect("changed_this_decision_level is always in range")
            .iter()
            .filter(|(_, pa)| check_all || pa.highest_decision_level == current_decision_level)
            .filter_map(|(&p, pa)| pa.assignments_intersection.potential_package_filter(p))
            .for_each(|(p, set)| {
                let priority = prioritizer(p, set);
                queue.push(p, priority);
            });
        self.changed_this_decision_level = self.package_assignments.len();
        queue.pop().map(|(p, _)| p)
    }

    /// The final assignment map once every positive term has a decision.
    /// Includes [`PackageId::ROOT`]; callers filter it out.
    pub fn extract_solution(&self) -> IndexMap<PackageId, Version> {
        self.package_assignments
            .iter()
            .take(self.current_decision_level.0 as usize)
            .map(|(&p, pa)| match &pa.assignments_intersection {
                AssignmentsIntersection::Decision((_, v, _)) => (p, v.clone()),
                AssignmentsIntersection::Derivations(_) => {
                    panic!("decision range must only contain decisions")
                }
            })
            .collect()
    }

    /// Drops every assignment made strictly after `decision_level`.
    pub fn backtrack(&mut self, decision_level: DecisionLevel) {
        self.current_decision_level = decision_level;
        self.package_assignments.retain(|_, pa| {
            if pa.smallest_decision_level > decision_level {
                false
            } else if pa.highest_decision_level <= decision_level {
                true
            } else {
                while pa.dated_derivations.last().map(|dd| dd.decision_level) > Some(decision_level)
                {
                    pa.dated_derivations.pop();
                }
                debug_assert!(!pa.dated_derivations.is_empty());
                let last = pa.dated_derivations.last().expect("checked above");
                pa.highest_decision_level = last.decision_level;
                pa.assignments_intersection =
                    AssignmentsIntersection::Derivations(last.accumulated_intersection.clone());
                true
            }
        });
        self.prioritized_potential_packages.clear();
        self.changed_this_decision_level =
            self.current_decision_level.0.saturating_sub(1) as usize;
    }

    /// Adds `version` as a decision for `package`, unless one of the
    /// incompatibilities in `new_incompatibilities` is already satisfied
    /// (meaning one of `package`'s own dependencies conflicts with the
    /// partial solution).
    pub fn add_version(
        &mut self,
        package: PackageId,
        version: Version,
        new_incompatibilities: Range<IncompId>,
        store: &Arena<Incompatibility>,
    ) -> bool {
        let exact = Term::exact(version.clone());
        let satisfied = |incompat: &Incompatibility| {
            incompat.relation(|p| {
                if p == package {
                    Some(exact.clone())
                } else {
                    self.term_intersection_for_package(p).cloned()
                }
            }) == Relation::Satisfied
        };
        if store
            .iter()
            .filter(|(id, _)| new_incompatibilities.contains(id))
            .any(|(_, incompat)| satisfied(incompat))
        {
            log::info!("not adding {package:?} @ {version} because of its dependencies");
            false
        } else {
            log::info!("add_decision: {package:?} @ {version}");
            self.add_decision(package, version);
            true
        }
    }

    /// Classifies `incompat` against the current assignments.
    pub fn relation(&self, incompat: &Incompatibility) -> Relation {
        incompat.relation(|package| self.term_intersection_for_package(package).cloned())
    }

    /// The intersection of all assignments made so far for `package`.
    pub fn term_intersection_for_package(&self, package: PackageId) -> Option<&Term> {
        self.package_assignments
            .get(&package)
            .map(|pa| pa.assignments_intersection.term())
    }

    /// Finds the pivot package whose satisfier has the latest global index,
    /// and whether the previous satisfier of the incompatibility's other
    /// terms lies at the same decision level or an earlier one.
    pub fn satisfier_search(
        &self,
        incompat: &Incompatibility,
        store: &Arena<Incompatibility>,
    ) -> (PackageId, SatisfierSearch) {
        let satisfied_map = self.find_satisfier(incompat);
        let (&satisfier_package, &(satisfier_cause, _, satisfier_decision_level)) = satisfied_map
            .iter()
            .max_by_key(|(_, (_, global_index, _))| *global_index)
            .expect("incompatibility must mention at least one package");
        let previous_satisfier_level = self.find_previous_satisfier(
            incompat,
            satisfier_package,
            satisfied_map,
            store,
        );
        let search_result = if previous_satisfier_level >= satisfier_decision_level {
            SatisfierSearch::SameDecisionLevels {
                satisfier_cause: satisfier_cause.expect("same-level satisfier has a cause"),
            }
        } else {
            SatisfierSearch::DifferentDecisionLevels {
                previous_satisfier_level,
            }
        };
        (satisfier_package, search_result)
    }

    fn find_satisfier(&self, incompat: &Incompatibility) -> SatisfiedMap {
        let mut satisfied = SatisfiedMap::new();
        for (package, incompat_term) in incompat.iter() {
            let pa = self
                .package_assignments
                .get(&package)
                .expect("package must have assignments");
            satisfied.insert(package, pa.satisfier(&incompat_term.negate()));
        }
        satisfied
    }

    fn find_previous_satisfier(
        &self,
        incompat: &Incompatibility,
        satisfier_package: PackageId,
        mut satisfied_map: SatisfiedMap,
        store: &Arena<Incompatibility>,
    ) -> DecisionLevel {
        let satisfier_pa = self
            .package_assignments
            .get(&satisfier_package)
            .expect("satisfier package must have assignments");
        let &(satisfier_cause, _, _) = satisfied_map
            .get(&satisfier_package)
            .expect("satisfier package was inserted above");

        let accum_term = if let Some(cause) = satisfier_cause {
            store[cause]
                .get(satisfier_package)
                .expect("cause must mention package")
                .negate()
        } else {
            match &satisfier_pa.assignments_intersection {
                AssignmentsIntersection::Derivations(_) => {
                    panic!("satisfier with no cause must be a decision")
                }
                AssignmentsIntersection::Decision((_, _, term)) => term.clone(),
            }
        };

        let incompat_term = incompat
            .get(satisfier_package)
            .expect("satisfier package not in incompatibility");

        satisfied_map.insert(
            satisfier_package,
            satisfier_pa.satisfier(&accum_term.intersection(&incompat_term.negate())),
        );

        let (_, &(_, _, decision_level)) = satisfied_map
            .iter()
            .max_by_key(|(_, (_, global_index, _))| *global_index)
            .expect("non-empty map");
        decision_level.max(DecisionLevel(1))
    }

    /// The current decision level.
    pub fn current_decision_level(&self) -> DecisionLevel {
        self.current_decision_level
    }
}

impl PackageAssignments {
    /// The earliest assignment whose accumulated term becomes disjoint
    /// from `start_term`, i.e. the first assignment that starts to
    /// satisfy it.
    fn satisfier(&self, start_term: &Term) -> (Option<IncompId>, u32, DecisionLevel) {
        let idx = self
            .dated_derivations
            .as_slice()
            .partition_point(|dd| !dd.accumulated_intersection.is_disjoint(start_term));
        if let Some(dd) = self.dated_derivations.get(idx) {
            debug_assert!(dd.accumulated_intersection.intersection(start_term) == Term::empty());
            return (Some(dd.cause), dd.global_index, dd.decision_level);
        }
        match &self.assignments_intersection {
            AssignmentsIntersection::Decision((global_index, _, _)) => {
                (None, *global_index, self.highest_decision_level)
            }
            AssignmentsIntersection::Derivations(_) => {
                unreachable!(
                    "accumulated term overlaps start_term, so the last assignment must be a decision"
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internal::incompatibility::Incompatibility;
    use crate::package::PackageArena;

    fn v(n: u32) -> Version {
        Version::from_components([n])
    }

    #[test]
    fn decide_then_derive_then_backtrack() {
        let mut packages = PackageArena::new();
        let root = PackageId::ROOT;
        let a = packages.intern("a");

        let mut store: Arena<Incompatibility> = Arena::new();
        let not_root = Incompatibility::not_root(root, v(1));
        let not_root_id = store.alloc(not_root);

        let mut ps = PartialSolution::empty();
        ps.add_derivation(root, not_root_id, &store);
        ps.add_decision(root, v(1));
        assert_eq!(ps.current_decision_level(), DecisionLevel(1));

        let dep = Incompatibility::from_dependency(root, v(1), a, VersionSet::full());
        let dep_id = store.alloc(dep);
        ps.add_derivation(a, dep_id, &store);
        assert!(ps
            .term_intersection_for_package(a)
            .expect("derivation was recorded")
            .is_positive());

        ps.backtrack(DecisionLevel(0));
        assert_eq!(ps.current_decision_level(), DecisionLevel(0));
        assert!(ps.term_intersection_for_package(a).is_none());
    }
}
