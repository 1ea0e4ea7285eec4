// SPDX-License-Identifier: MPL-2.0

//! Unit propagation, conflict resolution and the decision loop: the three
//! algorithms of spec §4.5–§4.7, tied together into a single `resolve` entry
//! point that walks a [`Catalog`] from root requirements to either a
//! complete assignment or a terminal incompatibility.

use std::cmp::Reverse;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::catalog::Catalog;
use crate::internal::arena::{Arena, Id};
use crate::internal::incompatibility::{IncompId, Incompatibility, Relation};
use crate::internal::partial_solution::{DecisionLevel, PartialSolution, SatisfierSearch};
use crate::package::PackageId;
use crate::version::Version;

/// Resolution state: the growing incompatibility store, the per-package
/// index into it, and the partial solution built so far.
struct State {
    root_version: Version,
    incompatibilities: FxHashMap<PackageId, Vec<IncompId>>,
    /// Incompatibilities already known contradicted, and the decision level
    /// at which that was established; invalidated on backtrack past it.
    contradicted_incompatibilities: FxHashMap<IncompId, DecisionLevel>,
    partial_solution: PartialSolution,
    store: Arena<Incompatibility>,
}

impl State {
    fn init(root_version: Version) -> Self {
        let mut store = Arena::new();
        let not_root_id = store.alloc(Incompatibility::not_root(
            PackageId::ROOT,
            root_version.clone(),
        ));
        let mut incompatibilities: FxHashMap<PackageId, Vec<IncompId>> = FxHashMap::default();
        incompatibilities
            .entry(PackageId::ROOT)
            .or_default()
            .push(not_root_id);
        Self {
            root_version,
            incompatibilities,
            contradicted_incompatibilities: FxHashMap::default(),
            partial_solution: PartialSolution::empty(),
            store,
        }
    }

    fn add_incompatibility(&mut self, incompat: Incompatibility) -> IncompId {
        let id = self.store.alloc(incompat);
        self.index_incompatibility(id);
        id
    }

    fn add_incompatibilities_from_dependencies(
        &mut self,
        package: PackageId,
        version: Version,
        deps: impl IntoIterator<Item = (PackageId, crate::version_set::VersionSet)>,
    ) -> std::ops::Range<IncompId> {
        let range = self.store.alloc_iter(
            deps.into_iter()
                .map(|(dep, dep_set)| {
                    Incompatibility::from_dependency(package, version.clone(), dep, dep_set)
                }),
        );
        for id in Id::range_to_iter(range.clone()) {
            self.index_incompatibility(id);
        }
        range
    }

    fn index_incompatibility(&mut self, id: IncompId) {
        for (package, _) in self.store[id].iter() {
            self.incompatibilities.entry(package).or_default().push(id);
        }
    }

    /// Propagates from `package` to a fixpoint, or returns the terminal
    /// incompatibility that proves resolution has failed.
    fn unit_propagation(&mut self, package: PackageId) -> Result<(), IncompId> {
        let mut changed = vec![package];
        while let Some(current_package) = changed.pop() {
            let mut conflict_id = None;
            if let Some(ids) = self.incompatibilities.get(&current_package) {
                // Newest incompatibilities are evaluated first.
                for &incompat_id in ids.iter().rev() {
                    if self
                        .contradicted_incompatibilities
                        .contains_key(&incompat_id)
                    {
                        continue;
                    }
                    let current_incompat = &self.store[incompat_id];
                    match self.partial_solution.relation(current_incompat) {
                        Relation::Satisfied => {
                            log::debug!(
                                "unit propagation: conflict on incompatibility {current_incompat}"
                            );
                            conflict_id = Some(incompat_id);
                            break;
                        }
                        Relation::AlmostSatisfied(package_almost) => {
                            if !changed.contains(&package_almost) {
                                changed.push(package_almost);
                            }
                            self.partial_solution.add_derivation(
                                package_almost,
                                incompat_id,
                                &self.store,
                            );
                            self.contradicted_incompatibilities.insert(
                                incompat_id,
                                self.partial_solution.current_decision_level(),
                            );
                        }
                        Relation::Contradicted(_) => {
                            self.contradicted_incompatibilities.insert(
                                incompat_id,
                                self.partial_solution.current_decision_level(),
                            );
                        }
                        Relation::Inconclusive => {}
                    }
                }
            }
            if let Some(incompat_id) = conflict_id {
                let (package_almost, root_cause) = self.conflict_resolution(incompat_id)?;
                changed.clear();
                changed.push(package_almost);
                self.partial_solution
                    .add_derivation(package_almost, root_cause, &self.store);
                self.contradicted_incompatibilities.insert(
                    root_cause,
                    self.partial_solution.current_decision_level(),
                );
            }
        }
        Ok(())
    }

    /// Walks back through causes until it finds a backjump target, per
    /// spec §4.6. Returns the package to derive a term for and the
    /// incompatibility that causes it, or the terminal incompatibility if
    /// resolution has failed.
    fn conflict_resolution(
        &mut self,
        incompatibility: IncompId,
    ) -> Result<(PackageId, IncompId), IncompId> {
        let mut current_incompat_id = incompatibility;
        loop {
            if self.store[current_incompat_id].is_terminal(PackageId::ROOT, &self.root_version) {
                return Err(current_incompat_id);
            }
            let (package, search_result) = self
                .partial_solution
                .satisfier_search(&self.store[current_incompat_id], &self.store);
            match search_result {
                SatisfierSearch::DifferentDecisionLevels {
                    previous_satisfier_level,
                } => {
                    self.backtrack(previous_satisfier_level);
                    log::debug!("backjump to decision level {previous_satisfier_level:?}");
                    return Ok((package, current_incompat_id));
                }
                SatisfierSearch::SameDecisionLevels { satisfier_cause } => {
                    let prior_cause = Incompatibility::prior_cause(
                        current_incompat_id,
                        &self.store[current_incompat_id],
                        satisfier_cause,
                        &self.store[satisfier_cause],
                        package,
                    );
                    log::debug!("learned incompatibility {prior_cause}");
                    current_incompat_id = self.store.alloc(prior_cause);
                }
            }
        }
    }

    fn backtrack(&mut self, decision_level: DecisionLevel) {
        self.partial_solution.backtrack(decision_level);
        self.contradicted_incompatibilities
            .retain(|_, level| *level <= decision_level);
    }
}

/// Why resolution failed: the terminal incompatibility, as an id into the
/// [`Arena`] the caller can use to build a [`crate::report::DerivationTree`].
pub struct NoSolution {
    pub terminal: IncompId,
    pub store: Arena<Incompatibility>,
}

/// Runs the PubGrub algorithm against `catalog`, whose [`PackageId::ROOT`]
/// entry bundles the caller's root requirements as the dependencies of a
/// single synthetic version.
pub fn resolve(catalog: &Catalog, root_version: Version) -> Result<IndexMap<PackageId, Version>, NoSolution> {
    let mut state = State::init(root_version.clone());
    let mut added_dependencies: FxHashMap<PackageId, Vec<Version>> = FxHashMap::default();
    let mut next = PackageId::ROOT;
    loop {
        log::debug!("unit propagation on {next:?}");
        if let Err(terminal) = state.unit_propagation(next) {
            return Err(NoSolution {
                terminal,
                store: state.store,
            });
        }

        let Some(highest_priority_pkg) = state.partial_solution.pick_highest_priority_pkg(|p, set| {
            Reverse((
                catalog.candidate_count(p, set),
                p.index() as u32,
            ))
        }) else {
            let mut solution = state.partial_solution.extract_solution();
            solution.shift_remove(&PackageId::ROOT);
            return Ok(solution);
        };
        next = highest_priority_pkg;

        let term_intersection = state
            .partial_solution
            .term_intersection_for_package(next)
            .expect("a package was chosen because it has a positive term")
            .clone();
        let allowed = term_intersection.unwrap_positive();

        let decision = catalog.choose_version(next, allowed);
        let version = match decision {
            None => {
                log::debug!("no version of {next:?} satisfies {allowed}");
                state.add_incompatibility(Incompatibility::no_versions(
                    next,
                    term_intersection.clone(),
                ));
                continue;
            }
            Some(v) => v,
        };

        let is_new = {
            let seen = added_dependencies.entry(next).or_default();
            if seen.contains(&version) {
                false
            } else {
                seen.push(version.clone());
                true
            }
        };

        if is_new {
            let deps = catalog
                .dependencies(next, &version)
                .expect("choose_version only returns catalog versions")
                .to_vec();
            let dep_incompats =
                state.add_incompatibilities_from_dependencies(next, version.clone(), deps);
            log::debug!("{next:?} @ {version} added to the partial solution");
            state
                .partial_solution
                .add_version(next, version, dep_incompats, &state.store);
        } else {
            log::debug!("{next:?} @ {version} decided again, no new dependencies to check");
            state.partial_solution.add_decision(next, version);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::version_set::VersionSet;

    fn v(major: u32) -> Version {
        Version::from_components([major])
    }

    #[test]
    fn picks_the_single_available_version() {
        let mut catalog = Catalog::new();
        let a = catalog.packages_mut().intern("a");
        catalog
            .add_version(a, v(1), Vec::<(PackageId, VersionSet)>::new())
            .unwrap();
        catalog
            .set_root_dependencies([(a, VersionSet::full())])
            .unwrap();

        let solution = resolve(&catalog, Version::zero()).expect("should resolve");
        assert_eq!(solution.get(&a), Some(&v(1)));
    }

    #[test]
    fn no_versions_in_range_fails() {
        let mut catalog = Catalog::new();
        let a = catalog.packages_mut().intern("a");
        catalog
            .add_version(a, v(1), Vec::<(PackageId, VersionSet)>::new())
            .unwrap();
        catalog
            .set_root_dependencies([(a, VersionSet::singleton(v(2)))])
            .unwrap();

        let err = resolve(&catalog, Version::zero()).unwrap_err();
        assert!(err.terminal.into_raw() < err.store.len());
    }
}
