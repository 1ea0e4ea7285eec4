// SPDX-License-Identifier: MPL-2.0

//! Render a derivation tree — the DAG of incompatibilities that led to a
//! resolution failure — as a human-readable, numbered explanation.

use std::ops::Deref;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::internal::arena::Id;
use crate::internal::incompatibility::Incompatibility;
use crate::package::{PackageArena, PackageId};
use crate::term::Term;
use crate::version::Version;
use crate::version_set::VersionSet;

/// A handle into the incompatibility store, reused here so a derivation
/// tree's `shared_id`s are directly comparable to the store's ids.
pub type IncompId = Id<Incompatibility>;

/// The DAG of incompatibilities that proves a resolution impossible.
#[derive(Debug, Clone)]
pub enum DerivationTree {
    /// A leaf: an incompatibility with its own, non-derived reason.
    External(External),
    /// An incompatibility derived from two others.
    Derived(Derived),
}

/// A leaf incompatibility's own reason, independent of any other
/// incompatibility.
#[derive(Debug, Clone)]
pub enum External {
    /// The incompatibility forcing the first decision onto the root
    /// package.
    Root,
    /// No available version of a package falls in the required set.
    NoVersions(PackageId, VersionSet),
    /// A package at a version depends on a version set of another
    /// package.
    FromDependency(PackageId, Version, PackageId, VersionSet),
}

/// An incompatibility derived from two earlier ones.
#[derive(Debug, Clone)]
pub struct Derived {
    /// The terms of the derived incompatibility.
    pub terms: IndexMap<PackageId, Term>,
    /// Set when this incompatibility appears more than once in the tree,
    /// so the renderer can explain it once and refer back to it.
    pub shared_id: Option<IncompId>,
    /// First parent.
    pub cause1: Box<DerivationTree>,
    /// Second parent.
    pub cause2: Box<DerivationTree>,
}

impl DerivationTree {
    /// Merges a sibling [`External::NoVersions`] into `self`, collapsing
    /// the common and uninformative "no version of X exists at all" leaf
    /// into whatever it was paired with. Cleans up the rendered report
    /// considerably for a fully offline catalog.
    pub fn collapse_no_versions(&mut self) {
        match self {
            DerivationTree::External(_) => {}
            DerivationTree::Derived(derived) => {
                match (derived.cause1.deref(), derived.cause2.deref()) {
                    (DerivationTree::External(External::NoVersions(p, set)), _) => {
                        let (p, set) = (*p, set.clone());
                        derived.cause2.collapse_no_versions();
                        if let Some(merged) = derived.cause2.clone().merge_no_versions(p, set) {
                            *self = merged;
                        }
                    }
                    (_, DerivationTree::External(External::NoVersions(p, set))) => {
                        let (p, set) = (*p, set.clone());
                        derived.cause1.collapse_no_versions();
                        if let Some(merged) = derived.cause1.clone().merge_no_versions(p, set) {
                            *self = merged;
                        }
                    }
                    _ => {
                        derived.cause1.collapse_no_versions();
                        derived.cause2.collapse_no_versions();
                    }
                }
            }
        }
    }

    fn merge_no_versions(self, package: PackageId, set: VersionSet) -> Option<Self> {
        match self {
            DerivationTree::Derived(_) => Some(self),
            DerivationTree::External(External::Root) => {
                panic!("a NoVersions cannot be merged with the root cause")
            }
            DerivationTree::External(External::NoVersions(_, other_set)) => Some(
                DerivationTree::External(External::NoVersions(package, set.union(&other_set))),
            ),
            DerivationTree::External(External::FromDependency(p1, v1, p2, set2)) => {
                if p1 == package {
                    Some(DerivationTree::External(External::FromDependency(
                        p1, v1, p2, set2,
                    )))
                } else {
                    Some(DerivationTree::External(External::FromDependency(
                        p1,
                        v1,
                        p2,
                        set2.union(&set),
                    )))
                }
            }
        }
    }
}

impl External {
    fn display(&self, packages: &PackageArena) -> String {
        match self {
            Self::Root => "the root requirements must be met".to_string(),
            Self::NoVersions(package, set) => {
                if set.is_full() {
                    format!("there is no available version for {}", packages.display(*package))
                } else {
                    format!(
                        "there is no version of {} in {set}",
                        packages.display(*package)
                    )
                }
            }
            Self::FromDependency(p, v, dep, dep_set) => {
                if dep_set.is_full() {
                    format!("{} {v} depends on {}", packages.display(*p), packages.display(*dep))
                } else {
                    format!(
                        "{} {v} depends on {} {dep_set}",
                        packages.display(*p),
                        packages.display(*dep)
                    )
                }
            }
        }
    }
}

fn format_terms(terms: &IndexMap<PackageId, Term>, packages: &PackageArena) -> String {
    let entries: Vec<_> = terms.iter().collect();
    match entries.as_slice() {
        [] => "version solving failed".to_string(),
        [(package, Term::Positive(set))] => {
            format!("{} {set} is forbidden", packages.display(**package))
        }
        [(package, Term::Negative(set))] => {
            format!("{} {set} is mandatory", packages.display(**package))
        }
        [(p1, Term::Positive(_)), (p2, Term::Negative(_))]
        | [(p2, Term::Negative(_)), (p1, Term::Positive(_))] => {
            let r1 = terms[*p1].clone();
            let r2 = terms[*p2].clone();
            let set1 = r1.unwrap_positive().clone();
            let set2 = match r2 {
                Term::Negative(s) => s,
                Term::Positive(_) => unreachable!(),
            };
            External::FromDependency(**p1, version_placeholder(), **p2, set2)
                .display_with_set(&set1, packages)
        }
        slice => {
            let parts: Vec<_> = slice
                .iter()
                .map(|(p, t)| format!("{} {t}", packages.display(**p)))
                .collect();
            parts.join(", ") + " are incompatible"
        }
    }
}

// `format_terms`'s 2-term case doesn't have a concrete version to name
// (it is a derived incompatibility, not a `FromDependency` leaf), so it
// renders the `p set1 depends on dep set2` phrasing without one.
fn version_placeholder() -> Version {
    Version::zero()
}

impl External {
    fn display_with_set(&self, set_p: &VersionSet, packages: &PackageArena) -> String {
        match self {
            Self::FromDependency(p, _, dep, dep_set) => {
                if set_p.is_full() && dep_set.is_full() {
                    format!("{} depends on {}", packages.display(*p), packages.display(*dep))
                } else if set_p.is_full() {
                    format!(
                        "{} depends on {} {dep_set}",
                        packages.display(*p),
                        packages.display(*dep)
                    )
                } else if dep_set.is_full() {
                    format!(
                        "{} {set_p} depends on {}",
                        packages.display(*p),
                        packages.display(*dep)
                    )
                } else {
                    format!(
                        "{} {set_p} depends on {} {dep_set}",
                        packages.display(*p),
                        packages.display(*dep)
                    )
                }
            }
            _ => self.display(packages),
        }
    }
}

/// Walks a [`DerivationTree`] and renders it as numbered "Because ..."
/// lines, the way PubGrub-style reporters traditionally explain a
/// resolution failure.
pub struct DefaultStringReporter<'a> {
    packages: &'a PackageArena,
    ref_count: usize,
    shared_with_ref: FxHashMap<IncompId, usize>,
    lines: Vec<String>,
}

impl<'a> DefaultStringReporter<'a> {
    /// Renders `tree` to a multi-line explanation string.
    pub fn report(tree: &DerivationTree, packages: &'a PackageArena) -> String {
        match tree {
            DerivationTree::External(external) => external.display(packages),
            DerivationTree::Derived(derived) => {
                let mut reporter = Self {
                    packages,
                    ref_count: 0,
                    shared_with_ref: FxHashMap::default(),
                    lines: Vec::new(),
                };
                reporter.build_recursive(derived);
                reporter.lines.join("\n")
            }
        }
    }

    /// Renders the terms of a single incompatibility, independent of its
    /// derivation. Exposed for [`Incompatibility`]'s `Display` impl.
    pub fn string_terms(terms: &IndexMap<PackageId, Term>, packages: &PackageArena) -> String {
        format_terms(terms, packages)
    }

    fn build_recursive(&mut self, derived: &Derived) {
        self.build_recursive_helper(derived);
        if let Some(id) = derived.shared_id {
            self.shared_with_ref.entry(id).or_insert_with(|| {
                self.ref_count += 1;
                if let Some(line) = self.lines.last_mut() {
                    *line = format!("{line} ({})", self.ref_count);
                }
                self.ref_count
            });
        }
    }

    fn build_recursive_helper(&mut self, current: &Derived) {
        match (current.cause1.deref(), current.cause2.deref()) {
            (DerivationTree::External(e1), DerivationTree::External(e2)) => {
                self.lines.push(format!(
                    "Because {} and {}, {}.",
                    e1.display(self.packages),
                    e2.display(self.packages),
                    format_terms(&current.terms, self.packages)
                ));
            }
            (DerivationTree::Derived(derived), DerivationTree::External(external)) => {
                self.report_one_each(derived, external, &current.terms);
            }
            (DerivationTree::External(external), DerivationTree::Derived(derived)) => {
                self.report_one_each(derived, external, &current.terms);
            }
            (DerivationTree::Derived(d1), DerivationTree::Derived(d2)) => {
                match (self.line_ref_of(d1.shared_id), self.line_ref_of(d2.shared_id)) {
                    (Some(r1), Some(r2)) => self.lines.push(format!(
                        "Because {} ({r1}) and {} ({r2}), {}.",
                        format_terms(&d1.terms, self.packages),
                        format_terms(&d2.terms, self.packages),
                        format_terms(&current.terms, self.packages)
                    )),
                    (Some(r1), None) => {
                        self.build_recursive(d2);
                        self.lines.push(format!(
                            "And because {} ({r1}), {}.",
                            format_terms(&d1.terms, self.packages),
                            format_terms(&current.terms, self.packages)
                        ));
                    }
                    (None, Some(r2)) => {
                        self.build_recursive(d1);
                        self.lines.push(format!(
                            "And because {} ({r2}), {}.",
                            format_terms(&d2.terms, self.packages),
                            format_terms(&current.terms, self.packages)
                        ));
                    }
                    (None, None) => {
                        self.build_recursive(d1);
                        if d1.shared_id.is_some() {
                            self.lines.push(String::new());
                            self.build_recursive(current);
                        } else {
                            self.ref_count += 1;
                            let r1 = self.ref_count;
                            if let Some(line) = self.lines.last_mut() {
                                *line = format!("{line} ({r1})");
                            }
                            self.lines.push(String::new());
                            self.build_recursive(d2);
                            self.lines.push(format!(
                                "And because {} ({r1}), {}.",
                                format_terms(&d1.terms, self.packages),
                                format_terms(&current.terms, self.packages)
                            ));
                        }
                    }
                }
            }
        }
    }

    fn report_one_each(&mut self, derived: &Derived, external: &External, current_terms: &IndexMap<PackageId, Term>) {
        match self.line_ref_of(derived.shared_id) {
            Some(r) => self.lines.push(format!(
                "Because {} ({r}) and {}, {}.",
                format_terms(&derived.terms, self.packages),
                external.display(self.packages),
                format_terms(current_terms, self.packages)
            )),
            None => self.report_recurse_one_each(derived, external, current_terms),
        }
    }

    fn report_recurse_one_each(
        &mut self,
        derived: &Derived,
        external: &External,
        current_terms: &IndexMap<PackageId, Term>,
    ) {
        match (derived.cause1.deref(), derived.cause2.deref()) {
            (DerivationTree::Derived(prior), DerivationTree::External(prior_external))
            | (DerivationTree::External(prior_external), DerivationTree::Derived(prior)) => {
                self.build_recursive(prior);
                self.lines.push(format!(
                    "And because {} and {}, {}.",
                    prior_external.display(self.packages),
                    external.display(self.packages),
                    format_terms(current_terms, self.packages)
                ));
            }
            _ => {
                self.build_recursive(derived);
                self.lines.push(format!(
                    "And because {}, {}.",
                    external.display(self.packages),
                    format_terms(current_terms, self.packages)
                ));
            }
        }
    }

    fn line_ref_of(&self, shared_id: Option<IncompId>) -> Option<usize> {
        shared_id.and_then(|id| self.shared_with_ref.get(&id).copied())
    }
}
