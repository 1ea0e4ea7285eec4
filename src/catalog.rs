// SPDX-License-Identifier: MPL-2.0

//! The fully materialized in-memory catalog the core resolves against, and
//! the two collaborator surfaces spec §6 asks for on top of it: a
//! `Resolver` builder and a functional `resolve()` wrapper. Neither is part
//! of the core's size budget (spec §1); both are thin marshalling layers
//! over [`crate::internal::core::resolve`].

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::error::{InputError, PubGrubError, ResolutionError};
use crate::internal::core::{self, NoSolution};
use crate::internal::incompatibility::Incompatibility;
use crate::package::{PackageArena, PackageId};
use crate::parser::{parse_constraint, parse_version};
use crate::report::{self, DefaultStringReporter};
use crate::tree;
use crate::version::Version;
use crate::version_set::VersionSet;

#[derive(Debug, Clone, Default)]
struct PackageEntry {
    /// Ascending by [`Version`] order, so `choose_version` can scan from
    /// the back for the highest allowed version (spec §4.7).
    versions: Vec<Version>,
    dependencies: FxHashMap<Version, Vec<(PackageId, VersionSet)>>,
}

/// `Pkg → (sorted Vec<Version>, Version → Vec<(Pkg, VersionSet)>)`, the
/// boundary conversion spec §9 calls for so the core's hot-path queries are
/// O(log n) / O(1) instead of walking nested string-keyed mappings.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    packages: PackageArena,
    entries: FxHashMap<PackageId, PackageEntry>,
}

impl Catalog {
    /// An empty catalog, with only the root sentinel interned.
    pub fn new() -> Self {
        Self {
            packages: PackageArena::new(),
            entries: FxHashMap::default(),
        }
    }

    /// The package name/id table backing this catalog.
    pub fn packages(&self) -> &PackageArena {
        &self.packages
    }

    /// Mutable access to intern new package names into this catalog.
    pub fn packages_mut(&mut self) -> &mut PackageArena {
        &mut self.packages
    }

    /// Registers `package @ version` with its already-parsed dependencies.
    /// Rejects a duplicate `(package, version)` registration per spec §7.
    pub fn add_version(
        &mut self,
        package: PackageId,
        version: Version,
        dependencies: impl IntoIterator<Item = (PackageId, VersionSet)>,
    ) -> Result<(), InputError> {
        let entry = self.entries.entry(package).or_default();
        if entry.dependencies.contains_key(&version) {
            return Err(InputError::DuplicatePackage {
                package: self.packages.name(package).to_string(),
                version: version.to_string(),
            });
        }
        let idx = entry.versions.partition_point(|existing| *existing < version);
        entry.versions.insert(idx, version.clone());
        entry
            .dependencies
            .insert(version, dependencies.into_iter().collect());
        Ok(())
    }

    /// Installs the caller's root requirements as the dependencies of the
    /// single synthetic root version ([`Version::zero`]), per spec §3's
    /// "its single version bundles the caller's requirements".
    pub fn set_root_dependencies(
        &mut self,
        dependencies: impl IntoIterator<Item = (PackageId, VersionSet)>,
    ) -> Result<(), InputError> {
        self.add_version(PackageId::ROOT, Version::zero(), dependencies)
    }

    /// The catalog versions of `package`, ascending. Empty if `package`
    /// isn't in the catalog at all.
    pub fn versions(&self, package: PackageId) -> &[Version] {
        self.entries
            .get(&package)
            .map(|entry| entry.versions.as_slice())
            .unwrap_or(&[])
    }

    /// The dependencies registered for `package @ version`, if any.
    pub fn dependencies(
        &self,
        package: PackageId,
        version: &Version,
    ) -> Option<&[(PackageId, VersionSet)]> {
        self.entries
            .get(&package)?
            .dependencies
            .get(version)
            .map(Vec::as_slice)
    }

    /// The number of catalog versions of `package` that fall in `set`: the
    /// most-constrained-variable heuristic's tie-breaking input (spec §4.7).
    pub fn candidate_count(&self, package: PackageId, set: &VersionSet) -> usize {
        self.versions(package)
            .iter()
            .filter(|version| set.contains(version))
            .count()
    }

    /// The highest catalog version of `package` allowed by `set`, per spec
    /// §4.7's "enumerate in descending version order" rule. `None` if
    /// `package` has no catalog version in `set` (including if `package`
    /// isn't in the catalog at all).
    pub fn choose_version(&self, package: PackageId, set: &VersionSet) -> Option<Version> {
        self.versions(package)
            .iter()
            .rev()
            .find(|version| set.contains(version))
            .cloned()
    }
}

/// Accumulates a catalog across repeated [`add_package`](Resolver::add_package)
/// calls, then runs the algorithm against a set of root requirements. The
/// builder-form programmatic surface of spec §6.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    catalog: Catalog,
}

impl Resolver {
    /// A resolver with an empty catalog.
    pub fn new() -> Self {
        Self {
            catalog: Catalog::new(),
        }
    }

    /// Registers `package @ version`'s dependency constraints, parsing
    /// `version` and every constraint string eagerly. `dependencies` may be
    /// empty. Fails on an unparseable version/constraint or a duplicate
    /// `(package, version)` registration.
    pub fn add_package(
        &mut self,
        package: &str,
        version: &str,
        dependencies: &[(&str, &str)],
    ) -> Result<(), InputError> {
        let parsed_version = parse_version(version)?;
        let mut parsed_deps = Vec::with_capacity(dependencies.len());
        for (dep_name, constraint) in dependencies {
            let dep_id = self.catalog.packages_mut().intern(dep_name);
            let set = parse_constraint(constraint)?;
            parsed_deps.push((dep_id, set));
        }
        let pkg_id = self.catalog.packages_mut().intern(package);
        self.catalog.add_version(pkg_id, parsed_version, parsed_deps)
    }

    /// Resolves `requirements` against the catalog accumulated so far.
    pub fn resolve(
        &self,
        requirements: &[(&str, &str)],
    ) -> Result<IndexMap<String, String>, PubGrubError> {
        resolve_against(self.catalog.clone(), requirements)
    }
}

/// The functional form of spec §6: `available` is transposed into a
/// [`Resolver`] (one `add_package` call per `(package, version)` pair),
/// then resolved against `requirements`.
pub fn resolve(
    requirements: &[(&str, &str)],
    available: &[(&str, &[(&str, &[(&str, &str)])])],
) -> Result<IndexMap<String, String>, PubGrubError> {
    let mut resolver = Resolver::new();
    for (package, versions) in available {
        for (version, dependencies) in *versions {
            resolver.add_package(package, version, dependencies)?;
        }
    }
    resolver.resolve(requirements)
}

fn resolve_against(
    mut catalog: Catalog,
    requirements: &[(&str, &str)],
) -> Result<IndexMap<String, String>, PubGrubError> {
    let mut root_deps = Vec::with_capacity(requirements.len());
    for (name, constraint) in requirements {
        let id = catalog.packages_mut().intern(name);
        let set = parse_constraint(constraint)?;
        root_deps.push((id, set));
    }
    catalog.set_root_dependencies(root_deps)?;

    match core::resolve(&catalog, Version::zero()) {
        Ok(assignment) => Ok(assignment
            .into_iter()
            .map(|(id, version)| (catalog.packages().name(id).to_string(), version.to_string()))
            .collect()),
        Err(NoSolution { terminal, store }) => {
            let mut internal_tree = Incompatibility::build_tree(terminal, &store, catalog.packages());
            internal_tree.collapse_no_versions();
            let explanation = DefaultStringReporter::report(&internal_tree, catalog.packages());
            let derivation_tree = externalize_tree(&internal_tree, catalog.packages());
            Err(PubGrubError::Resolution(ResolutionError::NoSolution {
                explanation,
                derivation_tree,
            }))
        }
    }
}

/// Resolves every [`PackageId`] in `tree` to its name, so the public
/// [`tree::DerivationTree`] the caller inspects never needs the (private)
/// [`PackageArena`] that produced it.
fn externalize_tree(tree: &report::DerivationTree, packages: &PackageArena) -> tree::DerivationTree {
    match tree {
        report::DerivationTree::External(external) => {
            tree::DerivationTree::External(externalize_external(external, packages))
        }
        report::DerivationTree::Derived(derived) => tree::DerivationTree::Derived(tree::Derived {
            terms: derived
                .terms
                .iter()
                .map(|(id, term)| (packages.name(*id).to_string(), term.clone()))
                .collect(),
            shared: derived.shared_id.is_some(),
            cause1: Box::new(externalize_tree(&derived.cause1, packages)),
            cause2: Box::new(externalize_tree(&derived.cause2, packages)),
        }),
    }
}

fn externalize_external(external: &report::External, packages: &PackageArena) -> tree::External {
    match external {
        report::External::Root => tree::External::Root,
        report::External::NoVersions(p, set) => {
            tree::External::NoVersions(packages.name(*p).to_string(), set.clone())
        }
        report::External::FromDependency(p, v, dep, set) => tree::External::FromDependency(
            packages.name(*p).to_string(),
            v.clone(),
            packages.name(*dep).to_string(),
            set.clone(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_version_registration_is_rejected() {
        let mut resolver = Resolver::new();
        resolver.add_package("a", "1.0.0", &[]).unwrap();
        let err = resolver.add_package("a", "1.0.0", &[]).unwrap_err();
        assert!(matches!(err, InputError::DuplicatePackage { .. }));
    }

    #[test]
    fn builder_and_functional_forms_agree() {
        let mut resolver = Resolver::new();
        resolver
            .add_package("root", "1.0.0", &[("dep", ">=1.0.0")])
            .unwrap();
        resolver.add_package("dep", "1.0.0", &[]).unwrap();
        resolver.add_package("dep", "1.1.0", &[]).unwrap();
        let via_builder = resolver.resolve(&[("root", ">=1.0.0")]).unwrap();

        let via_functional = resolve(
            &[("root", ">=1.0.0")],
            &[
                ("root", &[("1.0.0", &[("dep", ">=1.0.0")][..])]),
                ("dep", &[("1.0.0", &[][..]), ("1.1.0", &[][..])]),
            ],
        )
        .unwrap();

        assert_eq!(via_builder, via_functional);
        assert_eq!(via_builder.get("dep").map(String::as_str), Some("1.1.0"));
    }

    #[test]
    fn nonexistent_root_package_fails_with_explanation() {
        let result = resolve(&[("nonexistent", ">=1")], &[]);
        assert!(matches!(
            result,
            Err(PubGrubError::Resolution(ResolutionError::NoSolution { .. }))
        ));
    }
}
