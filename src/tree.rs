// SPDX-License-Identifier: MPL-2.0

//! The public-facing derivation DAG: spec §7's "for programmatic
//! inspection, the root incompatibility DAG". Package identities here are
//! plain names, never the interned [`crate::package::PackageId`] the core
//! resolves against — the programmatic surface is string-based end to end.

use indexmap::IndexMap;

use crate::term::Term;
use crate::version::Version;
use crate::version_set::VersionSet;

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
    NoVersions(String, VersionSet),
    /// A package at a version depends on a version set of another
    /// package.
    FromDependency(String, Version, String, VersionSet),
}

/// An incompatibility derived from two earlier ones.
#[derive(Debug, Clone)]
pub struct Derived {
    /// The terms of the derived incompatibility, keyed by package name.
    pub terms: IndexMap<String, Term>,
    /// Whether this incompatibility appears more than once in the tree.
    pub shared: bool,
    /// First parent.
    pub cause1: Box<DerivationTree>,
    /// Second parent.
    pub cause2: Box<DerivationTree>,
}
