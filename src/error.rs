// SPDX-License-Identifier: MPL-2.0

//! The two error taxa of spec §7: input errors, raised synchronously
//! before any resolution work starts, and resolution errors, raised from
//! conflict analysis once it produces a terminal incompatibility.

use thiserror::Error;

use crate::tree::DerivationTree;

/// Raised before any resolution work begins: an unparseable version or
/// constraint string, or a duplicate `(package, version)` registration.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum InputError {
    /// `version` did not match the dotted-integer version grammar.
    #[error("invalid version string: {0:?}")]
    InvalidVersion(String),
    /// `constraint` did not match the comma-separated atom grammar.
    #[error("invalid constraint string: {0:?}")]
    InvalidConstraint(String),
    /// `add_package` was called twice for the same `(package, version)`.
    #[error("package {package} {version} was already registered")]
    DuplicatePackage {
        /// The package name.
        package: String,
        /// The version string already registered.
        version: String,
    },
}

/// Raised once conflict analysis terminates with no valid assignment.
#[derive(Error, Debug, Clone)]
pub enum ResolutionError {
    /// No assignment satisfies the root requirements against the catalog.
    #[error("{explanation}")]
    NoSolution {
        /// The human-readable "Because ... is forbidden" explanation.
        explanation: String,
        /// The root incompatibility's derivation DAG, for programmatic
        /// inspection.
        derivation_tree: DerivationTree,
    },
}

/// Either error taxon, for callers that want one `Result` type across the
/// whole surface.
#[derive(Error, Debug, Clone)]
pub enum PubGrubError {
    /// An input-validation failure, raised before resolution started.
    #[error(transparent)]
    Input(#[from] InputError),
    /// A resolution failure, raised from conflict analysis.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
}
