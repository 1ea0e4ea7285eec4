// SPDX-License-Identifier: MPL-2.0

//! PubGrub version solving algorithm over a fully materialized in-memory
//! catalog.
//!
//! Version solving consists of efficiently finding a set of packages and
//! versions that satisfy all the constraints of a given project's
//! dependencies. When that is not possible, the algorithm produces a
//! human-readable explanation of why.
//!
//! Unlike a generic PubGrub implementation parameterized over arbitrary
//! package/version/version-set types, this crate fixes those types
//! concretely: packages are interned strings, versions are dotted
//! non-negative-integer tuples, and version sets are canonical unions of
//! half-open intervals built from a small constraint grammar
//! (`==`, `>=`, `<=`, `>`, `<`, `~=`).
//!
//! # Basic example
//!
//! ```
//! use pubgrub_resolver::Resolver;
//!
//! let mut resolver = Resolver::new();
//! resolver.add_package("root", "1.0.0", &[("menu", ">=1.0.0")]).unwrap();
//! resolver.add_package("menu", "1.0.0", &[("dropdown", ">=1.0.0")]).unwrap();
//! resolver.add_package("dropdown", "1.0.0", &[("icons", ">=1.0.0")]).unwrap();
//! resolver.add_package("icons", "1.0.0", &[]).unwrap();
//!
//! let solution = resolver.resolve(&[("menu", ">=1.0.0"), ("icons", ">=1.0.0")]).unwrap();
//! assert_eq!(solution.get("menu").map(String::as_str), Some("1.0.0"));
//! ```
//!
//! # Error reporting
//!
//! When there is no solution, [`Resolver::resolve`] returns a
//! [`PubGrubError::Resolution`] carrying a human-readable explanation and,
//! for programmatic inspection, the root incompatibility's derivation
//! DAG ([`DerivationTree`]). An unparseable version or constraint string,
//! or a duplicate `(package, version)` registration, instead returns
//! [`PubGrubError::Input`] before any resolution work starts.

#![warn(missing_docs)]

mod catalog;
mod error;
mod internal;
mod package;
mod parser;
mod report;
mod term;
mod tree;
mod version;
mod version_set;

pub use catalog::{resolve, Resolver};
pub use error::{InputError, PubGrubError, ResolutionError};
pub use term::Term;
pub use tree::{Derived, DerivationTree, External};
pub use version::Version;
pub use version_set::VersionSet;
