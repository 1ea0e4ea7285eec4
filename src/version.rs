// SPDX-License-Identifier: MPL-2.0

//! Dotted, arbitrary-arity version identity.
//!
//! A [`Version`] is a sequence of non-negative integer components
//! (`1`, `1.2`, `1.2.3.4`, ...). Trailing zero components carry no
//! information (`1.2` and `1.2.0` denote the same version) so they are
//! trimmed at construction, which makes the derived [`Ord`]/[`Eq`] agree
//! with the lexicographic, zero-padded comparison spec'd for version
//! identity.

use std::fmt::{self, Display};

use smallvec::SmallVec;

/// A dotted non-negative-integer version of arbitrary arity.
///
/// Equality and ordering are the only operations this type promises;
/// everything else (range matching, `~=` expansion) is the job of the
/// parser and [`crate::version_set::VersionSet`].
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Version {
    components: SmallVec<[u32; 4]>,
}

impl Version {
    /// Builds a version from its dotted components, trimming trailing
    /// zeros so that `1.2.0` and `1.2` compare and hash identically.
    pub fn from_components(components: impl IntoIterator<Item = u32>) -> Self {
        let mut components: SmallVec<[u32; 4]> = components.into_iter().collect();
        while components.last() == Some(&0) {
            components.pop();
        }
        Self { components }
    }

    /// The all-zero version (`0`), the lowest possible version.
    pub fn zero() -> Self {
        Self {
            components: SmallVec::new(),
        }
    }

    /// The components of this version with trailing zeros already
    /// trimmed off.
    pub fn components(&self) -> &[u32] {
        &self.components
    }

    /// The component at `index`, treating missing trailing components as
    /// zero.
    pub fn component(&self, index: usize) -> u32 {
        self.components.get(index).copied().unwrap_or(0)
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return write!(f, "0");
        }
        let mut first = true;
        for c in &self.components {
            if !first {
                write!(f, ".")?;
            }
            write!(f, "{c}")?;
            first = false;
        }
        Ok(())
    }
}

impl From<&[u32]> for Version {
    fn from(components: &[u32]) -> Self {
        Self::from_components(components.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_zeros_are_insignificant() {
        assert_eq!(
            Version::from_components([1, 2, 0]),
            Version::from_components([1, 2])
        );
        assert_eq!(Version::from_components([0, 0]), Version::zero());
    }

    #[test]
    fn ordering_pads_missing_components_with_zero() {
        assert!(Version::from_components([1]) < Version::from_components([1, 1]));
        assert!(Version::from_components([1, 2]) < Version::from_components([1, 2, 1]));
        assert!(Version::from_components([1, 2, 0, 1]) < Version::from_components([1, 2, 1]));
        assert!(Version::from_components([1, 9, 9]) < Version::from_components([2]));
    }

    #[test]
    fn display_round_trips_dotted_form() {
        assert_eq!(Version::from_components([1, 2, 3, 4]).to_string(), "1.2.3.4");
        assert_eq!(Version::zero().to_string(), "0");
    }
}
