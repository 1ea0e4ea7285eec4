// SPDX-License-Identifier: MPL-2.0

//! Parses the version and constraint grammars of spec §6. Neither grammar
//! is part of the core's size budget (spec §1 explicitly excludes "any
//! PEP 440-like grammar" as a collaborator); this module exists purely to
//! turn the strings the programmatic surface accepts into [`Version`]s and
//! [`VersionSet`]s the core operates on.

use crate::error::InputError;
use crate::version::Version;
use crate::version_set::VersionSet;

/// Parses a dotted non-negative-integer version of arbitrary arity
/// (`1`, `1.2`, `1.2.3.4`, ...).
pub fn parse_version(input: &str) -> Result<Version, InputError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(InputError::InvalidVersion(input.to_string()));
    }
    let mut components = Vec::new();
    for part in trimmed.split('.') {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InputError::InvalidVersion(input.to_string()));
        }
        let n: u32 = part
            .parse()
            .map_err(|_| InputError::InvalidVersion(input.to_string()))?;
        components.push(n);
    }
    Ok(Version::from_components(components))
}

/// Parses a comma-separated conjunction of constraint atoms
/// (`==V`, `>=V`, `<=V`, `>V`, `<V`, `~=V`), whitespace-tolerant around
/// operators and commas.
pub fn parse_constraint(input: &str) -> Result<VersionSet, InputError> {
    let mut result = VersionSet::full();
    for atom in input.split(',') {
        let atom = atom.trim();
        if atom.is_empty() {
            return Err(InputError::InvalidConstraint(input.to_string()));
        }
        result = result.intersection(&parse_atom(atom, input)?);
    }
    Ok(result)
}

/// Operators ordered so that two-character prefixes (`>=`, `<=`, `==`,
/// `~=`) are matched before their one-character counterparts (`>`, `<`)
/// would otherwise shadow them.
const OPERATORS: &[(&str, fn(Version) -> VersionSet)] = &[
    (">=", VersionSet::higher_than),
    ("<=", VersionSet::lower_than),
    (">", VersionSet::strictly_higher_than),
    ("<", VersionSet::strictly_lower_than),
];

fn parse_atom(atom: &str, original: &str) -> Result<VersionSet, InputError> {
    if let Some(rest) = atom.strip_prefix("==") {
        let v = parse_version(rest.trim()).map_err(|_| invalid(original))?;
        return Ok(VersionSet::singleton(v));
    }
    if let Some(rest) = atom.strip_prefix("~=") {
        return parse_compatible_release(rest.trim(), original);
    }
    for (op, build) in OPERATORS {
        if let Some(rest) = atom.strip_prefix(op) {
            let v = parse_version(rest.trim()).map_err(|_| invalid(original))?;
            return Ok(build(v));
        }
    }
    Err(invalid(original))
}

/// `~=X.Y.Z` means `>=X.Y.Z, <X.(Y+1).0`; `~=X.Y` means `>=X.Y, <X+1.0`:
/// the upper bound is obtained by incrementing the second-to-last
/// component and dropping everything after it. Requires at least two
/// components (a single-component `~=X` has no "second-to-last" component
/// to bump and is rejected, matching the original parser's behavior on
/// this degenerate case).
fn parse_compatible_release(version: &str, original: &str) -> Result<VersionSet, InputError> {
    let lo = parse_version(version).map_err(|_| invalid(original))?;
    let components = lo.components();
    if components.len() < 2 {
        return Err(invalid(original));
    }
    let mut hi_components: Vec<u32> = components[..components.len() - 1].to_vec();
    let last = hi_components.len() - 1;
    hi_components[last] += 1;
    let hi = Version::from_components(hi_components);
    Ok(VersionSet::between(lo, hi))
}

fn invalid(original: &str) -> InputError {
    InputError::InvalidConstraint(original.to_string())
}
