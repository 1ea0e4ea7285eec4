// SPDX-License-Identifier: MPL-2.0

//! Package identity, interned to small integer handles at catalog-build
//! time so the hot path of the algorithm never touches a string.

use std::fmt;

use indexmap::IndexMap;

/// A package name interned to a stable, small integer id.
///
/// [`PackageId::ROOT`] is a sentinel bundling the caller's root
/// requirements as the dependencies of a single synthetic version.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct PackageId(u32);

impl PackageId {
    /// The sentinel root package. Always interned first, so its id is
    /// always `0`.
    pub const ROOT: PackageId = PackageId(0);

    fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    /// The raw index, for use as a map/priority-queue key.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A bidirectional name/id table.
///
/// Interning is insertion-ordered: the first package name seen in a
/// catalog gets the lowest id after [`PackageId::ROOT`], which the
/// decision heuristic relies on as its tie-break order (spec'd as
/// "first-mention order").
#[derive(Debug, Clone)]
pub struct PackageArena {
    names: IndexMap<Box<str>, PackageId>,
    by_id: Vec<Box<str>>,
}

impl Default for PackageArena {
    fn default() -> Self {
        Self::new()
    }
}

impl PackageArena {
    /// A fresh arena with only the root sentinel interned.
    pub fn new() -> Self {
        let mut names = IndexMap::new();
        let root_name: Box<str> = Box::from("<root>");
        names.insert(root_name.clone(), PackageId::ROOT);
        Self {
            names,
            by_id: vec![root_name],
        }
    }

    /// Interns `name`, returning its existing id if already seen or
    /// allocating a new one otherwise.
    pub fn intern(&mut self, name: &str) -> PackageId {
        if let Some(&id) = self.names.get(name) {
            return id;
        }
        let id = PackageId::from_index(self.by_id.len());
        let boxed: Box<str> = Box::from(name);
        self.names.insert(boxed.clone(), id);
        self.by_id.push(boxed);
        id
    }

    /// Looks up an already-interned name without allocating a new id.
    pub fn get(&self, name: &str) -> Option<PackageId> {
        self.names.get(name).copied()
    }

    /// The display name for an id, for error messages and reports.
    pub fn name(&self, id: PackageId) -> &str {
        &self.by_id[id.index()]
    }
}

/// Wraps a [`PackageId`] with an arena reference so it displays its name.
pub struct DisplayPackage<'a> {
    id: PackageId,
    arena: &'a PackageArena,
}

impl PackageArena {
    /// Borrows `id` together with `self` so it can be displayed by name.
    pub fn display(&self, id: PackageId) -> DisplayPackage<'_> {
        DisplayPackage { id, arena: self }
    }
}

impl fmt::Display for DisplayPackage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.arena.name(self.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_is_always_id_zero() {
        let arena = PackageArena::new();
        assert_eq!(arena.get("<root>"), Some(PackageId::ROOT));
    }

    #[test]
    fn interning_the_same_name_twice_returns_the_same_id() {
        let mut arena = PackageArena::new();
        let a = arena.intern("alpha");
        let b = arena.intern("alpha");
        assert_eq!(a, b);
    }

    #[test]
    fn first_mention_order_is_preserved() {
        let mut arena = PackageArena::new();
        let a = arena.intern("a");
        let b = arena.intern("b");
        assert!(a.index() < b.index());
    }
}
