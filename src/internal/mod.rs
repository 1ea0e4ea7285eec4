// SPDX-License-Identifier: MPL-2.0

//! Internal resolution engine: incompatibility store, partial solution,
//! and the unit-propagation / conflict-resolution / decision loop that
//! ties them together. Nothing here is part of the public API.

pub mod arena;
pub mod core;
pub mod incompatibility;
pub mod partial_solution;
