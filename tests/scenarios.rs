// SPDX-License-Identifier: MPL-2.0

//! Concrete end-to-end scenarios, one `#[test]` per row of spec §8's table:
//! an exact-version pin, transitive "latest wins" resolution, an open range,
//! a `~=` compatible-release constraint, a conflicting shared dependency,
//! and a nonexistent root package.

use std::io::Write;

use log::LevelFilter;
use pubgrub_resolver::{resolve, PubGrubError, Resolver, ResolutionError};

fn init_log() {
    let _ = env_logger::builder()
        .filter_level(LevelFilter::Trace)
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .is_test(true)
        .try_init();
}

#[test]
fn exact_version_is_pinned() {
    init_log();
    let mut resolver = Resolver::new();
    resolver.add_package("root", "1.0.0", &[("a", "==1.2.0")]).unwrap();
    resolver.add_package("a", "1.0.0", &[]).unwrap();
    resolver.add_package("a", "1.2.0", &[]).unwrap();
    resolver.add_package("a", "1.3.0", &[]).unwrap();

    let solution = resolver.resolve(&[("root", ">=1.0.0")]).unwrap();
    assert_eq!(solution.get("a").map(String::as_str), Some("1.2.0"));
}

#[test]
fn transitive_dependencies_resolve_to_their_latest_allowed_version() {
    let mut resolver = Resolver::new();
    resolver.add_package("root", "1.0.0", &[("menu", ">=1.0.0")]).unwrap();
    resolver.add_package("menu", "1.0.0", &[("dropdown", ">=1.0.0")]).unwrap();
    resolver.add_package("dropdown", "1.0.0", &[("icons", ">=1.0.0")]).unwrap();
    resolver.add_package("dropdown", "2.0.0", &[("icons", ">=1.0.0")]).unwrap();
    resolver.add_package("icons", "1.0.0", &[]).unwrap();
    resolver.add_package("icons", "2.0.0", &[]).unwrap();

    let solution = resolver.resolve(&[("menu", ">=1.0.0")]).unwrap();
    assert_eq!(solution.get("dropdown").map(String::as_str), Some("2.0.0"));
    assert_eq!(solution.get("icons").map(String::as_str), Some("2.0.0"));
}

#[test]
fn open_range_picks_the_highest_candidate_in_range() {
    let mut resolver = Resolver::new();
    resolver.add_package("root", "1.0.0", &[]).unwrap();
    resolver.add_package("a", "1.0.0", &[]).unwrap();
    resolver.add_package("a", "1.5.0", &[]).unwrap();
    resolver.add_package("a", "2.0.0", &[]).unwrap();

    let solution = resolver.resolve(&[("a", ">=1.0.0,<2.0.0")]).unwrap();
    assert_eq!(solution.get("a").map(String::as_str), Some("1.5.0"));
}

#[test]
fn compatible_release_stays_within_its_minor_version() {
    let mut resolver = Resolver::new();
    resolver.add_package("a", "1.4.0", &[]).unwrap();
    resolver.add_package("a", "1.4.9", &[]).unwrap();
    resolver.add_package("a", "1.5.0", &[]).unwrap();

    let solution = resolver.resolve(&[("a", "~=1.4.0")]).unwrap();
    assert_eq!(solution.get("a").map(String::as_str), Some("1.4.9"));
}

#[test]
fn conflicting_shared_dependency_has_no_solution() {
    // `left` needs `shared <2.0.0`, `right` needs `shared >=2.0.0`: no
    // version of `shared` can satisfy both.
    let mut resolver = Resolver::new();
    resolver
        .add_package(
            "root",
            "1.0.0",
            &[("left", ">=1.0.0"), ("right", ">=1.0.0")],
        )
        .unwrap();
    resolver.add_package("left", "1.0.0", &[("shared", "<2.0.0")]).unwrap();
    resolver.add_package("right", "1.0.0", &[("shared", ">=2.0.0")]).unwrap();
    resolver.add_package("shared", "1.0.0", &[]).unwrap();
    resolver.add_package("shared", "2.0.0", &[]).unwrap();

    let err = resolver.resolve(&[("root", ">=1.0.0")]).unwrap_err();
    match err {
        PubGrubError::Resolution(ResolutionError::NoSolution { explanation, .. }) => {
            assert!(!explanation.is_empty());
        }
        other => panic!("expected a resolution failure, got {other:?}"),
    }
}

#[test]
fn nonexistent_root_package_has_no_solution() {
    let result = resolve(&[("does-not-exist", ">=1.0.0")], &[]);
    assert!(matches!(
        result,
        Err(PubGrubError::Resolution(ResolutionError::NoSolution { .. }))
    ));
}
