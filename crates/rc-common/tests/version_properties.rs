//! Property-based tests for version ordering and range membership.

use proptest::prelude::*;
use rc_common::{Version, VersionRange};
use std::cmp::Ordering;

fn segments_strategy() -> impl Strategy<Value = Vec<u64>> {
    proptest::collection::vec(0u64..40, 1..=4)
}

fn version(segments: &[u64]) -> Version {
    Version::new(segments)
}

fn dotted(segments: &[u64]) -> String {
    segments
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 2_000, max_global_rejects: 10_000, ..ProptestConfig::default() })]

    #[test]
    fn display_parses_back(segments in segments_strategy()) {
        let v = version(&segments);
        let parsed: Version = v.to_string().parse().expect("displayed version parses");
        prop_assert_eq!(parsed, v);
    }

    #[test]
    fn trailing_zeros_are_insignificant(segments in segments_strategy()) {
        let mut padded = segments.clone();
        padded.push(0);
        prop_assert_eq!(version(&segments), version(&padded));
        prop_assert_eq!(version(&segments).cmp(&version(&padded)), Ordering::Equal);
    }

    #[test]
    fn ordering_is_antisymmetric(a in segments_strategy(), b in segments_strategy()) {
        let (va, vb) = (version(&a), version(&b));
        prop_assert_eq!(va.cmp(&vb), vb.cmp(&va).reverse());
        prop_assert_eq!(va == vb, va.cmp(&vb) == Ordering::Equal);
    }

    #[test]
    fn ordering_is_transitive(
        a in segments_strategy(),
        b in segments_strategy(),
        c in segments_strategy(),
    ) {
        let mut sorted = vec![version(&a), version(&b), version(&c)];
        sorted.sort();
        prop_assert!(sorted[0] <= sorted[1]);
        prop_assert!(sorted[1] <= sorted[2]);
        prop_assert!(sorted[0] <= sorted[2]);
    }

    #[test]
    fn half_open_range_membership(
        lo in segments_strategy(),
        hi in segments_strategy(),
        x in segments_strategy(),
    ) {
        let (vlo, vhi, vx) = (version(&lo), version(&hi), version(&x));
        prop_assume!(vlo < vhi);
        let range: VersionRange = format!("[{},{})", dotted(&lo), dotted(&hi))
            .parse()
            .expect("range parses");
        prop_assert_eq!(range.contains(&vx), vlo <= vx && vx < vhi);
    }

    #[test]
    fn open_upper_bound_membership(lo in segments_strategy(), x in segments_strategy()) {
        let range: VersionRange = format!("[{},)", dotted(&lo)).parse().expect("range parses");
        prop_assert_eq!(range.contains(&version(&x)), version(&x) >= version(&lo));
    }

    #[test]
    fn qualified_sorts_before_release(segments in segments_strategy(), tag in "[A-Za-z]{1,4}[0-9]?") {
        let release = version(&segments);
        let qualified: Version = format!("{}-{}", dotted(&segments), tag)
            .parse()
            .expect("qualified version parses");
        prop_assert!(qualified < release);
    }

    #[test]
    fn legacy_jdk_spelling_folds(level in 5u64..30) {
        let legacy = Version::parse_jdk(&format!("1.{}", level)).expect("legacy jdk");
        let modern = Version::parse_jdk(&level.to_string()).expect("modern jdk");
        prop_assert_eq!(legacy, modern);
    }
}

#[test]
fn closed_range_includes_both_bounds() {
    let range: VersionRange = "[8,17]".parse().unwrap();
    assert!(range.contains(&"8".parse().unwrap()));
    assert!(range.contains(&"17".parse().unwrap()));
    assert!(!range.contains(&"21".parse().unwrap()));
    assert!("(,".parse::<VersionRange>().is_err());
}
