// Port Allocation Contract Tests
//
// These tests verify INVARIANTS that MUST NEVER BREAK regardless of
// implementation. Assignments already persisted in user databases depend on
// them staying fixed.

use std::collections::HashSet;

use portkeep_core::{find_available_port, range_for, PortRange, CATCH_ALL_RANGE};

/// WHY: Range bounds are part of the on-disk contract
/// REASON: Existing databases hold ports allocated from these exact ranges
/// BREAKS: Edited ranges strand previously assigned ports outside any range
#[test]
fn range_table_values_invariant() {
    assert_eq!(range_for("dev"), PortRange { start: 3100, end: 3999 });
    assert_eq!(range_for("pg"), PortRange { start: 5500, end: 5599 });
    assert_eq!(range_for("postgres"), PortRange { start: 5500, end: 5599 });
    assert_eq!(range_for("db"), PortRange { start: 5600, end: 5699 });
    assert_eq!(range_for("redis"), PortRange { start: 6400, end: 6499 });
    assert_eq!(range_for("mongo"), PortRange { start: 27100, end: 27199 });
    assert_eq!(CATCH_ALL_RANGE, PortRange { start: 9100, end: 9999 });
}

/// WHY: Dedicated ranges must never overlap each other or the catch-all
/// REASON: Overlap would let two service types compete for the same slots
/// BREAKS: Range conformance: a "redis" port could land in the dev range
#[test]
fn ranges_never_overlap() {
    let labels = ["dev", "pg", "db", "redis", "mongo"];
    let mut ranges: Vec<PortRange> = labels.iter().map(|label| range_for(label)).collect();
    ranges.push(CATCH_ALL_RANGE);

    for (i, a) in ranges.iter().enumerate() {
        for b in &ranges[i + 1..] {
            assert!(
                a.end < b.start || b.end < a.start,
                "ranges {} and {} overlap",
                a,
                b
            );
        }
    }
}

/// WHY: "pg" and "postgres" alias one interval on purpose
/// REASON: Both labels describe the same kind of service
/// BREAKS: Splitting them would scatter PostgreSQL ports across two ranges
#[test]
fn pg_postgres_alias_invariant() {
    assert_eq!(range_for("pg"), range_for("postgres"));
}

/// WHY: Allocation must be deterministic given a snapshot
/// REASON: The lowest-free-slot policy is what makes freed ports get reused
///         and keeps concurrent retries convergent
/// BREAKS: Nondeterministic picks would scatter assignments across the range
#[test]
fn allocation_is_deterministic() {
    let used: HashSet<u16> = [3100, 3101, 3103].into_iter().collect();

    let first = find_available_port("dev", &used).unwrap();
    let second = find_available_port("dev", &used).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, 3102, "must fill the lowest gap first");
}

/// WHY: The catch-all is the only overflow target, and only for non-catch-all
///      primaries
/// REASON: Scanning the same interval twice would just repeat the failure
/// BREAKS: Exhaustion reporting and the overflow guarantee
#[test]
fn overflow_targets_catch_all_only() {
    // Dedicated range full: next allocation must come from the catch-all
    let redis_full: HashSet<u16> = (6400..=6499).collect();
    let port = find_available_port("redis", &redis_full).unwrap();
    assert!(CATCH_ALL_RANGE.contains(port));

    // Catch-all-typed labels get no second scan: a full catch-all is fatal
    let catch_all_full: HashSet<u16> = (9100..=9999).collect();
    assert!(find_available_port("custom", &catch_all_full).is_err());
}
