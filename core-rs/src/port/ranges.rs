//! Static mapping from service-type labels to reserved port intervals.
//!
//! Known types get dedicated, non-overlapping ranges; everything else shares
//! one catch-all range:
//!
//! - dev          3100-3999   Development servers
//! - pg/postgres  5500-5599   PostgreSQL databases
//! - db           5600-5699   Generic databases
//! - redis        6400-6499   Redis servers
//! - mongo        27100-27199 MongoDB servers
//! - (other)      9100-9999   Catch-all for custom types

use std::fmt;

use serde::{Deserialize, Serialize};

/// Inclusive port interval reserved for a service type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

impl PortRange {
    /// Check if port is within this range
    pub fn contains(&self, port: u16) -> bool {
        port >= self.start && port <= self.end
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Dedicated ranges for known service types. "pg" and "postgres" alias the
/// same interval on purpose.
const KNOWN_RANGES: &[(&str, PortRange)] = &[
    ("dev", PortRange { start: 3100, end: 3999 }),
    ("pg", PortRange { start: 5500, end: 5599 }),
    ("postgres", PortRange { start: 5500, end: 5599 }),
    ("redis", PortRange { start: 6400, end: 6499 }),
    ("mongo", PortRange { start: 27100, end: 27199 }),
    ("db", PortRange { start: 5600, end: 5699 }),
];

/// Shared range for service types without a dedicated interval, and overflow
/// target when a dedicated interval fills up.
pub const CATCH_ALL_RANGE: PortRange = PortRange { start: 9100, end: 9999 };

/// Get the port range for a service type. Lookup is case-insensitive;
/// unknown types map to the catch-all range.
pub fn range_for(service_type: &str) -> PortRange {
    let normalized = service_type.to_lowercase();
    KNOWN_RANGES
        .iter()
        .find(|(label, _)| *label == normalized)
        .map(|(_, range)| *range)
        .unwrap_or(CATCH_ALL_RANGE)
}
