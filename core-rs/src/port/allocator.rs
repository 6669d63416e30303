//! Lowest-free-slot port search over the range table.
//!
//! Pure given a snapshot of the ports currently recorded in the store; the
//! caller is responsible for taking the snapshot and for persisting the
//! result (see `resolver`).

use std::collections::HashSet;

use tracing::debug;

use super::ranges::{range_for, PortRange, CATCH_ALL_RANGE};
use crate::errors::{PortkeepError, Result};

/// First port in `range` not present in `used_ports`, scanning ascending.
fn first_free(range: PortRange, used_ports: &HashSet<u16>) -> Option<u16> {
    (range.start..=range.end).find(|port| !used_ports.contains(port))
}

/// Find an available port for the given service type.
///
/// Scans the type's primary range first and falls back to the catch-all
/// range when the primary is fully occupied. New allocations always prefer
/// the smallest free number, so freed ports get reused before a range grows.
///
/// Fails when every attempted range is exhausted; the error names the bounds
/// of each range that was scanned.
pub fn find_available_port(service_type: &str, used_ports: &HashSet<u16>) -> Result<u16> {
    let primary = range_for(service_type);

    if let Some(port) = first_free(primary, used_ports) {
        debug!(service_type, port, "allocated from primary range");
        return Ok(port);
    }

    // The catch-all serves as overflow for dedicated ranges. When the primary
    // already is the catch-all there is no second range to try.
    if primary != CATCH_ALL_RANGE {
        if let Some(port) = first_free(CATCH_ALL_RANGE, used_ports) {
            debug!(service_type, port, "primary range full, allocated from catch-all");
            return Ok(port);
        }
        return Err(PortkeepError::PortsExhausted {
            service_type: service_type.to_string(),
            attempted: format!(
                "primary range {} and catch-all range {}",
                primary, CATCH_ALL_RANGE
            ),
        });
    }

    Err(PortkeepError::PortsExhausted {
        service_type: service_type.to_string(),
        attempted: format!("catch-all range {}", CATCH_ALL_RANGE),
    })
}
