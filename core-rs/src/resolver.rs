//! Get-or-create resolution of (directory, service type) → port.
//!
//! The lookup-miss path is snapshot → allocate → insert. The snapshot is not
//! serialized with the insert, so a concurrent invocation can claim the same
//! candidate port in between; the store's UNIQUE constraints catch that at
//! insert time and the whole sequence is retried a bounded number of times.

use tracing::{debug, warn};

use crate::errors::{PortkeepError, Result};
use crate::port::find_available_port;
use crate::store::PortStore;

/// Allocation attempts before giving up on the insert race.
const MAX_ALLOCATION_ATTEMPTS: u32 = 3;

/// Get or create the port for a service type in a project directory.
///
/// An existing assignment is returned unchanged no matter how long ago it was
/// created. Otherwise the lowest free port in the type's range (falling back
/// to the catch-all range) is allocated and persisted.
///
/// `directory` must be an absolute path; `service_type` is normalized to
/// lowercase here.
pub fn resolve_port(
    store: &PortStore,
    directory: &str,
    service_type: &str,
    description: Option<&str>,
) -> Result<u16> {
    let service_type = service_type.to_lowercase();

    if let Some(existing) = store.find(directory, &service_type)? {
        debug!(directory, %service_type, port = existing.port, "reusing existing assignment");
        return Ok(existing.port);
    }

    for attempt in 1..=MAX_ALLOCATION_ATTEMPTS {
        let used_ports = store.used_ports()?;
        let port = find_available_port(&service_type, &used_ports)?;

        match store.insert(directory, &service_type, port, description) {
            Ok(record) => return Ok(record.port),
            Err(PortkeepError::Conflict(detail)) => {
                // A concurrent invocation inserted between our snapshot and
                // our insert. If it claimed this exact (directory, type) key,
                // its port is the stable assignment; otherwise re-snapshot
                // and try the next free slot.
                if let Some(existing) = store.find(directory, &service_type)? {
                    debug!(
                        directory,
                        %service_type,
                        port = existing.port,
                        "lost insert race to an identical invocation"
                    );
                    return Ok(existing.port);
                }
                warn!(attempt, %detail, "port insert conflict, retrying allocation");
            }
            Err(e) => return Err(e),
        }
    }

    Err(PortkeepError::RetriesExhausted(MAX_ALLOCATION_ATTEMPTS))
}
