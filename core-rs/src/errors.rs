//! Error types for portkeep

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PortkeepError {
    /// Every scanned interval was fully occupied. `attempted` names the
    /// bounds of each range the allocator tried, e.g.
    /// `primary range 3100-3999 and catch-all range 9100-9999`.
    #[error("no available ports for type \"{service_type}\": {attempted} exhausted")]
    PortsExhausted {
        service_type: String,
        attempted: String,
    },

    /// A uniqueness constraint rejected an insert. Carries the constraint
    /// detail reported by the storage engine.
    #[error("port assignment conflict: {0}")]
    Conflict(String),

    /// Concurrent invocations kept winning the insert race.
    #[error("port allocation failed after {0} attempts")]
    RetriesExhausted(u32),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, PortkeepError>;
