//! port module
//! Range table and conflict-avoidance port allocation.

pub mod allocator;
pub mod ranges;

pub use allocator::find_available_port;
pub use ranges::{range_for, PortRange, CATCH_ALL_RANGE};
