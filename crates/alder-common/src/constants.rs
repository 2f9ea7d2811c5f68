//! System-wide constants for AlderDB.

/// Default fanout of the B+ tree index.
///
/// The fanout is the maximum number of children an internal node may have;
/// a node holds at most one key fewer. 64 keeps a node's keys within a few
/// cache lines for 8-byte keys while keeping trees shallow.
pub const DEFAULT_FANOUT: usize = 64;

/// Smallest fanout the index rebalancing thresholds are defined for.
///
/// Below 4 the leaf minimum (`fanout / 2`) and the internal minimum
/// (`(fanout - 1) / 2`) degenerate and the occupancy invariants cannot be
/// kept.
pub const MIN_FANOUT: usize = 4;
