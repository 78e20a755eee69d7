//! # Configuration Constants
//!
//! Centralized tuning constants for the engine. Interdependent values are
//! co-located and their relationships documented so a change to one is
//! checked against the others.

/// Row-count ceiling for the build side of a hash join. When the smaller
/// input exceeds this, the planner keeps the nested-loop join: the hash
/// table would dominate the memory accounting the engine was sized for
/// (small-to-medium datasets, fully materialized operator outputs).
pub const HASH_JOIN_BUILD_THRESHOLD: usize = 100_000;

/// Fixed-point iteration ceiling for the optimizer. The rewrite rules are
/// individually idempotent, so convergence normally happens within two
/// passes; the ceiling guards against a rule oscillation bug turning into
/// an infinite loop.
pub const OPTIMIZER_MAX_ITERATIONS: usize = 8;

/// Initial per-table capacity of the row cache. Purely a reallocation
/// avoidance knob; the cache grows past it freely.
pub const CACHE_INITIAL_CAPACITY: usize = 1024;

/// Reserved table name for the store's metadata entry (schema version and
/// per-table row-id high-water marks). User tables may not use this name.
pub const METADATA_TABLE: &str = "__metadata__";
