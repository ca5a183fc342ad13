//! Type aliases shared by the domain models

/// Primary key type used by every collection
pub type Id = i64;

