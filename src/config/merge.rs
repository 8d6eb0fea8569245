//! Layer precedence and built-in defaults.

pub mod merge_policy;
