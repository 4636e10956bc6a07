//! Core library for tag-pattern-print
pub mod pattern;
pub mod tag;
