//! Command implementations.

pub mod config;
pub mod evaluate;
pub mod label_source;
pub mod labels;
