//! shuck - recursive archive extractor
//!
//! Shucks nested archives like ears of corn: strip a layer, see
//! what is underneath, repeat.

pub mod classify;
pub mod config;
pub mod extract;
pub mod format;
pub mod sanitize;
pub mod signatures;
pub mod unpack;
