//! CLI command implementations.

pub mod configure;
pub mod doctor;
pub mod toolchain;
