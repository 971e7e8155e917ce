//! Compiler toolchain model and detection for ExaFMM builds.
//!
//! A [`Toolchain`] is assembled from:
//! - **Language tools:** compiler, linker, and flags for C, C++, and (optionally) Fortran
//! - **Vendor tags:** [`CompilerVendor`] classified once from each compiler's banner
//! - **Host platform:** OS family, architecture, host name, file suffix conventions
//!
//! Toolchains come from a [`ToolchainProbe`]: [`SystemProbe`] runs the
//! compilers it finds, [`FileProbe`] loads a `.toolchain.toml`.

pub mod error;
pub mod host;
pub mod language;
pub mod parse;
pub mod probe;
pub mod toolchain;
pub mod vendor;

pub use error::{Result, ToolchainError};
pub use host::{HostOs, HostPlatform};
pub use language::{FortranModuleFlags, FortranToolchain, Language, LanguageToolchain};
pub use parse::{
    generate_template, load_toolchain_toml, parse_toolchain_toml, toolchain_to_toml,
    validate_toolchain, ValidationIssue,
};
pub use probe::{
    CommandRunner, FileProbe, FortranRequest, ProbeRequest, SystemProbe, SystemRunner,
    ToolchainProbe,
};
pub use toolchain::{LanguageView, LinkerQuirk, Toolchain};
pub use vendor::CompilerVendor;
