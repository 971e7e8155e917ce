//! Compiler vendor classification.
//!
//! Vendors are classified once, during detection, from the compiler's
//! `--version` banner (falling back to the executable name). Everything
//! downstream branches on [`CompilerVendor`] rather than on strings.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::host::HostOs;
use crate::language::{FortranModuleFlags, Language};

/// The vendor family of a compiler driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompilerVendor {
    Gnu,
    Clang,
    AppleClang,
    Intel,
    /// NAG Fortran (`nagfor`, `f95`).
    Nag,
    /// PGI / NVIDIA HPC compilers.
    Pgi,
    Cray,
    Unknown,
}

impl CompilerVendor {
    /// Classify a compiler from its version banner and executable name.
    pub fn classify(version_output: &str, program: &str) -> Self {
        let banner = version_output.to_ascii_lowercase();
        if banner.contains("nag fortran") {
            return CompilerVendor::Nag;
        }
        if banner.contains("apple") && banner.contains("clang") {
            return CompilerVendor::AppleClang;
        }
        if banner.contains("clang") {
            return CompilerVendor::Clang;
        }
        if banner.contains("intel") {
            return CompilerVendor::Intel;
        }
        if banner.contains("pgi") || banner.contains("nvidia") || banner.contains("nvfortran") {
            return CompilerVendor::Pgi;
        }
        if banner.contains("cray") {
            return CompilerVendor::Cray;
        }
        if banner.contains("gcc") || banner.contains("gnu") || banner.contains("free software foundation") {
            return CompilerVendor::Gnu;
        }
        Self::classify_name(program)
    }

    /// Classify from the executable file name alone.
    pub fn classify_name(program: &str) -> Self {
        let name = Path::new(program)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(program)
            .to_ascii_lowercase();
        if name.starts_with("nagfor") {
            CompilerVendor::Nag
        } else if name.contains("clang") {
            CompilerVendor::Clang
        } else if name.starts_with("icc")
            || name.starts_with("icpc")
            || name.starts_with("ifort")
            || name.starts_with("icx")
            || name.starts_with("ifx")
        {
            CompilerVendor::Intel
        } else if name.starts_with("pg") || name.starts_with("nv") {
            CompilerVendor::Pgi
        } else if name.starts_with("gcc") || name.starts_with("g++") || name.starts_with("gfortran") {
            CompilerVendor::Gnu
        } else {
            CompilerVendor::Unknown
        }
    }

    /// Whether this vendor's driver can perform the final link.
    ///
    /// NAG's Fortran driver cannot link mixed C++/Fortran executables.
    pub fn usable_as_linker(self) -> bool {
        !matches!(self, CompilerVendor::Nag)
    }

    /// F90 module include/output flags for a Fortran compiler of this vendor.
    pub fn fortran_module_flags(self) -> FortranModuleFlags {
        let (include, output) = match self {
            CompilerVendor::Gnu => (Some("-I"), Some("-J")),
            CompilerVendor::Intel | CompilerVendor::Pgi => (Some("-I"), Some("-module ")),
            CompilerVendor::Nag => (Some("-I"), Some("-mdir ")),
            CompilerVendor::Cray => (Some("-p"), Some("-J")),
            CompilerVendor::Clang | CompilerVendor::AppleClang => (Some("-I"), Some("-module-dir ")),
            CompilerVendor::Unknown => (None, None),
        };
        FortranModuleFlags {
            include_flag: include.map(String::from),
            output_flag: output.map(String::from),
        }
    }

    /// Runtime libraries needed when this vendor's `language` objects are
    /// linked through another language's driver.
    pub fn runtime_libs(self, language: Language, os: HostOs) -> Vec<String> {
        let libs: &[&str] = match (language, self) {
            (Language::C, _) => &[],
            (Language::Cxx, CompilerVendor::Clang | CompilerVendor::AppleClang)
                if os == HostOs::Darwin =>
            {
                &["-lc++"]
            }
            (Language::Cxx, CompilerVendor::Pgi) => &["-lstd", "-lC"],
            (Language::Cxx, CompilerVendor::Unknown) => &[],
            (Language::Cxx, _) => &["-lstdc++"],
            (Language::Fortran, CompilerVendor::Gnu) => &["-lgfortran", "-lquadmath"],
            (Language::Fortran, CompilerVendor::Intel) => &["-lifport", "-lifcore"],
            (Language::Fortran, CompilerVendor::Pgi) => &["-lpgf90", "-lpgf90rtl"],
            (Language::Fortran, _) => &[],
        };
        libs.iter().map(|l| l.to_string()).collect()
    }
}

impl fmt::Display for CompilerVendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompilerVendor::Gnu => "gnu",
            CompilerVendor::Clang => "clang",
            CompilerVendor::AppleClang => "apple-clang",
            CompilerVendor::Intel => "intel",
            CompilerVendor::Nag => "nag",
            CompilerVendor::Pgi => "pgi",
            CompilerVendor::Cray => "cray",
            CompilerVendor::Unknown => "unknown",
        };
        f.write_str(name)
    }
}
