//! Source languages and their per-language tool configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::vendor::CompilerVendor;

/// A source language the build compiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Language {
    C,
    Cxx,
    Fortran,
}

impl Language {
    /// All languages in probe order.
    pub const ALL: [Language; 3] = [Language::C, Language::Cxx, Language::Fortran];

    /// Environment variable naming the compiler (e.g. `CC`).
    pub fn compiler_env(self) -> &'static str {
        match self {
            Language::C => "CC",
            Language::Cxx => "CXX",
            Language::Fortran => "FC",
        }
    }

    /// Environment variable carrying compiler flags (e.g. `CFLAGS`).
    pub fn flags_env(self) -> &'static str {
        match self {
            Language::C => "CFLAGS",
            Language::Cxx => "CXXFLAGS",
            Language::Fortran => "FFLAGS",
        }
    }

    /// Compiler executables tried when nothing is specified.
    pub fn default_candidates(self) -> &'static [&'static str] {
        match self {
            Language::C => &["cc", "gcc", "clang", "icc"],
            Language::Cxx => &["c++", "g++", "clang++", "icpc"],
            Language::Fortran => &["gfortran", "ifort", "nagfor", "f90", "f77"],
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::C => write!(f, "C"),
            Language::Cxx => write!(f, "C++"),
            Language::Fortran => write!(f, "Fortran"),
        }
    }
}

/// Compiler and linker settings for one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LanguageToolchain {
    /// Compiler executable (path or name on `PATH`).
    pub compiler: String,
    /// Vendor of the compiler.
    pub compiler_vendor: CompilerVendor,
    /// Flags passed on every compile.
    #[serde(default)]
    pub compiler_flags: String,
    /// Preprocessor flags for this language.
    #[serde(default)]
    pub preprocessor_flags: String,
    /// Linker driver executable.
    pub linker: String,
    /// Vendor of the linker driver.
    pub linker_vendor: CompilerVendor,
    /// Flags passed on every link.
    #[serde(default)]
    pub linker_flags: String,
    /// Runtime libraries needed when objects of this language are linked
    /// by another language's driver.
    #[serde(default)]
    pub runtime_libs: Vec<String>,
}

impl LanguageToolchain {
    /// A language configuration where the compiler also drives the link.
    pub fn new(compiler: impl Into<String>, vendor: CompilerVendor) -> Self {
        let compiler = compiler.into();
        Self {
            linker: compiler.clone(),
            compiler,
            compiler_vendor: vendor,
            compiler_flags: String::new(),
            preprocessor_flags: String::new(),
            linker_vendor: vendor,
            linker_flags: String::new(),
            runtime_libs: Vec::new(),
        }
    }

    pub fn with_compiler_flags(mut self, flags: impl Into<String>) -> Self {
        self.compiler_flags = flags.into();
        self
    }

    pub fn with_preprocessor_flags(mut self, flags: impl Into<String>) -> Self {
        self.preprocessor_flags = flags.into();
        self
    }

    pub fn with_linker_flags(mut self, flags: impl Into<String>) -> Self {
        self.linker_flags = flags.into();
        self
    }

    pub fn with_runtime_libs(mut self, libs: Vec<String>) -> Self {
        self.runtime_libs = libs;
        self
    }
}

/// Fortran module flags.
///
/// `include_flag` is `None` for compilers without F90 module support (g77).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FortranModuleFlags {
    /// Flag adding a directory to the module search path.
    #[serde(default)]
    pub include_flag: Option<String>,
    /// Flag selecting where compiled `.mod` files are written.
    #[serde(default)]
    pub output_flag: Option<String>,
}

/// Fortran tools, present only when a Fortran compiler was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FortranToolchain {
    /// Compiler and linker settings.
    pub tools: LanguageToolchain,
    /// Module include/output flags.
    #[serde(default)]
    pub module_flags: FortranModuleFlags,
}

impl FortranToolchain {
    /// Build a Fortran toolchain, taking module flags from the vendor.
    pub fn from_tools(tools: LanguageToolchain) -> Self {
        let module_flags = tools.compiler_vendor.fortran_module_flags();
        Self {
            tools,
            module_flags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names() {
        assert_eq!(Language::C.to_string(), "C");
        assert_eq!(Language::Cxx.to_string(), "C++");
        assert_eq!(Language::Fortran.to_string(), "Fortran");
    }

    #[test]
    fn compiler_drives_link_by_default() {
        let tools = LanguageToolchain::new("g++", CompilerVendor::Gnu);
        assert_eq!(tools.linker, "g++");
        assert_eq!(tools.linker_vendor, CompilerVendor::Gnu);
        assert!(tools.linker_flags.is_empty());
    }

    #[test]
    fn fortran_module_flags_follow_vendor() {
        let gnu = FortranToolchain::from_tools(LanguageToolchain::new(
            "gfortran",
            CompilerVendor::Gnu,
        ));
        assert_eq!(gnu.module_flags.include_flag.as_deref(), Some("-I"));
        assert_eq!(gnu.module_flags.output_flag.as_deref(), Some("-J"));

        let unknown = FortranToolchain::from_tools(LanguageToolchain::new(
            "g77",
            CompilerVendor::Unknown,
        ));
        assert!(unknown.module_flags.include_flag.is_none());
    }
}
