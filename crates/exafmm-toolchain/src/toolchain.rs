//! Complete toolchain model.
//!
//! Assembles per-language compiler settings, the host platform, and file
//! suffix conventions into one description. Consumers read it through
//! [`Toolchain::language`], which hands out a [`LanguageView`] for a single
//! language at a time.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{Result, ToolchainError};
use crate::host::HostPlatform;
use crate::language::{FortranToolchain, Language, LanguageToolchain};
use crate::vendor::CompilerVendor;

/// Platform-specific link behavior discovered during detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkerQuirk {
    /// Some macOS releases need `-Wl,-commons,use_dylibs` when linking
    /// shared libraries with Fortran common blocks.
    DarwinCommonsUseDylibs,
}

impl LinkerQuirk {
    /// The literal linker flag this quirk corresponds to.
    pub fn flag(self) -> &'static str {
        match self {
            LinkerQuirk::DarwinCommonsUseDylibs => "-Wl,-commons,use_dylibs",
        }
    }

    /// Classify quirks present in a set of linker flags.
    pub fn classify(linker_flags: &str) -> Vec<LinkerQuirk> {
        let mut quirks = Vec::new();
        if linker_flags.contains(LinkerQuirk::DarwinCommonsUseDylibs.flag()) {
            quirks.push(LinkerQuirk::DarwinCommonsUseDylibs);
        }
        quirks
    }
}

/// A detected (or loaded) compiler toolchain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Toolchain {
    /// Toolchain name (e.g. "gnu-linux", or the file it was loaded from).
    pub name: String,
    /// Object file suffix without the dot.
    pub object_suffix: String,
    /// Executable suffix including the dot, or empty.
    pub executable_suffix: String,
    /// Extension of libraries produced by the library linker. Equals
    /// `static_library_ext` when shared libraries are disabled.
    pub shared_library_ext: String,
    /// Static archive extension without the dot.
    pub static_library_ext: String,
    /// Whether the build produces shared libraries.
    #[serde(default)]
    pub shared_libraries: bool,
    /// Libraries every executable links against (`LIBS`).
    #[serde(default)]
    pub base_libs: Vec<String>,
    /// Link quirks classified at detection.
    #[serde(default)]
    pub linker_quirks: Vec<LinkerQuirk>,
    /// Host machine.
    pub host: HostPlatform,
    /// Plain C compiler, needed even for C++ builds.
    pub c: LanguageToolchain,
    /// C++ compiler; the primary build language.
    pub cxx: LanguageToolchain,
    /// Fortran compiler, if one was found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fortran: Option<FortranToolchain>,
}

impl Toolchain {
    /// Enter `language` and return a read-only view of its settings.
    ///
    /// Asking for Fortran when no Fortran compiler was detected is an error.
    pub fn language(&self, language: Language) -> Result<LanguageView<'_>> {
        let tools = match language {
            Language::C => &self.c,
            Language::Cxx => &self.cxx,
            Language::Fortran => match &self.fortran {
                Some(fc) => &fc.tools,
                None => return Err(ToolchainError::LanguageUnavailable { language }),
            },
        };
        trace!(%language, "entering language");
        Ok(LanguageView {
            language,
            tools,
            toolchain: self,
        })
    }

    /// Whether a Fortran compiler is configured.
    pub fn has_fortran(&self) -> bool {
        self.fortran.is_some()
    }

    /// Whether the given quirk applies.
    pub fn has_quirk(&self, quirk: LinkerQuirk) -> bool {
        self.linker_quirks.contains(&quirk)
    }

    /// Switch library kind, taking the shared suffix from the host OS.
    pub fn set_shared_libraries(&mut self, enabled: bool) {
        self.shared_libraries = enabled;
        self.shared_library_ext = if enabled {
            self.host.os.shared_library_ext().to_string()
        } else {
            self.static_library_ext.clone()
        };
    }

    /// Default architecture tag: `arch-<os>-<c++ vendor>`.
    pub fn derived_arch(&self) -> String {
        format!("arch-{}-{}", self.host.os, self.cxx.compiler_vendor)
    }

    /// GNU compilers on x86-64 Linux, including gfortran.
    pub fn gnu_linux() -> Self {
        let host = HostPlatform::linux_x86_64();
        let os = host.os;
        let c = LanguageToolchain::new("gcc", CompilerVendor::Gnu).with_compiler_flags("-fPIC -O3");
        let cxx = LanguageToolchain::new("g++", CompilerVendor::Gnu)
            .with_compiler_flags("-fPIC -O3")
            .with_runtime_libs(CompilerVendor::Gnu.runtime_libs(Language::Cxx, os));
        let fc = LanguageToolchain::new("gfortran", CompilerVendor::Gnu)
            .with_compiler_flags("-fPIC -O3")
            .with_runtime_libs(CompilerVendor::Gnu.runtime_libs(Language::Fortran, os));
        Self {
            name: "gnu-linux".into(),
            object_suffix: os.object_suffix().into(),
            executable_suffix: os.executable_suffix().into(),
            shared_library_ext: os.static_library_ext().into(),
            static_library_ext: os.static_library_ext().into(),
            shared_libraries: false,
            base_libs: vec!["-lm".into()],
            linker_quirks: Vec::new(),
            host,
            c,
            cxx,
            fortran: Some(FortranToolchain::from_tools(fc)),
        }
    }

    /// Apple clang with NAG Fortran on macOS, building shared libraries.
    pub fn nag_darwin() -> Self {
        let host = HostPlatform::darwin_aarch64();
        let os = host.os;
        let commons = LinkerQuirk::DarwinCommonsUseDylibs.flag();
        let c = LanguageToolchain::new("clang", CompilerVendor::AppleClang);
        let cxx = LanguageToolchain::new("clang++", CompilerVendor::AppleClang)
            .with_runtime_libs(CompilerVendor::AppleClang.runtime_libs(Language::Cxx, os));
        let fc = LanguageToolchain::new("nagfor", CompilerVendor::Nag)
            .with_compiler_flags("-O3")
            .with_linker_flags(format!("-Wl,-flat_namespace {commons}"));
        Self {
            name: "nag-darwin".into(),
            object_suffix: os.object_suffix().into(),
            executable_suffix: os.executable_suffix().into(),
            shared_library_ext: os.shared_library_ext().into(),
            static_library_ext: os.static_library_ext().into(),
            shared_libraries: true,
            base_libs: Vec::new(),
            linker_quirks: vec![LinkerQuirk::DarwinCommonsUseDylibs],
            host,
            c,
            cxx,
            fortran: Some(FortranToolchain::from_tools(fc)),
        }
    }
}

/// Scoped view of one language's tools.
///
/// Obtained from [`Toolchain::language`]; dropping it leaves the language.
#[derive(Debug)]
pub struct LanguageView<'a> {
    language: Language,
    tools: &'a LanguageToolchain,
    toolchain: &'a Toolchain,
}

impl<'a> LanguageView<'a> {
    pub fn language(&self) -> Language {
        self.language
    }

    pub fn compiler(&self) -> &'a str {
        &self.tools.compiler
    }

    pub fn compiler_flags(&self) -> &'a str {
        &self.tools.compiler_flags
    }

    pub fn compiler_vendor(&self) -> CompilerVendor {
        self.tools.compiler_vendor
    }

    pub fn preprocessor_flags(&self) -> &'a str {
        &self.tools.preprocessor_flags
    }

    pub fn linker(&self) -> &'a str {
        &self.tools.linker
    }

    pub fn linker_flags(&self) -> &'a str {
        &self.tools.linker_flags
    }

    pub fn linker_vendor(&self) -> CompilerVendor {
        self.tools.linker_vendor
    }

    pub fn runtime_libs(&self) -> &'a [String] {
        &self.tools.runtime_libs
    }

    pub fn object_suffix(&self) -> &'a str {
        &self.toolchain.object_suffix
    }

    pub fn executable_suffix(&self) -> &'a str {
        &self.toolchain.executable_suffix
    }

    pub fn shared_library_suffix(&self) -> &'a str {
        &self.toolchain.shared_library_ext
    }
}

impl Drop for LanguageView<'_> {
    fn drop(&mut self) {
        trace!(language = %self.language, "leaving language");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gnu_linux_preset() {
        let tc = Toolchain::gnu_linux();
        assert!(tc.has_fortran());
        assert_eq!(tc.derived_arch(), "arch-linux-gnu");
        let cxx = tc.language(Language::Cxx).unwrap();
        assert_eq!(cxx.compiler(), "g++");
        assert_eq!(cxx.linker(), "g++");
        assert_eq!(cxx.object_suffix(), "o");
        assert_eq!(cxx.shared_library_suffix(), "a");
    }

    #[test]
    fn fortran_unavailable_is_error() {
        let mut tc = Toolchain::gnu_linux();
        tc.fortran = None;
        let err = tc.language(Language::Fortran).unwrap_err();
        assert!(matches!(
            err,
            ToolchainError::LanguageUnavailable {
                language: Language::Fortran
            }
        ));
    }

    #[test]
    fn nag_darwin_preset() {
        let tc = Toolchain::nag_darwin();
        assert!(tc.has_quirk(LinkerQuirk::DarwinCommonsUseDylibs));
        let fc = tc.language(Language::Fortran).unwrap();
        assert_eq!(fc.linker_vendor(), CompilerVendor::Nag);
        assert!(!fc.linker_vendor().usable_as_linker());
        assert_eq!(fc.shared_library_suffix(), "dylib");
    }

    #[test]
    fn quirk_classification() {
        assert_eq!(
            LinkerQuirk::classify("-L/opt/lib -Wl,-commons,use_dylibs"),
            vec![LinkerQuirk::DarwinCommonsUseDylibs]
        );
        assert!(LinkerQuirk::classify("-Wl,-rpath,/opt/lib").is_empty());
    }

    #[test]
    fn library_kind_follows_host() {
        let mut tc = Toolchain::gnu_linux();
        tc.set_shared_libraries(true);
        assert!(tc.shared_libraries);
        assert_eq!(tc.language(Language::Cxx).unwrap().shared_library_suffix(), "so");

        let mut tc = Toolchain::nag_darwin();
        tc.set_shared_libraries(false);
        assert_eq!(tc.shared_library_ext, "a");
        tc.set_shared_libraries(true);
        assert_eq!(tc.shared_library_ext, "dylib");
    }
}
