//! TOML parsing, serialization, and validation for toolchain descriptions.
//!
//! A toolchain description is a `.toolchain.toml` file holding a serialized
//! [`Toolchain`]. It lets a configuration run skip probing entirely, which
//! is how cross-compiling setups and CI images pin their compilers.

use std::path::Path;

use crate::error::{Result, ToolchainError};
use crate::host::HostOs;
use crate::toolchain::{LinkerQuirk, Toolchain};

/// A validation issue found in a toolchain description.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Severity: "error" or "warning".
    pub severity: &'static str,
    /// Human-readable description.
    pub message: String,
}

/// Load a toolchain from a `.toolchain.toml` file.
pub fn load_toolchain_toml(path: &Path) -> Result<Toolchain> {
    if !path.exists() {
        return Err(ToolchainError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    parse_toolchain_toml(&content)
}

/// Parse a toolchain from a TOML string.
pub fn parse_toolchain_toml(toml_str: &str) -> Result<Toolchain> {
    let toolchain: Toolchain = toml::from_str(toml_str)?;
    Ok(toolchain)
}

/// Serialize a toolchain to pretty TOML.
pub fn toolchain_to_toml(toolchain: &Toolchain) -> Result<String> {
    Ok(toml::to_string_pretty(toolchain)?)
}

/// Validate a toolchain description for structural correctness.
///
/// Returns `Ok(())` if valid, or `Err(issues)` with every problem found.
/// Warnings alone still produce `Err`; callers decide whether to proceed.
pub fn validate_toolchain(toolchain: &Toolchain) -> std::result::Result<(), Vec<ValidationIssue>> {
    let mut issues = Vec::new();

    let mut languages = vec![("c", &toolchain.c), ("cxx", &toolchain.cxx)];
    if let Some(fc) = &toolchain.fortran {
        languages.push(("fortran", &fc.tools));
    }
    for (section, tools) in languages {
        if tools.compiler.trim().is_empty() {
            issues.push(ValidationIssue {
                severity: "error",
                message: format!("[{section}] compiler is empty"),
            });
        }
        if tools.linker.trim().is_empty() {
            issues.push(ValidationIssue {
                severity: "error",
                message: format!("[{section}] linker is empty"),
            });
        }
    }

    // Suffixes are stored without the dot, except the executable suffix
    for (field, value) in [
        ("object-suffix", &toolchain.object_suffix),
        ("shared-library-ext", &toolchain.shared_library_ext),
        ("static-library-ext", &toolchain.static_library_ext),
    ] {
        if value.starts_with('.') {
            issues.push(ValidationIssue {
                severity: "error",
                message: format!("{field} '{value}' must not start with '.'"),
            });
        }
    }

    if toolchain.has_quirk(LinkerQuirk::DarwinCommonsUseDylibs) && toolchain.host.os != HostOs::Darwin {
        issues.push(ValidationIssue {
            severity: "warning",
            message: format!(
                "linker quirk darwin-commons-use-dylibs set on a {} host",
                toolchain.host.os
            ),
        });
    }

    if toolchain.shared_libraries && toolchain.shared_library_ext == toolchain.static_library_ext {
        issues.push(ValidationIssue {
            severity: "warning",
            message: format!(
                "shared-libraries is enabled but shared-library-ext equals static-library-ext ('{}')",
                toolchain.static_library_ext
            ),
        });
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

/// Generate a template `.toolchain.toml`, seeded from the GNU/Linux preset.
pub fn generate_template(name: &str) -> Result<String> {
    let mut toolchain = Toolchain::gnu_linux();
    toolchain.name = name.into();
    toolchain_to_toml(&toolchain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;
    use crate::vendor::CompilerVendor;

    #[test]
    fn round_trip_gnu_linux() {
        let original = Toolchain::gnu_linux();
        let toml_str = toolchain_to_toml(&original).unwrap();
        let parsed = parse_toolchain_toml(&toml_str).unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn round_trip_without_fortran() {
        let mut original = Toolchain::nag_darwin();
        original.fortran = None;
        let toml_str = toolchain_to_toml(&original).unwrap();
        assert!(!toml_str.contains("[fortran"));
        let parsed = parse_toolchain_toml(&toml_str).unwrap();
        assert!(parsed.fortran.is_none());
    }

    #[test]
    fn parse_minimal_toml() {
        let toml_str = r#"
name = "minimal"
object-suffix = "o"
executable-suffix = ""
shared-library-ext = "a"
static-library-ext = "a"

[host]
os = "linux"
arch = "x86_64"
hostname = "build01"
description = "Linux 6.8 x86_64"

[c]
compiler = "gcc"
compiler-vendor = "gnu"
linker = "gcc"
linker-vendor = "gnu"

[cxx]
compiler = "g++"
compiler-vendor = "gnu"
compiler-flags = "-O2"
linker = "g++"
linker-vendor = "gnu"
runtime-libs = ["-lstdc++"]
"#;
        let tc = parse_toolchain_toml(toml_str).unwrap();
        assert_eq!(tc.name, "minimal");
        assert!(!tc.shared_libraries);
        assert!(tc.fortran.is_none());
        assert!(tc.base_libs.is_empty());
        assert_eq!(tc.language(Language::Cxx).unwrap().compiler_flags(), "-O2");
        assert!(validate_toolchain(&tc).is_ok());
    }

    #[test]
    fn parse_fortran_section() {
        let mut tc = Toolchain::gnu_linux();
        tc.fortran = None;
        let mut toml_str = toolchain_to_toml(&tc).unwrap();
        toml_str.push_str(
            r#"
[fortran.tools]
compiler = "nagfor"
compiler-vendor = "nag"
linker = "nagfor"
linker-vendor = "nag"

[fortran.module-flags]
include-flag = "-I"
output-flag = "-mdir "
"#,
        );
        let parsed = parse_toolchain_toml(&toml_str).unwrap();
        let fc = parsed.fortran.unwrap();
        assert_eq!(fc.tools.compiler_vendor, CompilerVendor::Nag);
        assert_eq!(fc.module_flags.output_flag.as_deref(), Some("-mdir "));
    }

    #[test]
    fn parse_invalid_returns_error() {
        assert!(parse_toolchain_toml("this is not valid toml [[[").is_err());
    }

    #[test]
    fn parse_missing_field_returns_error() {
        assert!(parse_toolchain_toml("name = \"incomplete\"\n").is_err());
    }

    #[test]
    fn validate_presets() {
        assert!(validate_toolchain(&Toolchain::gnu_linux()).is_ok());
        assert!(validate_toolchain(&Toolchain::nag_darwin()).is_ok());
    }

    #[test]
    fn validate_empty_compiler() {
        let mut tc = Toolchain::gnu_linux();
        tc.cxx.compiler = String::new();
        let issues = validate_toolchain(&tc).unwrap_err();
        assert!(issues.iter().any(|i| i.message.contains("[cxx] compiler is empty")));
    }

    #[test]
    fn validate_dotted_suffix() {
        let mut tc = Toolchain::gnu_linux();
        tc.object_suffix = ".o".into();
        let issues = validate_toolchain(&tc).unwrap_err();
        assert!(issues.iter().any(|i| i.message.contains("object-suffix")));
    }

    #[test]
    fn validate_misplaced_darwin_quirk() {
        let mut tc = Toolchain::gnu_linux();
        tc.linker_quirks.push(LinkerQuirk::DarwinCommonsUseDylibs);
        let issues = validate_toolchain(&tc).unwrap_err();
        assert!(issues
            .iter()
            .any(|i| i.severity == "warning" && i.message.contains("linux host")));
    }

    #[test]
    fn validate_shared_without_extension() {
        let mut tc = Toolchain::gnu_linux();
        tc.shared_libraries = true;
        let issues = validate_toolchain(&tc).unwrap_err();
        assert!(issues.iter().any(|i| i.message.contains("shared-libraries")));
    }

    #[test]
    fn generate_template_is_valid() {
        let toml_str = generate_template("cluster-gnu").unwrap();
        let tc = parse_toolchain_toml(&toml_str).unwrap();
        assert_eq!(tc.name, "cluster-gnu");
        assert!(validate_toolchain(&tc).is_ok());
    }

    #[test]
    fn load_not_found() {
        let result = load_toolchain_toml(Path::new("/nonexistent/path.toolchain.toml"));
        assert!(matches!(result.unwrap_err(), ToolchainError::NotFound { .. }));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.toolchain.toml");
        std::fs::write(&path, generate_template("file-test").unwrap()).unwrap();

        let tc = load_toolchain_toml(&path).unwrap();
        assert_eq!(tc.name, "file-test");
    }
}
